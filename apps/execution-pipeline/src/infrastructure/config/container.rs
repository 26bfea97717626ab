//! Dependency Injection Container
//!
//! Manages creation and wiring of all application components.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::application::ports::{SubmissionRepository, VenuePort};
use crate::application::services::{
    DisclaimerResolver, InstrumentValidator, PlacementClient, PlacementSettings, PositionGuards,
    PositionTracker, PrecheckClient,
};
use crate::application::use_cases::{
    ExecutionOrchestrator, IntentionMapper, OrchestratorSettings, PipelineStages, SessionContext,
};
use crate::config::Config;
use crate::domain::shared::{AccountKey, ClientKey, DomainError, Quantity};
use crate::infrastructure::broker::saxo::{EnvCredentials, SaxoConfig, SaxoVenueAdapter, TransportError};
use crate::infrastructure::persistence::InMemorySubmissionRepository;

/// Wiring errors.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A setting needed for trading is empty.
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),

    /// A configured value is not a valid domain value.
    #[error("invalid setting: {0}")]
    InvalidSetting(#[from] DomainError),

    /// The venue adapter could not be built.
    #[error("venue adapter: {0}")]
    Transport(#[from] TransportError),
}

/// Dependency injection container.
///
/// Holds the venue, the submission store, and the wired use cases. Every
/// collaborator is shared, so concurrent Execute calls see the same caches
/// and the same rate-limit tracker.
pub struct Container<V, S>
where
    V: VenuePort + 'static,
    S: SubmissionRepository + 'static,
{
    venue: Arc<V>,
    submissions: Arc<S>,
    positions: Arc<PositionTracker<V>>,
    orchestrator: Arc<ExecutionOrchestrator<V, S>>,
    mapper: IntentionMapper,
    dry_run: bool,
}

/// Production wiring: Saxo adapter plus the in-memory submission ledger.
pub type SaxoContainer = Container<SaxoVenueAdapter, InMemorySubmissionRepository>;

impl<V, S> Container<V, S>
where
    V: VenuePort + 'static,
    S: SubmissionRepository + 'static,
{
    /// Wire every stage from configuration.
    pub fn new(venue: Arc<V>, submissions: Arc<S>, config: &Config) -> Result<Self, ContainerError> {
        let session = session_from(config)?;

        let positions = Arc::new(PositionTracker::new(
            Arc::clone(&venue),
            session.client_key.clone(),
            Duration::from_secs(config.positions.cache_ttl_secs),
        ));

        let stages = PipelineStages {
            validator: Arc::new(InstrumentValidator::new(
                Arc::clone(&venue),
                Duration::from_secs(config.instruments.cache_ttl_secs),
            )),
            guards: Arc::new(PositionGuards::new(
                Arc::clone(&positions),
                config.positions.guard_policy(),
            )),
            precheck: Arc::new(PrecheckClient::new(
                Arc::clone(&venue),
                config.precheck.retry(),
            )),
            disclaimers: Arc::new(DisclaimerResolver::new(
                Arc::clone(&venue),
                Duration::from_secs(config.disclaimers.cache_ttl_secs),
            )),
            placement: Arc::new(PlacementClient::new(
                Arc::clone(&venue),
                PlacementSettings {
                    ambiguous_codes: config
                        .placement
                        .ambiguous_error_codes
                        .iter()
                        .cloned()
                        .collect::<HashSet<_>>(),
                    scan_limit: config.reconciliation.scan_limit,
                    max_order_age: config.reconciliation.max_order_age(),
                },
            )),
        };

        let settings = OrchestratorSettings {
            strategy_id: config.execution.strategy_id.clone(),
            disclaimer_policy: config.disclaimers.policy,
            pipeline_timeout: Duration::from_secs(config.execution.pipeline_timeout_secs),
        };

        let mapper = IntentionMapper::new(
            session.clone(),
            config.execution.strategy_id.clone(),
            Quantity::new(config.execution.default_quantity)?,
        );

        let orchestrator = Arc::new(ExecutionOrchestrator::new(
            stages,
            Arc::clone(&submissions),
            session,
            settings,
        ));

        Ok(Self {
            venue,
            submissions,
            positions,
            orchestrator,
            mapper,
            dry_run: config.placement.dry_run,
        })
    }

    /// Get the venue port.
    pub fn venue(&self) -> Arc<V> {
        Arc::clone(&self.venue)
    }

    /// Get the submission repository.
    pub fn submissions(&self) -> Arc<S> {
        Arc::clone(&self.submissions)
    }

    /// Get the shared position tracker (also feeds signal mapping).
    pub fn positions(&self) -> Arc<PositionTracker<V>> {
        Arc::clone(&self.positions)
    }

    /// Get the execution orchestrator.
    pub fn orchestrator(&self) -> Arc<ExecutionOrchestrator<V, S>> {
        Arc::clone(&self.orchestrator)
    }

    /// Get the signal mapper.
    pub const fn signal_mapper(&self) -> &IntentionMapper {
        &self.mapper
    }

    /// Configured dry-run flag for placements.
    pub const fn dry_run(&self) -> bool {
        self.dry_run
    }
}

impl SaxoContainer {
    /// Build the production container: bearer token from the configured
    /// environment variable, Saxo adapter, in-memory submission ledger.
    pub fn from_config(config: &Config) -> Result<Self, ContainerError> {
        let saxo = SaxoConfig::with_base_url(config.venue.base_url.clone())
            .with_timeout(config.venue.request_timeout())
            .with_retry(config.transport.retry_policy());
        let saxo = config
            .transport
            .min_intervals()
            .into_iter()
            .fold(saxo, |acc, (category, interval)| {
                acc.with_min_interval(category, interval)
            });

        let credentials = Arc::new(EnvCredentials::new(config.venue.access_token_env.clone()));
        let venue = Arc::new(SaxoVenueAdapter::new(&saxo, credentials)?);

        Self::new(venue, Arc::new(InMemorySubmissionRepository::new()), config)
    }
}

fn session_from(config: &Config) -> Result<SessionContext, ContainerError> {
    if config.venue.account_key.trim().is_empty() {
        return Err(ContainerError::MissingSetting("venue.account_key"));
    }
    if config.venue.client_key.trim().is_empty() {
        return Err(ContainerError::MissingSetting("venue.client_key"));
    }
    Ok(SessionContext {
        account_key: AccountKey::new(config.venue.account_key.trim()),
        client_key: ClientKey::new(config.venue.client_key.trim()),
    })
}
