//! Execute Order Use Case
//!
//! Runs one order intention through
//! `Validate → Guard → Precheck → Disclaimers → Place → (Reconcile)`.
//! Every business outcome is an [`ExecutionResult`]; only setup defects
//! surface as [`PipelineError`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::dto::ExecutionResult;
use crate::application::ports::{
    IntentionFingerprint, SubmissionClaim, SubmissionRecord, SubmissionRepository,
    SubmissionStoreError, VenueError, VenuePort,
};
use crate::application::services::{
    DisclaimerResolver, InstrumentValidator, PlacementClient, PositionGuards, PrecheckClient,
    ValidationError,
};
use crate::domain::disclaimer::DisclaimerPolicy;
use crate::domain::order_execution::{
    ExecutionStatus, ExternalReference, LedgerOrder, OrderIntention, OrderSide, PlacementOutcome,
    ReconciliationOutcome, derive_final_status, generate_external_reference,
    resolve_reconciliation,
};
use crate::domain::shared::{AccountKey, ClientKey, OrderId, Quantity};
use crate::observability::record_execution_result;

/// Fatal pipeline errors. Business outcomes never use this type.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage hit a setup defect (credentials, authentication, malformed response).
    #[error("{stage} failed: {source}")]
    Fatal {
        /// Stage name.
        stage: &'static str,
        /// Underlying venue error.
        #[source]
        source: VenueError,
    },

    /// The submission store could not be read or written before placement.
    #[error(transparent)]
    SubmissionStore(#[from] SubmissionStoreError),

    /// The order ledger could not be queried.
    #[error("ledger query failed: {0}")]
    LedgerQuery(#[source] VenueError),
}

/// Authenticated session the pipeline trades for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    /// Session account.
    pub account_key: AccountKey,
    /// Session client.
    pub client_key: ClientKey,
}

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Strategy id used when generating correlation strings.
    pub strategy_id: String,
    /// Disclaimer policy.
    pub disclaimer_policy: DisclaimerPolicy,
    /// Deadline for one invocation.
    pub pipeline_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            strategy_id: "pipeline".to_string(),
            disclaimer_policy: DisclaimerPolicy::BlockAll,
            pipeline_timeout: Duration::from_secs(120),
        }
    }
}

/// Stage collaborators, shared across invocations.
pub struct PipelineStages<V: VenuePort> {
    /// Instrument validator.
    pub validator: Arc<InstrumentValidator<V>>,
    /// Position guards.
    pub guards: Arc<PositionGuards<V>>,
    /// Precheck client.
    pub precheck: Arc<PrecheckClient<V>>,
    /// Disclaimer resolver.
    pub disclaimers: Arc<DisclaimerResolver<V>>,
    /// Placement and reconciliation client.
    pub placement: Arc<PlacementClient<V>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupted {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::DeadlineExceeded => f.write_str("pipeline deadline exceeded"),
        }
    }
}

/// Race a stage against cancellation and the invocation deadline.
async fn interruptible<F: Future>(
    cancel: &CancellationToken,
    deadline: Instant,
    stage: F,
) -> Result<F::Output, Interrupted> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Interrupted::Cancelled),
        () = tokio::time::sleep_until(deadline) => Err(Interrupted::DeadlineExceeded),
        output = stage => Ok(output),
    }
}

/// Use case for executing order intentions.
pub struct ExecutionOrchestrator<V, S>
where
    V: VenuePort,
    S: SubmissionRepository,
{
    stages: PipelineStages<V>,
    submissions: Arc<S>,
    session: SessionContext,
    settings: OrchestratorSettings,
}

impl<V, S> ExecutionOrchestrator<V, S>
where
    V: VenuePort,
    S: SubmissionRepository,
{
    /// Create a new orchestrator.
    pub const fn new(
        stages: PipelineStages<V>,
        submissions: Arc<S>,
        session: SessionContext,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            stages,
            submissions,
            session,
            settings,
        }
    }

    /// Session the orchestrator trades for.
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Execute an intention.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal setup defects.
    pub async fn execute(
        &self,
        intention: OrderIntention,
        dry_run: bool,
    ) -> Result<ExecutionResult, PipelineError> {
        self.execute_with_cancellation(intention, dry_run, CancellationToken::new())
            .await
    }

    /// Execute an intention, stopping early when `cancel` fires or the
    /// pipeline deadline passes.
    ///
    /// Interruption before placement yields `Cancelled`. Interruption while
    /// placement is in flight yields `Uncertain`, to be reconciled by the
    /// next execution with the same correlation string.
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal setup defects.
    pub async fn execute_with_cancellation(
        &self,
        intention: OrderIntention,
        dry_run: bool,
        cancel: CancellationToken,
    ) -> Result<ExecutionResult, PipelineError> {
        let started = std::time::Instant::now();
        let deadline = Instant::now() + self.settings.pipeline_timeout;
        let (intention, reference) = self.normalize(intention);

        let span = tracing::info_span!(
            "execute",
            external_reference = %reference,
            uic = intention.instrument().uic,
            asset_type = %intention.instrument().asset_type,
            side = %intention.side(),
            dry_run,
        );

        let mut result = tracing::Instrument::instrument(
            self.run(intention, &reference, dry_run, &cancel, deadline),
            span,
        )
        .await?;
        result.external_reference = Some(reference.to_string());
        result.dry_run = dry_run;

        record_execution_result(result.status.as_str(), started.elapsed().as_secs_f64());
        tracing::info!(
            external_reference = %reference,
            status = %result.status,
            order_id = ?result.order_id,
            needs_reconciliation = result.needs_reconciliation,
            reason = ?result.error_message,
            "Execution finished"
        );
        Ok(result)
    }

    /// Force session keys and make sure a correlation string exists.
    fn normalize(&self, intention: OrderIntention) -> (OrderIntention, ExternalReference) {
        if intention.account_key() != &self.session.account_key
            || intention.client_key() != &self.session.client_key
        {
            tracing::debug!(
                supplied_account = %intention.account_key(),
                session_account = %self.session.account_key,
                "Overwriting intention keys with session keys"
            );
        }
        let intention = intention.with_session_keys(
            self.session.account_key.clone(),
            self.session.client_key.clone(),
        );

        if let Some(reference) = intention.external_reference().cloned() {
            return (intention, reference);
        }
        let strategy_id = intention
            .strategy_id()
            .unwrap_or(self.settings.strategy_id.as_str())
            .to_string();
        let reference = generate_external_reference(
            &strategy_id,
            intention.instrument(),
            intention.side(),
            intention.quantity().amount(),
            Utc::now(),
        );
        (intention.with_external_reference(reference.clone()), reference)
    }

    async fn run(
        &self,
        intention: OrderIntention,
        reference: &ExternalReference,
        dry_run: bool,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> Result<ExecutionResult, PipelineError> {
        let fingerprint = IntentionFingerprint::of(&intention);

        // 1. Earlier submission with the same correlation string
        if !dry_run {
            if let Some(record) = self.submissions.find(reference).await? {
                if record.holds_reference() {
                    return Ok(self.replay(record, &fingerprint, reference).await);
                }
            }
        }

        let interrupted = |why: Interrupted| -> Result<ExecutionResult, PipelineError> {
            tracing::warn!(reason = %why, "Execution interrupted before placement");
            Ok(ExecutionResult::rejected(
                ExecutionStatus::Cancelled,
                format!("{why} before placement"),
            ))
        };

        // 2. Instrument validation
        match interruptible(cancel, deadline, self.stages.validator.validate(&intention)).await {
            Err(why) => return interrupted(why),
            Ok(Ok(())) => {}
            Ok(Err(ValidationError::Rejected(rejection))) => {
                let status = if rejection.is_market_state() {
                    ExecutionStatus::BlockedByMarketState
                } else {
                    ExecutionStatus::FailedValidation
                };
                return Ok(ExecutionResult::rejected(status, rejection.to_string()));
            }
            Ok(Err(ValidationError::Fatal(source))) => {
                return Err(PipelineError::Fatal {
                    stage: "validation",
                    source,
                });
            }
        }

        // 3. Position guards
        let guard = match intention.side() {
            OrderSide::Buy => {
                interruptible(
                    cancel,
                    deadline,
                    self.stages
                        .guards
                        .evaluate_buy(intention.instrument(), intention.quantity()),
                )
                .await
            }
            OrderSide::Sell => {
                interruptible(
                    cancel,
                    deadline,
                    self.stages
                        .guards
                        .evaluate_sell(intention.instrument(), Some(intention.quantity())),
                )
                .await
            }
        };
        let guard = match guard {
            Ok(guard) => guard,
            Err(why) => return interrupted(why),
        };
        if !guard.allowed {
            let mut result = ExecutionResult::rejected(
                ExecutionStatus::BlockedByPosition,
                format!("position guard blocked {}: {}", intention.side(), guard.reason),
            );
            result.guard_reason = Some(guard.reason);
            return Ok(result);
        }
        let intention = match guard.approved_quantity.map(Quantity::new) {
            Some(Ok(approved)) if approved != intention.quantity() => {
                intention.with_quantity(approved)
            }
            Some(Err(e)) => {
                let mut result =
                    ExecutionResult::rejected(ExecutionStatus::BlockedByPosition, e.to_string());
                result.guard_reason = Some(guard.reason);
                return Ok(result);
            }
            _ => intention,
        };

        // 4. Precheck
        let precheck =
            match interruptible(cancel, deadline, self.stages.precheck.execute(&intention)).await {
                Err(why) => return interrupted(why),
                Ok(Err(source)) => {
                    return Err(PipelineError::Fatal {
                        stage: "precheck",
                        source,
                    });
                }
                Ok(Ok(outcome)) => outcome,
            };
        let intention = match precheck.request_id.clone() {
            Some(request_id) => intention.with_request_id(request_id),
            None => intention,
        };

        let mut result = ExecutionResult::new(ExecutionStatus::Success);
        result.guard_reason = Some(guard.reason);
        result.request_id = precheck.request_id.clone();
        result.estimated_cost = precheck.estimated_cost.clone();
        result.margin_impact = precheck.margin_impact.clone();

        if !precheck.success {
            result.status = ExecutionStatus::FailedPrecheck;
            result.error_message = Some(precheck.rejection_reason());
            return Ok(result);
        }

        // 5. Disclaimers
        if let Some(bundle) = precheck.disclaimers.as_ref().filter(|b| !b.tokens.is_empty()) {
            let resolution = match interruptible(
                cancel,
                deadline,
                self.stages.disclaimers.resolve(
                    &bundle.tokens,
                    &bundle.context,
                    self.settings.disclaimer_policy,
                ),
            )
            .await
            {
                Ok(resolution) => resolution,
                Err(why) => return interrupted(why),
            };
            if !resolution.allow_trading {
                result.status = ExecutionStatus::BlockedByDisclaimer;
                result.error_message = resolution.block_reason;
                return Ok(result);
            }
        }

        if cancel.is_cancelled() {
            return interrupted(Interrupted::Cancelled);
        }

        // 6. Claim the correlation string, then place
        if !dry_run {
            let claim = self
                .submissions
                .claim(SubmissionRecord {
                    external_reference: reference.clone(),
                    client_key: self.session.client_key.clone(),
                    fingerprint: fingerprint.clone(),
                    status: ExecutionStatus::Uncertain,
                    order_id: None,
                    recorded_at: Utc::now(),
                })
                .await?;
            if let SubmissionClaim::Held(record) = claim {
                tracing::warn!(
                    status = %record.status,
                    "Correlation claimed by another submission, not placing"
                );
                return Ok(self.replay(record, &fingerprint, reference).await);
            }
        }

        let placed = interruptible(
            cancel,
            deadline,
            self.stages.placement.place(&intention, &precheck, dry_run),
        )
        .await;
        let (placement, interrupted_during_placement) = match placed {
            Ok(attempt) => {
                if attempt.request_id.is_some() {
                    result.request_id = attempt.request_id;
                }
                (attempt.outcome, false)
            }
            Err(why) => {
                tracing::warn!(reason = %why, "Execution interrupted during placement");
                (
                    PlacementOutcome::Uncertain {
                        order_id: None,
                        reason: format!("{why} during placement"),
                    },
                    true,
                )
            }
        };

        // 7. Reconcile ambiguous placements
        let reconciliation = if placement.needs_reconciliation() && !interrupted_during_placement {
            interruptible(
                cancel,
                deadline,
                self.stages.placement.reconcile(
                    &self.session.client_key,
                    placement.order_id(),
                    reference,
                ),
            )
            .await
            .ok()
        } else {
            None
        };

        result.status = derive_final_status(&placement, reconciliation.as_ref()).into();
        result.needs_reconciliation = placement.needs_reconciliation();
        result.order_id = placement
            .order_id()
            .or_else(|| reconciliation.as_ref().and_then(ReconciliationOutcome::order_id))
            .cloned();
        if result.status != ExecutionStatus::Success {
            result.error_message = Some(failure_reason(&placement, reconciliation.as_ref()));
        }
        result.reconciliation = reconciliation;

        // 8. Record and refresh
        if !dry_run {
            if let Err(e) = self
                .record(reference, &fingerprint, result.status, result.order_id.clone())
                .await
            {
                tracing::error!(error = %e, "Failed to update submission record");
            }
            if result.status == ExecutionStatus::Success {
                self.stages.guards.tracker().invalidate();
            }
        }

        Ok(result)
    }

    /// Answer for a correlation string some other submission holds.
    ///
    /// Never places. A different trade under the same string is rejected.
    async fn replay(
        &self,
        record: SubmissionRecord,
        fingerprint: &IntentionFingerprint,
        reference: &ExternalReference,
    ) -> ExecutionResult {
        if record.fingerprint != *fingerprint {
            tracing::warn!(
                recorded = ?record.fingerprint,
                requested = ?fingerprint,
                "Correlation string reused for a different intention"
            );
            return ExecutionResult::rejected(
                ExecutionStatus::FailedValidation,
                format!("correlation string {reference} already used for a different intention"),
            );
        }

        if record.status == ExecutionStatus::Success {
            tracing::info!(
                order_id = ?record.order_id,
                "Correlation already executed, returning recorded success"
            );
            let mut result = ExecutionResult::new(ExecutionStatus::Success);
            result.order_id = record.order_id;
            return result;
        }

        self.resume_uncertain(record, reference).await
    }

    /// Resolve an uncertain submission without placing again.
    ///
    /// While the holder may still be placing, an unconfirmed order leaves
    /// the record untouched.
    async fn resume_uncertain(
        &self,
        record: SubmissionRecord,
        reference: &ExternalReference,
    ) -> ExecutionResult {
        tracing::info!(
            order_id = ?record.order_id,
            "Correlation previously uncertain, reconciling instead of placing"
        );
        let outcome = self
            .stages
            .placement
            .reconcile(&record.client_key, record.order_id.as_ref(), reference)
            .await;

        let mut result = ExecutionResult::new(resolve_reconciliation(&outcome).into());
        result.needs_reconciliation = true;
        result.order_id = outcome.order_id().cloned().or_else(|| record.order_id.clone());

        if outcome.order_id().is_none() && self.may_be_in_flight(&record) {
            tracing::info!(
                outcome = outcome.as_str(),
                "Submission still in flight, leaving record untouched"
            );
            result.status = ExecutionStatus::Uncertain;
            result.error_message = Some("submission still in flight".to_string());
            result.reconciliation = Some(outcome);
            return result;
        }

        if result.status != ExecutionStatus::Success {
            result.error_message = Some(format!("reconciliation: {}", outcome.as_str()));
        }
        result.reconciliation = Some(outcome);

        if let Err(e) = self
            .record(reference, &record.fingerprint, result.status, result.order_id.clone())
            .await
        {
            tracing::error!(error = %e, "Failed to update submission record");
        }
        if result.status == ExecutionStatus::Success {
            self.stages.guards.tracker().invalidate();
        }
        result
    }

    fn may_be_in_flight(&self, record: &SubmissionRecord) -> bool {
        let age = (Utc::now() - record.recorded_at).to_std().unwrap_or_default();
        record.status == ExecutionStatus::Uncertain && age < self.settings.pipeline_timeout
    }

    async fn record(
        &self,
        reference: &ExternalReference,
        fingerprint: &IntentionFingerprint,
        status: ExecutionStatus,
        order_id: Option<OrderId>,
    ) -> Result<(), SubmissionStoreError> {
        self.submissions
            .save(SubmissionRecord {
                external_reference: reference.clone(),
                client_key: self.session.client_key.clone(),
                fingerprint: fingerprint.clone(),
                status,
                order_id,
                recorded_at: Utc::now(),
            })
            .await
    }

    /// Fetch the raw ledger entry for an order, by id or by correlation string.
    ///
    /// `client_key` defaults to the session's client.
    ///
    /// # Errors
    ///
    /// Returns an error when the ledger cannot be queried.
    pub async fn reconcile(
        &self,
        order_id: Option<&OrderId>,
        external_reference: &ExternalReference,
        client_key: Option<&ClientKey>,
    ) -> Result<Option<LedgerOrder>, PipelineError> {
        let client_key = client_key.unwrap_or(&self.session.client_key);
        self.stages
            .placement
            .fetch_ledger_entry(client_key, order_id, external_reference)
            .await
            .map_err(PipelineError::LedgerQuery)
    }
}

fn failure_reason(
    placement: &PlacementOutcome,
    reconciliation: Option<&ReconciliationOutcome>,
) -> String {
    let placement_reason = placement.reason().unwrap_or("placement failed");
    match reconciliation {
        Some(ReconciliationOutcome::QueryFailed { message }) => {
            format!("{placement_reason}; reconciliation query failed: {message}")
        }
        Some(outcome) => format!("{placement_reason}; reconciliation: {}", outcome.as_str()),
        None => placement_reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::mock::{CallCounts, MockVenue};
    use crate::application::ports::{PlacementReply, RateLimitSnapshot};
    use crate::application::services::{
        DISCLAIMER_CACHE_TTL, INSTRUMENT_CACHE_TTL, POSITIONS_CACHE_TTL, PlacementSettings,
        PositionTracker, PrecheckRetry,
    };
    use crate::domain::disclaimer::{DisclaimerBundle, DisclaimerRecord};
    use crate::domain::instrument::{InstrumentConstraints, MarketState};
    use crate::domain::order_execution::{BusinessError, PrecheckOutcome};
    use crate::domain::position::{DuplicateBuyPolicy, GuardPolicy, GuardReason, Position};
    use crate::domain::shared::{AssetType, InstrumentKey};
    use crate::infrastructure::persistence::InMemorySubmissionRepository;
    use rust_decimal_macros::dec;

    const REFERENCE: &str = "momentum:211:202610191430:0badf00d";

    type Orchestrator = ExecutionOrchestrator<MockVenue, InMemorySubmissionRepository>;

    fn key() -> InstrumentKey {
        InstrumentKey::new(AssetType::Stock, 211)
    }

    fn session() -> SessionContext {
        SessionContext {
            account_key: AccountKey::new("acc"),
            client_key: ClientKey::new("cli"),
        }
    }

    fn build(
        venue: &Arc<MockVenue>,
        policy: DisclaimerPolicy,
    ) -> (Orchestrator, Arc<InMemorySubmissionRepository>) {
        let tracker = Arc::new(PositionTracker::new(
            Arc::clone(venue),
            ClientKey::new("cli"),
            POSITIONS_CACHE_TTL,
        ));
        let stages = PipelineStages {
            validator: Arc::new(InstrumentValidator::new(
                Arc::clone(venue),
                INSTRUMENT_CACHE_TTL,
            )),
            guards: Arc::new(PositionGuards::new(
                tracker,
                GuardPolicy {
                    duplicate_buy: DuplicateBuyPolicy::Block,
                    ..GuardPolicy::default()
                },
            )),
            precheck: Arc::new(PrecheckClient::new(
                Arc::clone(venue),
                PrecheckRetry::default(),
            )),
            disclaimers: Arc::new(DisclaimerResolver::new(
                Arc::clone(venue),
                DISCLAIMER_CACHE_TTL,
            )),
            placement: Arc::new(PlacementClient::new(
                Arc::clone(venue),
                PlacementSettings::default(),
            )),
        };
        let submissions = Arc::new(InMemorySubmissionRepository::new());
        let orchestrator = ExecutionOrchestrator::new(
            stages,
            Arc::clone(&submissions),
            session(),
            OrchestratorSettings {
                strategy_id: "momentum".to_string(),
                disclaimer_policy: policy,
                pipeline_timeout: Duration::from_secs(120),
            },
        );
        (orchestrator, submissions)
    }

    fn intention(side: OrderSide, units: u64) -> OrderIntention {
        OrderIntention::market(
            AccountKey::new("caller-account"),
            ClientKey::new("caller-client"),
            key(),
            side,
            Quantity::from_units(units).unwrap(),
        )
        .with_external_reference(ExternalReference::new(REFERENCE).unwrap())
    }

    fn ledger(order_id: &str, status: &str) -> LedgerOrder {
        LedgerOrder {
            order_id: OrderId::new(order_id),
            status: status.to_string(),
            external_reference: Some(REFERENCE.to_string()),
            instrument: None,
            side: None,
            amount: None,
            filled_amount: None,
            price: None,
            order_time: Some(Utc::now()),
            raw: serde_json::json!({ "OrderId": order_id, "Status": status }),
        }
    }

    fn timeout() -> VenueError {
        VenueError::Transient {
            message: "operation timed out".into(),
            timeout: true,
        }
    }

    #[tokio::test]
    async fn test_happy_path_places_and_records() {
        let venue = Arc::new(MockVenue::new());
        venue.push_placement(Ok(PlacementReply {
            order_id: Some(OrderId::new("12345")),
            error: None,
            request_id: None,
        }));
        let (orchestrator, submissions) = build(&venue, DisclaimerPolicy::BlockAll);

        let result = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.order_id, Some(OrderId::new("12345")));
        assert!(!result.needs_reconciliation);
        assert_eq!(result.external_reference.as_deref(), Some(REFERENCE));
        assert_eq!(result.guard_reason, Some(GuardReason::NoExistingPosition));

        let record = submissions
            .find(&ExternalReference::new(REFERENCE).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Success);
        assert_eq!(record.client_key, ClientKey::new("cli"));
    }

    #[tokio::test]
    async fn test_generates_reference_when_missing() {
        let venue = Arc::new(MockVenue::new());
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);
        let bare = OrderIntention::market(
            AccountKey::new("acc"),
            ClientKey::new("cli"),
            key(),
            OrderSide::Buy,
            Quantity::from_units(1).unwrap(),
        );

        let result = orchestrator.execute(bare, true).await.unwrap();
        let reference = result.external_reference.unwrap();
        assert!(reference.starts_with("momentum:211:"));
        assert!(reference.len() <= ExternalReference::MAX_LEN);
    }

    #[tokio::test]
    async fn test_closed_market_blocks() {
        let venue = Arc::new(MockVenue::new());
        venue.set_constraints(
            key(),
            Ok(InstrumentConstraints::minimal(key(), true, Some(MarketState::Closed))),
        );
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let result = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::BlockedByMarketState);
        assert!(result.error_message.is_some());
        assert_eq!(CallCounts::get(&venue.calls.net_positions), 0);
    }

    #[tokio::test]
    async fn test_untradable_instrument_fails_validation() {
        let venue = Arc::new(MockVenue::new());
        venue.set_constraints(
            key(),
            Ok(InstrumentConstraints::minimal(key(), false, Some(MarketState::Open))),
        );
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let result = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::FailedValidation);
    }

    #[tokio::test]
    async fn test_duplicate_buy_is_blocked_before_precheck() {
        let venue = Arc::new(MockVenue::new());
        venue.push_positions(Ok(vec![Position::new(key(), dec!(10))]));
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let result = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::BlockedByPosition);
        assert_eq!(result.guard_reason, Some(GuardReason::DuplicateBuyPrevented));
        assert_eq!(CallCounts::get(&venue.calls.precheck), 0);
    }

    #[tokio::test]
    async fn test_oversized_sell_is_clamped() {
        let venue = Arc::new(MockVenue::new());
        venue.push_positions(Ok(vec![Position::new(key(), dec!(25))]));
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let result = orchestrator
            .execute(intention(OrderSide::Sell, 100), false)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.guard_reason, Some(GuardReason::SellQuantityClamped));
        assert_eq!(*venue.placed_quantities.lock().unwrap(), vec![dec!(25)]);
    }

    #[tokio::test]
    async fn test_precheck_rejection_stops_pipeline() {
        let venue = Arc::new(MockVenue::new());
        venue.push_precheck(Ok(PrecheckOutcome::rejected(BusinessError::new(
            "InsufficientFunds",
            "not enough cash",
        ))));
        let (orchestrator, submissions) = build(&venue, DisclaimerPolicy::BlockAll);

        let result = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::FailedPrecheck);
        assert_eq!(
            result.error_message.as_deref(),
            Some("InsufficientFunds: not enough cash")
        );
        assert_eq!(CallCounts::get(&venue.calls.place_order), 0);
        assert!(submissions.is_empty());
    }

    #[tokio::test]
    async fn test_blocking_disclaimer_stops_pipeline() {
        let venue = Arc::new(MockVenue::new());
        venue.push_precheck(Ok(PrecheckOutcome::accepted(
            None,
            None,
            Some(DisclaimerBundle {
                context: "ctx".to_string(),
                tokens: vec!["risk".to_string()],
            }),
        )));
        venue.set_disclaimer(
            "risk",
            Ok(DisclaimerRecord {
                token: "risk".to_string(),
                is_blocking: true,
                title: "Complex product".to_string(),
                body: String::new(),
                response_options: vec!["Accepted".to_string()],
                conditions: Vec::new(),
            }),
        );
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::AutoAcceptNormal);

        let result = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::BlockedByDisclaimer);
        assert_eq!(CallCounts::get(&venue.calls.accept_disclaimer), 0);
        assert_eq!(CallCounts::get(&venue.calls.place_order), 0);
    }

    #[tokio::test]
    async fn test_timeout_reconciled_as_filled_is_not_placed_twice() {
        let venue = Arc::new(MockVenue::new());
        venue.push_placement(Err(timeout()));
        venue.set_recent_orders(Ok(vec![ledger("9001", "Filled")]));
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let first = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(first.status, ExecutionStatus::Success);
        assert!(first.needs_reconciliation);
        assert_eq!(first.order_id, Some(OrderId::new("9001")));

        let second = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(second.status, ExecutionStatus::Success);
        assert_eq!(second.order_id, Some(OrderId::new("9001")));
        assert_eq!(CallCounts::get(&venue.calls.place_order), 1);
    }

    #[tokio::test]
    async fn test_unresolved_uncertainty_is_reconciled_on_retry() {
        let venue = Arc::new(MockVenue::new());
        venue.push_placement(Err(timeout()));
        venue.set_recent_orders(Err(timeout()));
        let (orchestrator, submissions) = build(&venue, DisclaimerPolicy::BlockAll);

        let first = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(first.status, ExecutionStatus::Uncertain);
        assert!(matches!(
            first.reconciliation,
            Some(ReconciliationOutcome::QueryFailed { .. })
        ));

        venue.set_recent_orders(Ok(vec![ledger("9001", "Working")]));
        let second = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(second.status, ExecutionStatus::Success);
        assert!(second.needs_reconciliation);
        assert_eq!(CallCounts::get(&venue.calls.place_order), 1);
        assert_eq!(CallCounts::get(&venue.calls.precheck), 1);

        let record = submissions
            .find(&ExternalReference::new(REFERENCE).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_previous_failure_allows_fresh_attempt() {
        let venue = Arc::new(MockVenue::new());
        venue.push_placement(Err(VenueError::Remote {
            status: 400,
            code: Some("InvalidRequest".into()),
            message: "bad".into(),
            rate_limits: RateLimitSnapshot::default(),
        }));
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let first = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(first.status, ExecutionStatus::Failure);

        let second = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(second.status, ExecutionStatus::Success);
        assert_eq!(CallCounts::get(&venue.calls.place_order), 2);
    }

    #[tokio::test]
    async fn test_reused_reference_for_different_trade_is_rejected() {
        let venue = Arc::new(MockVenue::new());
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let first = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap();
        assert_eq!(first.status, ExecutionStatus::Success);

        let resized = orchestrator
            .execute(intention(OrderSide::Buy, 50), false)
            .await
            .unwrap();
        assert_eq!(resized.status, ExecutionStatus::FailedValidation);
        assert!(resized.order_id.is_none());
        assert!(
            resized
                .error_message
                .unwrap()
                .contains("already used for a different intention")
        );
        assert_eq!(CallCounts::get(&venue.calls.place_order), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_executions_with_same_reference_place_once() {
        let venue = Arc::new(MockVenue::new());
        venue.set_placement_delay(Duration::from_secs(5));
        let (orchestrator, submissions) = build(&venue, DisclaimerPolicy::BlockAll);

        let (a, b) = tokio::join!(
            orchestrator.execute(intention(OrderSide::Buy, 100), false),
            orchestrator.execute(intention(OrderSide::Buy, 100), false),
        );
        let mut statuses = [a.unwrap().status, b.unwrap().status];
        statuses.sort_by_key(ExecutionStatus::as_str);

        assert_eq!(CallCounts::get(&venue.calls.place_order), 1);
        assert_eq!(
            statuses,
            [ExecutionStatus::Success, ExecutionStatus::Uncertain]
        );

        let record = submissions
            .find(&ExternalReference::new(REFERENCE).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Success);
    }

    #[tokio::test]
    async fn test_unreferenced_intentions_are_placed_independently() {
        let venue = Arc::new(MockVenue::new());
        let (orchestrator, submissions) = build(&venue, DisclaimerPolicy::BlockAll);
        let bare = |units| {
            OrderIntention::market(
                AccountKey::new("acc"),
                ClientKey::new("cli"),
                key(),
                OrderSide::Buy,
                Quantity::from_units(units).unwrap(),
            )
        };

        let first = orchestrator.execute(bare(100), false).await.unwrap();
        let second = orchestrator.execute(bare(100), false).await.unwrap();

        assert_eq!(first.status, ExecutionStatus::Success);
        assert_eq!(second.status, ExecutionStatus::Success);
        assert_ne!(first.external_reference, second.external_reference);
        assert_eq!(CallCounts::get(&venue.calls.place_order), 2);
        assert_eq!(submissions.len(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_skips_placement_and_ledger() {
        let venue = Arc::new(MockVenue::new());
        let (orchestrator, submissions) = build(&venue, DisclaimerPolicy::BlockAll);

        let result = orchestrator
            .execute(intention(OrderSide::Buy, 100), true)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::Success);
        assert!(result.dry_run);
        assert!(result.order_id.as_ref().is_some_and(OrderId::is_dry_run));
        assert_eq!(CallCounts::get(&venue.calls.place_order), 0);
        assert_eq!(CallCounts::get(&venue.calls.recent_orders), 0);
        assert!(submissions.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_has_no_side_effects() {
        let venue = Arc::new(MockVenue::new());
        let (orchestrator, submissions) = build(&venue, DisclaimerPolicy::BlockAll);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = orchestrator
            .execute_with_cancellation(intention(OrderSide::Buy, 100), false, cancel)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::Cancelled);
        assert_eq!(CallCounts::get(&venue.calls.precheck), 0);
        assert!(submissions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_during_placement_is_uncertain() {
        let venue = Arc::new(MockVenue::new());
        venue.set_placement_delay(Duration::from_secs(30));
        let (orchestrator, submissions) = build(&venue, DisclaimerPolicy::BlockAll);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let result = orchestrator
            .execute_with_cancellation(intention(OrderSide::Buy, 100), false, cancel)
            .await
            .unwrap();
        assert_eq!(result.status, ExecutionStatus::Uncertain);
        assert!(result.needs_reconciliation);
        assert!(result.reconciliation.is_none());

        let record = submissions
            .find(&ExternalReference::new(REFERENCE).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::Uncertain);
    }

    #[tokio::test]
    async fn test_fatal_precheck_error_propagates() {
        let venue = Arc::new(MockVenue::new());
        venue.push_precheck(Err(VenueError::Authentication { status: 401 }));
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let err = orchestrator
            .execute(intention(OrderSide::Buy, 100), false)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Fatal { stage: "precheck", .. }));
    }

    #[tokio::test]
    async fn test_reconcile_returns_raw_ledger_entry() {
        let venue = Arc::new(MockVenue::new());
        venue.add_ledger_order(ledger("9001", "Working"));
        let (orchestrator, _) = build(&venue, DisclaimerPolicy::BlockAll);

        let entry = orchestrator
            .reconcile(
                Some(&OrderId::new("9001")),
                &ExternalReference::new(REFERENCE).unwrap(),
                None,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.raw["Status"], "Working");
    }
}
