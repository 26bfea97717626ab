//! Execution Pipeline Binary
//!
//! Runs one order intention through the pipeline and prints the result.
//!
//! # Usage
//!
//! ```bash
//! execution-pipeline [CONFIG] [INTENTION_JSON]
//! ```
//!
//! `CONFIG` defaults to `config.yaml`. The intention is read from
//! `INTENTION_JSON` when given, otherwise from stdin.
//!
//! # Environment Variables
//!
//! - `SAXO_ACCESS_TOKEN`: bearer token (variable name is configurable)
//! - `RUST_LOG`: overrides `observability.log_level`
//!
//! `.env` files in the working directory or its ancestors are loaded first.

use std::io::Read;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use execution_pipeline::application::dto::OrderIntentionDto;
use execution_pipeline::config::load_config;
use execution_pipeline::infrastructure::config::SaxoContainer;
use execution_pipeline::observability::{MetricsConfig, init_metrics};
use execution_pipeline::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    load_dotenv();

    let mut args = std::env::args().skip(1);
    let config_path = args.next();
    let intention_path = args.next();

    let config = load_config(config_path.as_deref()).context("loading configuration")?;
    let _telemetry = init_telemetry(&config.observability);

    if config.observability.metrics.enabled {
        let addr: SocketAddr = config
            .observability
            .metrics
            .listen_addr
            .parse()
            .context("parsing observability.metrics.listen_addr")?;
        init_metrics(&MetricsConfig::with_addr(addr))?;
    }

    tracing::info!(
        base_url = %config.venue.base_url,
        dry_run = config.placement.dry_run,
        "Starting execution pipeline"
    );

    let container = SaxoContainer::from_config(&config).context("wiring pipeline")?;

    let raw = read_intention(intention_path.as_deref())?;
    let dto: OrderIntentionDto = serde_json::from_str(&raw).context("parsing order intention")?;
    let intention = dto.into_domain().context("invalid order intention")?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = container
        .orchestrator()
        .execute_with_cancellation(intention, container.dry_run(), cancel)
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn read_intention(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading intention from {path}"))
        }
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading intention from stdin")?;
            Ok(buf)
        }
    }
}

fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, cancelling execution"),
        () = terminate => tracing::info!("Received SIGTERM, cancelling execution"),
    }

    cancel.cancel();
}
