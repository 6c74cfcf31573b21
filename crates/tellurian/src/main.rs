// # tellurian - Declarative Infrastructure Reconciler
//
// The tellurian binary is a thin integration layer. It is responsible for:
// 1. Parsing flags and reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering providers
// 4. Running one reconciliation pass, or a teardown with `--delete`
//
// All reconciliation logic lives in tellurian-core.
//
// ## Configuration
//
// ### Credential
// - `DO_PAO`: DigitalOcean personal access token (required)
//
// ### Provider
// - `TELLURIAN_API_BASE_URL`: API base URL (default: https://api.digitalocean.com/v2)
//
// ### State
// - `TELLURIAN_STATE_PATH`: Path to the state file (default: tellurian.tlstate),
//   also settable with `--state`
//
// ### Async Operations
// - `TELLURIAN_POLL_INTERVAL_SECS`: Delay between status polls (default: 10)
// - `TELLURIAN_POLL_TIMEOUT_SECS`: Ceiling for one operation (default: 120)
//
// ### Logging
// - `RUST_LOG`: Full filter directive, wins when set
// - `TELLURIAN_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// ## Example
//
// ```bash
// export DO_PAO=dop_v1_...
//
// tellurian -f infra.yml          # apply
// tellurian -f infra.yml --delete # tear everything down
// ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tellurian_core::config::{Credential, StateStoreConfig, TellurianConfig};
use tellurian_core::state::open_store;
use tellurian_core::{
    Declaration, EngineEvent, OperationProgress, OperationTracker, ProviderRegistry, Reconciler,
    TeardownOrchestrator,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const CREDENTIAL_VAR: &str = "DO_PAO";
const API_BASE_URL_VAR: &str = "TELLURIAN_API_BASE_URL";
const POLL_INTERVAL_VAR: &str = "TELLURIAN_POLL_INTERVAL_SECS";
const POLL_TIMEOUT_VAR: &str = "TELLURIAN_POLL_TIMEOUT_SECS";
const LOG_LEVEL_VAR: &str = "TELLURIAN_LOG_LEVEL";

/// Capacity of the provisioning progress channel
const PROGRESS_CHANNEL_CAPACITY: usize = 16;

/// Exit codes for different termination scenarios
///
/// - 0: Every action or delete succeeded
/// - 1: Configuration, declaration or credential error
/// - 2: Runtime error (unexpected)
/// - 3: The run finished but some actions or deletes failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TellurianExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
    PartialFailure = 3,
}

impl From<TellurianExitCode> for ExitCode {
    fn from(code: TellurianExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl TellurianExitCode {
    /// Exit code for an error that stopped the run
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<tellurian_core::Error>() {
            Some(e) if e.is_fatal() => Self::ConfigError,
            _ => Self::RuntimeError,
        }
    }
}

/// Converge DigitalOcean resources toward a YAML declaration
#[derive(Debug, Parser)]
#[command(name = "tellurian", version, about)]
struct Args {
    /// Declaration file
    #[arg(short = 'f', long = "file", default_value = "tellurian.yml")]
    file: PathBuf,

    /// Delete every resource recorded in the state file instead of applying
    #[arg(short = 'd', long = "delete")]
    delete: bool,

    /// State file path
    #[arg(long = "state", env = "TELLURIAN_STATE_PATH")]
    state: Option<String>,
}

/// Build the configuration from flags and environment lookups
///
/// `lookup` returns the value of an environment variable, if set.
fn load_config(
    args: &Args,
    lookup: impl Fn(&str) -> Option<String>,
) -> tellurian_core::Result<TellurianConfig> {
    let token = Credential::from_optional(CREDENTIAL_VAR, lookup(CREDENTIAL_VAR))?;
    let mut config = TellurianConfig::new(token);

    if let Some(url) = lookup(API_BASE_URL_VAR) {
        config.provider.api_base_url = url;
    }
    if let Some(path) = &args.state {
        config.state_store = StateStoreConfig::File { path: path.clone() };
    }
    if let Some(secs) = parse_secs(POLL_INTERVAL_VAR, lookup(POLL_INTERVAL_VAR))? {
        config.tracker.poll_interval_secs = secs;
    }
    if let Some(secs) = parse_secs(POLL_TIMEOUT_VAR, lookup(POLL_TIMEOUT_VAR))? {
        config.tracker.timeout_secs = secs;
    }

    config.validate()?;
    Ok(config)
}

fn parse_secs(var: &str, value: Option<String>) -> tellurian_core::Result<Option<u64>> {
    value
        .map(|v| {
            v.trim().parse().map_err(|_| {
                tellurian_core::Error::config(format!(
                    "{} must be a whole number of seconds. Got: {}",
                    var, v
                ))
            })
        })
        .transpose()
}

/// Log filter: `RUST_LOG` wins, then the configured level
fn env_filter(level: Option<String>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(level.unwrap_or_else(|| "info".to_string()).to_lowercase())
    })
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(std::env::var(LOG_LEVEL_VAR).ok()))
        .init();

    let config = match load_config(&args, |var| std::env::var(var).ok()) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return TellurianExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return TellurianExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; cancelling the current operation");
                let _ = cancel_tx.send(true);
            }
        });

        match run(&args, config, cancel_rx).await {
            Ok(true) => TellurianExitCode::PartialFailure,
            Ok(false) => TellurianExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                TellurianExitCode::for_error(&e)
            }
        }
    });

    code.into()
}

/// Run one pass or one teardown
///
/// Returns whether any action or delete failed.
async fn run(args: &Args, config: TellurianConfig, cancel: watch::Receiver<bool>) -> Result<bool> {
    let (progress_tx, progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
    let progress_logger = spawn_progress_logger(progress_rx);

    let tracker = OperationTracker::from_config(&config.tracker)
        .with_progress(progress_tx)
        .with_cancellation(cancel);

    let registry = Arc::new(build_registry(&config, tracker)?);
    let store = open_store(&config.state_store);

    let failed = if args.delete {
        let (orchestrator, events) = TeardownOrchestrator::new(registry, store, &config.engine)?;
        let event_logger = spawn_event_logger(events);

        info!("Tearing down every recorded resource");
        let report = orchestrator.destroy().await?;
        drop(orchestrator);
        let _ = event_logger.await;

        info!(
            "Teardown finished: {} deleted, {} skipped, {} failed",
            report.deleted(),
            report.skipped(),
            report.failed()
        );
        report.has_failures()
    } else {
        let declaration = Declaration::from_path(&args.file)
            .await
            .with_context(|| format!("Cannot apply {}", args.file.display()))?;

        let (reconciler, events) = Reconciler::new(registry, store, &config.engine)?;
        let event_logger = spawn_event_logger(events);

        info!(
            "Applying {} action(s) from {}",
            declaration.len(),
            args.file.display()
        );
        let report = reconciler.apply(&declaration).await?;
        drop(reconciler);
        let _ = event_logger.await;

        report.has_failures()
    };

    progress_logger.abort();
    Ok(failed)
}

fn build_registry(config: &TellurianConfig, tracker: OperationTracker) -> Result<ProviderRegistry> {
    #[cfg_attr(not(feature = "digitalocean"), allow(unused_mut))]
    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "digitalocean")]
    {
        debug!("Registering DigitalOcean providers");
        tellurian_provider_digitalocean::register(&mut registry, &config.provider, tracker)?;
    }

    #[cfg(not(feature = "digitalocean"))]
    {
        let _ = (config, tracker);
        warn!("Built without providers; every action will be rejected");
    }

    Ok(registry)
}

fn spawn_event_logger(mut events: mpsc::Receiver<EngineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    })
}

fn spawn_progress_logger(mut progress: mpsc::Receiver<OperationProgress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(p) = progress.recv().await {
            info!(
                "Operation {}: still creating... ({}s elapsed)",
                p.handle.id,
                p.elapsed.as_secs()
            );
        }
    })
}
