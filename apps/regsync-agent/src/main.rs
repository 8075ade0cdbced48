//! regsync agent — mirrors registry artifacts between object-store buckets.
//!
//! # Usage
//!
//! ```text
//! regsync-agent sync <image> <tag>      # one-shot sync to every target
//! regsync-agent enqueue <image> [tag]   # hand the sync to the work queue
//! regsync-agent poll                    # long-running queue consumer
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SOURCE_BUCKET` | *(unset)* | `region:bucket` the registry writes to |
//! | `TARGET_BUCKETS` | *(unset)* | Comma list of `region:bucket[:sse]` targets |
//! | `SQS_QUEUE` | *(unset)* | `region:host/path` of the work queue |
//! | `POOL_SIZE` | `4` | Concurrent copy workers per session |
//! | `USE_SSE` | `false` | Request SSE on every target write |
//! | `SOURCE_SSE` | `false` | Attach source-side decryption to every copy |
//! | `EMPTY_QUEUE_SLEEP_SECS` | `5` | Idle pause between poll iterations |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use regsync_aws::{AwsMessageBroker, AwsObjectStore};
use regsync_broker::MessageBroker;
use regsync_core::{CancelToken, SyncConfig};
use regsync_engine::SyncService;
use regsync_store::ObjectStore;

const USAGE: &str = "usage: regsync-agent <sync <image> <tag> | enqueue <image> [tag] | poll>";

/// What the invocation asked the agent to do.
#[derive(Debug, PartialEq, Eq)]
enum Mode {
    /// One-shot sync of `image:tag` to every configured target.
    Sync {
        /// Repository name.
        image: String,
        /// Tag name.
        tag: String,
    },
    /// Serialize the sync intent and hand it to the work queue.
    Enqueue {
        /// Repository name.
        image: String,
        /// Tag name, or none for a whole-repository job.
        tag: Option<String>,
    },
    /// Consume the work queue until interrupted.
    Poll,
}

/// Parse the command-line mode. Flags and bootstrap stay here; everything
/// else is environment-driven.
fn parse_mode(args: &[String]) -> Result<Mode, &'static str> {
    match args {
        [cmd, image, tag] if cmd == "sync" => Ok(Mode::Sync {
            image: image.clone(),
            tag: tag.clone(),
        }),
        [cmd, image] if cmd == "enqueue" => Ok(Mode::Enqueue {
            image: image.clone(),
            tag: None,
        }),
        [cmd, image, tag] if cmd == "enqueue" => Ok(Mode::Enqueue {
            image: image.clone(),
            tag: Some(tag.clone()),
        }),
        [cmd] if cmd == "poll" => Ok(Mode::Poll),
        _ => Err(USAGE),
    }
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config
/// value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Cancel on SIGINT or SIGTERM. In-flight copies finish; pending work is
/// dropped and the session reports failure.
fn spawn_signal_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut term = match signal(SignalKind::terminate()) {
                Ok(term) => term,
                Err(e) => {
                    error!(error = %e, "failed to install SIGTERM handler");
                    return;
                }
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("received interrupt signal"),
                _ = term.recv() => info!("received terminate signal"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("received interrupt signal");
        }
        cancel.cancel();
    });
}

/// Build the service against AWS and run the requested mode. Returns
/// whether the run succeeded.
async fn run(mode: Mode, config: SyncConfig) -> Result<bool> {
    let base = regsync_aws::load_base_config().await;
    let store: Arc<dyn ObjectStore> = Arc::new(AwsObjectStore::new(base.clone()));

    let mut service = SyncService::new(config.clone(), store);
    if let Some(queue) = &config.queue {
        let broker: Arc<dyn MessageBroker> = Arc::new(AwsMessageBroker::new(&base, queue));
        service = service.with_broker(broker);
    }
    spawn_signal_handler(service.cancel_token());

    match mode {
        Mode::Sync { image, tag } => Ok(service.sync(&image, &tag).await?),
        Mode::Enqueue { image, tag } => {
            service.enqueue(&image, tag.as_deref()).await?;
            Ok(true)
        }
        Mode::Poll => {
            service.poll().await?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match parse_mode(&args) {
        Ok(mode) => mode,
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::FAILURE;
        }
    };

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_tracing(&config.log_level) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(mode, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "agent failed");
            ExitCode::FAILURE
        }
    }
}
