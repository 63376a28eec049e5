//! CLI binary that keeps a device's transaction list in sync with the wallet
//! backend and prints every reconciled snapshot as JSON lines.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use txsync_poller::{
    CancellationMode, CircuitBreakerConfig, PollerConfig, RetryPolicy, TransactionPoller,
};
use txsync_source_http::{HttpTransactionSource, HttpTransactionSourceOptions};
use txsync_transactions::TransactionRecord;
use url::Url;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listener task panicked or was aborted.
    #[error("listener task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Output could not be serialized.
    #[error("failed to serialize transactions: {0}")]
    Json(#[from] serde_json::Error),

    /// A one-shot fetch failed.
    #[error(transparent)]
    Poller(#[from] txsync_poller::Error<txsync_source_http::Error>),

    /// HTTP source error
    #[error(transparent)]
    Source(#[from] txsync_source_http::Error),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Device access token sent as a bearer token
    #[arg(long, env = "TXSYNC_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Wallet demo backend origin
    #[arg(long, env = "TXSYNC_BACKEND_BASE_URL")]
    backend_base_url: Url,

    /// Consecutive failed cycles that open the circuit breaker (disabled if unset)
    #[arg(long, env = "TXSYNC_CIRCUIT_FAILURE_THRESHOLD")]
    circuit_failure_threshold: Option<u32>,

    /// Seconds the circuit breaker stays open before trying again
    #[arg(long, default_value_t = 60, env = "TXSYNC_CIRCUIT_OPEN_SECS")]
    circuit_open_secs: u64,

    /// Device whose transactions are listed
    #[arg(long, env = "TXSYNC_DEVICE_ID")]
    device_id: String,

    /// Abort in-flight requests on shutdown instead of letting them finish
    #[arg(long, env = "TXSYNC_IMMEDIATE_CANCEL")]
    immediate_cancel: bool,

    /// Run a single cycle, print the result and exit
    #[arg(long)]
    once: bool,

    /// Seconds between successful cycles
    #[arg(long, default_value_t = 10, env = "TXSYNC_POLL_INTERVAL_SECS")]
    poll_interval_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30, env = "TXSYNC_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: u64,

    /// Initial retry delay in seconds; enables exponential backoff when set
    #[arg(long, env = "TXSYNC_RETRY_INITIAL_SECS")]
    retry_initial_secs: Option<u64>,

    /// Fraction of the retry delay added as random jitter
    #[arg(long, default_value_t = 0.1, env = "TXSYNC_RETRY_JITTER")]
    retry_jitter: f64,

    /// Upper bound for the retry delay in seconds
    #[arg(long, default_value_t = 300, env = "TXSYNC_RETRY_MAX_SECS")]
    retry_max_secs: u64,

    /// Growth factor of the retry delay
    #[arg(long, default_value_t = 2.0, env = "TXSYNC_RETRY_MULTIPLIER")]
    retry_multiplier: f64,
}

impl Args {
    fn poller_config(&self) -> PollerConfig {
        let poll_interval = Duration::from_secs(self.poll_interval_secs);

        let retry = match self.retry_initial_secs {
            Some(initial) => RetryPolicy::Exponential {
                initial: Duration::from_secs(initial),
                max: Duration::from_secs(self.retry_max_secs),
                multiplier: self.retry_multiplier,
                jitter: self.retry_jitter,
            },
            None => RetryPolicy::Fixed(poll_interval),
        };

        let circuit_breaker =
            self.circuit_failure_threshold
                .map(|failure_threshold| CircuitBreakerConfig {
                    failure_threshold,
                    open_duration: Duration::from_secs(self.circuit_open_secs),
                });

        let cancellation = if self.immediate_cancel {
            CancellationMode::Immediate
        } else {
            CancellationMode::Graceful
        };

        PollerConfig {
            cancellation,
            circuit_breaker,
            poll_interval,
            retry,
            ..PollerConfig::default()
        }
    }

    fn source_options(&self) -> HttpTransactionSourceOptions {
        HttpTransactionSourceOptions {
            access_token: self.access_token.clone(),
            base_url: self.backend_base_url.clone(),
            device_id: self.device_id.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

fn print_transactions(transactions: &[TransactionRecord]) {
    info!(count = transactions.len(), "transactions reconciled");

    match serde_json::to_string(transactions) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("failed to serialize transactions: {e}"),
    }
}

async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received interrupt signal");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let source = HttpTransactionSource::new(args.source_options())?;
    let poller = TransactionPoller::new(source, args.poller_config());

    if args.once {
        let transactions = poller.fetch_once().await?;
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    let shutdown_token = CancellationToken::new();

    let signal_shutdown_token = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!("failed to listen for shutdown signals: {e}");
        }

        info!("Shutting down");
        signal_shutdown_token.cancel();
    });

    let listener = poller.spawn_listener(|transactions| print_transactions(&transactions));

    shutdown_token.cancelled().await;
    poller.shutdown().await;
    listener.await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "txsync",
            "--access-token",
            "secret",
            "--backend-base-url",
            "https://wallet.example.com/",
            "--device-id",
            "device-1",
        ];
        argv.extend_from_slice(extra);

        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_library_defaults() {
        let config = parse(&[]).poller_config();

        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.retry, RetryPolicy::Fixed(Duration::from_secs(10)));
        assert_eq!(config.circuit_breaker, None);
        assert_eq!(config.cancellation, CancellationMode::Graceful);
    }

    #[test]
    fn test_backoff_and_circuit_flags() {
        let config = parse(&[
            "--retry-initial-secs",
            "2",
            "--retry-max-secs",
            "120",
            "--retry-jitter",
            "0",
            "--circuit-failure-threshold",
            "3",
            "--circuit-open-secs",
            "45",
            "--immediate-cancel",
        ])
        .poller_config();

        assert_eq!(
            config.retry,
            RetryPolicy::Exponential {
                initial: Duration::from_secs(2),
                max: Duration::from_secs(120),
                multiplier: 2.0,
                jitter: 0.0,
            }
        );
        assert_eq!(
            config.circuit_breaker,
            Some(CircuitBreakerConfig {
                failure_threshold: 3,
                open_duration: Duration::from_secs(45),
            })
        );
        assert_eq!(config.cancellation, CancellationMode::Immediate);
    }

    #[test]
    fn test_source_options_from_args() {
        let options = parse(&["--request-timeout-secs", "5"]).source_options();

        assert_eq!(options.base_url.as_str(), "https://wallet.example.com/");
        assert_eq!(options.device_id, "device-1");
        assert_eq!(options.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_device_id_is_rejected() {
        let result = Args::try_parse_from([
            "txsync",
            "--access-token",
            "secret",
            "--backend-base-url",
            "https://wallet.example.com",
        ]);

        assert!(result.is_err());
    }
}
