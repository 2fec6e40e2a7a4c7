use std::path::{Path, PathBuf};

use receipt_courier::config::Config;
use receipt_courier::{logging, pipeline};
use tracing::{error, info};

/// Config file used when neither the CLI argument nor the environment
/// variable names one.
const DEFAULT_CONFIG_PATH: &str = "courier.toml";

#[tokio::main]
async fn main() {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let _log_guard = match logging::init(Path::new(".")) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e:#}");
            return;
        }
    };

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("RECEIPT_COURIER_CONFIG")
                .ok()
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Receipt courier starting"
    );

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_path.display(), error = %e, "Could not load configuration");
            return;
        }
    };

    // A failed run is logged, never raised; re-running picks up where
    // staging left off.
    match pipeline::run(&config).await {
        Ok(summary) => {
            info!(
                emails_sent = summary.emails_sent,
                emails_failed = summary.emails_failed,
                "Courier run finished"
            );
        }
        Err(e) => {
            error!(error = %e, "Courier run aborted");
        }
    }
}
