//! Log stream setup — per-run file plus console.
//!
//! The subscriber is installed once at process start; everything else
//! logs through the `tracing` macros. The returned guard flushes the
//! file writer on drop, so `main` holds it for the whole run.

use std::path::Path;

use anyhow::Context;
use chrono::Local;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Install the console + file subscriber.
///
/// The log file is created in `dir` with a per-run timestamped name so
/// successive runs never clobber each other's logs.
pub fn init(dir: &Path) -> anyhow::Result<WorkerGuard> {
    let file_name = log_file_name(&Local::now());
    let path = dir.join(&file_name);
    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();

    Ok(guard)
}

fn log_file_name(now: &chrono::DateTime<Local>) -> String {
    now.format("courier_%Y%m%d_%H%M%S.log").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_name_is_timestamped() {
        let now = Local::now();
        let name = log_file_name(&now);

        assert!(name.starts_with("courier_"));
        assert!(name.ends_with(".log"));
        // courier_YYYYMMDD_HHMMSS.log
        assert_eq!(name.len(), "courier_".len() + 8 + 1 + 6 + ".log".len());
    }
}
