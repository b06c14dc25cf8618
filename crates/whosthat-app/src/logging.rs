// Tracing setup. Logs go to a file so they never interleave with whatever
// the presentation layer draws.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "whosthat.log";
const DEFAULT_FILTER: &str = "whosthat=info,warn";

/// Install a global fmt subscriber writing to `{log_dir}/whosthat.log`.
///
/// The filter comes from `RUST_LOG` when set. Returns the log file path.
pub fn init_tracing(log_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join(LOG_FILE_NAME);
    // Append: a rejected second init must not wipe the live log.
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(log_path)
}
