use anyhow::{Context, Result};
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogSettings;

pub const DEFAULT_FILTER: &str = "info,homework_watchbot=debug";

/// Size-bounded log file keeping at most `settings.backups` rotated copies.
///
/// The parent directory is created and the file opened up front so a bad
/// path is reported as an error instead of a panic inside `file-rotate`.
pub fn rotating_file(settings: &LogSettings) -> Result<FileRotate<AppendCount>> {
    let path = &settings.path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    Ok(FileRotate::new(
        path,
        AppendCount::new(settings.backups),
        ContentLimit::Bytes(settings.max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}

/// Install stdout and rotating-file layers on the global subscriber.
pub fn init(settings: &LogSettings) -> Result<()> {
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let log_file = rotating_file(settings)?;
    let stdout = fmt::layer().with_filter(filter());
    let file = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(filter());

    tracing_subscriber::registry()
        .with(stdout)
        .with(file)
        .try_init()
        .context("failed to install tracing subscriber")
}
