//! Logging setup
//!
//! Console output always; an extra plain-text file sink when `log.file` is
//! set. The file sink goes through a non-blocking writer so a slow disk never
//! stalls the producer or consumer.

use crate::settings::{LogConfig, LogFormat};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber
///
/// The returned guard flushes the file sink on drop; keep it alive until exit.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .with_context(|| format!("Invalid log filter: {}", config.filter))?;

    let (file_layer, guard) = match &config.file {
        Some(file) => {
            let (dir, name) = split_log_path(file)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    let installed = match config.format {
        // Production: JSON structured logging
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
    };
    installed.context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Expand `~` and split into (directory, file name)
fn split_log_path(file: &str) -> Result<(PathBuf, PathBuf)> {
    let path = PathBuf::from(shellexpand::tilde(file).into_owned());
    let name = path
        .file_name()
        .map(PathBuf::from)
        .with_context(|| format!("Log file path has no file name: {file}"))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, name))
}
