use anyhow::Context;
use std::io;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn build_filter(log_level: Option<&str>) -> anyhow::Result<EnvFilter> {
    match log_level {
        Some(level) => {
            EnvFilter::try_new(level).with_context(|| format!("invalid log level {level:?}"))
        }
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

/// Logs go to stderr so stdout stays reserved for reports. With `log_dir`
/// set, a daily rolling JSON file is written too; keep the returned guard
/// alive until exit so buffered lines are flushed.
pub(crate) fn init_tracing(
    log_dir: Option<&Path>,
    log_level: Option<&str>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = build_filter(log_level)?;
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer);

    let Some(dir) = log_dir else {
        registry.init();
        return Ok(None);
    };
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log dir {}", dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(dir, "vpp-probe.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_target(false)
        .json();
    registry.with(file_layer).init();
    Ok(Some(file_guard))
}
