//! Diagnostic file logging. The operator-facing run log lives in
//! `runlog.rs`; this module only wires `tracing` to a `depol.log` file next
//! to the executable so support has a persistent trace.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns a guard that must be kept alive for the duration of the program
/// so buffered log lines are flushed on exit.
pub fn init() -> WorkerGuard {
    let file_appender = tracing_appender::rolling::never(executable_dir(), "depol.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}
