//! Tracing setup for embedders and test binaries.
//!
//! Nothing in this crate installs a subscriber on its own; hosts that already
//! run one keep it. [`init_logging`] is the opt-in pipeline: console output
//! filtered through `RUST_LOG`, plus a daily-rotated `skiff.log` when a
//! directory is given.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the default subscriber.
///
/// The guard flushes the file writer on drop and must outlive the sessions
/// being logged. Once a subscriber is installed, later calls leave it in
/// place, so test binaries may call this freely.
pub fn init_logging(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let console_layer = fmt::layer().with_target(true).with_thread_ids(false);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(&dir, "skiff.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}
