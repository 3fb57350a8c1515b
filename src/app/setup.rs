//! This module handles the initial setup of the application.
use super::args::AppArgs;
use crate::logging::EventLog;
use crate::web::LogViewer;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Contains all the components the application runs with.
///
/// This struct is created by the `prepare` function and handed to the
/// launch flow.
pub struct PreparedApp {
    /// The command-line arguments.
    pub args: AppArgs,
    /// The event log every entry is written through.
    pub log: Arc<EventLog>,
    /// The live viewer, started or not depending on configuration.
    pub viewer: LogViewer,
}

/// Prepares the application for running.
///
/// This function performs the following steps:
/// 1. Configures diagnostic logging.
/// 2. Builds the event log.
/// 3. Builds the viewer (it is started later by the caller).
///
/// # Arguments
///
/// * `args` - The command-line arguments.
pub fn prepare(args: AppArgs) -> PreparedApp {
    configure_logging();

    let log = Arc::new(EventLog::new(args.event_log_config()));
    info!(
        "Event log at {} (min level {})",
        log.file_path().display(),
        log.min_level()
    );

    let viewer = LogViewer::new(args.viewer_config(), Arc::clone(&log));

    PreparedApp { args, log, viewer }
}

/// Configures diagnostic logging for the process itself.
///
/// Diagnostics go to stderr and are filtered by `RUST_LOG`, defaulting to `info`.
fn configure_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
