//! The main entry point for the logcast application.
mod app;
mod logging;
mod web;

use anyhow::Result;

/// The main function of the application.
///
/// Builds the event log, starts the live viewer when enabled and forwards
/// standard input into the log until it closes.
///
/// # Errors
///
/// Returns an error if reading input fails or the result of the status
/// tool cannot be printed.
#[tokio::main]
async fn main() -> Result<()> {
    app::launch().await
}
