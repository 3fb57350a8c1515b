pub mod args;
mod pipe;
mod setup;

pub use args::AppArgs;

use crate::logging::traced;
use anyhow::Result;
use serde_json::Value;
use tokio::io::BufReader;
use tracing::{error, info, warn};

pub async fn launch() -> Result<()> {
    launch_with_args(AppArgs::from_cli()).await
}

pub async fn launch_with_args(args: AppArgs) -> Result<()> {
    let setup::PreparedApp { args, log, viewer } = setup::prepare(args);

    viewer.start().await;

    let status = traced(&log, "log_viewer", &Value::Null, async {
        Ok::<_, anyhow::Error>(viewer.status(false))
    })
    .await?;
    println!("{}", serde_json::to_string_pretty(&status)?);

    let stdin = BufReader::new(tokio::io::stdin());
    match pipe::forward(stdin, &log, args.pipe_level).await {
        Ok(forwarded) => info!("Input closed after {} lines", forwarded),
        Err(e) => {
            error!("Reading input failed: {:#}", e);
            log.warn(format!("Input closed early: {e}"));
        }
    }

    if viewer.is_running() {
        info!(
            "Viewer still serving at {}, press Ctrl-C to stop",
            viewer.current_url().unwrap_or_default()
        );
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Waiting for Ctrl-C failed: {}", e);
        }
    }

    viewer.shutdown().await;

    let failures = log.write_failures();
    if failures > 0 {
        warn!(
            "{} entries could not be appended to {}",
            failures,
            log.file_path().display()
        );
    }
    Ok(())
}
