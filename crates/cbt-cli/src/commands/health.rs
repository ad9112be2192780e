//! The `cbt health` command.

use std::path::PathBuf;

use anyhow::Result;

use super::Session;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path)?;
    let status = session.store().health().await?;

    if status.connected {
        println!(
            "Connected to {} store at {}",
            session.store().name(),
            session.config.api_url
        );
    } else {
        println!("Store at {} is offline", session.config.api_url);
    }
    if let Some(message) = status.message {
        println!("  {message}");
    }

    let pending = session.app()?.pending().len();
    if pending > 0 {
        println!("{pending} result(s) waiting to sync. Run `cbt sync`.");
    }

    Ok(())
}
