//! The `cbt sync` command.

use std::path::PathBuf;

use anyhow::Result;

use super::{print_notices, Session};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let session = Session::open(config_path)?;
    let mut app = session.app()?;

    if app.pending().is_empty() {
        println!("Nothing to sync.");
        return Ok(());
    }

    println!("{} result(s) queued", app.pending().len());
    if !app.check_health(session.store()).await {
        anyhow::bail!("store at {} is unreachable; try again later", session.config.api_url);
    }

    let report = app.sync_pending(session.store()).await;
    print_notices(&mut app);
    println!("Synced {}, {} still queued", report.synced.len(), report.remaining);

    anyhow::ensure!(report.remaining == 0, "some results could not be synced");
    Ok(())
}
