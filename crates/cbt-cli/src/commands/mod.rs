pub mod health;
pub mod init;
pub mod questions;
pub mod results;
pub mod students;
pub mod sync;
pub mod take;

use std::path::PathBuf;

use anyhow::{Context, Result};

use cbt_core::app::{App, NoticeLevel};
use cbt_core::traits::ResultStore;
use cbt_store::config::{create_store, load_config_from, CbtConfig};

/// Loaded config plus the store it points at.
pub struct Session {
    pub config: CbtConfig,
    pub store: Box<dyn ResultStore>,
}

impl Session {
    pub fn open(config_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        tracing::debug!(?config, "loaded config");
        let store = create_store(&config)?;
        Ok(Self { config, store })
    }

    pub fn store(&self) -> &dyn ResultStore {
        self.store.as_ref()
    }

    /// An app wired to the admin secret and the on-disk pending queue.
    pub fn app(&self) -> Result<App> {
        App::new()
            .with_admin_secret(self.config.admin_password.clone())
            .with_pending_file(self.config.pending_path())
            .context("failed to open pending results queue")
    }

    /// An app signed in as admin.
    pub fn admin_app(&self, password: &str) -> Result<App> {
        let mut app = self.app()?;
        app.login_admin(password)
            .context("admin login failed (check --password or CBT_ADMIN_PASSWORD)")?;
        app.drain_notices();
        Ok(app)
    }
}

/// Print queued notices to stderr.
pub fn print_notices(app: &mut App) {
    for notice in app.drain_notices() {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
}

/// Shorten text for a table cell.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Option letter for a zero-based index.
pub fn option_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_long_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long question text", 10), "a very ...");
    }

    #[test]
    fn letters() {
        assert_eq!(option_letter(0), 'A');
        assert_eq!(option_letter(3), 'D');
    }
}
