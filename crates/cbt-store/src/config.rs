//! Configuration loading and store factory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cbt_core::pending::QUEUE_FILE;
use cbt_core::traits::ResultStore;

use crate::http::{HttpStore, DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::memory::MemoryStore;

/// Which backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Http,
    Memory,
}

/// Top-level cbt configuration.
///
/// Note: Custom Debug impl masks the admin password.
#[derive(Clone, Serialize, Deserialize)]
pub struct CbtConfig {
    #[serde(default)]
    pub store: StoreKind,
    /// Base URL of the REST API, including the `/api` prefix.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Shared secret for admin login.
    #[serde(default)]
    pub admin_password: Option<String>,
    /// Holds the pending-sync queue.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl std::fmt::Debug for CbtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CbtConfig")
            .field("store", &self.store)
            .field("api_url", &self.api_url)
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "admin_password",
                &self.admin_password.as_ref().map(|_| "***"),
            )
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./cbt-data")
}

impl Default for CbtConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            api_url: default_api_url(),
            timeout_secs: default_timeout(),
            admin_password: None,
            data_dir: default_data_dir(),
        }
    }
}

impl CbtConfig {
    /// Location of the pending-sync queue file.
    pub fn pending_path(&self) -> PathBuf {
        self.data_dir.join(QUEUE_FILE)
    }
}

/// Expand `${VAR_NAME}` references. Unset variables expand to nothing.
pub fn resolve_env_vars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = &rest[start + 2..start + len];
        out.push_str(&std::env::var(name).unwrap_or_default());
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `cbt.toml` in the current directory
/// 2. `~/.config/cbt/config.toml`
///
/// Environment variable overrides: `CBT_API_URL`, `CBT_ADMIN_PASSWORD`.
pub fn load_config_from(path: Option<&Path>) -> Result<CbtConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("cbt.toml");
            if local.exists() {
                Some(local)
            } else {
                config_dir()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<CbtConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => CbtConfig::default(),
    };

    if let Ok(url) = std::env::var("CBT_API_URL") {
        config.api_url = url;
    }
    if let Ok(password) = std::env::var("CBT_ADMIN_PASSWORD") {
        config.admin_password = Some(password);
    }

    config.api_url = resolve_env_vars(&config.api_url);
    config.admin_password = config
        .admin_password
        .as_deref()
        .map(resolve_env_vars)
        .filter(|p| !p.is_empty());

    Ok(config)
}

fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("cbt"))
}

/// Build the configured store.
pub fn create_store(config: &CbtConfig) -> Result<Box<dyn ResultStore>> {
    match config.store {
        StoreKind::Http => Ok(Box::new(HttpStore::new(
            &config.api_url,
            config.timeout_secs,
        )?)),
        StoreKind::Memory => Ok(Box::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_CBT_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_CBT_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_CBT_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("no refs"), "no refs");
        assert_eq!(resolve_env_vars("open ${brace"), "open ${brace");
        std::env::remove_var("_CBT_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = CbtConfig::default();
        assert_eq!(config.api_url, "http://localhost:5001/api");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.store, StoreKind::Http);
        assert!(config.pending_path().ends_with("pending-results.json"));
    }

    #[test]
    fn parse_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cbt.toml");
        std::fs::write(
            &path,
            r#"
api_url = "https://school.example/api"
timeout_secs = 3
admin_password = "s3cret"
data_dir = "/var/lib/cbt"
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/cbt"));
    }

    #[test]
    fn missing_explicit_path_fails() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn debug_masks_password() {
        let config = CbtConfig {
            admin_password: Some("hunter2".into()),
            ..Default::default()
        };
        let shown = format!("{config:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("***"));
    }

    #[test]
    fn memory_store_from_config() {
        let config: CbtConfig = toml::from_str("store = \"memory\"").unwrap();
        let store = create_store(&config).unwrap();
        assert_eq!(store.name(), "memory");
    }
}
