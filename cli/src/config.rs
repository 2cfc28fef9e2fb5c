//! Host configuration loading.
//!
//! Loaded from `<config_dir>/scribe/config.toml`. A missing file means
//! defaults; unset fields fall back individually. A malformed file is
//! ignored with a warning rather than failing activation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use scribe_client::SupervisorConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    /// Master switch; when false the host starts nothing.
    pub enabled: bool,
    /// Log raw engine replies.
    pub debug: bool,
    /// Default maximum number of completions requested.
    pub max_num_results: usize,
    /// File extensions for which completions are disabled.
    pub disabled_language_ids: Vec<String>,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Override for the engine versions root.
    pub binaries_root: Option<PathBuf>,
}

impl Default for ScribeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug: false,
            max_num_results: 5,
            disabled_language_ids: Vec::new(),
            request_timeout_ms: 1000,
            binaries_root: None,
        }
    }
}

impl ScribeConfig {
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        let Ok(text) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("ignoring malformed config at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Supervisor configuration with the resolved binaries root.
    pub fn supervisor_config(&self) -> Result<SupervisorConfig> {
        let root = match &self.binaries_root {
            Some(root) => root.clone(),
            None => dirs::config_dir()
                .context("no user config directory for this platform")?
                .join("scribe")
                .join("binaries"),
        };
        Ok(SupervisorConfig::new(root))
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("scribe").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScribeConfig::default();
        assert!(config.enabled);
        assert!(!config.debug);
        assert_eq!(config.max_num_results, 5);
        assert_eq!(config.request_timeout_ms, 1000);
        assert!(config.disabled_language_ids.is_empty());
        assert_eq!(config.binaries_root, None);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let config: ScribeConfig = toml::from_str("enabled = false\n").unwrap();
        assert!(!config.enabled);
        assert_eq!(config.max_num_results, 5);
        assert_eq!(config.request_timeout_ms, 1000);
    }

    #[test]
    fn test_full_file() {
        let config: ScribeConfig = toml::from_str(
            r#"
            enabled = true
            debug = true
            max_num_results = 10
            disabled_language_ids = ["md", "txt"]
            request_timeout_ms = 250
            binaries_root = "/opt/scribe/binaries"
            "#,
        )
        .unwrap();
        assert!(config.debug);
        assert_eq!(config.max_num_results, 10);
        assert_eq!(config.disabled_language_ids, vec!["md", "txt"]);
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(
            config.binaries_root,
            Some(PathBuf::from("/opt/scribe/binaries"))
        );
    }

    #[test]
    fn test_explicit_binaries_root_wins() {
        let config = ScribeConfig {
            binaries_root: Some(PathBuf::from("/custom/root")),
            ..ScribeConfig::default()
        };
        let supervisor = config.supervisor_config().unwrap();
        assert_eq!(supervisor.binaries_root, PathBuf::from("/custom/root"));
    }
}
