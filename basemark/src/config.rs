//! User configuration loaded from `config.toml`.
//!
//! Every field has a default, so a missing file, a missing key, or an invalid
//! file all produce a usable [`Config`]. Problems are logged, never fatal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use basemark_core::tabs::PreviewPolicy;
use serde::Deserialize;
use tracing::{debug, warn};

/// Returns the path to the basemark config file.
///
/// Prefers `$XDG_CONFIG_HOME/basemark/config.toml`; falls back to
/// `~/.config/basemark/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("basemark").join("config.toml")
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TabsConfig {
    /// `"pin"` (every open is permanent) or `"reuse"` (single-click preview).
    pub preview: PreviewPolicy,
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self { preview: PreviewPolicy::AlwaysPin }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub enabled: bool,
    /// URL that receives the cursor context as a JSON POST.
    pub endpoint: Option<String>,
    pub debounce_ms: u64,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self { enabled: true, endpoint: None, debounce_ms: 300 }
    }
}

impl SuggestionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: String,
    /// Database path; relative paths resolve against the working directory.
    pub database: PathBuf,
    pub tabs: TabsConfig,
    pub suggestion: SuggestionConfig,
    pub save_debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "catppuccin-mocha".to_owned(),
            database: PathBuf::from(".basemark/basemark.db"),
            tabs: TabsConfig::default(),
            suggestion: SuggestionConfig::default(),
            save_debounce_ms: 1500,
        }
    }
}

impl Config {
    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Parses a config file body.
    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Loads the config at `path`, falling back to defaults when the file is
    /// missing or does not parse.
    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no config file, using defaults");
                return Self::default();
            }
        };
        match Self::parse(&raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config parse error, using defaults");
                Self::default()
            }
        }
    }

    pub fn load() -> Self {
        Self::load_from(&config_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
        assert_eq!(Config::default().save_debounce(), Duration::from_millis(1500));
        assert_eq!(Config::default().suggestion.debounce(), Duration::from_millis(300));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            theme = "dark"

            [tabs]
            preview = "reuse"

            [suggestion]
            endpoint = "http://localhost:3000/api/suggestion"
            "#,
        )
        .unwrap();
        assert_eq!(config.theme, "dark");
        assert_eq!(config.tabs.preview, PreviewPolicy::ReusePreview);
        assert!(config.suggestion.enabled);
        assert_eq!(config.suggestion.debounce_ms, 300);
        assert_eq!(config.suggestion.endpoint.as_deref(), Some("http://localhost:3000/api/suggestion"));
        assert_eq!(config.save_debounce_ms, 1500);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "theme = [").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
        assert_eq!(Config::load_from(&dir.path().join("missing.toml")), Config::default());
    }
}
