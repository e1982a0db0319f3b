//! Instance configuration loaded from TOML.
//!
//! ```toml
//! default_category = "general"
//!
//! [search]
//! force_sitelinks_categories = ["shopping"]
//! ban_time_on_fail_seconds = 5
//! max_ban_time_on_fail_seconds = 120
//!
//! [[search.force_sitelink_websites]]
//! url_expression = '.*store\.example\.com.*'
//! search_terms = ["size"]
//! category = "shopping"
//!
//! [[engines]]
//! name = "wikipedia"
//! paging = true
//! send_accept_language_header = true
//! ```

use crate::error::{MetasearchError, Result};
use metasearch_core::{EngineSettings, SearchSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Complete configuration of a metasearch instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetasearchConfig {
    /// Category searched when the caller names none.
    pub default_category: String,
    /// Sitelinks and suspension settings.
    pub search: SearchSettings,
    /// Configured engines, in dispatch order.
    pub engines: Vec<EngineSettings>,
}

impl Default for MetasearchConfig {
    fn default() -> Self {
        Self {
            default_category: "general".to_owned(),
            search: SearchSettings::default(),
            engines: default_engines(),
        }
    }
}

/// DuckDuckGo, Bing and Wikipedia with the features each supports.
fn default_engines() -> Vec<EngineSettings> {
    vec![
        EngineSettings {
            time_range_support: true,
            ..EngineSettings::named("duckduckgo")
        },
        EngineSettings {
            paging: true,
            ..EngineSettings::named("bing")
        },
        EngineSettings {
            paging: true,
            send_accept_language_header: true,
            timeout_seconds: 2.0,
            ..EngineSettings::named("wikipedia")
        },
    ]
}

impl MetasearchConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MetasearchError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MetasearchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/metasearch/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("metasearch").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("metasearch")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/metasearch-config/config.toml")
        }
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `default_category` must not be empty
    /// - search settings and every engine are valid on their own
    /// - engine names are unique
    pub fn validate(&self) -> Result<()> {
        if self.default_category.trim().is_empty() {
            return Err(MetasearchError::Config(
                "default_category must not be empty".into(),
            ));
        }
        self.search.validate()?;

        let mut seen = HashSet::new();
        for engine in &self.engines {
            engine.validate()?;
            if !seen.insert(engine.name.as_str()) {
                return Err(MetasearchError::Config(format!(
                    "duplicate engine name {:?}",
                    engine.name
                )));
            }
        }
        Ok(())
    }

    /// Enabled engines serving `category`.
    pub fn engines_for<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a EngineSettings> {
        self.engines
            .iter()
            .filter(move |e| !e.disabled && e.serves(category))
    }
}
