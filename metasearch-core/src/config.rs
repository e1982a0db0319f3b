//! Engine and search settings with sensible defaults.
//!
//! [`EngineSettings`] describes one configured engine (which adapter it uses,
//! which categories it serves, what it supports). [`SearchSettings`] holds
//! the instance-wide knobs: forced sitelinks and suspension backoff.
//! Both deserialize with `#[serde(default)]` so partial TOML files work.

use crate::error::SearchError;
use crate::sitelinks::ForceSitelinkSite;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of a single engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Unique display name (`"duckduckgo"`, `"wikipedia de"`).
    pub name: String,
    /// Adapter to use, looked up with [`crate::engines::adapter_for`].
    /// Defaults to `name` when empty.
    pub engine: String,
    /// Categories this engine answers for.
    pub categories: Vec<String>,
    /// Per-invocation time budget in seconds.
    pub timeout_seconds: f64,
    /// Whether the engine supports `pageno > 1`.
    pub paging: bool,
    /// Highest page the engine serves; 0 means unlimited.
    pub max_page: u32,
    /// Whether the engine supports time range restriction.
    pub time_range_support: bool,
    /// Send an `Accept-Language` header derived from the query locale.
    pub send_accept_language_header: bool,
    /// Disabled engines are never dispatched.
    pub disabled: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            engine: String::new(),
            categories: vec!["general".to_owned()],
            timeout_seconds: 3.0,
            paging: false,
            max_page: 0,
            time_range_support: false,
            send_accept_language_header: false,
            disabled: false,
        }
    }
}

impl EngineSettings {
    /// Settings for `name` using the adapter of the same name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            engine: name.clone(),
            name,
            ..Default::default()
        }
    }

    /// The adapter key, falling back to `name`.
    pub fn engine_kind(&self) -> &str {
        if self.engine.is_empty() {
            &self.name
        } else {
            &self.engine
        }
    }

    /// The per-invocation time budget. Invalid values yield a zero budget.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::ZERO)
    }

    /// Whether this engine serves `category`.
    pub fn serves(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `name` must not be empty
    /// - `timeout_seconds` must be finite and greater than 0
    /// - `categories` must not be empty
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.name.trim().is_empty() {
            return Err(SearchError::Config("engine name must not be empty".into()));
        }
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(SearchError::Config(format!(
                "engine {}: timeout_seconds must be greater than 0",
                self.name
            )));
        }
        if self.categories.is_empty() {
            return Err(SearchError::Config(format!(
                "engine {}: at least one category is required",
                self.name
            )));
        }
        Ok(())
    }
}

/// Instance-wide search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Categories in which sitelink enrichment runs.
    pub force_sitelinks_categories: Vec<String>,
    /// Sites whose matching result gets sitelinks.
    pub force_sitelink_websites: Vec<ForceSitelinkSite>,
    /// Suspension step per consecutive failure, in seconds.
    pub ban_time_on_fail_seconds: u64,
    /// Upper bound of the failure-driven suspension, in seconds.
    pub max_ban_time_on_fail_seconds: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            force_sitelinks_categories: Vec::new(),
            force_sitelink_websites: Vec::new(),
            ban_time_on_fail_seconds: 5,
            max_ban_time_on_fail_seconds: 120,
        }
    }
}

impl SearchSettings {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - every sitelink site has a compilable URL expression and at least one search term
    /// - `ban_time_on_fail_seconds` must be <= `max_ban_time_on_fail_seconds`
    pub fn validate(&self) -> Result<(), SearchError> {
        for site in &self.force_sitelink_websites {
            site.validate()?;
        }
        if self.ban_time_on_fail_seconds > self.max_ban_time_on_fail_seconds {
            return Err(SearchError::Config(
                "ban_time_on_fail_seconds must be <= max_ban_time_on_fail_seconds".into(),
            ));
        }
        Ok(())
    }

    /// Whether sitelink enrichment is configured at all.
    pub fn sitelinks_enabled(&self) -> bool {
        !self.force_sitelinks_categories.is_empty() && !self.force_sitelink_websites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(expr: &str, terms: &[&str]) -> ForceSitelinkSite {
        ForceSitelinkSite {
            url_expression: expr.into(),
            search_terms: terms.iter().map(|t| (*t).to_owned()).collect(),
            category: "shopping".into(),
        }
    }

    #[test]
    fn default_engine_settings() {
        let settings = EngineSettings::named("bing");
        assert_eq!(settings.name, "bing");
        assert_eq!(settings.engine_kind(), "bing");
        assert_eq!(settings.categories, vec!["general".to_owned()]);
        assert_eq!(settings.timeout(), Duration::from_secs(3));
        assert!(!settings.paging);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn engine_kind_falls_back_to_name() {
        let settings = EngineSettings {
            name: "wikipedia".into(),
            ..Default::default()
        };
        assert_eq!(settings.engine_kind(), "wikipedia");

        let settings = EngineSettings {
            name: "wikipedia de".into(),
            engine: "wikipedia".into(),
            ..Default::default()
        };
        assert_eq!(settings.engine_kind(), "wikipedia");
    }

    #[test]
    fn engine_serves_categories() {
        let settings = EngineSettings {
            categories: vec!["general".into(), "shopping".into()],
            ..EngineSettings::named("bing")
        };
        assert!(settings.serves("shopping"));
        assert!(!settings.serves("images"));
    }

    #[test]
    fn empty_name_rejected() {
        let err = EngineSettings::default().validate().unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn bad_timeout_rejected() {
        for timeout in [0.0, -1.0, f64::NAN] {
            let settings = EngineSettings {
                timeout_seconds: timeout,
                ..EngineSettings::named("bing")
            };
            let err = settings.validate().unwrap_err();
            assert!(err.to_string().contains("timeout_seconds"));
        }
    }

    #[test]
    fn empty_categories_rejected() {
        let settings = EngineSettings {
            categories: vec![],
            ..EngineSettings::named("bing")
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("category"));
    }

    #[test]
    fn default_search_settings() {
        let settings = SearchSettings::default();
        assert!(!settings.sitelinks_enabled());
        assert_eq!(settings.ban_time_on_fail_seconds, 5);
        assert_eq!(settings.max_ban_time_on_fail_seconds, 120);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn sitelinks_need_both_lists() {
        let mut settings = SearchSettings {
            force_sitelinks_categories: vec!["shopping".into()],
            ..Default::default()
        };
        assert!(!settings.sitelinks_enabled());
        settings.force_sitelink_websites = vec![site(r".*store\.example\.com.*", &["size"])];
        assert!(settings.sitelinks_enabled());
        settings.force_sitelinks_categories.clear();
        assert!(!settings.sitelinks_enabled());
    }

    #[test]
    fn invalid_site_expression_rejected() {
        let settings = SearchSettings {
            force_sitelinks_categories: vec!["shopping".into()],
            force_sitelink_websites: vec![site("(unclosed", &["size"])],
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("url expression"));
    }

    #[test]
    fn ban_range_rejected() {
        let settings = SearchSettings {
            ban_time_on_fail_seconds: 300,
            max_ban_time_on_fail_seconds: 60,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("ban_time_on_fail"));
    }

    #[test]
    fn search_settings_deserialize_partial() {
        let json = r#"{
            "force_sitelinks_categories": ["shopping"],
            "force_sitelink_websites": [
                {"website_url_expression": ".*store\\.example\\.com.*",
                 "website_search_terms": ["size"],
                 "category": "shopping"}
            ]
        }"#;
        let settings: SearchSettings = serde_json::from_str(json).expect("deserialize");
        assert!(settings.sitelinks_enabled());
        assert_eq!(settings.ban_time_on_fail_seconds, 5);
        assert_eq!(settings.force_sitelink_websites[0].search_terms, vec!["size"]);
    }
}
