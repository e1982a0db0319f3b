//! Forced sitelinks: which results get enriched, and how nested results are pruned.
//!
//! For every configured site, the first primary result whose URL matches the
//! site's expression gets a `sitelinks` list, produced by a second search for
//! `"<query> <first search term>"` in the reserved [`SITELINKS_CATEGORY`].
//! The reserved category is never eligible itself, which bounds the nesting
//! depth to one.
//!
//! This module is pure: it decides *what* to enrich. The nested dispatch lives
//! in [`crate::processor::OnlineProcessor`].

use crate::config::SearchSettings;
use crate::error::SearchError;
use crate::types::SearchResult;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category used by nested sitelink searches. Never enriched.
pub const SITELINKS_CATEGORY: &str = "sitelinks";

/// One site that should get sitelinks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceSitelinkSite {
    /// Regular expression matched against the start of result URLs.
    #[serde(alias = "website_url_expression")]
    pub url_expression: String,
    /// Terms appended to the query for the nested search; the first is used.
    #[serde(alias = "website_search_terms")]
    pub search_terms: Vec<String>,
    /// Informational category label of the site.
    #[serde(default)]
    pub category: String,
}

impl ForceSitelinkSite {
    /// Compile the match expression: the URL expression wrapped in a
    /// capturing group and anchored at the start of the URL.
    pub fn compile(&self) -> Result<Regex, SearchError> {
        Regex::new(&format!("^({})", self.url_expression)).map_err(|e| {
            SearchError::Config(format!(
                "invalid sitelink url expression {:?}: {e}",
                self.url_expression
            ))
        })
    }

    /// Checks the expression compiles and at least one search term exists.
    pub fn validate(&self) -> Result<(), SearchError> {
        self.compile()?;
        if self.search_terms.iter().all(|t| t.trim().is_empty()) {
            return Err(SearchError::Config(format!(
                "sitelink site {:?} needs at least one search term",
                self.url_expression
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct CompiledSite {
    pattern: Regex,
    search_terms: Vec<String>,
    category: String,
}

/// A result selected for enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitelinkTarget {
    /// Index of the primary result to enrich.
    pub result_index: usize,
    /// Term appended to the query for the nested search.
    pub search_term: String,
    /// Category label of the matched site.
    pub site_category: String,
}

/// Compiled sitelink configuration, shared read-only by all invocations.
#[derive(Debug, Clone, Default)]
pub struct SitelinkRules {
    categories: Vec<String>,
    sites: Vec<CompiledSite>,
}

impl SitelinkRules {
    /// Rules that never enrich anything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Compile the sitelink part of `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if a site expression does not compile
    /// or a site has no search term.
    pub fn compile(settings: &SearchSettings) -> Result<Self, SearchError> {
        if !settings.sitelinks_enabled() {
            return Ok(Self::disabled());
        }
        let mut sites = Vec::with_capacity(settings.force_sitelink_websites.len());
        for site in &settings.force_sitelink_websites {
            site.validate()?;
            sites.push(CompiledSite {
                pattern: site.compile()?,
                search_terms: site
                    .search_terms
                    .iter()
                    .filter(|t| !t.trim().is_empty())
                    .cloned()
                    .collect(),
                category: site.category.clone(),
            });
        }
        Ok(Self {
            categories: settings.force_sitelinks_categories.clone(),
            sites,
        })
    }

    /// Whether both the category and site lists are non-empty.
    pub fn is_enabled(&self) -> bool {
        !self.categories.is_empty() && !self.sites.is_empty()
    }

    /// Whether searches in `category` may be enriched.
    pub fn allows_category(&self, category: &str) -> bool {
        category != SITELINKS_CATEGORY && self.categories.iter().any(|c| c == category)
    }

    /// Decide which results to enrich, in site order.
    ///
    /// Per site: skipped when the category is not allowed or the query
    /// already contains one of the site's terms; otherwise the first result
    /// whose URL matches is selected.
    pub fn plan(&self, category: &str, query: &str, results: &[SearchResult]) -> Vec<SitelinkTarget> {
        if !self.is_enabled() || !self.allows_category(category) {
            return Vec::new();
        }

        let mut targets = Vec::new();
        for site in &self.sites {
            if site.search_terms.iter().any(|term| query.contains(term.as_str())) {
                continue;
            }
            let Some(search_term) = site.search_terms.first() else {
                continue;
            };
            if let Some(result_index) = results
                .iter()
                .position(|r| site.pattern.is_match(r.url_str()))
            {
                targets.push(SitelinkTarget {
                    result_index,
                    search_term: search_term.clone(),
                    site_category: site.category.clone(),
                });
            }
        }
        targets
    }
}

/// Turn nested search results into sitelinks.
///
/// Drops the first entry (assumed to be the enriched result itself), then
/// every entry without a URL. An engine whose first nested hit is a
/// different page loses that page.
pub fn prune_sitelink_results(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    if !results.is_empty() {
        results.remove(0);
    }
    results.retain(|r| r.url.is_some());
    results
}
