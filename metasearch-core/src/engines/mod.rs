//! Search engine adapters.
//!
//! Each module provides a struct implementing [`crate::engine::EngineAdapter`]
//! for one remote search source. Configuration selects adapters by key
//! through [`adapter_for`].

pub mod bing;
pub mod duckduckgo;
pub mod wikipedia;

pub use bing::BingEngine;
pub use duckduckgo::DuckDuckGoEngine;
pub use wikipedia::WikipediaEngine;

use crate::engine::EngineAdapter;
use crate::error::SearchError;
use scraper::{ElementRef, Selector};
use std::sync::Arc;

/// Adapter keys known to [`adapter_for`].
pub const BUILTIN_ENGINES: &[&str] = &["duckduckgo", "bing", "wikipedia"];

/// The built-in adapter for `kind`, if any.
pub fn adapter_for(kind: &str) -> Option<Arc<dyn EngineAdapter>> {
    match kind {
        "duckduckgo" => Some(Arc::new(DuckDuckGoEngine)),
        "bing" => Some(Arc::new(BingEngine)),
        "wikipedia" => Some(Arc::new(WikipediaEngine)),
        _ => None,
    }
}

/// Parse a CSS selector used by an HTML engine.
pub(crate) fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector {css:?}: {e:?}")))
}

/// All text below `element`, trimmed.
pub(crate) fn trimmed_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}
