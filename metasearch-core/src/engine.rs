//! Trait definition for pluggable search engine adapters.
//!
//! An adapter owns everything engine-specific and nothing else: it rewrites
//! the outbound [`RequestParams`] and parses the [`RawResponse`]. HTTP,
//! timeouts, failure handling and sitelinks stay in the orchestrator.

use crate::error::SearchError;
use crate::http::RawResponse;
use crate::params::RequestParams;
use crate::types::SearchResult;

/// A pluggable search engine backend.
///
/// Implementors handle their own:
///
/// - URL construction with query encoding, method and body selection
/// - Engine-specific headers and cookies
/// - Response parsing (HTML via CSS selectors, JSON, ...)
/// - Recognising CAPTCHA / rate-limit pages and reporting them as
///   [`crate::error::EngineChallenge`]
///
/// All implementations must be `Send + Sync` for concurrent invocations.
pub trait EngineAdapter: Send + Sync {
    /// Adapter key used for configuration lookup (`"duckduckgo"`).
    fn kind(&self) -> &'static str;

    /// Rewrite `params` for `query`. Must set `params.url`; leaving it empty
    /// skips dispatch and yields no results.
    fn request(&self, query: &str, params: &mut RequestParams);

    /// Parse a response into results.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Parse`] for unparseable bodies and
    /// [`SearchError::Engine`] when the engine refused to answer.
    fn response(
        &self,
        response: &RawResponse,
        params: &RequestParams,
    ) -> Result<Vec<SearchResult>, SearchError>;
}
