//! Wikipedia full-text search through the MediaWiki API.
//!
//! The wiki is picked from the query locale (`de` → `de.wikipedia.org`).
//! The API's spelling suggestion is returned as a URL-less entry.

use crate::engine::EngineAdapter;
use crate::error::SearchError;
use crate::http::RawResponse;
use crate::params::RequestParams;
use crate::types::SearchResult;
use scraper::Html;
use serde::Deserialize;
use url::Url;

const RESULTS_PER_PAGE: u32 = 10;

/// Wikipedia JSON API adapter.
#[derive(Debug, Default, Clone, Copy)]
pub struct WikipediaEngine;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    searchinfo: Option<SearchInfo>,
    #[serde(default)]
    search: Vec<ApiHit>,
}

#[derive(Debug, Deserialize)]
struct SearchInfo {
    #[serde(default)]
    suggestion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

/// Wiki language of `params`, `en` unless the locale names a plausible one.
fn wiki_language(params: &RequestParams) -> String {
    params
        .locale
        .as_ref()
        .map(|l| l.language.to_lowercase())
        .filter(|lang| !lang.is_empty() && lang.chars().all(|c| c.is_ascii_alphabetic() || c == '-'))
        .unwrap_or_else(|| "en".to_owned())
}

/// `https://<lang>.wikipedia.org/wiki/<Title_With_Underscores>`.
fn article_url(language: &str, title: &str) -> Option<String> {
    let mut url = Url::parse(&format!("https://{language}.wikipedia.org/wiki/")).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push(&title.replace(' ', "_"));
    Some(url.into())
}

/// The API snippet is HTML with `<span class="searchmatch">` highlights.
fn strip_tags(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
        .trim()
        .to_string()
}

impl EngineAdapter for WikipediaEngine {
    fn kind(&self) -> &'static str {
        "wikipedia"
    }

    fn request(&self, query: &str, params: &mut RequestParams) {
        let language = wiki_language(params);
        let offset = params.pageno.saturating_sub(1).saturating_mul(RESULTS_PER_PAGE);
        let endpoint = format!("https://{language}.wikipedia.org/w/api.php");
        let pairs = [
            ("action", "query".to_owned()),
            ("list", "search".to_owned()),
            ("format", "json".to_owned()),
            ("srsearch", query.to_owned()),
            ("srprop", "snippet".to_owned()),
            ("srinfo", "suggestion".to_owned()),
            ("srlimit", RESULTS_PER_PAGE.to_string()),
            ("sroffset", offset.to_string()),
            ("utf8", "1".to_owned()),
        ];
        match Url::parse_with_params(&endpoint, &pairs) {
            Ok(url) => params.url = url.into(),
            Err(e) => tracing::warn!(%language, error = %e, "cannot build Wikipedia URL"),
        }
        params.set_header("Accept", "application/json");
    }

    fn response(
        &self,
        response: &RawResponse,
        params: &RequestParams,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let body: ApiResponse = response.json()?;
        let Some(query) = body.query else {
            return Ok(Vec::new());
        };

        let language = wiki_language(params);
        let mut results: Vec<SearchResult> = query
            .search
            .into_iter()
            .filter_map(|hit| {
                let url = article_url(&language, &hit.title)?;
                Some(SearchResult::new(url, hit.title, strip_tags(&hit.snippet), "wikipedia"))
            })
            .collect();

        if let Some(suggestion) = query
            .searchinfo
            .and_then(|info| info.suggestion)
            .filter(|s| !s.trim().is_empty())
        {
            results.push(SearchResult::suggestion(suggestion, "wikipedia"));
        }

        tracing::debug!(count = results.len(), "Wikipedia results parsed");
        Ok(results)
    }
}
