//! Bing web search.
//!
//! Plain `GET` against `https://www.bing.com/search`; `first` is the 1-based
//! offset of the requested page and the adult filter travels both as the
//! `adlt` parameter and the `SRCHHPGUSR` cookie.

use crate::engine::EngineAdapter;
use crate::error::SearchError;
use crate::http::RawResponse;
use crate::params::RequestParams;
use crate::types::{SafeSearch, SearchResult};
use super::{selector, trimmed_text};
use scraper::Html;
use url::Url;

const SEARCH_URL: &str = "https://www.bing.com/search";
const RESULTS_PER_PAGE: u32 = 10;

const ORGANIC: &str = "li.b_algo";
const HEADING: &str = "h2";
const ANCHOR: &str = "a";
const CAPTION: &str = ".b_caption p, .b_lineclamp2";
const REQUERY: &str = "#sp_requery a";

/// Adapter for Bing's HTML results page.
#[derive(Debug, Default, Clone, Copy)]
pub struct BingEngine;

fn safesearch_value(level: SafeSearch) -> &'static str {
    match level {
        SafeSearch::Off => "off",
        SafeSearch::Moderate => "moderate",
        SafeSearch::Strict => "strict",
    }
}

impl EngineAdapter for BingEngine {
    fn kind(&self) -> &'static str {
        "bing"
    }

    fn request(&self, query: &str, params: &mut RequestParams) {
        let first = params
            .pageno
            .saturating_sub(1)
            .saturating_mul(RESULTS_PER_PAGE)
            .saturating_add(1);
        let language = params
            .locale
            .as_ref()
            .map_or_else(|| "en".to_owned(), |l| l.language.clone());
        let adult = safesearch_value(params.safesearch);

        let mut pairs = vec![
            ("q", query.to_owned()),
            ("pq", query.to_owned()),
            ("setlang", language),
            ("adlt", adult.to_owned()),
        ];
        if first > 1 {
            pairs.push(("first", first.to_string()));
            pairs.push(("FORM", "PERE".to_owned()));
        }

        match Url::parse_with_params(SEARCH_URL, &pairs) {
            Ok(url) => params.url = url.into(),
            Err(e) => tracing::warn!(error = %e, "cannot build Bing URL"),
        }
        params.set_header("Accept", "text/html,application/xhtml+xml");
        params.cookies.insert(
            "SRCHHPGUSR".into(),
            format!("ADLT={}", adult.to_uppercase()),
        );
    }

    fn response(
        &self,
        response: &RawResponse,
        _params: &RequestParams,
    ) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(bytes = response.body.len(), "Bing response received");
        parse_bing_html(&response.text())
    }
}

/// Organic results, then "including results for" suggestions.
fn parse_bing_html(html: &str) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);
    let organic = selector(ORGANIC)?;
    let heading = selector(HEADING)?;
    let anchor = selector(ANCHOR)?;
    let caption = selector(CAPTION)?;

    let mut results: Vec<SearchResult> = document
        .select(&organic)
        .filter_map(|item| {
            let h2 = item.select(&heading).next()?;
            let title = trimmed_text(h2);
            let href = h2
                .select(&anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
                .filter(|href| !href.is_empty())?;
            if title.is_empty() {
                return None;
            }
            let content = item
                .select(&caption)
                .next()
                .map(trimmed_text)
                .unwrap_or_default();
            Some(SearchResult::new(href, title, content, "bing"))
        })
        .collect();

    results.extend(
        document
            .select(&selector(REQUERY)?)
            .map(trimmed_text)
            .filter(|text| !text.is_empty())
            .map(|text| SearchResult::suggestion(text, "bing")),
    );

    tracing::debug!(count = results.len(), "Bing results parsed");
    Ok(results)
}
