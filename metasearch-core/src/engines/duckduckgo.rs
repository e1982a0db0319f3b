//! DuckDuckGo over its JavaScript-free HTML endpoint.
//!
//! The query is POSTed as a form to `https://html.duckduckgo.com/html/`.
//! Region, safe search and time range map onto the `kl`, `kp` and `df`
//! form fields. Result links come wrapped in a `/l/?uddg=` redirect.

use crate::engine::EngineAdapter;
use crate::error::{EngineChallenge, SearchError};
use crate::http::RawResponse;
use crate::params::{Method, RequestParams};
use crate::types::{Locale, SafeSearch, SearchResult, TimeRange};
use super::{selector, trimmed_text};
use scraper::Html;
use url::Url;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

const CHALLENGE: &str = "form#challenge-form, .anomaly-modal__modal";
const ORGANIC: &str =
    ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)";
const TITLE_LINK: &str = ".result__a";
const SNIPPET: &str = ".result__snippet";
const DID_YOU_MEAN: &str = "#did_you_mean a";

/// Adapter for DuckDuckGo's HTML results page.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDuckGoEngine;

/// Unwrap `//duckduckgo.com/l/?uddg=<target>&rut=...` into `<target>`;
/// other links pass through with a scheme added if missing.
fn resolve_redirect(href: &str) -> Option<String> {
    let absolute = match href.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => href.to_owned(),
    };
    let parsed = Url::parse(&absolute).ok()?;

    let is_redirect =
        parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/");
    if !is_redirect {
        return Some(absolute);
    }
    parsed
        .query_pairs()
        .find_map(|(key, value)| (key == "uddg").then(|| value.into_owned()))
}

/// `kl` region code: `us-en` for `en-US`, `wt-wt` (no region) otherwise.
fn region(locale: Option<&Locale>) -> String {
    match locale {
        Some(Locale {
            language,
            territory: Some(territory),
        }) => format!("{}-{}", territory.to_lowercase(), language.to_lowercase()),
        _ => "wt-wt".to_owned(),
    }
}

fn safesearch_value(level: SafeSearch) -> &'static str {
    match level {
        SafeSearch::Off => "-2",
        SafeSearch::Moderate => "-1",
        SafeSearch::Strict => "1",
    }
}

fn time_range_value(range: TimeRange) -> &'static str {
    match range {
        TimeRange::Day => "d",
        TimeRange::Week => "w",
        TimeRange::Month => "m",
        TimeRange::Year => "y",
    }
}

impl EngineAdapter for DuckDuckGoEngine {
    fn kind(&self) -> &'static str {
        "duckduckgo"
    }

    fn request(&self, query: &str, params: &mut RequestParams) {
        params.method = Method::Post;
        params.url = SEARCH_URL.to_owned();

        let region = region(params.locale.as_ref());
        let kp = safesearch_value(params.safesearch);
        let form = &mut params.data;
        form.insert("q".into(), query.to_owned());
        form.insert("b".into(), String::new());
        form.insert("kl".into(), region);
        form.insert("kp".into(), kp.to_owned());
        if let Some(range) = params.time_range {
            form.insert("df".into(), time_range_value(range).to_owned());
        }

        params.set_header("Content-Type", "application/x-www-form-urlencoded");
        params.set_header("Referer", "https://html.duckduckgo.com/");
    }

    fn response(
        &self,
        response: &RawResponse,
        _params: &RequestParams,
    ) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(bytes = response.body.len(), "DuckDuckGo response received");
        parse_duckduckgo_html(&response.text())
    }
}

/// Results, then `did_you_mean` suggestions, from a results page.
pub(crate) fn parse_duckduckgo_html(html: &str) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);

    if document.select(&selector(CHALLENGE)?).next().is_some() {
        return Err(EngineChallenge::captcha("DuckDuckGo anomaly challenge").into());
    }

    let organic = selector(ORGANIC)?;
    let title_link = selector(TITLE_LINK)?;
    let snippet = selector(SNIPPET)?;

    let mut results: Vec<SearchResult> = document
        .select(&organic)
        .filter_map(|block| {
            let link = block.select(&title_link).next()?;
            let title = trimmed_text(link);
            if title.is_empty() {
                return None;
            }
            let url = resolve_redirect(link.value().attr("href")?)?;
            let content = block
                .select(&snippet)
                .next()
                .map(trimmed_text)
                .unwrap_or_default();
            Some(SearchResult::new(url, title, content, "duckduckgo"))
        })
        .collect();

    results.extend(
        document
            .select(&selector(DID_YOU_MEAN)?)
            .map(trimmed_text)
            .filter(|text| !text.is_empty())
            .map(|text| SearchResult::suggestion(text, "duckduckgo")),
    );

    tracing::debug!(count = results.len(), "DuckDuckGo results parsed");
    Ok(results)
}
