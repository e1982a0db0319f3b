//! Outbound request parameters and the per-search builder.
//!
//! Every invocation starts from [`RequestParams::default`], a fresh value,
//! so nothing an engine writes into its params can leak into the next call.

use crate::config::EngineSettings;
use crate::http::random_user_agent;
use crate::types::{Locale, SafeSearch, SearchQuery, TimeRange};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// HTTP method of the outbound request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// `GET`, the default.
    #[default]
    Get,
    /// `POST`, with one of the body variants attached.
    Post,
}

/// Override of the transport's TLS verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verify {
    /// Accept any server certificate.
    Disabled,
    /// Trust the PEM bundle at this path in addition to the system roots.
    CaBundle(PathBuf),
}

/// Credentials attached to the outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Auth {
    /// HTTP basic authentication.
    Basic {
        /// User name.
        username: String,
        /// Password, if any.
        password: Option<String>,
    },
    /// `Authorization: Bearer <token>`.
    Bearer(String),
}

/// Request parameters of one engine invocation.
///
/// Built by [`build_request_params`], rewritten in place by the engine
/// adapter, then handed to dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestParams {
    /// HTTP method.
    pub method: Method,
    /// Header name to value. Lookups through [`RequestParams::header`] are
    /// case-insensitive.
    pub headers: BTreeMap<String, String>,
    /// Form-encoded body (POST only).
    pub data: BTreeMap<String, String>,
    /// JSON body (POST only).
    pub json: Option<serde_json::Value>,
    /// Raw body (POST only).
    pub content: Vec<u8>,
    /// Target URL. Left empty by the adapter to skip dispatch.
    pub url: String,
    /// Cookies sent with the request.
    pub cookies: BTreeMap<String, String>,
    /// Follow redirects.
    pub allow_redirects: bool,
    /// Hard redirect limit; 0 keeps the transport default.
    pub max_redirects: u32,
    /// Advisory redirect limit; exceeding it records a secondary incident.
    pub soft_max_redirects: u32,
    /// TLS verification override, `None` keeps the transport default.
    pub verify: Option<Verify>,
    /// Credentials, if any.
    pub auth: Option<Auth>,
    /// Fail on HTTP status codes >= 300.
    pub raise_for_httperror: bool,

    /// Query text the request is built for.
    pub query: String,
    /// Category the search runs in.
    pub category: String,
    /// 1-based page number.
    pub pageno: u32,
    /// Safe search level.
    pub safesearch: SafeSearch,
    /// Time window restriction.
    pub time_range: Option<TimeRange>,
    /// Query locale.
    pub locale: Option<Locale>,
    /// Engine-private data carried between pages.
    pub engine_data: BTreeMap<String, String>,
}

impl Default for RequestParams {
    fn default() -> Self {
        Self {
            method: Method::Get,
            headers: BTreeMap::new(),
            data: BTreeMap::new(),
            json: None,
            content: Vec::new(),
            url: String::new(),
            cookies: BTreeMap::new(),
            allow_redirects: false,
            max_redirects: 0,
            soft_max_redirects: 0,
            verify: None,
            auth: None,
            raise_for_httperror: true,
            query: String::new(),
            category: String::new(),
            pageno: 1,
            safesearch: SafeSearch::default(),
            time_range: None,
            locale: None,
            engine_data: BTreeMap::new(),
        }
    }
}

impl RequestParams {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing one regardless of case.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_owned(), value.into());
    }
}

/// `Accept-Language` value for `locale`.
///
/// `"<lang>-<territory>,<lang>;q=0.9,*;q=0.5"` with a territory, the bare
/// language otherwise.
pub fn accept_language(locale: &Locale) -> String {
    match &locale.territory {
        Some(territory) => format!(
            "{lang}-{territory},{lang};q=0.9,*;q=0.5",
            lang = locale.language
        ),
        None => locale.language.clone(),
    }
}

/// Build the request parameters of one engine for `query` in `category`.
///
/// Returns `None` when the engine cannot serve the query (paging, page limit
/// or time range unsupported); the engine is then skipped silently.
pub fn build_request_params(
    query: &SearchQuery,
    category: &str,
    engine: &EngineSettings,
) -> Option<RequestParams> {
    if query.pageno > 1 && !engine.paging {
        return None;
    }
    if engine.max_page > 0 && query.pageno > engine.max_page {
        return None;
    }
    if query.time_range.is_some() && !engine.time_range_support {
        return None;
    }

    let mut params = RequestParams {
        query: query.query.clone(),
        category: category.to_owned(),
        pageno: query.pageno,
        safesearch: query.safesearch,
        time_range: query.time_range,
        locale: query.locale.clone(),
        ..RequestParams::default()
    };

    params.set_header("User-Agent", random_user_agent());

    if engine.send_accept_language_header {
        if let Some(locale) = &query.locale {
            params.set_header("Accept-Language", accept_language(locale));
        }
    }

    tracing::debug!(
        engine = %engine.name,
        accept_language = params.header("Accept-Language").unwrap_or(""),
        "HTTP Accept-Language"
    );
    Some(params)
}
