//! HTTP transport capability and the default reqwest-backed implementation.
//!
//! The orchestrator only talks to a [`Transport`]: `get`/`post` with
//! [`RequestOptions`], returning a [`RawResponse`] that carries status,
//! headers, body, final URL and redirect history. Transports must report
//! TLS failures, timeouts and everything else as distinct
//! [`TransportError`] variants.

use crate::error::{SearchError, TransportError};
use crate::incident::IncidentContext;
use crate::params::{Auth, Verify};
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Desktop browser User-Agents sent with engine requests.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:136.0) Gecko/20100101 Firefox/136.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:136.0) Gecko/20100101 Firefox/136.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.3 Safari/605.1.15",
];

/// Redirect limit used when a request does not set one.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

/// A User-Agent picked at random for one request.
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Body of a POST request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded`.
    Form(BTreeMap<String, String>),
    /// `application/json`.
    Json(serde_json::Value),
    /// Raw bytes.
    Raw(Vec<u8>),
}

/// Per-request options. `None` means "use the transport default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// Cookies, sent as a single `Cookie` header.
    pub cookies: BTreeMap<String, String>,
    /// Credentials.
    pub auth: Option<Auth>,
    /// TLS verification override.
    pub verify: Option<Verify>,
    /// Follow redirects.
    pub allow_redirects: Option<bool>,
    /// Hard redirect limit.
    pub max_redirects: Option<u32>,
    /// Total time allowed for this request.
    pub timeout: Option<Duration>,
    /// POST body.
    pub body: Option<RequestBody>,
}

/// A response as returned by a [`Transport`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase (`"OK"`), empty if unknown.
    pub reason: String,
    /// Final URL after redirects.
    pub url: String,
    /// Response headers in wire order.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
    /// URLs of the responses that redirected, oldest first.
    pub history: Vec<String>,
}

impl RawResponse {
    /// A response with `status`, final `url` and `body`.
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: reason_phrase(status).to_owned(),
            url: url.into(),
            headers: Vec::new(),
            body: body.into(),
            history: Vec::new(),
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the redirect history.
    pub fn with_history<I, S>(mut self, history: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.history = history.into_iter().map(Into::into).collect();
        self
    }

    /// Case-insensitive header lookup (first match).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Host of the final URL, empty if it cannot be parsed.
    pub fn host(&self) -> String {
        Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_owned))
            .unwrap_or_default()
    }

    /// Body decoded as UTF-8, invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Parse`] if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SearchError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| SearchError::Parse(format!("invalid JSON response: {e}")))
    }

    /// `(status, reason, host)` for incidents.
    pub fn context(&self) -> IncidentContext {
        IncidentContext {
            status_code: Some(self.status),
            reason: self.reason.clone(),
            hostname: self.host(),
        }
    }
}

/// Injected HTTP capability.
///
/// All implementations must be `Send + Sync` so one transport can serve
/// concurrent engine invocations.
pub trait Transport: Send + Sync {
    /// Send a `GET` request.
    fn get(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;

    /// Send a `POST` request with `options.body`.
    fn post(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn get(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        (**self).get(url, options)
    }

    fn post(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send {
        (**self).post(url, options)
    }
}

/// [`Transport`] backed by [`reqwest`].
///
/// A client is built per request because the redirect policy and TLS
/// verification are client-level settings in reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    default_max_redirects: u32,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self {
            default_max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ReqwestTransport {
    /// Transport with the default redirect limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the redirect limit used when a request sets none.
    pub fn with_default_max_redirects(mut self, max_redirects: u32) -> Self {
        self.default_max_redirects = max_redirects;
        self
    }

    /// Build a [`reqwest::Client`] for one request.
    ///
    /// The client has:
    /// - Cookie store enabled (cookies set during redirects are kept)
    /// - A redirect policy recording every followed hop into `history`
    /// - The TLS verification override, if any
    fn build_client(
        &self,
        options: &RequestOptions,
        history: Arc<Mutex<Vec<String>>>,
    ) -> Result<reqwest::Client, TransportError> {
        let policy = if options.allow_redirects == Some(false) {
            reqwest::redirect::Policy::none()
        } else {
            let max = options.max_redirects.unwrap_or(self.default_max_redirects) as usize;
            reqwest::redirect::Policy::custom(move |attempt| {
                if attempt.previous().len() > max {
                    attempt.error(format!("too many redirects (maximum: {max})"))
                } else {
                    *history.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
                        attempt.previous().iter().map(Url::to_string).collect();
                    attempt.follow()
                }
            })
        };

        let mut builder = reqwest::Client::builder().cookie_store(true).redirect(policy);

        match &options.verify {
            Some(Verify::Disabled) => {
                builder = builder.danger_accept_invalid_certs(true);
            }
            Some(Verify::CaBundle(path)) => {
                let pem = std::fs::read(path).map_err(|e| TransportError::Tls {
                    message: format!("cannot read CA bundle {}: {e}", path.display()),
                })?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| TransportError::Tls {
                    message: format!("invalid CA bundle {}: {e}", path.display()),
                })?;
                builder = builder.add_root_certificate(cert);
            }
            None => {}
        }

        builder
            .build()
            .map_err(|e| TransportError::http(format!("failed to build HTTP client: {e}")))
    }

    async fn execute(
        &self,
        method: reqwest::Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<RawResponse, TransportError> {
        let history = Arc::new(Mutex::new(Vec::new()));
        let client = self.build_client(options, Arc::clone(&history))?;

        let mut request = client.request(method, url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !options.cookies.is_empty() {
            request = request.header(reqwest::header::COOKIE, cookie_header(&options.cookies));
        }
        request = match &options.auth {
            Some(Auth::Basic { username, password }) => {
                request.basic_auth(username, password.as_ref())
            }
            Some(Auth::Bearer(token)) => request.bearer_auth(token),
            None => request,
        };
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        request = match &options.body {
            Some(RequestBody::Form(data)) => request.form(data),
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Raw(bytes)) => request.body(bytes.clone()),
            None => request,
        };

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_owned(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?.to_vec();
        let history = std::mem::take(
            &mut *history.lock().unwrap_or_else(|poisoned| poisoned.into_inner()),
        );

        tracing::trace!(status = status.as_u16(), bytes = body.len(), redirects = history.len(), "response received");

        Ok(RawResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_owned(),
            url: final_url,
            headers,
            body,
            history,
        })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, options: &RequestOptions) -> Result<RawResponse, TransportError> {
        self.execute(reqwest::Method::GET, url, options).await
    }

    async fn post(&self, url: &str, options: &RequestOptions) -> Result<RawResponse, TransportError> {
        self.execute(reqwest::Method::POST, url, options).await
    }
}

/// `name=value; name2=value2`.
fn cookie_header(cookies: &BTreeMap<String, String>) -> String {
    cookies
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn reason_phrase(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout {
            message: error_chain(&err),
        };
    }
    if has_tls_source(&err) {
        return TransportError::Tls {
            message: error_chain(&err),
        };
    }
    let status = err.status();
    TransportError::Http {
        message: error_chain(&err),
        context: IncidentContext {
            status_code: status.map(|s| s.as_u16()),
            reason: status
                .and_then(|s| s.canonical_reason())
                .unwrap_or_default()
                .to_owned(),
            hostname: err
                .url()
                .and_then(|u| u.host_str())
                .unwrap_or_default()
                .to_owned(),
        },
    }
}

/// Whether any *source* of `err` is a TLS or certificate failure.
///
/// The top-level message is skipped because reqwest embeds the request URL
/// in it.
fn has_tls_source(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = err.source();
    while let Some(source) = current {
        let message = source.to_string().to_ascii_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| message.contains(needle))
        {
            return true;
        }
        current = source.source();
    }
    false
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut current = err.source();
    while let Some(source) = current {
        message.push_str(": ");
        message.push_str(&source.to_string());
        current = source.source();
    }
    message
}
