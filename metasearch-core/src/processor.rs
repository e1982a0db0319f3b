//! Per-engine search invocation.
//!
//! [`OnlineProcessor`] runs one engine for one query:
//!
//! ```text
//! get_params ─► search ─┬─► engine.request ─► dispatch ─► engine.response
//!                       │        (skipped when the URL stays empty)
//!                       ├─► sitelink enrichment (nested request/dispatch/parse,
//!                       │        category "sitelinks", never nested further)
//!                       └─► container.extend  (exactly once, also on failure)
//! ```
//!
//! Every error raised along the way is caught once in [`OnlineProcessor::search`],
//! classified, recorded as a single incident and turned into a
//! [`SearchOutcome::Failed`] carrying the suspend decision.

use crate::classify::{classify, incident_for, Classification, FailureKind};
use crate::config::EngineSettings;
use crate::container::ResultContainer;
use crate::context::InvocationContext;
use crate::engine::EngineAdapter;
use crate::error::{Result, SearchError};
use crate::http::{RawResponse, RequestBody, RequestOptions, Transport};
use crate::incident::{EngineIncident, ErrorRecorder, TracingErrorRecorder};
use crate::params::{build_request_params, Method, RequestParams};
use crate::sitelinks::{prune_sitelink_results, SitelinkRules, SITELINKS_CATEGORY};
use crate::status::raise_for_httperror;
use crate::types::{SearchQuery, SearchResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of one engine invocation, as seen by the surrounding system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The invocation finished; `result_count` entries (suggestions
    /// included) were handed to the container.
    Completed {
        /// Entries produced by the engine.
        result_count: usize,
    },
    /// The invocation failed; the classification carries the suspend signal.
    Failed(Classification),
}

impl SearchOutcome {
    /// Whether the invocation finished without error.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The failure classification, if the invocation failed.
    pub fn failure(&self) -> Option<&Classification> {
        match self {
            Self::Failed(classification) => Some(classification),
            Self::Completed { .. } => None,
        }
    }
}

/// Runs searches for one configured engine.
pub struct OnlineProcessor<T> {
    engine: Arc<dyn EngineAdapter>,
    settings: EngineSettings,
    transport: T,
    recorder: Arc<dyn ErrorRecorder>,
    sitelinks: Arc<SitelinkRules>,
}

impl<T> std::fmt::Debug for OnlineProcessor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnlineProcessor")
            .field("engine", &self.engine.kind())
            .field("settings", &self.settings)
            .field("sitelinks", &self.sitelinks.is_enabled())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> OnlineProcessor<T> {
    /// Processor for `engine` configured by `settings`, sending through
    /// `transport`. Incidents go to the tracing log and sitelinks are off
    /// until configured with the builder methods.
    pub fn new(engine: Arc<dyn EngineAdapter>, settings: EngineSettings, transport: T) -> Self {
        Self {
            engine,
            settings,
            transport,
            recorder: Arc::new(TracingErrorRecorder),
            sitelinks: Arc::new(SitelinkRules::disabled()),
        }
    }

    /// Send incidents to `recorder`.
    pub fn with_recorder(mut self, recorder: Arc<dyn ErrorRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Enrich results with `rules`.
    pub fn with_sitelinks(mut self, rules: Arc<SitelinkRules>) -> Self {
        self.sitelinks = rules;
        self
    }

    /// Configured engine name.
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    /// Engine configuration.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Request parameters for `query` in `category`, or `None` when this
    /// engine cannot serve the query and should be skipped.
    pub fn get_params(&self, query: &SearchQuery, category: &str) -> Option<RequestParams> {
        build_request_params(query, category, &self.settings)
    }

    /// Run the engine for `query` and write the outcome into `container`.
    ///
    /// `start` and `timeout` define the invocation budget; every HTTP
    /// request gets the time left of it. The container is extended exactly
    /// once, with no results when the invocation fails.
    pub async fn search(
        &self,
        query: &str,
        mut params: RequestParams,
        container: &ResultContainer,
        start: Instant,
        timeout: Duration,
    ) -> SearchOutcome {
        let mut ctx = InvocationContext::new(self.name(), start, timeout);
        tracing::trace!(engine = %self.name(), query, category = %params.category, "engine search");

        match self.run(&mut ctx, query, &mut params).await {
            Ok(results) => {
                let result_count = results.as_ref().map_or(0, Vec::len);
                tracing::debug!(
                    engine = %self.name(),
                    result_count,
                    requests = ctx.requests(),
                    http_ms = ctx.http_time().as_millis() as u64,
                    "engine search completed"
                );
                container.extend(self.name(), start, results);
                SearchOutcome::Completed { result_count }
            }
            Err(err) => {
                let classification = self.handle_exception(&ctx, container, &err, &params);
                container.extend(self.name(), start, None);
                SearchOutcome::Failed(classification)
            }
        }
    }

    async fn run(
        &self,
        ctx: &mut InvocationContext,
        query: &str,
        params: &mut RequestParams,
    ) -> Result<Option<Vec<SearchResult>>> {
        let Some(results) = self.search_basic(ctx, query, params).await? else {
            return Ok(None);
        };
        if self.sitelinks.is_enabled() {
            return self.add_forced_sitelinks(ctx, results, params).await.map(Some);
        }
        Ok(Some(results))
    }

    /// Request, dispatch and parse once. `Ok(None)` when the adapter left
    /// the URL empty.
    async fn search_basic(
        &self,
        ctx: &mut InvocationContext,
        query: &str,
        params: &mut RequestParams,
    ) -> Result<Option<Vec<SearchResult>>> {
        self.engine.request(query, params);

        if params.url.is_empty() {
            tracing::debug!(engine = %self.name(), "empty request URL, nothing dispatched");
            return Ok(None);
        }

        let response = self.send_http_request(ctx, params).await?;
        self.engine.response(&response, params).map(Some)
    }

    async fn send_http_request(
        &self,
        ctx: &mut InvocationContext,
        params: &RequestParams,
    ) -> Result<RawResponse> {
        let options = request_options(params, ctx.remaining());

        let sent = Instant::now();
        let response = match params.method {
            Method::Get => self.transport.get(&params.url, &options).await,
            Method::Post => self.transport.post(&params.url, &options).await,
        };
        ctx.record_http(sent.elapsed());
        let response = response?;

        if params.raise_for_httperror {
            raise_for_httperror(&response)?;
        }

        let soft_max_redirects = params.soft_max_redirects as usize;
        if response.history.len() > soft_max_redirects {
            self.recorder.record(EngineIncident {
                engine_name: ctx.engine_name().to_owned(),
                message: format!(
                    "{} redirects, maximum: {}",
                    response.history.len(),
                    soft_max_redirects
                ),
                context: response.context(),
                secondary: true,
            });
        }

        Ok(response)
    }

    /// Attach sitelinks to the first matching result of every configured
    /// site, running one nested search per match.
    async fn add_forced_sitelinks(
        &self,
        ctx: &mut InvocationContext,
        mut results: Vec<SearchResult>,
        params: &RequestParams,
    ) -> Result<Vec<SearchResult>> {
        let targets = self.sitelinks.plan(&params.category, &params.query, &results);
        for target in targets {
            let sitelinks = self.get_sitelinks(ctx, params, &target.search_term).await?;
            tracing::debug!(
                engine = %self.name(),
                site_category = %target.site_category,
                sitelinks = sitelinks.len(),
                "sitelinks attached"
            );
            if let Some(result) = results.get_mut(target.result_index) {
                result.sitelinks = sitelinks;
            }
        }
        Ok(results)
    }

    async fn get_sitelinks(
        &self,
        ctx: &mut InvocationContext,
        params: &RequestParams,
        search_term: &str,
    ) -> Result<Vec<SearchResult>> {
        let mut sitelink_params = params.clone();
        let sitelink_query = format!("{} {search_term}", sitelink_params.query);
        sitelink_params.query.clone_from(&sitelink_query);
        sitelink_params.category = SITELINKS_CATEGORY.to_owned();
        sitelink_params.url.clear();

        tracing::trace!(engine = %self.name(), query = %sitelink_query, "sitelink search");
        let nested = self
            .search_basic(ctx, &sitelink_query, &mut sitelink_params)
            .await?;
        Ok(prune_sitelink_results(nested.unwrap_or_default()))
    }

    /// Classify `err`, record its incident and mark the engine unresponsive.
    fn handle_exception(
        &self,
        ctx: &InvocationContext,
        container: &ResultContainer,
        err: &SearchError,
        params: &RequestParams,
    ) -> Classification {
        let classification = classify(err);
        self.recorder.record(incident_for(self.name(), err));
        container.add_unresponsive_engine(
            self.name(),
            classification.kind.name(),
            classification.suspend,
        );

        let elapsed_s = ctx.elapsed().as_secs_f64();
        let timeout_s = ctx.timeout().as_secs_f64();
        match classification.kind {
            FailureKind::Tls => tracing::error!(
                engine = %self.name(),
                error = %err,
                verify = ?params.verify,
                "TLS error"
            ),
            FailureKind::Timeout => tracing::error!(
                engine = %self.name(),
                elapsed_s,
                timeout_s,
                error = %err,
                "HTTP requests timeout"
            ),
            FailureKind::Transport => tracing::error!(
                engine = %self.name(),
                elapsed_s,
                timeout_s,
                error = %err,
                "requests exception"
            ),
            FailureKind::Captcha | FailureKind::TooManyRequests | FailureKind::AccessDenied => {
                tracing::error!(
                    engine = %self.name(),
                    suspended_s = classification.suspended_time.map(|d| d.as_secs()),
                    "{}",
                    classification.message
                )
            }
            FailureKind::Unclassified => tracing::error!(
                engine = %self.name(),
                elapsed_s,
                error = %err,
                "exception"
            ),
        }
        classification
    }
}

/// Transport options for `params`; unset fields keep the transport default.
fn request_options(params: &RequestParams, timeout: Duration) -> RequestOptions {
    let body = match params.method {
        Method::Get => None,
        Method::Post => {
            if !params.data.is_empty() {
                Some(RequestBody::Form(params.data.clone()))
            } else if let Some(json) = params.json.as_ref().filter(|v| !is_empty_json(v)) {
                Some(RequestBody::Json(json.clone()))
            } else if !params.content.is_empty() {
                Some(RequestBody::Raw(params.content.clone()))
            } else {
                None
            }
        }
    };

    RequestOptions {
        headers: params.headers.clone(),
        cookies: params.cookies.clone(),
        auth: params.auth.clone(),
        verify: params.verify.clone(),
        allow_redirects: Some(params.allow_redirects),
        max_redirects: (params.max_redirects > 0).then_some(params.max_redirects),
        timeout: Some(timeout),
        body,
    }
}

fn is_empty_json(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
