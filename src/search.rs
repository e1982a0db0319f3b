//! Fan-out of one query across every configured engine.
//!
//! [`Metasearch`] owns one [`OnlineProcessor`] per engine plus the
//! per-engine [`SuspendedStatus`]. A search filters the engines by
//! category, availability and suspension, runs the remaining ones
//! concurrently against a shared [`ResultContainer`] and folds each
//! [`SearchOutcome`] back into the suspension table.

use crate::config::MetasearchConfig;
use crate::error::{MetasearchError, Result};
use metasearch_core::{
    engines, ContainerSnapshot, EngineAdapter, EngineTiming, ErrorRecorder, OnlineProcessor,
    ReqwestTransport, ResultContainer, ResultPlugin, SearchOutcome, SearchQuery, SearchResult,
    SitelinkRules, SuspendedStatus, SuspensionPolicy, TrackerUrlRemover, Transport,
    UnresponsiveEngine,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Merged answer of every engine that took part in a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResponse {
    /// Query text.
    pub query: String,
    /// Category the engines were selected for.
    pub category: String,
    /// Results in engine completion order.
    pub results: Vec<SearchResult>,
    /// Deduplicated spelling suggestions.
    pub suggestions: Vec<String>,
    /// Engines that failed for this query.
    pub unresponsive_engines: Vec<UnresponsiveEngine>,
    /// Engines skipped because they are suspended.
    pub suspended_engines: Vec<String>,
    /// Per-engine timings.
    pub timings: Vec<EngineTiming>,
}

impl SearchResponse {
    fn from_snapshot(
        query: &SearchQuery,
        category: &str,
        snapshot: ContainerSnapshot,
        suspended_engines: Vec<String>,
    ) -> Self {
        let mut seen = HashSet::new();
        let suggestions = snapshot
            .suggestions
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Self {
            query: query.query.clone(),
            category: category.to_owned(),
            results: snapshot.results,
            suggestions,
            unresponsive_engines: snapshot.unresponsive_engines,
            suspended_engines,
            timings: snapshot.timings,
        }
    }
}

/// Suspension state of one engine, as reported by [`Metasearch::suspensions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSuspension {
    /// Engine name.
    pub engine: String,
    /// Consecutive failures.
    pub continuous_errors: u32,
    /// Time left.
    pub remaining: Duration,
    /// Failure kind that caused it.
    pub reason: Option<String>,
}

/// Builder for [`Metasearch`].
pub struct MetasearchBuilder<T> {
    config: MetasearchConfig,
    transport: T,
    adapters: HashMap<String, Arc<dyn EngineAdapter>>,
    recorder: Option<Arc<dyn ErrorRecorder>>,
    plugins: Vec<Arc<dyn ResultPlugin>>,
}

impl<T: Transport + Clone + 'static> MetasearchBuilder<T> {
    /// Builder for `config`, sending every request through `transport`.
    ///
    /// Starts with [`TrackerUrlRemover`] as the only plugin.
    pub fn new(config: MetasearchConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            adapters: HashMap::new(),
            recorder: None,
            plugins: vec![Arc::new(TrackerUrlRemover) as Arc<dyn ResultPlugin>],
        }
    }

    /// Make `adapter` available under its [`EngineAdapter::kind`], taking
    /// precedence over a built-in adapter of the same kind.
    pub fn adapter(mut self, adapter: Arc<dyn EngineAdapter>) -> Self {
        self.adapters.insert(adapter.kind().to_owned(), adapter);
        self
    }

    /// Send engine incidents to `recorder` instead of the tracing log.
    pub fn recorder(mut self, recorder: Arc<dyn ErrorRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Run `plugin` on every result, after the plugins added before it.
    pub fn plugin(mut self, plugin: Arc<dyn ResultPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Validate the configuration and build one processor per engine.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration or engines whose adapter
    /// is neither registered nor built in.
    pub fn build(self) -> Result<Metasearch<T>> {
        self.config.validate()?;
        let sitelinks = Arc::new(SitelinkRules::compile(&self.config.search)?);

        let mut processors = Vec::with_capacity(self.config.engines.len());
        for settings in &self.config.engines {
            let kind = settings.engine_kind();
            let adapter = self
                .adapters
                .get(kind)
                .cloned()
                .or_else(|| engines::adapter_for(kind))
                .ok_or_else(|| MetasearchError::UnknownEngine {
                    name: settings.name.clone(),
                    kind: kind.to_owned(),
                })?;

            let mut processor =
                OnlineProcessor::new(adapter, settings.clone(), self.transport.clone())
                    .with_sitelinks(Arc::clone(&sitelinks));
            if let Some(recorder) = &self.recorder {
                processor = processor.with_recorder(Arc::clone(recorder));
            }
            processors.push(Arc::new(processor));
        }

        tracing::info!(
            engines = processors.len(),
            sitelinks = sitelinks.is_enabled(),
            "metasearch ready"
        );

        Ok(Metasearch {
            processors,
            suspensions: Mutex::new(HashMap::new()),
            policy: SuspensionPolicy::from(&self.config.search),
            plugins: self.plugins,
            default_category: self.config.default_category,
        })
    }
}

/// Runs queries across all configured engines.
pub struct Metasearch<T> {
    processors: Vec<Arc<OnlineProcessor<T>>>,
    suspensions: Mutex<HashMap<String, SuspendedStatus>>,
    policy: SuspensionPolicy,
    plugins: Vec<Arc<dyn ResultPlugin>>,
    default_category: String,
}

impl<T: Transport> std::fmt::Debug for Metasearch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metasearch")
            .field("engines", &self.processors.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("policy", &self.policy)
            .field("default_category", &self.default_category)
            .finish_non_exhaustive()
    }
}

impl Metasearch<ReqwestTransport> {
    /// Instance over the built-in engines and the reqwest transport.
    ///
    /// # Errors
    ///
    /// See [`MetasearchBuilder::build`].
    pub fn from_config(config: MetasearchConfig) -> Result<Self> {
        MetasearchBuilder::new(config, ReqwestTransport::new()).build()
    }
}

impl<T: Transport + Clone + 'static> Metasearch<T> {
    /// Builder for `config` over `transport`.
    pub fn builder(config: MetasearchConfig, transport: T) -> MetasearchBuilder<T> {
        MetasearchBuilder::new(config, transport)
    }

    /// Names of all configured engines, disabled ones included.
    pub fn engine_names(&self) -> Vec<&str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Category used when [`Metasearch::search`] gets none.
    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SuspendedStatus>> {
        self.suspensions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Engines currently suspended.
    pub fn suspensions(&self) -> Vec<EngineSuspension> {
        let mut out: Vec<EngineSuspension> = self
            .lock()
            .iter()
            .filter(|(_, status)| status.is_suspended())
            .map(|(engine, status)| EngineSuspension {
                engine: engine.clone(),
                continuous_errors: status.continuous_errors(),
                remaining: status.remaining(),
                reason: status.reason().map(str::to_owned),
            })
            .collect();
        out.sort_by(|a, b| a.engine.cmp(&b.engine));
        out
    }

    fn is_suspended(&self, engine: &str) -> bool {
        self.lock().get(engine).is_some_and(SuspendedStatus::is_suspended)
    }

    fn record_outcome(&self, engine: &str, outcome: &SearchOutcome) {
        let mut suspensions = self.lock();
        match outcome {
            SearchOutcome::Completed { .. } => {
                if let Some(status) = suspensions.get_mut(engine) {
                    status.resume();
                }
            }
            SearchOutcome::Failed(classification) if classification.suspend => {
                let status = suspensions.entry(engine.to_owned()).or_default();
                let duration = status.suspend(
                    classification.suspended_time,
                    classification.kind.name(),
                    &self.policy,
                );
                tracing::warn!(
                    engine,
                    reason = classification.kind.name(),
                    continuous_errors = status.continuous_errors(),
                    suspended_secs = duration.as_secs(),
                    "engine suspended"
                );
            }
            SearchOutcome::Failed(_) => {}
        }
    }

    /// Run `query` on every enabled, non-suspended engine serving
    /// `category` (the default category when `None`).
    ///
    /// Engines run concurrently, each bounded by its own timeout; this
    /// returns once all of them have finished.
    pub async fn search(&self, query: &SearchQuery, category: Option<&str>) -> SearchResponse {
        let category = category.unwrap_or(&self.default_category);
        let start = Instant::now();
        let container = Arc::new(ResultContainer::with_plugins(self.plugins.clone()));
        let mut suspended = Vec::new();
        let mut tasks = Vec::new();

        for processor in &self.processors {
            let settings = processor.settings();
            if settings.disabled || !settings.serves(category) {
                continue;
            }
            if self.is_suspended(processor.name()) {
                tracing::debug!(engine = %processor.name(), "engine suspended, skipped");
                suspended.push(processor.name().to_owned());
                continue;
            }
            let Some(params) = processor.get_params(query, category) else {
                tracing::debug!(engine = %processor.name(), "engine cannot serve query, skipped");
                continue;
            };

            let processor = Arc::clone(processor);
            let container = Arc::clone(&container);
            let text = query.query.clone();
            let name = processor.name().to_owned();
            let handle = tokio::spawn(async move {
                let timeout = processor.settings().timeout();
                processor
                    .search(&text, params, &container, start, timeout)
                    .await
            });
            tasks.push((name, handle));
        }

        tracing::debug!(category, engines = tasks.len(), "dispatching search");

        let (names, handles): (Vec<String>, Vec<_>) = tasks.into_iter().unzip();
        let joined = futures::future::join_all(handles).await;
        for (name, joined) in names.iter().zip(joined) {
            match joined {
                Ok(outcome) => self.record_outcome(name, &outcome),
                Err(e) => {
                    tracing::error!(engine = %name, "engine task failed: {e}");
                    container.add_unresponsive_engine(name, "unexpected crash", false);
                }
            }
        }

        let response =
            SearchResponse::from_snapshot(query, category, container.snapshot(), suspended);
        tracing::info!(
            category,
            results = response.results.len(),
            unresponsive = response.unresponsive_engines.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search finished"
        );
        response
    }
}
