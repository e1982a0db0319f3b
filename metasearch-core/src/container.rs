//! Shared result aggregation sink.
//!
//! Every engine invocation writes into the [`ResultContainer`] exactly once:
//! its results (possibly none) plus its elapsed time. Failed invocations
//! additionally leave an [`UnresponsiveEngine`] record. The container is
//! internally synchronised, so concurrent invocations share it through an
//! `Arc` without extra locking.

use crate::types::SearchResult;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Post-processing collaborator run on every result and every sitelink.
pub trait ResultPlugin: Send + Sync {
    /// Plugin identifier, used in logs.
    fn id(&self) -> &str;

    /// Inspect or rewrite `result`. Returning `false` stops the remaining
    /// plugins for this result; the result itself is kept.
    fn on_result(&self, result: &mut SearchResult) -> bool;
}

/// Timing of one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTiming {
    /// Engine name.
    pub engine: String,
    /// Wall time from invocation start to container extension.
    pub total: Duration,
    /// Results contributed (suggestions excluded).
    pub result_count: usize,
}

/// An engine that failed for this query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresponsiveEngine {
    /// Engine name.
    pub engine: String,
    /// Short failure name (see [`crate::classify::FailureKind::name`]).
    pub error_type: String,
    /// Whether the engine was suspended because of it.
    pub suspended: bool,
}

/// Everything collected for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSnapshot {
    /// Results in arrival order.
    pub results: Vec<SearchResult>,
    /// Suggestion texts (URL-less engine entries).
    pub suggestions: Vec<String>,
    /// One entry per invocation.
    pub timings: Vec<EngineTiming>,
    /// Failed engines.
    pub unresponsive_engines: Vec<UnresponsiveEngine>,
}

/// Shared sink for engine results.
#[derive(Default)]
pub struct ResultContainer {
    plugins: Vec<Arc<dyn ResultPlugin>>,
    inner: Mutex<ContainerSnapshot>,
}

impl std::fmt::Debug for ResultContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultContainer")
            .field("plugins", &self.plugins.iter().map(|p| p.id()).collect::<Vec<_>>())
            .field("inner", &*self.lock())
            .finish()
    }
}

impl ResultContainer {
    /// Empty container without plugins.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty container running `plugins` in order on every result.
    pub fn with_plugins(plugins: Vec<Arc<dyn ResultPlugin>>) -> Self {
        Self {
            plugins,
            inner: Mutex::new(ContainerSnapshot::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ContainerSnapshot> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Merge one invocation's output.
    ///
    /// `results` is `None` when nothing was dispatched or the invocation
    /// failed; the timing is registered either way.
    pub fn extend(&self, engine: &str, start: Instant, results: Option<Vec<SearchResult>>) {
        let mut accepted = Vec::new();
        let mut suggestions = Vec::new();

        for mut result in results.unwrap_or_default() {
            if result.url.is_none() {
                suggestions.push(result.title);
                continue;
            }
            self.run_plugins(&mut result);
            for sitelink in &mut result.sitelinks {
                self.run_plugins(sitelink);
            }
            accepted.push(result);
        }

        let timing = EngineTiming {
            engine: engine.to_owned(),
            total: start.elapsed(),
            result_count: accepted.len(),
        };
        tracing::debug!(
            engine,
            results = timing.result_count,
            suggestions = suggestions.len(),
            total_ms = timing.total.as_millis() as u64,
            "container extended"
        );

        let mut inner = self.lock();
        inner.results.extend(accepted);
        inner.suggestions.extend(suggestions);
        inner.timings.push(timing);
    }

    /// Record that `engine` failed for this query.
    pub fn add_unresponsive_engine(&self, engine: &str, error_type: &str, suspended: bool) {
        self.lock().unresponsive_engines.push(UnresponsiveEngine {
            engine: engine.to_owned(),
            error_type: error_type.to_owned(),
            suspended,
        });
    }

    fn run_plugins(&self, result: &mut SearchResult) {
        for plugin in &self.plugins {
            if !plugin.on_result(result) {
                tracing::trace!(plugin = plugin.id(), "plugin stopped the chain");
                break;
            }
        }
    }

    /// Copy of everything collected so far.
    pub fn snapshot(&self) -> ContainerSnapshot {
        self.lock().clone()
    }

    /// Results collected so far.
    pub fn results(&self) -> Vec<SearchResult> {
        self.lock().results.clone()
    }

    /// Per-invocation timings collected so far.
    pub fn timings(&self) -> Vec<EngineTiming> {
        self.lock().timings.clone()
    }

    /// Failed engines recorded so far.
    pub fn unresponsive_engines(&self) -> Vec<UnresponsiveEngine> {
        self.lock().unresponsive_engines.clone()
    }
}
