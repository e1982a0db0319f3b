//! Integration tests for a full engine invocation.
//!
//! A scripted in-memory transport answers by query text, and a line-based
//! test engine turns response bodies into results, so every path through
//! [`OnlineProcessor::search`] runs without network access.

use metasearch_core::{
    EngineAdapter, EngineSettings, FailureKind, ForceSitelinkSite, MemoryErrorRecorder, Method,
    OnlineProcessor, RawResponse, RequestOptions, RequestParams, ResultContainer, ResultPlugin,
    SearchError, SearchOutcome, SearchQuery, SearchResult, SearchSettings, SitelinkRules,
    Transport, TransportError, SITELINKS_CATEGORY,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;

// ── Test doubles ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Call {
    method: Method,
    query: String,
    options: RequestOptions,
}

type Handler = dyn Fn(&str) -> Result<RawResponse, TransportError> + Send + Sync;

/// Transport answering every request from `handler(query)`.
struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    fn new(handler: impl Fn(&str) -> Result<RawResponse, TransportError> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Answers each query with its scripted body, an empty page otherwise.
    fn pages(pages: &[(&str, &str)]) -> Arc<Self> {
        let pages: Vec<(String, String)> = pages
            .iter()
            .map(|(q, body)| ((*q).to_owned(), (*body).to_owned()))
            .collect();
        Self::new(move |query| {
            let body = pages
                .iter()
                .find(|(q, _)| q == query)
                .map(|(_, body)| body.clone())
                .unwrap_or_default();
            Ok(RawResponse::new(200, "https://engine.test/search", body))
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn answer(&self, method: Method, url: &str, options: &RequestOptions) -> Result<RawResponse, TransportError> {
        let query = Url::parse(url)
            .expect("engine URL")
            .query_pairs()
            .find(|(k, _)| k == "q")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        self.calls.lock().expect("calls lock").push(Call {
            method,
            query: query.clone(),
            options: options.clone(),
        });
        (self.handler)(&query)
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, options: &RequestOptions) -> Result<RawResponse, TransportError> {
        self.answer(Method::Get, url, options)
    }

    async fn post(&self, url: &str, options: &RequestOptions) -> Result<RawResponse, TransportError> {
        self.answer(Method::Post, url, options)
    }
}

/// Engine reading one result per body line:
/// `suggest:<text>` is a suggestion, `crash` an unclassified failure,
/// anything else a result URL.
struct LineEngine {
    empty_url: bool,
    /// Leave the URL empty for sitelink searches only.
    skip_nested: bool,
    /// Results arrive already carrying a sitelink.
    stale_sitelinks: bool,
    soft_max_redirects: u32,
    raise_for_httperror: bool,
    requests: AtomicUsize,
}

impl Default for LineEngine {
    fn default() -> Self {
        Self {
            empty_url: false,
            skip_nested: false,
            stale_sitelinks: false,
            soft_max_redirects: 0,
            raise_for_httperror: true,
            requests: AtomicUsize::new(0),
        }
    }
}

impl EngineAdapter for LineEngine {
    fn kind(&self) -> &'static str {
        "lines"
    }

    fn request(&self, query: &str, params: &mut RequestParams) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.empty_url || (self.skip_nested && params.category == SITELINKS_CATEGORY) {
            return;
        }
        let url = Url::parse_with_params("https://engine.test/search", &[("q", query)])
            .expect("static URL");
        params.url = url.into();
        params.soft_max_redirects = self.soft_max_redirects;
        params.raise_for_httperror = self.raise_for_httperror;
    }

    fn response(
        &self,
        response: &RawResponse,
        _params: &RequestParams,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut results = Vec::new();
        for line in response.text().lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line == "crash" {
                return Err(SearchError::Unclassified("engine parser panicked".into()));
            }
            match line.strip_prefix("suggest:") {
                Some(text) => results.push(SearchResult::suggestion(text, "lines")),
                None => {
                    let mut result = SearchResult::new(line, format!("title of {line}"), "", "lines");
                    if self.stale_sitelinks {
                        result.sitelinks = vec![SearchResult::new("https://stale.test/", "stale", "", "lines")];
                    }
                    results.push(result);
                }
            }
        }
        Ok(results)
    }
}

struct Harness {
    processor: Arc<OnlineProcessor<Arc<ScriptedTransport>>>,
    transport: Arc<ScriptedTransport>,
    engine: Arc<LineEngine>,
    recorder: Arc<MemoryErrorRecorder>,
}

fn harness(engine: LineEngine, transport: Arc<ScriptedTransport>, rules: SitelinkRules) -> Harness {
    let engine = Arc::new(engine);
    let recorder = Arc::new(MemoryErrorRecorder::new());
    let processor = OnlineProcessor::new(
        engine.clone() as Arc<dyn EngineAdapter>,
        EngineSettings::named("lines"),
        Arc::clone(&transport),
    )
    .with_recorder(recorder.clone())
    .with_sitelinks(Arc::new(rules));
    Harness {
        processor: Arc::new(processor),
        transport,
        engine,
        recorder,
    }
}

fn shop_rules() -> SitelinkRules {
    let settings = SearchSettings {
        force_sitelinks_categories: vec!["shopping".into()],
        force_sitelink_websites: vec![ForceSitelinkSite {
            url_expression: r".*store\.example\.com.*".into(),
            search_terms: vec!["size".into()],
            category: "shopping".into(),
        }],
        ..SearchSettings::default()
    };
    SitelinkRules::compile(&settings).expect("valid sitelink settings")
}

const BUDGET: Duration = Duration::from_secs(3);

async fn run(h: &Harness, query: &str, category: &str, container: &ResultContainer) -> SearchOutcome {
    let params = h
        .processor
        .get_params(&SearchQuery::new(query), category)
        .expect("supported query");
    h.processor
        .search(query, params, container, Instant::now(), BUDGET)
        .await
}

// ── Dispatch ────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_url_skips_dispatch() {
    let h = harness(
        LineEngine {
            empty_url: true,
            ..LineEngine::default()
        },
        ScriptedTransport::pages(&[]),
        SitelinkRules::disabled(),
    );
    let container = ResultContainer::new();

    let outcome = run(&h, "rust", "general", &container).await;

    assert_eq!(outcome, SearchOutcome::Completed { result_count: 0 });
    assert!(h.transport.calls().is_empty());
    assert!(h.recorder.incidents().is_empty());
    let snap = container.snapshot();
    assert!(snap.results.is_empty());
    assert_eq!(snap.timings.len(), 1, "timing registered even without dispatch");
}

#[tokio::test]
async fn results_and_suggestions_reach_the_container() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("rust", "https://a.test/\nsuggest:rust lang\nhttps://b.test/")]),
        SitelinkRules::disabled(),
    );
    let container = ResultContainer::new();

    let outcome = run(&h, "rust", "general", &container).await;

    assert_eq!(outcome, SearchOutcome::Completed { result_count: 3 });
    let snap = container.snapshot();
    assert_eq!(snap.results.len(), 2);
    assert_eq!(snap.suggestions, vec!["rust lang".to_owned()]);
    assert_eq!(snap.timings.len(), 1);
    assert!(snap.unresponsive_engines.is_empty());
}

#[tokio::test]
async fn request_gets_remaining_budget_and_headers() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[]),
        SitelinkRules::disabled(),
    );
    run(&h, "rust", "general", &ResultContainer::new()).await;

    let calls = h.transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Get);
    let timeout = calls[0].options.timeout.expect("timeout always set");
    assert!(timeout <= BUDGET);
    assert!(calls[0].options.headers.contains_key("User-Agent"));
    assert_eq!(calls[0].options.allow_redirects, Some(false));
    assert_eq!(calls[0].options.max_redirects, None);
}

#[tokio::test]
async fn soft_redirect_overflow_is_secondary_and_non_fatal() {
    let transport = ScriptedTransport::new(|_| {
        Ok(RawResponse::new(200, "https://engine.test/final", "https://a.test/")
            .with_history(["https://engine.test/one", "https://engine.test/two"]))
    });
    let h = harness(
        LineEngine {
            soft_max_redirects: 1,
            ..LineEngine::default()
        },
        transport,
        SitelinkRules::disabled(),
    );
    let container = ResultContainer::new();

    let outcome = run(&h, "rust", "general", &container).await;

    assert!(outcome.is_completed());
    assert_eq!(container.results().len(), 1, "response still parsed");
    let incidents = h.recorder.incidents();
    assert_eq!(incidents.len(), 1);
    assert!(incidents[0].secondary);
    assert_eq!(incidents[0].message, "2 redirects, maximum: 1");
    assert_eq!(incidents[0].context.status_code, Some(200));
    assert_eq!(incidents[0].context.hostname, "engine.test");
}

#[tokio::test]
async fn redirects_within_soft_limit_record_nothing() {
    let transport = ScriptedTransport::new(|_| {
        Ok(RawResponse::new(200, "https://engine.test/final", "").with_history(["https://engine.test/one"]))
    });
    let h = harness(
        LineEngine {
            soft_max_redirects: 1,
            ..LineEngine::default()
        },
        transport,
        SitelinkRules::disabled(),
    );
    run(&h, "rust", "general", &ResultContainer::new()).await;
    assert!(h.recorder.incidents().is_empty());
}

// ── Failure classification ──────────────────────────────────────────────

#[tokio::test]
async fn tls_failure_records_one_incident_and_suspends() {
    let transport = ScriptedTransport::new(|_| {
        Err(TransportError::Tls {
            message: "invalid peer certificate: UnknownIssuer".into(),
        })
    });
    let h = harness(LineEngine::default(), transport, SitelinkRules::disabled());
    let container = ResultContainer::new();

    let outcome = run(&h, "rust", "general", &container).await;

    let failure = outcome.failure().expect("failed");
    assert_eq!(failure.kind, FailureKind::Tls);
    assert!(failure.suspend);
    assert_eq!(h.recorder.count_for("lines"), 1);
    assert!(!h.recorder.incidents()[0].secondary);

    let snap = container.snapshot();
    assert!(snap.results.is_empty());
    assert_eq!(snap.timings.len(), 1, "failed invocation still registers timing");
    assert_eq!(snap.unresponsive_engines.len(), 1);
    assert_eq!(snap.unresponsive_engines[0].error_type, "ssl error");
    assert!(snap.unresponsive_engines[0].suspended);
}

#[tokio::test]
async fn timeout_suspends() {
    let transport = ScriptedTransport::new(|_| {
        Err(TransportError::Timeout {
            message: "operation timed out".into(),
        })
    });
    let h = harness(LineEngine::default(), transport, SitelinkRules::disabled());
    let outcome = run(&h, "rust", "general", &ResultContainer::new()).await;
    let failure = outcome.failure().expect("failed");
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert!(failure.suspend);
    assert_eq!(h.recorder.incidents().len(), 1);
}

#[tokio::test]
async fn unclassified_failure_records_one_incident_without_suspend() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("rust", "https://a.test/\ncrash")]),
        SitelinkRules::disabled(),
    );
    let container = ResultContainer::new();

    let outcome = run(&h, "rust", "general", &container).await;

    let failure = outcome.failure().expect("failed");
    assert_eq!(failure.kind, FailureKind::Unclassified);
    assert!(!failure.suspend);
    assert_eq!(h.recorder.count_for("lines"), 1);
    assert!(container.results().is_empty());
    assert_eq!(container.unresponsive_engines()[0].error_type, "unexpected crash");
}

#[tokio::test]
async fn rate_limit_status_is_a_challenge() {
    let transport = ScriptedTransport::new(|_| Ok(RawResponse::new(429, "https://engine.test/search", "")));
    let h = harness(LineEngine::default(), transport, SitelinkRules::disabled());

    let outcome = run(&h, "rust", "general", &ResultContainer::new()).await;

    let failure = outcome.failure().expect("failed");
    assert_eq!(failure.kind, FailureKind::TooManyRequests);
    assert!(failure.suspend);
    assert_eq!(failure.suspended_time, Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn server_error_carries_context() {
    let transport = ScriptedTransport::new(|_| Ok(RawResponse::new(502, "https://engine.test/search", "")));
    let h = harness(LineEngine::default(), transport, SitelinkRules::disabled());

    let outcome = run(&h, "rust", "general", &ResultContainer::new()).await;

    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::Transport));
    let incident = &h.recorder.incidents()[0];
    assert_eq!(incident.context.status_code, Some(502));
    assert_eq!(incident.context.reason, "Bad Gateway");
}

#[tokio::test]
async fn status_ignored_when_engine_opts_out() {
    let transport =
        ScriptedTransport::new(|_| Ok(RawResponse::new(500, "https://engine.test/search", "https://a.test/")));
    let h = harness(
        LineEngine {
            raise_for_httperror: false,
            ..LineEngine::default()
        },
        transport,
        SitelinkRules::disabled(),
    );
    let container = ResultContainer::new();

    let outcome = run(&h, "rust", "general", &container).await;

    assert!(outcome.is_completed());
    assert_eq!(container.results().len(), 1);
}

// ── Sitelinks ───────────────────────────────────────────────────────────

const SHOES_PAGE: &str = "https://news.example.org/shoes\n\
                          https://store.example.com/item/1\n\
                          https://store.example.com/item/2";

const SHOES_SIZE_PAGE: &str = "https://store.example.com/item/1\n\
                               suggest:shoe sizes\n\
                               https://store.example.com/size-guide";

#[tokio::test]
async fn matching_result_gets_sitelinks_from_one_nested_search() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("shoes", SHOES_PAGE), ("shoes size", SHOES_SIZE_PAGE)]),
        shop_rules(),
    );
    let container = ResultContainer::new();

    let outcome = run(&h, "shoes", "shopping", &container).await;

    assert!(outcome.is_completed());
    let queries: Vec<String> = h.transport.calls().into_iter().map(|c| c.query).collect();
    assert_eq!(queries, vec!["shoes".to_owned(), "shoes size".to_owned()]);
    assert_eq!(h.engine.requests.load(Ordering::SeqCst), 2);

    let results = container.results();
    assert_eq!(results.len(), 3);
    assert!(results[0].sitelinks.is_empty());
    let sitelinks: Vec<&str> = results[1].sitelinks.iter().map(SearchResult::url_str).collect();
    assert_eq!(sitelinks, vec!["https://store.example.com/size-guide"]);
    assert!(results[2].sitelinks.is_empty(), "only the first match is enriched");
    assert!(container.snapshot().suggestions.is_empty());
}

#[tokio::test]
async fn sitelinks_replace_existing_ones() {
    let h = harness(
        LineEngine {
            stale_sitelinks: true,
            ..LineEngine::default()
        },
        ScriptedTransport::pages(&[("shoes", SHOES_PAGE), ("shoes size", SHOES_SIZE_PAGE)]),
        shop_rules(),
    );
    let container = ResultContainer::new();

    assert!(run(&h, "shoes", "shopping", &container).await.is_completed());

    let results = container.results();
    let enriched: Vec<&str> = results[1].sitelinks.iter().map(SearchResult::url_str).collect();
    assert_eq!(enriched, vec!["https://store.example.com/size-guide"]);
    let untouched: Vec<&str> = results[0].sitelinks.iter().map(SearchResult::url_str).collect();
    assert_eq!(untouched, vec!["https://stale.test/"]);
}

#[tokio::test]
async fn query_already_containing_term_is_not_enriched() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("shoes size", SHOES_PAGE)]),
        shop_rules(),
    );
    let container = ResultContainer::new();

    run(&h, "shoes size", "shopping", &container).await;

    assert_eq!(h.transport.calls().len(), 1);
    assert!(container.results().iter().all(|r| r.sitelinks.is_empty()));
}

#[tokio::test]
async fn sitelinks_category_never_nests() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("shoes", SHOES_PAGE)]),
        shop_rules(),
    );
    run(&h, "shoes", SITELINKS_CATEGORY, &ResultContainer::new()).await;
    assert_eq!(h.transport.calls().len(), 1);
}

#[tokio::test]
async fn other_categories_are_not_enriched() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("shoes", SHOES_PAGE)]),
        shop_rules(),
    );
    run(&h, "shoes", "general", &ResultContainer::new()).await;
    assert_eq!(h.transport.calls().len(), 1);
}

#[tokio::test]
async fn empty_nested_search_yields_empty_sitelinks() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("shoes", SHOES_PAGE)]),
        shop_rules(),
    );
    let container = ResultContainer::new();

    let outcome = run(&h, "shoes", "shopping", &container).await;

    assert!(outcome.is_completed());
    assert_eq!(h.transport.calls().len(), 2);
    assert!(container.results()[1].sitelinks.is_empty());
}

#[tokio::test]
async fn nested_request_without_url_yields_empty_sitelinks() {
    let h = harness(
        LineEngine {
            skip_nested: true,
            ..LineEngine::default()
        },
        ScriptedTransport::pages(&[("shoes", SHOES_PAGE)]),
        shop_rules(),
    );
    let container = ResultContainer::new();

    let outcome = run(&h, "shoes", "shopping", &container).await;

    assert!(outcome.is_completed());
    assert_eq!(h.transport.calls().len(), 1, "nested search never dispatched");
    assert_eq!(h.engine.requests.load(Ordering::SeqCst), 2);
    assert!(container.results().iter().all(|r| r.sitelinks.is_empty()));
    assert!(h.recorder.incidents().is_empty());
}

#[tokio::test]
async fn nested_failure_fails_the_invocation_once() {
    let transport = ScriptedTransport::new(|query| match query {
        "shoes" => Ok(RawResponse::new(200, "https://engine.test/search", SHOES_PAGE)),
        _ => Err(TransportError::Timeout {
            message: "nested timed out".into(),
        }),
    });
    let h = harness(LineEngine::default(), transport, shop_rules());
    let container = ResultContainer::new();

    let outcome = run(&h, "shoes", "shopping", &container).await;

    assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::Timeout));
    assert_eq!(h.recorder.incidents().len(), 1);
    let snap = container.snapshot();
    assert!(snap.results.is_empty());
    assert_eq!(snap.timings.len(), 1);
}

#[tokio::test]
async fn plugins_see_results_and_sitelinks() {
    struct Counter(AtomicUsize);
    impl ResultPlugin for Counter {
        fn id(&self) -> &str {
            "counter"
        }
        fn on_result(&self, _result: &mut SearchResult) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    let counter = Arc::new(Counter(AtomicUsize::new(0)));
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("shoes", SHOES_PAGE), ("shoes size", SHOES_SIZE_PAGE)]),
        shop_rules(),
    );
    let container = ResultContainer::with_plugins(vec![counter.clone() as Arc<dyn ResultPlugin>]);

    run(&h, "shoes", "shopping", &container).await;

    // 3 primary results + 1 sitelink
    assert_eq!(counter.0.load(Ordering::SeqCst), 4);
}

// ── Concurrency ─────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_invocations_share_one_container() {
    let h = harness(
        LineEngine::default(),
        ScriptedTransport::pages(&[("a", "https://a.test/"), ("b", "https://b.test/"), ("c", "https://c.test/")]),
        SitelinkRules::disabled(),
    );
    let container = Arc::new(ResultContainer::new());

    let handles: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|query| {
            let processor = Arc::clone(&h.processor);
            let container = Arc::clone(&container);
            let params = processor
                .get_params(&SearchQuery::new(query), "general")
                .expect("supported");
            tokio::spawn(async move {
                processor
                    .search(query, params, &container, Instant::now(), BUDGET)
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.expect("task").is_completed());
    }
    let snap = container.snapshot();
    assert_eq!(snap.results.len(), 3);
    assert_eq!(snap.timings.len(), 3);
}
