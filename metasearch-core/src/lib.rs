//! # metasearch-core
//!
//! Per-engine request orchestration for a federated metasearch engine.
//!
//! One [`OnlineProcessor`] runs one configured engine for one query: it
//! builds the request parameters, lets the engine adapter shape the request,
//! dispatches it through an injected [`Transport`], parses the response and
//! optionally enriches selected results with sitelinks from a second,
//! bounded search. Whatever happens, the invocation ends by writing into the
//! shared [`ResultContainer`] exactly once.
//!
//! ## Design
//!
//! - Engines are [`EngineAdapter`] trait objects selected by configuration
//! - Failures are a closed [`SearchError`] taxonomy mapped by the pure
//!   [`classify`] function onto a suspend/no-suspend signal
//! - Per-invocation state (engine name, budget, HTTP time) is an explicit
//!   [`InvocationContext`] value, never ambient
//! - Sitelink searches run in the reserved `"sitelinks"` category and are
//!   never enriched themselves
//!
//! ## Security
//!
//! - Queries are logged only at trace level
//! - Sitelink URL expressions are anchored regular expressions compiled once
//!   at startup

pub mod classify;
pub mod config;
pub mod container;
pub mod context;
pub mod engine;
pub mod engines;
pub mod error;
pub mod http;
pub mod incident;
pub mod params;
pub mod plugins;
pub mod processor;
pub mod sitelinks;
pub mod status;
pub mod suspension;
pub mod types;

pub use classify::{classify, Classification, FailureKind};
pub use config::{EngineSettings, SearchSettings};
pub use container::{
    ContainerSnapshot, EngineTiming, ResultContainer, ResultPlugin, UnresponsiveEngine,
};
pub use context::InvocationContext;
pub use engine::EngineAdapter;
pub use error::{EngineChallenge, Result, SearchError, TransportError};
pub use http::{RawResponse, ReqwestTransport, RequestBody, RequestOptions, Transport};
pub use incident::{
    EngineIncident, ErrorRecorder, IncidentContext, MemoryErrorRecorder, TracingErrorRecorder,
};
pub use params::{build_request_params, Method, RequestParams};
pub use plugins::TrackerUrlRemover;
pub use processor::{OnlineProcessor, SearchOutcome};
pub use sitelinks::{ForceSitelinkSite, SitelinkRules, SITELINKS_CATEGORY};
pub use suspension::{SuspendedStatus, SuspensionPolicy, MAX_SUSPENSION};
pub use types::{Locale, SafeSearch, SearchQuery, SearchResult, TimeRange};
