//! Per-invocation network context.
//!
//! Created at the start of every [`crate::processor::OnlineProcessor::search`]
//! call and passed down explicitly to dispatch and enrichment, so a worker
//! reused for several engines never sees stale deadlines.

use std::time::{Duration, Instant};

/// Time budget and bookkeeping of one engine invocation.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    engine_name: String,
    start: Instant,
    timeout: Duration,
    http_time: Duration,
    requests: u32,
}

impl InvocationContext {
    /// Start a context for `engine_name` whose budget began at `start`.
    pub fn new(engine_name: impl Into<String>, start: Instant, timeout: Duration) -> Self {
        Self {
            engine_name: engine_name.into(),
            start,
            timeout,
            http_time: Duration::ZERO,
            requests: 0,
        }
    }

    /// Engine this invocation belongs to.
    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    /// When the budget started.
    pub fn start(&self) -> Instant {
        self.start
    }

    /// Total budget.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time since the budget started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Budget left; zero once the deadline has passed.
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.elapsed())
    }

    /// Account one finished HTTP round trip.
    pub fn record_http(&mut self, duration: Duration) {
        self.http_time += duration;
        self.requests += 1;
    }

    /// Time spent waiting on the transport.
    pub fn http_time(&self) -> Duration {
        self.http_time
    }

    /// Number of HTTP round trips made.
    pub fn requests(&self) -> u32 {
        self.requests
    }
}
