//! Engine incidents and the error-recording collaborator.
//!
//! An incident is created for every failed invocation and for every
//! non-fatal anomaly (soft redirect overflow). The orchestrator never keeps
//! incidents; it hands them to an [`ErrorRecorder`] and moves on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Response context of an incident: `(status_code, reason, hostname)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentContext {
    /// HTTP status code, if a response was received.
    pub status_code: Option<u16>,
    /// HTTP reason phrase, empty if unknown.
    pub reason: String,
    /// Host that produced the response, empty if unknown.
    pub hostname: String,
}

impl fmt::Display for IncidentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self
            .status_code
            .map(|s| s.to_string())
            .unwrap_or_default();
        write!(f, "({status}, {}, {})", self.reason, self.hostname)
    }
}

/// A single recorded engine failure or anomaly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineIncident {
    /// Name of the engine the incident belongs to.
    pub engine_name: String,
    /// Human-readable description.
    pub message: String,
    /// Response context, if any.
    pub context: IncidentContext,
    /// `true` for non-fatal incidents (the engine still produced results).
    pub secondary: bool,
}

/// Receives incidents. Fire-and-forget: implementations must not fail.
pub trait ErrorRecorder: Send + Sync {
    /// Record one incident.
    fn record(&self, incident: EngineIncident);
}

/// Recorder that only emits a tracing event per incident.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorRecorder;

impl ErrorRecorder for TracingErrorRecorder {
    fn record(&self, incident: EngineIncident) {
        trace_incident(&incident);
    }
}

/// Recorder that keeps every incident in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryErrorRecorder {
    incidents: Mutex<Vec<EngineIncident>>,
}

impl MemoryErrorRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded incidents.
    pub fn incidents(&self) -> Vec<EngineIncident> {
        self.incidents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of incidents recorded for `engine_name`.
    pub fn count_for(&self, engine_name: &str) -> usize {
        self.incidents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|i| i.engine_name == engine_name)
            .count()
    }

    /// Drop all recorded incidents.
    pub fn clear(&self) {
        self.incidents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl ErrorRecorder for MemoryErrorRecorder {
    fn record(&self, incident: EngineIncident) {
        trace_incident(&incident);
        self.incidents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(incident);
    }
}

fn trace_incident(incident: &EngineIncident) {
    if incident.secondary {
        tracing::debug!(
            engine = %incident.engine_name,
            context = %incident.context,
            "{}",
            incident.message
        );
    } else {
        tracing::warn!(
            engine = %incident.engine_name,
            context = %incident.context,
            "{}",
            incident.message
        );
    }
}
