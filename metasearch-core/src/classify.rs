//! Failure classification: error → (incident, suspend?).
//!
//! Pure functions over [`SearchError`]; no network failure is needed to
//! exercise them.
//!
//! | Error                               | Kind              | Suspend |
//! |-------------------------------------|-------------------|---------|
//! | `TransportError::Tls`               | `Tls`             | yes     |
//! | `TransportError::Timeout`           | `Timeout`         | yes     |
//! | `TransportError::Http`              | `Transport`       | yes     |
//! | `EngineChallenge::Captcha`          | `Captcha`         | yes     |
//! | `EngineChallenge::TooManyRequests`  | `TooManyRequests` | yes     |
//! | `EngineChallenge::AccessDenied`     | `AccessDenied`    | yes     |
//! | anything else                       | `Unclassified`    | no      |

use crate::error::{EngineChallenge, SearchError, TransportError};
use crate::incident::EngineIncident;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Failure taxonomy of an engine invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// TLS handshake or certificate failure.
    Tls,
    /// Connect/read timeout or exhausted budget.
    Timeout,
    /// Other transport or protocol failure.
    Transport,
    /// CAPTCHA challenge.
    Captcha,
    /// Rate limited.
    TooManyRequests,
    /// Access denied.
    AccessDenied,
    /// Anything else.
    Unclassified,
}

impl FailureKind {
    /// Stable short name, used in unresponsive-engine records.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tls => "ssl error",
            Self::Timeout => "timeout",
            Self::Transport => "http error",
            Self::Captcha => "CAPTCHA",
            Self::TooManyRequests => "too many requests",
            Self::AccessDenied => "access denied",
            Self::Unclassified => "unexpected crash",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of classifying one error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Taxonomy bucket.
    pub kind: FailureKind,
    /// Whether the engine should be suspended.
    pub suspend: bool,
    /// Engine-requested suspension; `None` leaves the backoff to the caller.
    pub suspended_time: Option<Duration>,
    /// Error description.
    pub message: String,
}

/// Map an error onto the failure taxonomy.
pub fn classify(err: &SearchError) -> Classification {
    let (kind, suspend, suspended_time) = match err {
        SearchError::Transport(TransportError::Tls { .. }) => (FailureKind::Tls, true, None),
        SearchError::Transport(TransportError::Timeout { .. }) => {
            (FailureKind::Timeout, true, None)
        }
        SearchError::Transport(TransportError::Http { .. }) => {
            (FailureKind::Transport, true, None)
        }
        SearchError::Engine(challenge) => {
            let kind = match challenge {
                EngineChallenge::Captcha { .. } => FailureKind::Captcha,
                EngineChallenge::TooManyRequests { .. } => FailureKind::TooManyRequests,
                EngineChallenge::AccessDenied { .. } => FailureKind::AccessDenied,
            };
            (kind, true, Some(challenge.suspended_time()))
        }
        SearchError::Parse(_) | SearchError::Config(_) | SearchError::Unclassified(_) => {
            (FailureKind::Unclassified, false, None)
        }
    };
    Classification {
        kind,
        suspend,
        suspended_time,
        message: err.to_string(),
    }
}

/// The primary incident recorded for a failed invocation.
pub fn incident_for(engine_name: &str, err: &SearchError) -> EngineIncident {
    EngineIncident {
        engine_name: engine_name.to_owned(),
        message: err.to_string(),
        context: err.context(),
        secondary: false,
    }
}
