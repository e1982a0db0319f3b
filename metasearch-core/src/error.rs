//! Error types for the metasearch-core crate.
//!
//! Every failure an engine invocation can hit is one of these variants.
//! The taxonomy is closed: [`crate::classify::classify`] maps each variant
//! onto a suspend/no-suspend decision without inspecting message text.

use crate::incident::IncidentContext;
use std::time::Duration;

/// Default suspension for an engine answering with a CAPTCHA (one day).
pub const CAPTCHA_SUSPENDED_TIME: Duration = Duration::from_secs(86_400);
/// Default suspension for an engine reporting rate limiting (one hour).
pub const TOO_MANY_REQUESTS_SUSPENDED_TIME: Duration = Duration::from_secs(3_600);
/// Default suspension for an engine denying access (one day).
pub const ACCESS_DENIED_SUSPENDED_TIME: Duration = Duration::from_secs(86_400);

/// Errors raised by a [`crate::http::Transport`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// TLS handshake or certificate verification failed.
    #[error("TLS error: {message}")]
    Tls {
        /// Transport-supplied description.
        message: String,
    },

    /// Connect or read timeout, including an exhausted invocation budget.
    #[error("timeout: {message}")]
    Timeout {
        /// Transport-supplied description.
        message: String,
    },

    /// Any other transport or protocol failure (connection refused,
    /// malformed stream, too many redirects, unexpected HTTP status).
    #[error("HTTP error: {message}")]
    Http {
        /// Transport-supplied description.
        message: String,
        /// Status, reason and host when a response was received.
        context: IncidentContext,
    },
}

impl TransportError {
    /// Generic HTTP failure without response context.
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
            context: IncidentContext::default(),
        }
    }
}

/// Engine-semantic refusals detected in an otherwise valid response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineChallenge {
    /// The engine answered with a CAPTCHA page.
    #[error("CAPTCHA: {message}")]
    Captcha {
        /// Engine-supplied description.
        message: String,
        /// Override for the default suspension time.
        suspended_time: Option<Duration>,
    },

    /// The engine is rate limiting this instance.
    #[error("too many requests: {message}")]
    TooManyRequests {
        /// Engine-supplied description.
        message: String,
        /// Override for the default suspension time.
        suspended_time: Option<Duration>,
    },

    /// The engine refused access (HTTP 402/403, blocked IP, API key).
    #[error("access denied: {message}")]
    AccessDenied {
        /// Engine-supplied description.
        message: String,
        /// Override for the default suspension time.
        suspended_time: Option<Duration>,
    },
}

impl EngineChallenge {
    /// CAPTCHA challenge with the default suspension time.
    pub fn captcha(message: impl Into<String>) -> Self {
        Self::Captcha {
            message: message.into(),
            suspended_time: None,
        }
    }

    /// Rate limit with the default suspension time.
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::TooManyRequests {
            message: message.into(),
            suspended_time: None,
        }
    }

    /// Access denied with the default suspension time.
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::AccessDenied {
            message: message.into(),
            suspended_time: None,
        }
    }

    /// The engine-supplied message.
    pub fn message(&self) -> &str {
        match self {
            Self::Captcha { message, .. }
            | Self::TooManyRequests { message, .. }
            | Self::AccessDenied { message, .. } => message,
        }
    }

    /// How long the engine should be suspended after this challenge.
    pub fn suspended_time(&self) -> Duration {
        match self {
            Self::Captcha { suspended_time, .. } => {
                suspended_time.unwrap_or(CAPTCHA_SUSPENDED_TIME)
            }
            Self::TooManyRequests { suspended_time, .. } => {
                suspended_time.unwrap_or(TOO_MANY_REQUESTS_SUSPENDED_TIME)
            }
            Self::AccessDenied { suspended_time, .. } => {
                suspended_time.unwrap_or(ACCESS_DENIED_SUSPENDED_TIME)
            }
        }
    }
}

/// Errors that can occur during a single engine invocation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// The HTTP transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The engine refused to serve the request.
    #[error(transparent)]
    Engine(#[from] EngineChallenge),

    /// Failed to parse the engine response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search or engine configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Anything the taxonomy does not name.
    #[error("unexpected error: {0}")]
    Unclassified(String),
}

impl SearchError {
    /// Response context attached to this error, if any.
    pub fn context(&self) -> IncidentContext {
        match self {
            Self::Transport(TransportError::Http { context, .. }) => context.clone(),
            _ => IncidentContext::default(),
        }
    }
}

/// Convenience type alias for metasearch-core results.
pub type Result<T> = std::result::Result<T, SearchError>;
