//! Error types for the metasearch front end.

use metasearch_core::SearchError;

/// Top-level error type for configuration and search setup.
#[derive(Debug, thiserror::Error)]
pub enum MetasearchError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// No adapter is registered for an engine.
    #[error("engine {name}: unknown engine adapter {kind:?}")]
    UnknownEngine {
        /// Configured engine name.
        name: String,
        /// Adapter key that did not resolve.
        kind: String,
    },

    /// Error raised by the search core.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MetasearchError>;
