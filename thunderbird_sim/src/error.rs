//! Error types for the scenario engine.

use thiserror::Error;

/// Errors returned by the playback controls.
///
/// Every variant is recoverable: the controller state is left exactly as it
/// was before the failing call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The requested scenario id is not in the catalog
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

impl EngineError {
    /// Creates an unknown-scenario error.
    pub fn unknown(id: impl Into<String>) -> Self {
        Self::UnknownScenario(id.into())
    }
}

/// Errors raised while loading or validating a scenario catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A catalog must contain at least one scenario
    #[error("Catalog is empty")]
    Empty,

    /// Durations must be strictly positive
    #[error("Scenario '{0}' has a zero duration")]
    ZeroDuration(String),

    /// Scenario ids must be unique
    #[error("Duplicate scenario id: {0}")]
    DuplicateId(String),

    /// The catalog document is not valid JSON
    #[error("Catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The catalog file could not be read
    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),
}
