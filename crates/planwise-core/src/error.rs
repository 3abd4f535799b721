//! Errors reported by the engine's two entry points.
//!
//! Each variant wraps whatever the store raised so callers get one message
//! per failed request while the cause stays reachable through
//! [`std::error::Error::source`].

/// A failed coverage or suggestion request. Nothing is retried and no
/// partial result is returned.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to classify outcome coverage")]
    Coverage(#[source] anyhow::Error),

    #[error("Failed to generate planner suggestions")]
    Suggestions(#[source] anyhow::Error),
}
