use swp_abstract::SourceError;
use thiserror::Error;

/// Why the engine's run-loop stopped.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("event source failed: {0}")]
    Source(#[from] SourceError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
