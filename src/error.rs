use thiserror::Error;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// A local validation failure, rejected before any remote call is issued.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Too many tags: {count} (maximum {max})")]
    TooManyTags { count: usize, max: usize },

    #[error("Unknown category \"{0}\"")]
    UnknownCategory(String),

    #[error("Category name must not be empty")]
    EmptyCategoryName,

    #[error("Category \"{0}\" already exists")]
    DuplicateCategory(String),
}

// ---------------------------------------------------------------------------
// EngineError — top-level rollup
// ---------------------------------------------------------------------------

/// The one error type the engine surfaces to callers.
///
/// Remote failures are uniform: the engine does not distinguish store error
/// kinds when deciding how to roll back — every optimistic path pairs one
/// apply step with one revert step regardless of why the call failed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error("No active session. Call start_session() first.")]
    NoSession,
}

/// Convenience alias — the default error type is `EngineError`.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
