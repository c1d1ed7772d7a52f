use intentions_controller_core::{QueryError, ValidationErrors};

/// A rejected write or malformed query.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid intention: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("intention {0:?} not found")]
    NotFound(String),

    #[error("intention {0:?} already exists")]
    AlreadyExists(String),

    #[error("duplicate intention found: {0}")]
    Duplicate(String),

    #[error("intention ID must be set")]
    MissingId,
}

impl Error {
    /// A short label describing why the write was rejected.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::Query(_) => "query",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::Duplicate(_) => "duplicate",
            Self::MissingId => "missing_id",
        }
    }
}
