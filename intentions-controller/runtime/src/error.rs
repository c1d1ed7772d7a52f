use crate::{core::QueryError, index};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("permission denied")]
    PermissionDenied,

    #[error("ID must be empty when creating a new intention")]
    IdOnCreate,

    #[error("request must include a {0} query")]
    MissingQuery(&'static str),

    #[error("datacenter {0:?} is not served by this endpoint")]
    UnknownDatacenter(String),

    #[error(transparent)]
    Index(#[from] index::Error),

    #[error("failed to load seed intentions from {}: {source}", .path.display())]
    Seed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<QueryError> for Error {
    fn from(error: QueryError) -> Self {
        Self::Index(error.into())
    }
}
