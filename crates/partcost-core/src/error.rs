use thiserror::Error;

use crate::catalog::CatalogKey;

/// Canonical result for the cost subsystem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Empty path, or a path whose last vertex is not Commit/Abort.
    #[error("malformed path: {0}")]
    MalformedPath(String),

    #[error("unknown catalog entity: {0}")]
    UnknownCatalogEntity(CatalogKey),

    /// A vertex or edge that does not belong to the procedure's graph.
    #[error("inconsistent execution-path graph: {0}")]
    InconsistentGraph(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("hashing error: {0}")]
    Hash(String),

    #[error("internal invariant failed: {0}")]
    Invariant(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Hash(e.to_string())
    }
}
