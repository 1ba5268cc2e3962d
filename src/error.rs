use std::time::Duration;

use thiserror::Error;

use crate::schema::CollectionId;

/// Failure of a single catalog request.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// HTTP 429. The catalog may tell us how long to back off.
    #[error("rate limited by catalog (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("unexpected response payload: {0}")]
    Decode(String),
}

/// Which chunked mutation was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Add,
    Remove,
}

impl std::fmt::Display for MutationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationOp::Add => f.write_str("add"),
            MutationOp::Remove => f.write_str("remove"),
        }
    }
}

/// A chunk request failed part way through a bulk mutation.
///
/// Chunks before `chunk` already landed at the remote and are
/// not rolled back.
#[derive(Error, Debug)]
#[error("{op} failed on collection {collection} at chunk {chunk} ({applied} items already applied): {source}")]
pub struct MutationError {
    pub op: MutationOp,
    pub collection: CollectionId,
    pub chunk: usize,
    pub applied: usize,
    #[source]
    pub source: CatalogError,
}

/// Reasons a rotation run ends unsuccessfully.
#[derive(Error, Debug)]
pub enum RotationError {
    #[error("access token refresh failed: {0}")]
    Auth(#[source] CatalogError),

    #[error("could not read collection {collection}: {source}")]
    Read {
        collection: CollectionId,
        #[source]
        source: CatalogError,
    },

    #[error("could not clear collection {collection}: {source}")]
    Clear {
        collection: CollectionId,
        #[source]
        source: CatalogError,
    },

    #[error(transparent)]
    Mutation(#[from] MutationError),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
