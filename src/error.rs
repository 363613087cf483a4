//! Error types for fragment storage and routing.

use thiserror::Error;

/// Errors raised by fragment backends and the fragment client.
#[derive(Debug, Error)]
pub enum FragmentError {
    /// A fragment could not be opened or reached. Fatal to setup.
    #[error("fragment {fragment} unavailable: {source}")]
    Connect {
        fragment: usize,
        #[source]
        source: anyhow::Error,
    },

    /// Primary key already present.
    #[error("duplicate {relation} key: {key}")]
    DuplicateKey { relation: &'static str, key: String },

    /// One fragment failed while answering a cross-fragment query.
    #[error("fragment {fragment} failed during scatter: {source}")]
    Scatter {
        fragment: usize,
        #[source]
        source: Box<FragmentError>,
    },

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl FragmentError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, FragmentError::DuplicateKey { .. })
    }
}

impl From<rocksdb::Error> for FragmentError {
    fn from(err: rocksdb::Error) -> Self {
        FragmentError::Storage(err.into())
    }
}

impl From<bincode::Error> for FragmentError {
    fn from(err: bincode::Error) -> Self {
        FragmentError::Storage(err.into())
    }
}

pub type Result<T, E = FragmentError> = std::result::Result<T, E>;
