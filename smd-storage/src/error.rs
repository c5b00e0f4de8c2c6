//! Storage errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode record {uid}: {source}")]
    Encode {
        uid: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode record at {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Record has an empty uid and cannot be stored")]
    MissingUid,

    #[error("Uid '{uid}' cannot be used as a record key")]
    InvalidUid { uid: String },

    #[error("Storage backend unavailable: {reason}")]
    Unavailable { reason: String },
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
