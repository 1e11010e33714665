use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the catalog and TTL stores.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store file read/write failed.
    #[error("store io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Store file contents could not be parsed.
    #[error("corrupt store file {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Value serialization failed.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
