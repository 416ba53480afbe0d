use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid root path: {0}")]
    InvalidRoot(String),

    #[error("Directory listing failed for {path}: {reason}")]
    Listing { path: String, reason: String },

    #[error("Content hashing failed for {path}: {reason}")]
    Hashing { path: String, reason: String },

    #[error("Not a text file: {0}")]
    NotTextFile(PathBuf),

    #[error("Query normalization failed: {0}")]
    Normalize(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index service has been destroyed")]
    Destroyed,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// Rejected cache writes, reported through the cache error callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache entry TTL must be greater than zero")]
    ZeroTtl,

    #[error("cache entry of {bytes} bytes exceeds the {limit} byte limit")]
    EntryTooLarge { bytes: usize, limit: usize },
}

/// Builds an error for a panic caught while running index work.
pub(crate) fn panic_error(payload: Box<dyn std::any::Any + Send>) -> IndexError {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    };
    IndexError::Internal(format!("panic during search: {message}"))
}
