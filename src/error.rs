use thiserror::Error;

/// Failures of the Store contract. Reads never fail; they degrade to an empty collection.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to write \"{key}\" to local storage: {reason}")]
    Write { key: String, reason: String },

    #[error("no application with id {0}")]
    UnknownId(u64),

    #[error("failed to encode applications: {0}")]
    Encode(#[from] serde_json::Error),
}
