/// Error types shared by the corpus loader and the lookup server.
///
/// The matcher itself never fails; these errors only come out of loading and
/// validating the backing data. Application-specific errors should be defined
/// in the server crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid corpus json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate question id: {0}")]
    DuplicateId(String),

    #[error("invalid entry {id}: {message}")]
    InvalidEntry { id: String, message: String },
}
