use thiserror::Error;

/// Errors returned by dialogue service backends
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Service returned {status_code}: {message}")]
    Status { status_code: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Decode(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Service rejected the request: {0}")]
    Rejected(String),
}

impl ApiError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        ApiError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
