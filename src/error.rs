use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Error text surfaced by the remote API, or the generic fallback for the call.
    #[error("{0}")]
    Api(String),

    #[error("{0}")]
    Validation(String),

    #[error("Conversation {0} not found")]
    NotFound(i64),

    #[error("Not logged in. Run `login` first.")]
    Unauthenticated,

    #[error("Session expired. Please login again.")]
    SessionExpired,
}

pub type Result<T> = std::result::Result<T, ChatError>;
