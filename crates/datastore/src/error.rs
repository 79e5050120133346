use thiserror::Error;

pub type DatastoreResult<T> = Result<T, DatastoreError>;

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("data store unreachable: {0}")]
    Transport(String),

    /// The store refused the call. `message` is the store's own wording and is
    /// safe to show to the user.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected data store response: {0}")]
    Decode(String),

    #[error("{0}")]
    Constraint(String),

    #[error("invalid data store url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl DatastoreError {
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }
}

impl From<reqwest::Error> for DatastoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DatastoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
