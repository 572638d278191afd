/// Client error type
///
/// `Api` carries the status and the `error` message from the server's JSON
/// body; everything the gateway cannot reach or decode is `Http`.

use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server did not hand out a session cookie
    #[error("No session cookie in response")]
    MissingSession,

    /// Rejected locally before reaching the server
    #[error("{0}")]
    Invalid(String),

    #[error("Task {0} is not loaded")]
    UnknownTask(Uuid),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
