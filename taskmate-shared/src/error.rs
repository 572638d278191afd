/// Domain error taxonomy
///
/// Every fallible operation in the shared crate returns [`TaskMateError`].
/// The API layer maps each variant onto an HTTP status:
///
/// | variant          | status |
/// |------------------|--------|
/// | `Validation`     | 400    |
/// | `Authorization`  | 401    |
/// | `Database`       | 500    |
/// | `SessionStore`   | 500    |
/// | `Internal`       | 500    |
///
/// Raw `sqlx` errors are classified once, in the `From<sqlx::Error>` impl, so
/// callers can use `?` on any query.

use thiserror::Error;

/// Result alias used across the shared crate
pub type TaskMateResult<T> = Result<T, TaskMateError>;

#[derive(Debug, Error)]
pub enum TaskMateError {
    /// Input rejected before or by the database
    #[error("{message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Missing or invalid session, or a resource the caller does not own
    #[error("{0}")]
    Authorization(String),

    /// Classified database failure
    #[error("{message}")]
    Database {
        message: String,
        code: Option<String>,
    },

    /// Session backend unreachable or returned garbage
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Anything else that should never reach a client verbatim
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskMateError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    pub fn invalid_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// The canonical error for a task that is missing or owned by someone else
    pub fn task_not_found() -> Self {
        Self::Authorization("Task not found or access denied".to_string())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::Authorization(_))
    }
}

impl From<sqlx::Error> for TaskMateError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let code = db_err.code().map(|c| c.into_owned());
            let message = match code.as_deref() {
                Some("23505") => Some("Duplicate entry"),
                Some("23503") => Some("Foreign key constraint violation"),
                Some("23514") => Some("Check constraint violation"),
                _ => None,
            };

            if let Some(message) = message {
                tracing::warn!(code = ?code, error = %db_err, "Database constraint violated");
                return Self::Database {
                    message: message.to_string(),
                    code,
                };
            }

            if db_err.message().contains("WIP limit") {
                return Self::validation(db_err.message().to_string());
            }

            tracing::error!(code = ?code, error = %db_err, "Database operation failed");
            return Self::Database {
                message: "Database operation failed".to_string(),
                code,
            };
        }

        tracing::error!(error = %err, "Database operation failed");
        Self::Database {
            message: "Database operation failed".to_string(),
            code: None,
        }
    }
}

impl From<crate::auth::password::PasswordError> for TaskMateError {
    fn from(err: crate::auth::password::PasswordError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<crate::auth::session::SessionStoreError> for TaskMateError {
    fn from(err: crate::auth::session::SessionStoreError) -> Self {
        Self::SessionStore(err.to_string())
    }
}
