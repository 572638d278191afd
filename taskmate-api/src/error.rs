/// Error handling for the API server
///
/// All handlers return `Result<T, ApiError>`. Every error renders the same
/// body:
///
/// ```json
/// { "error": "Task title is required", "code": "validation_error", "details": [...] }
/// ```
///
/// Domain errors from `taskmate_shared` convert with `?`. Client errors are
/// logged at `warn`; internal errors are logged at `error` with the detail the
/// response hides.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskmate_shared::{auth::middleware::AuthError, error::TaskMateError};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Field-level validation failure (400)
    ValidationError {
        message: String,
        details: Vec<ValidationErrorDetail>,
    },

    /// Unauthorized (401): no session, bad credentials, or not the owner
    Unauthorized(String),

    /// Internal server error (500); the message is logged, never returned
    InternalError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,

    /// Machine-readable code, e.g. `unauthorized`
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn field(message: impl Into<String>, field: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::ValidationError {
            details: vec![ValidationErrorDetail {
                field: field.into(),
                message: message.clone(),
            }],
            message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::ValidationError { message, .. } => write!(f, "Validation failed: {}", message),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_client_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }

        let (code, message, details) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::ValidationError { message, details } => ("validation_error", message, Some(details)),
            ApiError::Unauthorized(msg) => ("unauthorized", msg, None),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!(error = %msg, "Internal error");
                ("internal_error", "Internal server error".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<TaskMateError> for ApiError {
    fn from(err: TaskMateError) -> Self {
        match err {
            TaskMateError::Validation {
                message,
                field: Some(field),
            } => ApiError::field(message, field),
            TaskMateError::Validation { message, field: None } => ApiError::BadRequest(message),
            TaskMateError::Authorization(message) => ApiError::Unauthorized(message),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        TaskMateError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        let message = details
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_else(|| "Validation failed".to_string());

        ApiError::ValidationError { message, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Renders `err` and returns what was logged while doing so.
    fn logged_while_rendering(err: ApiError) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let _ = err.into_response();
        });

        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::Unauthorized("No session found".to_string());
        assert_eq!(err.to_string(), "Unauthorized: No session found");
    }

    #[tokio::test]
    async fn test_validation_with_field() {
        let err: ApiError = TaskMateError::invalid_field("Task title is required", "title").into();
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Task title is required");
        assert_eq!(json["code"], "validation_error");
        assert_eq!(json["details"][0]["field"], "title");
    }

    #[tokio::test]
    async fn test_validation_without_field() {
        let err: ApiError = TaskMateError::validation("No valid fields to update").into();
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No valid fields to update");
        assert!(json.get("details").is_none());
    }

    #[tokio::test]
    async fn test_not_found_is_unauthorized() {
        let err: ApiError = TaskMateError::task_not_found().into();
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Task not found or access denied");
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let err: ApiError = TaskMateError::Database {
            message: "Database operation failed".to_string(),
            code: Some("XX000".to_string()),
        }
        .into();
        let (status, json) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
        assert_eq!(json["code"], "internal_error");
    }

    #[test]
    fn test_client_errors_are_logged() {
        let output = logged_while_rendering(TaskMateError::invalid_field("Task title is required", "title").into());
        assert!(output.contains("WARN"));
        assert!(output.contains("Request rejected"));
        assert!(output.contains("status=400"));
        assert!(output.contains("Task title is required"));

        let output = logged_while_rendering(ApiError::Unauthorized("Invalid session".to_string()));
        assert!(output.contains("status=401"));
        assert!(output.contains("Invalid session"));
    }

    #[test]
    fn test_internal_errors_are_logged() {
        let output = logged_while_rendering(ApiError::InternalError("pool timed out".to_string()));
        assert!(output.contains("ERROR"));
        assert!(output.contains("pool timed out"));
        assert!(!output.contains("Request rejected"));
    }

    #[test]
    fn test_auth_errors_are_unauthorized() {
        let err: ApiError = AuthError::MissingSession.into();
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "No session found"));

        let err: ApiError = AuthError::InvalidSession.into();
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Invalid session"));
    }
}
