/// Authentication endpoints
///
/// - `POST /api/auth/register`: create an account and sign in
/// - `POST /api/auth/login`: sign in
/// - `POST /api/auth/logout`: end the session, if any
/// - `GET  /api/auth/me`: the signed-in user
///
/// Sign-in responses set the `taskmate-session` cookie (HttpOnly,
/// SameSite=Lax, 24 hours by default; `Secure` in production).

use crate::{
    app::AppState,
    error::ApiResult,
    extract::ApiJson,
    middleware::session::cookie_header,
};
use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use taskmate_shared::{
    auth::{
        account::{self, Registration, SignedIn},
        cookie::{clear_session_cookie, session_cookie, session_id_from_cookies},
        middleware::AuthContext,
    },
    models::user::PublicUser,
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: String,
}

impl RegisterRequest {
    fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty() && !self.name.trim().is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

fn signed_in_response(state: &AppState, signed_in: SignedIn) -> impl IntoResponse {
    let cookie = session_cookie(&signed_in.session.id, state.sessions.ttl(), state.secure_cookies());

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(UserResponse { user: signed_in.user }),
    )
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register
/// { "email": "ada@example.com", "password": "secret1", "name": "Ada" }
/// ```
///
/// Creates the user with a default project, four boards and five tags.
///
/// # Errors
///
/// - `400`: missing field, invalid email, short password, or taken email
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    // Missing fields are reported by the account layer with a single message.
    if req.is_complete() {
        req.validate()?;
    }

    let signed_in = account::register(
        &state.db,
        &state.sessions,
        Registration {
            email: req.email,
            password: req.password,
            name: req.name,
        },
        Utc::now(),
    )
    .await?;

    Ok(signed_in_response(&state, signed_in))
}

/// Login
///
/// # Errors
///
/// - `400`: missing email or password
/// - `401`: unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let signed_in = account::login(&state.db, &state.sessions, &req.email, &req.password, Utc::now()).await?;
    Ok(signed_in_response(&state, signed_in))
}

/// Logout
///
/// Always succeeds and clears the cookie; a session that is already gone is
/// not an error.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    if let Some(session_id) = cookie_header(&headers).as_deref().and_then(session_id_from_cookies) {
        account::logout(&state.sessions, &session_id).await?;
        tracing::info!("Session revoked");
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie(state.secure_cookies()))]),
        Json(json!({ "success": true })),
    ))
}

/// The signed-in user
pub async fn me(State(state): State<AppState>, Extension(auth): Extension<AuthContext>) -> ApiResult<Json<UserResponse>> {
    let user = account::current_user(&state.db, &state.sessions, &auth.session_id, Utc::now())
        .await?
        .ok_or_else(|| crate::error::ApiError::Unauthorized("Invalid session".to_string()))?;

    Ok(Json(UserResponse { user }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_completeness() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"ada@example.com","password":"secret1"}"#).unwrap();
        assert!(!req.is_complete());

        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"ada@example.com","password":"secret1","name":"Ada"}"#).unwrap();
        assert!(req.is_complete());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_register_request_rejects_bad_email() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"email":"not-an-email","password":"secret1","name":"Ada"}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
