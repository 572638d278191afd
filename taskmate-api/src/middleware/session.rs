/// Session cookie authentication
///
/// Resolves the `taskmate-session` cookie and injects
/// [`AuthContext`](taskmate_shared::auth::middleware::AuthContext) into the
/// request extensions. Requests without a live session are answered with 401
/// before they reach a handler.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use taskmate_shared::auth::middleware::authenticate;

use crate::{app::AppState, error::ApiError};

pub async fn session_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let cookies = cookie_header(req.headers());

    let auth = authenticate(&state.db, &state.sessions, cookies.as_deref(), Utc::now()).await?;
    tracing::debug!(user_id = %auth.user_id, "Session authenticated");

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

/// All `Cookie` headers joined into one, the way HTTP/1.1 clients send them.
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_no_cookie_header() {
        assert_eq!(cookie_header(&HeaderMap::new()), None);
    }

    #[test]
    fn test_multiple_cookie_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("taskmate-session=abc"));

        assert_eq!(
            cookie_header(&headers).as_deref(),
            Some("theme=dark; taskmate-session=abc")
        );
    }
}
