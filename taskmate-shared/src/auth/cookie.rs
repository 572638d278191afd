/// Session cookie helpers
///
/// The session id travels in a single `HttpOnly`, `SameSite=Lax` cookie named
/// [`SESSION_COOKIE_NAME`]. `Secure` is added in production.

use std::time::Duration;

pub const SESSION_COOKIE_NAME: &str = "taskmate-session";

/// Pulls the session id out of a `Cookie` request header.
///
/// Returns `None` when the cookie is absent or empty.
pub fn session_id_from_cookies(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that installs a session.
pub fn session_cookie(session_id: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE_NAME,
        session_id,
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie(secure: bool) -> String {
    session_cookie("", Duration::ZERO, secure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_from_cookies() {
        assert_eq!(
            session_id_from_cookies("theme=dark; taskmate-session=abc123; lang=en"),
            Some("abc123".to_string())
        );
        assert_eq!(
            session_id_from_cookies("taskmate-session=xyz"),
            Some("xyz".to_string())
        );
    }

    #[test]
    fn test_session_id_missing_or_empty() {
        assert_eq!(session_id_from_cookies(""), None);
        assert_eq!(session_id_from_cookies("theme=dark"), None);
        assert_eq!(session_id_from_cookies("taskmate-session="), None);
        assert_eq!(session_id_from_cookies("taskmate-session-old=abc"), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc", Duration::from_secs(86_400), false);
        assert_eq!(
            cookie,
            "taskmate-session=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=86400"
        );

        let secure = session_cookie("abc", Duration::from_secs(60), true);
        assert!(secure.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_session_cookie() {
        let cookie = clear_session_cookie(false);
        assert!(cookie.starts_with("taskmate-session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
