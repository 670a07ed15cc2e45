//! Session cookie formatting and lookup.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

fn attributes(secure: bool) -> &'static str {
    if secure {
        "Path=/; HttpOnly; Secure; SameSite=Strict"
    } else {
        "Path=/; HttpOnly; SameSite=Strict"
    }
}

/// `Set-Cookie` value carrying `token` until `expires_at`.
pub fn auth_cookie(
    name: &str,
    token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    secure: bool,
) -> String {
    let max_age = (expires_at - now).num_seconds().max(0);
    format!(
        "{}={}; Expires={}; Max-Age={}; {}",
        name,
        token,
        expires_at.format(HTTP_DATE),
        max_age,
        attributes(secure)
    )
}

/// `Set-Cookie` value that clears the session cookie.
pub fn expired_cookie(name: &str, secure: bool) -> String {
    format!(
        "{}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; {}",
        name,
        attributes(secure)
    )
}

/// Value of the cookie `name` across all `Cookie` headers. Empty values
/// count as absent.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_auth_cookie_format() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let cookie = auth_cookie("Bearer", "abc.def.ghi", now + Duration::hours(24), now, true);
        assert_eq!(
            cookie,
            "Bearer=abc.def.ghi; Expires=Sat, 02 Mar 2024 12:00:00 GMT; Max-Age=86400; \
             Path=/; HttpOnly; Secure; SameSite=Strict"
        );
    }

    #[test]
    fn test_expired_cookie_is_past_dated() {
        let cookie = expired_cookie("Bearer", false);
        assert!(cookie.starts_with("Bearer=;"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_cookie_value_lookup() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; Bearer="));
        headers.append(header::COOKIE, HeaderValue::from_static("lang=en; Bearer=tok123"));
        assert_eq!(cookie_value(&headers, "Bearer").as_deref(), Some("tok123"));
        assert_eq!(cookie_value(&headers, "theme").as_deref(), Some("dark"));
        assert_eq!(cookie_value(&headers, "missing"), None);
        assert_eq!(cookie_value(&HeaderMap::new(), "Bearer"), None);
    }
}
