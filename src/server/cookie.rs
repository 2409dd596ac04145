//! `session_id` cookie: reading it from requests, issuing and clearing it.

use axum::http::{HeaderMap, HeaderValue};
use axum::http::header::COOKIE;

use crate::error::{AppError, AppResult};

pub const SESSION_COOKIE: &str = "session_id";

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all(COOKIE) {
        let Ok(s) = cookie.to_str() else { continue };
        for part in s.split(';') {
            let p = part.trim();
            if let Some((k, v)) = p.split_once('=') {
                if k == name { return Some(v.to_string()); }
            }
        }
    }
    None
}

/// Session token from the request, if the cookie is present and non-empty.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE).filter(|v| !v.is_empty())
}

fn attributes(secure: bool) -> &'static str {
    if secure { "HttpOnly; Secure; SameSite=Lax; Path=/" } else { "HttpOnly; SameSite=Lax; Path=/" }
}

/// No Max-Age: the server-side expiry is the only one that counts.
pub fn set_session_cookie(token: &str, secure: bool) -> AppResult<HeaderValue> {
    HeaderValue::from_str(&format!("{}={}; {}", SESSION_COOKIE, token, attributes(secure)))
        .map_err(|e| AppError::internal("cookie_encoding", e.to_string()))
}

pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; {}",
        SESSION_COOKIE,
        attributes(secure)
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("session_id=; Max-Age=0; Path=/"))
}
