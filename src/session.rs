use axum::http::{HeaderMap, header};

use crate::config::AppConfig;

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Cookie SameSite attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// SessionCookie
///
/// The `Set-Cookie` value carrying the session token. Issued on sign-in and replaced by
/// an immediately-expiring copy on logout; both variants share path and flags so the
/// browser treats them as the same cookie.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    expired: bool,
}

impl SessionCookie {
    /// Session cookie living for `max_age` seconds. `Secure` is set in production only.
    pub fn issue(config: &AppConfig, token: &str, max_age: i64) -> Self {
        Self {
            name: config.session_cookie.clone(),
            value: token.to_string(),
            path: "/".to_string(),
            max_age: max_age.max(0),
            http_only: true,
            secure: config.secure_cookies(),
            same_site: SameSite::Lax,
            expired: false,
        }
    }

    /// Deletion cookie: empty value, `Max-Age=0` and an epoch `Expires`.
    pub fn clear(config: &AppConfig) -> Self {
        Self {
            expired: true,
            ..Self::issue(config, "", 0)
        }
    }

    pub fn to_header_value(&self) -> String {
        let mut parts = vec![
            format!("{}={}", self.name, self.value),
            format!("Path={}", self.path),
            format!("Max-Age={}", self.max_age),
        ];
        if self.expired {
            parts.push(format!("Expires={}", EXPIRED));
        }
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        parts.push(format!("SameSite={}", self.same_site.as_str()));
        parts.join("; ")
    }
}

/// Value of cookie `name` from a `Cookie` request header.
pub fn read_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Session token from any `Cookie` header on the request.
pub fn session_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|raw| read_cookie(raw, name))
        .map(str::to_string)
}
