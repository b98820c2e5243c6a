use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;

use crate::authz::guard::{AUTH_TOKEN_COOKIE, ROLE_COOKIE};
use crate::models::Role;

pub const SESSION_COOKIE_MAX_AGE: i64 = 24 * 60 * 60;
pub const REMEMBER_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

/// Client-side cookie jar, shared with the HTTP client so the backend's
/// `Set-Cookie` responses land in the same place the mirrors are written.
#[derive(Clone)]
pub struct CookieMirror {
    jar: Arc<Jar>,
    app_origin: Url,
    api_base: Url,
}

impl CookieMirror {
    pub fn new(jar: Arc<Jar>, app_origin: Url, api_base: Url) -> Self {
        Self {
            jar,
            app_origin,
            api_base,
        }
    }

    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// Mirrors token and role for the edge guard.
    pub fn mirror(&self, token: &str, role: Role, remember: bool) {
        for line in session_cookie_lines(token, role, remember) {
            self.jar.add_cookie_str(&line, &self.app_origin);
        }
    }

    pub fn expire_session_cookies(&self) {
        for name in [AUTH_TOKEN_COOKIE, ROLE_COOKIE] {
            self.jar.add_cookie_str(&expired_cookie_line(name), &self.app_origin);
        }
    }

    /// Cookie visible to dashboard pages.
    pub fn app_cookie(&self, name: &str) -> Option<String> {
        read_cookie(self.jar.as_ref(), &self.app_origin, name)
    }

    /// Cookie the backend set on its own origin (e.g. `XSRF-TOKEN`).
    pub fn api_cookie(&self, name: &str) -> Option<String> {
        read_cookie(self.jar.as_ref(), &self.api_base, name)
    }
}

pub fn cookie_line(name: &str, value: &str, max_age: i64) -> String {
    format!("{name}={value}; Path=/; Max-Age={max_age}; SameSite=Lax")
}

pub fn expired_cookie_line(name: &str) -> String {
    cookie_line(name, "", 0)
}

/// `Set-Cookie` lines for the token and role mirrors: one day, or seven when
/// the user asked to be remembered.
pub fn session_cookie_lines(token: &str, role: Role, remember: bool) -> [String; 2] {
    let max_age = if remember {
        REMEMBER_COOKIE_MAX_AGE
    } else {
        SESSION_COOKIE_MAX_AGE
    };
    [
        cookie_line(AUTH_TOKEN_COOKIE, token, max_age),
        cookie_line(ROLE_COOKIE, role.as_str(), max_age),
    ]
}

fn read_cookie(jar: &Jar, url: &Url, name: &str) -> Option<String> {
    let header = jar.cookies(url)?;
    let header = header.to_str().ok()?;
    find_cookie(header, name)
}

/// Looks `name` up in a `Cookie` header value, percent-decoding the value.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            urlencoding::decode(value)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| value.to_string())
        })
        .filter(|value| !value.is_empty())
}
