use axum::extract::Request;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::authz::guard::{self, GuardAction, GuardRequest, AUTH_TOKEN_COOKIE, ROLE_COOKIE};
use crate::errors::AppError;
use crate::session::cookies::{expired_cookie_line, find_cookie};

/// Canonical path the guard allowed; downstream handlers forward this and
/// nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardedPath(pub String);

/// Middleware running the route guard in front of every request.
pub async fn route_guard(mut request: Request, next: Next) -> Response {
    let Some(path) = guard::canonical_path(request.uri().path()) else {
        tracing::info!(path = %request.uri().path(), "navigation refused: path has no canonical form");
        return AppError::bad_request("request path cannot be normalized").into_response();
    };

    let guard_request = guard_request_from(&path, request.headers());
    let outcome = guard::evaluate(&guard_request);

    match outcome.action {
        GuardAction::Continue => {
            tracing::debug!(path = %guard_request.path, state = ?outcome.state, "navigation allowed");
            request.extensions_mut().insert(GuardedPath(path));
            next.run(request).await
        }
        GuardAction::Redirect { location, expire } => {
            tracing::info!(
                path = %guard_request.path,
                state = ?outcome.state,
                location,
                expired = ?expire,
                "navigation redirected"
            );
            redirect_response(location, &expire)
        }
    }
}

pub fn guard_request_from(path: &str, headers: &HeaderMap) -> GuardRequest {
    let mut request = GuardRequest::new(path);

    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        if request.auth_cookie.is_none() {
            request.auth_cookie = find_cookie(raw, AUTH_TOKEN_COOKIE);
        }
        if request.role_cookie.is_none() {
            request.role_cookie = find_cookie(raw, ROLE_COOKIE);
        }
    }

    request.bearer_token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());

    request
}

fn redirect_response(location: &str, expire: &[&str]) -> Response {
    let mut response = Redirect::temporary(location).into_response();
    for name in expire {
        if let Ok(value) = HeaderValue::from_str(&expired_cookie_line(name)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cookies_across_headers_and_the_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; authToken=abc"));
        headers.append(COOKIE, HeaderValue::from_static("user_role=Client"));

        let request = guard_request_from("/booking", &headers);
        assert_eq!(request.auth_cookie.as_deref(), Some("abc"));
        assert_eq!(request.role_cookie.as_deref(), Some("Client"));
        assert_eq!(request.bearer_token, None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        let request = guard_request_from("/booking", &headers);
        assert_eq!(request.bearer_token.as_deref(), Some("xyz"));
    }
}
