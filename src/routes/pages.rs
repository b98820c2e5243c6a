//! Forwards navigations that passed the guard to the dashboard upstream.

use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::Url;
use serde_json::json;

use crate::app::AppState;
use crate::authz::guard::canonical_path;
use crate::errors::{AppError, AppResult};
use crate::routes::guard::GuardedPath;

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const FORWARDED_REQUEST_HEADERS: [HeaderName; 5] = [ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE, COOKIE];
const FORWARDED_RESPONSE_HEADERS: [HeaderName; 3] = [CONTENT_TYPE, LOCATION, SET_COOKIE];

pub async fn forward(State(state): State<AppState>, request: Request) -> AppResult<Response> {
    let Some(upstream) = state.config.upstream.as_ref() else {
        let body = json!({ "error": "upstream", "message": "no upstream configured" });
        return Ok((StatusCode::BAD_GATEWAY, Json(body)).into_response());
    };

    let path = match request.extensions().get::<GuardedPath>() {
        Some(GuardedPath(path)) => path.clone(),
        None => canonical_path(request.uri().path())
            .ok_or_else(|| AppError::bad_request("request path cannot be normalized"))?,
    };
    let url = upstream_url(upstream, &path, request.uri().query());

    let mut outbound = state.http.request(request.method().clone(), url);
    for name in FORWARDED_REQUEST_HEADERS.iter() {
        for value in request.headers().get_all(name) {
            outbound = outbound.header(name, value);
        }
    }

    let body: Bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|err| AppError::internal(format!("failed to read request body: {err}")))?;
    if !body.is_empty() {
        outbound = outbound.body(body);
    }

    let upstream_response = outbound.send().await?;
    let status = upstream_response.status();
    let mut forwarded = Vec::new();
    for name in FORWARDED_RESPONSE_HEADERS.iter() {
        for value in upstream_response.headers().get_all(name) {
            forwarded.push((name.clone(), value.clone()));
        }
    }
    let bytes = upstream_response.bytes().await?;

    let mut response = (status, bytes).into_response();
    for (name, value) in forwarded {
        if name == CONTENT_TYPE {
            response.headers_mut().insert(name, value);
        } else {
            response.headers_mut().append(name, value);
        }
    }
    Ok(response)
}

/// `path` under the upstream's base path. Scheme, host and port always come
/// from the configured upstream.
fn upstream_url(upstream: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = upstream.clone();
    let base = upstream.path().trim_end_matches('/');
    url.set_path(&format!("{base}{path}"));
    url.set_query(query);
    url.set_fragment(None);
    url
}
