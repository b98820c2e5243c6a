//! Edge route guard: decides, before any page code runs, whether a
//! navigation may reach its destination.

use crate::authz::policy;
use crate::models::Role;

pub const AUTH_TOKEN_COOKIE: &str = "authToken";
pub const ROLE_COOKIE: &str = "user_role";
pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

pub const LOGIN_PATH: &str = "/login";
pub const LOGOUT_PATH: &str = "/logout";
pub const HOME_PATH: &str = "/";

const PUBLIC_ROUTES: &[&str] = &["/login", "/register"];
const INTERNAL_ASSET_PREFIX: &str = "/_next";
const API_PREFIX: &str = "/api";
const ASSET_EXTENSIONS: &[&str] = &["ico", "svg", "png", "jpg", "jpeg", "css", "js"];

/// What the guard sees of an incoming navigation.
#[derive(Debug, Clone, Default)]
pub struct GuardRequest {
    pub path: String,
    pub auth_cookie: Option<String>,
    pub bearer_token: Option<String>,
    pub role_cookie: Option<String>,
}

impl GuardRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_auth_cookie(mut self, token: impl Into<String>) -> Self {
        self.auth_cookie = Some(token.into());
        self
    }

    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_role_cookie(mut self, role: impl Into<String>) -> Self {
        self.role_cookie = Some(role.into());
        self
    }

    pub fn has_token(&self) -> bool {
        present(&self.auth_cookie) || present(&self.bearer_token)
    }
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.is_empty()).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Public,
    LogoutRequest,
    Unauthenticated,
    MissingRole,
    Authorized(Role),
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardAction {
    Continue,
    Redirect {
        location: &'static str,
        expire: Vec<&'static str>,
    },
}

impl GuardAction {
    fn redirect(location: &'static str) -> Self {
        GuardAction::Redirect {
            location,
            expire: Vec::new(),
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, GuardAction::Continue)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardOutcome {
    pub state: GuardState,
    pub action: GuardAction,
}

impl GuardOutcome {
    fn new(state: GuardState, action: GuardAction) -> Self {
        Self { state, action }
    }
}

pub fn is_public_route(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path)
}

pub fn is_api_path(path: &str) -> bool {
    policy::matches_base(path, API_PREFIX)
}

/// Framework-internal assets and static files the guard never inspects.
pub fn is_asset_path(path: &str) -> bool {
    if policy::matches_base(path, INTERNAL_ASSET_PREFIX) {
        return true;
    }
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    match last_segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ASSET_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        _ => false,
    }
}

/// The form of a request path the guard judges and the forwarder sends:
/// percent-decoded once, empty and `.` segments dropped, `..` resolved
/// against the root. `None` for paths with no safe canonical form (bad
/// encoding, bytes still encoded after one decode, backslashes, `?`, `#` or
/// control characters).
pub fn canonical_path(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    if !decoded.starts_with('/') {
        return None;
    }
    if decoded
        .chars()
        .any(|c| matches!(c, '%' | '\\' | '?' | '#') || c.is_control())
    {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    Some(format!("/{}", segments.join("/")))
}

/// Evaluates one navigation. First matching rule wins.
pub fn evaluate(request: &GuardRequest) -> GuardOutcome {
    let path = request.path.as_str();

    if is_public_route(path) || is_asset_path(path) || is_api_path(path) {
        if request.has_token() && is_public_route(path) {
            return GuardOutcome::new(GuardState::Public, GuardAction::redirect(HOME_PATH));
        }
        return GuardOutcome::new(GuardState::Public, GuardAction::Continue);
    }

    if path == LOGOUT_PATH {
        return GuardOutcome::new(
            GuardState::LogoutRequest,
            GuardAction::Redirect {
                location: LOGIN_PATH,
                expire: vec![AUTH_TOKEN_COOKIE, ROLE_COOKIE, CSRF_COOKIE],
            },
        );
    }

    if !request.has_token() {
        let expire = if request.role_cookie.is_some() {
            vec![ROLE_COOKIE]
        } else {
            Vec::new()
        };
        return GuardOutcome::new(
            GuardState::Unauthenticated,
            GuardAction::Redirect {
                location: LOGIN_PATH,
                expire,
            },
        );
    }

    let raw_role = match request.role_cookie.as_deref() {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            return GuardOutcome::new(GuardState::MissingRole, GuardAction::redirect(LOGIN_PATH));
        }
    };

    let role = match Role::parse(raw_role) {
        Ok(role) => role,
        Err(_) => return GuardOutcome::new(GuardState::Denied, GuardAction::redirect(HOME_PATH)),
    };

    if policy::allows(role, path) {
        GuardOutcome::new(GuardState::Authorized(role), GuardAction::Continue)
    } else {
        GuardOutcome::new(GuardState::Denied, GuardAction::redirect(HOME_PATH))
    }
}
