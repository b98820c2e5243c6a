use std::time::Duration;

use reqwest::Url;

use crate::errors::AppError;

/// Edge server settings.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub port: u16,
    pub upstream: Option<Url>,
}

impl GateConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let port = std::env::var("APP_PORT")
            .map(|val| val.parse::<u16>())
            .unwrap_or(Ok(8000))
            .map_err(|_| AppError::configuration("APP_PORT must be a valid port"))?;

        let upstream = match std::env::var("GATE_UPSTREAM_URL") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_url("GATE_UPSTREAM_URL", &raw)?),
            _ => None,
        };

        Ok(Self { port, upstream })
    }
}

/// Settings for the session client talking to the studio backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: Url,
    /// Origin the dashboard is served from; mirrored cookies are scoped here.
    pub app_origin: Url,
    pub csrf_path: String,
    pub current_user_path: String,
    pub login_path: String,
    pub logout_path: String,
    pub csrf_poll_attempts: u32,
    pub csrf_poll_initial: Duration,
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base: Url, app_origin: Url) -> Self {
        Self {
            api_base,
            app_origin,
            csrf_path: "/sanctum/csrf-cookie".to_string(),
            current_user_path: "/api/user".to_string(),
            login_path: "/api/login".to_string(),
            logout_path: "/api/logout".to_string(),
            csrf_poll_attempts: 5,
            csrf_poll_initial: Duration::from_millis(100),
            request_timeout: Duration::from_secs(15),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let api_base = std::env::var("API_BASE_URL")
            .map_err(|_| AppError::configuration("API_BASE_URL not set"))?;
        let api_base = parse_url("API_BASE_URL", &api_base)?;

        let app_origin = match std::env::var("APP_ORIGIN") {
            Ok(raw) => parse_url("APP_ORIGIN", &raw)?,
            Err(_) => api_base.clone(),
        };

        let mut config = Self::new(api_base, app_origin);

        if let Ok(path) = std::env::var("CSRF_PATH") {
            config.csrf_path = path;
        }
        if let Ok(path) = std::env::var("CURRENT_USER_PATH") {
            config.current_user_path = path;
        }
        if let Ok(path) = std::env::var("LOGIN_PATH") {
            config.login_path = path;
        }
        if let Ok(path) = std::env::var("LOGOUT_PATH") {
            config.logout_path = path;
        }

        config.csrf_poll_attempts = std::env::var("CSRF_POLL_ATTEMPTS")
            .map(|val| val.parse::<u32>())
            .unwrap_or(Ok(config.csrf_poll_attempts))
            .map_err(|_| AppError::configuration("CSRF_POLL_ATTEMPTS must be a valid integer"))?;

        let initial_ms = std::env::var("CSRF_POLL_INITIAL_MS")
            .map(|val| val.parse::<u64>())
            .unwrap_or(Ok(100))
            .map_err(|_| AppError::configuration("CSRF_POLL_INITIAL_MS must be a valid integer"))?;
        config.csrf_poll_initial = Duration::from_millis(initial_ms);

        let timeout_secs = std::env::var("API_TIMEOUT_SECS")
            .map(|val| val.parse::<u64>())
            .unwrap_or(Ok(15))
            .map_err(|_| AppError::configuration("API_TIMEOUT_SECS must be a valid integer"))?;
        config.request_timeout = Duration::from_secs(timeout_secs);

        if config.csrf_poll_attempts == 0 {
            return Err(AppError::configuration("CSRF_POLL_ATTEMPTS must be at least 1"));
        }

        Ok(config)
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.api_base
            .join(path)
            .map_err(|err| AppError::configuration(format!("invalid endpoint path {path}: {err}")))
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, AppError> {
    Url::parse(raw.trim()).map_err(|err| AppError::configuration(format!("{var} is not a valid URL: {err}")))
}
