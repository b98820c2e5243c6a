use std::sync::Arc;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::errors::{AppError, AppResult, CsrfError};
use crate::models::user::{DataEnvelope, LoginPayload, LoginRequest};

pub const CSRF_HEADER: &str = "X-XSRF-TOKEN";

/// Outbound calls the session core makes to the studio backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Asks the backend to set a fresh `XSRF-TOKEN` cookie.
    async fn bootstrap_csrf(&self) -> Result<(), CsrfError>;

    /// Current user for `token`, as the raw `data` object.
    async fn current_user(&self, token: &str) -> AppResult<Value>;

    async fn login(&self, request: &LoginRequest<'_>, csrf: &str) -> AppResult<LoginPayload>;

    async fn logout(&self, token: Option<&str>, csrf: Option<&str>) -> AppResult<()>;

    /// Any other authenticated call. Empty bodies come back as `null`.
    async fn send(
        &self,
        method: Method,
        path: &str,
        token: &str,
        csrf: Option<&str>,
        body: Option<Value>,
    ) -> AppResult<Value>;
}

/// `AuthApi` over `reqwest`, sharing the cookie jar with [`CookieMirror`].
///
/// [`CookieMirror`]: crate::session::cookies::CookieMirror
#[derive(Clone)]
pub struct HttpAuthApi {
    client: Client,
    config: ClientConfig,
}

impl HttpAuthApi {
    pub fn new(config: ClientConfig, jar: Arc<Jar>) -> AppResult<Self> {
        let client = Client::builder()
            .cookie_provider(jar)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn request(&self, method: Method, path: &str) -> AppResult<reqwest::RequestBuilder> {
        let url = self.config.endpoint(path)?;
        Ok(self
            .client
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json"))
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn bootstrap_csrf(&self) -> Result<(), CsrfError> {
        let request = self
            .request(Method::GET, &self.config.csrf_path)
            .map_err(|err| CsrfError::Transport(err.to_string()))?;
        let response = request
            .send()
            .await
            .map_err(|err| CsrfError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CsrfError::Bootstrap {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn current_user(&self, token: &str) -> AppResult<Value> {
        let response = self
            .request(Method::GET, &self.config.current_user_path)?
            .bearer_auth(token)
            .send()
            .await?;
        let envelope: DataEnvelope<Value> = decode_success(response).await?;
        Ok(envelope.data)
    }

    async fn login(&self, request: &LoginRequest<'_>, csrf: &str) -> AppResult<LoginPayload> {
        let response = self
            .request(Method::POST, &self.config.login_path)?
            .header(CSRF_HEADER, csrf)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(AppError::unauthorized("invalid credentials"));
        }
        let envelope: DataEnvelope<LoginPayload> = decode_success(response).await?;
        Ok(envelope.data)
    }

    async fn logout(&self, token: Option<&str>, csrf: Option<&str>) -> AppResult<()> {
        let mut request = self.request(Method::POST, &self.config.logout_path)?;
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(csrf) = csrf {
            request = request.header(CSRF_HEADER, csrf);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::from_status(status));
        }
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: &str,
        csrf: Option<&str>,
        body: Option<Value>,
    ) -> AppResult<Value> {
        let mut request = self.request(method, path)?.bearer_auth(token);
        if let Some(csrf) = csrf {
            request = request.header(CSRF_HEADER, csrf);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::from_status(status));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        decode_slice(&bytes)
    }
}

async fn decode_success<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::from_status(status));
    }
    let bytes = response.bytes().await?;
    decode_slice(&bytes)
}

/// JSON decode that reports where in the document it failed.
pub fn decode_slice<T: DeserializeOwned>(bytes: &[u8]) -> AppResult<T> {
    let deserializer = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(deserializer).map_err(|err| AppError::decode(err.to_string()))
}

pub fn decode_value<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    serde_path_to_error::deserialize(value).map_err(|err| AppError::decode(err.to_string()))
}
