use std::sync::Arc;
use std::time::Duration;

use crate::authz::guard::CSRF_COOKIE;
use crate::errors::{AppResult, CsrfError};
use crate::session::backend::AuthApi;
use crate::session::cookies::CookieMirror;

/// Supplies the anti-forgery token mutating requests must carry.
///
/// The cookie jar is the cache. On a miss the backend is asked once to set
/// the cookie, then the jar is polled with doubling delays because the
/// cookie write is not guaranteed to be visible when the response resolves.
/// Concurrent misses may each bootstrap; the endpoint is idempotent.
#[derive(Clone)]
pub struct CsrfProvider {
    api: Arc<dyn AuthApi>,
    cookies: CookieMirror,
    poll_attempts: u32,
    poll_initial: Duration,
}

impl CsrfProvider {
    pub fn new(api: Arc<dyn AuthApi>, cookies: CookieMirror, poll_attempts: u32, poll_initial: Duration) -> Self {
        Self {
            api,
            cookies,
            poll_attempts: poll_attempts.max(1),
            poll_initial,
        }
    }

    pub fn cached(&self) -> Option<String> {
        self.cookies.api_cookie(CSRF_COOKIE)
    }

    pub async fn ensure_csrf_token(&self) -> AppResult<String> {
        if let Some(token) = self.cached() {
            return Ok(token);
        }

        tracing::debug!("csrf cookie missing, bootstrapping");
        self.api.bootstrap_csrf().await.map_err(|err| {
            tracing::warn!(error = %err, "csrf bootstrap failed");
            err
        })?;

        let mut delay = self.poll_initial;
        for attempt in 1..=self.poll_attempts {
            tokio::time::sleep(delay).await;
            if let Some(token) = self.cached() {
                tracing::debug!(attempt, "csrf cookie visible");
                return Ok(token);
            }
            delay = delay.saturating_mul(2);
        }

        tracing::warn!(attempts = self.poll_attempts, "csrf cookie never appeared");
        Err(CsrfError::CookieMissing {
            attempts: self.poll_attempts,
        }
        .into())
    }
}
