//! Client-side session core: credential persistence, CSRF, startup
//! reconciliation with the backend, login/logout and authenticated calls.
//!
//! One [`SessionManager`] per app instance, handed to whoever needs it.
//! Observers follow changes through [`SessionManager::subscribe`].

pub mod backend;
pub mod cookies;
pub mod csrf;
pub mod navigator;
pub mod store;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::authz;
use crate::authz::guard::LOGIN_PATH;
use crate::config::ClientConfig;
use crate::errors::{AppError, AppResult};
use crate::models::user::LoginRequest;
use crate::models::{Session, UserProfile};
use crate::utils::token_fingerprint;

pub use backend::{AuthApi, HttpAuthApi};
pub use cookies::CookieMirror;
pub use csrf::CsrfProvider;
pub use navigator::{LogNavigator, Navigator, RecordingNavigator};
pub use store::{CredentialStore, MemorySlotStore, Slot, SlotStore, SqliteSlotStore, StoredSession};

pub struct SessionManager {
    state: watch::Sender<Session>,
    store: CredentialStore,
    csrf: CsrfProvider,
    api: Arc<dyn AuthApi>,
    navigator: Arc<dyn Navigator>,
    initialized: AtomicBool,
}

/// Raises one of the session's progress flags and lowers it again when
/// dropped, whichever way the enclosing operation exits.
struct FlagGuard<'a> {
    state: &'a watch::Sender<Session>,
    flag: fn(&mut Session) -> &mut bool,
}

impl<'a> FlagGuard<'a> {
    fn raise(state: &'a watch::Sender<Session>, flag: fn(&mut Session) -> &mut bool) -> Self {
        state.send_modify(|session| *flag(session) = true);
        Self { state, flag }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        let flag = self.flag;
        self.state.send_modify(|session| *flag(session) = false);
    }
}

fn loading_flag(session: &mut Session) -> &mut bool {
    &mut session.is_loading
}

fn logging_out_flag(session: &mut Session) -> &mut bool {
    &mut session.is_logging_out
}

impl SessionManager {
    pub fn new(
        store: CredentialStore,
        csrf: CsrfProvider,
        api: Arc<dyn AuthApi>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (state, _) = watch::channel(Session::unauthenticated());
        Self {
            state,
            store,
            csrf,
            api,
            navigator,
            initialized: AtomicBool::new(false),
        }
    }

    /// Wires the HTTP client, cookie jar and CSRF provider around the given
    /// long-lived and tab-scoped stores.
    pub fn with_stores(
        config: ClientConfig,
        durable: Arc<dyn SlotStore>,
        tab: Arc<dyn SlotStore>,
        navigator: Arc<dyn Navigator>,
    ) -> AppResult<Self> {
        let jar = Arc::new(Jar::default());
        let cookies = CookieMirror::new(jar.clone(), config.app_origin.clone(), config.api_base.clone());
        let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(config.clone(), jar)?);
        let csrf = CsrfProvider::new(
            api.clone(),
            cookies.clone(),
            config.csrf_poll_attempts,
            config.csrf_poll_initial,
        );
        let store = CredentialStore::new(durable, tab, cookies);
        Ok(Self::new(store, csrf, api, navigator))
    }

    /// Same as [`with_stores`](Self::with_stores) with a fresh tab store.
    pub fn from_config(
        config: ClientConfig,
        durable: Arc<dyn SlotStore>,
        navigator: Arc<dyn Navigator>,
    ) -> AppResult<Self> {
        Self::with_stores(config, durable, Arc::new(MemorySlotStore::new()), navigator)
    }

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn can_access(&self, path: &str) -> bool {
        authz::can_access(&self.state.borrow(), path)
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    pub fn csrf(&self) -> &CsrfProvider {
        &self.csrf
    }

    /// Reconciles stored credentials with the backend. Runs once; later calls
    /// return the current state untouched. Every failure ends signed out.
    pub async fn initialize_auth(&self) -> Session {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return self.snapshot();
        }

        let loading = FlagGuard::raise(&self.state, loading_flag);
        let verdict = match self.reconcile().await {
            Ok(session) => session,
            Err(err) => {
                match &err {
                    AppError::UnknownRole(role) => {
                        tracing::error!(role = %role, "backend confirmed a role outside the known set")
                    }
                    _ => tracing::warn!(error = %err, "stored session could not be confirmed"),
                }
                Session::unauthenticated()
            }
        };
        self.state.send_modify(|session| session.adopt(verdict));
        drop(loading);

        let session = self.snapshot();
        tracing::info!(
            authenticated = session.is_authenticated,
            role = ?session.role(),
            "session initialized"
        );
        session
    }

    async fn reconcile(&self) -> AppResult<Session> {
        let stored = self.store.load_session().await?;
        if stored.is_empty() {
            return Ok(Session::unauthenticated());
        }

        let (token, cached) = match (stored.token(), stored.profile.as_deref()) {
            (Some(token), Some(cached)) => (token.to_string(), cached),
            _ => {
                tracing::debug!("stored session is incomplete");
                return Ok(Session::unauthenticated());
            }
        };
        let cached_id = cached_profile_id(cached)?;

        let fresh = self.api.current_user(&token).await?;
        let fresh_id = fresh.get("id").and_then(Value::as_u64);
        if fresh_id != Some(cached_id) {
            tracing::warn!(cached_id, ?fresh_id, "backend user differs from cached profile");
            return Ok(Session::unauthenticated());
        }

        let profile = UserProfile::from_value(fresh)?;
        self.store.persist_profile(&profile).await?;
        self.store
            .cookies()
            .mirror(&token, profile.role, stored.remember_token.is_some());

        tracing::debug!(
            user_id = profile.id,
            token = %token_fingerprint(&token),
            "stored session confirmed"
        );
        Ok(Session::authenticated(token, profile))
    }

    pub async fn login(&self, email: &str, password: &str, remember: bool) -> AppResult<UserProfile> {
        let csrf = self.csrf.ensure_csrf_token().await?;
        let request = LoginRequest {
            email,
            password,
            remember,
        };
        let payload = self.api.login(&request, &csrf).await?;
        let profile = UserProfile::from_value(payload.user)?;

        self.store
            .persist_session(&payload.token, &profile, remember)
            .await?;
        let verdict = Session::authenticated(payload.token, profile.clone());
        self.state.send_modify(|session| session.adopt(verdict));

        tracing::info!(user_id = profile.id, role = %profile.role, remember, "signed in");
        Ok(profile)
    }

    /// Replaces the signed-in user's profile wholesale.
    pub async fn update_profile(&self, profile: UserProfile) -> AppResult<()> {
        let current = self.snapshot();
        let token = match (current.is_authenticated, current.access_token) {
            (true, Some(token)) => token,
            _ => return Err(AppError::Unauthenticated),
        };

        self.store.persist_profile(&profile).await?;
        let role_changed = current.user.as_ref().map(|user| user.role) != Some(profile.role);
        if role_changed {
            let remember = self.store.load_session().await?.remember_token.is_some();
            self.store.cookies().mirror(&token, profile.role, remember);
        }

        tracing::debug!(user_id = profile.id, role_changed, "profile updated");
        self.state.send_modify(|session| session.user = Some(profile));
        Ok(())
    }

    /// Signs out locally first, then tells the backend. Never fails: the
    /// backend's answer cannot undo the local teardown. The backend call only
    /// carries a CSRF header when the cookie is already cached.
    pub async fn logout(&self) {
        let logging_out = FlagGuard::raise(&self.state, logging_out_flag);

        let token = match self.snapshot().access_token {
            Some(token) => Some(token),
            None => self
                .store
                .load_session()
                .await
                .ok()
                .and_then(|stored| stored.token().map(str::to_string)),
        };

        if let Err(err) = self.store.clear_session().await {
            tracing::warn!(error = %err, "credential storage not fully cleared");
        }
        self.state
            .send_modify(|session| session.adopt(Session::unauthenticated()));

        // Fire-and-forget: use the cookie if it is already there, never bootstrap.
        let csrf = self.csrf.cached();
        if csrf.is_none() {
            tracing::debug!("logging out without csrf token");
        }
        match self.api.logout(token.as_deref(), csrf.as_deref()).await {
            Ok(()) => tracing::info!("signed out"),
            Err(err) => tracing::warn!(error = %err, "backend logout failed; local session already cleared"),
        }

        self.navigator.assign(LOGIN_PATH);
        drop(logging_out);
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let value = self.call(Method::GET, path, None).await?;
        backend::decode_value(value)
    }

    pub async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> AppResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        let value = self.call(method, path, Some(body)).await?;
        backend::decode_value(value)
    }

    /// Authenticated call. Mutating methods carry the CSRF header and abort
    /// before sending when it cannot be obtained. A 401 sends the user to the
    /// login page; other failures leave the session as it is.
    async fn call(&self, method: Method, path: &str, body: Option<Value>) -> AppResult<Value> {
        let token = match self.snapshot().access_token {
            Some(token) => token,
            None => {
                self.navigator.assign(LOGIN_PATH);
                return Err(AppError::Unauthenticated);
            }
        };

        let csrf = if is_mutating(&method) {
            Some(self.csrf.ensure_csrf_token().await?)
        } else {
            None
        };

        match self.api.send(method.clone(), path, &token, csrf.as_deref(), body).await {
            Err(AppError::Unauthenticated) => {
                tracing::warn!(%method, path, "backend rejected session token");
                self.navigator.assign(LOGIN_PATH);
                Err(AppError::Unauthenticated)
            }
            other => other,
        }
    }
}

fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Id of the cached profile; anything without a positive integer id is
/// malformed.
fn cached_profile_id(raw: &str) -> AppResult<u64> {
    let value: Value =
        serde_json::from_str(raw).map_err(|err| AppError::malformed_session(err.to_string()))?;
    value
        .get("id")
        .and_then(Value::as_u64)
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::malformed_session("cached profile has no id"))
}
