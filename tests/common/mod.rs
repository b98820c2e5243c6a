#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use reqwest::Url;
use serde_json::{json, Value};
use tokio::sync::Notify;

use studio_gate::config::ClientConfig;
use studio_gate::session::{MemorySlotStore, RecordingNavigator, SessionManager, Slot, SlotStore};

pub const VALID_TOKEN: &str = "tok-valid";
pub const CSRF_VALUE: &str = "csrf-123";
pub const PASSWORD: &str = "correct horse";

/// Scriptable stand-in for the studio backend.
pub struct BackendState {
    pub csrf_hits: AtomicUsize,
    pub csrf_sets_cookie: AtomicBool,
    pub csrf_status: Mutex<StatusCode>,
    pub me_hits: AtomicUsize,
    pub me_status: Mutex<StatusCode>,
    pub me_user: Mutex<Value>,
    /// When set, `/api/user` holds its answer until notified.
    pub me_gate: Mutex<Option<Arc<Notify>>>,
    pub login_user: Mutex<Value>,
    pub login_csrf: Mutex<Option<String>>,
    pub logout_hits: AtomicUsize,
    pub logout_status: Mutex<StatusCode>,
    pub workload_status: Mutex<StatusCode>,
    pub workload_csrf: Mutex<Option<String>>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            csrf_hits: AtomicUsize::new(0),
            csrf_sets_cookie: AtomicBool::new(true),
            csrf_status: Mutex::new(StatusCode::NO_CONTENT),
            me_hits: AtomicUsize::new(0),
            me_status: Mutex::new(StatusCode::OK),
            me_user: Mutex::new(profile_json(7, "Owner")),
            me_gate: Mutex::new(None),
            login_user: Mutex::new(profile_json(7, "Owner")),
            login_csrf: Mutex::new(None),
            logout_hits: AtomicUsize::new(0),
            logout_status: Mutex::new(StatusCode::NO_CONTENT),
            workload_status: Mutex::new(StatusCode::OK),
            workload_csrf: Mutex::new(None),
        }
    }
}

impl BackendState {
    pub fn set_me(&self, status: StatusCode, user: Value) {
        *self.me_status.lock().unwrap() = status;
        *self.me_user.lock().unwrap() = user;
    }
}

pub fn profile_json(id: u64, role: &str) -> Value {
    json!({
        "id": id,
        "full_name": "Maya Santos",
        "email": "maya@superseven.studio",
        "contact_no": "09171234567",
        "address": "Quezon City",
        "role": role,
        "status": "active"
    })
}

pub struct FakeBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

impl FakeBackend {
    pub async fn start() -> anyhow::Result<Self> {
        let state = Arc::new(BackendState::default());
        let router = Router::new()
            .route("/sanctum/csrf-cookie", get(csrf_cookie))
            .route("/api/user", get(current_user))
            .route("/api/login", post(login))
            .route("/api/logout", post(logout))
            .route("/api/workloads", get(list_workloads).post(create_workload))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self { addr, state })
    }

    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("valid backend url")
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.url(), self.url());
        config.csrf_poll_attempts = 3;
        config.csrf_poll_initial = Duration::from_millis(5);
        config.request_timeout = Duration::from_secs(5);
        config
    }
}

/// A manager plus the stores behind it, so tests can seed and inspect them.
pub struct Harness {
    pub manager: SessionManager,
    pub durable: Arc<MemorySlotStore>,
    pub tab: Arc<MemorySlotStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl Harness {
    pub fn new(backend: &FakeBackend) -> anyhow::Result<Self> {
        Self::with_stores(
            backend,
            Arc::new(MemorySlotStore::new()),
            Arc::new(MemorySlotStore::new()),
        )
    }

    pub fn with_stores(
        backend: &FakeBackend,
        durable: Arc<MemorySlotStore>,
        tab: Arc<MemorySlotStore>,
    ) -> anyhow::Result<Self> {
        let navigator = Arc::new(RecordingNavigator::new());
        let manager = SessionManager::with_stores(
            backend.client_config(),
            durable.clone(),
            tab.clone(),
            navigator.clone(),
        )?;
        Ok(Self {
            manager,
            durable,
            tab,
            navigator,
        })
    }

    /// Seeds storage as a previous page load would have left it.
    pub async fn seed(
        &self,
        session_token: Option<&str>,
        remember_token: Option<&str>,
        profile: Option<&str>,
    ) -> anyhow::Result<()> {
        if let Some(token) = session_token {
            self.tab.set(Slot::SessionToken, token).await?;
        }
        if let Some(token) = remember_token {
            self.durable.set(Slot::RememberToken, token).await?;
        }
        if let Some(profile) = profile {
            self.durable.set(Slot::UserProfile, profile).await?;
        }
        Ok(())
    }

    pub async fn slot_values(&self) -> anyhow::Result<Vec<Option<String>>> {
        let mut values = Vec::new();
        for slot in Slot::ALL {
            values.push(self.tab.get(slot).await?);
            values.push(self.durable.get(slot).await?);
        }
        Ok(values)
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn csrf_cookie(State(state): State<Arc<BackendState>>) -> Response {
    state.csrf_hits.fetch_add(1, Ordering::SeqCst);
    let status = *state.csrf_status.lock().unwrap();
    if !status.is_success() || !state.csrf_sets_cookie.load(Ordering::SeqCst) {
        return status.into_response();
    }
    (
        status,
        [(SET_COOKIE, format!("XSRF-TOKEN={CSRF_VALUE}; Path=/; SameSite=Lax"))],
    )
        .into_response()
}

async fn current_user(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.me_hits.fetch_add(1, Ordering::SeqCst);
    let gate = state.me_gate.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.notified().await;
    }
    if bearer(&headers) != Some(VALID_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let status = *state.me_status.lock().unwrap();
    if !status.is_success() {
        return status.into_response();
    }
    let user = state.me_user.lock().unwrap().clone();
    (status, Json(json!({ "data": user }))).into_response()
}

async fn login(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    *state.login_csrf.lock().unwrap() = headers
        .get("x-xsrf-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if body.get("password").and_then(Value::as_str) != Some(PASSWORD) {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "message": "invalid" }))).into_response();
    }
    let user = state.login_user.lock().unwrap().clone();
    Json(json!({ "data": { "token": VALID_TOKEN, "user": user } })).into_response()
}

async fn logout(State(state): State<Arc<BackendState>>) -> Response {
    state.logout_hits.fetch_add(1, Ordering::SeqCst);
    let status = *state.logout_status.lock().unwrap();
    status.into_response()
}

async fn list_workloads(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if bearer(&headers) != Some(VALID_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let status = *state.workload_status.lock().unwrap();
    if !status.is_success() {
        return status.into_response();
    }
    Json(json!([{ "id": 1, "title": "Santos wedding edit", "status": "pending" }])).into_response()
}

async fn create_workload(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if bearer(&headers) != Some(VALID_TOKEN) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    *state.workload_csrf.lock().unwrap() = headers
        .get("x-xsrf-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (StatusCode::CREATED, Json(json!({ "id": 2, "title": body["title"] }))).into_response()
}
