// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end client smoke tests.
//!
//! Spins up a mock backend over real TCP and provides a scriptable identity
//! provider, so the full client — session coordinator, gateway, poller,
//! cache — is exercised over the wire.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use fitpulse::provider::{IdentityProvider, LoginOptions, ProviderEvent};

static CRYPTO_INIT: Once = Once::new();

/// Install the ring crypto provider for reqwest/rustls.
/// Safe to call multiple times — only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Initialize test logging from `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// -- Mock backend -------------------------------------------------------------

/// Scriptable backend state shared with the handlers.
pub struct BackendState {
    /// Bearer token required on protected routes. `None` accepts anything.
    pub expected_token: Mutex<Option<String>>,
    /// Per-activity sequence of fetch responses; exhausted or missing → 404.
    pub activity_scripts: Mutex<HashMap<String, VecDeque<Value>>>,
    /// Response for `getUserActivities`.
    pub activities: Mutex<Vec<Value>>,
    /// Response for `getUserRecommendations`.
    pub recommendations: Mutex<Vec<Value>>,
    /// Response for `track`.
    pub track_response: Mutex<Value>,
    /// Bodies received by `track`.
    pub track_requests: Mutex<Vec<Value>>,
    /// Bodies received by `register`.
    pub registrations: Mutex<Vec<Value>>,
    /// Per-activity fetch counts.
    pub fetch_counts: Mutex<HashMap<String, u32>>,
    /// All requests that reached a protected handler.
    pub protected_hits: AtomicU32,
}

impl BackendState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            expected_token: Mutex::new(None),
            activity_scripts: Mutex::new(HashMap::new()),
            activities: Mutex::new(Vec::new()),
            recommendations: Mutex::new(Vec::new()),
            track_response: Mutex::new(json!({"id": "a1", "status": "PENDING"})),
            track_requests: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            fetch_counts: Mutex::new(HashMap::new()),
            protected_hits: AtomicU32::new(0),
        })
    }

    pub fn require_token(&self, token: &str) {
        *self.expected_token.lock() = Some(token.to_owned());
    }

    /// Script the per-attempt responses for one activity id.
    pub fn script_activity(&self, id: &str, responses: Vec<Value>) {
        self.activity_scripts.lock().insert(id.to_owned(), responses.into());
    }

    pub fn fetch_count(&self, id: &str) -> u32 {
        self.fetch_counts.lock().get(id).copied().unwrap_or(0)
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = self.expected_token.lock().clone();
        match expected {
            None => true,
            Some(token) => {
                let want = format!("Bearer {token}");
                headers.get("authorization").and_then(|v| v.to_str().ok()) == Some(want.as_str())
            }
        }
    }
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid or missing token"})))
}

async fn track_handler(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    state.track_requests.lock().push(body);
    (StatusCode::OK, Json(state.track_response.lock().clone()))
}

async fn get_activity_handler(
    State(state): State<Arc<BackendState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    *state.fetch_counts.lock().entry(id.clone()).or_insert(0) += 1;
    match state.activity_scripts.lock().get_mut(&id).and_then(|s| s.pop_front()) {
        Some(response) => (StatusCode::OK, Json(response)),
        None => (StatusCode::NOT_FOUND, Json(json!({"message": "no such activity"}))),
    }
}

async fn list_activities_handler(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(Value::Array(state.activities.lock().clone())))
}

async fn list_recommendations_handler(
    State(state): State<Arc<BackendState>>,
    Path(_subject): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    (StatusCode::OK, Json(Value::Array(state.recommendations.lock().clone())))
}

async fn register_handler(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let email = body["email"].clone();
    state.registrations.lock().push(body);
    Json(json!({"id": "u1", "keycloakId": "kc-new", "email": email}))
}

/// A mock backend served on an ephemeral local port.
pub struct MockBackend {
    pub addr: SocketAddr,
    pub state: Arc<BackendState>,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

pub async fn spawn_backend() -> anyhow::Result<MockBackend> {
    let state = BackendState::new();
    let router = Router::new()
        .route("/api/activities/track", post(track_handler))
        .route("/api/activities/getUserActivities", get(list_activities_handler))
        .route("/api/activities/{id}", get(get_activity_handler))
        .route(
            "/api/recommendations/getUserRecommendations/{subject}",
            get(list_recommendations_handler),
        )
        .route("/api/users/register", post(register_handler))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(MockBackend { addr, state })
}

// -- Scriptable identity provider ---------------------------------------------

#[derive(Default)]
struct StubSession {
    token: Option<String>,
    expires_at: u64,
    refresh_expires_at: u64,
    subject: Option<String>,
}

/// In-process identity provider with an externally drivable event channel.
pub struct StubProvider {
    inner: Mutex<StubSession>,
    active_on_init: AtomicBool,
    pub refresh_calls: AtomicU32,
    pub login_calls: AtomicU32,
    event_tx: mpsc::UnboundedSender<ProviderEvent>,
}

impl StubProvider {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let provider = Arc::new(Self {
            inner: Mutex::new(StubSession::default()),
            active_on_init: AtomicBool::new(false),
            refresh_calls: AtomicU32::new(0),
            login_calls: AtomicU32::new(0),
            event_tx,
        });
        (provider, event_rx)
    }

    /// Install a session; the silent check will report it active.
    pub fn set_session(&self, token: &str, ttl_secs: u64, subject: &str) {
        let now = epoch_secs();
        *self.inner.lock() = StubSession {
            token: Some(token.to_owned()),
            expires_at: now + ttl_secs,
            refresh_expires_at: now + ttl_secs + 1800,
            subject: Some(subject.to_owned()),
        };
        self.active_on_init.store(true, Ordering::SeqCst);
    }

    /// Drive the provider's lifecycle channel, as the real provider's hooks
    /// would.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn refresh_count(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for StubProvider {
    async fn initialize(&self) -> anyhow::Result<bool> {
        Ok(self.active_on_init.load(Ordering::SeqCst) && self.inner.lock().token.is_some())
    }

    async fn refresh(&self, _min_validity: Duration) -> anyhow::Result<bool> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let mut s = self.inner.lock();
        if s.token.is_none() {
            anyhow::bail!("no active session");
        }
        s.expires_at = epoch_secs() + 3600;
        Ok(true)
    }

    async fn login(&self, _opts: LoginOptions) -> anyhow::Result<String> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        Ok("https://idp.example/auth?client_id=fitpulse-web".to_owned())
    }

    async fn logout(&self) -> anyhow::Result<()> {
        *self.inner.lock() = StubSession::default();
        Ok(())
    }

    fn access_token(&self) -> Option<String> {
        self.inner.lock().token.clone()
    }

    fn token_expires_at(&self) -> u64 {
        self.inner.lock().expires_at
    }

    fn refresh_expires_at(&self) -> u64 {
        self.inner.lock().refresh_expires_at
    }

    fn subject_id(&self) -> Option<String> {
        self.inner.lock().subject.clone()
    }
}

fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
