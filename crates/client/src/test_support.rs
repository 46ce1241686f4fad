// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fakes for unit tests: a scriptable identity provider and a
//! scriptable record fetcher.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::activity::{ActivityRecord, ActivityStatus};
use crate::error::ClientError;
use crate::poller::RecordFetcher;
use crate::provider::{IdentityProvider, LoginOptions};
use crate::session::epoch_secs;

/// Build a reqwest client for tests, installing the process-global rustls
/// crypto provider first. reqwest is configured with `rustls-no-provider`,
/// so a provider must be installed before any `Client` is built.
pub(crate) fn test_http_client() -> reqwest::Client {
    use std::sync::Once;
    static PROVIDER: Once = Once::new();
    PROVIDER.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
    reqwest::Client::new()
}

#[derive(Default)]
struct FakeSession {
    token: Option<String>,
    expires_at: u64,
    refresh_expires_at: u64,
    subject: Option<String>,
}

/// Identity provider fake with call counters and scriptable outcomes.
pub(crate) struct FakeProvider {
    inner: Mutex<FakeSession>,
    pub init_calls: AtomicU32,
    pub refresh_calls: AtomicU32,
    pub login_calls: AtomicU32,
    pub logout_calls: AtomicU32,
    init_active: bool,
    init_fails: bool,
    init_delay: Duration,
    refresh_fails: AtomicBool,
    refresh_extends_secs: AtomicU64,
}

impl FakeProvider {
    fn base() -> Self {
        Self {
            inner: Mutex::new(FakeSession::default()),
            init_calls: AtomicU32::new(0),
            refresh_calls: AtomicU32::new(0),
            login_calls: AtomicU32::new(0),
            logout_calls: AtomicU32::new(0),
            init_active: false,
            init_fails: false,
            init_delay: Duration::ZERO,
            refresh_fails: AtomicBool::new(false),
            refresh_extends_secs: AtomicU64::new(3600),
        }
    }

    /// Provider holding a live session with the given token lifetime.
    pub fn authenticated(ttl_secs: u64) -> Arc<Self> {
        let mut provider = Self::base();
        provider.init_active = true;
        provider.set_token("fake-token", ttl_secs);
        Arc::new(provider)
    }

    /// Provider with no session: silent check reports none.
    pub fn without_session() -> Arc<Self> {
        Arc::new(Self::base())
    }

    /// Provider whose silent check errors out.
    pub fn failing_init() -> Arc<Self> {
        let mut provider = Self::base();
        provider.init_fails = true;
        Arc::new(provider)
    }

    /// Like [`FakeProvider::authenticated`], with a slow silent check so
    /// concurrent bootstrap callers overlap.
    pub fn authenticated_slow_init(ttl_secs: u64, delay: Duration) -> Arc<Self> {
        let mut provider = Self::base();
        provider.init_active = true;
        provider.init_delay = delay;
        provider.set_token("fake-token", ttl_secs);
        Arc::new(provider)
    }

    pub fn set_token(&self, token: &str, ttl_secs: u64) {
        let mut s = self.inner.lock();
        s.token = Some(token.to_owned());
        s.expires_at = epoch_secs() + ttl_secs;
        s.refresh_expires_at = epoch_secs() + ttl_secs + 1800;
        s.subject = Some("subject-1".to_owned());
    }

    pub fn set_refresh_fails(&self, fails: bool) {
        self.refresh_fails.store(fails, Ordering::SeqCst);
    }

    /// Lifetime granted to the token by each successful refresh.
    pub fn set_refresh_extends(&self, secs: u64) {
        self.refresh_extends_secs.store(secs, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn login_count(&self) -> u32 {
        self.login_calls.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for FakeProvider {
    async fn initialize(&self) -> anyhow::Result<bool> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if self.init_fails {
            anyhow::bail!("provider unreachable");
        }
        Ok(self.init_active)
    }

    async fn refresh(&self, _min_validity: Duration) -> anyhow::Result<bool> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails.load(Ordering::SeqCst) {
            anyhow::bail!("refresh failed (400 Bad Request): invalid_grant");
        }
        let mut s = self.inner.lock();
        s.expires_at = epoch_secs() + self.refresh_extends_secs.load(Ordering::SeqCst);
        Ok(true)
    }

    async fn login(&self, _opts: LoginOptions) -> anyhow::Result<String> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        Ok("https://idp.example/auth?client_id=test".to_owned())
    }

    async fn logout(&self) -> anyhow::Result<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        *self.inner.lock() = FakeSession::default();
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

/// One scripted outcome for [`ScriptedFetcher`].
pub(crate) enum FetchStep {
    Record(ActivityRecord),
    Absent,
    Fail,
    /// Park until the notify fires, then yield the record.
    Blocked(Arc<Notify>, ActivityRecord),
}

/// Fetcher that replays a fixed script; further calls report absent.
pub(crate) struct ScriptedFetcher {
    steps: Mutex<VecDeque<FetchStep>>,
    calls: AtomicU32,
}

impl ScriptedFetcher {
    pub fn new(steps: Vec<FetchStep>) -> Arc<Self> {
        Arc::new(Self { steps: Mutex::new(steps.into()), calls: AtomicU32::new(0) })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RecordFetcher for ScriptedFetcher {
    async fn fetch(&self, _id: &str) -> Result<Option<ActivityRecord>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().pop_front();
        match step {
            Some(FetchStep::Record(record)) => Ok(Some(record)),
            Some(FetchStep::Absent) | None => Ok(None),
            Some(FetchStep::Fail) => Err(ClientError::Transport("connection reset".to_owned())),
            Some(FetchStep::Blocked(gate, record)) => {
                gate.notified().await;
                Ok(Some(record))
            }
        }
    }
}

/// Minimal record for cache and poller tests.
pub(crate) fn record(id: &str, status: ActivityStatus) -> ActivityRecord {
    ActivityRecord {
        id: id.to_owned(),
        subject_id: None,
        activity_type: None,
        duration: 0,
        calories_burned: 0,
        start_time: None,
        additional_metrics: serde_json::Map::new(),
        status,
        recommendation: None,
        created_at: None,
        updated_at: None,
    }
}
