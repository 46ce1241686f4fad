// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session coordinator: the authentication state machine.
//!
//! One owned coordinator replaces the process-wide provider singleton —
//! every component that needs session state (gateway, poll starter, UI)
//! holds a reference to the same instance. State is mutated only through
//! the transition methods here; each transition to authenticated or
//! unauthenticated is broadcast before the triggering call resolves, so no
//! observer misses one.

mod dispatch;

pub use dispatch::spawn_dispatcher;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, OnceCell, RwLock};

use crate::provider::{IdentityProvider, LoginOptions, ProviderEvent};

/// Phase of the authentication session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Bootstrapping,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of session state.
///
/// Invariant: `phase == Authenticated` implies `access_token` is present and
/// `now < expires_at` held as of the last successful check.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub access_token: Option<String>,
    pub expires_at: u64,
    pub refresh_expires_at: u64,
    pub bootstrapped: bool,
}

/// Published on every transition.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Authenticated,
    Unauthenticated,
    /// Interactive re-login is required; the host shell navigates to the
    /// URL when one could be built.
    LoginRequired { auth_url: Option<String> },
}

pub struct SessionCoordinator<P> {
    provider: Arc<P>,
    state: RwLock<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
    refresh_threshold: Duration,
    bootstrap_cell: OnceCell<bool>,
}

impl<P: IdentityProvider> SessionCoordinator<P> {
    pub fn new(provider: Arc<P>, refresh_threshold: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            provider,
            state: RwLock::new(SessionState {
                phase: SessionPhase::Uninitialized,
                access_token: None,
                expires_at: 0,
                refresh_expires_at: 0,
                bootstrapped: false,
            }),
            event_tx,
            refresh_threshold,
            bootstrap_cell: OnceCell::new(),
        }
    }

    /// Run the provider's silent session check exactly once per coordinator
    /// lifetime. Concurrent and repeat callers share the single underlying
    /// `initialize()` call and observe its result. Failures are swallowed
    /// and mapped to unauthenticated — never left pending.
    pub async fn bootstrap(&self) -> bool {
        *self
            .bootstrap_cell
            .get_or_init(|| async {
                {
                    let mut st = self.state.write().await;
                    st.phase = SessionPhase::Bootstrapping;
                }

                let active = match self.provider.initialize().await {
                    Ok(active) => active,
                    Err(e) => {
                        tracing::warn!(err = %e, "identity provider initialization failed");
                        false
                    }
                };

                let authed = if active {
                    self.adopt_provider_session().await
                } else {
                    self.transition_unauthenticated().await;
                    false
                };

                {
                    let mut st = self.state.write().await;
                    st.bootstrapped = true;
                }
                authed
            })
            .await
    }

    /// Ensure a valid token is available for an outgoing request.
    ///
    /// When the remaining lifetime is below the safety threshold, exactly
    /// one provider refresh attempt is made for this call; at or above the
    /// threshold no refresh call is made. Proactive and reactive refreshes
    /// are not serialized here — the provider serializes them.
    pub async fn ensure_valid(&self) -> bool {
        let (phase, expires_at) = {
            let st = self.state.read().await;
            (st.phase, st.expires_at)
        };
        if phase != SessionPhase::Authenticated {
            return false;
        }
        if expires_at.saturating_sub(epoch_secs()) >= self.refresh_threshold.as_secs() {
            return true;
        }

        match self.provider.refresh(self.refresh_threshold).await {
            Ok(_) => self.adopt_provider_session().await,
            Err(e) => {
                tracing::warn!(err = %e, "proactive token refresh failed");
                self.transition_unauthenticated().await;
                false
            }
        }
    }

    /// React to an HTTP 401 from the gateway: collapse the session and
    /// request interactive login, so stale authenticated UI is never shown
    /// past a known-bad token.
    pub async fn handle_unauthorized(&self) {
        self.transition_unauthenticated().await;
        self.request_login().await;
    }

    /// User-initiated logout: no re-login redirect.
    pub async fn logout(&self) {
        if let Err(e) = self.provider.logout().await {
            tracing::warn!(err = %e, "provider logout failed");
        }
        self.transition_unauthenticated().await;
    }

    /// Apply a provider lifecycle event (called by the dispatcher).
    pub(crate) async fn apply_provider_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AuthSuccess => {
                self.adopt_provider_session().await;
            }
            ProviderEvent::TokenExpired => match self.provider.refresh(self.refresh_threshold).await
            {
                Ok(_) => {
                    if !self.adopt_provider_session().await {
                        self.request_login().await;
                    }
                }
                Err(e) => {
                    tracing::warn!(err = %e, "reactive token refresh failed");
                    self.transition_unauthenticated().await;
                    self.request_login().await;
                }
            },
            ProviderEvent::AuthError => {
                self.transition_unauthenticated().await;
                self.request_login().await;
            }
            ProviderEvent::Logout => {
                self.transition_unauthenticated().await;
            }
        }
    }

    /// Adopt the provider's current session material. Transitions to
    /// authenticated when a live token is present, otherwise collapses.
    async fn adopt_provider_session(&self) -> bool {
        let token = self.provider.access_token();
        let expires_at = self.provider.token_expires_at();
        let refresh_expires_at = self.provider.refresh_expires_at();
        let valid = token.is_some() && epoch_secs() < expires_at;

        if !valid {
            self.transition_unauthenticated().await;
            return false;
        }

        let changed = {
            let mut st = self.state.write().await;
            let changed = st.phase != SessionPhase::Authenticated;
            st.phase = SessionPhase::Authenticated;
            st.access_token = token;
            st.expires_at = expires_at;
            st.refresh_expires_at = refresh_expires_at;
            changed
        };
        if changed {
            let _ = self.event_tx.send(SessionEvent::Authenticated);
        }
        true
    }

    async fn transition_unauthenticated(&self) {
        let changed = {
            let mut st = self.state.write().await;
            let changed = st.phase != SessionPhase::Unauthenticated;
            st.phase = SessionPhase::Unauthenticated;
            st.access_token = None;
            st.expires_at = 0;
            st.refresh_expires_at = 0;
            changed
        };
        if changed {
            let _ = self.event_tx.send(SessionEvent::Unauthenticated);
        }
    }

    async fn request_login(&self) {
        match self.provider.login(LoginOptions::default()).await {
            Ok(url) => {
                let _ = self.event_tx.send(SessionEvent::LoginRequired { auth_url: Some(url) });
            }
            Err(e) => {
                tracing::warn!(err = %e, "interactive login request failed");
                let _ = self.event_tx.send(SessionEvent::LoginRequired { auth_url: None });
            }
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn bootstrapped(&self) -> bool {
        self.state.read().await.bootstrapped
    }

    /// Current access token, present only while authenticated.
    pub async fn access_token(&self) -> Option<String> {
        let st = self.state.read().await;
        if st.phase == SessionPhase::Authenticated { st.access_token.clone() } else { None }
    }

    /// Subject identifier from the provider's current session.
    pub fn subject_id(&self) -> Option<String> {
        self.provider.subject_id()
    }

    /// Subscribe to session transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }
}

/// Return the current UTC time as seconds since the Unix epoch.
pub(crate) fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
