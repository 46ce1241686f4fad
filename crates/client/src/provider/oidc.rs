// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OIDC identity provider backed by a realm token endpoint.
//!
//! Covers the silent session check (a persisted refresh token handed over by
//! the host shell), threshold-aware refresh via the `refresh_token` grant,
//! interactive login as an authorization code + PKCE S256 URL, and a
//! background watcher that emits [`ProviderEvent::TokenExpired`] when the
//! access token passes its expiry.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::provider::pkce;
use crate::provider::{IdentityProvider, LoginOptions, ProviderEvent};
use crate::session::epoch_secs;

/// Standard OAuth2 token response, with Keycloak's refresh expiry field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Endpoint configuration for [`OidcProvider`].
#[derive(Debug, Clone)]
pub struct OidcConfig {
    pub token_url: String,
    pub auth_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scopes: String,
    /// Refresh token persisted by the host shell; enables silent init.
    pub initial_refresh_token: Option<String>,
}

impl OidcConfig {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            token_url: config.token_url.clone(),
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
            initial_refresh_token: config.refresh_token.clone(),
        }
    }
}

/// Live session material.
#[derive(Debug, Clone)]
struct OidcSession {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: u64,
    refresh_expires_at: u64,
    subject: Option<String>,
}

/// In-flight interactive login (PKCE verifier held until code exchange).
struct PendingLogin {
    state: String,
    code_verifier: String,
    redirect_uri: String,
}

pub struct OidcProvider {
    config: OidcConfig,
    http: reqwest::Client,
    session: Mutex<Option<OidcSession>>,
    pending_login: Mutex<Option<PendingLogin>>,
    event_tx: mpsc::UnboundedSender<ProviderEvent>,
}

impl OidcProvider {
    /// Create a provider and the event receiver to hand to the session
    /// dispatcher.
    pub fn new(
        config: OidcConfig,
        http: reqwest::Client,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let provider = Arc::new(Self {
            config,
            http,
            session: Mutex::new(None),
            pending_login: Mutex::new(None),
            event_tx,
        });
        (provider, event_rx)
    }

    /// Perform a single `refresh_token` grant against the token endpoint.
    async fn refresh_grant(&self, refresh_token: &str) -> anyhow::Result<TokenResponse> {
        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", &self.config.client_id),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("refresh failed ({status}): {text}");
        }

        let token: TokenResponse = resp.json().await?;
        Ok(token)
    }

    fn store_token_response(&self, token: TokenResponse) {
        let now = epoch_secs();
        let claims = decode_jwt_claims(&token.access_token).unwrap_or(serde_json::Value::Null);
        let expires_at = claims
            .get("exp")
            .and_then(|v| v.as_u64())
            .unwrap_or(now + token.expires_in);
        let refresh_expires_at =
            if token.refresh_expires_in > 0 { now + token.refresh_expires_in } else { 0 };
        let subject = claims.get("sub").and_then(|v| v.as_str()).map(String::from);

        *self.session.lock() = Some(OidcSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            refresh_expires_at,
            subject,
        });
    }

    /// Complete an interactive login with the code returned by the
    /// authorization server redirect.
    pub async fn complete_login(&self, state: &str, code: &str) -> anyhow::Result<()> {
        let pending = self
            .pending_login
            .lock()
            .take()
            .filter(|p| p.state == state)
            .ok_or_else(|| anyhow::anyhow!("unknown or expired login state"))?;

        let token = pkce::exchange_code(
            &self.http,
            &self.config.token_url,
            &self.config.client_id,
            code,
            &pending.code_verifier,
            &pending.redirect_uri,
        )
        .await?;

        self.store_token_response(token);
        let _ = self.event_tx.send(ProviderEvent::AuthSuccess);
        tracing::info!("interactive login completed");
        Ok(())
    }

    /// Spawn a background task that emits [`ProviderEvent::TokenExpired`]
    /// when the access token passes its expiry.
    ///
    /// After emitting, the watcher backs off for 60 s so a failed reactive
    /// refresh does not produce a tight notify loop.
    pub fn spawn_expiry_watcher(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let expires_at = provider.session.lock().as_ref().map(|s| s.expires_at);
                let wait = match expires_at {
                    Some(exp) => {
                        let now = epoch_secs();
                        if exp > now {
                            Duration::from_secs(exp - now)
                        } else {
                            let _ = provider.event_tx.send(ProviderEvent::TokenExpired);
                            Duration::from_secs(60)
                        }
                    }
                    None => Duration::from_secs(60),
                };
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        })
    }
}

impl IdentityProvider for OidcProvider {
    async fn initialize(&self) -> anyhow::Result<bool> {
        if self.session.lock().is_some() {
            return Ok(true);
        }
        let Some(refresh_token) = self.config.initial_refresh_token.clone() else {
            return Ok(false);
        };
        let token = self.refresh_grant(&refresh_token).await?;
        self.store_token_response(token);
        let _ = self.event_tx.send(ProviderEvent::AuthSuccess);
        Ok(true)
    }

    async fn refresh(&self, min_validity: Duration) -> anyhow::Result<bool> {
        let (refresh_token, expires_at) = {
            let session = self.session.lock();
            let Some(s) = session.as_ref() else {
                anyhow::bail!("no active session");
            };
            (s.refresh_token.clone(), s.expires_at)
        };

        if expires_at.saturating_sub(epoch_secs()) >= min_validity.as_secs() {
            return Ok(false);
        }

        let Some(refresh_token) = refresh_token else {
            anyhow::bail!("no refresh token available");
        };

        match self.refresh_grant(&refresh_token).await {
            Ok(token) => {
                self.store_token_response(token);
                Ok(true)
            }
            Err(e) => {
                // invalid_grant means the refresh token itself is dead.
                if e.to_string().contains("invalid_grant") {
                    let _ = self.event_tx.send(ProviderEvent::AuthError);
                }
                Err(e)
            }
        }
    }

    async fn login(&self, opts: LoginOptions) -> anyhow::Result<String> {
        let code_verifier = pkce::generate_code_verifier();
        let code_challenge = pkce::compute_code_challenge(&code_verifier);
        let state = pkce::generate_state();
        let redirect_uri = opts.redirect_uri.unwrap_or_else(|| self.config.redirect_uri.clone());

        let url = pkce::build_auth_url(
            &self.config.auth_url,
            &self.config.client_id,
            &redirect_uri,
            &self.config.scopes,
            &code_challenge,
            &state,
        );

        *self.pending_login.lock() = Some(PendingLogin { state, code_verifier, redirect_uri });
        Ok(url)
    }

    async fn logout(&self) -> anyhow::Result<()> {
        *self.session.lock() = None;
        let _ = self.event_tx.send(ProviderEvent::Logout);
        Ok(())
    }

    fn access_token(&self) -> Option<String> {
        self.session.lock().as_ref().map(|s| s.access_token.clone())
    }

    fn token_expires_at(&self) -> u64 {
        self.session.lock().as_ref().map(|s| s.expires_at).unwrap_or(0)
    }

    fn refresh_expires_at(&self) -> u64 {
        self.session.lock().as_ref().map(|s| s.refresh_expires_at).unwrap_or(0)
    }

    fn subject_id(&self) -> Option<String> {
        self.session.lock().as_ref().and_then(|s| s.subject.clone())
    }
}

/// Decode the payload segment of a JWT without verifying the signature.
/// The client trusts tokens it received from the provider over TLS; claims
/// are read only for `sub` and `exp`.
fn decode_jwt_claims(token: &str) -> anyhow::Result<serde_json::Value> {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("malformed JWT: missing payload segment"))?;
    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
#[path = "oidc_tests.rs"]
mod tests;
