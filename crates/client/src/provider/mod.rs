// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity provider boundary.
//!
//! The provider is an opaque external collaborator. Its lifecycle
//! notifications arrive as typed [`ProviderEvent`]s over a channel consumed
//! by a single dispatcher (`session::spawn_dispatcher`) instead of callback
//! side effects, so the coupling stays visible and testable without a real
//! provider.

pub mod oidc;
pub mod pkce;

use std::future::Future;
use std::time::Duration;

/// Lifecycle notifications emitted by an identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    /// A session became available (silent init or completed login).
    AuthSuccess,
    /// The access token passed its expiry.
    TokenExpired,
    /// The refresh credential itself is invalid; only interactive login
    /// can recover.
    AuthError,
    /// The provider-side session ended.
    Logout,
}

/// Options for interactive login.
#[derive(Debug, Clone, Default)]
pub struct LoginOptions {
    /// Override the configured redirect URI.
    pub redirect_uri: Option<String>,
}

/// Capability set of the external identity provider client.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Silent session check. `Ok(true)` when an active session exists.
    fn initialize(&self) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Refresh the access token when its remaining lifetime is below
    /// `min_validity`. `Ok(false)` means the token was still valid and no
    /// refresh was performed.
    fn refresh(&self, min_validity: Duration) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Start interactive login; returns the URL the host shell navigates to.
    fn login(&self, opts: LoginOptions) -> impl Future<Output = anyhow::Result<String>> + Send;

    /// End the provider-side session.
    fn logout(&self) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Current access token, when a session exists.
    fn access_token(&self) -> Option<String>;

    /// Access token expiry, epoch seconds. Zero when no session.
    fn token_expires_at(&self) -> u64;

    /// Refresh token expiry, epoch seconds. Zero when unknown.
    fn refresh_expires_at(&self) -> u64;

    /// Subject identifier from the current session's token.
    fn subject_id(&self) -> Option<String>;
}
