// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use serde::Deserialize;

/// Safety threshold below which a token is proactively refreshed.
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 30;

/// Base delays before each poll fetch, in milliseconds.
pub const DEFAULT_POLL_SCHEDULE_MS: [u64; 6] = [1000, 2000, 4000, 8000, 8000, 8000];

/// Configuration for the fitpulse client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend API gateway.
    pub api_base_url: String,

    /// Identity provider authorization endpoint (interactive login).
    pub auth_url: String,

    /// Identity provider token endpoint (refresh and code exchange).
    pub token_url: String,

    /// OAuth client id registered with the identity provider.
    pub client_id: String,

    /// Redirect URI for interactive login.
    pub redirect_uri: String,

    /// Scopes requested on interactive login.
    pub scopes: String,

    /// Remaining token lifetime below which a refresh is attempted.
    pub refresh_threshold_secs: u64,

    /// HTTP request timeout in seconds.
    pub http_timeout_secs: u64,

    /// Poll schedule: base delay before each fetch, in milliseconds.
    pub poll_schedule_ms: Vec<u64>,

    /// Refresh token persisted by the host shell, used for the silent
    /// session check on bootstrap. Absent means no prior session.
    pub refresh_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_owned(),
            auth_url: "http://localhost:8181/realms/fitpulse/protocol/openid-connect/auth"
                .to_owned(),
            token_url: "http://localhost:8181/realms/fitpulse/protocol/openid-connect/token"
                .to_owned(),
            client_id: "fitpulse-web".to_owned(),
            redirect_uri: "http://localhost:5173/".to_owned(),
            scopes: "openid profile email".to_owned(),
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            http_timeout_secs: 10,
            poll_schedule_ms: DEFAULT_POLL_SCHEDULE_MS.to_vec(),
            refresh_token: None,
        }
    }
}

impl ClientConfig {
    /// Build a config from `FITPULSE_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("FITPULSE_API_BASE_URL") {
            config.api_base_url = v;
        }
        if let Ok(v) = std::env::var("FITPULSE_AUTH_URL") {
            config.auth_url = v;
        }
        if let Ok(v) = std::env::var("FITPULSE_TOKEN_URL") {
            config.token_url = v;
        }
        if let Ok(v) = std::env::var("FITPULSE_CLIENT_ID") {
            config.client_id = v;
        }
        if let Ok(v) = std::env::var("FITPULSE_REDIRECT_URI") {
            config.redirect_uri = v;
        }
        if let Ok(v) = std::env::var("FITPULSE_SCOPES") {
            config.scopes = v;
        }
        if let Ok(v) = std::env::var("FITPULSE_REFRESH_TOKEN") {
            config.refresh_token = Some(v);
        }
        config
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_schedule(&self) -> Vec<Duration> {
        self.poll_schedule_ms.iter().map(|ms| Duration::from_millis(*ms)).collect()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
