// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated request gateway.
//!
//! Every call goes through `ensure_valid()` first; an HTTP 401 collapses
//! session state and requests interactive login in addition to surfacing the
//! failure. The gateway performs no retries — retrying is the poller's job,
//! scoped to polling only.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::provider::IdentityProvider;
use crate::session::SessionCoordinator;

pub struct ApiGateway<P> {
    base_url: String,
    session: Arc<SessionCoordinator<P>>,
    http: reqwest::Client,
}

impl<P: IdentityProvider> ApiGateway<P> {
    pub fn new(
        base_url: String,
        session: Arc<SessionCoordinator<P>>,
        http: reqwest::Client,
    ) -> Self {
        Self { base_url, session, http }
    }

    pub fn session(&self) -> &Arc<SessionCoordinator<P>> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Perform an authenticated call and decode the JSON response body.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        self.call_with_headers(method, path, &[], body).await
    }

    /// Authenticated call with extra request headers.
    pub async fn call_with_headers<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        headers: &[(&str, &str)],
        body: Option<serde_json::Value>,
    ) -> Result<T, ClientError> {
        if !self.session.ensure_valid().await {
            return Err(ClientError::AuthenticationRequired);
        }
        let token =
            self.session.access_token().await.ok_or(ClientError::AuthenticationRequired)?;

        let mut req = self.http.request(method, self.url(path)).bearer_auth(token);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        if let Some(ref body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %path, "request rejected as unauthorized, collapsing session");
            self.session.handle_unauthorized().await;
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status: 401, body });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status: status.as_u16(), body });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Transport(format!("invalid response body: {e}")))
    }

    /// Unauthenticated POST for public endpoints (registration).
    pub async fn public_post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http { status: status.as_u16(), body });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Transport(format!("invalid response body: {e}")))
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
