// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fitpulse: client library for a fitness-tracking service.
//!
//! Authenticates against an OIDC identity provider, submits workout
//! activities, and polls for asynchronously generated AI recommendations.
//! The moving parts: a session coordinator (bootstrap, proactive and
//! reactive token refresh, forced re-login), an authenticated request
//! gateway, a bounded visibility-aware poller, and a normalized record
//! cache that drives re-render of waiting views.
//!
//! ```no_run
//! use fitpulse::config::ClientConfig;
//! use fitpulse::Client;
//!
//! # async fn run() {
//! let client = Client::connect(ClientConfig::from_env());
//! let authenticated = client.bootstrap().await;
//! # let _ = authenticated;
//! # }
//! ```

pub mod activity;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod poller;
pub mod provider;
pub mod session;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::activity::{ActivityRecord, TrackActivityRequest};
use crate::api::ApiClient;
use crate::cache::ActivityCache;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gateway::ApiGateway;
use crate::poller::{spawn_poller, PollHandle};
use crate::provider::oidc::{OidcConfig, OidcProvider};
use crate::provider::{IdentityProvider, ProviderEvent};
use crate::session::{spawn_dispatcher, SessionCoordinator};
use crate::visibility::VisibilityHandle;

/// The assembled client: one owned session object handed to every component
/// that needs it, with teardown tied to [`Client::shutdown`].
pub struct Client<P: IdentityProvider> {
    config: ClientConfig,
    session: Arc<SessionCoordinator<P>>,
    api: Arc<ApiClient<P>>,
    cache: Arc<ActivityCache>,
    visibility: VisibilityHandle,
    pollers: Mutex<HashMap<String, PollHandle>>,
    shutdown: CancellationToken,
}

impl Client<OidcProvider> {
    /// Build a client backed by the bundled OIDC provider, wiring its event
    /// channel into the session dispatcher and starting its expiry watcher.
    pub fn connect(config: ClientConfig) -> Arc<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_default();
        let (provider, events) =
            OidcProvider::new(OidcConfig::from_client_config(&config), http);
        let client = Self::new(config, Arc::clone(&provider), events);
        provider.spawn_expiry_watcher(client.shutdown.clone());
        client
    }
}

impl<P: IdentityProvider> Client<P> {
    /// Build a client around any identity provider and its event receiver.
    pub fn new(
        config: ClientConfig,
        provider: Arc<P>,
        provider_events: mpsc::UnboundedReceiver<ProviderEvent>,
    ) -> Arc<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .unwrap_or_default();
        let session = Arc::new(SessionCoordinator::new(provider, config.refresh_threshold()));
        let shutdown = CancellationToken::new();
        spawn_dispatcher(Arc::clone(&session), provider_events, shutdown.clone());

        let gateway = ApiGateway::new(config.api_base_url.clone(), Arc::clone(&session), http);
        let api = Arc::new(ApiClient::new(gateway));

        Arc::new(Self {
            config,
            session,
            api,
            cache: Arc::new(ActivityCache::new()),
            visibility: VisibilityHandle::new(),
            pollers: Mutex::new(HashMap::new()),
            shutdown,
        })
    }

    /// Run the silent session check once; gates all protected views.
    pub async fn bootstrap(&self) -> bool {
        self.session.bootstrap().await
    }

    pub fn session(&self) -> &Arc<SessionCoordinator<P>> {
        &self.session
    }

    pub fn api(&self) -> &Arc<ApiClient<P>> {
        &self.api
    }

    pub fn cache(&self) -> &Arc<ActivityCache> {
        &self.cache
    }

    pub fn visibility(&self) -> &VisibilityHandle {
        &self.visibility
    }

    /// Submit an activity and seed the cache with the created record.
    pub async fn track_activity(
        &self,
        request: &TrackActivityRequest,
    ) -> Result<ActivityRecord, ClientError> {
        let record = self.api.track_activity(request).await?;
        self.cache.upsert(record.clone()).await;
        Ok(record)
    }

    /// Direct fetch of one activity; writes the result into the cache.
    pub async fn fetch_activity(&self, id: &str) -> Result<Option<ActivityRecord>, ClientError> {
        let record = self.api.get_activity(id).await?;
        if let Some(ref record) = record {
            self.cache.upsert(record.clone()).await;
        }
        Ok(record)
    }

    /// Start polling one activity for its recommendation.
    ///
    /// Any live poll for the same id is cancelled and replaced, keeping at
    /// most one active poll per id within this client.
    pub async fn start_recommendation_poll(&self, activity_id: &str) {
        let handle = spawn_poller(
            Arc::clone(&self.api),
            Arc::clone(&self.cache),
            self.visibility.subscribe(),
            self.config.poll_schedule(),
            activity_id.to_owned(),
        );
        self.pollers.lock().await.insert(activity_id.to_owned(), handle);
    }

    /// Cancel the poll for one activity, e.g. when its view unmounts.
    pub async fn stop_poll(&self, activity_id: &str) {
        self.pollers.lock().await.remove(activity_id);
    }

    /// Tear down background tasks and cancel all live polls.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.pollers.lock().await.clear();
    }
}
