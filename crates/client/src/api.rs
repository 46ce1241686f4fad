// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations against the backend REST boundary.

use reqwest::Method;

use crate::activity::{
    join_recommendations, ActivityRecord, ActivityWithRecommendation, Recommendation,
    RegisterRequest, RegisterResponse, TrackActivityRequest,
};
use crate::error::ClientError;
use crate::gateway::ApiGateway;
use crate::poller::RecordFetcher;
use crate::provider::IdentityProvider;

pub struct ApiClient<P> {
    gateway: ApiGateway<P>,
}

impl<P: IdentityProvider> ApiClient<P> {
    pub fn new(gateway: ApiGateway<P>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &ApiGateway<P> {
        &self.gateway
    }

    /// Submit an activity. Returns the created record (id + status).
    pub async fn track_activity(
        &self,
        request: &TrackActivityRequest,
    ) -> Result<ActivityRecord, ClientError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::Transport(format!("failed to encode request: {e}")))?;
        self.gateway.call(Method::POST, "/api/activities/track", Some(body)).await
    }

    /// Fetch one activity. `Ok(None)` when the backend no longer has it.
    pub async fn get_activity(&self, id: &str) -> Result<Option<ActivityRecord>, ClientError> {
        match self.gateway.call(Method::GET, &format!("/api/activities/{id}"), None).await {
            Ok(record) => Ok(Some(record)),
            Err(ClientError::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Bulk-fetch the user's activities.
    pub async fn list_activities(
        &self,
        subject_id: &str,
    ) -> Result<Vec<ActivityRecord>, ClientError> {
        self.gateway
            .call_with_headers(
                Method::GET,
                "/api/activities/getUserActivities",
                &[("X-Keycloak-Id", subject_id)],
                None,
            )
            .await
    }

    /// Bulk-fetch the user's recommendations.
    pub async fn list_recommendations(
        &self,
        subject_id: &str,
    ) -> Result<Vec<Recommendation>, ClientError> {
        self.gateway
            .call(
                Method::GET,
                &format!("/api/recommendations/getUserRecommendations/{subject_id}"),
                None,
            )
            .await
    }

    /// Activities and recommendations, joined client-side by activity id.
    pub async fn fetch_dashboard(
        &self,
        subject_id: &str,
    ) -> Result<Vec<ActivityWithRecommendation>, ClientError> {
        let activities = self.list_activities(subject_id).await?;
        let recommendations = self.list_recommendations(subject_id).await?;
        Ok(join_recommendations(activities, recommendations))
    }

    /// Register a new user. Public endpoint — no token attached.
    pub async fn register_user(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, ClientError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::Transport(format!("failed to encode request: {e}")))?;
        self.gateway.public_post("/api/users/register", body).await
    }
}

impl<P: IdentityProvider> RecordFetcher for ApiClient<P> {
    async fn fetch(&self, id: &str) -> Result<Option<ActivityRecord>, ClientError> {
        self.get_activity(id).await
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
