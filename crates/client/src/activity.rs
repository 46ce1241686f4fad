// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain model for activities and AI recommendations.
//!
//! Wire field names follow the backend (`keycloakId`, `activityType`, ...);
//! Rust fields carry domain names with serde renames.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;

/// Workout activity category understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Running,
    Cycling,
    Swimming,
    WeightTraining,
    Yoga,
    Cardio,
    Stretching,
    Other,
}

/// Processing state of an activity's recommendation generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    #[default]
    Pending,
    Ready,
    Failed,
}

impl ActivityStatus {
    /// Terminal states: no further polling is useful past these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// An activity record as returned by the backend.
///
/// The track response carries only id and status; every other field
/// tolerates absence on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub id: String,
    #[serde(rename = "keycloakId", default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub activity_type: Option<ActivityType>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub calories_burned: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub additional_metrics: Map<String, Value>,
    #[serde(default)]
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<Recommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// AI-generated recommendation attached to one activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(default)]
    pub id: String,
    pub activity_id: String,
    #[serde(rename = "keycloakId", default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(rename = "type", default)]
    pub recommendation_type: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub safety: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Request body for `POST /api/activities/track`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackActivityRequest {
    #[serde(rename = "keycloakId")]
    pub subject_id: String,
    pub activity_type: ActivityType,
    pub duration: u32,
    pub calories_burned: u32,
    /// Local datetime, `YYYY-MM-DDTHH:mm` as the form produces it.
    pub start_time: String,
    pub additional_metrics: Map<String, Value>,
}

impl TrackActivityRequest {
    /// Build a request from raw form fields, validating the free-form
    /// metrics JSON. Form contents are left intact by the caller on error so
    /// the user can correct and resubmit.
    pub fn from_form(
        subject_id: impl Into<String>,
        activity_type: ActivityType,
        duration: u32,
        calories_burned: u32,
        start_time: impl Into<String>,
        raw_metrics: &str,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            subject_id: subject_id.into(),
            activity_type,
            duration,
            calories_burned,
            start_time: start_time.into(),
            additional_metrics: parse_additional_metrics(raw_metrics)?,
        })
    }
}

/// Parse the user-entered free-form metrics field.
///
/// Empty input means "no metrics". Anything else must be a JSON object;
/// failures surface as [`ClientError::MalformedInput`], never a crash.
pub fn parse_additional_metrics(raw: &str) -> Result<Map<String, Value>, ClientError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_str(trimmed).map_err(|e| {
        ClientError::MalformedInput(format!("invalid JSON in additional metrics: {e}"))
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ClientError::MalformedInput(
            "additional metrics must be a JSON object".to_owned(),
        )),
    }
}

/// Whether a recommendation has arrived for an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationStatus {
    Loading,
    Available,
}

/// One row of the dashboard: an activity joined with its recommendation.
#[derive(Debug, Clone)]
pub struct ActivityWithRecommendation {
    pub activity: ActivityRecord,
    pub recommendation: Option<Recommendation>,
    pub recommendation_status: RecommendationStatus,
}

/// Join bulk-fetched activities and recommendations by activity id.
pub fn join_recommendations(
    activities: Vec<ActivityRecord>,
    recommendations: Vec<Recommendation>,
) -> Vec<ActivityWithRecommendation> {
    let mut by_activity: HashMap<String, Recommendation> =
        recommendations.into_iter().map(|r| (r.activity_id.clone(), r)).collect();

    activities
        .into_iter()
        .map(|activity| {
            let recommendation = by_activity.remove(&activity.id);
            let recommendation_status = if recommendation.is_some() {
                RecommendationStatus::Available
            } else {
                RecommendationStatus::Loading
            };
            ActivityWithRecommendation { activity, recommendation, recommendation_status }
        })
        .collect()
}

/// Request body for the public `POST /api/users/register` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// Created-user response from registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "keycloakId", default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
