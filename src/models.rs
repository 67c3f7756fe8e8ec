use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::roles::{Resolution, Role, RoleDefinition};

// --- Stored Records ---

/// User
///
/// A profile row from `profiles`. `id` is the opaque subject identifier issued by the
/// identity provider and appended to subject-scoped landing paths.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub email: String,
    // Raw role identifier; classified through `RoleId::parse` at the edges.
    pub role: String,
}

/// Notification
///
/// A message addressed to a patient (analysis finished, intake received, ...).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Notification {
    pub id: Uuid,
    pub patient_id: String,
    pub title: String,
    pub message: String,
    // "analysis" | "anamnesis" | "system"
    pub kind: String,
    pub is_read: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// RiskAnalysis
///
/// A persisted result returned by the external analysis model.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RiskAnalysis {
    pub id: Uuid,
    pub patient_id: String,
    // Subject id of whoever requested the analysis.
    pub requested_by: String,
    pub risk_level: String,
    pub summary: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Anamnesis
///
/// A submitted medical-history intake form. Answers are free-form JSON so the form
/// can evolve on the client without schema migrations.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Anamnesis {
    pub id: Uuid,
    pub patient_id: String,
    #[sqlx(json)]
    #[schema(value_type = Object)]
    pub answers: serde_json::Value,
    #[ts(type = "string")]
    pub submitted_at: DateTime<Utc>,
}

// --- Request Payloads ---

/// OnboardingRequest
///
/// Creates the local profile for the subject named by the request's token. The
/// profile id is always the token's `sub`, never a client-supplied value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OnboardingRequest {
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionRequest {
    pub token: String,
}

/// SubmitAnamnesisRequest
///
/// `patient_id` may be omitted by patients submitting their own form.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SubmitAnamnesisRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[schema(value_type = Object)]
    pub answers: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RequestAnalysisRequest {
    pub patient_id: String,
}

// --- Responses ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AnalysesResponse {
    pub analyses: Vec<RiskAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RolesResponse {
    pub roles: Vec<RoleDefinition>,
}

/// UserProfile
///
/// Output of `GET /me`: the profile plus where the client should land.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub role: String,
    pub landing: Resolution,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_patients: i64,
    pub total_analyses: i64,
    pub unread_notifications: i64,
}

/// RiskLevelCount
///
/// One row of the employer overview: how many analyses fell into a risk level.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RiskLevelCount {
    pub risk_level: String,
    pub total: i64,
}

/// ErrorBody
///
/// Shape of every error response: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
}
