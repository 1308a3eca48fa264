// src/models.rs - Entities, request payloads and the API error type
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;
use uuid::Uuid;

// === SOURCE ENTITIES ===
//
// All entities are scoped by the owning user id; the read-side engines never
// see another user's rows. Field names serialize in camelCase to match the
// payload shape the frontend already consumes.

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    pub id: Uuid,
    pub user_id: String,
    pub subject: String,
    pub instructor: String,
    pub day: String,
    /// 0 = Sunday .. 6 = Saturday. Rows written by older clients may carry
    /// no index, or one outside the valid range.
    pub day_index: Option<i32>,
    pub start_time: String,
    pub end_time: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEntry {
    pub id: Uuid,
    pub user_id: String,
    /// "income" or "expense".
    #[serde(rename = "type")]
    pub entry_type: String,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PlannerTask {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    /// "pending", "completed" or anything else a client sent.
    pub status: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WellnessEntry {
    pub id: Uuid,
    pub user_id: String,
    pub mood: f64,
    pub sleep_hours: f64,
    pub study_hours: f64,
    pub notes: String,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: String,
    pub subject: String,
    /// Minutes studied.
    pub duration: f64,
    pub topic: String,
    pub efficiency: f64,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StudyGoal {
    pub id: Uuid,
    pub user_id: String,
    pub subject: String,
    pub target_hours: f64,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub id: Uuid,
    pub user_id: String,
    pub topic: String,
    pub score: f64,
    pub total_questions: i32,
    pub percentage: f64,
    #[serde(rename = "type")]
    pub quiz_type: String,
    pub difficulty: String,
    pub time_spent: f64,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// === WRITE PAYLOADS ===

fn is_blank(value: &Option<String>) -> bool {
    match value {
        Some(s) => s.trim().is_empty(),
        None => true,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClassPayload {
    pub subject: Option<String>,
    pub instructor: Option<String>,
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub color: Option<String>,
}

impl CreateClassPayload {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.subject) {
            missing.push("subject");
        }
        if is_blank(&self.day) {
            missing.push("day");
        }
        if is_blank(&self.start_time) {
            missing.push("startTime");
        }
        if is_blank(&self.end_time) {
            missing.push("endTime");
        }
        missing
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClassPayload {
    pub subject: Option<String>,
    pub instructor: Option<String>,
    pub day: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetPayload {
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl CreateBudgetPayload {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.entry_type) {
            missing.push("type");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if is_blank(&self.category) {
            missing.push("category");
        }
        if self.date.is_none() {
            missing.push("date");
        }
        missing
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBudgetPayload {
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl CreateTaskPayload {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.title) {
            missing.push("title");
        }
        if self.due_date.is_none() {
            missing.push("dueDate");
        }
        missing
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSessionPayload {
    pub subject: Option<String>,
    pub duration: Option<f64>,
    pub topic: Option<String>,
    pub efficiency: Option<f64>,
}

impl RecordSessionPayload {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.subject) {
            missing.push("subject");
        }
        if self.duration.is_none() {
            missing.push("duration");
        }
        missing
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMoodPayload {
    pub mood: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub study_hours: Option<f64>,
    pub notes: Option<String>,
}

impl RecordMoodPayload {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        if self.mood.is_none() {
            vec!["mood"]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalPayload {
    pub subject: Option<String>,
    pub target_hours: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
}

impl CreateGoalPayload {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.subject) {
            missing.push("subject");
        }
        if self.target_hours.is_none() {
            missing.push("targetHours");
        }
        missing
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveQuizResultPayload {
    pub topic: Option<String>,
    pub score: Option<f64>,
    pub total_questions: Option<i32>,
    pub percentage: Option<f64>,
    #[serde(rename = "type")]
    pub quiz_type: Option<String>,
    pub difficulty: Option<String>,
    pub time_spent: Option<f64>,
}

impl SaveQuizResultPayload {
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.topic) {
            missing.push("topic");
        }
        if self.score.is_none() {
            missing.push("score");
        }
        if self.total_questions.is_none() {
            missing.push("totalQuestions");
        }
        if self.percentage.is_none() {
            missing.push("percentage");
        }
        missing
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

// === ERROR TYPE ===

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: x-user-id required")]
    Unauthorized,

    #[error("Missing fields")]
    Validation { missing: Vec<&'static str> },

    /// Target row missing or owned by someone else. The response is the same
    /// for both so callers cannot probe which ids exist.
    #[error("{0} not found or unauthorized")]
    NotFound(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": self.to_string() })),
            )
                .into_response(),
            ApiError::Validation { ref missing } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": "Missing fields", "missing": missing })),
            )
                .into_response(),
            ApiError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": self.to_string() })),
            )
                .into_response(),
            ApiError::Internal(ref cause) => {
                error!("internal error: {cause:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Something went wrong" })),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_missing_fields_are_both_reported() {
        let payload = CreateClassPayload {
            subject: Some("  ".to_string()),
            instructor: None,
            day: Some("Monday".to_string()),
            start_time: None,
            end_time: Some("10:00".to_string()),
            color: None,
        };
        assert_eq!(payload.missing_fields(), vec!["subject", "startTime"]);
    }

    #[test]
    fn complete_quiz_payload_has_no_missing_fields() {
        let payload = SaveQuizResultPayload {
            topic: Some("Algebra".to_string()),
            score: Some(8.0),
            total_questions: Some(10),
            percentage: Some(80.0),
            quiz_type: None,
            difficulty: None,
            time_spent: None,
        };
        assert!(payload.missing_fields().is_empty());
    }
}
