// src/handlers.rs - HTTP endpoints
//
// Read endpoints share one shape: probe the cache, fetch on a miss, derive the
// view, store the serialized value, respond with it. Cached hits return the
// stored JSON verbatim. Write endpoints validate, persist, then evict the
// dependent views before responding.
use crate::{
    analytics, auth::AuthUser, dashboard,
    invalidation::{invalidate, Mutation},
    models::*,
    monitoring::request_totals,
    SharedState,
};
use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

fn cache_view(
    state: &SharedState,
    key: String,
    view: &impl serde::Serialize,
    ttl: Option<Duration>,
) -> Result<Value, ApiError> {
    let value = serde_json::to_value(view).context("Failed to serialize cached view")?;
    state.cache.set(key, value.clone(), ttl);
    Ok(value)
}

// === HEALTH ===

pub async fn health_check(State(state): State<SharedState>) -> ApiResult<Value> {
    let db_latency_ms = state.db.health_check().await?;
    let (total_requests, failed_requests) = request_totals();

    Ok(Json(json!({
        "status": "ok",
        "database": { "latencyMs": db_latency_ms },
        "cache": {
            "entries": state.cache.len(),
            "hitRatio": state.cache.stats.hit_ratio(),
        },
        "requests": { "total": total_requests, "failed": failed_requests },
        "timestamp": Utc::now(),
    })))
}

// === CLASSES ===

pub async fn get_classes(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Value> {
    let key = crate::cache::view_key("classes", &user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let classes = state.db.fetch_classes(&user_id).await?;
    Ok(Json(cache_view(&state, key, &classes, None)?))
}

pub async fn create_class(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateClassPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::Validation { missing });
    }

    let created = state.db.insert_class(&user_id, &payload).await?;
    invalidate(&state.cache, Mutation::ClassChanged, &user_id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_class(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateClassPayload>,
) -> ApiResult<ClassEntry> {
    let updated = state
        .db
        .update_class(&user_id, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("Class"))?;
    invalidate(&state.cache, Mutation::ClassChanged, &user_id);
    Ok(Json(updated))
}

pub async fn delete_class(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if !state.db.delete_class(&user_id, id).await? {
        return Err(ApiError::NotFound("Class"));
    }
    invalidate(&state.cache, Mutation::ClassChanged, &user_id);
    Ok(Json(json!({ "message": "Class deleted successfully" })))
}

// === BUDGET ===

pub async fn get_budget(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Value> {
    let key = crate::cache::view_key("budget", &user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let entries = state.db.fetch_budget_entries(&user_id).await?;
    Ok(Json(cache_view(&state, key, &entries, None)?))
}

pub async fn create_budget_entry(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateBudgetPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::Validation { missing });
    }

    let created = state.db.insert_budget_entry(&user_id, &payload).await?;
    invalidate(&state.cache, Mutation::BudgetChanged, &user_id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_budget_entry(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBudgetPayload>,
) -> ApiResult<BudgetEntry> {
    let updated = state
        .db
        .update_budget_entry(&user_id, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("Budget entry"))?;
    invalidate(&state.cache, Mutation::BudgetChanged, &user_id);
    Ok(Json(updated))
}

pub async fn delete_budget_entry(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if !state.db.delete_budget_entry(&user_id, id).await? {
        return Err(ApiError::NotFound("Budget entry"));
    }
    invalidate(&state.cache, Mutation::BudgetChanged, &user_id);
    Ok(Json(json!({ "message": "Budget entry deleted successfully" })))
}

// === PLANNER ===

pub async fn get_planner(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Value> {
    let key = crate::cache::view_key("planner", &user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let tasks = state.db.fetch_planner_tasks(&user_id).await?;
    Ok(Json(cache_view(&state, key, &tasks, None)?))
}

pub async fn create_task(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::Validation { missing });
    }

    let created = state.db.insert_planner_task(&user_id, &payload).await?;
    invalidate(&state.cache, Mutation::PlannerChanged, &user_id);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_task(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTaskPayload>,
) -> ApiResult<PlannerTask> {
    let updated = state
        .db
        .update_planner_task(&user_id, id, &payload)
        .await?
        .ok_or(ApiError::NotFound("Task"))?;
    invalidate(&state.cache, Mutation::PlannerChanged, &user_id);
    Ok(Json(updated))
}

pub async fn delete_task(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if !state.db.delete_planner_task(&user_id, id).await? {
        return Err(ApiError::NotFound("Task"));
    }
    invalidate(&state.cache, Mutation::PlannerChanged, &user_id);
    Ok(Json(json!({ "message": "Task deleted successfully" })))
}

// === STUDY GOALS ===

pub async fn get_goals(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Value> {
    let key = crate::cache::view_key("study-goals", &user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let goals = state.db.fetch_study_goals(&user_id).await?;
    let ttl = state.config.cache.study_goals_ttl();
    Ok(Json(cache_view(&state, key, &goals, Some(ttl))?))
}

pub async fn create_goal(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateGoalPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::Validation { missing });
    }

    let created = state.db.insert_study_goal(&user_id, &payload).await?;
    invalidate(&state.cache, Mutation::StudyGoalCreated, &user_id);
    Ok((StatusCode::CREATED, Json(created)))
}

// === DASHBOARD ===

pub async fn get_dashboard(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Value> {
    let key = crate::cache::view_key("dashboard-summary", &user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    // All five collections or nothing; a partial dashboard is worse than an
    // error the client can retry.
    let (classes, budget_entries, tasks, wellness, sessions) = tokio::try_join!(
        state.db.fetch_classes(&user_id),
        state.db.fetch_budget_entries(&user_id),
        state.db.fetch_planner_tasks(&user_id),
        state.db.fetch_recent_wellness(&user_id),
        state.db.fetch_study_sessions(&user_id),
    )?;

    let summary = dashboard::compose_dashboard(
        &classes,
        &budget_entries,
        &tasks,
        &wellness,
        &sessions,
        Utc::now(),
    );

    let ttl = state.config.cache.dashboard_ttl();
    Ok(Json(cache_view(&state, key, &summary, Some(ttl))?))
}

pub async fn record_study_session(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecordSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::Validation { missing });
    }

    let session = state.db.insert_study_session(&user_id, &payload).await?;
    invalidate(&state.cache, Mutation::StudySessionRecorded, &user_id);

    let mut body =
        serde_json::to_value(&session).context("Failed to serialize study session")?;
    body["message"] = json!("Study session recorded successfully");
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn record_mood(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecordMoodPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::Validation { missing });
    }

    let entry = state.db.insert_wellness_entry(&user_id, &payload).await?;
    invalidate(&state.cache, Mutation::WellnessRecorded, &user_id);

    let mut body = serde_json::to_value(&entry).context("Failed to serialize wellness entry")?;
    body["message"] = json!("Wellness entry recorded successfully");
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn get_wellness_history(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<WellnessEntry>> {
    Ok(Json(state.db.fetch_wellness_history(&user_id).await?))
}

pub async fn get_study_history(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Vec<StudySession>> {
    Ok(Json(state.db.fetch_study_history(&user_id).await?))
}

// === QUIZ RESULTS ===

pub async fn save_quiz_result(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SaveQuizResultPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let missing = payload.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::Validation { missing });
    }

    let saved = state.db.insert_quiz_result(&user_id, &payload).await?;
    invalidate(&state.cache, Mutation::QuizResultChanged, &user_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Quiz result saved successfully",
            "id": saved.id,
            "performanceRating": analytics::performance_rating(saved.percentage),
        })),
    ))
}

pub async fn delete_quiz_result(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    if !state.db.delete_quiz_result(&user_id, id).await? {
        return Err(ApiError::NotFound("Quiz result"));
    }
    invalidate(&state.cache, Mutation::QuizResultChanged, &user_id);
    Ok(Json(json!({ "message": "Quiz result deleted successfully" })))
}

pub async fn get_quiz_performance(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Value> {
    let key = crate::cache::view_key("quiz-performance", &user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let results = state.db.fetch_quiz_results(&user_id).await?;

    // The empty-history response is deliberately not cached: the first saved
    // result should be visible immediately.
    let Some(view) = analytics::performance_view(&results, Utc::now()) else {
        return Ok(Json(json!({
            "message": "No quiz results found",
            "hasData": false,
            "overallRating": analytics::performance_rating(0.0),
            "averageScore": 0,
            "totalQuizzes": 0,
        })));
    };

    let ttl = state.config.cache.quiz_performance_ttl();
    Ok(Json(cache_view(&state, key, &view, Some(ttl))?))
}

pub async fn get_quiz_summary(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<Value> {
    let key = crate::cache::view_key("quiz-stats", &user_id);
    if let Some(cached) = state.cache.get(&key) {
        return Ok(Json(cached));
    }

    let (recent, all) = tokio::try_join!(
        state.db.fetch_recent_quiz_results(&user_id),
        state.db.fetch_quiz_results(&user_id),
    )?;

    let view = analytics::summary_view(&recent, &all, Utc::now());
    let ttl = state.config.cache.quiz_stats_ttl();
    Ok(Json(cache_view(&state, key, &view, Some(ttl))?))
}

/// Pagination window from caller-supplied query params. The inputs are
/// arbitrary i64s; the limit is capped and the offset saturates so hostile
/// values cannot overflow into a negative OFFSET.
fn history_window(query: &HistoryQuery) -> (i64, i64, i64) {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = page.saturating_sub(1).saturating_mul(limit);
    (limit, page, offset)
}

pub async fn get_quiz_history(
    State(state): State<SharedState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Value> {
    let (limit, page, offset) = history_window(&query);

    let (results, total) = tokio::try_join!(
        state.db.fetch_quiz_history(&user_id, limit, offset),
        state.db.count_quiz_results(&user_id),
    )?;

    Ok(Json(json!({
        "results": analytics::annotate(&results),
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "pages": (total + limit - 1) / limit,
        },
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<i64>, page: Option<i64>) -> HistoryQuery {
        HistoryQuery { limit, page }
    }

    #[test]
    fn history_window_defaults() {
        assert_eq!(history_window(&query(None, None)), (20, 1, 0));
        assert_eq!(history_window(&query(Some(10), Some(3))), (10, 3, 20));
    }

    #[test]
    fn history_window_caps_the_limit() {
        let (limit, _, _) = history_window(&query(Some(10_000), None));
        assert_eq!(limit, 100);
        let (limit, _, _) = history_window(&query(Some(0), None));
        assert_eq!(limit, 1);
        let (limit, _, _) = history_window(&query(Some(-5), None));
        assert_eq!(limit, 1);
    }

    #[test]
    fn history_window_saturates_instead_of_overflowing() {
        let (limit, page, offset) = history_window(&query(Some(i64::MAX), Some(i64::MAX)));
        assert_eq!(limit, 100);
        assert_eq!(page, i64::MAX);
        assert_eq!(offset, i64::MAX);

        let (_, _, offset) = history_window(&query(None, Some(i64::MIN)));
        assert_eq!(offset, 0);
    }
}
