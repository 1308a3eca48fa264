// src/database.rs - PostgreSQL access for the per-user study collections
use crate::config::AppConfig;
use crate::models::{
    BudgetEntry, ClassEntry, CreateBudgetPayload, CreateClassPayload, CreateGoalPayload,
    CreateTaskPayload, PlannerTask, QuizResult, RecordMoodPayload, RecordSessionPayload,
    SaveQuizResultPayload, StudyGoal, StudySession, UpdateBudgetPayload, UpdateClassPayload,
    UpdateTaskPayload, WellnessEntry,
};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        info!("initializing database connection pool");

        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .min_connections(config.database.min_connections)
            .acquire_timeout(Duration::from_millis(config.database.connection_timeout_ms))
            .idle_timeout(Duration::from_secs(300))
            .connect(&config.database.url)
            .await
            .context("Failed to create database connection pool")?;

        // Test connection
        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("Failed to test database connection")?;

        info!("database connection established");

        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<f64> {
        let start = std::time::Instant::now();
        let _: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database health check failed")?;
        Ok(start.elapsed().as_millis() as f64)
    }

    // === CLASSES ===

    pub async fn fetch_classes(&self, user_id: &str) -> Result<Vec<ClassEntry>> {
        sqlx::query_as::<_, ClassEntry>(
            "SELECT * FROM classes WHERE user_id = $1 ORDER BY day_index, start_time",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch classes")
    }

    pub async fn insert_class(
        &self,
        user_id: &str,
        payload: &CreateClassPayload,
    ) -> Result<ClassEntry> {
        let day = payload.day.as_deref().unwrap_or_default();
        let day_index = day_index_for(day);

        sqlx::query_as::<_, ClassEntry>(
            r#"
            INSERT INTO classes
                (id, user_id, subject, instructor, day, day_index, start_time, end_time, color, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(payload.subject.as_deref().unwrap_or_default())
        .bind(payload.instructor.as_deref().unwrap_or_default())
        .bind(day)
        .bind(day_index)
        .bind(payload.start_time.as_deref().unwrap_or_default())
        .bind(payload.end_time.as_deref().unwrap_or_default())
        .bind(payload.color.as_deref().unwrap_or("#45b7d1"))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert class")
    }

    /// Partial update; absent fields keep their stored value. Returns the
    /// updated row, or `None` when no row matched (missing id or wrong owner).
    pub async fn update_class(
        &self,
        user_id: &str,
        id: Uuid,
        payload: &UpdateClassPayload,
    ) -> Result<Option<ClassEntry>> {
        let day_index = payload.day.as_deref().and_then(day_index_for);

        sqlx::query_as::<_, ClassEntry>(
            r#"
            UPDATE classes SET
                subject = COALESCE($3, subject),
                instructor = COALESCE($4, instructor),
                day = COALESCE($5, day),
                day_index = COALESCE($6, day_index),
                start_time = COALESCE($7, start_time),
                end_time = COALESCE($8, end_time),
                color = COALESCE($9, color),
                updated_at = $10
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(payload.subject.as_deref())
        .bind(payload.instructor.as_deref())
        .bind(payload.day.as_deref())
        .bind(day_index)
        .bind(payload.start_time.as_deref())
        .bind(payload.end_time.as_deref())
        .bind(payload.color.as_deref())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update class")
    }

    pub async fn delete_class(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM classes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete class")?;
        Ok(result.rows_affected() > 0)
    }

    // === BUDGET ===

    pub async fn fetch_budget_entries(&self, user_id: &str) -> Result<Vec<BudgetEntry>> {
        sqlx::query_as::<_, BudgetEntry>(
            "SELECT * FROM budget_entries WHERE user_id = $1 ORDER BY date DESC, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch budget entries")
    }

    pub async fn insert_budget_entry(
        &self,
        user_id: &str,
        payload: &CreateBudgetPayload,
    ) -> Result<BudgetEntry> {
        sqlx::query_as::<_, BudgetEntry>(
            r#"
            INSERT INTO budget_entries
                (id, user_id, entry_type, amount, category, description, date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(payload.entry_type.as_deref().unwrap_or_default())
        .bind(payload.amount.unwrap_or_default())
        .bind(payload.category.as_deref().unwrap_or_default())
        .bind(payload.description.as_deref().unwrap_or_default())
        .bind(payload.date.unwrap_or_else(Utc::now))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert budget entry")
    }

    pub async fn update_budget_entry(
        &self,
        user_id: &str,
        id: Uuid,
        payload: &UpdateBudgetPayload,
    ) -> Result<Option<BudgetEntry>> {
        sqlx::query_as::<_, BudgetEntry>(
            r#"
            UPDATE budget_entries SET
                entry_type = COALESCE($3, entry_type),
                amount = COALESCE($4, amount),
                category = COALESCE($5, category),
                description = COALESCE($6, description),
                date = COALESCE($7, date),
                updated_at = $8
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(payload.entry_type.as_deref())
        .bind(payload.amount)
        .bind(payload.category.as_deref())
        .bind(payload.description.as_deref())
        .bind(payload.date)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update budget entry")
    }

    pub async fn delete_budget_entry(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM budget_entries WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete budget entry")?;
        Ok(result.rows_affected() > 0)
    }

    // === PLANNER ===

    pub async fn fetch_planner_tasks(&self, user_id: &str) -> Result<Vec<PlannerTask>> {
        sqlx::query_as::<_, PlannerTask>(
            "SELECT * FROM planner_tasks WHERE user_id = $1 ORDER BY due_date, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch planner tasks")
    }

    pub async fn insert_planner_task(
        &self,
        user_id: &str,
        payload: &CreateTaskPayload,
    ) -> Result<PlannerTask> {
        sqlx::query_as::<_, PlannerTask>(
            r#"
            INSERT INTO planner_tasks
                (id, user_id, title, description, due_date, status, priority, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(payload.title.as_deref().unwrap_or_default())
        .bind(payload.description.as_deref().unwrap_or_default())
        .bind(payload.due_date)
        .bind(payload.status.as_deref().unwrap_or("pending"))
        .bind(payload.priority.as_deref().unwrap_or("medium"))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert planner task")
    }

    pub async fn update_planner_task(
        &self,
        user_id: &str,
        id: Uuid,
        payload: &UpdateTaskPayload,
    ) -> Result<Option<PlannerTask>> {
        sqlx::query_as::<_, PlannerTask>(
            r#"
            UPDATE planner_tasks SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                due_date = COALESCE($5, due_date),
                status = COALESCE($6, status),
                priority = COALESCE($7, priority),
                updated_at = $8
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(payload.title.as_deref())
        .bind(payload.description.as_deref())
        .bind(payload.due_date)
        .bind(payload.status.as_deref())
        .bind(payload.priority.as_deref())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update planner task")
    }

    pub async fn delete_planner_task(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM planner_tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete planner task")?;
        Ok(result.rows_affected() > 0)
    }

    // === WELLNESS ===

    pub async fn fetch_recent_wellness(&self, user_id: &str) -> Result<Vec<WellnessEntry>> {
        sqlx::query_as::<_, WellnessEntry>(
            "SELECT * FROM wellness_entries WHERE user_id = $1 ORDER BY date DESC LIMIT 7",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent wellness entries")
    }

    pub async fn fetch_wellness_history(&self, user_id: &str) -> Result<Vec<WellnessEntry>> {
        sqlx::query_as::<_, WellnessEntry>(
            "SELECT * FROM wellness_entries WHERE user_id = $1 ORDER BY date DESC LIMIT 30",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch wellness history")
    }

    pub async fn insert_wellness_entry(
        &self,
        user_id: &str,
        payload: &RecordMoodPayload,
    ) -> Result<WellnessEntry> {
        sqlx::query_as::<_, WellnessEntry>(
            r#"
            INSERT INTO wellness_entries
                (id, user_id, mood, sleep_hours, study_hours, notes, date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(payload.mood.unwrap_or_default())
        .bind(payload.sleep_hours.unwrap_or_default())
        .bind(payload.study_hours.unwrap_or_default())
        .bind(payload.notes.as_deref().unwrap_or_default())
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert wellness entry")
    }

    // === STUDY SESSIONS ===

    pub async fn fetch_study_sessions(&self, user_id: &str) -> Result<Vec<StudySession>> {
        sqlx::query_as::<_, StudySession>(
            "SELECT * FROM study_sessions WHERE user_id = $1 ORDER BY date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch study sessions")
    }

    pub async fn fetch_study_history(&self, user_id: &str) -> Result<Vec<StudySession>> {
        sqlx::query_as::<_, StudySession>(
            "SELECT * FROM study_sessions WHERE user_id = $1 ORDER BY date DESC LIMIT 30",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch study history")
    }

    pub async fn insert_study_session(
        &self,
        user_id: &str,
        payload: &RecordSessionPayload,
    ) -> Result<StudySession> {
        sqlx::query_as::<_, StudySession>(
            r#"
            INSERT INTO study_sessions
                (id, user_id, subject, duration, topic, efficiency, date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(payload.subject.as_deref().unwrap_or_default())
        .bind(payload.duration.unwrap_or_default())
        .bind(payload.topic.as_deref().unwrap_or_default())
        .bind(payload.efficiency.unwrap_or_default())
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert study session")
    }

    // === STUDY GOALS ===

    pub async fn fetch_study_goals(&self, user_id: &str) -> Result<Vec<StudyGoal>> {
        sqlx::query_as::<_, StudyGoal>(
            "SELECT * FROM study_goals WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch study goals")
    }

    pub async fn insert_study_goal(
        &self,
        user_id: &str,
        payload: &CreateGoalPayload,
    ) -> Result<StudyGoal> {
        sqlx::query_as::<_, StudyGoal>(
            r#"
            INSERT INTO study_goals (id, user_id, subject, target_hours, deadline, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(payload.subject.as_deref().unwrap_or_default())
        .bind(payload.target_hours.unwrap_or_default())
        .bind(payload.deadline)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert study goal")
    }

    // === QUIZ RESULTS ===

    pub async fn fetch_quiz_results(&self, user_id: &str) -> Result<Vec<QuizResult>> {
        sqlx::query_as::<_, QuizResult>(
            "SELECT * FROM quiz_results WHERE user_id = $1 ORDER BY date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch quiz results")
    }

    pub async fn fetch_recent_quiz_results(&self, user_id: &str) -> Result<Vec<QuizResult>> {
        sqlx::query_as::<_, QuizResult>(
            "SELECT * FROM quiz_results WHERE user_id = $1 ORDER BY date DESC LIMIT 5",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch recent quiz results")
    }

    pub async fn fetch_quiz_history(
        &self,
        user_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QuizResult>> {
        sqlx::query_as::<_, QuizResult>(
            "SELECT * FROM quiz_results WHERE user_id = $1 ORDER BY date DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch quiz history")
    }

    pub async fn count_quiz_results(&self, user_id: &str) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM quiz_results WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count quiz results")
    }

    pub async fn insert_quiz_result(
        &self,
        user_id: &str,
        payload: &SaveQuizResultPayload,
    ) -> Result<QuizResult> {
        sqlx::query_as::<_, QuizResult>(
            r#"
            INSERT INTO quiz_results
                (id, user_id, topic, score, total_questions, percentage, quiz_type,
                 difficulty, time_spent, date, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(payload.topic.as_deref().unwrap_or_default())
        .bind(payload.score.unwrap_or_default())
        .bind(payload.total_questions.unwrap_or_default())
        .bind(payload.percentage.unwrap_or_default())
        .bind(payload.quiz_type.as_deref().unwrap_or("general"))
        .bind(payload.difficulty.as_deref().unwrap_or("medium"))
        .bind(payload.time_spent.unwrap_or_default())
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert quiz result")
    }

    pub async fn delete_quiz_result(&self, user_id: &str, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quiz_results WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete quiz result")?;
        Ok(result.rows_affected() > 0)
    }
}

/// Derives the numeric weekday for a stored day name so reads never have to
/// re-resolve it. Unresolvable names store NULL and fall back at read time.
fn day_index_for(day: &str) -> Option<i32> {
    crate::dashboard::day_name_to_index(day).map(|i| i as i32)
}

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS classes (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    subject TEXT NOT NULL DEFAULT '',
    instructor TEXT NOT NULL DEFAULT '',
    day TEXT NOT NULL DEFAULT '',
    day_index INTEGER,
    start_time TEXT NOT NULL DEFAULT '',
    end_time TEXT NOT NULL DEFAULT '',
    color TEXT NOT NULL DEFAULT '#45b7d1',
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS budget_entries (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    entry_type TEXT NOT NULL DEFAULT '',
    amount DOUBLE PRECISION NOT NULL DEFAULT 0,
    category TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    date TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS planner_tasks (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    description TEXT NOT NULL DEFAULT '',
    due_date TIMESTAMPTZ,
    status TEXT NOT NULL DEFAULT 'pending',
    priority TEXT NOT NULL DEFAULT 'medium',
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ
);

CREATE TABLE IF NOT EXISTS wellness_entries (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    mood DOUBLE PRECISION NOT NULL DEFAULT 0,
    sleep_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
    study_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
    notes TEXT NOT NULL DEFAULT '',
    date TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS study_sessions (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    subject TEXT NOT NULL DEFAULT '',
    duration DOUBLE PRECISION NOT NULL DEFAULT 0,
    topic TEXT NOT NULL DEFAULT '',
    efficiency DOUBLE PRECISION NOT NULL DEFAULT 0,
    date TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS study_goals (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    subject TEXT NOT NULL DEFAULT '',
    target_hours DOUBLE PRECISION NOT NULL DEFAULT 0,
    deadline TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS quiz_results (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    topic TEXT NOT NULL DEFAULT '',
    score DOUBLE PRECISION NOT NULL DEFAULT 0,
    total_questions INTEGER NOT NULL DEFAULT 0,
    percentage DOUBLE PRECISION NOT NULL DEFAULT 0,
    quiz_type TEXT NOT NULL DEFAULT 'general',
    difficulty TEXT NOT NULL DEFAULT 'medium',
    time_spent DOUBLE PRECISION NOT NULL DEFAULT 0,
    date TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_classes_user ON classes (user_id, day_index, start_time);
CREATE INDEX IF NOT EXISTS idx_budget_user_date ON budget_entries (user_id, date DESC);
CREATE INDEX IF NOT EXISTS idx_planner_user_due ON planner_tasks (user_id, due_date);
CREATE INDEX IF NOT EXISTS idx_wellness_user_date ON wellness_entries (user_id, date DESC);
CREATE INDEX IF NOT EXISTS idx_sessions_user_date ON study_sessions (user_id, date DESC);
CREATE INDEX IF NOT EXISTS idx_goals_user ON study_goals (user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_quiz_user_date ON quiz_results (user_id, date DESC);
"#;
