// src/main.rs - StudyMate read-side API entry point
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analytics;
mod auth;
mod cache;
mod config;
mod dashboard;
mod database;
mod handlers;
mod invalidation;
mod models;
mod monitoring;

use crate::{
    cache::{start_cache_sweeper, TtlCache},
    config::AppConfig,
    database::Database,
    handlers::*,
    monitoring::performance_middleware,
};

pub struct AppState {
    pub db: Database,
    pub cache: TtlCache,
    pub config: AppConfig,
}

pub type SharedState = Arc<AppState>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studymate_api=info,sqlx=warn,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting StudyMate API");

    let config = AppConfig::load()?;
    config.validate()?;
    info!("configuration loaded");

    let database = Database::new(&config).await?;

    let cache = TtlCache::new(config.cache.default_ttl());
    start_cache_sweeper(cache.clone(), config.cache.sweep_interval());
    info!(
        "cache ready (default ttl {}s, sweep every {}s)",
        config.cache.default_ttl_seconds, config.cache.sweep_interval_seconds
    );

    let state = Arc::new(AppState {
        db: database,
        cache,
        config,
    });

    let app = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/classes", get(get_classes).post(create_class))
        .route("/api/classes/:id", axum::routing::put(update_class).delete(delete_class))
        .route("/api/budget", get(get_budget).post(create_budget_entry))
        .route(
            "/api/budget/:id",
            axum::routing::put(update_budget_entry).delete(delete_budget_entry),
        )
        .route("/api/planner", get(get_planner).post(create_task))
        .route("/api/planner/:id", axum::routing::put(update_task).delete(delete_task))
        .route("/api/goals", get(get_goals).post(create_goal))
        .route("/api/quiz/results", post(save_quiz_result))
        .route("/api/quiz/results/:id", axum::routing::delete(delete_quiz_result))
        .route("/api/quiz/results/performance", get(get_quiz_performance))
        .route("/api/quiz/results/summary", get(get_quiz_summary))
        .route("/api/quiz/results/history", get(get_quiz_history))
        .route("/api/summary/dashboard", get(get_dashboard))
        .route("/api/summary/study-session", post(record_study_session))
        .route("/api/summary/mood-track", post(record_mood))
        .route("/api/summary/wellness-history", get(get_wellness_history))
        .route("/api/summary/study-history", get(get_study_history))
        .layer(middleware::from_fn(performance_middleware))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let bind_address = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("received terminate signal, shutting down");
        },
    }
}
