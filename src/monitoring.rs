// src/monitoring.rs - Request timing middleware
use axum::{extract::Request, middleware::Next, response::Response};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};
use tracing::warn;

static TOTAL_REQUESTS: AtomicU64 = AtomicU64::new(0);
static FAILED_REQUESTS: AtomicU64 = AtomicU64::new(0);

pub fn request_totals() -> (u64, u64) {
    (
        TOTAL_REQUESTS.load(Ordering::Relaxed),
        FAILED_REQUESTS.load(Ordering::Relaxed),
    )
}

/// Tracks per-request latency and flags slow requests in the log.
pub async fn performance_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    TOTAL_REQUESTS.fetch_add(1, Ordering::Relaxed);
    if status.is_server_error() {
        FAILED_REQUESTS.fetch_add(1, Ordering::Relaxed);
    }

    if duration.as_millis() > 500 {
        warn!(
            "slow request: {} took {}ms (status: {})",
            path,
            duration.as_millis(),
            status.as_u16()
        );
    }

    response
}
