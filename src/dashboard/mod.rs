use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::error::CronlockError;
use crate::store::LockStore;
use crate::viewer;

#[derive(Clone)]
pub struct DashboardState {
    pub store: Arc<dyn LockStore>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

pub fn router(state: DashboardState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/jobs", get(list_jobs_handler))
        .route("/api/jobs/{fingerprint}", get(get_job_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve the dashboard until `shutdown` is cancelled.
pub async fn run_dashboard(
    addr: &str,
    state: DashboardState,
    shutdown: CancellationToken,
) -> Result<(), CronlockError> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(addr = %addr, error = %e, "Failed to bind dashboard server");
        e
    })?;

    tracing::info!(addr = %addr, "Starting dashboard server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Dashboard server stopped");
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

async fn list_jobs_handler(State(state): State<DashboardState>) -> Response {
    let now = chrono::Utc::now().timestamp();
    match viewer::list_jobs(state.store.as_ref(), now).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn get_job_handler(
    State(state): State<DashboardState>,
    Path(fingerprint): Path<String>,
) -> Response {
    match viewer::load_record(state.store.as_ref(), &fingerprint).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Job not found: {}", fingerprint),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
