// HTTP front end for the retriever
// One JSON endpoint answering questions plus a health probe


use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::retrieval::{Answer, Query, Retriever};
use crate::{QaError, Result};

#[derive(Clone)]
pub struct AppState {
    retriever: Arc<Retriever>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub documents: usize,
    pub dimension: usize,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// Build the application router around a shared retriever
#[inline]
pub fn router(retriever: Arc<Retriever>, max_body_bytes: usize) -> Router {
    let state = AppState { retriever };

    Router::new()
        .route("/api/", post(answer_handler))
        .route("/api", post(answer_handler))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `app` on `listener` until Ctrl-C
#[inline]
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| QaError::Server(format!("listener has no local address: {}", e)))?;
    info!("Retriever listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| QaError::Server(format!("server error: {}", e)))?;

    info!("Retriever shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn healthz(State(state): State<AppState>) -> Json<HealthBody> {
    let index = state.retriever.index();
    Json(HealthBody {
        status: "ok".to_string(),
        documents: index.len(),
        dimension: index.dimension(),
    })
}

async fn answer_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Query>, JsonRejection>,
) -> std::result::Result<Json<Answer>, ApiError> {
    let Json(query) = payload.map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        (
            rejection.status(),
            Json(ErrorBody {
                message: rejection.body_text(),
            }),
        )
    })?;

    let retriever = Arc::clone(&state.retriever);
    let answer = tokio::task::spawn_blocking(move || retriever.answer(&query))
        .await
        .map_err(|e| internal_error(format!("retrieval task failed: {}", e)))?
        .map_err(|e| internal_error(e.to_string()))?;

    Ok(Json(answer))
}

fn internal_error(message: String) -> ApiError {
    error!("{}", message);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody { message }),
    )
}
