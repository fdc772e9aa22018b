//! REST API Server for the Report Orchestrator
//!
//! Exposes report generation via HTTP endpoints

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::agent::Orchestrator;
use crate::error::ReportError;
use crate::models::ReportRequest;

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

fn status_for(error: &ReportError) -> StatusCode {
    match error {
        ReportError::UnknownRoute(_) => StatusCode::BAD_REQUEST,
        ReportError::SourceNotFound(_) => StatusCode::NOT_FOUND,
        ReportError::SourceError(_) | ReportError::HttpError(_) => StatusCode::BAD_GATEWAY,
        ReportError::WriteError { .. }
        | ReportError::ConfigError(_)
        | ReportError::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Report Endpoint
/// =============================

async fn create_report(
    State(state): State<ApiState>,
    Json(req): Json<ReportRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("query must not be empty".into())),
        );
    }

    info!("Received report request: {}", req.query);

    match state.orchestrator.handle(req).await {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))),
        Err(e) => {
            warn!(error = %e, "Report request failed");
            (
                status_for(&e),
                Json(ApiResponse::error(format!("Report failed: {}", e))),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/report", post(create_report))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
