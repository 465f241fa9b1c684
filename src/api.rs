//! REST API Server for the sentiment rebalancer
//!
//! Exposes the agent via HTTP endpoints

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::agent::SentimentAgent;
use crate::models::{sample_news, NewsItem};

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
    pub agent: Arc<SentimentAgent>,
}

/// A JSON array of news items; anything else means "use the sample set".
fn parse_news_body(body: &[u8]) -> Vec<NewsItem> {
    serde_json::from_slice::<Vec<NewsItem>>(body).unwrap_or_else(|_| sample_news())
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
/// Sentiment Endpoints
/// =============================

async fn run_analysis(state: &ApiState, items: Vec<NewsItem>) -> (StatusCode, Json<ApiResponse>) {
    let current = state.agent.default_holdings();

    match state.agent.analyze(items, &current).await {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))),
        Err(e) => {
            error!(error = %e, "Sentiment pipeline failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("Sentiment analysis failed: {}", e))),
            )
        }
    }
}

async fn analyze_sample(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    info!("Received sentiment request (sample news)");
    run_analysis(&state, sample_news()).await
}

async fn analyze_posted(
    State(state): State<ApiState>,
    body: Bytes,
) -> (StatusCode, Json<ApiResponse>) {
    let items = parse_news_body(&body);
    info!(item_count = items.len(), "Received sentiment request");
    run_analysis(&state, items).await
}

/// =============================
/// Decision Endpoints
/// =============================

async fn list_decisions(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    match state.agent.decisions().list().await {
        Ok(records) => (StatusCode::OK, Json(ApiResponse::success(records))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to list decisions: {}", e))),
        ),
    }
}

async fn get_decision(
    State(state): State<ApiState>,
    Path(decision_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let decision_id = match Uuid::parse_str(&decision_id) {
        Ok(id) => id,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(format!("Invalid decision id: {}", e))),
            )
        }
    };

    let decisions = state.agent.decisions();
    match (decisions.get(decision_id).await, decisions.verify_integrity(decision_id).await) {
        (Ok(Some(record)), Ok(verified)) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "record": record,
                "verified": verified,
            }))),
        ),
        (Ok(None), _) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Decision {} not found", decision_id))),
        ),
        (Err(e), _) | (_, Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to load decision: {}", e))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(agent: Arc<SentimentAgent>) -> Router {
    let state = ApiState { agent };

    Router::new()
        .route("/health", get(health))
        .route("/api/sentiment", get(analyze_sample).post(analyze_posted))
        .route("/api/decisions", get(list_decisions))
        .route("/api/decisions/:id", get(get_decision))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    agent: Arc<SentimentAgent>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(agent);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
