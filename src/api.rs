use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    app_state::AppState,
    config::SERVICE_VERSION,
    models::{CrawlerResponse, RunResult, SystemInfo},
};

// --- Payloads de la API ---

#[derive(Deserialize)]
pub struct CrawlerPayload {
    #[serde(default)]
    prompt: String,
}

#[derive(Deserialize)]
pub struct FeedbackPayload {
    #[serde(default)]
    prompt: String,
    response: CrawlerResponse,
    #[serde(default)]
    useful: bool,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/crawler", post(crawler_handler))
        .route("/api/feedback", post(feedback_handler))
        .route("/api/stats", get(stats_handler))
        .route("/api/health", get(health_handler))
        .route("/", get(home_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn crawler_handler(
    State(state): State<AppState>,
    Json(payload): Json<CrawlerPayload>,
) -> Result<Json<RunResult>, (StatusCode, Json<serde_json::Value>)> {
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "El campo 'prompt' es obligatorio"})),
        ));
    }

    let preview: String = prompt.chars().take(60).collect();
    info!("Procesando: '{preview}'");

    let result = state.crawler.run(prompt).await;
    Ok(Json(result))
}

#[axum::debug_handler]
async fn feedback_handler(
    State(state): State<AppState>,
    Json(payload): Json<FeedbackPayload>,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Los campos 'prompt' y 'response' son obligatorios"})),
        ));
    }

    state
        .crawler
        .add_feedback(prompt, &payload.response, payload.useful);
    let stats = state.crawler.learning_stats();

    info!(
        "Feedback registrado: {}.",
        if payload.useful { "positivo" } else { "negativo" }
    );

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Feedback registrado correctamente",
            "learning_stats": stats,
        })),
    ))
}

#[axum::debug_handler]
async fn stats_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.crawler.learning_stats();
    let system_info = SystemInfo {
        ai_provider: state.crawler.ai_provider_name().map(str::to_string),
        cache_enabled: state.crawler.cache_enabled(),
        version: SERVICE_VERSION,
    };

    Json(json!({
        "learning_stats": stats,
        "system_info": system_info,
    }))
}

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "Crawler RAG API",
        "version": SERVICE_VERSION,
        "features": {
            "ai_enabled": state.crawler.ai_provider_name().is_some(),
            "ai_provider": state.crawler.ai_provider_name(),
            "cache_enabled": state.crawler.cache_enabled(),
            "learning_enabled": true,
        },
    }))
}

#[axum::debug_handler]
async fn home_handler() -> Json<serde_json::Value> {
    Json(json!({
        "service": "Crawler RAG API",
        "version": SERVICE_VERSION,
        "endpoints": {
            "POST /api/crawler": "Procesar una consulta",
            "POST /api/feedback": "Enviar feedback para aprendizaje",
            "GET /api/stats": "Estadísticas de aprendizaje",
            "GET /api/health": "Health check",
            "GET /": "Información del servicio",
        },
    }))
}
