use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::gateway::{GatewayError, PredictionGateway};
use crate::normalizer::{normalize, SeverityViewModel};
use crate::types::ConditionRequest;

type ApiError = (StatusCode, Json<Value>);

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<PredictionGateway>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/predict", post(relay))
        .route("/api/severity", post(severity))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------- Handlers ----------

// Pass-through: whatever the caller sent goes upstream unchanged.
async fn relay(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    state
        .gateway
        .forward(&payload)
        .await
        .map(Json)
        .map_err(into_api_error)
}

// Full pipeline: checked conditions in, view model out. Anything that is not
// a well-formed, in-domain condition record is a 400 with an `error` body.
async fn severity(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SeverityViewModel>, ApiError> {
    let Json(payload) = payload.map_err(|e| bad_request(e.body_text()))?;
    let request: ConditionRequest =
        serde_json::from_value(payload).map_err(|e| bad_request(e.to_string()))?;
    request.validate().map_err(|e| bad_request(e.to_string()))?;

    let outcome = state.gateway.forward(&request).await;
    Ok(Json(normalize(&outcome)))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "upstream": state.gateway.url() }))
}

fn bad_request(message: String) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn into_api_error(e: GatewayError) -> ApiError {
    let status = match e {
        GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GatewayError::Transport(_) | GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "error": e.detail() })))
}
