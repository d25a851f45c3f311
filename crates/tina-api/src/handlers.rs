//! API Handlers
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{error, warn};

use tina_core::{TurnRequest, TINA_VERSION};

use crate::AppState;

const INVALID_INPUT_MESSAGE: &str = "Missing sessionId or userResponse.";
const FAILURE_MESSAGE: &str = "Failed to process interview.";

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<TurnRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "Rejected chat body");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": INVALID_INPUT_MESSAGE })),
            );
        }
    };

    let started = Instant::now();
    match state.service.take_turn(request).await {
        Ok(result) => {
            state.metrics.observe_turn(
                &result.session.stage,
                result.generated,
                started.elapsed().as_secs_f64(),
            );
            (
                StatusCode::OK,
                Json(json!({
                    "response": result.reply,
                    "history": result.session.history,
                    "interviewStage": result.session.stage,
                    "followUpCount": result.session.follow_up_count,
                })),
            )
        }
        Err(err) if err.is_client_error() => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": INVALID_INPUT_MESSAGE })),
        ),
        Err(err) => {
            error!(error = %err, "Error processing interview turn");
            state.metrics.observe_failure();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": FAILURE_MESSAGE })),
            )
        }
    }
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.service.snapshot(&id).await {
        Some(session) => (
            StatusCode::OK,
            Json(json!({
                "sessionId": session.id,
                "history": session.history,
                "interviewStage": session.stage,
                "followUpCount": session.follow_up_count,
                "answers": session.answers,
                "createdAt": session.created_at,
                "updatedAt": session.updated_at,
            })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Session not found." })),
        ),
    }
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": TINA_VERSION })),
    )
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(err) => {
            error!(error = %err, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain")],
                String::new(),
            )
        }
    }
}
