//! Plain HTTP frontend
//!
//! `POST /exec {"command"}` and `POST /ask {"query"}`; queue failures map to
//! 503, bad requests to 400.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use super::{BridgeState, control_routes};
use crate::handoff::CommandKind;

pub(super) fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/exec", post(exec))
        .route("/ask", post(ask))
        .merge(control_routes())
        .with_state(state)
}

async fn exec(State(state): State<BridgeState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(state, body, CommandKind::RawExec, "command", "output").await
}

async fn ask(State(state): State<BridgeState>, body: Result<Json<Value>, JsonRejection>) -> Response {
    handle(state, body, CommandKind::AssistantAsk, "query", "response").await
}

async fn handle(
    state: BridgeState,
    body: Result<Json<Value>, JsonRejection>,
    kind: CommandKind,
    field: &str,
    reply_field: &str,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return bad_request(format!("invalid JSON: {}", rejection.body_text()));
        }
    };

    let input = match body.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => return bad_request(format!("missing {field}")),
    };

    match state.submit(kind, input).await {
        Ok(result) => Json(json!({ reply_field: result, "success": true })).into_response(),
        Err(e) => {
            log::warn!("{kind} request failed: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ reply_field: e.to_string(), "success": false })),
            )
                .into_response()
        }
    }
}

fn bad_request(error: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "success": false })),
    )
        .into_response()
}
