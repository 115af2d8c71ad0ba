//! Request handlers for the relay API

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use super::AppState;
use crate::panel::{help_doc, validate, PanelError, UA_FORWARD_SENTINEL};

/// Fallback User-Agent when the caller sent none and a panel forwards it
const RELAY_USER_AGENT: &str = concat!("subrelay/", env!("CARGO_PKG_VERSION"));

/// `GET /` - list the available boards
pub async fn list_boards(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "boards": state.registry.ids() }))
}

/// `GET /board/{name}/help` - a board's help document
pub async fn board_help(Path(name): Path<String>, State(state): State<AppState>) -> Response {
    match state.registry.get(&name) {
        Some(panel) => {
            Json(help_doc(panel.id(), panel.description(), panel.query_params())).into_response()
        }
        None => board_not_found(&state),
    }
}

/// `GET /board/{name}` - run a board and relay its subscription
pub async fn dispatch_board(
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let Some(panel) = state.registry.get(&name) else {
        return board_not_found(&state);
    };

    let (mut params, issues) = validate(panel.query_params(), &query);
    if !issues.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": issues }))).into_response();
    }

    // A `ua` left at its sentinel default means "forward the caller's agent"
    if params.get("ua").map(String::as_str) == Some(UA_FORWARD_SENTINEL) {
        let caller_ua = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(RELAY_USER_AGENT);
        params.insert("ua".to_string(), caller_ua.to_string());
    }

    info!(board = %name, "dispatching board request");
    match panel.fetch(&state.ctx, &params).await {
        Ok(subscription) => {
            let content_type = subscription
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string());
            ([(header::CONTENT_TYPE, content_type)], subscription.body).into_response()
        }
        Err(err) => panel_error_response(&name, &err),
    }
}

/// Any other path - 404 with the board listing
pub async fn fallback(State(state): State<AppState>) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "available_boards": state.registry.ids(),
        })),
    )
        .into_response()
}

fn board_not_found(state: &AppState) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "board_not_found",
            "available": state.registry.ids(),
        })),
    )
        .into_response()
}

fn panel_error_response(board: &str, err: &PanelError) -> Response {
    let status = err.status();
    warn!(board, %status, error = %err, "board request failed");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
