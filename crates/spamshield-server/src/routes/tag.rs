//! Tagging route.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use spamshield_core::{Error, RecordSet};
use tracing::{error, info, warn};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/tag", post(tag_records))
}

/// POST /api/tag: run the full pipeline over `{"records": [...]}`.
async fn tag_records(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let records = match parse_records(&body) {
        Ok(records) => records,
        Err(e) => {
            warn!("Rejected tag request: {}", e);
            return error_response(&e);
        }
    };
    info!("Tag request: {} records", records.len());

    // Model calls and the translator block.
    let orchestrator = state.orchestrator.clone();
    let outcome = tokio::task::spawn_blocking(move || orchestrator.tag(&records)).await;

    match outcome {
        Ok(Ok((labeled, report))) => {
            state.record_run(&report);
            Json(serde_json::json!({
                "records": labeled,
                "report": report,
            }))
            .into_response()
        }
        Ok(Err(e)) => {
            error!("Tagging failed: {}", e);
            error_response(&e)
        }
        Err(e) => {
            error!("Tagging task panicked: {}", e);
            error_response(&Error::Internal("Tagging task failed".into()))
        }
    }
}

fn parse_records(body: &[u8]) -> spamshield_core::Result<RecordSet> {
    let raw = std::str::from_utf8(body)
        .map_err(|e| Error::InvalidInput(format!("request body is not UTF-8: {e}")))?;
    RecordSet::from_json_str(raw)
}

fn error_response(error: &Error) -> Response {
    (
        status_for(error),
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response()
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidInput(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
