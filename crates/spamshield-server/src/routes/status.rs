//! Health and pipeline status routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(get_health))
        .route("/status", get(get_status))
}

/// GET /api/health
async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/status: loaded models, effective configuration, last run.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = &state.config;

    Json(serde_json::json!({
        "pipeline": state.orchestrator.info(),
        "config": {
            "port": config.port,
            "modelDir": config.model_paths.root.display().to_string(),
            "spamCodeModel": config.model_paths.spam_code_clf.display().to_string(),
            "spamTypeModel": config.model_paths.spam_type_clf.display().to_string(),
            "batchSize": config.embedding.batch_size,
            "maxSeqLen": config.embedding.max_seq_len,
            "pooling": config.embedding.pooling,
            "translation": {
                "enabled": config.translation.endpoint.is_some(),
                "targetLang": config.translation.target_lang,
            },
        },
        "runs": state.runs(),
        "lastRun": state.last_report(),
    }))
}
