use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
pub async fn health_handler() -> &'static str {
    "OK"
}

/// GET /api/check-env
/// Reports which settings are configured. Secrets are reported as booleans only.
pub async fn check_env_handler(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "GEMINI_API_KEY": !config.gemini_api_key.is_empty(),
        "GEMINI_MODEL_ID": config.gemini_model_id,
        "GEMINI_API_VERSION": config.gemini_api_version,
        "S3_ENDPOINT": config.s3_endpoint,
        "AWS_ACCESS_KEY_ID": !config.aws_access_key_id.is_empty(),
        "AWS_SECRET_ACCESS_KEY": !config.aws_secret_access_key.is_empty(),
        "RESUME_CONTAINER_NAME": config.resume_container,
        "TAILORED_RESUME_CONTAINER_NAME": config.tailored_container,
        "TRACKING_CONTAINER_NAME": config.tracking_container,
        "TRACKING_FILE_NAME": config.tracking_file_name,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /api/test
pub async fn test_handler() -> Json<Value> {
    Json(json!({
        "status": "success",
        "message": "API is working correctly",
        "time": Utc::now().to_rfc3339()
    }))
}
