use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::analyze_resume;
use super::recommendations::Recommendations;
use crate::errors::AppError;
use crate::extraction::extract_text;
use crate::state::AppState;
use crate::upload::{store_original, ResumeUpload};

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub original_resume_url: String,
    pub recommendations: Recommendations,
}

/// GET /api/optimize
pub async fn handle_optimize_usage() -> Json<Value> {
    Json(json!({
        "message": "This endpoint requires a POST request with a resume file and job description",
        "usage": {
            "method": "POST",
            "content_type": "multipart/form-data",
            "parameters": {
                "resume": "PDF, DOCX, TXT or MD file",
                "job_description": "Text of the job description"
            }
        }
    }))
}

/// POST /api/optimize
pub async fn handle_optimize(State(state): State<AppState>, multipart: Multipart) -> Response {
    match optimize(&state, multipart).await {
        Ok(response) => Json(response).into_response(),
        Err(e @ AppError::Validation(_)) => e.into_response(),
        Err(e) => {
            error!("Error in optimize: {e}");
            let body = OptimizeResponse {
                original_resume_url: String::new(),
                recommendations: Recommendations::system_error(&e.to_string()),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

async fn optimize(state: &AppState, multipart: Multipart) -> Result<OptimizeResponse, AppError> {
    let upload = ResumeUpload::from_multipart(multipart).await?;

    let resume_text = extract_text(&upload.filename, &upload.bytes)?;
    info!("Extracted {} characters from resume", resume_text.len());

    let original_resume_url = store_original(
        state.storage.as_ref(),
        &state.config.resume_container,
        &upload.filename,
        &upload.bytes,
    )
    .await?;
    info!("Resume uploaded to {original_resume_url}");

    let recommendations =
        analyze_resume(state.llm.as_ref(), &resume_text, &upload.job_description).await;

    Ok(OptimizeResponse {
        original_resume_url,
        recommendations,
    })
}
