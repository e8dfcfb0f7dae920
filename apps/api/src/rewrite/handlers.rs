use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use super::agent::{AgentResult, ResumeAgent};
use crate::errors::AppError;
use crate::state::AppState;
use crate::upload::{store_original, ResumeUpload};

const DEFAULT_USER_NAME: &str = "User";

#[derive(Debug, Serialize)]
pub struct RewriteResponse {
    #[serde(flatten)]
    pub result: AgentResult,
    pub original_resume_url: String,
}

/// GET /api/rewrite-resume
pub async fn handle_rewrite_usage() -> Json<Value> {
    Json(json!({
        "message": "This endpoint requires a POST request with a resume file and job description",
        "usage": {
            "method": "POST",
            "content_type": "multipart/form-data",
            "parameters": {
                "resume": "PDF, DOCX, TXT or MD file",
                "job_description": "Text of the job description",
                "user_name": "Name of the user"
            }
        }
    }))
}

/// POST /api/rewrite-resume
pub async fn handle_rewrite_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<RewriteResponse>, AppError> {
    let upload = ResumeUpload::from_multipart(multipart).await?;
    let user_name = upload.user_name.as_deref().unwrap_or(DEFAULT_USER_NAME);

    let agent = ResumeAgent::new(
        state.llm.clone(),
        state.storage.clone(),
        state.config.clone(),
    );
    let result = agent
        .process_resume(
            &upload.filename,
            &upload.bytes,
            &upload.job_description,
            user_name,
        )
        .await;

    let original_resume_url = match store_original(
        state.storage.as_ref(),
        &state.config.resume_container,
        &upload.filename,
        &upload.bytes,
    )
    .await
    {
        Ok(url) => {
            info!("Original resume uploaded to {url}");
            url
        }
        Err(e) => {
            error!("Error uploading original resume: {e}");
            String::new()
        }
    };

    Ok(Json(RewriteResponse {
        result,
        original_resume_url,
    }))
}
