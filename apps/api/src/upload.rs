use axum::extract::Multipart;
use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::storage::{content_type_for, BlobStore, StorageError};

/// The multipart form shared by `/api/optimize` and `/api/rewrite-resume`.
#[derive(Debug)]
pub struct ResumeUpload {
    pub filename: String,
    pub bytes: Bytes,
    pub job_description: String,
    pub user_name: Option<String>,
}

impl ResumeUpload {
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut resume: Option<(String, Bytes)> = None;
        let mut job_description: Option<String> = None;
        let mut user_name: Option<String> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
        {
            match field.name() {
                Some("resume") => {
                    let filename = secure_filename(field.file_name().unwrap_or_default());
                    let data = field
                        .bytes()
                        .await
                        .map_err(|_| AppError::Validation("Invalid resume file".to_string()))?;
                    resume = Some((filename, data));
                }
                Some("job_description") => job_description = Some(text_field(field).await?),
                Some("user_name") => user_name = Some(text_field(field).await?),
                _ => {}
            }
        }

        let (filename, bytes) =
            resume.ok_or_else(|| AppError::Validation("No resume file provided".to_string()))?;
        let job_description = job_description
            .filter(|jd| !jd.trim().is_empty())
            .ok_or_else(|| AppError::Validation("No job description provided".to_string()))?;

        info!(
            "Received resume {filename} ({} bytes), job description {} chars",
            bytes.len(),
            job_description.len()
        );

        Ok(Self {
            filename,
            bytes,
            job_description,
            user_name: user_name.filter(|n| !n.trim().is_empty()),
        })
    }
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid form field: {e}")))
}

/// Strips directories and anything outside `[A-Za-z0-9._-]`; whitespace
/// becomes `_`.
pub fn secure_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// UTC timestamp used in every generated blob name.
pub fn timestamp() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

/// `cv.pdf` → `cv_20240501103000.pdf`
pub fn timestamped_name(filename: &str, timestamp: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{timestamp}.{ext}"),
        _ => format!("{filename}_{timestamp}"),
    }
}

/// Stores the uploaded original under a timestamped name and returns its URL.
pub async fn store_original(
    store: &dyn BlobStore,
    container: &str,
    filename: &str,
    bytes: &[u8],
) -> Result<String, StorageError> {
    let key = timestamped_name(filename, &timestamp());
    store
        .put(container, &key, bytes.to_vec(), content_type_for(&key))
        .await
}
