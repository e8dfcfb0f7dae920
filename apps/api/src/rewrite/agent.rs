use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use super::job_details::extract_job_details;
use super::rewriter::{rewrite_resume, unique_identifier};
use crate::config::Config;
use crate::docx::text_to_docx;
use crate::extraction::extract_text;
use crate::llm_client::TextGenerator;
use crate::storage::tracking::{append_entry, TrackingEntry};
use crate::storage::{BlobStore, DOCX_CONTENT_TYPE};
use crate::upload::timestamp;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TailoredResume {
    pub tailored_resume_url: String,
    pub tailored_resume_filename: String,
    pub job_title: String,
    pub company_name: String,
    pub role: String,
    pub integration_percentage: String,
    pub changes_summary: Vec<String>,
    pub highlighted_skills: Vec<String>,
    pub gap_analysis: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AgentResult {
    Success {
        message: String,
        data: TailoredResume,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    Error {
        message: String,
        error: String,
    },
}

impl AgentResult {
    fn failed(message: &str, err: impl std::fmt::Display) -> Self {
        error!("{message}: {err}");
        AgentResult::Error {
            message: message.to_string(),
            error: err.to_string(),
        }
    }
}

/// Runs the full tailoring pipeline for one upload: extract, rewrite,
/// render, store, track, clean up.
pub struct ResumeAgent {
    llm: Arc<dyn TextGenerator>,
    storage: Arc<dyn BlobStore>,
    config: Config,
}

impl ResumeAgent {
    pub fn new(llm: Arc<dyn TextGenerator>, storage: Arc<dyn BlobStore>, config: Config) -> Self {
        Self {
            llm,
            storage,
            config,
        }
    }

    pub async fn process_resume(
        &self,
        filename: &str,
        bytes: &[u8],
        job_description: &str,
        user_name: &str,
    ) -> AgentResult {
        info!("Processing resume {filename} for user {user_name}");

        let resume_text = match extract_text(filename, bytes) {
            Ok(text) => text,
            Err(e) => return AgentResult::failed("Failed to extract text from resume", e),
        };

        let details = extract_job_details(self.llm.as_ref(), job_description).await;
        let outcome =
            rewrite_resume(self.llm.as_ref(), &resume_text, job_description, &details).await;
        let rewrite = outcome.result;

        let docx = match text_to_docx(&rewrite.rewritten_resume_text) {
            Ok(bytes) => bytes,
            Err(e) => return AgentResult::failed("Failed to generate DOCX file", e),
        };

        let tailored_filename = unique_identifier(
            user_name,
            &details.job_title,
            &details.company_name,
            &timestamp(),
        );
        let tailored_resume_url = match self
            .storage
            .put(
                &self.config.tailored_container,
                &tailored_filename,
                docx,
                DOCX_CONTENT_TYPE,
            )
            .await
        {
            Ok(url) => url,
            Err(e) => return AgentResult::failed("Failed to upload tailored resume", e),
        };
        info!("Tailored resume uploaded to {tailored_resume_url}");

        let entry = TrackingEntry {
            job_title: details.job_title.clone(),
            company: details.company_name.clone(),
            role: details.role.clone(),
            tailored_resume_identifier: tailored_filename.clone(),
            date_modified: rewrite.date_modified.clone(),
        };
        if let Err(e) = append_entry(
            self.storage.as_ref(),
            &self.config.tracking_container,
            &self.config.tracking_file_name,
            &entry,
        )
        .await
        {
            warn!("Failed to update tracking file: {e}");
        }

        if let Err(e) = self
            .storage
            .delete(&self.config.resume_container, filename)
            .await
        {
            warn!("Failed to delete original resume {filename}: {e}");
        }

        let (message, warning) = match outcome.warning {
            None => ("Resume successfully tailored and stored", None),
            Some(w) if outcome.used_fallback => (
                "Resume stored using fallback content",
                Some(format!("Warning: {w}. A fallback resume was generated instead.")),
            ),
            Some(w) => (
                "Resume tailored and stored with warnings",
                Some(format!("Warning: {w}")),
            ),
        };

        AgentResult::Success {
            message: message.to_string(),
            data: TailoredResume {
                tailored_resume_url,
                tailored_resume_filename: tailored_filename,
                job_title: details.job_title,
                company_name: details.company_name,
                role: details.role,
                integration_percentage: rewrite.integration_percentage,
                changes_summary: rewrite.changes_summary,
                highlighted_skills: rewrite.highlighted_skills,
                gap_analysis: rewrite.gap_analysis,
            },
            warning,
        }
    }
}
