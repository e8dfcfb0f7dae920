use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::prompts::job_details_prompt;
use crate::llm_client::prompts::NOT_SPECIFIED;
use crate::llm_client::{generate_json, GenerationConfig, TextGenerator};

lazy_static! {
    static ref TITLE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Job Title|Position|Title):[ \t]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)(?:hiring|seeking|looking for|recruiting) (?:a|an) ([^\n.]+)").unwrap(),
    ];
    static ref COMPANY_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)(?:Company|Organization|Employer):[ \t]*([^\n]+)").unwrap(),
        Regex::new(r"([A-Z][a-zA-Z0-9 &]+) (?i:is seeking)").unwrap(),
        Regex::new(r"(?i:about) ([A-Z][a-zA-Z0-9 &]+)").unwrap(),
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDetails {
    pub job_title: String,
    pub company_name: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
struct JobDetailsReply {
    job_title: Option<String>,
    company_name: Option<String>,
    role: Option<String>,
}

/// Asks the model for title, company and role; falls back to pattern
/// matching when the model is unavailable or replies with garbage.
pub async fn extract_job_details(llm: &dyn TextGenerator, job_description: &str) -> JobDetails {
    let prompt = job_details_prompt(job_description);
    match generate_json::<JobDetailsReply>(llm, &prompt, &GenerationConfig::EXTRACTION).await {
        Ok(reply) => {
            let details = JobDetails {
                job_title: or_not_specified(reply.job_title),
                company_name: or_not_specified(reply.company_name),
                role: or_not_specified(reply.role),
            };
            info!(
                "Job details: {} at {} ({})",
                details.job_title, details.company_name, details.role
            );
            details
        }
        Err(e) => {
            warn!("Job detail extraction failed ({e}), falling back to pattern matching");
            job_details_from_patterns(job_description)
        }
    }
}

pub fn job_details_from_patterns(job_description: &str) -> JobDetails {
    let job_title = first_capture(&TITLE_PATTERNS, job_description);
    let company_name = first_capture(&COMPANY_PATTERNS, job_description);
    let role = job_title
        .as_deref()
        .and_then(|title| title.split_whitespace().next())
        .map(str::to_string);

    JobDetails {
        job_title: or_not_specified(job_title),
        company_name: or_not_specified(company_name),
        role: or_not_specified(role),
    }
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|p| p.captures(text))
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

fn or_not_specified(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string())
}
