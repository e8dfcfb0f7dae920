use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::job_details::JobDetails;
use super::prompts::rewrite_prompt;
use crate::llm_client::prompts::NOT_SPECIFIED;
use crate::llm_client::{parse_json_object, GenerationConfig, LlmError, TextGenerator};

pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(10);
/// Roughly what it takes to fill two pages.
pub const MIN_RESUME_CHARS: usize = 4000;
const DEFAULT_INTEGRATION: &str = "80-95%";

const INSUFFICIENT_CONTENT: &str =
    "Generated resume content insufficient to fill two pages. Please try again.";
const QUOTA_MESSAGE: &str = "The resume rewriting service is temporarily unavailable due to high demand or quota limits. Please try again in a few minutes.";

#[derive(Debug, Deserialize)]
struct RewriteReply {
    #[serde(default)]
    rewritten_resume_text: String,
    #[serde(default)]
    changes_summary: Vec<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    integration_percentage: Option<String>,
    #[serde(default)]
    highlighted_skills: Vec<String>,
    #[serde(default)]
    gap_analysis: Vec<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(format!("{n}%")),
        _ => None,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RewriteResult {
    pub rewritten_resume_text: String,
    pub changes_summary: Vec<String>,
    pub integration_percentage: String,
    pub highlighted_skills: Vec<String>,
    pub gap_analysis: Vec<String>,
    pub date_modified: String,
}

impl From<RewriteReply> for RewriteResult {
    fn from(reply: RewriteReply) -> Self {
        RewriteResult {
            rewritten_resume_text: reply.rewritten_resume_text,
            changes_summary: reply.changes_summary,
            integration_percentage: reply
                .integration_percentage
                .unwrap_or_else(|| DEFAULT_INTEGRATION.to_string()),
            highlighted_skills: reply.highlighted_skills,
            gap_analysis: reply.gap_analysis,
            date_modified: date_modified(),
        }
    }
}

/// A usable résumé is always produced. `warning` is set when it is short or
/// is the fallback built from the original text.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub result: RewriteResult,
    pub warning: Option<String>,
    /// `result` came from [`RewriteResult::fallback`], not from the model.
    pub used_fallback: bool,
}

pub async fn rewrite_resume(
    llm: &dyn TextGenerator,
    resume_text: &str,
    job_description: &str,
    details: &JobDetails,
) -> RewriteOutcome {
    let prompt = rewrite_prompt(resume_text, job_description);
    let mut last_error: Option<LlmError> = None;

    for attempt in 1..=MAX_ATTEMPTS {
        info!("Requesting resume rewrite (attempt {attempt}/{MAX_ATTEMPTS})");
        match request_rewrite(llm, &prompt).await {
            Ok(reply) => {
                let chars = reply.rewritten_resume_text.chars().count();
                if chars >= MIN_RESUME_CHARS {
                    info!("Rewrite accepted: {chars} characters");
                    return RewriteOutcome {
                        result: reply.into(),
                        warning: None,
                        used_fallback: false,
                    };
                }
                warn!("Generated resume too short ({chars} chars, need {MIN_RESUME_CHARS})");
                if attempt == MAX_ATTEMPTS && chars > 0 {
                    return RewriteOutcome {
                        result: reply.into(),
                        warning: Some(INSUFFICIENT_CONTENT.to_string()),
                        used_fallback: false,
                    };
                }
                last_error = None;
            }
            Err(e) if e.is_malformed() => {
                warn!("Resume rewrite attempt {attempt}/{MAX_ATTEMPTS} unusable: {e}");
                last_error = Some(e);
            }
            // The generator has already retried transport failures.
            Err(e) => {
                error!("Resume rewrite failed: {e}");
                last_error = Some(e);
                break;
            }
        }
        if attempt < MAX_ATTEMPTS {
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }

    let warning = match last_error {
        Some(e) if e.is_quota() => QUOTA_MESSAGE.to_string(),
        Some(e) => e.to_string(),
        None => INSUFFICIENT_CONTENT.to_string(),
    };
    error!("Falling back to a resume built from the original text: {warning}");
    RewriteOutcome {
        result: RewriteResult::fallback(resume_text, details),
        warning: Some(warning),
        used_fallback: true,
    }
}

async fn request_rewrite(llm: &dyn TextGenerator, prompt: &str) -> Result<RewriteReply, LlmError> {
    let text = llm.generate(prompt, &GenerationConfig::REWRITE).await?;
    parse_json_object(&text)
}

impl RewriteResult {
    /// Lays the original résumé out in marker format without model help.
    pub fn fallback(resume_text: &str, details: &JobDetails) -> Self {
        RewriteResult {
            rewritten_resume_text: fallback_resume(resume_text, details),
            changes_summary: vec![
                "The rewriting service was unavailable; the original content was reformatted without changes."
                    .to_string(),
            ],
            integration_percentage: "0%".to_string(),
            highlighted_skills: Vec::new(),
            gap_analysis: Vec::new(),
            date_modified: date_modified(),
        }
    }
}

pub fn fallback_resume(resume_text: &str, details: &JobDetails) -> String {
    let mut lines = resume_text.lines().map(str::trim).filter(|l| !l.is_empty());
    let name = lines.next().unwrap_or("Your Name");

    let target = match (
        details.job_title.as_str(),
        details.company_name.as_str(),
    ) {
        (NOT_SPECIFIED, _) => "the advertised position".to_string(),
        (title, NOT_SPECIFIED) => title.to_string(),
        (title, company) => format!("{title} at {company}"),
    };

    let mut out = vec![
        format!("[NAME] {name}"),
        format!("[SUMMARY] Resume prepared for {target}."),
        "[SECTION_HEADER] Professional Experience".to_string(),
    ];
    out.extend(lines.map(|line| {
        match line.strip_prefix(['-', '*', '•']) {
            Some(bullet) => format!("[BULLET] {}", bullet.trim()),
            None => line.to_string(),
        }
    }));
    out.join("\n")
}

/// `Resume_{name}_{job}_{company}_{timestamp}.docx`
pub fn unique_identifier(name: &str, job_title: &str, company: &str, timestamp: &str) -> String {
    format!(
        "Resume_{}_{}_{}_{timestamp}.docx",
        sanitize(name),
        sanitize(job_title),
        sanitize(company)
    )
}

fn sanitize(text: &str) -> String {
    let kept: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '-'))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("_")
}

fn date_modified() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{api_error, RetryingLlm, ScriptedLlm};
    use serde_json::json;

    fn details() -> JobDetails {
        JobDetails {
            job_title: "Staff Engineer".to_string(),
            company_name: "Acme".to_string(),
            role: "Staff".to_string(),
        }
    }

    fn reply(chars: usize) -> String {
        json!({
            "rewritten_resume_text": "x".repeat(chars),
            "changes_summary": ["Expanded bullets"],
            "integration_percentage": 85,
            "highlighted_skills": ["Rust"],
            "gap_analysis": []
        })
        .to_string()
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepts_long_enough_rewrite() {
        let llm = ScriptedLlm::new(vec![Ok(reply(MIN_RESUME_CHARS))]);
        let outcome = rewrite_resume(&llm, "Jane", "jd", &details()).await;
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.result.integration_percentage, "85%");
        assert_eq!(outcome.result.changes_summary, vec!["Expanded bullets"]);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_rewrite_is_retried_then_returned_with_warning() {
        let llm = ScriptedLlm::new(vec![Ok(reply(100)), Ok(reply(200)), Ok(reply(300))]);
        let started = tokio::time::Instant::now();
        let outcome = rewrite_resume(&llm, "Jane", "jd", &details()).await;

        assert_eq!(llm.calls(), 3);
        assert_eq!(outcome.result.rewritten_resume_text.len(), 300);
        assert_eq!(outcome.warning.as_deref(), Some(INSUFFICIENT_CONTENT));
        assert!(!outcome.used_fallback);
        assert!(started.elapsed() >= RETRY_DELAY * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_bad_reply() {
        let llm = ScriptedLlm::new(vec![Ok("not json".to_string()), Ok(reply(5000))]);
        let outcome = rewrite_resume(&llm, "Jane", "jd", &details()).await;
        assert!(outcome.warning.is_none());
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_failure_yields_fallback() {
        let llm = ScriptedLlm::new(vec![Err(api_error(429, "quota exceeded"))]);
        let outcome = rewrite_resume(&llm, "Jane Doe\n- Built things", "jd", &details()).await;
        assert_eq!(llm.calls(), 1);
        assert!(outcome.used_fallback);
        assert_eq!(outcome.warning.as_deref(), Some(QUOTA_MESSAGE));
        assert!(outcome.result.rewritten_resume_text.starts_with("[NAME] Jane Doe"));
        assert_eq!(outcome.result.integration_percentage, "0%");
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_is_not_retried_on_top_of_the_client() {
        let llm = RetryingLlm(ScriptedLlm::default());
        let outcome = rewrite_resume(&llm, "Jane Doe", "jd", &details()).await;
        assert_eq!(llm.0.calls(), 3);
        assert!(outcome.used_fallback);
        assert!(outcome.warning.unwrap().contains("script exhausted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unparseable_replies_exhaust_into_fallback() {
        let llm = ScriptedLlm::replying(&["nope", "no", "never"]);
        let outcome = rewrite_resume(&llm, "Jane Doe", "jd", &details()).await;
        assert_eq!(llm.calls(), 3);
        assert!(outcome.used_fallback);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let llm = ScriptedLlm::new(vec![Err(api_error(400, "API key not valid"))]);
        let outcome = rewrite_resume(&llm, "Jane", "jd", &details()).await;
        assert_eq!(llm.calls(), 1);
        assert!(outcome.used_fallback);
        assert!(outcome.warning.unwrap().contains("API key not valid"));
    }

    #[test]
    fn test_fallback_resume_layout() {
        let text = fallback_resume("  Jane Doe \n\nEngineer at Acme\n- Shipped v2\n• Led team", &details());
        assert_eq!(
            text,
            "[NAME] Jane Doe\n\
             [SUMMARY] Resume prepared for Staff Engineer at Acme.\n\
             [SECTION_HEADER] Professional Experience\n\
             Engineer at Acme\n\
             [BULLET] Shipped v2\n\
             [BULLET] Led team"
        );
    }

    #[test]
    fn test_fallback_resume_without_details() {
        let details = JobDetails {
            job_title: NOT_SPECIFIED.to_string(),
            company_name: NOT_SPECIFIED.to_string(),
            role: NOT_SPECIFIED.to_string(),
        };
        let text = fallback_resume("", &details);
        assert!(text.starts_with("[NAME] Your Name\n[SUMMARY] Resume prepared for the advertised position."));
    }

    #[test]
    fn test_unique_identifier_sanitizes_parts() {
        assert_eq!(
            unique_identifier("Jane O'Neil", "Sr. Engineer (Rust)", " Acme, Inc. ", "20240501103000"),
            "Resume_Jane_ONeil_Sr_Engineer_Rust_Acme_Inc_20240501103000.docx"
        );
    }
}
