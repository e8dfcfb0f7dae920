pub mod handlers;
pub mod prompts;
pub mod recommendations;

use serde_json::Value;
use tracing::{error, info};

use crate::llm_client::{generate_json, GenerationConfig, TextGenerator};
use recommendations::Recommendations;

/// Scores a résumé against a job description. Never fails: a model failure
/// yields the fallback recommendations with `error` set.
pub async fn analyze_resume(
    llm: &dyn TextGenerator,
    resume_text: &str,
    job_description: &str,
) -> Recommendations {
    let prompt = prompts::analysis_prompt(resume_text, job_description);
    match generate_json::<Value>(llm, &prompt, &GenerationConfig::ANALYSIS).await {
        Ok(reply) => {
            let recommendations = Recommendations::normalize(reply);
            info!(
                "Analysis complete: {} matching, {} missing skills",
                recommendations.matching_skills.len(),
                recommendations.missing_skills.len()
            );
            recommendations
        }
        Err(e) => {
            error!("Resume analysis failed: {e}");
            Recommendations::unavailable(&e)
        }
    }
}
