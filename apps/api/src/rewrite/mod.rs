//! Résumé tailoring: job detail extraction, model rewrite with length checks,
//! and the agent that turns the result into a stored, tracked `.docx`.

pub mod agent;
pub mod handlers;
pub mod job_details;
pub mod prompts;
pub mod rewriter;
