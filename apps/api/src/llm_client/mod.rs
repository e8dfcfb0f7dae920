//! LLM client: the single point of entry for all Gemini API calls.
//!
//! No other module may call the Gemini API directly. Handlers and services
//! depend on the `TextGenerator` trait so tests can script responses.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod prompts;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<u64>,
    },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("LLM response contained no JSON object")]
    NoJson,
}

impl LlmError {
    /// Quota and rate-limit failures get a dedicated user-facing message.
    pub fn is_quota(&self) -> bool {
        match self {
            LlmError::Api { status: 429, .. } => true,
            LlmError::Api { message, .. } => {
                let message = message.to_lowercase();
                message.contains("quota")
                    || message.contains("rate limit")
                    || message.contains("exceeded")
            }
            _ => false,
        }
    }

    /// Transport-level failures worth resending the same request for.
    /// Unusable replies are left to the callers that parse them.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Http(_) => true,
            _ => false,
        }
    }

    /// The call went through but the reply was unusable.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            LlmError::Parse(_) | LlmError::EmptyContent | LlmError::NoJson
        )
    }

    fn retry_delay(&self) -> Duration {
        match self {
            LlmError::Api {
                retry_after: Some(secs),
                ..
            } => Duration::from_secs(*secs),
            _ => RETRY_DELAY,
        }
    }
}

/// Sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Low temperature, long output: résumé analysis.
    pub const ANALYSIS: GenerationConfig = GenerationConfig {
        temperature: 0.2,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 8192,
    };

    /// Résumé rewriting; needs room for two pages of text.
    pub const REWRITE: GenerationConfig = GenerationConfig {
        temperature: 0.5,
        top_k: 40,
        top_p: 0.8,
        max_output_tokens: 8192,
    };

    /// Short structured extraction (job title, company, role).
    pub const EXTRACTION: GenerationConfig = GenerationConfig {
        temperature: 0.1,
        top_k: 40,
        top_p: 0.95,
        max_output_tokens: 1024,
    };
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Concatenates every text part of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// Anything that turns a prompt into text. `LlmClient` is the production
/// implementation; tests provide scripted ones.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, LlmError>;
}

/// Gemini `generateContent` client with retry on 429, 5xx and transport errors.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model_id: String,
    api_version: String,
}

impl LlmClient {
    pub fn new(api_key: String, model_id: String, api_version: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            model_id,
            api_version,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    fn endpoint(&self) -> String {
        format!(
            "{GEMINI_BASE_URL}/{}/models/{}:generateContent",
            self.api_version, self.model_id
        )
    }

    async fn send_once(&self, prompt: &str, config: &GenerationConfig) -> Result<String, LlmError> {
        let request_body = build_request(prompt, config);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
                retry_after,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }

        debug!("Gemini call succeeded: {} characters", text.len());
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, LlmError> {
        info!(
            "Sending request to Gemini (model: {}, prompt: {} chars)",
            self.model_id,
            prompt.len()
        );
        with_retries(LlmError::is_retryable, move || self.send_once(prompt, config)).await
    }
}

/// Calls the generator and deserializes the JSON object embedded in its reply.
/// Only unusable replies are retried here; transport failures were already
/// retried by the generator.
pub async fn generate_json<T: DeserializeOwned>(
    llm: &dyn TextGenerator,
    prompt: &str,
    config: &GenerationConfig,
) -> Result<T, LlmError> {
    with_retries(LlmError::is_malformed, move || async move {
        let text = llm.generate(prompt, config).await?;
        parse_json_object(&text)
    })
    .await
}

async fn with_retries<T, F, Fut>(should_retry: fn(&LlmError) -> bool, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_RETRIES && should_retry(&e) => {
                let delay = e.retry_delay();
                warn!(
                    "LLM attempt {attempt}/{MAX_RETRIES} failed ({e}), retrying after {}s...",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn build_request<'a>(prompt: &'a str, config: &GenerationConfig) -> GenerateRequest<'a> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config: *config,
        safety_settings: SAFETY_CATEGORIES
            .iter()
            .map(|&category| SafetySetting {
                category,
                threshold: "BLOCK_MEDIUM_AND_ABOVE",
            })
            .collect(),
    }
}

/// Returns the span from the first `{` to the last `}`. Models often wrap
/// JSON in prose or code fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    let json = extract_json_object(text).ok_or(LlmError::NoJson)?;
    Ok(serde_json::from_str(json)?)
}


#[cfg(test)]
mod tests {
    use super::testing::{api_error, RetryingLlm, ScriptedLlm};
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_extract_json_object_from_fenced_reply() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json_object(input), Some("{\"key\": \"value\"}"));
    }

    #[test]
    fn test_extract_json_object_with_surrounding_prose() {
        let input = "Here you go: {\"a\": {\"b\": 1}} Hope this helps!";
        assert_eq!(extract_json_object(input), Some("{\"a\": {\"b\": 1}}"));
    }

    #[test]
    fn test_extract_json_object_none_without_braces() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_response_text_concatenates_parts() {
        let json = r#"{"candidates": [{"content": {"parts": [{"text": "Hello, "}, {"text": "world"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "Hello, world");
    }

    #[test]
    fn test_response_text_empty_without_candidates() {
        let response: GenerateResponse = serde_json::from_str(r#"{"promptFeedback": {}}"#).unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(build_request("hi", &GenerationConfig::ANALYSIS)).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn test_is_quota_detection() {
        assert!(api_error(429, "Too Many Requests").is_quota());
        assert!(api_error(403, "Quota exceeded for project").is_quota());
        assert!(!api_error(400, "Invalid argument").is_quota());
        assert!(!LlmError::EmptyContent.is_quota());
    }

    #[test]
    fn test_retry_after_header_drives_delay() {
        let err = LlmError::Api {
            status: 429,
            message: String::new(),
            retry_after: Some(12),
        };
        assert_eq!(err.retry_delay(), Duration::from_secs(12));
        assert_eq!(LlmError::EmptyContent.retry_delay(), RETRY_DELAY);
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        assert!(!api_error(400, "bad").is_retryable());
        assert!(api_error(429, "slow down").is_retryable());
        assert!(api_error(503, "unavailable").is_retryable());
        assert!(!LlmError::NoJson.is_retryable());
        assert!(!LlmError::EmptyContent.is_retryable());
        assert!(LlmError::EmptyContent.is_malformed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_json_retries_unparseable_reply() {
        let llm = ScriptedLlm::replying(&["I cannot do that", r#"{"ok": true}"#]);
        let value: Value = generate_json(&llm, "prompt", &GenerationConfig::EXTRACTION)
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(llm.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_json_gives_up_after_max_retries() {
        let llm = ScriptedLlm::replying(&["nope", "still nope", "never"]);
        let result: Result<Value, _> =
            generate_json(&llm, "prompt", &GenerationConfig::EXTRACTION).await;
        assert!(matches!(result, Err(LlmError::NoJson)));
        assert_eq!(llm.calls(), 3);
    }

    #[tokio::test]
    async fn test_generate_json_leaves_transport_retries_to_generator() {
        let llm = ScriptedLlm::new(vec![Err(api_error(503, "unavailable"))]);
        let result: Result<Value, _> =
            generate_json(&llm, "prompt", &GenerationConfig::EXTRACTION).await;
        assert!(matches!(result, Err(LlmError::Api { status: 503, .. })));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_json_stops_on_client_error() {
        let llm = ScriptedLlm::new(vec![Err(api_error(400, "API key not valid"))]);
        let result: Result<Value, _> =
            generate_json(&llm, "prompt", &GenerationConfig::EXTRACTION).await;
        assert!(matches!(result, Err(LlmError::Api { status: 400, .. })));
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_replies_are_reasked_once_per_attempt() {
        let llm = RetryingLlm(ScriptedLlm::new(vec![
            Err(LlmError::EmptyContent),
            Err(LlmError::EmptyContent),
            Err(LlmError::EmptyContent),
        ]));
        let result: Result<Value, _> =
            generate_json(&llm, "prompt", &GenerationConfig::EXTRACTION).await;
        assert!(matches!(result, Err(LlmError::EmptyContent)));
        assert_eq!(llm.0.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_outage_is_sent_max_retries_times() {
        let llm = RetryingLlm(ScriptedLlm::default());
        let result: Result<Value, _> =
            generate_json(&llm, "prompt", &GenerationConfig::EXTRACTION).await;
        assert!(matches!(result, Err(LlmError::Api { status: 503, .. })));
        assert_eq!(llm.0.calls(), MAX_RETRIES as usize);
    }
}
