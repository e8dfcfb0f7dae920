use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model_id: String,
    pub gemini_api_version: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub resume_container: String,
    pub tailored_container: String,
    pub tracking_container: String,
    pub tracking_file_name: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model_id: env_or("GEMINI_MODEL_ID", "gemini-1.5-pro"),
            gemini_api_version: env_or("GEMINI_API_VERSION", "v1beta"),
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            resume_container: env_or("RESUME_CONTAINER_NAME", "resume"),
            tailored_container: env_or("TAILORED_RESUME_CONTAINER_NAME", "tailoredresumecontainer"),
            tracking_container: env_or("TRACKING_CONTAINER_NAME", "trackingcontainer"),
            tracking_file_name: env_or("TRACKING_FILE_NAME", "resume_tracking.csv"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }

    /// Every container the app writes to, in creation order.
    pub fn containers(&self) -> [&str; 3] {
        [
            &self.resume_container,
            &self.tailored_container,
            &self.tracking_container,
        ]
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        gemini_api_key: "test-key".to_string(),
        gemini_model_id: "gemini-1.5-pro".to_string(),
        gemini_api_version: "v1beta".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "minio".to_string(),
        aws_secret_access_key: "minio-secret".to_string(),
        resume_container: "resume".to_string(),
        tailored_container: "tailoredresumecontainer".to_string(),
        tracking_container: "trackingcontainer".to_string(),
        tracking_file_name: "resume_tracking.csv".to_string(),
        port: 8000,
        rust_log: "info".to_string(),
    }
}
