mod config;
mod control_plane;
mod models;
mod updater;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{credentials_from_env, Cli};
use crate::control_plane::AzureControlPlane;
use crate::updater::{exit_status, update_with_retry};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // load .env if present; ignore if missing

    let cli = Cli::parse();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let target = cli.target();
    let settings = cli.configuration_set(|name| std::env::var(name).ok())?;
    let plane = AzureControlPlane::new(credentials_from_env()?)?;

    info!(
        "Updating {} settings on {target}: {}",
        settings.len(),
        settings.keys().collect::<Vec<_>>().join(", ")
    );

    let result = update_with_retry(
        &plane,
        &target,
        &settings,
        &cli.retry_policy(),
        &cli.wait_policy(),
    )
    .await;

    match &result {
        Ok(report) => info!(
            "Environment variables updated successfully on attempt {}",
            report.attempts
        ),
        Err(e) => error!("Environment variable update failed: {e}"),
    }

    Ok(ExitCode::from(exit_status(&result)))
}
