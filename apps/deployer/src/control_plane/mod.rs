//! Control plane seam. The updater only talks to this trait; `azure` is the
//! production implementation and tests script their own.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ConfigurationSet, DeploymentTarget, ProvisioningState};

pub mod azure;

pub use azure::{AzureControlPlane, Credentials};

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Read-only query of the target's provisioning state.
    async fn provisioning_state(
        &self,
        target: &DeploymentTarget,
    ) -> Result<ProvisioningState, ControlPlaneError>;

    /// Applies every pair in `settings` in one update call.
    async fn apply_settings(
        &self,
        target: &DeploymentTarget,
        settings: &ConfigurationSet,
    ) -> Result<(), ControlPlaneError>;

    /// Current settings of the target, used to verify an update.
    async fn list_settings(
        &self,
        target: &DeploymentTarget,
    ) -> Result<ConfigurationSet, ControlPlaneError>;
}
