//! Azure Resource Manager binding for App Service sites.
//!
//! The appsettings PUT replaces the whole collection, so `apply_settings`
//! lists the current values and merges before writing. From the caller's
//! side that is still a single update.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::OnceCell;
use tracing::debug;

use super::{ControlPlane, ControlPlaneError};
use crate::models::{ConfigurationSet, DeploymentTarget, ProvisioningState};

const ARM_BASE_URL: &str = "https://management.azure.com";
const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const ARM_SCOPE: &str = "https://management.azure.com/.default";
const WEB_API_VERSION: &str = "2022-03-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// How the updater authenticates against ARM.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A pre-issued bearer token (e.g. from `az account get-access-token`).
    AccessToken(String),
    /// Service principal, exchanged for a token on first use.
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
}

#[derive(Debug, Deserialize)]
struct SiteResource {
    properties: SiteProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteProperties {
    provisioning_state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AppSettingsResource {
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ArmError {
    error: ArmErrorBody,
}

#[derive(Debug, Deserialize)]
struct ArmErrorBody {
    message: String,
}

pub struct AzureControlPlane {
    client: Client,
    credentials: Credentials,
    token: OnceCell<String>,
}

impl AzureControlPlane {
    pub fn new(credentials: Credentials) -> Result<Self, ControlPlaneError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            credentials,
            token: OnceCell::new(),
        })
    }

    async fn bearer_token(&self) -> Result<&str, ControlPlaneError> {
        let token = self
            .token
            .get_or_try_init(|| async {
                match &self.credentials {
                    Credentials::AccessToken(token) => Ok(token.clone()),
                    Credentials::ClientSecret {
                        tenant_id,
                        client_id,
                        client_secret,
                    } => self.request_token(tenant_id, client_id, client_secret).await,
                }
            })
            .await?;
        Ok(token.as_str())
    }

    async fn request_token(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, ControlPlaneError> {
        debug!("Requesting ARM token for client {client_id}");
        let response = self
            .client
            .post(token_url(tenant_id))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("scope", ARM_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ControlPlaneError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ControlPlaneError> {
        let token = self.bearer_token().await?;
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ArmError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(ControlPlaneError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch_settings(
        &self,
        target: &DeploymentTarget,
    ) -> Result<BTreeMap<String, String>, ControlPlaneError> {
        let url = format!("{}/list", settings_url(target));
        let response = self
            .send(
                self.client
                    .post(url)
                    .query(&[("api-version", WEB_API_VERSION)])
                    .header("content-length", "0"),
            )
            .await?;
        let resource: AppSettingsResource = response.json().await?;
        Ok(resource.properties)
    }
}

#[async_trait]
impl ControlPlane for AzureControlPlane {
    async fn provisioning_state(
        &self,
        target: &DeploymentTarget,
    ) -> Result<ProvisioningState, ControlPlaneError> {
        let response = self
            .send(
                self.client
                    .get(site_url(target))
                    .query(&[("api-version", WEB_API_VERSION)]),
            )
            .await?;
        let site: SiteResource = response.json().await?;
        site.properties
            .provisioning_state
            .map(ProvisioningState::from)
            .ok_or_else(|| {
                ControlPlaneError::UnexpectedResponse(format!(
                    "site {target} reported no provisioning state"
                ))
            })
    }

    async fn apply_settings(
        &self,
        target: &DeploymentTarget,
        settings: &ConfigurationSet,
    ) -> Result<(), ControlPlaneError> {
        let mut merged = self.fetch_settings(target).await?;
        merged.extend(
            settings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );

        let body = AppSettingsResource { properties: merged };
        self.send(
            self.client
                .put(settings_url(target))
                .query(&[("api-version", WEB_API_VERSION)])
                .json(&body),
        )
        .await?;
        Ok(())
    }

    async fn list_settings(
        &self,
        target: &DeploymentTarget,
    ) -> Result<ConfigurationSet, ControlPlaneError> {
        Ok(ConfigurationSet::from(self.fetch_settings(target).await?))
    }
}

fn site_url(target: &DeploymentTarget) -> String {
    format!(
        "{ARM_BASE_URL}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}",
        target.subscription_id, target.resource_group, target.name
    )
}

fn settings_url(target: &DeploymentTarget) -> String {
    format!("{}/config/appsettings", site_url(target))
}

fn token_url(tenant_id: &str) -> String {
    format!("{LOGIN_BASE_URL}/{tenant_id}/oauth2/v2.0/token")
}
