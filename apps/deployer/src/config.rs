use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::control_plane::Credentials;
use crate::models::{ConfigurationSet, DeploymentTarget, RetryPolicy, WaitPolicy};

/// Push app settings to an Azure web app, waiting for it to be ready and
/// retrying on failure.
#[derive(Debug, Parser)]
#[command(name = "deployer", version)]
pub struct Cli {
    /// Azure subscription id
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription: String,

    /// Resource group containing the web app
    #[arg(long, env = "RESOURCE_GROUP")]
    pub resource_group: String,

    /// Web app name
    #[arg(long, env = "WEBAPP_NAME")]
    pub name: String,

    /// Setting to apply, as KEY=VALUE (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub settings: Vec<String>,

    /// Setting whose value is read from this process's environment (repeatable)
    #[arg(long = "from-env", value_name = "NAME")]
    pub from_env: Vec<String>,

    #[arg(long, env = "DEPLOY_MAX_ATTEMPTS", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,

    #[arg(long, env = "DEPLOY_RETRY_DELAY_SECS", default_value_t = 30)]
    pub retry_delay_secs: u64,

    #[arg(long, env = "DEPLOY_WAIT_TIMEOUT_SECS", default_value_t = 300)]
    pub wait_timeout_secs: u64,

    #[arg(long, env = "DEPLOY_POLL_INTERVAL_SECS", default_value_t = 10)]
    pub poll_interval_secs: u64,

    /// Fail the attempt when the app is not ready in time instead of updating anyway
    #[arg(long)]
    pub strict_wait: bool,
}

impl Cli {
    pub fn target(&self) -> DeploymentTarget {
        DeploymentTarget {
            subscription_id: self.subscription.clone(),
            resource_group: self.resource_group.clone(),
            name: self.name.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            strict_wait: self.strict_wait,
        }
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_secs(self.wait_timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
        }
    }

    /// Builds the settings batch. `lookup` resolves `--from-env` names.
    pub fn configuration_set<F>(&self, lookup: F) -> Result<ConfigurationSet>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut set = ConfigurationSet::new();
        for pair in &self.settings {
            set.insert_pair(pair)?;
        }
        for name in &self.from_env {
            let value = lookup(name)
                .with_context(|| format!("--from-env {name}: variable is not set"))?;
            set.insert(name.as_str(), value);
        }
        if set.is_empty() {
            bail!("nothing to apply: pass at least one --set or --from-env");
        }
        Ok(set)
    }
}

/// Reads ARM credentials from the environment. A ready-made token wins over
/// a service principal.
pub fn credentials_from_env() -> Result<Credentials> {
    if let Ok(token) = std::env::var("AZURE_ACCESS_TOKEN") {
        return Ok(Credentials::AccessToken(token));
    }

    Ok(Credentials::ClientSecret {
        tenant_id: require_env("AZURE_TENANT_ID")?,
        client_id: require_env("AZURE_CLIENT_ID")?,
        client_secret: require_env("AZURE_CLIENT_SECRET")?,
    })
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| {
        format!("Required environment variable '{key}' is not set (or set AZURE_ACCESS_TOKEN)")
    })
}
