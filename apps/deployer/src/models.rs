use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The web app whose settings are being pushed. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.name)
    }
}

/// Provisioning state as reported by the control plane.
///
/// Only `Succeeded` means "ready for configuration changes". Unrecognised
/// strings are kept verbatim so they can still be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
    Succeeded,
    Updating,
    Failed,
    Other(String),
}

impl ProvisioningState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProvisioningState::Succeeded)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProvisioningState::Succeeded => "Succeeded",
            ProvisioningState::Updating => "Updating",
            ProvisioningState::Failed => "Failed",
            ProvisioningState::Other(s) => s,
        }
    }
}

impl From<String> for ProvisioningState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Succeeded" => ProvisioningState::Succeeded,
            "Updating" => ProvisioningState::Updating,
            "Failed" => ProvisioningState::Failed,
            _ => ProvisioningState::Other(value),
        }
    }
}

impl From<&str> for ProvisioningState {
    fn from(value: &str) -> Self {
        ProvisioningState::from(value.to_string())
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingParseError {
    #[error("expected KEY=VALUE, got '{0}'")]
    MissingSeparator(String),

    #[error("setting name cannot be empty in '{0}'")]
    EmptyKey(String),
}

/// A batch of app settings pushed in a single update call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationSet(BTreeMap<String, String>);

impl ConfigurationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a setting. Later values win.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Parses a `KEY=VALUE` pair. Only the first `=` separates, so values may contain `=`.
    pub fn insert_pair(&mut self, pair: &str) -> Result<(), SettingParseError> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| SettingParseError::MissingSeparator(pair.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(SettingParseError::EmptyKey(pair.to_string()));
        }
        self.insert(key, value);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl From<BTreeMap<String, String>> for ConfigurationSet {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigurationSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// How long to wait for the target to report ready before each update attempt.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Bounds for the outer update loop. Fixed delay between attempts, no jitter.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    /// When set, a wait timeout fails the attempt instead of updating anyway.
    pub strict_wait: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay: Duration::from_secs(30),
            strict_wait: false,
        }
    }
}
