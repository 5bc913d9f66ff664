//! Client settings.
//!
//! Settings come from an optional `stratosphere.yaml`; every field has a
//! default so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::manifest::ManifestFormat;
use crate::remote::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};

/// Default seconds between operation polls.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Settings of the provisioning client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Provisioning project id.
    pub project: Option<String>,
    /// Environment name, the deployment name prefix.
    pub environment: Option<String>,
    /// Manifest format.
    pub format: Option<ManifestFormat>,
    /// API endpoint settings.
    pub api: ApiSettings,
    /// Operation polling settings.
    pub poll: PollSettings,
}

/// API endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ApiSettings {
    /// Base URL of the Deployment Manager API.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Operation polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollSettings {
    /// Seconds between polls.
    pub interval_secs: u64,
    /// Give up after this many seconds; unset polls forever.
    pub timeout_secs: Option<u64>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_API_URL),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            timeout_secs: None,
        }
    }
}

impl Settings {
    /// The project id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if no project was supplied.
    pub fn require_project(&self) -> Result<&str> {
        self.project.as_deref().filter(|p| !p.is_empty()).ok_or_else(|| {
            ConfigError::MissingSetting {
                name: String::from("project"),
                env: String::from("STRATOSPHERE_PROJECT"),
            }
            .into()
        })
    }

    /// The environment name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSetting`] if no environment was supplied.
    pub fn require_environment(&self) -> Result<&str> {
        self.environment.as_deref().filter(|e| !e.is_empty()).ok_or_else(|| {
            ConfigError::MissingSetting {
                name: String::from("env"),
                env: String::from("STRATOSPHERE_ENV"),
            }
            .into()
        })
    }

    /// Manifest format, YAML unless configured.
    #[must_use]
    pub fn format(&self) -> ManifestFormat {
        self.format.unwrap_or_default()
    }

    /// Interval between operation polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_secs)
    }

    /// Polling deadline, if any.
    #[must_use]
    pub fn poll_deadline(&self) -> Option<Duration> {
        self.poll.timeout_secs.map(Duration::from_secs)
    }
}
