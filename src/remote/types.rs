//! Deployment Manager API types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A deployment record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// Deployment name.
    pub name: String,
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optimistic-concurrency token required by updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// URL of the current manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    /// Pending update, if one is in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<DeploymentUpdate>,
    /// Last operation run on the deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

/// Pending update of a deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentUpdate {
    /// URL of the manifest the update will apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

impl Deployment {
    /// The manifest URL: the current one, or the pending update's.
    #[must_use]
    pub fn manifest_url(&self) -> Option<&str> {
        self.manifest
            .as_deref()
            .or_else(|| self.update.as_ref().and_then(|u| u.manifest.as_deref()))
    }

    /// The manifest name, the last segment of [`Deployment::manifest_url`].
    #[must_use]
    pub fn manifest_name(&self) -> Option<&str> {
        self.manifest_url()
            .and_then(|url| url.rsplit('/').next())
            .filter(|name| !name.is_empty())
    }
}

/// A stored manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestRecord {
    /// Manifest name.
    #[serde(default)]
    pub name: String,
    /// The configuration the manifest was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigFile>,
    /// Fully expanded configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expanded_config: Option<String>,
}

impl ManifestRecord {
    /// The manifest's configuration text.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.config.as_ref().map(|config| config.content.as_str())
    }
}

/// Inline configuration text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// The manifest text.
    pub content: String,
}

/// Target of a create or update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfiguration {
    /// Configuration to deploy.
    pub config: ConfigFile,
}

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRequest {
    /// Deployment name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fingerprint of the deployment being updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// Configuration to deploy.
    pub target: TargetConfiguration,
}

impl DeploymentRequest {
    /// Creates a request deploying `content` under `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            fingerprint: None,
            target: TargetConfiguration {
                config: ConfigFile {
                    content: content.into(),
                },
            },
        }
    }

    /// Sets the fingerprint carried by updates.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// The manifest text being deployed.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.target.config.content
    }
}

/// Status of an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    /// Queued.
    Pending,
    /// In progress.
    Running,
    /// Finished, successfully or not.
    Done,
    /// Any other status string.
    #[default]
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    /// Only `DONE` is terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Done => write!(f, "DONE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// An asynchronous operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Operation name.
    pub name: String,
    /// Current status.
    #[serde(default)]
    pub status: OperationStatus,
    /// Operation type, e.g. `insert`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    /// URL of the deployment the operation acts on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_link: Option<String>,
    /// Progress percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    /// Embedded errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationErrors>,
    /// Warnings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<OperationWarning>,
}

/// Embedded errors of an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrors {
    /// Errors in the order reported.
    #[serde(default)]
    pub errors: Vec<OperationErrorItem>,
}

/// One embedded error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrorItem {
    /// Error code.
    #[serde(default)]
    pub code: String,
    /// Where the error occurred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Message.
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for OperationErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " ({location})")?;
        }
        Ok(())
    }
}

/// One warning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationWarning {
    /// Warning code.
    #[serde(default)]
    pub code: String,
    /// Message.
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for OperationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Operation {
    /// Returns true once the operation is `DONE`.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.status.is_terminal()
    }

    /// Embedded errors rendered as strings.
    #[must_use]
    pub fn error_messages(&self) -> Vec<String> {
        self.error
            .iter()
            .flat_map(|e| e.errors.iter())
            .map(ToString::to_string)
            .collect()
    }

    /// Returns true if the operation reported any error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error.as_ref().is_some_and(|e| !e.errors.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_name_falls_back_to_update() {
        let current: Deployment = serde_json::from_str(
            r#"{"name": "dev-networks", "fingerprint": "abc=",
                "manifest": "https://www.googleapis.com/deploymentmanager/v2/projects/p/global/deployments/dev-networks/manifests/manifest-1"}"#,
        )
        .unwrap();
        assert_eq!(current.manifest_name(), Some("manifest-1"));

        let pending: Deployment = serde_json::from_str(
            r#"{"name": "dev-networks", "update": {"manifest": "projects/p/global/deployments/dev-networks/manifests/manifest-2"}}"#,
        )
        .unwrap();
        assert_eq!(pending.manifest_name(), Some("manifest-2"));

        let bare = Deployment {
            name: String::from("x"),
            ..Deployment::default()
        };
        assert_eq!(bare.manifest_name(), None);
    }

    #[test]
    fn test_operation_parsing() {
        let op: Operation = serde_json::from_str(
            r#"{"name": "operation-1", "status": "DONE", "progress": 100,
                "targetLink": "https://example/deployments/dev-networks",
                "error": {"errors": [{"code": "RESOURCE_ERROR", "location": "/deployments/dev-networks", "message": "boom"}]},
                "warnings": [{"code": "DEPRECATED", "message": "old"}]}"#,
        )
        .unwrap();
        assert!(op.is_done());
        assert!(op.has_errors());
        assert_eq!(
            op.error_messages(),
            vec![String::from("RESOURCE_ERROR: boom (/deployments/dev-networks)")]
        );
        assert_eq!(op.warnings[0].to_string(), "DEPRECATED: old");
    }

    #[test]
    fn test_unknown_status_is_not_terminal() {
        let op: Operation = serde_json::from_str(r#"{"name": "operation-1", "status": "CANCELLING"}"#).unwrap();
        assert_eq!(op.status, OperationStatus::Unknown);
        assert!(!op.is_done());
    }

    #[test]
    fn test_request_body_shape() {
        let request = DeploymentRequest::new("dev-networks", "project: p, name: dev-networks", "resources: []\n")
            .with_fingerprint(Some(String::from("abc=")));
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["target"]["config"]["content"], "resources: []\n");
        assert_eq!(body["fingerprint"], "abc=");
        assert_eq!(body["description"], "project: p, name: dev-networks");
    }
}
