//! Deployment plan types and construction.
//!
//! A plan is the single mutating call the reconciler intends to make, plus
//! what the user is shown before confirming it.

use chrono::{DateTime, Utc};

use crate::manifest::ManifestHasher;
use crate::remote::{Deployment, DeploymentRequest};

use super::diff::ManifestDiff;

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Create a new deployment.
    Create,
    /// Update an existing deployment.
    Update,
    /// Delete a deployment.
    Delete,
}

/// A deployment plan.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Action type.
    pub action: ActionType,
    /// Deployment name.
    pub deployment: String,
    /// Request body for create and update.
    pub request: Option<DeploymentRequest>,
    /// Manifest diff, for updates.
    pub diff: Option<ManifestDiff>,
    /// Digest of the proposed manifest, if any.
    pub manifest_hash: Option<String>,
}

impl DeploymentPlan {
    /// Plans the creation of a deployment.
    #[must_use]
    pub fn create(request: DeploymentRequest) -> Self {
        let manifest_hash = Some(ManifestHasher::new().hash_text(request.content()));
        Self {
            created_at: Utc::now(),
            action: ActionType::Create,
            deployment: request.name.clone(),
            request: Some(request),
            diff: None,
            manifest_hash,
        }
    }

    /// Plans an update of `existing`, carrying its fingerprint.
    #[must_use]
    pub fn update(existing: &Deployment, request: DeploymentRequest, diff: ManifestDiff) -> Self {
        let request = request.with_fingerprint(existing.fingerprint.clone());
        let manifest_hash = Some(ManifestHasher::new().hash_text(request.content()));
        Self {
            created_at: Utc::now(),
            action: ActionType::Update,
            deployment: existing.name.clone(),
            request: Some(request),
            diff: Some(diff),
            manifest_hash,
        }
    }

    /// Plans the deletion of `existing`.
    #[must_use]
    pub fn delete(existing: &Deployment) -> Self {
        Self {
            created_at: Utc::now(),
            action: ActionType::Delete,
            deployment: existing.name.clone(),
            request: None,
            diff: None,
            manifest_hash: None,
        }
    }

    /// The prompt shown before the plan is submitted.
    #[must_use]
    pub fn prompt(&self) -> String {
        match self.action {
            ActionType::Create => format!("Create deployment {}?", self.deployment),
            ActionType::Update => format!("Update deployment {}?", self.deployment),
            ActionType::Delete => format!("Delete deployment {}?", self.deployment),
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for DeploymentPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action, self.deployment)?;
        if let Some(hash) = &self.manifest_hash {
            write!(f, " (manifest {})", ManifestHasher::short_hash(hash))?;
        }
        if let Some(diff) = &self.diff {
            write!(f, ": {}", diff.summary())?;
        }
        Ok(())
    }
}
