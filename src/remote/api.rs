//! The remote provisioning service seam.

use async_trait::async_trait;

use crate::error::Result;

use super::types::{Deployment, DeploymentRequest, ManifestRecord, Operation};

/// Calls the reconciler makes against the provisioning service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    /// Fetches a deployment; `Ok(None)` if it does not exist.
    async fn get_deployment(&self, name: &str) -> Result<Option<Deployment>>;

    /// Fetches a manifest of a deployment.
    async fn get_manifest(&self, deployment: &str, manifest: &str) -> Result<ManifestRecord>;

    /// Creates a deployment.
    async fn create_deployment(&self, request: &DeploymentRequest) -> Result<Operation>;

    /// Updates a deployment; the request carries its fingerprint.
    async fn update_deployment(&self, name: &str, request: &DeploymentRequest) -> Result<Operation>;

    /// Deletes a deployment.
    async fn delete_deployment(&self, name: &str) -> Result<Operation>;

    /// Fetches an operation.
    async fn get_operation(&self, name: &str) -> Result<Operation>;
}
