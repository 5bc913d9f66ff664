//! Remote provisioning service: the API seam, its HTTP client and wire types.

mod api;
mod client;
mod types;

#[cfg(test)]
pub use api::MockDeploymentApi;
pub use api::DeploymentApi;
pub use client::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS, DeploymentManagerClient};
pub use types::{
    ConfigFile, Deployment, DeploymentRequest, DeploymentUpdate, ManifestRecord, Operation, OperationErrorItem,
    OperationErrors, OperationStatus, OperationWarning, TargetConfiguration,
};
