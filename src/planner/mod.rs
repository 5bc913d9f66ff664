//! Planning module for deployment operations.
//!
//! This module compares the deployed manifest with the proposed one, turns
//! the result into a plan and executes it against the remote service.

mod diff;
mod executor;
mod plan;

pub use diff::{DiffEngine, DiffHunk, DiffLine, LineChange, ManifestDiff};
pub use executor::{DEFAULT_POLL_INTERVAL, OperationReport, PlanExecutor};
pub use plan::{ActionType, DeploymentPlan};
