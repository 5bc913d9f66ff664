//! Reconciler for deployments.
//!
//! This module implements the apply and delete workflows: render the
//! template, compare it with what the remote service has, confirm, submit
//! and poll the resulting operation to completion.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ReconcileError, Result};
use crate::planner::{
    ActionType, DEFAULT_POLL_INTERVAL, DeploymentPlan, DiffEngine, ManifestDiff, OperationReport, PlanExecutor,
};
use crate::remote::{Deployment, DeploymentApi, DeploymentRequest};
use crate::template::Template;

/// Decides whether a plan may be submitted.
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Presents the plan and returns true to go ahead.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be obtained.
    async fn confirm(&self, plan: &DeploymentPlan) -> Result<bool>;
}

/// Confirms every plan without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn confirm(&self, plan: &DeploymentPlan) -> Result<bool> {
        info!("Auto-approving: {plan}");
        if let Some(diff) = &plan.diff {
            info!("Manifest diff:\n{diff}");
        }
        Ok(true)
    }
}

/// Reconciliation workflow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// Template not rendered yet.
    NotConfigured,
    /// Template rendered.
    Configured,
    /// The deployment does not exist remotely.
    NoExistingDeployment,
    /// The deployment exists remotely.
    ExistingDeployment,
    /// Mutating call made.
    Submitted,
    /// Waiting for the operation.
    Polling,
    /// Operation finished cleanly.
    Done,
    /// Operation or submission failed.
    Failed,
}

/// How a reconciliation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A new deployment was created.
    Created,
    /// The deployment was updated.
    Updated,
    /// The deployment was deleted.
    Deleted,
    /// The deployed manifest already matches.
    NoChanges,
    /// The user declined the plan.
    Declined,
    /// Delete requested for a deployment that does not exist.
    NothingToDelete,
}

/// Result of a reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconciliationResult {
    /// Deployment name.
    pub deployment: String,
    /// Outcome.
    pub outcome: ReconcileOutcome,
    /// Manifest diff, when an existing deployment was compared.
    pub diff: Option<ManifestDiff>,
    /// Finished operation, when one was submitted.
    pub report: Option<OperationReport>,
    /// State the workflow stopped in.
    pub final_state: ReconcileState,
}

/// Reconciler for one deployment.
pub struct Reconciler<'a, A: DeploymentApi + ?Sized> {
    /// Remote API.
    api: &'a A,
    /// Confirmation strategy.
    confirmer: &'a dyn Confirmer,
    /// Diff engine.
    diff_engine: DiffEngine,
    /// Interval between operation polls.
    poll_interval: Duration,
    /// Give up polling after this long.
    deadline: Option<Duration>,
}

impl<'a, A: DeploymentApi + ?Sized> Reconciler<'a, A> {
    /// Creates a new reconciler.
    #[must_use]
    pub fn new(api: &'a A, confirmer: &'a dyn Confirmer) -> Self {
        Self {
            api,
            confirmer,
            diff_engine: DiffEngine::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }

    /// Sets the interval between operation polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets how long to poll before giving up.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Creates or updates the template's deployment.
    ///
    /// # Errors
    ///
    /// Returns validation errors, remote errors, or a reconcile error if the
    /// operation fails or times out.
    pub async fn apply(&self, template: &mut Template) -> Result<ReconciliationResult> {
        let mut state = ReconcileState::NotConfigured;
        let manifest = template.render()?.to_string();
        transition(&mut state, ReconcileState::Configured);

        let name = template.name().to_string();
        info!("Reconciling deployment {name}");
        let request = DeploymentRequest::new(name.as_str(), template.description(), manifest.as_str());

        let plan = match self.api.get_deployment(&name).await? {
            None => {
                transition(&mut state, ReconcileState::NoExistingDeployment);
                info!("Generated template:\n{manifest}");
                info!("Launching a new deployment: {name}");
                DeploymentPlan::create(request)
            }
            Some(existing) => {
                transition(&mut state, ReconcileState::ExistingDeployment);
                let deployed = self.fetch_manifest(&existing).await?;
                let diff = self.diff_engine.compute(&deployed, &manifest);
                if !diff.has_changes() {
                    info!("No changes in the template");
                    return Ok(ReconciliationResult {
                        deployment: name,
                        outcome: ReconcileOutcome::NoChanges,
                        diff: Some(diff),
                        report: None,
                        final_state: state,
                    });
                }
                info!("Template changes for {name}: {}", diff.summary());
                DeploymentPlan::update(&existing, request, diff)
            }
        };

        self.confirm_and_run(plan, state).await
    }

    /// Deletes the deployment named `name`.
    ///
    /// # Errors
    ///
    /// Returns remote errors, or a reconcile error if the operation fails or
    /// times out.
    pub async fn delete(&self, name: &str) -> Result<ReconciliationResult> {
        let mut state = ReconcileState::NotConfigured;

        let Some(existing) = self.api.get_deployment(name).await? else {
            transition(&mut state, ReconcileState::NoExistingDeployment);
            info!("Deployment {name} does not exist, nothing to delete");
            return Ok(ReconciliationResult {
                deployment: name.to_string(),
                outcome: ReconcileOutcome::NothingToDelete,
                diff: None,
                report: None,
                final_state: state,
            });
        };

        transition(&mut state, ReconcileState::ExistingDeployment);
        self.confirm_and_run(DeploymentPlan::delete(&existing), state).await
    }

    async fn confirm_and_run(&self, plan: DeploymentPlan, mut state: ReconcileState) -> Result<ReconciliationResult> {
        if !self.confirmer.confirm(&plan).await? {
            info!("Plan declined, nothing submitted");
            return Ok(ReconciliationResult {
                deployment: plan.deployment,
                outcome: ReconcileOutcome::Declined,
                diff: plan.diff,
                report: None,
                final_state: state,
            });
        }

        let executor = PlanExecutor::new(self.api)
            .with_poll_interval(self.poll_interval)
            .with_deadline(self.deadline);

        let operation = match executor.submit(&plan).await {
            Ok(operation) => operation,
            Err(e) => {
                transition(&mut state, ReconcileState::Failed);
                return Err(e);
            }
        };
        transition(&mut state, ReconcileState::Submitted);

        transition(&mut state, ReconcileState::Polling);
        let report = match executor.wait_for_completion(operation).await {
            Ok(report) => report,
            Err(e) => {
                transition(&mut state, ReconcileState::Failed);
                return Err(e);
            }
        };
        transition(&mut state, ReconcileState::Done);
        info!("{report}");

        let outcome = match plan.action {
            ActionType::Create => ReconcileOutcome::Created,
            ActionType::Update => ReconcileOutcome::Updated,
            ActionType::Delete => ReconcileOutcome::Deleted,
        };

        Ok(ReconciliationResult {
            deployment: plan.deployment,
            outcome,
            diff: plan.diff,
            report: Some(report),
            final_state: state,
        })
    }

    async fn fetch_manifest(&self, existing: &Deployment) -> Result<String> {
        let missing = || ReconcileError::MissingManifest {
            deployment: existing.name.clone(),
        };

        let manifest = existing.manifest_name().ok_or_else(missing)?;
        debug!("Fetching manifest {manifest} of {}", existing.name);

        let record = self.api.get_manifest(&existing.name, manifest).await?;
        Ok(record.content().ok_or_else(missing)?.to_string())
    }
}

fn transition(state: &mut ReconcileState, next: ReconcileState) {
    debug!("Reconcile state: {state} -> {next}");
    *state = next;
}

impl ReconciliationResult {
    /// Returns true if a mutating call completed.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self.outcome,
            ReconcileOutcome::Created | ReconcileOutcome::Updated | ReconcileOutcome::Deleted
        )
    }
}

impl std::fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotConfigured => "not-configured",
            Self::Configured => "configured",
            Self::NoExistingDeployment => "no-existing-deployment",
            Self::ExistingDeployment => "existing-deployment",
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::NoChanges => "no changes",
            Self::Declined => "declined",
            Self::NothingToDelete => "nothing to delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Deployment {}: {}", self.deployment, self.outcome)?;
        if let Some(report) = &self.report {
            write!(f, " ({report})")?;
        }
        Ok(())
    }
}
