//! Plan executor: submits a plan and polls its operation to completion.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{ReconcileError, Result, StratosphereError};
use crate::remote::{DeploymentApi, Operation, OperationStatus};

use super::plan::{ActionType, DeploymentPlan};

/// Default interval between operation polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Executor for deployment plans.
pub struct PlanExecutor<'a, A: DeploymentApi + ?Sized> {
    /// Remote API.
    api: &'a A,
    /// Interval between polls.
    poll_interval: Duration,
    /// Give up polling after this long.
    deadline: Option<Duration>,
}

/// Outcome of a finished operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReport {
    /// Operation name.
    pub operation: String,
    /// Target deployment URL.
    pub target_link: Option<String>,
    /// Final status.
    pub status: OperationStatus,
    /// Number of polls made.
    pub polls: u32,
    /// Time spent polling.
    pub elapsed: Duration,
    /// Warnings reported by the operation.
    pub warnings: Vec<String>,
}

impl<'a, A: DeploymentApi + ?Sized> PlanExecutor<'a, A> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(api: &'a A) -> Self {
        Self {
            api,
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }

    /// Sets the interval between polls.
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

    /// Makes the plan's mutating call and returns the started operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote call fails.
    pub async fn submit(&self, plan: &DeploymentPlan) -> Result<Operation> {
        info!("Submitting plan: {plan}");

        let operation = match (plan.action, &plan.request) {
            (ActionType::Create, Some(request)) => self.api.create_deployment(request).await?,
            (ActionType::Update, Some(request)) => self.api.update_deployment(&plan.deployment, request).await?,
            (ActionType::Delete, _) => self.api.delete_deployment(&plan.deployment).await?,
            (action, None) => {
                return Err(StratosphereError::internal(format!(
                    "{action} plan for {} has no request body",
                    plan.deployment
                )));
            }
        };

        debug!("Started operation {}", operation.name);
        Ok(operation)
    }

    /// Polls `operation` until it is `DONE`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::OperationFailed`] with every embedded error,
    /// [`ReconcileError::Timeout`] if the deadline passes first, or any remote
    /// error.
    pub async fn wait_for_completion(&self, mut operation: Operation) -> Result<OperationReport> {
        let started = Instant::now();
        let mut polls = 0;

        log_progress(&operation);
        while !operation.is_done() {
            if let Some(deadline) = self.deadline
                && started.elapsed() + self.poll_interval > deadline
            {
                return Err(ReconcileError::Timeout {
                    operation: operation.name,
                    waited_secs: started.elapsed().as_secs(),
                }
                .into());
            }

            tokio::time::sleep(self.poll_interval).await;
            operation = self.api.get_operation(&operation.name).await?;
            polls += 1;
            log_progress(&operation);
        }

        let warnings: Vec<String> = operation.warnings.iter().map(ToString::to_string).collect();
        for warning in &warnings {
            warn!("Operation {} warning: {warning}", operation.name);
        }

        if operation.has_errors() {
            let errors = operation.error_messages();
            for e in &errors {
                error!("Operation {} error: {e}", operation.name);
            }
            return Err(ReconcileError::OperationFailed {
                operation: operation.name,
                errors,
            }
            .into());
        }

        Ok(OperationReport {
            operation: operation.name,
            target_link: operation.target_link,
            status: operation.status,
            polls,
            elapsed: started.elapsed(),
            warnings,
        })
    }

}

fn log_progress(operation: &Operation) {
    info!(
        "Operation: {}, TargetLink: {}, Progress: {}, Status: {}",
        operation.name,
        operation.target_link.as_deref().unwrap_or("-"),
        operation.progress.unwrap_or_default(),
        operation.status
    );
}

impl std::fmt::Display for OperationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Operation {} {} after {} polls ({:.1}s)",
            self.operation,
            self.status,
            self.polls,
            self.elapsed.as_secs_f64()
        )
    }
}
