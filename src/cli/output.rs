//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying plans, diffs,
//! manifests and results to the user.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::manifest::Manifest;
use crate::planner::{ActionType, DeploymentPlan, LineChange, ManifestDiff, OperationReport};
use crate::reconciler::{ReconcileOutcome, ReconciliationResult};

/// Output formatter for CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputFormatter;

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Properties")]
    properties: usize,
}

/// Operation row for table display.
#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Polls")]
    polls: u32,
    #[tabled(rename = "Elapsed")]
    elapsed: String,
    #[tabled(rename = "Target")]
    target: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Formats a manifest diff, additions green and removals red.
    #[must_use]
    pub fn format_diff(&self, diff: &ManifestDiff) -> String {
        if !diff.has_changes() {
            return format!("{} No changes\n", "✓".green());
        }

        let mut output = String::new();
        let _ = writeln!(output, "{}", "--- deployed".red());
        let _ = writeln!(output, "{}", "+++ proposed".green());

        for hunk in &diff.hunks {
            let header = format!(
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_len, hunk.new_start, hunk.new_len
            );
            let _ = writeln!(output, "{}", header.cyan());

            for line in &hunk.lines {
                let text = format!("{}{}", line.change, line.content);
                let _ = match line.change {
                    LineChange::Added => writeln!(output, "{}", text.green()),
                    LineChange::Removed => writeln!(output, "{}", text.red()),
                    LineChange::Context => writeln!(output, "{text}"),
                };
            }
        }

        let _ = writeln!(
            output,
            "\n{} additions, {} removals",
            diff.added.to_string().green(),
            diff.removed.to_string().red()
        );
        output
    }

    /// Formats a plan as shown before confirmation.
    #[must_use]
    pub fn format_plan(&self, plan: &DeploymentPlan) -> String {
        let mut output = String::new();

        let _ = writeln!(
            output,
            "\nDeployment plan: {} {}",
            Self::format_action_type(plan.action),
            plan.deployment.bold()
        );
        if let Some(hash) = &plan.manifest_hash {
            let _ = writeln!(output, "   Manifest hash: {}", &hash[..12.min(hash.len())]);
        }
        let _ = writeln!(output, "   Planned at: {}", plan.created_at.format("%Y-%m-%d %H:%M:%S UTC"));

        if let Some(diff) = &plan.diff {
            output.push('\n');
            output.push_str(&self.format_diff(diff));
        }

        output
    }

    /// Formats the resources of a manifest as a table.
    #[must_use]
    pub fn format_resources(&self, manifest: &Manifest) -> String {
        if manifest.is_empty() {
            return String::from("   No resources.\n");
        }

        let rows: Vec<ResourceRow> = manifest
            .resources
            .iter()
            .enumerate()
            .map(|(i, r)| ResourceRow {
                index: i + 1,
                name: Self::truncate(&r.name, 40),
                resource_type: r.resource_type.clone(),
                properties: r.properties.len(),
            })
            .collect();

        let mut output = Table::new(rows).to_string();
        let _ = write!(output, "\n{} resources\n", manifest.resources.len());
        output
    }

    /// Formats a finished operation as a table.
    #[must_use]
    pub fn format_report(&self, report: &OperationReport) -> String {
        let row = OperationRow {
            operation: report.operation.clone(),
            status: report.status.to_string(),
            polls: report.polls,
            elapsed: format!("{:.1}s", report.elapsed.as_secs_f64()),
            target: Self::truncate(report.target_link.as_deref().unwrap_or("-"), 60),
        };

        let mut output = Table::new([row]).to_string();
        output.push('\n');

        if !report.warnings.is_empty() {
            let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
            for warning in &report.warnings {
                let _ = writeln!(output, "   - {warning}");
            }
        }

        output
    }

    /// Formats a reconciliation result.
    #[must_use]
    pub fn format_result(&self, result: &ReconciliationResult) -> String {
        let status = match result.outcome {
            ReconcileOutcome::Created | ReconcileOutcome::Updated | ReconcileOutcome::Deleted => {
                format!("{} Deployment {} {}", "✓".green(), result.deployment, result.outcome)
            }
            ReconcileOutcome::NoChanges => {
                format!("{} Deployment {} is up to date", "✓".green(), result.deployment)
            }
            ReconcileOutcome::NothingToDelete => {
                format!("{} Deployment {} does not exist", "✓".green(), result.deployment)
            }
            ReconcileOutcome::Declined => {
                format!("{} Plan for {} declined, nothing submitted", "✗".yellow(), result.deployment)
            }
        };

        let mut output = format!("{status}\n");
        if let Some(report) = &result.report {
            output.push('\n');
            output.push_str(&self.format_report(report));
        }
        output
    }

    /// Formats an action type with color.
    fn format_action_type(action_type: ActionType) -> String {
        match action_type {
            ActionType::Create => "+create".green().to_string(),
            ActionType::Update => "~update".yellow().to_string(),
            ActionType::Delete => "-delete".red().to_string(),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestResource;
    use crate::planner::DiffEngine;
    use crate::remote::OperationStatus;
    use crate::reconciler::ReconcileState;
    use std::time::Duration;

    #[test]
    fn test_format_diff_lines() {
        let diff = DiffEngine::new().compute("a: 1\nb: 2\n", "a: 1\nb: 3\n");
        let text = OutputFormatter::new().format_diff(&diff);
        assert!(text.contains("-b: 2"));
        assert!(text.contains("+b: 3"));
        assert!(text.contains("additions"));
    }

    #[test]
    fn test_format_resources_table() {
        let manifest = Manifest::new(vec![ManifestResource {
            resource_type: String::from("compute.v1.network"),
            name: String::from("dev-network"),
            properties: indexmap::IndexMap::new(),
        }]);
        let text = OutputFormatter::new().format_resources(&manifest);
        assert!(text.contains("dev-network"));
        assert!(text.contains("compute.v1.network"));
        assert!(text.contains("1 resources"));
    }

    #[test]
    fn test_format_result_with_report() {
        let result = ReconciliationResult {
            deployment: String::from("dev-networks"),
            outcome: ReconcileOutcome::Created,
            diff: None,
            report: Some(OperationReport {
                operation: String::from("operation-1"),
                target_link: None,
                status: OperationStatus::Done,
                polls: 3,
                elapsed: Duration::from_secs(3),
                warnings: vec![String::from("NO_RESULTS_ON_PAGE: empty")],
            }),
            final_state: ReconcileState::Done,
        };
        let text = OutputFormatter::new().format_result(&result);
        assert!(text.contains("dev-networks created"));
        assert!(text.contains("operation-1"));
        assert!(text.contains("NO_RESULTS_ON_PAGE"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a-very-long-name", 8), "a-ver...");
    }
}
