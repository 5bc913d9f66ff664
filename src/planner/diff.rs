//! Line diff between the deployed and the proposed manifest.
//!
//! Manifests are compared as text, line by line, after normalizing the
//! trailing newline. An empty diff means the deployment is up to date.

use similar::{ChangeTag, TextDiff};

/// Default number of context lines around each change.
const DEFAULT_CONTEXT_LINES: usize = 3;

/// Engine computing manifest diffs.
#[derive(Debug, Clone, Copy)]
pub struct DiffEngine {
    context_lines: usize,
}

/// What happened to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineChange {
    /// Present in both manifests.
    Context,
    /// Only in the proposed manifest.
    Added,
    /// Only in the deployed manifest.
    Removed,
}

/// A single diff line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    /// Change kind.
    pub change: LineChange,
    /// Line text without its newline.
    pub content: String,
}

/// A group of nearby changes with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    /// First line in the deployed manifest (1-based).
    pub old_start: usize,
    /// Lines covered in the deployed manifest.
    pub old_len: usize,
    /// First line in the proposed manifest (1-based).
    pub new_start: usize,
    /// Lines covered in the proposed manifest.
    pub new_len: usize,
    /// Lines in order.
    pub lines: Vec<DiffLine>,
}

/// Result of comparing two manifests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDiff {
    /// Hunks in order.
    pub hunks: Vec<DiffHunk>,
    /// Number of added lines.
    pub added: usize,
    /// Number of removed lines.
    pub removed: usize,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffEngine {
    /// Creates a diff engine with three lines of context.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
        }
    }

    /// Sets the number of context lines around each change.
    #[must_use]
    pub const fn with_context(mut self, context_lines: usize) -> Self {
        self.context_lines = context_lines;
        self
    }

    /// Compares the deployed manifest with the proposed one.
    #[must_use]
    pub fn compute(&self, existing: &str, proposed: &str) -> ManifestDiff {
        let existing = normalize(existing);
        let proposed = normalize(proposed);
        let diff = TextDiff::from_lines(existing.as_str(), proposed.as_str());

        let mut result = ManifestDiff::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => result.added += 1,
                ChangeTag::Delete => result.removed += 1,
                ChangeTag::Equal => {}
            }
        }

        if !result.has_changes() {
            return result;
        }

        for group in diff.grouped_ops(self.context_lines) {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };
            let old_range = first.old_range().start..last.old_range().end;
            let new_range = first.new_range().start..last.new_range().end;

            let lines = group
                .iter()
                .flat_map(|op| diff.iter_changes(op))
                .map(|change| DiffLine {
                    change: match change.tag() {
                        ChangeTag::Equal => LineChange::Context,
                        ChangeTag::Insert => LineChange::Added,
                        ChangeTag::Delete => LineChange::Removed,
                    },
                    content: change.value().trim_end_matches(['\r', '\n']).to_string(),
                })
                .collect();

            result.hunks.push(DiffHunk {
                old_start: old_range.start + 1,
                old_len: old_range.len(),
                new_start: new_range.start + 1,
                new_len: new_range.len(),
                lines,
            });
        }

        result
    }
}

fn normalize(text: &str) -> String {
    let mut normalized = text.trim_end_matches('\n').to_string();
    normalized.push('\n');
    normalized
}

impl ManifestDiff {
    /// Returns true if any line was added or removed.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.added > 0 || self.removed > 0
    }

    /// One-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} additions, {} removals", self.added, self.removed)
    }
}

impl std::fmt::Display for LineChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Context => " ",
            Self::Added => "+",
            Self::Removed => "-",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ManifestDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.has_changes() {
            return write!(f, "No changes");
        }

        writeln!(f, "--- deployed")?;
        writeln!(f, "+++ proposed")?;
        for hunk in &self.hunks {
            writeln!(
                f,
                "@@ -{},{} +{},{} @@",
                hunk.old_start, hunk.old_len, hunk.new_start, hunk.new_len
            )?;
            for line in &hunk.lines {
                writeln!(f, "{}{}", line.change, line.content)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOYED: &str = "resources:\n- type: compute.v1.network\n  name: dev-network\n  properties:\n    name: dev-network\n    autoCreateSubnetworks: false\n";

    #[test]
    fn test_identical_manifests() {
        let diff = DiffEngine::new().compute(DEPLOYED, DEPLOYED);
        assert!(!diff.has_changes());
        assert!(diff.hunks.is_empty());
        assert_eq!(diff.to_string(), "No changes");
    }

    #[test]
    fn test_trailing_newline_is_not_a_change() {
        let diff = DiffEngine::new().compute(DEPLOYED, DEPLOYED.trim_end());
        assert!(!diff.has_changes());
    }

    #[test]
    fn test_changed_line() {
        let proposed = DEPLOYED.replace("autoCreateSubnetworks: false", "autoCreateSubnetworks: true");
        let diff = DiffEngine::new().compute(DEPLOYED, &proposed);

        assert!(diff.has_changes());
        assert_eq!((diff.added, diff.removed), (1, 1));
        assert_eq!(diff.hunks.len(), 1);

        let changed: Vec<_> = diff.hunks[0]
            .lines
            .iter()
            .filter(|line| line.change != LineChange::Context)
            .map(|line| line.content.as_str())
            .collect();
        assert_eq!(
            changed,
            vec!["    autoCreateSubnetworks: false", "    autoCreateSubnetworks: true"]
        );

        let text = diff.to_string();
        assert!(text.contains("-    autoCreateSubnetworks: false"));
        assert!(text.contains("+    autoCreateSubnetworks: true"));
    }

    #[test]
    fn test_context_lines_limit() {
        let proposed = DEPLOYED.replace("autoCreateSubnetworks: false", "autoCreateSubnetworks: true");
        let diff = DiffEngine::new().with_context(0).compute(DEPLOYED, &proposed);
        assert_eq!(diff.hunks[0].lines.len(), 2);
    }
}
