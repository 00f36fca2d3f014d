//! Patch reports - what each step did and whether the file was written

use crate::anchor::NearMiss;
use crate::target::LineEnding;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Outcome of a single substitution step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// The anchor matched and this many replacements were made
    Applied { replacements: usize },
    /// The step's marker shows it was already done; nothing changed
    AlreadyPresent,
    /// The anchor text was not in the file; nothing changed
    AnchorMissing,
}

impl StepOutcome {
    pub fn is_missing(&self) -> bool {
        matches!(self, StepOutcome::AnchorMissing)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Applied { replacements: 1 } => write!(f, "applied"),
            StepOutcome::Applied { replacements } => write!(f, "applied ({replacements} sites)"),
            StepOutcome::AlreadyPresent => write!(f, "already present"),
            StepOutcome::AnchorMissing => write!(f, "anchor not found"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub name: &'static str,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near_miss: Option<NearMiss>,
}

impl StepReport {
    pub fn new(name: &'static str, outcome: StepOutcome) -> Self {
        Self {
            name,
            outcome,
            near_miss: None,
        }
    }

    pub fn with_near_miss(mut self, near_miss: Option<NearMiss>) -> Self {
        self.near_miss = near_miss;
        self
    }
}

/// Result of running one patcher against one file.
#[derive(Debug, Clone, Serialize)]
#[must_use = "PatchReport should be checked for skipped steps"]
pub struct PatchReport {
    pub tool: &'static str,
    pub file: PathBuf,
    pub steps: Vec<StepReport>,
    /// Whether the file on disk was (re)written
    pub written: bool,
    pub dry_run: bool,
    /// Line terminators the file used; the write keeps them
    pub line_ending: LineEnding,
    pub fingerprint_before: String,
    pub fingerprint_after: String,
    /// Hardcoded forms-domain header literals left in the patched text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_hardcoded: Option<usize>,
    #[serde(skip)]
    pub original: String,
    #[serde(skip)]
    pub patched: String,
}

impl PatchReport {
    /// True when the patched text differs from what was read.
    pub fn changed(&self) -> bool {
        self.original != self.patched
    }

    /// Steps whose anchor was not found.
    pub fn skipped_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|step| step.outcome.is_missing())
    }

    pub fn is_complete(&self) -> bool {
        self.skipped_steps().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(steps: Vec<StepReport>) -> PatchReport {
        PatchReport {
            tool: "test",
            file: PathBuf::from("/tmp/app.js"),
            steps,
            written: false,
            dry_run: true,
            line_ending: LineEnding::Lf,
            fingerprint_before: String::new(),
            fingerprint_after: String::new(),
            remaining_hardcoded: None,
            original: "a".to_string(),
            patched: "a".to_string(),
        }
    }

    #[test]
    fn test_step_outcome_display() {
        assert_eq!(
            StepOutcome::Applied { replacements: 1 }.to_string(),
            "applied"
        );
        assert_eq!(
            StepOutcome::Applied { replacements: 2 }.to_string(),
            "applied (2 sites)"
        );
        assert_eq!(StepOutcome::AlreadyPresent.to_string(), "already present");
        assert_eq!(StepOutcome::AnchorMissing.to_string(), "anchor not found");
    }

    #[test]
    fn test_skipped_steps() {
        let report = report(vec![
            StepReport::new("one", StepOutcome::Applied { replacements: 1 }),
            StepReport::new("two", StepOutcome::AnchorMissing),
            StepReport::new("three", StepOutcome::AlreadyPresent),
        ]);
        let skipped: Vec<_> = report.skipped_steps().map(|s| s.name).collect();
        assert_eq!(skipped, vec!["two"]);
        assert!(!report.is_complete());
        assert!(!report.changed());
    }

    #[test]
    fn test_report_serializes_outcome_tag() {
        let report = report(vec![StepReport::new(
            "insert-helper",
            StepOutcome::Applied { replacements: 1 },
        )]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["steps"][0]["outcome"]["status"], "applied");
        assert_eq!(json["steps"][0]["outcome"]["replacements"], 1);
        assert!(json.get("original").is_none());
        assert!(json.get("remaining_hardcoded").is_none());
    }
}
