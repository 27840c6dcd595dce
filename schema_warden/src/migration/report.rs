//! Validation reports
//!
//! Aggregates per-change verdicts and script-level advisories into one
//! report with an overall outcome. The text rendering is what the CLI
//! prints; the whole report also serializes to JSON unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::migration::change::{ChangeOperation, SchemaChange};
use crate::migration::classifier::{SafetyVerdict, VerdictStatus};

/// Severity of a script-level advisory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryLevel {
    Info,
    Warning,
    Blocker,
}

impl fmt::Display for AdvisoryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdvisoryLevel::Info => "INFO",
            AdvisoryLevel::Warning => "WARNING",
            AdvisoryLevel::Blocker => "BLOCKER",
        };
        write!(f, "{}", name)
    }
}

/// A finding about the script that is not tied to a single schema change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub message: String,
    #[serde(default)]
    pub suggestion: Option<String>,
}

impl Advisory {
    pub fn info(message: &str) -> Self {
        Self {
            level: AdvisoryLevel::Info,
            message: message.to_string(),
            suggestion: None,
        }
    }

    pub fn warning(message: &str) -> Self {
        Self {
            level: AdvisoryLevel::Warning,
            message: message.to_string(),
            suggestion: None,
        }
    }

    pub fn blocker(message: &str) -> Self {
        Self {
            level: AdvisoryLevel::Blocker,
            message: message.to_string(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }
}

/// One classified change together with its runtime estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeReport {
    pub change: SchemaChange,
    pub verdict: SafetyVerdict,
    pub estimated_runtime: String,
}

/// Counts over a whole report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub statements: usize,
    pub approved: usize,
    pub blocked: usize,
    pub needs_review: usize,
    pub advisories: usize,
}

/// Full outcome of validating one migration script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// File name or label of the validated script
    pub source: Option<String>,
    pub changes: Vec<ChangeReport>,
    pub advisories: Vec<Advisory>,
    pub summary: ReportSummary,
}

impl ValidationReport {
    /// Assemble a report from classified changes and script advisories
    pub fn from_parts(
        source: Option<String>,
        changes: Vec<ChangeReport>,
        advisories: Vec<Advisory>,
        statement_count: usize,
    ) -> Self {
        let mut summary = ReportSummary {
            statements: statement_count,
            advisories: advisories.len(),
            ..ReportSummary::default()
        };

        for entry in &changes {
            match entry.verdict.status {
                VerdictStatus::Approved => summary.approved += 1,
                VerdictStatus::Blocked => summary.blocked += 1,
                VerdictStatus::NeedsReview => summary.needs_review += 1,
            }
        }

        Self {
            source,
            changes,
            advisories,
            summary,
        }
    }

    /// Overall outcome: the worst of all verdicts and advisories
    pub fn overall(&self) -> VerdictStatus {
        let any_blocker = self.summary.blocked > 0
            || self
                .advisories
                .iter()
                .any(|a| a.level == AdvisoryLevel::Blocker);
        if any_blocker {
            return VerdictStatus::Blocked;
        }

        let any_review = self.summary.needs_review > 0
            || self
                .advisories
                .iter()
                .any(|a| a.level == AdvisoryLevel::Warning);
        if any_review {
            VerdictStatus::NeedsReview
        } else {
            VerdictStatus::Approved
        }
    }

    /// Whether the script may be executed at all
    pub fn is_passing(&self) -> bool {
        self.overall() != VerdictStatus::Blocked
    }

    /// Render the report for terminal output
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        match &self.source {
            Some(source) => out.push_str(&format!("Migration safety report: {}\n", source)),
            None => out.push_str("Migration safety report\n"),
        }
        out.push_str(&"=".repeat(50));
        out.push('\n');

        for entry in &self.changes {
            out.push_str(&format!(
                "[{}] {}\n",
                entry.verdict.status,
                entry.change.describe()
            ));
            for reason in &entry.verdict.reasons {
                out.push_str(&format!("    reason: {}\n", reason));
            }
            if let Some(hint) = &entry.verdict.rollback_hint {
                out.push_str(&format!("    rollback: {}\n", hint));
            }
            out.push_str(&format!("    runtime: {}\n", entry.estimated_runtime));
        }

        if !self.advisories.is_empty() {
            out.push('\n');
            for advisory in &self.advisories {
                out.push_str(&format!("[{}] {}\n", advisory.level, advisory.message));
                if let Some(suggestion) = &advisory.suggestion {
                    out.push_str(&format!("    suggestion: {}\n", suggestion));
                }
            }
        }

        out.push('\n');
        out.push_str(&format!(
            "{} statements: {} approved, {} blocked, {} needs review; {} advisories\n",
            self.summary.statements,
            self.summary.approved,
            self.summary.blocked,
            self.summary.needs_review,
            self.summary.advisories
        ));

        let verdict_line = match self.overall() {
            VerdictStatus::Approved => "VERDICT: APPROVED (safe to execute)",
            VerdictStatus::Blocked => "VERDICT: BLOCKED (fix blocking issues before execution)",
            VerdictStatus::NeedsReview => "VERDICT: NEEDS REVIEW (resolve review items before execution)",
        };
        out.push_str(verdict_line);
        out.push('\n');

        out
    }
}

/// Estimate how long a change takes to apply
///
/// Row counts are supplied by the caller; `large_threshold` marks where an
/// index build stops being a quick operation.
pub fn estimate_runtime(change: &SchemaChange, rows: u64, large_threshold: u64) -> String {
    match change.operation {
        ChangeOperation::AddTable => "<1 second".to_string(),
        ChangeOperation::AddColumn => {
            if change.has_default {
                "1-30 seconds (rewrites existing rows)".to_string()
            } else {
                "<1 second (metadata only)".to_string()
            }
        }
        ChangeOperation::AddIndex => {
            if rows < large_threshold {
                "5-15 seconds".to_string()
            } else {
                "1-5 minutes".to_string()
            }
        }
        ChangeOperation::AlterType => "minutes to hours (full table rewrite)".to_string(),
        ChangeOperation::AddConstraint => {
            if change.affects_existing_rows {
                "seconds to minutes (full table scan)".to_string()
            } else {
                "<1 second (NOT VALID skips the scan)".to_string()
            }
        }
        ChangeOperation::DropColumn
        | ChangeOperation::DropTable
        | ChangeOperation::DropIndex
        | ChangeOperation::DropConstraint
        | ChangeOperation::RenameColumn => "<1 second (catalog change)".to_string(),
    }
}
