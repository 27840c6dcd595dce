//! Migration module for SchemaWarden
//!
//! This module handles schema change classification, migration script
//! analysis, report assembly and migration file planning.

pub mod change;
pub mod classifier;
pub mod parser;
pub mod plan;
pub mod report;

// Re-export key types
pub use change::{ChangeOperation, SchemaChange, TypeChange};
pub use classifier::{classify, Classifier, DestructiveOverride, SafetyVerdict, VerdictStatus};
pub use parser::{ScriptAnalysis, ScriptAnalyzer};
pub use plan::{MigrationPlan, MigrationPlanner};
pub use report::{Advisory, AdvisoryLevel, ChangeReport, ReportSummary, ValidationReport};
