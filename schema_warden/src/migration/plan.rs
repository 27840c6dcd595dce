//! Migration planning
//!
//! Builds timestamped migration files carrying a computed safety checklist,
//! an UP section and a DOWN (rollback) section, and writes them into the
//! configured migrations directory.

use chrono::Local;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::migration::change::{ChangeOperation, SchemaChange};
use crate::migration::classifier::{Classifier, VerdictStatus};
use crate::migration::parser::ScriptAnalyzer;
use crate::migration::report::{estimate_runtime, AdvisoryLevel};
use crate::utils::naming::create_migration_name;

/// A migration to be rendered and written
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub name: String,
    pub up_sql: String,
    pub down_sql: String,
    pub estimated_rows: u64,
}

impl MigrationPlan {
    pub fn new(name: &str, up_sql: &str, down_sql: &str) -> Self {
        Self {
            name: name.to_string(),
            up_sql: up_sql.to_string(),
            down_sql: down_sql.to_string(),
            estimated_rows: 0,
        }
    }

    pub fn estimated_rows(mut self, rows: u64) -> Self {
        self.estimated_rows = rows;
        self
    }
}

/// Renders and writes migration files
pub struct MigrationPlanner<'a> {
    config: &'a Config,
}

impl<'a> MigrationPlanner<'a> {
    /// Create a new migration planner
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Timestamped file name for a plan
    pub fn file_name(&self, plan: &MigrationPlan) -> String {
        format!("{}.sql", create_migration_name(&plan.name, true))
    }

    /// Render the full migration file content
    ///
    /// The safety checklist is computed by running the UP section through
    /// the script analyzer and classifier, so the file records the same
    /// findings `check` would report.
    pub fn render(&self, plan: &MigrationPlan, file_name: &str) -> Result<String> {
        if plan.name.trim().is_empty() {
            return Err(Error::MigrationError("migration name must not be empty".to_string()));
        }

        let policy = &self.config.policy;
        let analysis = ScriptAnalyzer::new(policy).analyze(&plan.up_sql, None);
        let classifier = Classifier::new(policy);

        let mut verdicts = Vec::new();
        for change in &analysis.changes {
            verdicts.push((change.clone(), classifier.classify(change)?));
        }

        let additive = verdicts
            .iter()
            .all(|(_, v)| v.status == VerdictStatus::Approved)
            && analysis
                .advisories
                .iter()
                .all(|a| a.level == AdvisoryLevel::Info);
        let runtime = self.headline_runtime(&analysis.changes, plan.estimated_rows);
        let rollback_documented = !plan.down_sql.trim().is_empty();

        let mut risks = Vec::new();
        for (change, verdict) in &verdicts {
            if !verdict.reasons.is_empty() {
                risks.push(format!("{}: {}", change.describe(), verdict.reasons.join("; ")));
            }
        }
        for advisory in &analysis.advisories {
            if advisory.level >= AdvisoryLevel::Warning {
                risks.push(advisory.message.clone());
            }
        }

        let mut content = format!(
            "-- ============================================================================\n\
             -- Migration: {}\n\
             -- Created: {}\n\
             -- File: {}\n\
             -- ============================================================================\n\n",
            plan.name,
            Local::now().format("%Y-%m-%d %H:%M"),
            file_name
        );

        content.push_str("-- SAFETY CHECKLIST\n-- ================\n");
        content.push_str(&format!(
            "-- [ ] Is this migration additive? {}\n",
            if additive { "YES" } else { "NO - REQUIRES REVIEW" }
        ));
        content.push_str(&format!(
            "-- [ ] Estimated runtime at {} rows: ~{}\n",
            group_thousands(plan.estimated_rows),
            runtime
        ));
        content.push_str(&format!(
            "-- [ ] Rollback plan documented? {}\n",
            if rollback_documented {
                "See DOWN migration below"
            } else {
                "MISSING - write the DOWN section"
            }
        ));
        content.push_str("-- [ ] Review approval obtained? REQUIRED BEFORE EXECUTION\n\n");

        if !risks.is_empty() {
            content.push_str("-- RISKS DETECTED\n");
            for risk in &risks {
                content.push_str(&format!("-- {}\n", risk));
            }
            content.push('\n');
        }

        content.push_str("-- UP MIGRATION\n");
        content.push_str(&self.wrap_section(&plan.up_sql));
        content.push_str("\n-- DOWN MIGRATION (ROLLBACK)\n");
        content.push_str(&self.wrap_section(&plan.down_sql));

        Ok(content)
    }

    /// Write the plan into the migrations directory, returning the path
    pub fn write(&self, plan: &MigrationPlan) -> Result<PathBuf> {
        let file_name = self.file_name(plan);
        let content = self.render(plan, &file_name)?;

        fs::create_dir_all(&self.config.migrations.directory)?;
        let path = Path::new(&self.config.migrations.directory).join(&file_name);

        let mut file = File::create(&path)?;
        file.write_all(content.as_bytes())?;

        tracing::info!(file = %path.display(), "migration file written");
        Ok(path)
    }

    fn wrap_section(&self, sql: &str) -> String {
        let body = sql.trim();
        if self.config.migrations.wrap_in_transaction {
            format!("BEGIN;\n{}\nCOMMIT;\n", body)
        } else {
            format!("{}\n", body)
        }
    }

    /// The estimate for the slowest recognized change
    fn headline_runtime(&self, changes: &[SchemaChange], rows: u64) -> String {
        let slowest = changes.iter().max_by_key(|c| runtime_weight(c));
        match slowest {
            Some(change) => {
                estimate_runtime(change, rows, self.config.policy.large_table_threshold)
            }
            None => "unknown - requires testing".to_string(),
        }
    }
}

fn runtime_weight(change: &SchemaChange) -> u8 {
    match change.operation {
        ChangeOperation::AlterType => 6,
        ChangeOperation::AddConstraint if change.affects_existing_rows => 5,
        ChangeOperation::AddIndex => 4,
        ChangeOperation::AddColumn if change.has_default => 3,
        ChangeOperation::AddTable | ChangeOperation::AddColumn => 1,
        _ => 0,
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
