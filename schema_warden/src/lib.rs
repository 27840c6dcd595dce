//! SchemaWarden: an offline safety gate for Postgres schema migrations
//!
//! SchemaWarden classifies proposed schema changes into Approved, Blocked or
//! NeedsReview verdicts, lints migration scripts for unsafe patterns, and
//! scaffolds tables, RLS policies and migration files. It works entirely
//! from the filesystem and never connects to a database.

pub mod advisor;
pub mod config;
pub mod error;
pub mod integrity;
pub mod migration;
pub mod schema;
pub mod utils;

#[cfg(test)]
mod test;

// Re-export main types for easier access
pub use config::Config;
pub use error::{Error, Result};
pub use migration::change::{ChangeOperation, SchemaChange, TypeChange};
pub use migration::classifier::{classify, Classifier, DestructiveOverride, SafetyVerdict, VerdictStatus};
pub use migration::report::ValidationReport;
pub use schema::types::DatabaseSchema;

use std::fs;
use std::path::{Path, PathBuf};

use crate::advisor::{QueryAdvisor, QueryRecommendation};
use crate::integrity::{IntegrityChecker, IntegrityReport};
use crate::migration::parser::ScriptAnalyzer;
use crate::migration::plan::{MigrationPlan, MigrationPlanner};
use crate::migration::report::{estimate_runtime, ChangeReport};
use crate::schema::catalog;
use crate::schema::erd;
use crate::schema::generator::{ColumnSpec, ScaffoldGenerator};

/// Initialize SchemaWarden from a configuration file path, or defaults
pub fn init(config_path: Option<&str>) -> Result<SchemaWarden> {
    let config = config::load_or_default(config_path)?;
    Ok(SchemaWarden::new(config))
}

/// The main entry point for interacting with SchemaWarden
pub struct SchemaWarden {
    config: Config,
}

impl SchemaWarden {
    /// Create a new instance from configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Classify a single schema change against the safety policy
    pub fn classify_change(&self, change: &SchemaChange) -> Result<SafetyVerdict> {
        Classifier::new(&self.config.policy).classify(change)
    }

    /// Classify with a justified override for destructive changes
    pub fn classify_with_override(
        &self,
        change: &SchemaChange,
        destructive_override: Option<&DestructiveOverride>,
    ) -> Result<SafetyVerdict> {
        Classifier::new(&self.config.policy).classify_with_override(change, destructive_override)
    }

    /// Validate a migration script and assemble the full report
    pub fn validate_script(
        &self,
        sql: &str,
        source: Option<&str>,
        estimated_rows: u64,
    ) -> Result<ValidationReport> {
        self.build_report(sql, source, estimated_rows, None)
    }

    /// Validate a migration file, replaying earlier migrations for context
    ///
    /// When the configured migrations directory exists, every script whose
    /// file name sorts before this one is replayed into a catalog first, so
    /// type changes can be judged against the column's current type.
    pub fn validate_file(&self, path: &Path, estimated_rows: u64) -> Result<ValidationReport> {
        let sql = fs::read_to_string(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let dir = Path::new(&self.config.migrations.directory);
        let catalog = if dir.is_dir() {
            Some(catalog::load_dir_before(dir, &file_name)?)
        } else {
            None
        };

        self.build_report(&sql, Some(&file_name), estimated_rows, catalog.as_ref())
    }

    fn build_report(
        &self,
        sql: &str,
        source: Option<&str>,
        estimated_rows: u64,
        catalog: Option<&DatabaseSchema>,
    ) -> Result<ValidationReport> {
        let policy = &self.config.policy;
        let analysis = ScriptAnalyzer::new(policy).analyze(sql, catalog);
        let classifier = Classifier::new(policy);

        let mut changes = Vec::with_capacity(analysis.changes.len());
        for change in analysis.changes {
            let verdict = classifier.classify(&change)?;
            let estimated_runtime =
                estimate_runtime(&change, estimated_rows, policy.large_table_threshold);
            changes.push(ChangeReport {
                change,
                verdict,
                estimated_runtime,
            });
        }

        Ok(ValidationReport::from_parts(
            source.map(str::to_string),
            changes,
            analysis.advisories,
            analysis.statement_count,
        ))
    }

    /// Replay the migrations directory into a schema catalog
    pub fn load_catalog(&self) -> Result<DatabaseSchema> {
        catalog::load_dir(Path::new(&self.config.migrations.directory))
    }

    /// Render the catalog as a Mermaid ERD markdown document
    pub fn render_erd(&self, title: &str) -> Result<String> {
        let schema = self.load_catalog()?;
        Ok(erd::render_markdown(&schema, title))
    }

    /// Run the offline integrity checks over the catalog
    pub fn check_integrity(&self) -> Result<IntegrityReport> {
        let schema = self.load_catalog()?;
        Ok(IntegrityChecker::new(&self.config.policy).check(&schema))
    }

    /// Generate a CREATE TABLE scaffold
    pub fn scaffold_table(
        &self,
        entity_name: &str,
        purpose: &str,
        columns: &[ColumnSpec],
    ) -> Result<String> {
        ScaffoldGenerator::new(&self.config).generate_table_sql(entity_name, purpose, columns)
    }

    /// Generate the RLS policy set for a table
    pub fn rls_policies(&self, table_name: &str, user_id_column: &str) -> Result<String> {
        ScaffoldGenerator::new(&self.config).generate_rls_sql(table_name, user_id_column)
    }

    /// Render a migration plan without writing it
    pub fn plan_migration(&self, plan: &MigrationPlan) -> Result<String> {
        let planner = MigrationPlanner::new(&self.config);
        let file_name = planner.file_name(plan);
        planner.render(plan, &file_name)
    }

    /// Write a migration plan into the migrations directory
    pub fn write_migration(&self, plan: &MigrationPlan) -> Result<PathBuf> {
        MigrationPlanner::new(&self.config).write(plan)
    }

    /// Analyze a query string for index opportunities
    pub fn analyze_query(&self, query: &str) -> Vec<QueryRecommendation> {
        QueryAdvisor::new(&self.config.naming).analyze(query)
    }
}
