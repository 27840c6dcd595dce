//! Offline integrity checks
//!
//! Cross-checks the replayed catalog without touching a server: foreign
//! keys that point at missing tables or columns, tables without a primary
//! key, row level security coverage gaps, and foreign key columns no index
//! covers.

use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::migration::report::{Advisory, AdvisoryLevel};
use crate::schema::types::DatabaseSchema;

/// Outcome of an integrity check over the whole catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub findings: Vec<Advisory>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Whether any finding is severe enough to fail the check
    pub fn has_blockers(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.level == AdvisoryLevel::Blocker)
    }

    /// Render the report for terminal output
    pub fn render_text(&self) -> String {
        let mut out = String::from("Database integrity report\n");
        out.push_str(&"=".repeat(50));
        out.push('\n');

        if self.findings.is_empty() {
            out.push_str("All checks passed.\n");
            return out;
        }

        for finding in &self.findings {
            out.push_str(&format!("[{}] {}\n", finding.level, finding.message));
            if let Some(suggestion) = &finding.suggestion {
                out.push_str(&format!("    suggestion: {}\n", suggestion));
            }
        }

        out.push_str(&format!("\n{} findings\n", self.findings.len()));
        out
    }
}

/// Catalog integrity checker
pub struct IntegrityChecker<'a> {
    policy: &'a PolicyConfig,
}

impl<'a> IntegrityChecker<'a> {
    /// Create a new integrity checker
    pub fn new(policy: &'a PolicyConfig) -> Self {
        Self { policy }
    }

    /// Run every check against the catalog
    pub fn check(&self, schema: &DatabaseSchema) -> IntegrityReport {
        let mut findings = Vec::new();

        self.check_foreign_keys(schema, &mut findings);
        self.check_primary_keys(schema, &mut findings);
        self.check_rls_coverage(schema, &mut findings);
        self.check_foreign_key_indexes(schema, &mut findings);

        IntegrityReport { findings }
    }

    fn check_foreign_keys(&self, schema: &DatabaseSchema, findings: &mut Vec<Advisory>) {
        for table in schema.tables.values() {
            for fk in &table.foreign_keys {
                let Some(target) = schema.table(&fk.ref_table) else {
                    findings.push(
                        Advisory::blocker(&format!(
                            "foreign key {}({}) references missing table {}",
                            table.name,
                            fk.columns.join(", "),
                            fk.ref_table
                        ))
                        .with_suggestion("create the referenced table first or drop the constraint"),
                    );
                    continue;
                };

                for ref_column in &fk.ref_columns {
                    if target.column(ref_column).is_none() {
                        findings.push(Advisory::blocker(&format!(
                            "foreign key {}({}) references missing column {}.{}",
                            table.name,
                            fk.columns.join(", "),
                            fk.ref_table,
                            ref_column
                        )));
                    }
                }
            }
        }
    }

    fn check_primary_keys(&self, schema: &DatabaseSchema, findings: &mut Vec<Advisory>) {
        for table in schema.tables.values() {
            if table.primary_key.is_none() {
                findings.push(
                    Advisory::warning(&format!("table {} has no primary key", table.name))
                        .with_suggestion("add a primary key; upserts and replication depend on one"),
                );
            }
        }
    }

    fn check_rls_coverage(&self, schema: &DatabaseSchema, findings: &mut Vec<Advisory>) {
        if !self.policy.require_rls {
            return;
        }

        for table in schema.tables.values() {
            if self.policy.rls_exempt.contains(&table.name) {
                continue;
            }

            if !table.rls_enabled {
                findings.push(
                    Advisory::warning(&format!(
                        "table {} does not enable row level security",
                        table.name
                    ))
                    .with_suggestion(&format!(
                        "ALTER TABLE {} ENABLE ROW LEVEL SECURITY; then add policies",
                        table.name
                    )),
                );
            } else if table.policies.is_empty() {
                // RLS with zero policies denies every non-owner query
                findings.push(
                    Advisory::warning(&format!(
                        "table {} enables row level security but has no policies",
                        table.name
                    ))
                    .with_suggestion("add CREATE POLICY statements or access is denied entirely"),
                );
            }
        }
    }

    fn check_foreign_key_indexes(&self, schema: &DatabaseSchema, findings: &mut Vec<Advisory>) {
        for table in schema.tables.values() {
            for fk in &table.foreign_keys {
                let Some(leading) = fk.columns.first() else {
                    continue;
                };

                if !table.has_index_on(leading) {
                    findings.push(
                        Advisory::info(&format!(
                            "foreign key column {}.{} has no covering index",
                            table.name, leading
                        ))
                        .with_suggestion(&format!(
                            "CREATE INDEX CONCURRENTLY idx_{}_{} ON {}({});",
                            table.name, leading, table.name, leading
                        )),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog;

    fn checker_findings(policy: &PolicyConfig, sql: &str) -> Vec<Advisory> {
        let mut schema = DatabaseSchema::new();
        catalog::apply_script(&mut schema, sql);
        IntegrityChecker::new(policy).check(&schema).findings
    }

    #[test]
    fn clean_catalog_passes() {
        let policy = PolicyConfig::default();
        let sql = r#"
            CREATE TABLE users (id UUID PRIMARY KEY);
            ALTER TABLE users ENABLE ROW LEVEL SECURITY;
            CREATE POLICY users_select_own ON users FOR SELECT USING (auth.uid() = id);
        "#;

        let findings = checker_findings(&policy, sql);
        assert!(findings.is_empty());
    }

    #[test]
    fn dangling_foreign_key_table_is_a_blocker() {
        let policy = PolicyConfig {
            require_rls: false,
            ..PolicyConfig::default()
        };
        let sql = r#"
            CREATE TABLE posts (
                id UUID PRIMARY KEY,
                author_id UUID REFERENCES users(id)
            );
            CREATE INDEX idx_posts_author_id ON posts (author_id);
        "#;

        let findings = checker_findings(&policy, sql);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, AdvisoryLevel::Blocker);
        assert!(findings[0].message.contains("missing table users"));
    }

    #[test]
    fn dangling_foreign_key_column_is_a_blocker() {
        let policy = PolicyConfig {
            require_rls: false,
            ..PolicyConfig::default()
        };
        let sql = r#"
            CREATE TABLE users (id UUID PRIMARY KEY);
            CREATE TABLE posts (
                id UUID PRIMARY KEY,
                author_id UUID,
                CONSTRAINT fk_posts_author FOREIGN KEY (author_id) REFERENCES users (uid)
            );
            CREATE INDEX idx_posts_author_id ON posts (author_id);
        "#;

        let findings = checker_findings(&policy, sql);
        assert!(findings
            .iter()
            .any(|f| f.level == AdvisoryLevel::Blocker && f.message.contains("users.uid")));
    }

    #[test]
    fn missing_primary_key_is_a_warning() {
        let policy = PolicyConfig {
            require_rls: false,
            ..PolicyConfig::default()
        };
        let findings = checker_findings(&policy, "CREATE TABLE log_lines (line TEXT);");

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, AdvisoryLevel::Warning);
        assert!(findings[0].message.contains("no primary key"));
    }

    #[test]
    fn rls_gaps_and_empty_policy_sets_are_flagged() {
        let policy = PolicyConfig::default();
        let sql = r#"
            CREATE TABLE open_table (id UUID PRIMARY KEY);
            CREATE TABLE locked_table (id UUID PRIMARY KEY);
            ALTER TABLE locked_table ENABLE ROW LEVEL SECURITY;
        "#;

        let findings = checker_findings(&policy, sql);
        assert!(findings
            .iter()
            .any(|f| f.message == "table open_table does not enable row level security"));
        assert!(findings
            .iter()
            .any(|f| f.message == "table locked_table enables row level security but has no policies"));
    }

    #[test]
    fn rls_exempt_tables_are_skipped() {
        let policy = PolicyConfig {
            rls_exempt: vec!["merchant_database".to_string()],
            ..PolicyConfig::default()
        };
        let findings = checker_findings(&policy, "CREATE TABLE merchant_database (id UUID PRIMARY KEY);");
        assert!(findings.is_empty());
    }

    #[test]
    fn unindexed_foreign_key_is_informational() {
        let policy = PolicyConfig {
            require_rls: false,
            ..PolicyConfig::default()
        };
        let sql = r#"
            CREATE TABLE users (id UUID PRIMARY KEY);
            CREATE TABLE posts (
                id UUID PRIMARY KEY,
                author_id UUID REFERENCES users(id)
            );
        "#;

        let findings = checker_findings(&policy, sql);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].level, AdvisoryLevel::Info);
        assert!(findings[0].message.contains("posts.author_id has no covering index"));
        assert_eq!(
            findings[0].suggestion.as_deref(),
            Some("CREATE INDEX CONCURRENTLY idx_posts_author_id ON posts(author_id);")
        );
    }

    #[test]
    fn report_rendering_and_blocker_detection() {
        let policy = PolicyConfig::default();
        let report = IntegrityChecker::new(&policy).check(&DatabaseSchema::new());
        assert!(report.is_clean());
        assert!(!report.has_blockers());
        assert!(report.render_text().contains("All checks passed."));
    }
}
