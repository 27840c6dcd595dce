//! Tests for SchemaWarden
//!
//! End-to-end tests driving the library facade the way the CLI does,
//! from configuration through validation, scaffolding and reporting.

#[cfg(test)]
mod tests {
    use std::fs;
    use tempfile::tempdir;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::migration::plan::MigrationPlan;
    use crate::schema::generator::ColumnSpec;
    use crate::{
        ChangeOperation, Config, DestructiveOverride, SchemaChange, SchemaWarden, VerdictStatus,
    };

    fn test_config() -> Config {
        let config_str = r###"
        [migrations]
        directory = "./migrations"
        wrap_in_transaction = true

        [policy]
        allow_destructive = true
        require_concurrent_indexes = true
        require_rls = true
        rls_exempt = ["schema_migrations"]
        large_table_threshold = 100000

        [scaffold]
        uuid_primary_key = true
        audit_columns = true
        soft_delete = true
        updated_at_trigger = true
        table_comments = true

        [naming]
        table_style = "snake_case"
        pluralize_tables = false
        index_pattern = "idx_{table}_{columns}"
        constraint_pattern = "fk_{table}_{column}"
        policy_pattern = "{table}_{action}_own"
        "###;

        toml::from_str(config_str).expect("failed to parse test config")
    }

    fn warden_with_migrations_dir(dir: &std::path::Path) -> SchemaWarden {
        let mut config = test_config();
        config.migrations.directory = dir.to_string_lossy().to_string();
        SchemaWarden::new(config)
    }

    #[test]
    fn config_loading() {
        let config = test_config();

        assert_eq!(config.migrations.directory, "./migrations");
        assert!(config.policy.allow_destructive);
        assert_eq!(config.policy.large_table_threshold, 100_000);
        assert_eq!(config.policy.rls_exempt, vec!["schema_migrations"]);
        assert_eq!(config.naming.policy_pattern, "{table}_{action}_own");
    }

    #[test]
    fn classify_change_described_as_json() {
        let warden = SchemaWarden::new(test_config());
        let change = SchemaChange::from_json(
            r#"{"operation": "add_column", "target_table": "transactions",
                "nullable": true, "has_default": false}"#,
        )
        .unwrap();

        let verdict = warden.classify_change(&change).unwrap();
        assert_eq!(verdict.status, VerdictStatus::Approved);
    }

    #[test]
    fn facade_override_downgrades_a_blocked_drop() {
        let warden = SchemaWarden::new(test_config());
        let change = SchemaChange::new(ChangeOperation::DropColumn, "accounts").column("legacy_id");
        let ov = DestructiveOverride::new("column unused since the 2025-06 backfill");

        let blocked = warden.classify_change(&change).unwrap();
        assert_eq!(blocked.status, VerdictStatus::Blocked);

        let downgraded = warden.classify_with_override(&change, Some(&ov)).unwrap();
        assert_eq!(downgraded.status, VerdictStatus::NeedsReview);
        assert!(downgraded.reasons[1].contains("2025-06 backfill"));
    }

    #[test]
    fn validate_script_reports_mixed_outcomes() {
        let warden = SchemaWarden::new(test_config());
        let sql = "CREATE TABLE invoices (\n\
                       id uuid PRIMARY KEY DEFAULT gen_random_uuid(),\n\
                       amount numeric(12,2) NOT NULL\n\
                   );\n\
                   ALTER TABLE invoices ENABLE ROW LEVEL SECURITY;\n\
                   CREATE POLICY invoices_select_own ON invoices FOR SELECT USING (user_id = auth.uid());\n\
                   ALTER TABLE accounts DROP COLUMN legacy_id;\n\
                   -- DOWN\n\
                   DROP TABLE invoices;";

        let report = warden.validate_script(sql, Some("mixed.sql"), 0).unwrap();

        assert_eq!(report.summary.approved, 1);
        assert_eq!(report.summary.blocked, 1);
        assert_eq!(report.overall(), VerdictStatus::Blocked);
        assert!(!report.is_passing());

        let text = report.render_text();
        assert!(text.contains("mixed.sql"));
        assert!(text.contains("[BLOCKED] DROP COLUMN accounts.legacy_id"));
        assert!(text.contains("VERDICT: BLOCKED"));
    }

    #[test]
    fn validate_file_resolves_types_from_earlier_migrations() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("20250101000000_create_transactions.sql");
        let second = dir.path().join("20250102000000_narrow_amount.sql");

        fs::write(
            &first,
            "CREATE TABLE transactions (\n\
                 id uuid PRIMARY KEY DEFAULT gen_random_uuid(),\n\
                 amount bigint NOT NULL\n\
             );\n\
             ALTER TABLE transactions ENABLE ROW LEVEL SECURITY;\n\
             CREATE POLICY transactions_select_own ON transactions FOR SELECT USING (user_id = auth.uid());\n\
             -- DOWN\n\
             DROP TABLE transactions;",
        )
        .unwrap();
        fs::write(
            &second,
            "ALTER TABLE transactions ALTER COLUMN amount TYPE integer;\n\
             -- DOWN\n\
             ALTER TABLE transactions ALTER COLUMN amount TYPE bigint;",
        )
        .unwrap();

        let warden = warden_with_migrations_dir(dir.path());

        // The earlier migration is replayed, so the narrowing is visible.
        let report = warden.validate_file(&second, 500_000).unwrap();
        assert_eq!(report.summary.blocked, 1);
        let verdict = &report.changes[0].verdict;
        assert_eq!(verdict.reasons, vec!["potential data truncation".to_string()]);

        // The first file sees no prior catalog and stays clean.
        let report = warden.validate_file(&first, 0).unwrap();
        assert_eq!(report.overall(), VerdictStatus::Approved);
        assert!(report.is_passing());
    }

    #[rstest]
    #[case(50_000, "5-15 seconds")]
    #[case(2_000_000, "1-5 minutes")]
    fn index_runtime_scales_with_row_count(#[case] rows: u64, #[case] expected: &str) {
        let warden = SchemaWarden::new(test_config());
        let report = warden
            .validate_script(
                "CREATE INDEX CONCURRENTLY idx_users_email ON users (email);",
                None,
                rows,
            )
            .unwrap();

        assert_eq!(report.changes[0].estimated_runtime, expected);
    }

    #[test]
    fn write_migration_produces_checklist_file() {
        let dir = tempdir().unwrap();
        let warden = warden_with_migrations_dir(dir.path());

        let plan = MigrationPlan::new(
            "add invoice notes",
            "ALTER TABLE invoices ADD COLUMN notes text;",
            "ALTER TABLE invoices DROP COLUMN notes;",
        );
        let path = warden.write_migration(&plan).unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with("_add_invoice_notes.sql"));

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("SAFETY CHECKLIST"));
        assert!(content.contains("Is this migration additive? YES"));
        assert!(content.contains("-- UP MIGRATION"));
        assert!(content.contains("-- DOWN MIGRATION (ROLLBACK)"));
        assert!(content.contains("BEGIN;"));
    }

    #[test]
    fn erd_renders_catalog_relationships() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("20250101000000_initial.sql"),
            "CREATE TABLE users (\n\
                 id uuid PRIMARY KEY DEFAULT gen_random_uuid(),\n\
                 email text NOT NULL\n\
             );\n\
             CREATE TABLE posts (\n\
                 id uuid PRIMARY KEY,\n\
                 user_id uuid NOT NULL REFERENCES users(id)\n\
             );",
        )
        .unwrap();

        let warden = warden_with_migrations_dir(dir.path());
        let document = warden.render_erd("Database ERD").unwrap();

        assert!(document.starts_with("# Database ERD"));
        assert!(document.contains("```mermaid"));
        assert!(document.contains("erDiagram"));
        assert!(document.contains("    USERS {"));
        assert!(document.contains("        uuid id PK"));
        assert!(document.contains("    USERS ||--o{ POSTS : \"user_id\""));
    }

    #[test]
    fn integrity_check_flags_dangling_foreign_key() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("20250101000000_orders.sql"),
            "CREATE TABLE orders (\n\
                 id uuid PRIMARY KEY,\n\
                 customer_id uuid REFERENCES customers(id)\n\
             );",
        )
        .unwrap();

        let warden = warden_with_migrations_dir(dir.path());
        let report = warden.check_integrity().unwrap();

        assert!(report.has_blockers());
        assert!(report
            .findings
            .iter()
            .any(|f| f.message.contains("missing table customers")));
    }

    #[test]
    fn scaffold_includes_audit_fields_and_trigger() {
        let warden = SchemaWarden::new(test_config());
        let columns = vec![ColumnSpec::new("amount", "numeric(12,2)").not_null()];

        let sql = warden
            .scaffold_table("Invoice", "billing records", &columns)
            .unwrap();

        assert!(sql.contains("CREATE TABLE invoice"));
        assert!(sql.contains("id UUID PRIMARY KEY DEFAULT gen_random_uuid()"));
        assert!(sql.contains("created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
        assert!(sql.contains("update_invoice_updated_at"));
        assert!(sql.contains("COMMENT ON TABLE invoice IS 'billing records';"));
    }

    #[test]
    fn rls_policy_set_follows_naming_pattern() {
        let warden = SchemaWarden::new(test_config());
        let sql = warden.rls_policies("invoices", "user_id").unwrap();

        assert!(sql.contains("ALTER TABLE invoices ENABLE ROW LEVEL SECURITY;"));
        assert!(sql.contains("CREATE POLICY \"invoices_select_own\""));
        assert!(sql.contains("CREATE POLICY \"invoices_insert_own\""));
        assert!(sql.contains("CREATE POLICY \"invoices_update_own\""));
        assert!(sql.contains("CREATE POLICY \"invoices_delete_own\""));
        assert!(sql.contains("CREATE POLICY \"invoices_service_role_all\""));
        assert!(sql.contains("GRANT"));
    }

    #[test]
    fn report_serializes_for_machine_consumption() {
        let warden = SchemaWarden::new(test_config());
        let report = warden
            .validate_script("ALTER TABLE users DROP COLUMN ssn;", None, 0)
            .unwrap();

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"blocked\""));
        assert!(json.contains("irreversible removal"));
    }
}
