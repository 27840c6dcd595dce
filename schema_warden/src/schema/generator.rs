//! Table and policy scaffolding
//!
//! Generates CREATE TABLE scaffolds (UUID primary key, audit columns,
//! `updated_at` trigger, comments) and per-table row level security policy
//! sets, driven by the `[scaffold]` and `[naming]` config sections.

use chrono::Local;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::utils::naming::{escape_sql_keyword, get_policy_name, get_table_name, sanitize_identifier};

/// A requested column for a table scaffold
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    pub unique: bool,
    pub comment: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            default: None,
            unique: false,
            comment: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }
}

/// Scaffold SQL generator
pub struct ScaffoldGenerator<'a> {
    config: &'a Config,
}

impl<'a> ScaffoldGenerator<'a> {
    /// Create a new scaffold generator
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Generate a complete CREATE TABLE scaffold for an entity
    pub fn generate_table_sql(
        &self,
        entity_name: &str,
        purpose: &str,
        columns: &[ColumnSpec],
    ) -> Result<String> {
        if entity_name.trim().is_empty() {
            return Err(Error::ScaffoldError("entity name must not be empty".to_string()));
        }

        let naming = &self.config.naming;
        let scaffold = &self.config.scaffold;
        let table_name = sanitize_identifier(&get_table_name(
            entity_name,
            &naming.table_style,
            naming.pluralize_tables,
        ));

        let mut sql = banner(&[
            &format!("Table: {}", table_name),
            &format!("Purpose: {}", purpose),
            &format!("Created: {}", Local::now().format("%Y-%m-%d %H:%M")),
        ]);
        sql.push('\n');

        sql.push_str(&format!("CREATE TABLE {} (\n", table_name));

        let mut column_defs = Vec::new();
        if scaffold.uuid_primary_key {
            column_defs.push("  id UUID PRIMARY KEY DEFAULT gen_random_uuid()".to_string());
        }
        for column in columns {
            column_defs.push(format!("  {}", self.format_column(column)));
        }
        if scaffold.audit_columns {
            column_defs.push(
                "\n  -- Audit fields\n  created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".to_string(),
            );
            column_defs.push("  updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".to_string());
            if scaffold.soft_delete {
                column_defs.push("  deleted_at TIMESTAMPTZ".to_string());
            }
        }

        sql.push_str(&column_defs.join(",\n"));
        sql.push_str("\n);\n");

        if scaffold.audit_columns && scaffold.updated_at_trigger {
            sql.push_str("\n-- Trigger: keep updated_at current\n");
            sql.push_str(&format!("CREATE TRIGGER update_{}_updated_at\n", table_name));
            sql.push_str(&format!("  BEFORE UPDATE ON {}\n", table_name));
            sql.push_str("  FOR EACH ROW\n");
            sql.push_str("  EXECUTE FUNCTION update_updated_at_column();\n");
        }

        if scaffold.table_comments {
            sql.push_str(&format!(
                "\nCOMMENT ON TABLE {} IS '{}';\n",
                table_name,
                purpose.replace('\'', "''")
            ));

            for column in columns {
                if let Some(comment) = &column.comment {
                    sql.push_str(&format!(
                        "COMMENT ON COLUMN {}.{} IS '{}';\n",
                        table_name,
                        escape_sql_keyword(&column.name),
                        comment.replace('\'', "''")
                    ));
                }
            }
        }

        Ok(sql)
    }

    /// Generate the owner-isolation RLS policy set for a table
    ///
    /// Four CRUD policies scoped to `auth.uid() = {user_id_column}` plus a
    /// service-role bypass for background jobs, then the matching grants.
    pub fn generate_rls_sql(&self, table_name: &str, user_id_column: &str) -> Result<String> {
        if table_name.trim().is_empty() {
            return Err(Error::ScaffoldError("table name must not be empty".to_string()));
        }

        let pattern = &self.config.naming.policy_pattern;
        let table = sanitize_identifier(table_name);
        let column = escape_sql_keyword(user_id_column);
        let owner = format!("auth.uid() = {}", column);

        let mut sql = banner(&[
            &format!("RLS Policies for {}", table),
            "Pattern: User Isolation (users can only access their own data)",
        ]);
        sql.push('\n');
        sql.push_str(&format!(
            "-- Enable RLS\nALTER TABLE {} ENABLE ROW LEVEL SECURITY;\n\n",
            table
        ));

        sql.push_str(&policy_block(
            "Users can view own data",
            &get_policy_name(pattern, &table, "select"),
            &table,
            &format!("FOR SELECT\n  TO authenticated\n  USING ({})", owner),
        ));
        sql.push_str(&policy_block(
            "Users can insert own data",
            &get_policy_name(pattern, &table, "insert"),
            &table,
            &format!("FOR INSERT\n  TO authenticated\n  WITH CHECK ({})", owner),
        ));
        sql.push_str(&policy_block(
            "Users can update own data",
            &get_policy_name(pattern, &table, "update"),
            &table,
            &format!(
                "FOR UPDATE\n  TO authenticated\n  USING ({})\n  WITH CHECK ({})",
                owner, owner
            ),
        ));
        sql.push_str(&policy_block(
            "Users can delete own data",
            &get_policy_name(pattern, &table, "delete"),
            &table,
            &format!("FOR DELETE\n  TO authenticated\n  USING ({})", owner),
        ));
        sql.push_str(&policy_block(
            "Service role has full access (for background jobs)",
            &format!("{}_service_role_all", table),
            &table,
            "FOR ALL\n  TO service_role\n  USING (true)\n  WITH CHECK (true)",
        ));

        sql.push_str("-- Grant permissions\n");
        sql.push_str(&format!(
            "GRANT SELECT, INSERT, UPDATE, DELETE ON {} TO authenticated;\n",
            table
        ));
        sql.push_str(&format!("GRANT ALL ON {} TO service_role;\n", table));

        Ok(sql)
    }

    /// Format a single column definition
    fn format_column(&self, column: &ColumnSpec) -> String {
        let mut def = format!(
            "{} {}",
            escape_sql_keyword(&sanitize_identifier(&column.name)),
            column.data_type
        );

        if column.unique {
            def.push_str(" UNIQUE");
        }
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", default));
        }

        def
    }
}

fn banner(lines: &[&str]) -> String {
    const RULE: &str =
        "-- ============================================================================\n";

    let mut out = String::from(RULE);
    for line in lines {
        out.push_str(&format!("-- {}\n", line));
    }
    out.push_str(RULE);
    out
}

fn policy_block(comment: &str, name: &str, table: &str, body: &str) -> String {
    format!(
        "-- Policy: {}\nCREATE POLICY \"{}\"\n  ON {}\n  {};\n\n",
        comment, name, table, body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_scaffold_has_pk_audit_trigger_and_comment() {
        let config = Config::default();
        let generator = ScaffoldGenerator::new(&config);

        let columns = vec![
            ColumnSpec::new("email", "TEXT").not_null().unique(),
            ColumnSpec::new("display_name", "VARCHAR(120)").comment("Shown in the UI"),
        ];
        let sql = generator
            .generate_table_sql("user_profile", "Registered user profiles", &columns)
            .unwrap();

        assert!(sql.contains("CREATE TABLE user_profile (\n"));
        assert!(sql.contains("  id UUID PRIMARY KEY DEFAULT gen_random_uuid(),\n"));
        assert!(sql.contains("  email TEXT UNIQUE NOT NULL,\n"));
        assert!(sql.contains("  -- Audit fields\n"));
        assert!(sql.contains("  created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),\n"));
        assert!(sql.contains("  deleted_at TIMESTAMPTZ\n);\n"));
        assert!(sql.contains("CREATE TRIGGER update_user_profile_updated_at\n"));
        assert!(sql.contains("  EXECUTE FUNCTION update_updated_at_column();\n"));
        assert!(sql.contains("COMMENT ON TABLE user_profile IS 'Registered user profiles';\n"));
        assert!(sql.contains("COMMENT ON COLUMN user_profile.display_name IS 'Shown in the UI';\n"));
    }

    #[test]
    fn scaffold_flags_remove_their_sections() {
        let mut config = Config::default();
        config.scaffold.uuid_primary_key = false;
        config.scaffold.audit_columns = false;
        config.scaffold.table_comments = false;
        let generator = ScaffoldGenerator::new(&config);

        let sql = generator
            .generate_table_sql("settings", "Feature flags", &[ColumnSpec::new("key", "TEXT")])
            .unwrap();

        assert!(!sql.contains("gen_random_uuid"));
        assert!(!sql.contains("created_at"));
        assert!(!sql.contains("CREATE TRIGGER"));
        assert!(!sql.contains("COMMENT ON"));
        assert!(sql.contains("CREATE TABLE settings (\n  key TEXT\n);\n"));
    }

    #[test]
    fn soft_delete_flag_controls_deleted_at() {
        let mut config = Config::default();
        config.scaffold.soft_delete = false;
        let generator = ScaffoldGenerator::new(&config);

        let sql = generator.generate_table_sql("jobs", "Background jobs", &[]).unwrap();
        assert!(sql.contains("updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()\n);\n"));
        assert!(!sql.contains("deleted_at"));
    }

    #[test]
    fn pluralized_table_names() {
        let mut config = Config::default();
        config.naming.pluralize_tables = true;
        let generator = ScaffoldGenerator::new(&config);

        let sql = generator.generate_table_sql("UserProfile", "Profiles", &[]).unwrap();
        assert!(sql.contains("CREATE TABLE user_profiles ("));
    }

    #[test]
    fn empty_entity_name_is_rejected() {
        let config = Config::default();
        let generator = ScaffoldGenerator::new(&config);
        let err = generator.generate_table_sql("  ", "Nothing", &[]).unwrap_err();
        assert!(matches!(err, Error::ScaffoldError(_)));
    }

    #[test]
    fn rls_policy_set_is_complete() {
        let config = Config::default();
        let generator = ScaffoldGenerator::new(&config);

        let sql = generator.generate_rls_sql("documents", "owner_id").unwrap();

        assert!(sql.contains("ALTER TABLE documents ENABLE ROW LEVEL SECURITY;"));
        assert!(sql.contains("CREATE POLICY \"documents_select_own\""));
        assert!(sql.contains("CREATE POLICY \"documents_insert_own\""));
        assert!(sql.contains("CREATE POLICY \"documents_update_own\""));
        assert!(sql.contains("CREATE POLICY \"documents_delete_own\""));
        assert!(sql.contains("CREATE POLICY \"documents_service_role_all\""));
        assert!(sql.contains("USING (auth.uid() = owner_id)"));
        assert!(sql.contains("WITH CHECK (auth.uid() = owner_id)"));
        assert!(sql.contains("GRANT SELECT, INSERT, UPDATE, DELETE ON documents TO authenticated;"));
        assert!(sql.contains("GRANT ALL ON documents TO service_role;"));
    }

    #[test]
    fn keyword_columns_are_quoted() {
        let config = Config::default();
        let generator = ScaffoldGenerator::new(&config);

        let sql = generator
            .generate_table_sql("grants", "Grant records", &[ColumnSpec::new("order", "INT")])
            .unwrap();
        assert!(sql.contains("  \"order\" INT,\n"));
    }

    #[test]
    fn rls_rejects_empty_table() {
        let config = Config::default();
        let generator = ScaffoldGenerator::new(&config);
        assert!(generator.generate_rls_sql("", "user_id").is_err());
    }
}
