//! Offline schema catalog
//!
//! Rebuilds the current shape of the database by replaying migration
//! scripts in file name order, without connecting to a server. Timestamped
//! file names make lexicographic order the application order. Statements
//! the replay does not understand are skipped; the catalog is a best-effort
//! mirror for rendering and cross-checks, not an executor.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::migration::parser::{clean_ident, flatten, split_actions, split_statements, up_section};
use crate::schema::types::{
    Column, Constraint, DatabaseSchema, ForeignKey, Index, PrimaryKey, Table,
};

static RE_CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?("?[\w.]+"?)"#).unwrap()
});
static RE_DROP_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?("?[\w.]+"?)"#).unwrap());
static RE_CREATE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^CREATE\s+(UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?("?[\w.]+"?\s+)?ON\s+(?:ONLY\s+)?("?[\w.]+"?)\s*(?:USING\s+\w+\s*)?\((.+?)\)"#,
    )
    .unwrap()
});
static RE_DROP_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^DROP\s+INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+EXISTS\s+)?("?[\w.]+"?)"#).unwrap()
});
static RE_CREATE_POLICY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^CREATE\s+POLICY\s+("?\w+"?)\s+ON\s+("?[\w.]+"?)"#).unwrap());
static RE_DROP_POLICY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^DROP\s+POLICY\s+(?:IF\s+EXISTS\s+)?("?\w+"?)\s+ON\s+("?[\w.]+"?)"#).unwrap()
});
static RE_ALTER_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?("?[\w.]+"?)\s+(.+)$"#).unwrap()
});
static RE_COMMENT_ON_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^COMMENT\s+ON\s+TABLE\s+("?[\w.]+"?)\s+IS\s+'((?:[^']|'')*)'"#).unwrap()
});

// ALTER TABLE actions
static RE_ADD_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^ADD\s+CONSTRAINT\s+("?\w+"?)\s+(.+)$"#).unwrap());
static RE_DROP_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^DROP\s+CONSTRAINT\s+(?:IF\s+EXISTS\s+)?("?\w+"?)"#).unwrap());
static RE_ADD_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^ADD\s+(?:COLUMN\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(.+)$"#).unwrap()
});
static RE_DROP_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^DROP\s+(?:COLUMN\s+)?(?:IF\s+EXISTS\s+)?("?\w+"?)"#).unwrap()
});
static RE_RENAME_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^RENAME\s+TO\s+("?\w+"?)"#).unwrap());
static RE_RENAME_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^RENAME\s+(?:COLUMN\s+)?("?\w+"?)\s+TO\s+("?\w+"?)"#).unwrap()
});
static RE_ALTER_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^ALTER\s+(?:COLUMN\s+)?("?\w+"?)\s+(?:SET\s+DATA\s+)?TYPE\s+(.+?)(?:\s+USING\s+.+)?$"#)
        .unwrap()
});
static RE_SET_NOT_NULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^ALTER\s+(?:COLUMN\s+)?("?\w+"?)\s+SET\s+NOT\s+NULL"#).unwrap());
static RE_DROP_NOT_NULL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^ALTER\s+(?:COLUMN\s+)?("?\w+"?)\s+DROP\s+NOT\s+NULL"#).unwrap());
static RE_SET_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^ALTER\s+(?:COLUMN\s+)?("?\w+"?)\s+SET\s+DEFAULT\s+(.+)$"#).unwrap()
});
static RE_DROP_DEFAULT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^ALTER\s+(?:COLUMN\s+)?("?\w+"?)\s+DROP\s+DEFAULT"#).unwrap());
static RE_ENABLE_RLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^ENABLE\s+ROW\s+LEVEL\s+SECURITY"#).unwrap());
static RE_DISABLE_RLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^DISABLE\s+ROW\s+LEVEL\s+SECURITY"#).unwrap());

// Constraint and column definition pieces
static RE_PRIMARY_KEY_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^PRIMARY\s+KEY\s*\((.+?)\)"#).unwrap());
static RE_FOREIGN_KEY_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^FOREIGN\s+KEY\s*\((.+?)\)\s+REFERENCES\s+("?[\w.]+"?)\s*(?:\((.+?)\))?"#)
        .unwrap()
});
static RE_UNIQUE_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)^UNIQUE\s*\((.+?)\)"#).unwrap());
static RE_NAMED_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^CONSTRAINT\s+("?\w+"?)\s+(.+)$"#).unwrap());
static RE_COLUMN_TYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?ix)^(
              double\s+precision
            | character\s+varying (?:\s*\(\d+\))?
            | character (?:\s*\(\d+\))?
            | bit\s+varying (?:\s*\(\d+\))?
            | timestamp (?:\s*\(\d+\))? (?:\s+with(?:out)?\s+time\s+zone)?
            | time (?:\s*\(\d+\))? (?:\s+with(?:out)?\s+time\s+zone)?
            | \w+ (?:\s*\(\s*\d+\s*(?:,\s*\d+\s*)?\))?
        )"#,
    )
    .unwrap()
});
static RE_NOT_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bNOT\s+NULL\b"#).unwrap());
static RE_DEFAULT_EXPR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bDEFAULT\s+('(?:[^']|'')*'|\w+(?:\s*\([^)]*\))?|[^,\s]+)"#).unwrap()
});
static RE_INLINE_PRIMARY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bPRIMARY\s+KEY\b"#).unwrap());
static RE_INLINE_UNIQUE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bUNIQUE\b"#).unwrap());
static RE_INLINE_REFERENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bREFERENCES\s+("?[\w.]+"?)\s*(?:\(("?\w+"?)\))?"#).unwrap()
});

/// Replay every `.sql` file under `dir` into a schema
pub fn load_dir(dir: &Path) -> Result<DatabaseSchema> {
    load_dir_inner(dir, None)
}

/// Replay only the files that sort strictly before `stop_file`
///
/// Used to reconstruct the schema as it stands right before a given
/// migration runs.
pub fn load_dir_before(dir: &Path, stop_file: &str) -> Result<DatabaseSchema> {
    load_dir_inner(dir, Some(stop_file))
}

fn load_dir_inner(dir: &Path, stop_file: Option<&str>) -> Result<DatabaseSchema> {
    if !dir.is_dir() {
        return Err(Error::CatalogError(format!(
            "migrations directory not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<(String, std::path::PathBuf)> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path().is_file() && e.path().extension().map_or(false, |ext| ext == "sql")
        })
        .map(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            (name, e.path().to_path_buf())
        })
        .collect();

    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut schema = DatabaseSchema::new();
    for (name, path) in files {
        if let Some(stop) = stop_file {
            if name.as_str() >= stop {
                continue;
            }
        }
        let sql = fs::read_to_string(&path)?;
        tracing::debug!(file = %name, "replaying migration");
        apply_script(&mut schema, &sql);
    }

    Ok(schema)
}

/// Apply the forward section of one script to the schema
pub fn apply_script(schema: &mut DatabaseSchema, sql: &str) {
    for statement in split_statements(up_section(sql)) {
        apply_statement(schema, &flatten(&statement));
    }
}

fn apply_statement(schema: &mut DatabaseSchema, flat: &str) {
    if RE_CREATE_TABLE.is_match(flat) {
        if let Some(table) = parse_create_table(flat) {
            schema.add_table(table);
        }
        return;
    }

    if let Some(caps) = RE_DROP_TABLE.captures(flat) {
        schema.remove_table(&clean_ident(&caps[1]));
        return;
    }

    if let Some(caps) = RE_CREATE_INDEX.captures(flat) {
        let is_unique = caps.get(1).is_some();
        let table_name = clean_ident(&caps[3]);
        let columns: Vec<String> = split_actions(&caps[4])
            .iter()
            .map(|c| clean_ident(c))
            .collect();
        let name = match caps.get(2) {
            Some(m) => clean_ident(m.as_str()),
            None => format!(
                "{}_{}_idx",
                table_name,
                columns.first().map(String::as_str).unwrap_or("expr")
            ),
        };

        if let Some(table) = schema.table_mut(&table_name) {
            table.add_index(Index {
                name,
                columns,
                is_unique,
            });
        }
        return;
    }

    if let Some(caps) = RE_DROP_INDEX.captures(flat) {
        let name = clean_ident(&caps[1]);
        for table in schema.tables.values_mut() {
            table.indexes.retain(|ix| ix.name != name);
        }
        return;
    }

    if let Some(caps) = RE_CREATE_POLICY.captures(flat) {
        let policy = clean_ident(&caps[1]);
        let table_name = clean_ident(&caps[2]);
        if let Some(table) = schema.table_mut(&table_name) {
            table.policies.push(policy);
        }
        return;
    }

    if let Some(caps) = RE_DROP_POLICY.captures(flat) {
        let policy = clean_ident(&caps[1]);
        let table_name = clean_ident(&caps[2]);
        if let Some(table) = schema.table_mut(&table_name) {
            table.policies.retain(|p| p != &policy);
        }
        return;
    }

    if let Some(caps) = RE_COMMENT_ON_TABLE.captures(flat) {
        let table_name = clean_ident(&caps[1]);
        let comment = caps[2].replace("''", "'");
        if let Some(table) = schema.table_mut(&table_name) {
            table.comment = Some(comment);
        }
        return;
    }

    if let Some(caps) = RE_ALTER_TABLE.captures(flat) {
        let table_name = clean_ident(&caps[1]);
        for action in split_actions(caps[2].trim()) {
            apply_alter_action(schema, &table_name, &action);
        }
    }
}

fn apply_alter_action(schema: &mut DatabaseSchema, table_name: &str, action: &str) {
    if let Some(caps) = RE_RENAME_TABLE.captures(action) {
        let new_name = clean_ident(&caps[1]);
        if let Some(mut table) = schema.remove_table(table_name) {
            table.name = new_name;
            schema.add_table(table);
        }
        return;
    }

    let Some(table) = schema.table_mut(table_name) else {
        return;
    };

    if RE_ENABLE_RLS.is_match(action) {
        table.rls_enabled = true;
        return;
    }

    if RE_DISABLE_RLS.is_match(action) {
        table.rls_enabled = false;
        return;
    }

    if let Some(caps) = RE_ADD_CONSTRAINT.captures(action) {
        let name = clean_ident(&caps[1]);
        let definition = caps[2].trim().to_string();
        attach_constraint(table, Some(name), &definition);
        return;
    }

    if let Some(caps) = RE_DROP_CONSTRAINT.captures(action) {
        let name = clean_ident(&caps[1]);
        if table
            .primary_key
            .as_ref()
            .map_or(false, |pk| pk.name.as_deref() == Some(name.as_str()))
        {
            table.primary_key = None;
        }
        table.foreign_keys.retain(|fk| fk.name.as_deref() != Some(name.as_str()));
        table.constraints.retain(|c| c.name != name);
        table.indexes.retain(|ix| ix.name != name);
        return;
    }

    if let Some(caps) = RE_RENAME_COLUMN.captures(action) {
        let old = clean_ident(&caps[1]);
        let new = clean_ident(&caps[2]);
        rename_column(table, &old, &new);
        return;
    }

    if let Some(caps) = RE_ALTER_TYPE.captures(action) {
        let column = clean_ident(&caps[1]);
        let new_type = normalize_type(&caps[2]);
        if let Some(col) = table.column_mut(&column) {
            col.data_type = new_type;
        }
        return;
    }

    if let Some(caps) = RE_SET_NOT_NULL.captures(action) {
        if let Some(col) = table.column_mut(&clean_ident(&caps[1])) {
            col.nullable = false;
        }
        return;
    }

    if let Some(caps) = RE_DROP_NOT_NULL.captures(action) {
        if let Some(col) = table.column_mut(&clean_ident(&caps[1])) {
            col.nullable = true;
        }
        return;
    }

    if let Some(caps) = RE_SET_DEFAULT.captures(action) {
        if let Some(col) = table.column_mut(&clean_ident(&caps[1])) {
            col.default = Some(caps[2].trim().to_string());
        }
        return;
    }

    if let Some(caps) = RE_DROP_DEFAULT.captures(action) {
        if let Some(col) = table.column_mut(&clean_ident(&caps[1])) {
            col.default = None;
        }
        return;
    }

    if let Some(caps) = RE_DROP_COLUMN.captures(action) {
        table.remove_column(&clean_ident(&caps[1]));
        return;
    }

    if let Some(caps) = RE_ADD_COLUMN.captures(action) {
        let table_name = table.name.clone();
        parse_table_body_part(table, &table_name, caps[1].trim());
    }
}

fn rename_column(table: &mut Table, old: &str, new: &str) {
    if let Some(col) = table.column_mut(old) {
        col.name = new.to_string();
    }
    if let Some(pk) = table.primary_key.as_mut() {
        for col in pk.columns.iter_mut() {
            if col == old {
                *col = new.to_string();
            }
        }
    }
    for index in table.indexes.iter_mut() {
        for col in index.columns.iter_mut() {
            if col == old {
                *col = new.to_string();
            }
        }
    }
    for fk in table.foreign_keys.iter_mut() {
        for col in fk.columns.iter_mut() {
            if col == old {
                *col = new.to_string();
            }
        }
    }
}

fn parse_create_table(flat: &str) -> Option<Table> {
    let caps = RE_CREATE_TABLE.captures(flat)?;
    let name = clean_ident(&caps[1]);
    let body = extract_parenthesized(flat)?;

    let mut table = Table::new(&name);
    for part in split_actions(&body) {
        parse_table_body_part(&mut table, &name, part.trim());
    }
    Some(table)
}

/// Parse one comma-separated element of a table body (or an added column)
fn parse_table_body_part(table: &mut Table, table_name: &str, part: &str) {
    if let Some(caps) = RE_NAMED_CONSTRAINT.captures(part) {
        let name = clean_ident(&caps[1]);
        let definition = caps[2].trim().to_string();
        attach_constraint(table, Some(name), &definition);
        return;
    }

    if RE_PRIMARY_KEY_DEF.is_match(part)
        || RE_FOREIGN_KEY_DEF.is_match(part)
        || RE_UNIQUE_DEF.is_match(part)
        || part.to_uppercase().starts_with("CHECK")
    {
        attach_constraint(table, None, part);
        return;
    }

    // Otherwise a column definition
    let mut words = part.splitn(2, ' ');
    let raw_name = match words.next() {
        Some(w) => w,
        None => return,
    };
    let rest = words.next().unwrap_or("").trim();
    let column_name = clean_ident(raw_name);

    let Some(type_match) = RE_COLUMN_TYPE.find(rest) else {
        return;
    };
    let data_type = normalize_type(type_match.as_str());
    let tail = &rest[type_match.end()..];

    // PRIMARY KEY implies NOT NULL
    let inline_pk = RE_INLINE_PRIMARY_KEY.is_match(tail);
    let mut column = Column::new(&column_name, &data_type)
        .nullable(!inline_pk && !RE_NOT_NULL.is_match(tail));
    if let Some(caps) = RE_DEFAULT_EXPR.captures(tail) {
        column = column.default(caps[1].trim());
    }
    table.add_column(column);

    if inline_pk {
        table.set_primary_key(PrimaryKey {
            name: None,
            columns: vec![column_name.clone()],
        });
    } else if RE_INLINE_UNIQUE.is_match(tail) {
        table.add_index(Index {
            name: format!("{}_{}_key", table_name, column_name),
            columns: vec![column_name.clone()],
            is_unique: true,
        });
    }

    if let Some(caps) = RE_INLINE_REFERENCES.captures(tail) {
        let ref_table = clean_ident(&caps[1]);
        let ref_column = caps
            .get(2)
            .map(|m| clean_ident(m.as_str()))
            .unwrap_or_else(|| "id".to_string());
        table.add_foreign_key(ForeignKey {
            name: None,
            columns: vec![column_name],
            ref_table,
            ref_columns: vec![ref_column],
        });
    }
}

fn attach_constraint(table: &mut Table, name: Option<String>, definition: &str) {
    if let Some(caps) = RE_PRIMARY_KEY_DEF.captures(definition) {
        let columns = split_actions(&caps[1]).iter().map(|c| clean_ident(c)).collect();
        table.set_primary_key(PrimaryKey { name, columns });
        return;
    }

    if let Some(caps) = RE_FOREIGN_KEY_DEF.captures(definition) {
        let columns: Vec<String> = split_actions(&caps[1]).iter().map(|c| clean_ident(c)).collect();
        let ref_table = clean_ident(&caps[2]);
        let ref_columns = match caps.get(3) {
            Some(m) => split_actions(m.as_str()).iter().map(|c| clean_ident(c)).collect(),
            None => vec!["id".to_string()],
        };
        table.add_foreign_key(ForeignKey {
            name,
            columns,
            ref_table,
            ref_columns,
        });
        return;
    }

    if let Some(caps) = RE_UNIQUE_DEF.captures(definition) {
        let columns: Vec<String> = split_actions(&caps[1]).iter().map(|c| clean_ident(c)).collect();
        let name = name.unwrap_or_else(|| {
            format!(
                "{}_{}_key",
                table.name,
                columns.first().map(String::as_str).unwrap_or("col")
            )
        });
        table.add_index(Index {
            name,
            columns,
            is_unique: true,
        });
        return;
    }

    let name = name.unwrap_or_else(|| format!("{}_check", table.name));
    table.constraints.push(Constraint {
        name,
        definition: definition.to_string(),
    });
}

fn extract_parenthesized(stmt: &str) -> Option<String> {
    let start = stmt.find('(')?;
    let mut depth = 0usize;
    let mut in_string = false;

    for (i, c) in stmt.char_indices() {
        if i < start {
            continue;
        }
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(stmt[start + 1..i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

/// Lowercase a SQL type and collapse runs of whitespace so catalog
/// entries read the same regardless of how the DDL was cased.
fn normalize_type(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const USERS_TABLE: &str = r#"
        CREATE TABLE users (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            email TEXT NOT NULL UNIQUE,
            display_name VARCHAR(120),
            balance NUMERIC(12, 2) NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
    "#;

    #[test]
    fn create_table_builds_columns_and_keys() {
        let mut schema = DatabaseSchema::new();
        apply_script(&mut schema, USERS_TABLE);

        let users = schema.table("users").unwrap();
        assert_eq!(users.columns.len(), 5);
        assert_eq!(users.primary_key.as_ref().unwrap().columns, vec!["id"]);

        let id = users.column("id").unwrap();
        assert_eq!(id.data_type, "uuid");
        assert_eq!(id.default.as_deref(), Some("gen_random_uuid()"));

        let email = users.column("email").unwrap();
        assert!(!email.nullable);
        assert!(users.indexes.iter().any(|ix| ix.is_unique && ix.columns == vec!["email"]));

        let balance = users.column("balance").unwrap();
        assert_eq!(balance.data_type, "numeric(12, 2)");
        assert_eq!(balance.default.as_deref(), Some("0"));
    }

    #[test]
    fn foreign_keys_from_inline_and_table_constraints() {
        let sql = r#"
            CREATE TABLE users (id UUID PRIMARY KEY);
            CREATE TABLE posts (
                id UUID PRIMARY KEY,
                author_id UUID NOT NULL REFERENCES users(id),
                editor_id UUID,
                CONSTRAINT fk_posts_editor FOREIGN KEY (editor_id) REFERENCES users (id)
            );
        "#;
        let mut schema = DatabaseSchema::new();
        apply_script(&mut schema, sql);

        let posts = schema.table("posts").unwrap();
        assert_eq!(posts.foreign_keys.len(), 2);
        assert_eq!(posts.foreign_keys[0].columns, vec!["author_id"]);
        assert_eq!(posts.foreign_keys[0].ref_table, "users");
        assert_eq!(posts.foreign_keys[1].name.as_deref(), Some("fk_posts_editor"));
    }

    #[test]
    fn alterations_are_replayed_in_order() {
        let sql = r#"
            CREATE TABLE accounts (id UUID PRIMARY KEY, legacy_id TEXT);
            ALTER TABLE accounts ADD COLUMN status TEXT NOT NULL DEFAULT 'active';
            ALTER TABLE accounts DROP COLUMN legacy_id;
            ALTER TABLE accounts ALTER COLUMN status TYPE VARCHAR(20);
            ALTER TABLE accounts RENAME COLUMN status TO state;
        "#;
        let mut schema = DatabaseSchema::new();
        apply_script(&mut schema, sql);

        let accounts = schema.table("accounts").unwrap();
        assert!(accounts.column("legacy_id").is_none());
        let state = accounts.column("state").unwrap();
        assert_eq!(state.data_type, "varchar(20)");
        assert!(!state.nullable);
    }

    #[test]
    fn rls_and_policies_are_tracked() {
        let sql = r#"
            CREATE TABLE documents (id UUID PRIMARY KEY, owner_id UUID);
            ALTER TABLE documents ENABLE ROW LEVEL SECURITY;
            CREATE POLICY documents_select_own ON documents FOR SELECT USING (owner_id = auth.uid());
        "#;
        let mut schema = DatabaseSchema::new();
        apply_script(&mut schema, sql);

        let documents = schema.table("documents").unwrap();
        assert!(documents.rls_enabled);
        assert_eq!(documents.policies, vec!["documents_select_own"]);
    }

    #[test]
    fn indexes_are_created_and_dropped() {
        let sql = r#"
            CREATE TABLE events (id UUID, kind TEXT);
            CREATE INDEX CONCURRENTLY idx_events_kind ON events (kind);
            DROP INDEX idx_events_kind;
            CREATE UNIQUE INDEX idx_events_id ON events (id);
        "#;
        let mut schema = DatabaseSchema::new();
        apply_script(&mut schema, sql);

        let events = schema.table("events").unwrap();
        assert_eq!(events.indexes.len(), 1);
        assert_eq!(events.indexes[0].name, "idx_events_id");
        assert!(events.indexes[0].is_unique);
    }

    #[test]
    fn table_rename_and_comment() {
        let sql = r#"
            CREATE TABLE old_users (id UUID PRIMARY KEY);
            ALTER TABLE old_users RENAME TO users;
            COMMENT ON TABLE users IS 'Registered accounts';
        "#;
        let mut schema = DatabaseSchema::new();
        apply_script(&mut schema, sql);

        assert!(schema.table("old_users").is_none());
        let users = schema.table("users").unwrap();
        assert_eq!(users.comment.as_deref(), Some("Registered accounts"));
    }

    #[test]
    fn down_sections_are_not_replayed() {
        let sql = "CREATE TABLE t (id INT);\n-- DOWN\nDROP TABLE t;";
        let mut schema = DatabaseSchema::new();
        apply_script(&mut schema, sql);
        assert!(schema.table("t").is_some());
    }

    #[test]
    fn load_dir_replays_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("20250101000000_create_users.sql"),
            "CREATE TABLE users (id UUID PRIMARY KEY, nickname TEXT);",
        )
        .unwrap();
        fs::write(
            dir.path().join("20250201000000_drop_nickname.sql"),
            "ALTER TABLE users DROP COLUMN nickname;",
        )
        .unwrap();

        let schema = load_dir(dir.path()).unwrap();
        assert!(schema.table("users").unwrap().column("nickname").is_none());

        let before = load_dir_before(dir.path(), "20250201000000_drop_nickname.sql").unwrap();
        assert!(before.table("users").unwrap().column("nickname").is_some());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = load_dir(Path::new("/definitely/not/here")).unwrap_err();
        assert!(matches!(err, Error::CatalogError(_)));
    }
}
