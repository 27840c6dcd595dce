//! SQL DDL script analysis
//!
//! Turns a migration script into structured [`SchemaChange`] values plus
//! script-level [`Advisory`] findings. Statements are recognized with
//! regular expressions over whitespace-normalized text; this is a linter's
//! view of SQL, not a full grammar, and unrecognized statements are passed
//! over silently.
//!
//! Two conventions for derived fields:
//! - `affects_existing_rows` is true unless the same script created the
//!   table, so a standalone `ALTER TABLE` on an unknown table is judged
//!   conservatively.
//! - A `DROP INDEX` statement carries the index name as its target, since
//!   the owning table is not named in the statement.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::config::PolicyConfig;
use crate::migration::change::{ChangeOperation, SchemaChange};
use crate::migration::report::Advisory;
use crate::schema::types::DatabaseSchema;

static RE_CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?("?[\w.]+"?)"#).unwrap()
});
static RE_DROP_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^DROP\s+TABLE\s+(?:IF\s+EXISTS\s+)?("?[\w.]+"?)"#).unwrap());
static RE_CREATE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^CREATE\s+(?:UNIQUE\s+)?INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+NOT\s+EXISTS\s+)?(?:"?[\w.]+"?\s+)?ON\s+(?:ONLY\s+)?("?[\w.]+"?)"#,
    )
    .unwrap()
});
static RE_DROP_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^DROP\s+INDEX\s+(?:CONCURRENTLY\s+)?(?:IF\s+EXISTS\s+)?("?[\w.]+"?)"#).unwrap()
});
static RE_ALTER_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^ALTER\s+TABLE\s+(?:IF\s+EXISTS\s+)?(?:ONLY\s+)?("?[\w.]+"?)\s+(.+)$"#).unwrap()
});
static RE_TRUNCATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^TRUNCATE\s+(?:TABLE\s+)?(?:ONLY\s+)?("?[\w.]+"?)"#).unwrap());
static RE_CREATE_POLICY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^CREATE\s+POLICY\s+"?\w+"?\s+ON\s+("?[\w.]+"?)"#).unwrap());
static RE_DATA_MODIFICATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^(?:UPDATE\b|DELETE\s+FROM\b)"#).unwrap());
static RE_CONCURRENTLY: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bCONCURRENTLY\b"#).unwrap());
static RE_ROLLBACK_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bROLLBACK\b|--\s*DOWN\b"#).unwrap());
static RE_DOWN_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?im)^\s*--\s*DOWN\b"#).unwrap());

// ALTER TABLE actions, matched against a single comma-separated action
static RE_ADD_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^ADD\s+CONSTRAINT\s+("?\w+"?)"#).unwrap());
static RE_BARE_CONSTRAINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^ADD\s+(?:PRIMARY\s+KEY|UNIQUE|FOREIGN\s+KEY|CHECK|EXCLUDE)\b"#).unwrap()
});
static RE_ADD_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^ADD\s+(?:COLUMN\s+)?(?:IF\s+NOT\s+EXISTS\s+)?("?\w+"?)\s+(.+)$"#).unwrap()
});
static RE_DROP_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^DROP\s+CONSTRAINT\s+(?:IF\s+EXISTS\s+)?("?\w+"?)"#).unwrap());
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
static RE_VALIDATE_CONSTRAINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^VALIDATE\s+CONSTRAINT\s+("?\w+"?)"#).unwrap());
static RE_ENABLE_RLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^ENABLE\s+ROW\s+LEVEL\s+SECURITY"#).unwrap());
static RE_DISABLE_RLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^DISABLE\s+ROW\s+LEVEL\s+SECURITY"#).unwrap());

static RE_NOT_NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bNOT\s+NULL\b"#).unwrap());
static RE_DEFAULT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bDEFAULT\b"#).unwrap());
static RE_NOT_VALID: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bNOT\s+VALID\b"#).unwrap());

/// Everything extracted from one script
#[derive(Debug, Clone, Default)]
pub struct ScriptAnalysis {
    pub changes: Vec<SchemaChange>,
    pub advisories: Vec<Advisory>,
    pub statement_count: usize,
}

/// Policy-aware DDL script analyzer
pub struct ScriptAnalyzer<'a> {
    policy: &'a PolicyConfig,
}

impl<'a> ScriptAnalyzer<'a> {
    pub fn new(policy: &'a PolicyConfig) -> Self {
        Self { policy }
    }

    /// Analyze a script, resolving current column types from `catalog` when
    /// one is supplied
    ///
    /// Statements after a `-- DOWN` marker describe the rollback, not the
    /// forward migration, and are excluded from classification.
    pub fn analyze(&self, sql: &str, catalog: Option<&DatabaseSchema>) -> ScriptAnalysis {
        let statements = split_statements(up_section(sql));
        let mut state = ScanState::default();

        for statement in &statements {
            self.scan_statement(statement, catalog, &mut state);
        }

        if self.policy.require_rls {
            self.check_rls_coverage(&mut state);
        }

        // The rollback marker usually lives in a comment, so this check runs
        // on the raw script rather than the stripped statements.
        if !RE_ROLLBACK_MARKER.is_match(sql) {
            state.advisories.push(
                Advisory::info("no rollback plan documented")
                    .with_suggestion("add a -- DOWN section with reversing statements"),
            );
        }

        ScriptAnalysis {
            changes: state.changes,
            advisories: state.advisories,
            statement_count: statements.len(),
        }
    }

    fn scan_statement(&self, statement: &str, catalog: Option<&DatabaseSchema>, state: &mut ScanState) {
        let flat = flatten(statement);

        if let Some(caps) = RE_CREATE_TABLE.captures(&flat) {
            let table = clean_ident(&caps[1]);
            state
                .changes
                .push(SchemaChange::new(ChangeOperation::AddTable, &table));
            state.created_tables.push(table);
            return;
        }

        if let Some(caps) = RE_DROP_TABLE.captures(&flat) {
            let table = clean_ident(&caps[1]);
            state
                .changes
                .push(SchemaChange::new(ChangeOperation::DropTable, &table));
            return;
        }

        if let Some(caps) = RE_CREATE_INDEX.captures(&flat) {
            let table = clean_ident(&caps[1]);
            let concurrent = RE_CONCURRENTLY.is_match(&flat);

            if !concurrent && self.policy.require_concurrent_indexes && !state.created(&table) {
                state.advisories.push(
                    Advisory::warning(&format!(
                        "index on {} is created without CONCURRENTLY; the build locks writes",
                        table
                    ))
                    .with_suggestion("use CREATE INDEX CONCURRENTLY outside a transaction"),
                );
            }

            state
                .changes
                .push(SchemaChange::new(ChangeOperation::AddIndex, &table));
            return;
        }

        if let Some(caps) = RE_DROP_INDEX.captures(&flat) {
            let index = clean_ident(&caps[1]);
            state
                .changes
                .push(SchemaChange::new(ChangeOperation::DropIndex, &index));
            return;
        }

        if let Some(caps) = RE_TRUNCATE.captures(&flat) {
            let table = clean_ident(&caps[1]);
            state.advisories.push(Advisory::blocker(&format!(
                "TRUNCATE {} destroys data irreversibly",
                table
            )));
            return;
        }

        if let Some(caps) = RE_CREATE_POLICY.captures(&flat) {
            let table = clean_ident(&caps[1]);
            state.has_policy.insert(table);
            return;
        }

        if let Some(caps) = RE_ALTER_TABLE.captures(&flat) {
            let table = clean_ident(&caps[1]);
            let actions = split_actions(caps[2].trim());
            for action in actions {
                self.scan_alter_action(&table, &action, catalog, state);
            }
            return;
        }

        if RE_DATA_MODIFICATION.is_match(&flat) && !state.data_modification_seen {
            state.data_modification_seen = true;
            state.advisories.push(Advisory::info(
                "data modification statement present; batch large backfills",
            ));
        }
    }

    fn scan_alter_action(
        &self,
        table: &str,
        action: &str,
        catalog: Option<&DatabaseSchema>,
        state: &mut ScanState,
    ) {
        let created = state.created(table);

        if RE_ENABLE_RLS.is_match(action) {
            state.rls_enabled.insert(table.to_string());
            return;
        }

        if RE_DISABLE_RLS.is_match(action) {
            state.advisories.push(Advisory::warning(&format!(
                "row level security disabled on {}",
                table
            )));
            return;
        }

        if RE_ADD_CONSTRAINT.is_match(action) || RE_BARE_CONSTRAINT.is_match(action) {
            let validating = !RE_NOT_VALID.is_match(action);
            state.changes.push(
                SchemaChange::new(ChangeOperation::AddConstraint, table)
                    .affects_existing_rows(validating && !created),
            );
            return;
        }

        if let Some(caps) = RE_DROP_CONSTRAINT.captures(action) {
            let name = clean_ident(&caps[1]);
            state.changes.push(
                SchemaChange::new(ChangeOperation::DropConstraint, table)
                    .affects_existing_rows(!created)
                    .column(&name),
            );
            return;
        }

        if let Some(caps) = RE_RENAME_TABLE.captures(action) {
            let new_name = clean_ident(&caps[1]);
            state.advisories.push(
                Advisory::warning(&format!(
                    "table {} is renamed to {}; renames break dependent queries and application code",
                    table, new_name
                ))
                .with_suggestion("keep a view with the old name during the transition"),
            );
            return;
        }

        if let Some(caps) = RE_RENAME_COLUMN.captures(action) {
            let column = clean_ident(&caps[1]);
            let new_name = clean_ident(&caps[2]);
            state.changes.push(
                SchemaChange::new(ChangeOperation::RenameColumn, table)
                    .column(&column)
                    .renamed_to(&new_name)
                    .affects_existing_rows(!created),
            );
            return;
        }

        if let Some(caps) = RE_SET_NOT_NULL.captures(action) {
            let column = clean_ident(&caps[1]);
            state.changes.push(
                SchemaChange::new(ChangeOperation::AddConstraint, table)
                    .column(&column)
                    .affects_existing_rows(!created),
            );
            return;
        }

        if let Some(caps) = RE_DROP_NOT_NULL.captures(action) {
            let column = clean_ident(&caps[1]);
            state.changes.push(
                SchemaChange::new(ChangeOperation::DropConstraint, table)
                    .column(&column)
                    .affects_existing_rows(!created),
            );
            return;
        }

        if let Some(caps) = RE_ALTER_TYPE.captures(action) {
            let column = clean_ident(&caps[1]);
            let to_type = caps[2].trim().to_string();
            let from_type = if created {
                None
            } else {
                catalog.and_then(|c| c.column_type(table, &column).map(|t| t.to_string()))
            };

            state.changes.push(
                SchemaChange::new(ChangeOperation::AlterType, table)
                    .column(&column)
                    .type_change(from_type.as_deref(), &to_type)
                    .affects_existing_rows(!created),
            );
            return;
        }

        if let Some(caps) = RE_VALIDATE_CONSTRAINT.captures(action) {
            let name = clean_ident(&caps[1]);
            state.changes.push(
                SchemaChange::new(ChangeOperation::AddConstraint, table)
                    .column(&name)
                    .affects_existing_rows(!created),
            );
            return;
        }

        if let Some(caps) = RE_DROP_COLUMN.captures(action) {
            let column = clean_ident(&caps[1]);
            state.changes.push(
                SchemaChange::new(ChangeOperation::DropColumn, table)
                    .column(&column)
                    .affects_existing_rows(!created),
            );
            return;
        }

        if let Some(caps) = RE_ADD_COLUMN.captures(action) {
            let column = clean_ident(&caps[1]);
            let definition = &caps[2];
            state.changes.push(
                SchemaChange::new(ChangeOperation::AddColumn, table)
                    .column(&column)
                    .nullable(!RE_NOT_NULL.is_match(definition))
                    .has_default(RE_DEFAULT.is_match(definition))
                    .affects_existing_rows(!created),
            );
        }
    }

    fn check_rls_coverage(&self, state: &mut ScanState) {
        let mut advisories = Vec::new();

        for table in &state.created_tables {
            if self
                .policy
                .rls_exempt
                .iter()
                .any(|exempt| exempt.eq_ignore_ascii_case(table))
            {
                continue;
            }

            if !state.rls_enabled.contains(table) {
                advisories.push(
                    Advisory::warning(&format!(
                        "table {} is created without row level security",
                        table
                    ))
                    .with_suggestion(&format!(
                        "ALTER TABLE {} ENABLE ROW LEVEL SECURITY;",
                        table
                    )),
                );
            } else if !state.has_policy.contains(table) {
                advisories.push(Advisory::warning(&format!(
                    "row level security is enabled on {} but no policy is defined",
                    table
                )));
            }
        }

        state.advisories.extend(advisories);
    }
}

#[derive(Debug, Default)]
struct ScanState {
    changes: Vec<SchemaChange>,
    advisories: Vec<Advisory>,
    created_tables: Vec<String>,
    rls_enabled: HashSet<String>,
    has_policy: HashSet<String>,
    data_modification_seen: bool,
}

impl ScanState {
    fn created(&self, table: &str) -> bool {
        self.created_tables.iter().any(|t| t == table)
    }
}

/// Forward portion of a script: everything before the first `-- DOWN` marker
pub fn up_section(sql: &str) -> &str {
    match RE_DOWN_SECTION.find(sql) {
        Some(m) => &sql[..m.start()],
        None => sql,
    }
}

/// Split a script into statements
///
/// Honors line and block comments, single and double quoting, and dollar
/// quoting, so a semicolon inside a string or function body does not end a
/// statement. Comments are stripped from the returned statements.
pub fn split_statements(sql: &str) -> Vec<String> {
    #[derive(PartialEq)]
    enum Mode {
        Normal,
        LineComment,
        BlockComment,
        SingleQuote,
        DoubleQuote,
        Dollar(String),
    }

    let chars: Vec<char> = sql.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Normal;
    let mut block_depth = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match &mode {
            Mode::Normal => match c {
                '-' if next == Some('-') => {
                    mode = Mode::LineComment;
                    current.push(' ');
                    i += 2;
                }
                '/' if next == Some('*') => {
                    mode = Mode::BlockComment;
                    block_depth = 1;
                    current.push(' ');
                    i += 2;
                }
                '\'' => {
                    mode = Mode::SingleQuote;
                    current.push(c);
                    i += 1;
                }
                '"' => {
                    mode = Mode::DoubleQuote;
                    current.push(c);
                    i += 1;
                }
                '$' => {
                    // Dollar quote tags look like $tag$ or just $$
                    if let Some(tag) = dollar_tag(&chars, i) {
                        current.push_str(&tag);
                        i += tag.chars().count();
                        mode = Mode::Dollar(tag);
                    } else {
                        current.push(c);
                        i += 1;
                    }
                }
                ';' => {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        statements.push(trimmed.to_string());
                    }
                    current.clear();
                    i += 1;
                }
                _ => {
                    current.push(c);
                    i += 1;
                }
            },
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Normal;
                    current.push('\n');
                }
                i += 1;
            }
            Mode::BlockComment => {
                if c == '*' && next == Some('/') {
                    block_depth -= 1;
                    if block_depth == 0 {
                        mode = Mode::Normal;
                    }
                    i += 2;
                } else if c == '/' && next == Some('*') {
                    block_depth += 1;
                    i += 2;
                } else {
                    i += 1;
                }
            }
            Mode::SingleQuote => {
                current.push(c);
                if c == '\'' {
                    // Doubled quote is an escaped quote, not a terminator
                    if next == Some('\'') {
                        current.push('\'');
                        i += 2;
                        continue;
                    }
                    mode = Mode::Normal;
                }
                i += 1;
            }
            Mode::DoubleQuote => {
                current.push(c);
                if c == '"' {
                    mode = Mode::Normal;
                }
                i += 1;
            }
            Mode::Dollar(tag) => {
                if matches_at(&chars, i, tag) {
                    current.push_str(tag);
                    i += tag.chars().count();
                    mode = Mode::Normal;
                } else {
                    current.push(c);
                    i += 1;
                }
            }
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }

    statements
}

fn dollar_tag(chars: &[char], start: usize) -> Option<String> {
    let mut j = start + 1;
    while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
        j += 1;
    }
    if j < chars.len() && chars[j] == '$' {
        Some(chars[start..=j].iter().collect())
    } else {
        None
    }
}

fn matches_at(chars: &[char], start: usize, tag: &str) -> bool {
    let tag_chars: Vec<char> = tag.chars().collect();
    chars.len() >= start + tag_chars.len() && chars[start..start + tag_chars.len()] == tag_chars[..]
}

/// Split the action list of an `ALTER TABLE` (or a table body) on top-level
/// commas, leaving commas inside parentheses and strings alone
pub(crate) fn split_actions(rest: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;

    for c in rest.chars() {
        match c {
            '\'' => {
                in_string = !in_string;
                current.push(c);
            }
            '(' if !in_string => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_string => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if !in_string && depth == 0 => {
                let part = current.trim();
                if !part.is_empty() {
                    parts.push(part.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let part = current.trim();
    if !part.is_empty() {
        parts.push(part.to_string());
    }

    parts
}

pub(crate) fn flatten(statement: &str) -> String {
    statement.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn clean_ident(raw: &str) -> String {
    raw.trim().trim_matches('"').to_string()
}
