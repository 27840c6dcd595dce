//! Naming utilities for SchemaWarden
//!
//! Identifier conventions for tables, indexes, constraints, policies and
//! migration files. Postgres is the only dialect in scope, so identifier
//! limits and quoting follow its rules.

use inflector::Inflector;

/// Postgres identifier length limit
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Apply a naming convention to a string
pub fn apply_naming_convention(name: &str, convention: &str) -> String {
    match convention {
        "snake_case" => name.to_snake_case(),
        "camel_case" => name.to_camel_case(),
        "pascal_case" => name.to_pascal_case(),
        "kebab_case" => name.to_kebab_case(),
        "screaming_snake_case" => name.to_screaming_snake_case(),
        _ => name.to_string(), // Default: keep as is
    }
}

/// Format a name according to a pattern with placeholders
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Get table name for a requested entity name according to convention
pub fn get_table_name(entity_name: &str, style: &str, pluralize: bool) -> String {
    let name = apply_naming_convention(entity_name, style);

    if pluralize {
        // Irregular plurals the inflector gets wrong
        match name.to_lowercase().as_str() {
            "person" => "people".to_string(),
            "child" => "children".to_string(),
            "man" => "men".to_string(),
            "woman" => "women".to_string(),
            _ => name.to_plural(),
        }
    } else {
        name
    }
}

/// Get column name from a requested field name according to convention
pub fn get_column_name(field_name: &str, style: &str) -> String {
    apply_naming_convention(field_name, style)
}

/// Get index name from table and columns according to pattern
pub fn get_index_name(pattern: &str, table_name: &str, columns: &[String]) -> String {
    let columns_str = columns.join("_");

    let name = format_name(pattern, &[("table", table_name), ("columns", &columns_str)]);
    truncate_identifier(&name, MAX_IDENTIFIER_LENGTH)
}

/// Get foreign key constraint name according to pattern
pub fn get_foreign_key_name(pattern: &str, table_name: &str, column_name: &str) -> String {
    let name = format_name(pattern, &[("table", table_name), ("column", column_name)]);
    truncate_identifier(&name, MAX_IDENTIFIER_LENGTH)
}

/// Get row level security policy name according to pattern
pub fn get_policy_name(pattern: &str, table_name: &str, action: &str) -> String {
    let name = format_name(pattern, &[("table", table_name), ("action", action)]);
    truncate_identifier(&name, MAX_IDENTIFIER_LENGTH)
}

/// Sanitize identifiers for SQL
pub fn sanitize_identifier(name: &str) -> String {
    // Remove or replace characters not allowed in SQL identifiers
    let mut sanitized = name.replace(|c: char| !c.is_alphanumeric() && c != '_', "_");

    // Ensure identifier doesn't start with a number
    if sanitized.chars().next().map_or(false, |c| c.is_numeric()) {
        sanitized = format!("_{}", sanitized);
    }

    sanitized
}

/// Truncate an identifier to fit database limits
pub fn truncate_identifier(name: &str, max_length: usize) -> String {
    if name.len() <= max_length {
        name.to_string()
    } else {
        // Keep space for an 8 char hash and the joining underscore
        let keep_length = max_length - 9;

        // Hash of the full name keeps truncated identifiers unique
        let hash = format!("{:x}", md5::compute(name.as_bytes()));

        let prefix = if keep_length < name.len() {
            &name[0..keep_length]
        } else {
            name
        };

        format!("{}_{}", prefix, &hash[0..8])
    }
}

/// Check if a name is a reserved SQL keyword
pub fn is_sql_keyword(name: &str) -> bool {
    const SQL_KEYWORDS: &[&str] = &[
        "add", "all", "alter", "and", "any", "as", "asc", "begin", "between", "by", "case",
        "check", "column", "constraint", "create", "database", "default", "delete", "desc",
        "distinct", "drop", "else", "end", "except", "exists", "foreign", "from", "full",
        "grant", "group", "having", "in", "index", "inner", "insert", "intersect", "into",
        "is", "join", "key", "left", "like", "limit", "not", "null", "on", "or", "order",
        "outer", "policy", "primary", "references", "right", "select", "set", "table",
        "to", "truncate", "union", "unique", "update", "using", "values", "view", "where",
        "with",
    ];

    SQL_KEYWORDS.contains(&name.to_lowercase().as_str())
}

/// Quote an identifier if it collides with a SQL keyword
pub fn escape_sql_keyword(name: &str) -> String {
    if is_sql_keyword(name) {
        format!("\"{}\"", name)
    } else {
        name.to_string()
    }
}

/// Format name as a valid file name (for migrations, etc.)
pub fn format_file_name(name: &str) -> String {
    let sanitized = name
        .replace(' ', "_")
        .replace('/', "_")
        .replace('\\', "_")
        .replace(':', "_")
        .replace('*', "_")
        .replace('?', "_")
        .replace('"', "_")
        .replace('<', "_")
        .replace('>', "_")
        .replace('|', "_");

    sanitized.to_lowercase()
}

/// Create a timestamp-based migration name
pub fn create_migration_name(description: &str, timestamp: bool) -> String {
    let clean_description = format_file_name(description);

    if timestamp {
        use chrono::Utc;
        let now = Utc::now();
        format!("{}_{}", now.format("%Y%m%d%H%M%S"), clean_description)
    } else {
        clean_description
    }
}
