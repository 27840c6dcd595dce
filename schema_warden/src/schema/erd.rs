//! Mermaid ERD renderer
//!
//! Turns the schema catalog into a Mermaid `erDiagram` block, with primary
//! and foreign key markers and one relationship line per foreign key.

use chrono::Local;

use crate::schema::types::DatabaseSchema;

/// Render the catalog as a bare `erDiagram` body
pub fn render(schema: &DatabaseSchema) -> String {
    let mut out = String::from("erDiagram\n");

    for table in schema.tables.values() {
        out.push_str(&format!("    {} {{\n", entity_name(&table.name)));

        for column in &table.columns {
            let marker = if table
                .primary_key
                .as_ref()
                .map_or(false, |pk| pk.columns.contains(&column.name))
            {
                " PK"
            } else if table
                .foreign_keys
                .iter()
                .any(|fk| fk.columns.contains(&column.name))
            {
                " FK"
            } else {
                ""
            };

            out.push_str(&format!(
                "        {} {}{}\n",
                mermaid_type(&column.data_type),
                column.name,
                marker
            ));
        }

        out.push_str("    }\n\n");
    }

    for table in schema.tables.values() {
        for fk in &table.foreign_keys {
            out.push_str(&format!(
                "    {} ||--o{{ {} : \"{}\"\n",
                entity_name(&fk.ref_table),
                entity_name(&table.name),
                fk.columns.join(", ")
            ));
        }
    }

    out
}

/// Render the catalog as a markdown document with a fenced Mermaid block
pub fn render_markdown(schema: &DatabaseSchema, title: &str) -> String {
    format!(
        "# {}\n\nGenerated: {}\n\n```mermaid\n{}```\n",
        title,
        Local::now().to_rfc3339(),
        render(schema)
    )
}

fn entity_name(table_name: &str) -> String {
    table_name.to_uppercase()
}

/// Map a SQL data type to the word vocabulary Mermaid diagrams use
fn mermaid_type(data_type: &str) -> String {
    let lower = data_type.to_lowercase();

    match lower.as_str() {
        "uuid" => "uuid".to_string(),

        "smallint" | "int2" | "integer" | "int" | "int4" | "serial" => "int".to_string(),
        "bigint" | "int8" | "bigserial" => "bigint".to_string(),

        "real" | "float4" | "double precision" | "float8" => "float".to_string(),

        "text" | "citext" | "varchar" | "char" | "character varying" | "character" => {
            "string".to_string()
        }

        "date" => "date".to_string(),
        "timestamp" | "timestamptz" | "timestamp with time zone"
        | "timestamp without time zone" => "timestamp".to_string(),
        "time" | "timetz" | "time with time zone" | "time without time zone" => {
            "time".to_string()
        }

        "boolean" | "bool" => "boolean".to_string(),
        "bytea" => "bytes".to_string(),
        "json" | "jsonb" => "json".to_string(),

        t if t.starts_with("numeric") || t.starts_with("decimal") => "decimal".to_string(),
        t if t.ends_with("[]") => "array".to_string(),

        // varchar(120), timestamp(3) and friends reduce to their base type
        t if t.contains('(') => {
            let base = t.split('(').next().unwrap_or(t).trim();
            mermaid_type(base)
        }

        _ => "string".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sample_schema() -> DatabaseSchema {
        let sql = r#"
            CREATE TABLE users (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE TABLE profiles (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id),
                full_name VARCHAR(200),
                balance NUMERIC(12, 2)
            );
        "#;
        let mut schema = DatabaseSchema::new();
        catalog::apply_script(&mut schema, sql);
        schema
    }

    #[test]
    fn renders_entities_with_key_markers() {
        let erd = render(&sample_schema());

        assert!(erd.starts_with("erDiagram\n"));
        assert!(erd.contains("    USERS {\n"));
        assert!(erd.contains("        uuid id PK\n"));
        assert!(erd.contains("        string email\n"));
        assert!(erd.contains("        timestamp created_at\n"));
        assert!(erd.contains("        uuid user_id FK\n"));
        assert!(erd.contains("        decimal balance\n"));
    }

    #[test]
    fn renders_one_relationship_per_foreign_key() {
        let erd = render(&sample_schema());
        assert!(erd.contains("    USERS ||--o{ PROFILES : \"user_id\"\n"));
    }

    #[test]
    fn empty_catalog_renders_bare_header() {
        let erd = render(&DatabaseSchema::new());
        assert_eq!(erd, "erDiagram\n");
    }

    #[test]
    fn markdown_wraps_diagram_in_fences() {
        let doc = render_markdown(&sample_schema(), "Database ERD");
        assert!(doc.starts_with("# Database ERD\n"));
        assert!(doc.contains("```mermaid\nerDiagram\n"));
        assert!(doc.ends_with("```\n"));
    }

    #[rstest]
    #[case("uuid", "uuid")]
    #[case("TEXT", "string")]
    #[case("varchar(120)", "string")]
    #[case("numeric(12, 2)", "decimal")]
    #[case("bigint", "bigint")]
    #[case("double precision", "float")]
    #[case("timestamptz", "timestamp")]
    #[case("timestamp(3)", "timestamp")]
    #[case("bool", "boolean")]
    #[case("jsonb", "json")]
    #[case("text[]", "array")]
    #[case("tsvector", "string")]
    fn sql_types_map_to_mermaid_words(#[case] sql: &str, #[case] expected: &str) {
        assert_eq!(mermaid_type(sql), expected);
    }
}
