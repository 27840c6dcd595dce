//! Type definitions for database schema objects

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Represents a complete database schema
///
/// Tables keep their insertion order so rendered output is stable across
/// runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: IndexMap<String, Table>,
}

impl DatabaseSchema {
    /// Create a new empty database schema
    pub fn new() -> Self {
        Self {
            tables: IndexMap::new(),
        }
    }

    /// Add a table to the schema
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Look up a table by name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Look up a table mutably by name
    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.get_mut(name)
    }

    /// Remove a table by name
    pub fn remove_table(&mut self, name: &str) -> Option<Table> {
        self.tables.shift_remove(name)
    }

    /// Current type of a column, when both table and column are known
    pub fn column_type(&self, table: &str, column: &str) -> Option<&str> {
        self.table(table)
            .and_then(|t| t.column(column))
            .map(|c| c.data_type.as_str())
    }
}

/// Represents a database table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Option<PrimaryKey>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub constraints: Vec<Constraint>,
    pub comment: Option<String>,
    /// Whether `ENABLE ROW LEVEL SECURITY` has been applied
    pub rls_enabled: bool,
    /// Names of policies defined on this table
    pub policies: Vec<String>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: None,
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            constraints: Vec::new(),
            comment: None,
            rls_enabled: false,
            policies: Vec::new(),
        }
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column mutably by name
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Remove a column by name
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let position = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(position))
    }

    /// Set the primary key for the table
    pub fn set_primary_key(&mut self, pk: PrimaryKey) {
        self.primary_key = Some(pk);
    }

    /// Add an index to the table
    pub fn add_index(&mut self, index: Index) {
        self.indexes.push(index);
    }

    /// Add a foreign key to the table
    pub fn add_foreign_key(&mut self, fk: ForeignKey) {
        self.foreign_keys.push(fk);
    }

    /// Whether any index covers the given column as its first key part
    pub fn has_index_on(&self, column: &str) -> bool {
        self.primary_key
            .as_ref()
            .map_or(false, |pk| pk.columns.first().map(String::as_str) == Some(column))
            || self
                .indexes
                .iter()
                .any(|ix| ix.columns.first().map(String::as_str) == Some(column))
    }
}

/// Represents a database column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

impl Column {
    /// Create a new column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            default: None,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// Represents a primary key constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Represents an index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
}

/// Represents a foreign key constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
}

/// Represents a general constraint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub definition: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_and_removal() {
        let mut table = Table::new("users");
        table.add_column(Column::new("id", "uuid").nullable(false));
        table.add_column(Column::new("email", "text").nullable(false));

        assert_eq!(table.column("email").unwrap().data_type, "text");
        assert!(table.remove_column("email").is_some());
        assert!(table.column("email").is_none());
    }

    #[test]
    fn schema_resolves_column_types() {
        let mut schema = DatabaseSchema::new();
        let mut table = Table::new("transactions");
        table.add_column(Column::new("amount", "bigint"));
        schema.add_table(table);

        assert_eq!(schema.column_type("transactions", "amount"), Some("bigint"));
        assert_eq!(schema.column_type("transactions", "missing"), None);
        assert_eq!(schema.column_type("missing", "amount"), None);
    }

    #[test]
    fn index_coverage_includes_primary_key() {
        let mut table = Table::new("orders");
        table.add_column(Column::new("id", "uuid"));
        table.add_column(Column::new("user_id", "uuid"));
        table.set_primary_key(PrimaryKey {
            name: None,
            columns: vec!["id".to_string()],
        });
        table.add_index(Index {
            name: "idx_orders_user_id".to_string(),
            columns: vec!["user_id".to_string()],
            is_unique: false,
        });

        assert!(table.has_index_on("id"));
        assert!(table.has_index_on("user_id"));
        assert!(!table.has_index_on("created_at"));
    }
}
