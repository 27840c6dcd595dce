//! Schema change descriptions
//!
//! A [`SchemaChange`] is the unit the safety classifier operates on: one
//! proposed alteration to one table, described structurally rather than as
//! SQL text. Changes are built by the DDL parser or deserialized from a
//! JSON change description.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Kinds of schema alteration the classifier understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    AddColumn,
    DropColumn,
    RenameColumn,
    AddTable,
    DropTable,
    AddIndex,
    DropIndex,
    AlterType,
    AddConstraint,
    DropConstraint,
}

impl ChangeOperation {
    /// Operations that remove structure and cannot be undone in place
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            ChangeOperation::DropColumn | ChangeOperation::DropTable | ChangeOperation::DropConstraint
        )
    }
}

impl fmt::Display for ChangeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeOperation::AddColumn => "ADD COLUMN",
            ChangeOperation::DropColumn => "DROP COLUMN",
            ChangeOperation::RenameColumn => "RENAME COLUMN",
            ChangeOperation::AddTable => "ADD TABLE",
            ChangeOperation::DropTable => "DROP TABLE",
            ChangeOperation::AddIndex => "ADD INDEX",
            ChangeOperation::DropIndex => "DROP INDEX",
            ChangeOperation::AlterType => "ALTER TYPE",
            ChangeOperation::AddConstraint => "ADD CONSTRAINT",
            ChangeOperation::DropConstraint => "DROP CONSTRAINT",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ChangeOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "add_column" | "addcolumn" => Ok(ChangeOperation::AddColumn),
            "drop_column" | "dropcolumn" => Ok(ChangeOperation::DropColumn),
            "rename_column" | "renamecolumn" => Ok(ChangeOperation::RenameColumn),
            "add_table" | "addtable" | "create_table" => Ok(ChangeOperation::AddTable),
            "drop_table" | "droptable" => Ok(ChangeOperation::DropTable),
            "add_index" | "addindex" | "create_index" => Ok(ChangeOperation::AddIndex),
            "drop_index" | "dropindex" => Ok(ChangeOperation::DropIndex),
            "alter_type" | "altertype" | "alter_column_type" => Ok(ChangeOperation::AlterType),
            "add_constraint" | "addconstraint" => Ok(ChangeOperation::AddConstraint),
            "drop_constraint" | "dropconstraint" => Ok(ChangeOperation::DropConstraint),
            other => Err(Error::InvalidChangeDescription(format!(
                "unrecognized operation: {}",
                other
            ))),
        }
    }
}

/// Source and destination types of an `AlterType` change
///
/// The source type is optional because a standalone `ALTER COLUMN ... TYPE`
/// statement does not carry it; it is filled in when a catalog knows the
/// current column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeChange {
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
}

impl TypeChange {
    pub fn new(from: Option<&str>, to: &str) -> Self {
        Self {
            from: from.map(|s| s.to_string()),
            to: to.to_string(),
        }
    }
}

/// A single proposed change to a database schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaChange {
    pub operation: ChangeOperation,
    pub target_table: String,
    #[serde(default)]
    pub target_column: Option<String>,
    /// Whether an added column allows NULL
    #[serde(default)]
    pub nullable: bool,
    /// Whether an added column carries a DEFAULT expression
    #[serde(default)]
    pub has_default: bool,
    /// Whether the change touches rows that already exist in the table
    #[serde(default)]
    pub affects_existing_rows: bool,
    /// Present for `AlterType` changes
    #[serde(default)]
    pub type_change: Option<TypeChange>,
    /// Present for rename changes
    #[serde(default)]
    pub new_name: Option<String>,
}

impl SchemaChange {
    /// Create a new change for the given operation and table
    pub fn new(operation: ChangeOperation, target_table: &str) -> Self {
        Self {
            operation,
            target_table: target_table.to_string(),
            target_column: None,
            nullable: false,
            has_default: false,
            affects_existing_rows: false,
            type_change: None,
            new_name: None,
        }
    }

    /// Set the target column
    pub fn column(mut self, column: &str) -> Self {
        self.target_column = Some(column.to_string());
        self
    }

    /// Set whether an added column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set whether an added column has a default expression
    pub fn has_default(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }

    /// Set whether the change touches pre-existing rows
    pub fn affects_existing_rows(mut self, affects: bool) -> Self {
        self.affects_existing_rows = affects;
        self
    }

    /// Set the type transition for an `AlterType` change
    pub fn type_change(mut self, from: Option<&str>, to: &str) -> Self {
        self.type_change = Some(TypeChange::new(from, to));
        self
    }

    /// Set the new name for a rename change
    pub fn renamed_to(mut self, new_name: &str) -> Self {
        self.new_name = Some(new_name.to_string());
        self
    }

    /// Build a change from a JSON change description
    pub fn from_json(json: &str) -> Result<Self> {
        let change: SchemaChange = serde_json::from_str(json)
            .map_err(|e| Error::InvalidChangeDescription(e.to_string()))?;
        change.validate()?;
        Ok(change)
    }

    /// Check the structural requirements for classification
    pub fn validate(&self) -> Result<()> {
        if self.target_table.trim().is_empty() {
            return Err(Error::InvalidChangeDescription(
                "target_table must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Short human-readable summary, e.g. `ADD COLUMN users.age`
    pub fn describe(&self) -> String {
        match &self.target_column {
            Some(column) => format!("{} {}.{}", self.operation, self.target_table, column),
            None => format!("{} {}", self.operation, self.target_table),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn operation_parses_from_snake_case_and_sql_spelling() {
        assert_eq!("add_column".parse::<ChangeOperation>().unwrap(), ChangeOperation::AddColumn);
        assert_eq!("DROP COLUMN".parse::<ChangeOperation>().unwrap(), ChangeOperation::DropColumn);
        assert_eq!("AlterType".parse::<ChangeOperation>().unwrap(), ChangeOperation::AlterType);
        assert!("explode_table".parse::<ChangeOperation>().is_err());
    }

    #[test]
    fn json_description_with_defaults() {
        let change = SchemaChange::from_json(
            r#"{"operation": "add_column", "target_table": "transactions", "nullable": true}"#,
        )
        .unwrap();

        assert_eq!(change.operation, ChangeOperation::AddColumn);
        assert_eq!(change.target_table, "transactions");
        assert_eq!(change.target_column, None);
        assert!(change.nullable);
        assert!(!change.has_default);
        assert!(!change.affects_existing_rows);
    }

    #[test]
    fn json_description_rejects_unknown_operation() {
        let err = SchemaChange::from_json(
            r#"{"operation": "shrink_table", "target_table": "users"}"#,
        )
        .unwrap_err();

        assert!(matches!(err, Error::InvalidChangeDescription(_)));
    }

    #[test]
    fn empty_target_table_is_invalid() {
        let err = SchemaChange::new(ChangeOperation::AddTable, "  ")
            .validate()
            .unwrap_err();

        assert!(matches!(err, Error::InvalidChangeDescription(_)));
    }

    #[test]
    fn describe_includes_column_when_present() {
        let change = SchemaChange::new(ChangeOperation::DropColumn, "accounts").column("legacy_id");
        assert_eq!(change.describe(), "DROP COLUMN accounts.legacy_id");

        let change = SchemaChange::new(ChangeOperation::AddTable, "orders");
        assert_eq!(change.describe(), "ADD TABLE orders");
    }
}
