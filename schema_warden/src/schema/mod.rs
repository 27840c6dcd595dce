//! Schema module for SchemaWarden
//!
//! This module handles the offline schema catalog, ERD rendering, and
//! table/policy scaffolding.

pub mod catalog;
pub mod erd;
pub mod generator;
pub mod types;

// Re-export key types
pub use generator::{ColumnSpec, ScaffoldGenerator};
pub use types::{
    Column, Constraint, DatabaseSchema, ForeignKey, Index, PrimaryKey, Table,
};
