//! Utilities for SchemaWarden
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use naming::{
    apply_naming_convention, create_migration_name, format_name, get_column_name,
    get_foreign_key_name, get_index_name, get_policy_name, get_table_name,
};
