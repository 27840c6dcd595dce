//! Configuration handling for SchemaWarden

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Load configuration from an explicit path, from `schema_warden.toml` in the
/// working directory when present, or fall back to built-in defaults.
pub fn load_or_default(path: Option<&str>) -> Result<Config> {
    match path {
        Some(p) => load_from_file(p),
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                load_from_file(DEFAULT_CONFIG_FILE)
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Config file looked up when no `--config` path is given
pub const DEFAULT_CONFIG_FILE: &str = "schema_warden.toml";

/// Represents the complete SchemaWarden configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub migrations: MigrationsConfig,
    pub policy: PolicyConfig,
    pub scaffold: ScaffoldConfig,
    pub naming: NamingConfig,
    pub logging: Option<LoggingConfig>,
}

/// Migration file settings configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MigrationsConfig {
    pub directory: String,
    pub wrap_in_transaction: bool,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: "migrations".to_string(),
            wrap_in_transaction: true,
        }
    }
}

/// Safety policy configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PolicyConfig {
    /// Permit `--allow-destructive` overrides with a recorded justification
    pub allow_destructive: bool,
    /// Flag `CREATE INDEX` statements that do not use `CONCURRENTLY`
    pub require_concurrent_indexes: bool,
    /// Flag created tables that never enable row level security
    pub require_rls: bool,
    /// Tables exempt from the row level security requirement
    pub rls_exempt: Vec<String>,
    /// Row count above which index builds are treated as long-running
    pub large_table_threshold: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allow_destructive: true,
            require_concurrent_indexes: true,
            require_rls: true,
            rls_exempt: Vec::new(),
            large_table_threshold: 100_000,
        }
    }
}

/// Table scaffolding configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ScaffoldConfig {
    pub uuid_primary_key: bool,
    pub audit_columns: bool,
    pub soft_delete: bool,
    pub updated_at_trigger: bool,
    pub table_comments: bool,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            uuid_primary_key: true,
            audit_columns: true,
            soft_delete: true,
            updated_at_trigger: true,
            table_comments: true,
        }
    }
}

/// Naming conventions configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NamingConfig {
    pub table_style: String,
    pub pluralize_tables: bool,
    pub index_pattern: String,
    pub constraint_pattern: String,
    pub policy_pattern: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            table_style: "snake_case".to_string(),
            pluralize_tables: false,
            index_pattern: "idx_{table}_{columns}".to_string(),
            constraint_pattern: "fk_{table}_{column}".to_string(),
            policy_pattern: "{table}_{action}_own".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}
