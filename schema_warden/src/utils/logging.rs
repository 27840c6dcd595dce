//! Logging setup for SchemaWarden
//!
//! Builds a `tracing` subscriber from the optional `[logging]` config
//! section. Without one, logging stays uninitialized and the library is
//! silent.

use std::fs::File;
use std::path::Path;
use tracing::dispatcher::{self, Dispatch};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return Ok(()),
    };

    let level = match config.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // Default to INFO
    };

    let env_filter = EnvFilter::from_default_env()
        .add_directive(format!("schema_warden={}", level).parse().unwrap());
    let builder = fmt::Subscriber::builder().with_env_filter(env_filter);
    let json = config.format.to_lowercase() == "json";

    // File output wins when both file and stdout are configured
    let dispatch = if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(file_path)?;

        if json {
            Dispatch::new(builder.json().with_writer(file).finish())
        } else {
            Dispatch::new(builder.with_writer(file).finish())
        }
    } else if config.stdout {
        if json {
            Dispatch::new(builder.json().finish())
        } else {
            Dispatch::new(builder.finish())
        }
    } else {
        return Ok(());
    };

    dispatcher::set_global_default(dispatch).map_err(|e| Error::ConfigError(e.to_string()))?;

    Ok(())
}
