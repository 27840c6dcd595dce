//! SchemaWarden command-line interface
//!
//! Clap-derived definitions and dispatch. All real work happens in the
//! library; this binary renders results and maps outcomes to exit codes.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use schema_warden::advisor::render_recommendations;
use schema_warden::config;
use schema_warden::migration::plan::MigrationPlan;
use schema_warden::schema::generator::ColumnSpec;
use schema_warden::utils::logging::init_logging;
use schema_warden::{DestructiveOverride, SchemaChange, SchemaWarden, VerdictStatus};

#[derive(Parser, Debug)]
#[clap(
    name = "schema_warden",
    version = env!("CARGO_PKG_VERSION"),
    about = "Offline safety gate for Postgres schema migrations"
)]
struct Cli {
    /// Path to the configuration file (defaults to schema_warden.toml)
    #[clap(long, short = 'c', global = true)]
    config: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a migration script against the safety policy
    Check {
        /// Migration file to validate
        file: PathBuf,
        /// Estimated row count of the affected tables
        #[clap(long, default_value_t = 0)]
        rows: u64,
        /// Output format: 'text' or 'json'
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Classify a single schema change given as JSON
    Classify {
        /// Change description, e.g. '{"operation":"drop_column","target_table":"users","target_column":"ssn"}'
        json: String,
        /// Downgrade a destructive verdict to needs-review
        #[clap(long)]
        allow_destructive: bool,
        /// Recorded justification for the override
        #[clap(long)]
        justification: Option<String>,
        /// Output format: 'text' or 'json'
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Generate a complete table scaffold
    Schema {
        /// Entity or table name
        table: String,
        /// Table purpose, recorded in comments
        #[clap(long, short = 'p', default_value = "")]
        purpose: String,
        /// Column as name:type[:flags], flags among not_null,unique (repeatable)
        #[clap(long = "column")]
        columns: Vec<String>,
    },
    /// Create a migration file with a computed safety checklist
    Migrate {
        /// Migration description, becomes part of the file name
        description: String,
        /// Forward SQL for the UP section
        #[clap(long, default_value = "")]
        up: String,
        /// Rollback SQL for the DOWN section
        #[clap(long, default_value = "")]
        down: String,
        /// Estimated row count of the affected tables
        #[clap(long, default_value_t = 0)]
        rows: u64,
        /// Print the rendered file instead of writing it
        #[clap(long)]
        dry_run: bool,
    },
    /// Analyze a SQL query for index opportunities
    Optimize {
        /// SQL query to analyze
        query: String,
        /// Output format: 'text' or 'json'
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Render the migrations directory as a Mermaid ERD
    Erd {
        /// Write the document to a file instead of stdout
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Generate row level security policies for a table
    Rls {
        /// Table name
        table: String,
        /// Column holding the owning user id
        #[clap(long, default_value = "user_id")]
        user_column: String,
    },
    /// Check catalog integrity (foreign keys, primary keys, RLS coverage)
    IntegrityCheck {
        /// Output format: 'text' or 'json'
        #[clap(long, default_value = "text")]
        format: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = config::load_or_default(cli.config.as_deref())?;
    init_logging(&config.logging)?;
    let warden = SchemaWarden::new(config);

    match cli.command {
        Command::Check { file, rows, format } => {
            let report = warden
                .validate_file(&file, rows)
                .with_context(|| format!("failed to validate {}", file.display()))?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }

            Ok(exit_for(report.is_passing()))
        }

        Command::Classify {
            json,
            allow_destructive,
            justification,
            format,
        } => {
            let change = SchemaChange::from_json(&json)?;
            let destructive_override = allow_destructive
                .then(|| DestructiveOverride::new(justification.as_deref().unwrap_or("")));

            let verdict =
                warden.classify_with_override(&change, destructive_override.as_ref())?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&verdict)?);
            } else {
                println!("[{}] {}", verdict.status, change.describe());
                for reason in &verdict.reasons {
                    println!("    reason: {}", reason);
                }
                if let Some(hint) = &verdict.rollback_hint {
                    println!("    rollback: {}", hint);
                }
            }

            Ok(exit_for(verdict.status != VerdictStatus::Blocked))
        }

        Command::Schema {
            table,
            purpose,
            columns,
        } => {
            let purpose = if purpose.is_empty() {
                format!("{} data", table)
            } else {
                purpose
            };
            let columns = columns
                .iter()
                .map(|raw| parse_column_spec(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;

            print!("{}", warden.scaffold_table(&table, &purpose, &columns)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::Migrate {
            description,
            up,
            down,
            rows,
            dry_run,
        } => {
            let plan = MigrationPlan::new(&description, &up, &down).estimated_rows(rows);

            if dry_run {
                print!("{}", warden.plan_migration(&plan)?);
            } else {
                let path = warden.write_migration(&plan)?;
                println!("created {}", path.display());
            }

            Ok(ExitCode::SUCCESS)
        }

        Command::Optimize { query, format } => {
            let recommendations = warden.analyze_query(&query);

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&recommendations)?);
            } else {
                print!("{}", render_recommendations(&query, &recommendations));
            }

            Ok(ExitCode::SUCCESS)
        }

        Command::Erd { output } => {
            let document = warden.render_erd("Database ERD")?;

            match output {
                Some(path) => {
                    fs::write(&path, &document)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("ERD written to {}", path.display());
                }
                None => print!("{}", document),
            }

            Ok(ExitCode::SUCCESS)
        }

        Command::Rls { table, user_column } => {
            print!("{}", warden.rls_policies(&table, &user_column)?);
            Ok(ExitCode::SUCCESS)
        }

        Command::IntegrityCheck { format } => {
            let report = warden.check_integrity()?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }

            Ok(exit_for(!report.has_blockers()))
        }
    }
}

fn exit_for(passing: bool) -> ExitCode {
    if passing {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Parse a `name:type[:flags]` column argument
fn parse_column_spec(raw: &str) -> anyhow::Result<ColumnSpec> {
    let mut parts = raw.splitn(3, ':');
    let name = parts
        .next()
        .filter(|s| !s.is_empty())
        .with_context(|| format!("column '{}' is missing a name", raw))?;
    let data_type = parts
        .next()
        .filter(|s| !s.is_empty())
        .with_context(|| format!("column '{}' is missing a type", raw))?;

    let mut spec = ColumnSpec::new(name, data_type);
    if let Some(flags) = parts.next() {
        for flag in flags.split(',') {
            match flag.trim() {
                "not_null" => spec = spec.not_null(),
                "unique" => spec = spec.unique(),
                "" => {}
                other => anyhow::bail!("unknown column flag '{}' in '{}'", other, raw),
            }
        }
    }

    Ok(spec)
}
