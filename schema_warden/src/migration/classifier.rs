//! Migration safety classification
//!
//! Maps a [`SchemaChange`] to a [`SafetyVerdict`] through an ordered decision
//! table. Classification is a pure function: no I/O, no shared state, same
//! verdict for the same change every time.
//!
//! The rules, evaluated top to bottom with first match winning:
//!
//! 1. `DROP COLUMN`, `DROP TABLE`, `DROP CONSTRAINT` are blocked outright.
//! 2. `ALTER TYPE` that narrows the representable range is blocked.
//! 3. `ADD COLUMN NOT NULL` without a default on a populated table needs
//!    review for a backfill strategy.
//! 4. Nullable or defaulted `ADD COLUMN` is approved.
//! 5. `ADD TABLE`, `ADD INDEX` and non-validating `ADD CONSTRAINT` are
//!    approved.
//! 6. `RENAME COLUMN` needs review.
//! 7. Everything else needs review.
//!
//! A blocked verdict can be downgraded to needs-review with a recorded
//! justification, never silently approved.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::PolicyConfig;
use crate::error::{Error, Result};
use crate::migration::change::{ChangeOperation, SchemaChange};

/// Outcome category of a safety classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Approved,
    Blocked,
    NeedsReview,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerdictStatus::Approved => "APPROVED",
            VerdictStatus::Blocked => "BLOCKED",
            VerdictStatus::NeedsReview => "NEEDS REVIEW",
        };
        write!(f, "{}", name)
    }
}

/// Result of classifying one schema change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub status: VerdictStatus,
    pub reasons: Vec<String>,
    #[serde(default)]
    pub rollback_hint: Option<String>,
}

impl SafetyVerdict {
    fn approved() -> Self {
        Self {
            status: VerdictStatus::Approved,
            reasons: Vec::new(),
            rollback_hint: None,
        }
    }

    fn blocked(reason: &str, rollback_hint: Option<&str>) -> Self {
        Self {
            status: VerdictStatus::Blocked,
            reasons: vec![reason.to_string()],
            rollback_hint: rollback_hint.map(|h| h.to_string()),
        }
    }

    fn needs_review(reason: &str) -> Self {
        Self {
            status: VerdictStatus::NeedsReview,
            reasons: vec![reason.to_string()],
            rollback_hint: None,
        }
    }

    /// Whether this verdict prevents the change from shipping as-is
    pub fn is_blocking(&self) -> bool {
        self.status == VerdictStatus::Blocked
    }
}

/// A recorded justification for letting a destructive change through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestructiveOverride {
    pub justification: String,
}

impl DestructiveOverride {
    pub fn new(justification: &str) -> Self {
        Self {
            justification: justification.to_string(),
        }
    }
}

/// Classify a single schema change
///
/// Fails only on malformed input; the nature of the proposed change is always
/// expressed through the verdict status, never as an error.
pub fn classify(change: &SchemaChange) -> Result<SafetyVerdict> {
    change.validate()?;

    let verdict = if change.operation.is_destructive() {
        SafetyVerdict::blocked(
            "irreversible removal",
            Some("restore from backup/point-in-time-recovery"),
        )
    } else if change.operation == ChangeOperation::AlterType && narrows(change) {
        SafetyVerdict::blocked("potential data truncation", None)
    } else if change.operation == ChangeOperation::AddColumn
        && !change.nullable
        && !change.has_default
        && change.affects_existing_rows
    {
        SafetyVerdict::needs_review("requires backfill strategy before enforcing NOT NULL")
    } else if change.operation == ChangeOperation::AddColumn
        && (change.nullable || change.has_default)
    {
        SafetyVerdict::approved()
    } else if matches!(
        change.operation,
        ChangeOperation::AddTable | ChangeOperation::AddIndex
    ) || (change.operation == ChangeOperation::AddConstraint && !change.affects_existing_rows)
    {
        SafetyVerdict::approved()
    } else if change.operation == ChangeOperation::RenameColumn {
        SafetyVerdict::needs_review("breaks dependent queries/views; prefer add-new+deprecate-old")
    } else {
        SafetyVerdict::needs_review("unclassified operation; manual audit required")
    };

    Ok(verdict)
}

fn narrows(change: &SchemaChange) -> bool {
    match &change.type_change {
        Some(tc) => match tc.from.as_deref() {
            // Without the current type the transition cannot be judged, so
            // it falls through to the catch-all rule instead of blocking.
            Some(from) => is_narrowing(from, &tc.to),
            None => false,
        },
        None => false,
    }
}

/// Policy-aware classifier
///
/// Wraps [`classify`] with the override handling configured in
/// [`PolicyConfig`].
pub struct Classifier {
    policy: PolicyConfig,
}

impl Classifier {
    pub fn new(policy: &PolicyConfig) -> Self {
        Self {
            policy: policy.clone(),
        }
    }

    /// Classify without any override
    pub fn classify(&self, change: &SchemaChange) -> Result<SafetyVerdict> {
        classify(change)
    }

    /// Classify, downgrading a blocked verdict when a justified override is
    /// supplied and policy permits it
    ///
    /// The downgraded verdict is `NeedsReview`, keeps the original reasons
    /// and rollback hint, and records the justification as a further reason.
    pub fn classify_with_override(
        &self,
        change: &SchemaChange,
        destructive_override: Option<&DestructiveOverride>,
    ) -> Result<SafetyVerdict> {
        let verdict = classify(change)?;

        let Some(ov) = destructive_override else {
            return Ok(verdict);
        };

        if verdict.status != VerdictStatus::Blocked {
            return Ok(verdict);
        }

        if !self.policy.allow_destructive {
            return Err(Error::ConfigError(
                "destructive overrides are disabled by policy".to_string(),
            ));
        }

        if ov.justification.trim().is_empty() {
            return Err(Error::ConfigError(
                "destructive override requires a justification".to_string(),
            ));
        }

        let mut downgraded = verdict;
        downgraded.status = VerdictStatus::NeedsReview;
        downgraded
            .reasons
            .push(format!("destructive change overridden: {}", ov.justification));
        Ok(downgraded)
    }
}

// ---------------------------------------------------------------------------
// Type narrowing detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParsedType {
    Integer(u8),
    Float(u8),
    Numeric {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Character {
        limit: Option<u32>,
    },
    Temporal(u8),
    TimeOfDay(u8),
    Other,
}

/// Decide whether changing a column from `from` to `to` can lose data
///
/// Comparisons only happen within a type family; a cross-family conversion
/// is never reported as narrowing here because its effect cannot be judged
/// structurally.
pub fn is_narrowing(from: &str, to: &str) -> bool {
    match (parse_sql_type(from), parse_sql_type(to)) {
        (ParsedType::Integer(f), ParsedType::Integer(t)) => t < f,
        (ParsedType::Float(f), ParsedType::Float(t)) => t < f,
        (
            ParsedType::Numeric {
                precision: fp,
                scale: fs,
            },
            ParsedType::Numeric {
                precision: tp,
                scale: ts,
            },
        ) => match (fp, tp) {
            // Unconstrained numeric squeezed into a bounded one
            (None, Some(_)) => true,
            (Some(f), Some(t)) => t < f || ts.unwrap_or(0) < fs.unwrap_or(0),
            _ => false,
        },
        (ParsedType::Character { limit: fl }, ParsedType::Character { limit: tl }) => {
            match (fl, tl) {
                (None, Some(_)) => true,
                (Some(f), Some(t)) => t < f,
                _ => false,
            }
        }
        (ParsedType::Temporal(f), ParsedType::Temporal(t)) => t < f,
        (ParsedType::TimeOfDay(f), ParsedType::TimeOfDay(t)) => t < f,
        _ => false,
    }
}

fn parse_sql_type(raw: &str) -> ParsedType {
    let normalized = raw.trim().to_lowercase();

    // Split off parenthesized arguments, e.g. varchar(255), numeric(10, 2)
    let mut base = String::new();
    let mut args: Vec<u32> = Vec::new();
    let mut current_arg = String::new();
    let mut in_parens = false;

    for ch in normalized.chars() {
        match ch {
            '(' => in_parens = true,
            ')' => {
                in_parens = false;
                if let Ok(n) = current_arg.trim().parse() {
                    args.push(n);
                }
                current_arg.clear();
            }
            ',' if in_parens => {
                if let Ok(n) = current_arg.trim().parse() {
                    args.push(n);
                }
                current_arg.clear();
            }
            c if in_parens => current_arg.push(c),
            c => base.push(c),
        }
    }

    let base = base.split_whitespace().collect::<Vec<_>>().join(" ");

    match base.as_str() {
        "smallint" | "int2" => ParsedType::Integer(1),
        "integer" | "int" | "int4" => ParsedType::Integer(2),
        "bigint" | "int8" => ParsedType::Integer(3),
        "real" | "float4" => ParsedType::Float(1),
        "double precision" | "double" | "float8" => ParsedType::Float(2),
        "numeric" | "decimal" => ParsedType::Numeric {
            precision: args.first().copied(),
            // Declared precision without scale means scale 0
            scale: args.get(1).copied().or(if args.is_empty() { None } else { Some(0) }),
        },
        "char" | "character" | "bpchar" => ParsedType::Character {
            limit: Some(args.first().copied().unwrap_or(1)),
        },
        "varchar" | "character varying" => ParsedType::Character {
            limit: args.first().copied(),
        },
        "text" | "citext" => ParsedType::Character { limit: None },
        "date" => ParsedType::Temporal(1),
        "timestamp" | "timestamp without time zone" => ParsedType::Temporal(2),
        "timestamptz" | "timestamp with time zone" => ParsedType::Temporal(3),
        "time" | "time without time zone" => ParsedType::TimeOfDay(1),
        "timetz" | "time with time zone" => ParsedType::TimeOfDay(2),
        _ => ParsedType::Other,
    }
}
