//! Query index advisor
//!
//! Pattern-based analysis of a single SQL query string. Flags query shapes
//! that scan or sort without index support and suggests the matching
//! `CREATE INDEX CONCURRENTLY` statement, named by the configured index
//! pattern. No EXPLAIN, no server; the advice is purely structural.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::NamingConfig;
use crate::utils::naming::get_index_name;

static RE_FROM_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:FROM|UPDATE)\s+"?([\w.]+)"?"#).unwrap());
static RE_SELECT_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)SELECT\s+\*"#).unwrap());
static RE_WHERE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bWHERE\b"#).unwrap());
static RE_LIMIT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\bLIMIT\b"#).unwrap());
static RE_FK_EQUALITY: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\b(\w+_id)\s*="#).unwrap());
static RE_DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(\w+_(?:at|date))\s*(?:>=?|<=?|BETWEEN)"#).unwrap()
});
static RE_ORDER_BY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)ORDER\s+BY\s+"?([\w.]+)"?"#).unwrap());

/// One issue found in a query, with the suggested fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecommendation {
    pub issue: String,
    pub suggestion: String,
}

impl QueryRecommendation {
    fn new(issue: String, suggestion: String) -> Self {
        Self { issue, suggestion }
    }
}

/// Structural query analyzer
pub struct QueryAdvisor<'a> {
    naming: &'a NamingConfig,
}

impl<'a> QueryAdvisor<'a> {
    /// Create a new query advisor
    pub fn new(naming: &'a NamingConfig) -> Self {
        Self { naming }
    }

    /// Analyze one query and return recommendations, worst shapes first
    pub fn analyze(&self, query: &str) -> Vec<QueryRecommendation> {
        let mut recommendations = Vec::new();
        let table = target_table(query);

        if RE_SELECT_STAR.is_match(query) {
            recommendations.push(QueryRecommendation::new(
                "SELECT * fetches all columns".to_string(),
                "select only the columns the caller needs".to_string(),
            ));
        }

        let where_clause = RE_WHERE.find(query).map(|m| &query[m.end()..]);

        if where_clause.is_none() && !RE_LIMIT.is_match(query) {
            recommendations.push(QueryRecommendation::new(
                "no WHERE clause".to_string(),
                "add a WHERE clause or LIMIT to avoid a full table scan".to_string(),
            ));
        }

        if let Some(clause) = where_clause {
            let mut seen = Vec::new();
            for caps in RE_FK_EQUALITY.captures_iter(clause) {
                let column = caps[1].to_lowercase();
                if seen.contains(&column) {
                    continue;
                }

                let issue = if column == "user_id" {
                    "user-based lookup detected".to_string()
                } else {
                    format!("foreign key lookup on {} detected", column)
                };
                recommendations.push(QueryRecommendation::new(
                    issue,
                    self.index_suggestion(&table, &column, false),
                ));
                seen.push(column);
            }

            for caps in RE_DATE_RANGE.captures_iter(clause) {
                let column = caps[1].to_lowercase();
                if seen.contains(&column) {
                    continue;
                }
                recommendations.push(QueryRecommendation::new(
                    format!("date range filter on {} detected", column),
                    self.index_suggestion(&table, &column, true),
                ));
                seen.push(column);
            }
        }

        if let Some(caps) = RE_ORDER_BY.captures(query) {
            let column = caps[1].rsplit('.').next().unwrap_or(&caps[1]).to_lowercase();
            if column.ends_with("_at") || column.ends_with("_date") {
                recommendations.push(QueryRecommendation::new(
                    format!("ordered by {} detected", column),
                    self.index_suggestion(&table, &column, true),
                ));
            } else {
                recommendations.push(QueryRecommendation::new(
                    format!("ORDER BY {} may sort without index support", column),
                    format!("create an index covering {} if the query is frequent", column),
                ));
            }
        }

        recommendations
    }

    fn index_suggestion(&self, table: &str, column: &str, descending: bool) -> String {
        let name = get_index_name(&self.naming.index_pattern, table, &[column.to_string()]);
        let order = if descending { " DESC" } else { "" };
        format!(
            "CREATE INDEX CONCURRENTLY {} ON {}({}{});",
            name, table, column, order
        )
    }
}

/// Render recommendations for terminal output
pub fn render_recommendations(query: &str, recommendations: &[QueryRecommendation]) -> String {
    let mut out = format!("Analyzing query:\n{}\n", query.trim());
    out.push_str(&"-".repeat(50));
    out.push('\n');

    if recommendations.is_empty() {
        out.push_str("Query looks optimized.\n");
        return out;
    }

    out.push_str("Recommendations:\n\n");
    for (i, rec) in recommendations.iter().enumerate() {
        out.push_str(&format!("{}. Issue: {}\n", i + 1, rec.issue));
        out.push_str(&format!("   Fix: {}\n\n", rec.suggestion));
    }

    out
}

fn target_table(query: &str) -> String {
    RE_FROM_TABLE
        .captures(query)
        .map(|caps| caps[1].to_lowercase())
        .unwrap_or_else(|| "table".to_string())
}
