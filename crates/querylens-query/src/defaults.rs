//! Built-in starting state for a fresh session.

use serde_json::json;

use crate::rules::{Operator, Rule, RuleGroup};

/// Dataset shipped with the explorer
pub const DEFAULT_DATASET_KEY: &str = "imdb01-11-2024.parquet";

/// Select list used when no previous query supplied one
pub const DEFAULT_SELECT: &str = "*";

/// Limit used when no previous query supplied one
pub const DEFAULT_LIMIT: &str = "100";

/// The query shown on first launch: well-rated, widely voted recent movies
pub fn default_query(dataset_key: &str) -> String {
    format!(
        "SELECT
  titleId,
  title,
  primaryTitle,
  startYear,
  genres,
  averageRating,
  numVotes
FROM '{}'
WHERE
  averageRating >= 7.2 AND
  numVotes > 50000 AND
  startYear > 2010 AND
  titleType IN ('movie', 'tvMovie') AND
  region IS NULL
ORDER BY
  averageRating DESC
LIMIT 100;",
        dataset_key.replace('\'', "''")
    )
}

/// The WHERE conditions of [`default_query`] as a rule tree
pub fn default_rule_tree() -> RuleGroup {
    RuleGroup::and(vec![])
        .with_rule(Rule::new("averageRating", Operator::GreaterThanOrEqual, "7.2"))
        .with_rule(Rule::new("numVotes", Operator::GreaterThan, "50000"))
        .with_rule(Rule::new("startYear", Operator::GreaterThan, "2010"))
        .with_rule(Rule::new("titleType", Operator::In, json!(["movie", "tvMovie"])))
        .with_rule(Rule::new("region", Operator::Null, json!(null)))
}
