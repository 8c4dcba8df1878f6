//! Per-operator rendering of a single rule into a SQL condition.
//!
//! Every operator has a default rendering. A [`RuleProcessor`] holds a static
//! table of overrides keyed by [`Operator`]; operators without an entry fall
//! through to [`render_default`].

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::rules::{Operator, Rule, ValueSource};

lazy_static! {
    static ref NUMERIC: Regex = Regex::new(r"^-?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?$").unwrap();
}

/// Options threaded through every rendering call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Leave numeric-looking string values unquoted
    pub parse_numbers: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { parse_numbers: true }
    }
}

/// Rendering function for one rule
pub type RenderFn = fn(&Rule, &FormatOptions) -> String;

/// Static operator-to-renderer table with a default case
#[derive(Clone, Default)]
pub struct RuleProcessor {
    overrides: BTreeMap<Operator, RenderFn>,
}

impl fmt::Debug for RuleProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleProcessor")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleProcessor {
    /// Processor with no overrides; every operator uses the default rendering
    pub fn new() -> Self {
        Self::default()
    }

    /// Processor that compares the six pattern operators case-insensitively
    pub fn case_insensitive() -> Self {
        Self::new()
            .with_override(Operator::Contains, render_case_insensitive)
            .with_override(Operator::BeginsWith, render_case_insensitive)
            .with_override(Operator::EndsWith, render_case_insensitive)
            .with_override(Operator::DoesNotContain, render_case_insensitive)
            .with_override(Operator::DoesNotBeginWith, render_case_insensitive)
            .with_override(Operator::DoesNotEndWith, render_case_insensitive)
    }

    pub fn with_override(mut self, operator: Operator, render: RenderFn) -> Self {
        self.overrides.insert(operator, render);
        self
    }

    pub fn has_override(&self, operator: Operator) -> bool {
        self.overrides.contains_key(&operator)
    }

    /// Render one rule. An empty string means the rule contributes nothing.
    pub fn render(&self, rule: &Rule, options: &FormatOptions) -> String {
        match self.overrides.get(&rule.operator) {
            Some(render) => render(rule, options),
            None => render_default(rule, options),
        }
    }
}

/// Quote a string literal, doubling embedded single quotes
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn is_numeric(text: &str) -> bool {
    NUMERIC.is_match(text)
}

/// Render a scalar value as a SQL literal
fn literal(value: &Value, options: &FormatOptions) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Null => quote_literal(""),
        Value::String(s) => {
            let trimmed = s.trim();
            if options.parse_numbers && is_numeric(trimmed) {
                trimmed.to_string()
            } else {
                quote_literal(s)
            }
        }
        other => quote_literal(&other.to_string()),
    }
}

/// Raw text of a value, used inside pattern literals and column references
fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Rendered operand: a column reference or a literal
fn operand(rule: &Rule, value: &Value, options: &FormatOptions) -> String {
    match rule.value_source {
        ValueSource::Field => raw_text(value),
        ValueSource::Value => literal(value, options),
    }
}

/// List values come either as a JSON array or as a comma-separated string
fn list_values(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Keyword and wildcard placement for the pattern operators; `None` for the rest
fn pattern_parts(operator: Operator) -> Option<(&'static str, &'static str, &'static str)> {
    match operator {
        Operator::Contains => Some(("LIKE", "%", "%")),
        Operator::BeginsWith => Some(("LIKE", "", "%")),
        Operator::EndsWith => Some(("LIKE", "%", "")),
        Operator::DoesNotContain => Some(("NOT LIKE", "%", "%")),
        Operator::DoesNotBeginWith => Some(("NOT LIKE", "", "%")),
        Operator::DoesNotEndWith => Some(("NOT LIKE", "%", "")),
        _ => None,
    }
}

/// Pattern operand, optionally wrapped in `UPPER(..)`
fn pattern_operand(rule: &Rule, prefix: &str, suffix: &str, upper: bool) -> String {
    let wrap = |s: String| if upper { format!("UPPER({})", s) } else { s };
    match rule.value_source {
        ValueSource::Value => {
            let text = raw_text(&rule.value);
            wrap(quote_literal(&format!("{}{}{}", prefix, text, suffix)))
        }
        ValueSource::Field => {
            let mut parts = Vec::with_capacity(3);
            if !prefix.is_empty() {
                parts.push(quote_literal(prefix));
            }
            parts.push(wrap(raw_text(&rule.value)));
            if !suffix.is_empty() {
                parts.push(quote_literal(suffix));
            }
            parts.join(" || ")
        }
    }
}

/// Default rendering for every operator
pub fn render_default(rule: &Rule, options: &FormatOptions) -> String {
    let field = &rule.field;
    match rule.operator {
        Operator::Null => format!("{} IS NULL", field),
        Operator::NotNull => format!("{} IS NOT NULL", field),
        Operator::In | Operator::NotIn => {
            let items = list_values(&rule.value);
            if items.is_empty() {
                return String::new();
            }
            let rendered: Vec<String> = items.iter().map(|v| operand(rule, v, options)).collect();
            let keyword = if rule.operator == Operator::In { "IN" } else { "NOT IN" };
            format!("{} {} ({})", field, keyword, rendered.join(", "))
        }
        Operator::Between | Operator::NotBetween => {
            let items = list_values(&rule.value);
            if items.len() < 2 {
                return String::new();
            }
            let keyword = if rule.operator == Operator::Between {
                "BETWEEN"
            } else {
                "NOT BETWEEN"
            };
            format!(
                "{} {} {} AND {}",
                field,
                keyword,
                operand(rule, &items[0], options),
                operand(rule, &items[1], options)
            )
        }
        op => match pattern_parts(op) {
            Some((keyword, prefix, suffix)) => {
                format!("{} {} {}", field, keyword, pattern_operand(rule, prefix, suffix, false))
            }
            None => format!("{} {} {}", field, op.name(), operand(rule, &rule.value, options)),
        },
    }
}

/// Case-insensitive rendering for the pattern operators: both sides are
/// upper-cased before the `LIKE` comparison.
pub fn render_case_insensitive(rule: &Rule, options: &FormatOptions) -> String {
    let Some((keyword, prefix, suffix)) = pattern_parts(rule.operator) else {
        return render_default(rule, options);
    };
    format!(
        "UPPER({}) {} {}",
        rule.field,
        keyword,
        pattern_operand(rule, prefix, suffix, true)
    )
}
