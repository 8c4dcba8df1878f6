//! Rule-tree data model.
//!
//! The JSON shape matches what the visual rule builder exports:
//!
//! ```json
//! {
//!   "combinator": "and",
//!   "rules": [
//!     { "field": "title", "operator": "contains", "value": "matrix" },
//!     { "combinator": "or", "rules": [ ... ] }
//!   ]
//! }
//! ```

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// Boolean combinator joining the children of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    /// SQL keyword for this combinator
    pub fn keyword(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Closed set of operators understood by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "beginsWith")]
    BeginsWith,
    #[serde(rename = "endsWith")]
    EndsWith,
    #[serde(rename = "doesNotContain")]
    DoesNotContain,
    #[serde(rename = "doesNotBeginWith")]
    DoesNotBeginWith,
    #[serde(rename = "doesNotEndWith")]
    DoesNotEndWith,
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "notNull")]
    NotNull,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notIn")]
    NotIn,
    #[serde(rename = "between")]
    Between,
    #[serde(rename = "notBetween")]
    NotBetween,
}

impl Operator {
    pub const ALL: [Operator; 18] = [
        Operator::Equal,
        Operator::NotEqual,
        Operator::LessThan,
        Operator::GreaterThan,
        Operator::LessThanOrEqual,
        Operator::GreaterThanOrEqual,
        Operator::Contains,
        Operator::BeginsWith,
        Operator::EndsWith,
        Operator::DoesNotContain,
        Operator::DoesNotBeginWith,
        Operator::DoesNotEndWith,
        Operator::Null,
        Operator::NotNull,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::NotBetween,
    ];

    /// Name used in the rule-tree JSON
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessThan => "<",
            Operator::GreaterThan => ">",
            Operator::LessThanOrEqual => "<=",
            Operator::GreaterThanOrEqual => ">=",
            Operator::Contains => "contains",
            Operator::BeginsWith => "beginsWith",
            Operator::EndsWith => "endsWith",
            Operator::DoesNotContain => "doesNotContain",
            Operator::DoesNotBeginWith => "doesNotBeginWith",
            Operator::DoesNotEndWith => "doesNotEndWith",
            Operator::Null => "null",
            Operator::NotNull => "notNull",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::Between => "between",
            Operator::NotBetween => "notBetween",
        }
    }

    /// Operators that take no value (`IS NULL`, `IS NOT NULL`)
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Null | Operator::NotNull)
    }

    /// Pattern-matching operators rendered with `LIKE`
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            Operator::Contains
                | Operator::BeginsWith
                | Operator::EndsWith
                | Operator::DoesNotContain
                | Operator::DoesNotBeginWith
                | Operator::DoesNotEndWith
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .copied()
            .find(|op| op.name() == s)
            .ok_or_else(|| QueryError::UnknownOperator(s.to_string()))
    }
}

/// Whether a rule's value is a literal or a reference to another field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    #[default]
    Value,
    Field,
}

/// A single field/operator/value condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub value_source: ValueSource,
}

impl Rule {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            id: None,
            field: field.into(),
            operator,
            value: value.into(),
            value_source: ValueSource::Value,
        }
    }

    /// A rule comparing `field` against another column
    pub fn against_field(
        field: impl Into<String>,
        operator: Operator,
        other: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            field: field.into(),
            operator,
            value: Value::String(other.into()),
            value_source: ValueSource::Field,
        }
    }
}

/// A combinator plus an ordered list of children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RuleGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not: bool,
    #[serde(default)]
    pub rules: Vec<RuleNode>,
}

impl RuleGroup {
    pub fn new(combinator: Combinator) -> Self {
        Self {
            combinator,
            ..Self::default()
        }
    }

    pub fn and(rules: Vec<RuleNode>) -> Self {
        Self {
            combinator: Combinator::And,
            rules,
            ..Self::default()
        }
    }

    pub fn or(rules: Vec<RuleNode>) -> Self {
        Self {
            combinator: Combinator::Or,
            rules,
            ..Self::default()
        }
    }

    pub fn negated(mut self) -> Self {
        self.not = !self.not;
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(RuleNode::Rule(rule));
        self
    }

    pub fn with_group(mut self, group: RuleGroup) -> Self {
        self.rules.push(RuleNode::Group(group));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Depth-first iterator over every rule in the tree
    pub fn iter_rules(&self) -> Box<dyn Iterator<Item = &Rule> + '_> {
        Box::new(self.rules.iter().flat_map(|node| -> Box<dyn Iterator<Item = &Rule> + '_> {
            match node {
                RuleNode::Rule(rule) => Box::new(std::iter::once(rule)),
                RuleNode::Group(group) => group.iter_rules(),
            }
        }))
    }

    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, QueryError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Either a leaf rule or a nested group. An object carrying a `field` key is
/// a rule and must parse as one; anything else is a group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleNode {
    Rule(Rule),
    Group(RuleGroup),
}

impl<'de> Deserialize<'de> for RuleNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let is_rule = value.as_object().map_or(false, |obj| obj.contains_key("field"));
        if is_rule {
            Rule::deserialize(value)
                .map(RuleNode::Rule)
                .map_err(de::Error::custom)
        } else {
            RuleGroup::deserialize(value)
                .map(RuleNode::Group)
                .map_err(de::Error::custom)
        }
    }
}

impl From<Rule> for RuleNode {
    fn from(rule: Rule) -> Self {
        RuleNode::Rule(rule)
    }
}

impl From<RuleGroup> for RuleNode {
    fn from(group: RuleGroup) -> Self {
        RuleNode::Group(group)
    }
}
