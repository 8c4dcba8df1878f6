//! Field registry: the columns a rule may reference and what each allows.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{error_codes, QueryError, ValidationIssue};
use crate::rules::{Operator, Rule, RuleGroup, RuleNode, ValueSource};

const BUILTIN_FIELDS: &str = include_str!("../assets/fields.yaml");

/// How the rule builder edits a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueEditor {
    #[default]
    Text,
    Number,
    Select,
}

fn default_operator() -> Operator {
    Operator::Equal
}

/// One entry of the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub value_editor: ValueEditor,
    /// Enumerated values for `select` editors
    #[serde(default)]
    pub values: Vec<String>,
    /// Allowed operators. `None` allows every operator.
    #[serde(default)]
    pub operators: Option<Vec<Operator>>,
    #[serde(default = "default_operator")]
    pub default_operator: Operator,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub requires_value: bool,
}

impl FieldDescriptor {
    pub fn allowed_operators(&self) -> Vec<Operator> {
        match &self.operators {
            Some(ops) => ops.clone(),
            None => Operator::ALL.to_vec(),
        }
    }

    pub fn allows(&self, operator: Operator) -> bool {
        self.operators
            .as_ref()
            .map_or(true, |ops| ops.contains(&operator))
    }
}

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    fields: Vec<FieldDescriptor>,
}

/// Ordered set of field descriptors
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRegistry {
    fields: Vec<FieldDescriptor>,
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

impl FieldRegistry {
    /// Registry describing the bundled IMDB dataset
    pub fn builtin() -> Result<Self, QueryError> {
        Self::from_yaml(BUILTIN_FIELDS)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, QueryError> {
        let document: RegistryDocument = serde_yaml::from_str(yaml)?;
        debug!(fields = document.fields.len(), "loaded field registry");
        Ok(Self {
            fields: document.fields,
        })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// A rule for `field` seeded with its default operator and value, as the
    /// builder creates when a field is picked
    pub fn new_rule(&self, field: &str) -> Option<Rule> {
        self.get(field).map(|descriptor| {
            let value = descriptor
                .default_value
                .clone()
                .unwrap_or_else(|| Value::String(String::new()));
            Rule::new(descriptor.name.clone(), descriptor.default_operator, value)
        })
    }

    /// Every problem in `tree`, in depth-first order
    pub fn issues(&self, tree: &RuleGroup) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        self.collect_issues(tree, "", &mut issues);
        issues
    }

    /// Check the tree against the registry
    pub fn validate(&self, tree: &RuleGroup) -> Result<(), QueryError> {
        match QueryError::from_issues(self.issues(tree)) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn collect_issues(&self, group: &RuleGroup, prefix: &str, issues: &mut Vec<ValidationIssue>) {
        for (i, node) in group.rules.iter().enumerate() {
            let path = format!("{}rules[{}]", prefix, i);
            match node {
                RuleNode::Group(child) => {
                    self.collect_issues(child, &format!("{}.", path), issues)
                }
                RuleNode::Rule(rule) => self.check_rule(rule, path, issues),
            }
        }
    }

    fn check_rule(&self, rule: &Rule, path: String, issues: &mut Vec<ValidationIssue>) {
        let Some(descriptor) = self.get(&rule.field) else {
            issues.push(ValidationIssue::new(
                error_codes::UNKNOWN_FIELD,
                format!("Unknown field '{}'", rule.field),
                path,
            ));
            return;
        };

        if !descriptor.allows(rule.operator) {
            issues.push(ValidationIssue::new(
                error_codes::OPERATOR_NOT_ALLOWED,
                format!("Operator '{}' is not allowed for field '{}'", rule.operator, rule.field),
                path.clone(),
            ));
        }

        if rule.operator.is_unary() {
            return;
        }

        if descriptor.requires_value && is_blank(&rule.value) {
            issues.push(ValidationIssue::new(
                error_codes::MISSING_VALUE,
                format!("Field '{}' requires a value", rule.field),
                path.clone(),
            ));
        }

        if descriptor.values.is_empty() || rule.value_source == ValueSource::Field {
            return;
        }

        let candidates: Vec<&str> = match &rule.value {
            Value::String(s) if matches!(rule.operator, Operator::In | Operator::NotIn) => {
                s.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
            }
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };

        for candidate in candidates {
            if !descriptor.values.iter().any(|v| v == candidate) {
                issues.push(ValidationIssue::new(
                    error_codes::VALUE_NOT_ENUMERATED,
                    format!("'{}' is not a known value for field '{}'", candidate, rule.field),
                    path.clone(),
                ));
            }
        }
    }
}
