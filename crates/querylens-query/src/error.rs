use std::error::Error;
use std::fmt;
use thiserror::Error;

/// All possible errors raised while handling rule trees and query text
#[derive(Error, Debug)]
pub enum QueryError {
    /// Errors that occur during YAML parsing (field registry)
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Errors that occur during JSON processing (rule trees)
    #[error("JSON processing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// A single validation issue
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationIssue),

    /// Multiple validation issues
    #[error("{}", MultipleIssuesFormat(.0))]
    MultipleValidationErrors(Vec<ValidationIssue>),
}

struct MultipleIssuesFormat<'a>(&'a [ValidationIssue]);

impl fmt::Display for MultipleIssuesFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Multiple validation errors ({} issues):", self.0.len())?;
        for (i, issue) in self.0.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, issue)?;
        }
        Ok(())
    }
}

impl QueryError {
    /// Collapse a list of issues into one error. Returns `None` for an empty list.
    pub fn from_issues(mut issues: Vec<ValidationIssue>) -> Option<Self> {
        match issues.len() {
            0 => None,
            1 => issues.pop().map(QueryError::ValidationError),
            _ => Some(QueryError::MultipleValidationErrors(issues)),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::YamlError(_) => "ERR_QUERY_YAML_PARSE",
            QueryError::JsonError(_) => "ERR_QUERY_JSON_PARSE",
            QueryError::UnknownOperator(_) => "ERR_QUERY_UNKNOWN_OPERATOR",
            QueryError::ValidationError(issue) => issue.code,
            QueryError::MultipleValidationErrors(_) => "ERR_QUERY_VALIDATION_MULTIPLE",
        }
    }
}

/// A rule-tree problem found by the field registry
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub code: &'static str,
    pub message: String,
    /// Location in the tree, e.g. `rules[1].rules[0]`
    pub path: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: &'static str, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: Some(path.into()),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}: {} (at {})", self.code, self.message, path)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl Error for ValidationIssue {}

/// Validation issue codes
pub mod error_codes {
    /// Field is not part of the registry
    pub const UNKNOWN_FIELD: &str = "ERR_QUERY_VALIDATION_UNKNOWN_FIELD";

    /// Operator is not allowed for the field
    pub const OPERATOR_NOT_ALLOWED: &str = "ERR_QUERY_VALIDATION_OPERATOR_NOT_ALLOWED";

    /// Field requires a non-empty value
    pub const MISSING_VALUE: &str = "ERR_QUERY_VALIDATION_MISSING_VALUE";

    /// Value is not one of the field's enumerated values
    pub const VALUE_NOT_ENUMERATED: &str = "ERR_QUERY_VALIDATION_VALUE_NOT_ENUMERATED";
}
