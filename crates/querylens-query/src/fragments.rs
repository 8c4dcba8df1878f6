//! Clause extraction from free-form query text.
//!
//! These are anchored regular expressions, not a parser. A `LIMIT` or
//! `ORDER BY` inside a string literal or subquery can still be picked up.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref SELECT_LIST: Regex = Regex::new(r"(?is)^\s*SELECT\s+(.*?)\s+FROM\b").unwrap();
    static ref ORDER_BY: Regex =
        Regex::new(r"(?is)\bORDER\s+BY\s+(.*?)\s*(?:\bLIMIT\s+\d+)?\s*;?\s*$").unwrap();
    static ref LIMIT: Regex = Regex::new(r"(?i)\bLIMIT\s+(\d+)\s*;?\s*$").unwrap();
}

fn capture(pattern: &Regex, text: &str) -> Option<String> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// The three fragments found in one query text. `None` means the clause is
/// absent from that text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFragments {
    pub select: Option<String>,
    pub order_by: Option<String>,
    pub limit: Option<String>,
}

impl QueryFragments {
    pub fn extract(text: &str) -> Self {
        Self {
            select: extract_select(text),
            order_by: extract_order_by(text),
            limit: extract_limit(text),
        }
    }
}

/// Text between a leading `SELECT` and the next `FROM`
pub fn extract_select(text: &str) -> Option<String> {
    capture(&SELECT_LIST, text)
}

/// Text after `ORDER BY`, up to a trailing `LIMIT <digits>` or end of text
pub fn extract_order_by(text: &str) -> Option<String> {
    capture(&ORDER_BY, text)
}

/// Digits of a trailing `LIMIT <digits>`
pub fn extract_limit(text: &str) -> Option<String> {
    capture(&LIMIT, text)
}
