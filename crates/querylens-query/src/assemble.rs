use crate::processor::quote_literal;

/// Pieces of a generated query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParts<'a> {
    pub select: &'a str,
    pub dataset_ref: &'a str,
    pub where_clause: &'a str,
    pub order_by: Option<&'a str>,
    pub limit: Option<&'a str>,
}

/// Reference a registered dataset file by key, e.g. `'imdb01-11-2024.parquet'`
pub fn dataset_ref(key: &str) -> String {
    quote_literal(key)
}

/// Lay the parts out one clause per line. Empty clauses are left out, so the
/// result always feeds back through fragment extraction unchanged.
pub fn assemble(parts: &QueryParts<'_>) -> String {
    let mut lines = vec![
        format!("SELECT {}", parts.select.trim()),
        format!("FROM {}", parts.dataset_ref),
    ];

    let clause = parts.where_clause.trim();
    if !clause.is_empty() {
        lines.push("WHERE".to_string());
        lines.push(clause.to_string());
    }

    if let Some(order_by) = parts.order_by.map(str::trim).filter(|s| !s.is_empty()) {
        lines.push(format!("ORDER BY {}", order_by));
    }

    if let Some(limit) = parts.limit.map(str::trim).filter(|s| !s.is_empty()) {
        lines.push(format!("LIMIT {}", limit));
    }

    lines.join("\n")
}
