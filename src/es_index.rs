//! Index naming and `_cat/indices` response handling.

use serde_json::Value;

/// `_cat/indices` column projection used when counting documents.
pub const DEFAULT_POLL_FILTER: &str = "index,docs.count";

const TEMPORARY_SUFFIX: &str = "_temporary";

/// Exact-name match against a full index listing. Substrings never count.
pub fn index_listed<S: AsRef<str>>(listing: &[S], index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    listing.iter().any(|name| {
        name.as_ref()
            .split_whitespace()
            .any(|token| token == index)
    })
}

/// Names from a `_cat/indices?format=json` response.
pub fn index_names(rows: &Value) -> Vec<String> {
    rows.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|row| row.get("index").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Sum of `docs.count` over all rows; `None` when no row reports a count.
pub fn parse_doc_count(rows: &Value) -> Option<u64> {
    let items = rows.as_array()?;
    let mut total: Option<u64> = None;
    for row in items {
        let count = match row.get("docs.count") {
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            Some(Value::Number(n)) => n.as_u64(),
            _ => None,
        };
        if let Some(n) = count {
            total = Some(total.unwrap_or(0) + n);
        }
    }
    total
}

/// Saved-object id for the index pattern backing `index`.
pub fn index_pattern_id_for(index: &str) -> String {
    index
        .replace('*', "")
        .trim_end_matches('-')
        .trim_end_matches('_')
        .to_string()
}

pub fn temporary_index_name(index: &str) -> String {
    format!("{index}{TEMPORARY_SUFFIX}")
}

/// Lowercase, and must not start with `-` or `_`.
pub fn validate_index_name(index: &str) -> Result<(), String> {
    if index.is_empty() {
        return Ok(());
    }
    if index.starts_with('-') || index.starts_with('_') {
        return Err(format!("index {index:?} must not start with '-' or '_'"));
    }
    if index.chars().any(|c| c.is_uppercase()) {
        return Err(format!("index {index:?} must be lowercase"));
    }
    Ok(())
}
