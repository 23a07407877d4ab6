//! Agent table normalization.
//!
//! Data agents return loosely-structured JSON: status strings, declared
//! row/column counts, a `response` array of row objects, and sometimes an
//! explicit `column_keys` list. Any of those can be missing or mistyped.
//! `normalize_table` converts whatever arrives into the canonical
//! [`AgentTable`] shape, dropping malformed pieces with a logged reason
//! instead of failing the request.

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::table::{AgentTable, TableRow, TableStatus};

/// Normalize a raw agent payload into an [`AgentTable`].
///
/// Returns `None` when the payload is not an object at all; every other
/// malformation degrades to an empty or partial table. `context` names the
/// sub-query for log lines.
pub fn normalize_table(raw: &Value, context: &str) -> Option<AgentTable> {
    let Some(source) = raw.as_object() else {
        if !raw.is_null() {
            debug!(context, "agent payload is not an object, no table produced");
        }
        return None;
    };

    let status = TableStatus::parse(source.get("status").and_then(Value::as_str));

    let mut rows: Vec<TableRow> = Vec::new();
    if let Some(Value::Array(raw_rows)) = source.get("response") {
        for (index, row) in raw_rows.iter().enumerate() {
            match row {
                Value::Object(fields) => rows.push(fields.clone()),
                _ => warn!(context, index, "dropping non-object row from agent response"),
            }
        }
    }

    let column_keys = match source.get("column_keys") {
        Some(Value::Array(keys)) => keys.iter().filter_map(scalar_to_string).collect(),
        _ => derive_column_keys(&rows),
    };

    // Agents sometimes declare a row count that disagrees with the payload;
    // trust a positive declared count, otherwise count what we kept.
    let row_count = match coerce_i64(source.get("rows")) {
        Some(count) if count > 0 => count,
        _ => rows.len() as i64,
    };

    Some(AgentTable {
        status,
        column_count: coerce_i64(source.get("columns")),
        row_count: Some(row_count),
        summary: source.get("summary").and_then(Value::as_str).map(str::to_owned),
        comments: source.get("comments").and_then(Value::as_str).map(str::to_owned),
        rows,
        column_keys,
    })
}

/// Union of row keys in first-seen order, no duplicates.
pub fn derive_column_keys(rows: &[TableRow]) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !ordered.iter().any(|seen| seen == key) {
                ordered.push(key.clone());
            }
        }
    }
    ordered
}

/// Best-effort integer coercion: JSON integers, lossy floats, and numeric
/// strings all count; anything else is `None`.
pub fn coerce_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => {
            number.as_i64().or_else(|| number.as_f64().map(|float| float as i64))
        }
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Best-effort float coercion, same tolerance as [`coerce_i64`].
pub fn coerce_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
