//! Legacy cache payload migration.
//!
//! Early builds cached risk assessments as flat row arrays under
//! `severity_rows` / `large_losses` instead of normalized tables. Reads
//! from cache pass through here so consumers only ever see the current
//! schema, and re-caching never reintroduces the old shape.

use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::table::{AgentTable, TableRow, TableStatus};
use crate::normalize::{derive_column_keys, normalize_table};

const LEGACY_SEVERITY_ROWS: &str = "severity_rows";
const LEGACY_LARGE_LOSSES: &str = "large_losses";

/// Upgrade a stored risk assessment payload to the current schema.
///
/// Payloads that already carry `severity_table` and `large_losses_table`
/// pass through unchanged apart from legacy field removal. Missing tables
/// are synthesized from the retained raw payload first, then from legacy
/// flat rows. Never fails; an unusable source leaves the field `null`.
pub fn upgrade_risk_payload(data: Value) -> Value {
    let Value::Object(mut payload) = data else {
        return Value::Object(Map::new());
    };

    if !payload.contains_key("severity_table") {
        let table = normalize_table(
            payload.get("raw_severity").unwrap_or(&Value::Null),
            "severity",
        )
        .or_else(|| table_from_legacy_rows(payload.get(LEGACY_SEVERITY_ROWS)));
        payload.insert("severity_table".to_owned(), table_to_value(table));
    }

    if !payload.contains_key("large_losses_table") {
        let table = normalize_table(
            payload.get("raw_large_losses").unwrap_or(&Value::Null),
            "large_losses",
        )
        .or_else(|| table_from_legacy_rows(payload.get(LEGACY_LARGE_LOSSES)));
        payload.insert("large_losses_table".to_owned(), table_to_value(table));
    }

    payload.remove(LEGACY_SEVERITY_ROWS);
    payload.remove(LEGACY_LARGE_LOSSES);

    Value::Object(payload)
}

/// Build a minimal table straight from legacy flat rows: status success,
/// counts and column keys derived from the rows themselves.
fn table_from_legacy_rows(raw: Option<&Value>) -> Option<AgentTable> {
    let raw_rows = raw?.as_array()?;
    if raw_rows.is_empty() {
        return None;
    }

    let rows: Vec<TableRow> = raw_rows
        .iter()
        .filter_map(|row| row.as_object().cloned())
        .collect();
    if rows.is_empty() {
        return None;
    }

    Some(AgentTable {
        status: TableStatus::Success,
        column_count: rows.first().map(|row| row.len() as i64),
        row_count: Some(rows.len() as i64),
        summary: None,
        comments: None,
        column_keys: derive_column_keys(&rows),
        rows,
    })
}

fn table_to_value(table: Option<AgentTable>) -> Value {
    match table {
        Some(table) => serde_json::to_value(&table).unwrap_or_else(|error| {
            warn!(%error, "upgraded agent table failed to serialize");
            Value::Null
        }),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::upgrade_risk_payload;

    #[test]
    fn current_schema_payloads_pass_through_unchanged() {
        let payload = json!({
            "severity_table": {"status": "success", "rows": [{"a": 1}], "column_keys": ["a"]},
            "large_losses_table": null,
            "county_code": "48229",
        });
        let upgraded = upgrade_risk_payload(payload.clone());
        assert_eq!(upgraded, payload);
    }

    #[test]
    fn legacy_flat_rows_are_promoted_to_tables_and_stripped() {
        let payload = json!({
            "county_code": "48229",
            "severity_rows": [
                {"loss_year": 2021, "county_avg": 9_000.0},
                {"loss_year": 2020, "state_avg": 7_500.0},
            ],
            "large_losses": [{"claim_id": "CL-1", "paid_total": 250_000.0}],
        });

        let upgraded = upgrade_risk_payload(payload);
        let severity = &upgraded["severity_table"];
        assert_eq!(severity["status"], "success");
        assert_eq!(severity["row_count"], 2);
        assert_eq!(severity["column_count"], 2);
        assert_eq!(
            severity["column_keys"],
            json!(["loss_year", "county_avg", "state_avg"])
        );

        let large_losses = &upgraded["large_losses_table"];
        assert_eq!(large_losses["row_count"], 1);

        let fields = upgraded.as_object().expect("object payload");
        assert!(!fields.contains_key("severity_rows"));
        assert!(!fields.contains_key("large_losses"));
    }

    #[test]
    fn embedded_raw_payload_wins_over_legacy_rows() {
        let payload = json!({
            "raw_severity": {
                "status": "success",
                "response": [{"loss_year": 2023, "county_avg": 1_200.0}],
            },
            "severity_rows": [{"loss_year": 1999}],
        });

        let upgraded = upgrade_risk_payload(payload);
        assert_eq!(upgraded["severity_table"]["rows"][0]["loss_year"], 2023);
        assert_eq!(upgraded["large_losses_table"], json!(null));
    }

    #[test]
    fn unusable_sources_leave_null_tables_instead_of_failing() {
        let upgraded = upgrade_risk_payload(json!({"county_code": "48229", "severity_rows": []}));
        assert_eq!(upgraded["severity_table"], json!(null));
        assert_eq!(upgraded["large_losses_table"], json!(null));

        assert_eq!(upgrade_risk_payload(json!("not an object")), json!({}));
    }
}
