//! Derived statistics over normalized report rows.
//!
//! All three procedures are pure and deterministic: rows are visited in
//! array order and distinct counts use ordered sets, so re-aggregating the
//! same input yields bit-identical output.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::warn;

use crate::domain::report::CountyClaimRow;
use crate::domain::table::AgentTable;
use crate::normalize::{coerce_f64, coerce_i64};

/// Totals derived from property summary rows.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyAggregates {
    pub rows: Vec<CountyClaimRow>,
    pub total_counties: i64,
    pub total_claims: i64,
    pub avg_paid_overall: f64,
}

/// Totals derived from ZIP claim rows.
#[derive(Clone, Debug, PartialEq)]
pub struct ZipAggregates {
    pub claim_frequency: i64,
    pub avg_loss: f64,
}

/// Parse and aggregate property summary rows.
///
/// Rows that fail to parse into [`CountyClaimRow`] are dropped one by one
/// with a logged reason; `None` means nothing usable survived. The overall
/// average is claims-weighted (`Σ paid_total / Σ claims_count`), defined as
/// `0` when no claims exist.
pub fn aggregate_property_rows(raw_rows: &[Value]) -> Option<PropertyAggregates> {
    let mut rows: Vec<CountyClaimRow> = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        match serde_json::from_value::<CountyClaimRow>(raw.clone()) {
            Ok(row) => rows.push(row),
            Err(error) => {
                warn!(%error, row = %raw, "dropping county claim row that failed to parse");
            }
        }
    }

    if rows.is_empty() {
        return None;
    }

    let counties: BTreeSet<&str> = rows.iter().map(|row| row.county_code.as_str()).collect();
    let total_claims: i64 = rows.iter().map(|row| row.claims_count).sum();
    let total_paid: f64 = rows.iter().map(|row| row.paid_total).sum();
    let avg_paid_overall =
        if total_claims > 0 { total_paid / total_claims as f64 } else { 0.0 };

    Some(PropertyAggregates {
        total_counties: counties.len() as i64,
        total_claims,
        avg_paid_overall,
        rows,
    })
}

/// Aggregate ZIP claim rows into a total count and claims-weighted average.
///
/// Only row-level averages are available, so each row's total paid is
/// reconstructed as `avg_loss * claims_count` before summing. Missing or
/// non-numeric fields count as zero, mirroring the agent's own contract.
pub fn aggregate_zip_rows(raw_rows: &[Value]) -> ZipAggregates {
    let mut claim_frequency: i64 = 0;
    let mut total_paid: f64 = 0.0;

    for (index, raw) in raw_rows.iter().enumerate() {
        let Some(fields) = raw.as_object() else {
            warn!(index, "dropping non-object row from zip stats response");
            continue;
        };
        let claims = coerce_i64(fields.get("claims_count")).unwrap_or(0);
        let avg_loss = coerce_f64(fields.get("avg_loss")).unwrap_or(0.0);
        claim_frequency += claims;
        total_paid += avg_loss * claims as f64;
    }

    let avg_loss =
        if claim_frequency > 0 { total_paid / claim_frequency as f64 } else { 0.0 };

    ZipAggregates { claim_frequency, avg_loss }
}

/// A risk assessment is usable when at least one of its tables has rows.
pub fn risk_tables_have_rows(
    severity: Option<&AgentTable>,
    large_losses: Option<&AgentTable>,
) -> bool {
    severity.is_some_and(AgentTable::has_rows)
        || large_losses.is_some_and(AgentTable::has_rows)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{aggregate_property_rows, aggregate_zip_rows, risk_tables_have_rows};
    use crate::domain::table::{AgentTable, TableStatus};
    use crate::normalize::normalize_table;

    fn property_rows() -> Vec<serde_json::Value> {
        vec![
            json!({
                "state": "TX",
                "county_code": "48229",
                "loss_year": 2021,
                "paid_total": 120_000.0,
                "claims_count": 12,
                "avg_paid_per_claim": 10_000.0,
            }),
            json!({
                "state": "TX",
                "county_code": "48157",
                "loss_year": 2021,
                "paid_total": 30_000.0,
                "claims_count": 3,
                "avg_paid_per_claim": 10_000.0,
            }),
            json!({
                "state": "TX",
                "county_code": "48229",
                "loss_year": 2020,
                "paid_total": 50_000.0,
                "claims_count": 5,
                "avg_paid_per_claim": 10_000.0,
            }),
        ]
    }

    #[test]
    fn property_aggregation_counts_distinct_counties_and_weights_by_claims() {
        let aggregates = aggregate_property_rows(&property_rows()).expect("aggregates");
        assert_eq!(aggregates.total_counties, 2);
        assert_eq!(aggregates.total_claims, 20);
        assert_eq!(aggregates.avg_paid_overall, 200_000.0 / 20.0);
        assert_eq!(aggregates.rows.len(), 3);
    }

    #[test]
    fn property_aggregation_is_idempotent() {
        let rows = property_rows();
        let first = aggregate_property_rows(&rows).expect("first pass");
        let second = aggregate_property_rows(&rows).expect("second pass");
        assert_eq!(first, second);
        assert_eq!(first.avg_paid_overall.to_bits(), second.avg_paid_overall.to_bits());
    }

    #[test]
    fn malformed_property_rows_are_dropped_individually() {
        let mut rows = property_rows();
        rows.insert(1, json!({"county_code": "48001"})); // missing numeric fields
        rows.push(json!("not even an object"));

        let aggregates = aggregate_property_rows(&rows).expect("aggregates");
        assert_eq!(aggregates.rows.len(), 3);
        assert_eq!(aggregates.total_claims, 20);
    }

    #[test]
    fn property_aggregation_reports_no_data_for_zero_valid_rows() {
        assert!(aggregate_property_rows(&[]).is_none());
        assert!(aggregate_property_rows(&[json!({"loss_year": "bad"})]).is_none());
    }

    #[test]
    fn zip_aggregation_reconstructs_claims_weighted_average() {
        let rows = vec![
            json!({"claims_count": 10, "avg_loss": 100.0}),
            json!({"claims_count": 5, "avg_loss": 40.0}),
        ];
        let aggregates = aggregate_zip_rows(&rows);
        assert_eq!(aggregates.claim_frequency, 15);
        assert_eq!(aggregates.avg_loss, 80.0);
    }

    #[test]
    fn zip_aggregation_handles_zero_claims_without_dividing() {
        let aggregates = aggregate_zip_rows(&[json!({"claims_count": 0, "avg_loss": 500.0})]);
        assert_eq!(aggregates.claim_frequency, 0);
        assert_eq!(aggregates.avg_loss, 0.0);
        assert!(!aggregates.avg_loss.is_nan());
    }

    #[test]
    fn zip_aggregation_coerces_string_numerics_and_skips_junk_rows() {
        let rows = vec![
            json!({"claims_count": "4", "avg_loss": "250.0"}),
            json!(["not", "a", "row"]),
            json!({"avg_loss": 999.0}), // missing count contributes nothing
        ];
        let aggregates = aggregate_zip_rows(&rows);
        assert_eq!(aggregates.claim_frequency, 4);
        assert_eq!(aggregates.avg_loss, 250.0);
    }

    #[test]
    fn risk_assessment_is_valid_with_a_single_populated_table() {
        let populated = normalize_table(
            &json!({"status": "success", "response": [{"loss_year": 2021}]}),
            "severity",
        );
        let empty = Some(AgentTable { status: TableStatus::NoData, ..AgentTable::default() });

        assert!(risk_tables_have_rows(populated.as_ref(), empty.as_ref()));
        assert!(risk_tables_have_rows(None, populated.as_ref()));
        assert!(!risk_tables_have_rows(empty.as_ref(), None));
        assert!(!risk_tables_have_rows(None, None));
    }
}
