use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::table::AgentTable;

/// Single county/year claim row from the property summary agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CountyClaimRow {
    #[serde(default)]
    pub state: Option<String>,
    pub county_code: String,
    pub loss_year: i32,
    pub paid_total: f64,
    pub claims_count: i64,
    pub avg_paid_per_claim: f64,
}

/// Report A: county-level claim history with derived totals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertySummary {
    pub rows: Vec<CountyClaimRow>,
    pub total_counties: i64,
    pub total_claims: i64,
    pub avg_paid_overall: f64,
    pub cached_at: DateTime<Utc>,
    pub cache_expires_at: DateTime<Utc>,
    /// Untouched agent payload, retained for debugging.
    #[serde(default)]
    pub raw_response: Option<Value>,
}

/// Report B: ZIP-level claim frequency and claims-weighted average loss.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZipClaimStats {
    pub zip_code: String,
    pub years: i64,
    pub claim_frequency: i64,
    pub avg_loss: f64,
    pub cached_at: DateTime<Utc>,
    pub cache_expires_at: DateTime<Utc>,
    #[serde(default)]
    pub raw_response: Option<Value>,
}

/// Report C: severity trend and large-loss drilldown tables.
///
/// Either table may be absent; the report is only unavailable when both
/// came back rowless.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    #[serde(default)]
    pub severity_table: Option<AgentTable>,
    #[serde(default)]
    pub large_losses_table: Option<AgentTable>,
    pub county_code: String,
    pub min_loss_threshold: f64,
    pub cached_at: DateTime<Utc>,
    pub cache_expires_at: DateTime<Utc>,
    #[serde(default)]
    pub raw_severity: Option<Value>,
    #[serde(default)]
    pub raw_large_losses: Option<Value>,
}
