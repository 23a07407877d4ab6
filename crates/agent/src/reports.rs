//! Cache-or-fetch orchestration for the three report types.
//!
//! Every operation follows the same path: consult the response cache
//! (bypassing and invalidating it on forced refresh), otherwise ask the
//! data agent, normalize and aggregate the payload, store the result back
//! with a TTL, and hand it to the caller. Failures anywhere along the way
//! resolve to `None` ("report unavailable"); callers retry later or force
//! a refresh. Nothing here panics or propagates an error.
//!
//! Two requests racing on the same key both fetch and both write; the keys
//! are derived from immutable request parameters, so the last writer wins
//! with equivalent content and no coordination is needed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{error, info, warn};

use caseview_core::{
    aggregate_property_rows, aggregate_zip_rows, normalize_table, risk_tables_have_rows,
    upgrade_risk_payload, FunctionId, PropertySummary, RiskAssessment, TableStatus, ZipClaimStats,
};
use caseview_store::ResponseCache;

use crate::client::DataAgentClient;
use crate::prompts;

pub struct ReportService {
    client: Arc<dyn DataAgentClient>,
    cache: ResponseCache,
    ttl: Duration,
}

impl ReportService {
    pub fn new(client: Arc<dyn DataAgentClient>, cache: ResponseCache, ttl_hours: i64) -> Self {
        Self { client, cache, ttl: Duration::hours(ttl_hours) }
    }

    pub fn cache_dir(&self) -> &std::path::Path {
        self.cache.dir()
    }

    /// File names of every cached report record, in sorted order.
    pub fn cached_records(&self) -> Vec<String> {
        self.cache.list(None)
    }

    /// Report A: county-level claim history with derived totals.
    pub async fn property_summary(
        &self,
        case_id: &str,
        state: &str,
        county_code: &str,
        force_refresh: bool,
    ) -> Option<PropertySummary> {
        let function_id = FunctionId::PropertySummary;
        let params = [("state", state), ("county", county_code)];

        if force_refresh {
            self.cache.invalidate(function_id, case_id, &params);
        } else if let Some(record) = self.cache.get(function_id, case_id, &params) {
            match serde_json::from_value::<PropertySummary>(record.response_data) {
                Ok(summary) => return Some(summary),
                Err(error) => {
                    warn!(%error, case_id, "cached property summary is invalid, refetching");
                }
            }
        }

        info!(case_id, state, county_code, "fetching property summary from data agent");
        let raw = match self.client.ask_structured(&prompts::property_summary(state)).await {
            Ok(raw) => raw,
            Err(error) => {
                error!(%error, case_id, "property summary agent call failed");
                return None;
            }
        };

        if !usable_status(&raw, function_id) {
            return None;
        }

        let raw_rows = raw.get("response").and_then(Value::as_array).cloned().unwrap_or_default();
        let Some(aggregates) = aggregate_property_rows(&raw_rows) else {
            warn!(case_id, "no valid rows in property summary response");
            return None;
        };

        let now = Utc::now();
        let summary = PropertySummary {
            rows: aggregates.rows,
            total_counties: aggregates.total_counties,
            total_claims: aggregates.total_claims,
            avg_paid_overall: aggregates.avg_paid_overall,
            cached_at: now,
            cache_expires_at: now + self.ttl,
            raw_response: Some(raw),
        };

        self.store(function_id, case_id, &summary, &params);
        Some(summary)
    }

    /// Report B: ZIP-level claim frequency and claims-weighted average loss.
    pub async fn zip_stats(
        &self,
        case_id: &str,
        zip_code: &str,
        years: i64,
        force_refresh: bool,
    ) -> Option<ZipClaimStats> {
        let function_id = FunctionId::ZipStats;
        let years_param = format!("{years}y");
        let params = [("zip", zip_code), ("years", years_param.as_str())];

        if force_refresh {
            self.cache.invalidate(function_id, case_id, &params);
        } else if let Some(record) = self.cache.get(function_id, case_id, &params) {
            match serde_json::from_value::<ZipClaimStats>(record.response_data) {
                Ok(stats) => return Some(stats),
                Err(error) => {
                    warn!(%error, case_id, "cached zip stats are invalid, refetching");
                }
            }
        }

        info!(case_id, zip_code, years, "fetching zip stats from data agent");
        let raw = match self.client.ask_structured(&prompts::zip_stats(zip_code, years)).await {
            Ok(raw) => raw,
            Err(error) => {
                error!(%error, case_id, "zip stats agent call failed");
                return None;
            }
        };

        if !usable_status(&raw, function_id) {
            return None;
        }

        let raw_rows = raw.get("response").and_then(Value::as_array).cloned().unwrap_or_default();
        let aggregates = aggregate_zip_rows(&raw_rows);

        let now = Utc::now();
        let stats = ZipClaimStats {
            zip_code: zip_code.to_owned(),
            years,
            claim_frequency: aggregates.claim_frequency,
            avg_loss: aggregates.avg_loss,
            cached_at: now,
            cache_expires_at: now + self.ttl,
            raw_response: Some(raw),
        };

        info!(
            case_id,
            claim_frequency = stats.claim_frequency,
            avg_loss = stats.avg_loss,
            "zip stats aggregated"
        );
        self.store(function_id, case_id, &stats, &params);
        Some(stats)
    }

    /// Report C: severity trend and large-loss tables. The two sub-queries
    /// are independent and run concurrently; the report is only
    /// unavailable when both come back rowless.
    pub async fn risk_assessment(
        &self,
        case_id: &str,
        county_code: &str,
        min_loss: i64,
        force_refresh: bool,
    ) -> Option<RiskAssessment> {
        let function_id = FunctionId::RiskAssessment;
        let min_loss_param = min_loss.to_string();
        let params = [("county", county_code), ("min_loss", min_loss_param.as_str())];

        if force_refresh {
            self.cache.invalidate(function_id, case_id, &params);
        } else if let Some(record) = self.cache.get(function_id, case_id, &params) {
            // Older deployments cached flat row arrays; upgrade before use.
            let upgraded = upgrade_risk_payload(record.response_data);
            match serde_json::from_value::<RiskAssessment>(upgraded) {
                Ok(assessment) => return Some(assessment),
                Err(error) => {
                    warn!(%error, case_id, "cached risk assessment is invalid, refetching");
                }
            }
        }

        info!(case_id, county_code, min_loss, "fetching risk assessment from data agent");
        let severity_prompt = prompts::severity_trend(county_code);
        let losses_prompt = prompts::large_losses(county_code, min_loss);
        let (severity_result, losses_result) = tokio::join!(
            self.client.ask_structured(&severity_prompt),
            self.client.ask_structured(&losses_prompt),
        );

        let severity_raw = payload_or_null(severity_result, "severity", case_id);
        let losses_raw = payload_or_null(losses_result, "large_losses", case_id);

        let severity_table = normalize_table(&severity_raw, "severity");
        let large_losses_table = normalize_table(&losses_raw, "large_losses");

        if !risk_tables_have_rows(severity_table.as_ref(), large_losses_table.as_ref()) {
            warn!(case_id, county_code, "no valid data in risk assessment response");
            return None;
        }

        let now = Utc::now();
        let assessment = RiskAssessment {
            severity_table,
            large_losses_table,
            county_code: county_code.to_owned(),
            min_loss_threshold: min_loss as f64,
            cached_at: now,
            cache_expires_at: now + self.ttl,
            raw_severity: (!severity_raw.is_null()).then_some(severity_raw),
            raw_large_losses: (!losses_raw.is_null()).then_some(losses_raw),
        };

        info!(
            case_id,
            severity_rows = assessment
                .severity_table
                .as_ref()
                .map(|table| table.rows.len())
                .unwrap_or(0),
            large_loss_rows = assessment
                .large_losses_table
                .as_ref()
                .map(|table| table.rows.len())
                .unwrap_or(0),
            "risk assessment assembled"
        );
        self.store(function_id, case_id, &assessment, &params);
        Some(assessment)
    }

    fn store<T: serde::Serialize>(
        &self,
        function_id: FunctionId,
        case_id: &str,
        report: &T,
        params: &[(&str, &str)],
    ) {
        match serde_json::to_value(report) {
            Ok(value) => self.cache.set(function_id, case_id, value, self.ttl, params),
            Err(error) => warn!(%error, case_id, %function_id, "report failed to serialize, skipping cache write"),
        }
    }
}

/// Check the agent's own status field before bothering with rows.
fn usable_status(raw: &Value, function_id: FunctionId) -> bool {
    let comments = raw.get("comments").and_then(Value::as_str).unwrap_or("");
    match TableStatus::parse(raw.get("status").and_then(Value::as_str)) {
        TableStatus::Error => {
            error!(%function_id, comments, "data agent reported an error");
            false
        }
        TableStatus::NoData => {
            warn!(%function_id, comments, "data agent reported no data");
            false
        }
        _ => true,
    }
}

fn payload_or_null(result: anyhow::Result<Value>, context: &str, case_id: &str) -> Value {
    match result {
        Ok(payload) => payload,
        Err(error) => {
            error!(%error, context, case_id, "risk assessment sub-query failed");
            Value::Null
        }
    }
}
