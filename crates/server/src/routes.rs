//! HTTP surface for case documents and their reports.
//!
//! Every report endpoint follows the same contract: 404 when the case
//! document does not exist, 400 when the case is missing the property
//! field the report keys off, 503 when the report cannot be produced
//! right now. A 503 is retryable; the underlying fetch is not cached on
//! failure, so the next request tries the data agent again.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use caseview_agent::ReportService;
use caseview_core::{PropertySummary, RiskAssessment, ZipClaimStats};
use caseview_store::{CaseProperty, CaseStore};

use crate::health;

const DEFAULT_YEARS: i64 = 10;
const MAX_YEARS: i64 = 20;
const DEFAULT_MIN_LOSS: i64 = 1_000;
const MAX_MIN_LOSS: i64 = 500_000;

#[derive(Clone)]
pub struct AppState {
    pub cases: Arc<CaseStore>,
    pub reports: Arc<ReportService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/cases", get(list_cases))
        .route("/cases/{case_id}", get(get_case))
        .route("/cases/{case_id}/reports/property-summary", get(property_summary))
        .route("/cases/{case_id}/reports/zip-stats", get(zip_stats))
        .route("/cases/{case_id}/reports/risk-assessment", get(risk_assessment))
        .with_state(state)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("case {0} not found")]
    CaseNotFound(String),
    #[error("case {case_id} has no usable {field}")]
    MissingProperty { case_id: String, field: &'static str },
    #[error("{report} report is unavailable for case {case_id}")]
    ReportUnavailable { case_id: String, report: &'static str },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::CaseNotFound(_) => StatusCode::NOT_FOUND,
            Self::MissingProperty { .. } => StatusCode::BAD_REQUEST,
            Self::ReportUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub force_refresh: bool,
    pub years: Option<i64>,
    pub min_loss: Option<i64>,
}

impl ReportQuery {
    fn years(&self) -> i64 {
        self.years.unwrap_or(DEFAULT_YEARS).clamp(1, MAX_YEARS)
    }

    fn min_loss(&self) -> i64 {
        self.min_loss.unwrap_or(DEFAULT_MIN_LOSS).clamp(DEFAULT_MIN_LOSS, MAX_MIN_LOSS)
    }
}

async fn list_cases(State(state): State<AppState>) -> Json<Vec<Value>> {
    Json(state.cases.list_cases())
}

async fn get_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.cases.get_case(&case_id).map(Json).ok_or(ApiError::CaseNotFound(case_id))
}

async fn property_summary(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<PropertySummary>, ApiError> {
    let property = case_property(&state, &case_id)?;
    let state_code = property.state_code().ok_or(ApiError::MissingProperty {
        case_id: case_id.clone(),
        field: "address state",
    })?;
    let county_code = property.county_code.ok_or(ApiError::MissingProperty {
        case_id: case_id.clone(),
        field: "countyCode",
    })?;

    state
        .reports
        .property_summary(&case_id, &state_code, &county_code, query.force_refresh)
        .await
        .map(Json)
        .ok_or(ApiError::ReportUnavailable { case_id, report: "property summary" })
}

async fn zip_stats(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ZipClaimStats>, ApiError> {
    let property = case_property(&state, &case_id)?;
    let zip_code = property.zip_code.ok_or(ApiError::MissingProperty {
        case_id: case_id.clone(),
        field: "zipCode",
    })?;

    state
        .reports
        .zip_stats(&case_id, &zip_code, query.years(), query.force_refresh)
        .await
        .map(Json)
        .ok_or(ApiError::ReportUnavailable { case_id, report: "zip stats" })
}

async fn risk_assessment(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<RiskAssessment>, ApiError> {
    let property = case_property(&state, &case_id)?;
    let county_code = property.county_code.ok_or(ApiError::MissingProperty {
        case_id: case_id.clone(),
        field: "countyCode",
    })?;

    state
        .reports
        .risk_assessment(&case_id, &county_code, query.min_loss(), query.force_refresh)
        .await
        .map(Json)
        .ok_or(ApiError::ReportUnavailable { case_id, report: "risk assessment" })
}

fn case_property(state: &AppState, case_id: &str) -> Result<CaseProperty, ApiError> {
    state
        .cases
        .get_case(case_id)
        .map(|case| CaseProperty::from_case(&case))
        .ok_or_else(|| ApiError::CaseNotFound(case_id.to_owned()))
}
