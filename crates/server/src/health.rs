use std::path::Path;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use crate::routes::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub cache: HealthCheck,
    pub case_store: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cache = if state.reports.cache_dir().is_dir() {
        HealthCheck {
            status: "ready",
            detail: format!("cache holds {} records", state.reports.cached_records().len()),
        }
    } else {
        HealthCheck {
            status: "degraded",
            detail: format!("cache directory is missing: {}", state.reports.cache_dir().display()),
        }
    };
    let case_store = directory_check(state.cases.root(), "case data root");
    let ready = cache.status == "ready" && case_store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "caseview-server runtime initialized".to_string(),
        },
        cache,
        case_store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn directory_check(dir: &Path, what: &str) -> HealthCheck {
    if dir.is_dir() {
        HealthCheck { status: "ready", detail: format!("{what} is accessible") }
    } else {
        HealthCheck {
            status: "degraded",
            detail: format!("{what} is missing: {}", dir.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::{extract::State, http::StatusCode, Json};
    use tempfile::TempDir;

    use crate::health::health;
    use crate::routes::tests::state_with_responses;

    #[tokio::test]
    async fn health_returns_ready_when_directories_exist() {
        let (dir, state) = state_with_responses(vec![]);
        fs::create_dir_all(dir.path().join("cases")).expect("cases dir");

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.cache.status, "ready");
        assert_eq!(payload.case_store.status, "ready");
    }

    #[tokio::test]
    async fn health_degrades_when_the_cache_directory_disappears() {
        let (dir, state) = state_with_responses(vec![]);
        fs::remove_dir_all(dir.path().join("agent_cache")).expect("remove cache dir");

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.cache.status, "degraded");
        assert_eq!(payload.service.status, "ready");
    }

    #[tokio::test]
    async fn health_degrades_when_the_case_root_is_missing() {
        let (_dir, mut state) = state_with_responses(vec![]);
        state.cases = std::sync::Arc::new(caseview_store::CaseStore::new("/nonexistent/cases"));

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.case_store.status, "degraded");
    }
}
