use std::sync::Arc;

use caseview_agent::{HttpDataAgentClient, ReportService};
use caseview_core::config::{AppConfig, ConfigError, LoadOptions};
use caseview_store::{CacheError, CaseStore, ResponseCache};
use thiserror::Error;
use tracing::info;

use crate::routes::AppState;

pub struct Application {
    pub config: AppConfig,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("response cache initialization failed: {0}")]
    CacheInit(#[source] CacheError),
    #[error("data agent client initialization failed: {0}")]
    AgentClient(#[source] anyhow::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let cache = ResponseCache::new(&config.cache.dir).map_err(BootstrapError::CacheInit)?;
    info!(
        event_name = "system.bootstrap.cache_ready",
        correlation_id = "bootstrap",
        cache_dir = %config.cache.dir.display(),
        "response cache directory ready"
    );

    let client = HttpDataAgentClient::new(&config.agent).map_err(BootstrapError::AgentClient)?;
    let reports =
        Arc::new(ReportService::new(Arc::new(client), cache, config.cache.default_ttl_hours));
    let cases = Arc::new(CaseStore::new(&config.data.root));

    info!(
        event_name = "system.bootstrap.complete",
        correlation_id = "bootstrap",
        data_root = %config.data.root.display(),
        "application bootstrap complete"
    );

    Ok(Application { state: AppState { cases, reports }, config })
}

#[cfg(test)]
mod tests {
    use caseview_core::config::{ConfigOverrides, LoadOptions};
    use tempfile::TempDir;

    use crate::bootstrap::bootstrap;

    fn overrides_in(dir: &TempDir) -> ConfigOverrides {
        ConfigOverrides {
            data_root: Some(dir.path().join("data")),
            cache_dir: Some(dir.path().join("data/agent_cache")),
            agent_endpoint: Some("http://localhost:9/agent".to_string()),
            agent_name: Some("nfip-data-agent".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn bootstrap_fails_fast_without_an_agent_endpoint() {
        let dir = TempDir::new().expect("temp dir");
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                agent_endpoint: None,
                agent_name: None,
                ..overrides_in(&dir)
            },
            ..LoadOptions::default()
        });

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("agent.endpoint"));
    }

    #[test]
    fn bootstrap_creates_the_cache_directory() {
        let dir = TempDir::new().expect("temp dir");
        let app = bootstrap(LoadOptions {
            overrides: overrides_in(&dir),
            ..LoadOptions::default()
        })
        .expect("bootstrap should succeed with valid overrides");

        assert!(app.state.reports.cache_dir().is_dir());
        assert_eq!(app.state.cases.root(), dir.path().join("data"));
        assert_eq!(app.config.cache.default_ttl_hours, 72);
    }
}
