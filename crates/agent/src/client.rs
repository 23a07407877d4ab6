//! Data-agent client capability.
//!
//! The report service only needs one operation: hand a prompt to the
//! remote data agent and get a structured JSON payload back, or fail.
//! The trait exists so tests (and alternative transports) can substitute
//! a double without touching the orchestration logic.

use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::debug;

use caseview_core::config::AgentConfig;

#[async_trait]
pub trait DataAgentClient: Send + Sync {
    /// Ask the agent a question, expecting a structured JSON response.
    /// Transport failures, timeouts, and non-JSON bodies are errors; the
    /// caller decides how to degrade.
    async fn ask_structured(&self, prompt: &str) -> Result<Value>;
}

/// HTTP transport to the hosted data agent.
pub struct HttpDataAgentClient {
    http: reqwest::Client,
    endpoint: String,
    agent_name: String,
    api_key: Option<secrecy::SecretString>,
}

impl HttpDataAgentClient {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("could not build data agent http client")?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            agent_name: config.agent_name.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl DataAgentClient for HttpDataAgentClient {
    async fn ask_structured(&self, prompt: &str) -> Result<Value> {
        ensure!(!prompt.trim().is_empty(), "prompt cannot be empty");

        debug!(agent = %self.agent_name, "dispatching data agent question");

        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "agent": self.agent_name, "question": prompt }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("data agent request to {} failed", self.endpoint))?
            .error_for_status()
            .context("data agent returned an error status")?;

        response.json::<Value>().await.context("data agent returned a non-JSON body")
    }
}
