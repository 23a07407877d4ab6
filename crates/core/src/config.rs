use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data: DataConfig,
    pub cache: CacheConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    /// Root of the local JSON document store (`<root>/cases/<id>.json`).
    pub root: PathBuf,
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub default_ttl_hours: i64,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub endpoint: String,
    pub agent_name: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_root: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub cache_ttl_hours: Option<i64>,
    pub agent_endpoint: Option<String>,
    pub agent_name: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig { root: PathBuf::from("data") },
            cache: CacheConfig {
                dir: PathBuf::from("data/agent_cache"),
                default_ttl_hours: 72,
            },
            agent: AgentConfig {
                endpoint: String::new(),
                agent_name: String::new(),
                api_key: None,
                timeout_secs: 120,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("caseview.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(data) = patch.data {
            if let Some(root) = data.root {
                self.data.root = root;
            }
        }

        if let Some(cache) = patch.cache {
            if let Some(dir) = cache.dir {
                self.cache.dir = dir;
            }
            if let Some(default_ttl_hours) = cache.default_ttl_hours {
                self.cache.default_ttl_hours = default_ttl_hours;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(endpoint) = agent.endpoint {
                self.agent.endpoint = endpoint;
            }
            if let Some(agent_name) = agent.agent_name {
                self.agent.agent_name = agent_name;
            }
            if let Some(api_key) = agent.api_key {
                self.agent.api_key = Some(api_key.into());
            }
            if let Some(timeout_secs) = agent.timeout_secs {
                self.agent.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CASEVIEW_DATA_ROOT") {
            self.data.root = PathBuf::from(value);
        }
        if let Some(value) = read_env("CASEVIEW_CACHE_DIR") {
            self.cache.dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("CASEVIEW_CACHE_TTL_HOURS") {
            self.cache.default_ttl_hours = parse_i64("CASEVIEW_CACHE_TTL_HOURS", &value)?;
        }

        if let Some(value) = read_env("CASEVIEW_AGENT_ENDPOINT") {
            self.agent.endpoint = value;
        }
        if let Some(value) = read_env("CASEVIEW_AGENT_NAME") {
            self.agent.agent_name = value;
        }
        if let Some(value) = read_env("CASEVIEW_AGENT_API_KEY") {
            self.agent.api_key = Some(value.into());
        }
        if let Some(value) = read_env("CASEVIEW_AGENT_TIMEOUT_SECS") {
            self.agent.timeout_secs = parse_u64("CASEVIEW_AGENT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CASEVIEW_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CASEVIEW_SERVER_PORT") {
            self.server.port = parse_u16("CASEVIEW_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("CASEVIEW_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("CASEVIEW_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_root) = overrides.data_root {
            self.data.root = data_root;
        }
        if let Some(cache_dir) = overrides.cache_dir {
            self.cache.dir = cache_dir;
        }
        if let Some(cache_ttl_hours) = overrides.cache_ttl_hours {
            self.cache.default_ttl_hours = cache_ttl_hours;
        }
        if let Some(agent_endpoint) = overrides.agent_endpoint {
            self.agent.endpoint = agent_endpoint;
        }
        if let Some(agent_name) = overrides.agent_name {
            self.agent.agent_name = agent_name;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_cache(&self.cache)?;
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("caseview.toml"), PathBuf::from("config/caseview.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_cache(cache: &CacheConfig) -> Result<(), ConfigError> {
    if cache.default_ttl_hours <= 0 {
        return Err(ConfigError::Validation(
            "cache.default_ttl_hours must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    let endpoint = agent.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::Validation(
            "agent.endpoint is required (set CASEVIEW_AGENT_ENDPOINT or [agent] endpoint)"
                .to_string(),
        ));
    }
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(
            "agent.endpoint must start with http:// or https://".to_string(),
        ));
    }

    if agent.agent_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "agent.agent_name is required (set CASEVIEW_AGENT_NAME or [agent] agent_name)"
                .to_string(),
        ));
    }

    if agent.timeout_secs == 0 || agent.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "agent.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if let Some(api_key) = &agent.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation(
                "agent.api_key must not be blank when provided".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server.bind_address must not be empty".to_string(),
        ));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation(
            "server.port must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    cache: Option<CachePatch>,
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    root: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct CachePatch {
    dir: Option<PathBuf>,
    default_ttl_hours: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    endpoint: Option<String>,
    agent_name: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn valid_overrides() -> ConfigOverrides {
        ConfigOverrides {
            agent_endpoint: Some("http://localhost:9099".to_string()),
            agent_name: Some("nfip-data-agent".to_string()),
            ..ConfigOverrides::default()
        }
    }

    #[test]
    fn defaults_fail_validation_without_an_agent_endpoint() {
        let _guard = env_lock().lock().expect("env lock");
        env::remove_var("CASEVIEW_AGENT_ENDPOINT");
        env::remove_var("CASEVIEW_AGENT_NAME");

        let result = AppConfig::load(LoadOptions::default());
        let message = result.err().expect("load should fail").to_string();
        assert!(message.contains("agent.endpoint"));
    }

    #[test]
    fn file_patch_and_overrides_layer_over_defaults() {
        let _guard = env_lock().lock().expect("env lock");
        env::remove_var("CASEVIEW_CACHE_TTL_HOURS");
        env::remove_var("CASEVIEW_LOG_FORMAT");

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("caseview.toml");
        fs::write(
            &path,
            r#"
[cache]
dir = "var/cache"
default_ttl_hours = 24

[agent]
endpoint = "https://agents.example.com/invoke"
agent_name = "nfip-data-agent"
timeout_secs = 90

[logging]
format = "json"
"#,
        )
        .expect("write config file");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                data_root: Some(PathBuf::from("fixtures/data")),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load");

        assert_eq!(config.cache.dir, PathBuf::from("var/cache"));
        assert_eq!(config.cache.default_ttl_hours, 24);
        assert_eq!(config.agent.timeout_secs, 90);
        assert_eq!(config.data.root, PathBuf::from("fixtures/data"));
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn env_overrides_take_precedence_over_defaults() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("CASEVIEW_AGENT_ENDPOINT", "http://env.example.com");
        env::set_var("CASEVIEW_CACHE_TTL_HOURS", "12");

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                agent_name: Some("nfip-data-agent".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        env::remove_var("CASEVIEW_AGENT_ENDPOINT");
        env::remove_var("CASEVIEW_CACHE_TTL_HOURS");

        let config = result.expect("config should load");
        assert_eq!(config.agent.endpoint, "http://env.example.com");
        assert_eq!(config.cache.default_ttl_hours, 12);
    }

    #[test]
    fn non_numeric_env_override_is_rejected() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("CASEVIEW_CACHE_TTL_HOURS", "three days");

        let result = AppConfig::load(LoadOptions {
            overrides: valid_overrides(),
            ..LoadOptions::default()
        });

        env::remove_var("CASEVIEW_CACHE_TTL_HOURS");

        assert!(matches!(result, Err(ConfigError::InvalidEnvOverride { .. })));
    }

    #[test]
    fn zero_ttl_and_out_of_range_timeout_fail_validation() {
        let mut config = AppConfig::default();
        config.agent.endpoint = "http://localhost:9099".to_string();
        config.agent.agent_name = "nfip-data-agent".to_string();

        config.cache.default_ttl_hours = 0;
        assert!(config.validate().is_err());

        config.cache.default_ttl_hours = 72;
        config.agent.timeout_secs = 0;
        assert!(config.validate().is_err());

        config.agent.timeout_secs = 120;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let _guard = env_lock().lock().expect("env lock");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("does/not/exist.toml")),
            require_file: true,
            overrides: valid_overrides(),
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }
}
