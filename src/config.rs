use std::sync::Arc;
use std::{env, fs, path::PathBuf, time::Duration};

use anyhow::Result;
use directories::ProjectDirs;
use serde::Deserialize;

use crate::error::AuthError;
use crate::es_http::Credentials;

pub const DEFAULT_RETRY_BUDGET: u32 = 15;
const DEFAULT_DASHBOARDS_PATH: &str = "_dashboards/api/saved_objects";
const DEFAULT_ALERTING_PATH: &str = "_plugins/_alerting";

#[derive(Debug, Clone)]
pub struct Config {
    pub region: Arc<str>,
    pub opensearch_user: Arc<str>,
    pub opensearch_pass: Arc<str>,
    pub http_timeout_secs: u64,
    pub remap_retry_budget: u32,
    pub backoff_unit_ms: u64,
    pub dashboards_path: Arc<str>,
    pub alerting_path: Arc<str>,
    pub log_stream_name: Arc<str>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    region: String,
    #[serde(default)]
    opensearch_user: String,
    #[serde(default)]
    opensearch_pass: String,
    #[serde(default = "default_http_timeout_secs")]
    http_timeout_secs: u64,
    #[serde(default = "default_retry_budget")]
    remap_retry_budget: u32,
    #[serde(default = "default_backoff_unit_ms")]
    backoff_unit_ms: u64,
    #[serde(default = "default_dashboards_path")]
    dashboards_path: String,
    #[serde(default = "default_alerting_path")]
    alerting_path: String,
    #[serde(default = "default_log_stream_name")]
    log_stream_name: String,
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_retry_budget() -> u32 {
    DEFAULT_RETRY_BUDGET
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_dashboards_path() -> String {
    DEFAULT_DASHBOARDS_PATH.to_string()
}

fn default_alerting_path() -> String {
    DEFAULT_ALERTING_PATH.to_string()
}

fn default_log_stream_name() -> String {
    "local".to_string()
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            region: raw.region.trim().into(),
            opensearch_user: raw.opensearch_user.into(),
            opensearch_pass: raw.opensearch_pass.into(),
            http_timeout_secs: raw.http_timeout_secs,
            remap_retry_budget: raw.remap_retry_budget,
            backoff_unit_ms: raw.backoff_unit_ms,
            dashboards_path: raw.dashboards_path.into(),
            alerting_path: raw.alerting_path.into(),
            log_stream_name: raw.log_stream_name.into(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: Arc::from(""),
            opensearch_user: Arc::from(""),
            opensearch_pass: Arc::from(""),
            http_timeout_secs: default_http_timeout_secs(),
            remap_retry_budget: DEFAULT_RETRY_BUDGET,
            backoff_unit_ms: default_backoff_unit_ms(),
            dashboards_path: Arc::from(DEFAULT_DASHBOARDS_PATH),
            alerting_path: Arc::from(DEFAULT_ALERTING_PATH),
            log_stream_name: Arc::from("local"),
        }
    }
}

impl Config {
    /// File at `path`, else the platform config file, else defaults; then env overrides.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut cfg = if let Some(path) = path {
            let raw = fs::read_to_string(path)?;
            Config::from(toml::from_str::<RawConfig>(&raw)?)
        } else {
            let default_path = default_config_path();
            if default_path.exists() {
                let raw = fs::read_to_string(&default_path)?;
                Config::from(toml::from_str::<RawConfig>(&raw)?)
            } else {
                Config::default()
            }
        };

        maybe_env_str(&mut cfg.region, "AWS_REGION");
        maybe_env_str(&mut cfg.opensearch_user, "OPENSEARCH_USER");
        maybe_env_str(&mut cfg.opensearch_pass, "OPENSEARCH_PASS");
        maybe_env_str(&mut cfg.dashboards_path, "DASHBOARDS_PATH");
        maybe_env_str(&mut cfg.alerting_path, "ALERTING_PATH");
        maybe_env_str(&mut cfg.log_stream_name, "AWS_LAMBDA_LOG_STREAM_NAME");
        maybe_env_u64(&mut cfg.http_timeout_secs, "HTTP_TIMEOUT_SECS");
        maybe_env_u64(&mut cfg.backoff_unit_ms, "REMAP_BACKOFF_UNIT_MS");
        maybe_env_u32(&mut cfg.remap_retry_budget, "REMAP_RETRY_BUDGET");
        validate(&cfg)?;
        Ok(cfg)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// One backoff "time unit"; the remap poll waits `x²` of these after attempt `x`.
    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }

    pub fn credentials(&self) -> Result<Credentials, AuthError> {
        if self.opensearch_user.trim().is_empty() {
            return Err(AuthError::MissingUser);
        }
        if self.opensearch_pass.is_empty() {
            return Err(AuthError::MissingPassword);
        }
        Ok(Credentials {
            user: self.opensearch_user.clone(),
            pass: self.opensearch_pass.clone(),
        })
    }
}

fn default_config_path() -> PathBuf {
    ProjectDirs::from("com", "domainsync", "domainsync")
        .map(|p| p.config_dir().join("config.toml"))
        .unwrap_or_else(|| PathBuf::from(".domainsync/config.toml"))
}

fn validate(cfg: &Config) -> Result<()> {
    if cfg.remap_retry_budget == 0 {
        anyhow::bail!("remap_retry_budget must be at least 1");
    }
    if cfg.http_timeout_secs == 0 {
        anyhow::bail!("http_timeout_secs must be positive");
    }
    Ok(())
}

fn maybe_env_str(val: &mut Arc<str>, key: &str) {
    if let Ok(v) = env::var(key) {
        if !v.trim().is_empty() {
            *val = Arc::from(v.trim());
        }
    }
}

fn maybe_env_u64(val: &mut u64, key: &str) {
    if let Ok(v) = env::var(key) {
        if let Ok(n) = v.trim().parse::<u64>() {
            *val = n;
        }
    }
}

fn maybe_env_u32(val: &mut u32, key: &str) {
    if let Ok(v) = env::var(key) {
        if let Ok(n) = v.trim().parse::<u32>() {
            *val = n;
        }
    }
}
