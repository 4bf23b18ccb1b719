use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use reqwest::Url;
use tracing::trace;

use crate::error::{MonitorError, MonitorResult};
use crate::util::{
    API_ENDPOINT, AUTH_KEY, CPU_THRESHOLD, INTERVAL, MEMORY_THRESHOLD, parse_override,
};

/// Minimum time between two alert notices. Not configurable.
pub const ALERT_COOLDOWN: Duration = Duration::from_secs(3600);

/// Raw configuration as read from the JSON file
///
/// Every field has a default so an empty object (or no file at all) is a
/// valid starting point; the endpoint and auth key usually come from the
/// environment.
#[derive(Clone, serde::Deserialize)]
pub struct Config {
    /// Seconds between two sampling cycles
    #[serde(default = "default_interval")]
    pub interval: u64,

    #[serde(default = "default_cpu_threshold")]
    pub alert_cpu_threshold: f32,

    #[serde(default = "default_memory_threshold")]
    pub alert_memory_threshold: f32,

    /// Collector URL that receives every snapshot
    #[serde(default)]
    pub api_endpoint: Option<String>,

    /// Bearer token for the collector
    #[serde(default)]
    pub auth_key: Option<String>,

    /// Path whose filesystem usage is reported as disk usage
    #[serde(default = "default_disk_path")]
    pub disk_path: PathBuf,

    /// Upper bound for a single POST to the collector, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Upper bound for collecting one snapshot, in seconds
    #[serde(default = "default_sample_timeout")]
    pub sample_timeout: u64,

    /// Optional webhook that receives alert notices
    #[serde(default)]
    pub alert_webhook: Option<Webhook>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Webhook {
    pub url: String,
}

/// Alert limits, fixed for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertThresholds {
    pub cpu_threshold: f32,
    pub memory_threshold: f32,
    pub cooldown: Duration,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu_threshold: default_cpu_threshold(),
            memory_threshold: default_memory_threshold(),
            cooldown: ALERT_COOLDOWN,
        }
    }
}

/// Validated configuration the monitor is built from
#[derive(Clone)]
pub struct ResolvedConfig {
    pub interval: Duration,
    pub thresholds: AlertThresholds,
    pub api_endpoint: Url,
    pub auth_key: String,
    pub disk_path: PathBuf,
    pub request_timeout: Duration,
    pub sample_timeout: Duration,
    pub alert_webhook: Option<Webhook>,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("interval", &self.interval)
            .field("thresholds", &self.thresholds)
            .field("api_endpoint", &self.api_endpoint.as_str())
            .field("auth_key", &"<redacted>")
            .field("disk_path", &self.disk_path)
            .field("request_timeout", &self.request_timeout)
            .field("sample_timeout", &self.sample_timeout)
            .field("alert_webhook", &self.alert_webhook)
            .finish()
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("interval", &self.interval)
            .field("alert_cpu_threshold", &self.alert_cpu_threshold)
            .field("alert_memory_threshold", &self.alert_memory_threshold)
            .field("api_endpoint", &self.api_endpoint)
            .field("auth_key", &self.auth_key.as_ref().map(|_| "<redacted>"))
            .field("disk_path", &self.disk_path)
            .field("request_timeout", &self.request_timeout)
            .field("sample_timeout", &self.sample_timeout)
            .field("alert_webhook", &self.alert_webhook)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            alert_cpu_threshold: default_cpu_threshold(),
            alert_memory_threshold: default_memory_threshold(),
            api_endpoint: None,
            auth_key: None,
            disk_path: default_disk_path(),
            request_timeout: default_request_timeout(),
            sample_timeout: default_sample_timeout(),
            alert_webhook: None,
        }
    }
}

fn default_interval() -> u64 {
    300
}

fn default_cpu_threshold() -> f32 {
    90.0
}

fn default_memory_threshold() -> f32 {
    85.0
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("/")
}

fn default_request_timeout() -> u64 {
    30
}

fn default_sample_timeout() -> u64 {
    30
}

impl Config {
    /// Apply overrides from an environment-like lookup.
    ///
    /// Values that fail to parse are ignored and the current value is kept.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(AUTH_KEY) {
            self.auth_key = Some(key);
        }
        if let Some(endpoint) = lookup(API_ENDPOINT) {
            self.api_endpoint = Some(endpoint);
        }
        if let Some(interval) = parse_override(&lookup, INTERVAL) {
            self.interval = interval;
        }
        if let Some(cpu) = parse_override(&lookup, CPU_THRESHOLD) {
            self.alert_cpu_threshold = cpu;
        }
        if let Some(memory) = parse_override(&lookup, MEMORY_THRESHOLD) {
            self.alert_memory_threshold = memory;
        }
        self
    }

    pub fn resolve(self) -> MonitorResult<ResolvedConfig> {
        if self.interval == 0 {
            return Err(MonitorError::InvalidConfig(
                "interval must be at least one second".into(),
            ));
        }
        if self.request_timeout == 0 || self.sample_timeout == 0 {
            return Err(MonitorError::InvalidConfig(
                "timeouts must be at least one second".into(),
            ));
        }

        let cpu_threshold = validate_percent("alert_cpu_threshold", self.alert_cpu_threshold)?;
        let memory_threshold =
            validate_percent("alert_memory_threshold", self.alert_memory_threshold)?;

        let endpoint = self
            .api_endpoint
            .ok_or_else(|| MonitorError::InvalidConfig("no api_endpoint configured".into()))?;
        let api_endpoint = Url::parse(&endpoint).map_err(|e| {
            MonitorError::InvalidConfig(format!("api_endpoint '{endpoint}' is not a URL: {e}"))
        })?;
        if !matches!(api_endpoint.scheme(), "http" | "https") {
            return Err(MonitorError::InvalidConfig(format!(
                "api_endpoint must use http or https, got '{}'",
                api_endpoint.scheme()
            )));
        }

        let auth_key = self
            .auth_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| MonitorError::InvalidConfig(format!("{AUTH_KEY} is not set")))?;

        Ok(ResolvedConfig {
            interval: Duration::from_secs(self.interval),
            thresholds: AlertThresholds {
                cpu_threshold,
                memory_threshold,
                cooldown: ALERT_COOLDOWN,
            },
            api_endpoint,
            auth_key,
            disk_path: self.disk_path,
            request_timeout: Duration::from_secs(self.request_timeout),
            sample_timeout: Duration::from_secs(self.sample_timeout),
            alert_webhook: self.alert_webhook,
        })
    }
}

fn validate_percent(name: &str, value: f32) -> MonitorResult<f32> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(MonitorError::InvalidConfig(format!(
            "{name} must be between 0 and 100, got {value}"
        )))
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {path}"))?;
    serde_json::from_str(&file_content)
        .with_context(|| format!("invalid configuration file: {path}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}

/// Read the optional config file, apply the environment and validate.
pub fn load_config<F>(path: Option<&str>, lookup: F) -> anyhow::Result<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };

    Ok(config.with_overrides(lookup).resolve()?)
}
