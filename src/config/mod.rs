//! Configuration management for ledfleet nodes
//!
//! A [`NodeConfig`] is assembled from, lowest precedence first:
//! built-in defaults, an optional TOML file, `LEDFLEET_*` environment
//! variables, and finally command-line flags (applied by the `serve`
//! command).

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::coordinator::registry::DEFAULT_MAX_FAILURES;
use crate::scheduler::PatternKind;

/// Prefix shared by every environment variable
pub const ENV_PREFIX: &str = "LEDFLEET_";

/// Node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Name this node registers under and is elected as
    pub node_name: String,

    /// HTTP bind address
    pub bind_address: SocketAddr,

    /// URL other nodes use to reach this one (derived from `bind_address` if unset)
    pub advertise_url: Option<String>,

    /// Statically configured leader name
    pub leader_name: Option<String>,

    /// Statically configured leader URL
    pub leader_url: Option<String>,

    /// Pattern the leader runs
    pub pattern: PatternKind,

    /// Leader tick interval in milliseconds
    pub tick_interval_ms: u64,

    /// Heartbeat interval in seconds while registered
    pub heartbeat_interval_secs: u64,

    /// Retry interval in milliseconds while unregistered
    pub retry_interval_ms: u64,

    /// Per-request timeout for node-to-node calls in milliseconds
    pub request_timeout_ms: u64,

    /// Consecutive failures before a host is evicted
    pub max_failures: u32,

    /// Sysfs brightness file; a simulated LED is used when unset
    pub led_path: Option<PathBuf>,

    /// Enable HTTP request logging
    pub enable_request_logging: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            advertise_url: None,
            leader_name: None,
            leader_url: None,
            pattern: PatternKind::default(),
            tick_interval_ms: 1000,
            heartbeat_interval_secs: 60,
            retry_interval_ms: 100,
            request_timeout_ms: 2000,
            max_failures: DEFAULT_MAX_FAILURES,
            led_path: None,
            enable_request_logging: true,
        }
    }
}

fn default_node_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("node-{}", &id[..8])
}

impl NodeConfig {
    /// Create a new config builder
    pub fn builder() -> NodeConfigBuilder {
        NodeConfigBuilder::default()
    }

    /// Defaults overlaid with `LEDFLEET_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys take defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// File (if given) or defaults, then environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay any `LEDFLEET_*` variables that are set
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_var("NODE_NAME") {
            self.node_name = v;
        }
        if let Some(v) = env_parse("BIND_ADDRESS")? {
            self.bind_address = v;
        }
        if let Some(v) = env_var("ADVERTISE_URL") {
            self.advertise_url = Some(v);
        }
        if let Some(v) = env_var("LEADER_NAME") {
            self.leader_name = Some(v);
        }
        if let Some(v) = env_var("LEADER_URL") {
            self.leader_url = Some(v);
        }
        if let Some(v) = env_parse("PATTERN")? {
            self.pattern = v;
        }
        if let Some(v) = env_parse("TICK_INTERVAL_MS")? {
            self.tick_interval_ms = v;
        }
        if let Some(v) = env_parse("HEARTBEAT_INTERVAL_SECS")? {
            self.heartbeat_interval_secs = v;
        }
        if let Some(v) = env_parse("RETRY_INTERVAL_MS")? {
            self.retry_interval_ms = v;
        }
        if let Some(v) = env_parse("REQUEST_TIMEOUT_MS")? {
            self.request_timeout_ms = v;
        }
        if let Some(v) = env_parse("MAX_FAILURES")? {
            self.max_failures = v;
        }
        if let Some(v) = env_var("LED_PATH") {
            self.led_path = Some(PathBuf::from(v));
        }
        if let Some(v) = env_parse("REQUEST_LOGGING")? {
            self.enable_request_logging = v;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_name.trim().is_empty() {
            return Err(ConfigError::invalid("node_name", "Must not be empty"));
        }

        for (field, value) in [
            ("tick_interval_ms", self.tick_interval_ms),
            ("heartbeat_interval_secs", self.heartbeat_interval_secs),
            ("retry_interval_ms", self.retry_interval_ms),
            ("request_timeout_ms", self.request_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "Must be greater than 0"));
            }
        }

        if self.max_failures == 0 {
            return Err(ConfigError::invalid("max_failures", "Must be at least 1"));
        }

        if self.retry_interval() >= self.heartbeat_interval() {
            return Err(ConfigError::invalid(
                "retry_interval_ms",
                "Retry interval must be shorter than the heartbeat interval",
            ));
        }

        if let Some(url) = &self.advertise_url {
            validate_url("advertise_url", url)?;
        }
        if let Some(url) = &self.leader_url {
            validate_url("leader_url", url)?;
        }

        if self.leader_url.is_some() && self.leader_name.is_none() {
            return Err(ConfigError::invalid(
                "leader_name",
                "Required when leader_url is set",
            ));
        }

        Ok(())
    }

    /// URL other nodes use to reach this one
    pub fn effective_advertise_url(&self) -> String {
        if let Some(url) = &self.advertise_url {
            return url.trim_end_matches('/').to_string();
        }

        let ip = self.bind_address.ip();
        let host = if ip.is_unspecified() {
            String::from("127.0.0.1")
        } else if ip.is_ipv6() {
            format!("[{ip}]")
        } else {
            ip.to_string()
        };
        format!("http://{}:{}", host, self.bind_address.port())
    }

    /// Leader URL for the statically configured leader.
    ///
    /// A node configured as its own leader without a leader URL uses its
    /// advertise URL.
    pub fn effective_leader_url(&self) -> Option<String> {
        match (&self.leader_name, &self.leader_url) {
            (_, Some(url)) => Some(url.trim_end_matches('/').to_string()),
            (Some(name), None) if *name == self.node_name => Some(self.effective_advertise_url()),
            _ => None,
        }
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Node {}\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Advertise URL: {}\n\
             Leader: {} ({})\n\
             Pattern: {}\n\
             Tick Interval: {}ms\n\
             Heartbeat Interval: {}s\n\
             Max Failures: {}\n\
             LED: {}",
            self.node_name,
            "",
            self.bind_address,
            self.effective_advertise_url(),
            self.leader_name.as_deref().unwrap_or("none"),
            self.effective_leader_url().as_deref().unwrap_or("-"),
            self.pattern,
            self.tick_interval_ms,
            self.heartbeat_interval_secs,
            self.max_failures,
            self.led_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| String::from("simulated")),
        )
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}"))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|v| {
            v.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                field: format!("{ENV_PREFIX}{key}"),
                reason: format!("'{v}': {e}"),
            })
        })
        .transpose()
}

fn validate_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::invalid(field, format!("{value}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::invalid(
            field,
            format!("{value}: must be an http(s) URL with a host"),
        ));
    }
    Ok(())
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for NodeConfig
#[derive(Debug, Default)]
pub struct NodeConfigBuilder {
    config: Option<NodeConfig>,
}

impl NodeConfigBuilder {
    fn config(&mut self) -> &mut NodeConfig {
        self.config.get_or_insert_with(NodeConfig::default)
    }

    /// Set node name
    pub fn node_name(mut self, name: impl Into<String>) -> Self {
        self.config().node_name = name.into();
        self
    }

    /// Set bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config().bind_address = addr;
        self
    }

    /// Set advertise URL
    pub fn advertise_url(mut self, url: impl Into<String>) -> Self {
        self.config().advertise_url = Some(url.into());
        self
    }

    /// Set the static leader
    pub fn leader(mut self, name: impl Into<String>, url: Option<String>) -> Self {
        let config = self.config();
        config.leader_name = Some(name.into());
        config.leader_url = url;
        self
    }

    /// Set pattern
    pub fn pattern(mut self, pattern: PatternKind) -> Self {
        self.config().pattern = pattern;
        self
    }

    /// Set tick interval
    pub fn tick_interval_ms(mut self, ms: u64) -> Self {
        self.config().tick_interval_ms = ms;
        self
    }

    /// Set heartbeat interval
    pub fn heartbeat_interval_secs(mut self, secs: u64) -> Self {
        self.config().heartbeat_interval_secs = secs;
        self
    }

    /// Set retry interval
    pub fn retry_interval_ms(mut self, ms: u64) -> Self {
        self.config().retry_interval_ms = ms;
        self
    }

    /// Set request timeout
    pub fn request_timeout_ms(mut self, ms: u64) -> Self {
        self.config().request_timeout_ms = ms;
        self
    }

    /// Set failure threshold
    pub fn max_failures(mut self, max: u32) -> Self {
        self.config().max_failures = max;
        self
    }

    /// Drive a sysfs LED at `path`
    pub fn led_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config().led_path = Some(path.into());
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.config().enable_request_logging = enable;
        self
    }

    /// Build the config
    pub fn build(mut self) -> Result<NodeConfig, ConfigError> {
        let config = self.config.take().unwrap_or_default();
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
