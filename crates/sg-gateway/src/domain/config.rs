//! Gateway configuration with validation.
//!
//! Values come from the process environment (see [`GatewayConfig::from_env`]).
//! Only `MAX_SIZE_MB` and `BACKEND` are required; everything else has a
//! default.

use serde::{Deserialize, Serialize};
use sg_admission::{FailurePolicy, GateConfig, Quota, DEFAULT_CACHE_CAPACITY};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Public proxy listener
    pub listen: ListenConfig,
    /// Backend every admitted request is forwarded to
    pub upstream: UpstreamConfig,
    /// Kubo RPC API used for graph lookups
    pub ipfs: IpfsConfig,
    /// Quota, cache and traversal settings
    pub admission: AdmissionConfig,
    /// Admin server configuration (localhost only by default)
    pub admin: AdminConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            upstream: UpstreamConfig::default(),
            ipfs: IpfsConfig::default(),
            admission: AdmissionConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `PORT`: proxy listen port (default: 8080)
    /// - `BACKEND`: upstream base URL (required)
    /// - `MAX_SIZE_MB`: quota in megabytes of 1,048,576 bytes (required)
    /// - `UPSTREAM_CONNECT_TIMEOUT`: backend connect timeout (default: 5s)
    /// - `IPFS_API`: Kubo RPC endpoint (default: http://localhost:5001)
    /// - `IPFS_TIMEOUT`: per-call timeout for Kubo (default: 10s)
    /// - `CACHE_CAPACITY`: decisions remembered (default: 10000)
    /// - `TRAVERSAL_TIMEOUT`: bound on one graph walk (default: 30s)
    /// - `FAILURE_POLICY`: `fail-closed` or `skip` (default: fail-closed)
    /// - `COALESCE`: share traversals between concurrent requests (default: true)
    /// - `ADMIN_ENABLED`, `ADMIN_PORT`: admin server (default: true, 9090)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let quota = lookup("MAX_SIZE_MB")
            .ok_or_else(|| ConfigError::InvalidQuota("MAX_SIZE_MB is not set".into()))?;
        config.admission.quota_mb = quota
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidQuota(format!("MAX_SIZE_MB='{quota}'")))?;

        let backend = lookup("BACKEND")
            .ok_or_else(|| ConfigError::InvalidUpstream("BACKEND is not set".into()))?;
        config.upstream.url = backend.trim().to_string();

        if let Some(port) = lookup("PORT") {
            config.listen.port = parse_port("PORT", &port)?;
        }
        if let Some(timeout) = lookup("UPSTREAM_CONNECT_TIMEOUT") {
            config.upstream.connect_timeout = humantime_serde::parse_duration(&timeout)
                .map_err(|e| {
                    ConfigError::InvalidTimeout(format!("UPSTREAM_CONNECT_TIMEOUT: {e}"))
                })?;
        }
        if let Some(api) = lookup("IPFS_API") {
            config.ipfs.api_url = api.trim().to_string();
        }
        if let Some(timeout) = lookup("IPFS_TIMEOUT") {
            config.ipfs.request_timeout = humantime_serde::parse_duration(&timeout)
                .map_err(|e| ConfigError::InvalidTimeout(format!("IPFS_TIMEOUT: {e}")))?;
        }
        if let Some(capacity) = lookup("CACHE_CAPACITY") {
            config.admission.cache_capacity = capacity
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("CACHE_CAPACITY='{capacity}'")))?;
        }
        if let Some(timeout) = lookup("TRAVERSAL_TIMEOUT") {
            config.admission.traversal_timeout = humantime_serde::parse_duration(&timeout)
                .map_err(|e| ConfigError::InvalidTimeout(format!("TRAVERSAL_TIMEOUT: {e}")))?;
        }
        if let Some(policy) = lookup("FAILURE_POLICY") {
            config.admission.failure_policy = policy.parse().map_err(ConfigError::Invalid)?;
        }
        if let Some(coalesce) = lookup("COALESCE") {
            config.admission.coalesce = parse_bool("COALESCE", &coalesce)?;
        }
        if let Some(enabled) = lookup("ADMIN_ENABLED") {
            config.admin.enabled = parse_bool("ADMIN_ENABLED", &enabled)?;
        }
        if let Some(port) = lookup("ADMIN_PORT") {
            config.admin.port = parse_port("ADMIN_PORT", &port)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.quota()?;

        let url = reqwest::Url::parse(&self.upstream.url)
            .map_err(|e| ConfigError::InvalidUpstream(format!("'{}': {e}", self.upstream.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUpstream(format!(
                "unsupported scheme '{}'",
                url.scheme()
            )));
        }

        reqwest::Url::parse(&self.ipfs.api_url)
            .map_err(|e| ConfigError::Invalid(format!("IPFS API '{}': {e}", self.ipfs.api_url)))?;

        // Port 0 asks the OS for a free port, so two zeros never collide
        if self.admin.enabled && self.listen.port != 0 && self.listen.port == self.admin.port {
            return Err(ConfigError::DuplicatePorts);
        }

        if self.admission.cache_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity);
        }

        if self.admission.traversal_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "traversal timeout cannot be 0".into(),
            ));
        }

        if self.upstream.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "upstream connect timeout cannot be 0".into(),
            ));
        }

        if self.ipfs.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "IPFS request timeout cannot be 0".into(),
            ));
        }

        Ok(())
    }

    /// Configured quota in bytes
    pub fn quota(&self) -> Result<Quota, ConfigError> {
        Quota::from_megabytes(self.admission.quota_mb).ok_or_else(|| {
            ConfigError::InvalidQuota(format!("{} MB overflows", self.admission.quota_mb))
        })
    }

    /// Admission gate settings derived from this configuration
    pub fn gate_config(&self) -> Result<GateConfig, ConfigError> {
        Ok(GateConfig::new(self.quota()?)
            .with_timeout(self.admission.traversal_timeout)
            .with_failure_policy(self.admission.failure_policy)
            .with_coalescing(self.admission.coalesce))
    }

    /// Get proxy bind address
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen.host, self.listen.port)
    }

    /// Get Admin server bind address
    pub fn admin_addr(&self) -> SocketAddr {
        SocketAddr::new(self.admin.host, self.admin.port)
    }
}

/// Proxy listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8080)
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8080,
        }
    }
}

/// Upstream backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL, e.g. `http://127.0.0.1:8081`
    pub url: String,
    /// Bound on establishing a connection to the backend
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Kubo RPC API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpfsConfig {
    /// Base URL of the RPC API
    pub api_url: String,
    /// Timeout for a single RPC call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5001".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Admission policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Quota in megabytes (× 1,048,576 bytes)
    pub quota_mb: u64,
    /// Maximum number of cached decisions
    pub cache_capacity: usize,
    /// Bound on a single traversal
    #[serde(with = "humantime_serde")]
    pub traversal_timeout: Duration,
    /// Behaviour on a failed lookup below the root
    pub failure_policy: FailurePolicy,
    /// Share one traversal between concurrent requests for the same root
    pub coalesce: bool,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            quota_mb: 0,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            traversal_timeout: Duration::from_secs(30),
            failure_policy: FailurePolicy::FailClosed,
            coalesce: true,
        }
    }
}

/// Admin server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin server
    pub enabled: bool,
    /// Bind address (localhost only by default)
    pub host: IpAddr,
    /// Port (default: 9090)
    pub port: u16,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 9090,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Quota missing, unparsable or too large
    #[error("invalid quota: {0}")]
    InvalidQuota(String),
    /// Upstream URL missing or unusable
    #[error("invalid upstream: {0}")]
    InvalidUpstream(String),
    /// Proxy and admin server on the same port
    #[error("duplicate ports configured")]
    DuplicatePorts,
    /// Cache must hold at least one decision
    #[error("cache capacity cannot be 0")]
    InvalidCacheCapacity,
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn parse_port(key: &str, value: &str) -> Result<u16, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{key}='{value}' is not a port")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!("{key}='{value}' is not a boolean"))),
    }
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Accepts `500ms`, `30s`, `2m` or plain seconds.
    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        // "ms" before "s" and "m": both are suffixes of it
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
