// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Broker Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) describing:
// - Session and ticket store limits, TTLs and sweep intervals
// - Storage backend selection (memory or PostgreSQL)
// - SAM resource groups and their polling methods
// - Logging and metrics settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const API_VERSION: &str = "ssobroker/v1";
pub const KIND: &str = "BrokerConfig";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("environment variable {0} referenced by config is not set")]
    MissingEnv(String),
}

/// Top-level broker configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfigManifest {
    /// API version (must be "ssobroker/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "BrokerConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: BrokerConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Broker instance name, used in log lines
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfigSpec {
    /// In-progress authentication attempts
    #[serde(default = "StoreConfig::default_sessions")]
    pub sessions: StoreConfig,

    /// Completed authentications (TGTs)
    #[serde(default = "StoreConfig::default_tickets")]
    pub tickets: StoreConfig,

    /// Resource-group failover agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sam: Option<SamConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

/// Limits and backend for one store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of live entries. Absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,

    /// Time-to-live of a new entry
    #[serde(with = "humantime_serde")]
    pub expire: Duration,

    /// Sweep interval. Absent means no background sweep.
    #[serde(default, with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub interval: Option<Duration>,

    #[serde(default)]
    pub backend: BackendConfig,
}

impl StoreConfig {
    fn default_sessions() -> Self {
        Self {
            max: Some(1_000),
            expire: Duration::from_secs(15 * 60),
            interval: Some(Duration::from_secs(60)),
            backend: BackendConfig::Memory,
        }
    }

    fn default_tickets() -> Self {
        Self {
            max: Some(5_000),
            expire: Duration::from_secs(8 * 60 * 60),
            interval: Some(Duration::from_secs(5 * 60)),
            backend: BackendConfig::Memory,
        }
    }

    /// Unbounded, unswept, in-memory store with the given TTL.
    pub fn in_memory(expire: Duration) -> Self {
        Self {
            max: None,
            expire,
            interval: None,
            backend: BackendConfig::Memory,
        }
    }

    pub fn validate(&self, store: &str) -> Result<(), ConfigError> {
        if self.expire.is_zero() {
            return Err(ConfigError::Invalid(format!("{store}.expire must be greater than zero")));
        }
        if self.interval.is_some_and(|i| i.is_zero()) {
            return Err(ConfigError::Invalid(format!("{store}.interval must be greater than zero")));
        }
        if let BackendConfig::Postgres { connection_string, table, .. } = &self.backend {
            if connection_string.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "{store}.backend.connection_string is required for postgres"
                )));
            }
            if !is_sql_identifier(table) {
                return Err(ConfigError::Invalid(format!(
                    "{store}.backend.table '{table}' is not a plain SQL identifier"
                )));
            }
        }
        Ok(())
    }
}

/// Physical medium for a store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    #[default]
    Memory,
    Postgres {
        /// Connection URL; supports "env:VAR_NAME"
        #[serde(default)]
        connection_string: String,

        #[serde(default = "default_table")]
        table: String,

        #[serde(default = "default_max_connections")]
        max_connections: u32,

        /// Bound on acquiring a pooled connection
        #[serde(default = "default_acquire_timeout", with = "humantime_serde")]
        acquire_timeout: Duration,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamConfig {
    pub groups: Vec<ResourceGroupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGroupConfig {
    /// Logical role, e.g. "db"
    pub id: String,

    /// How often each resource is polled
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// In priority order: the first live resource is the active one
    pub resources: Vec<ResourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub id: String,

    /// Connection attributes handed to callers of the active resource
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    pub polling: PollingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PollingConfig {
    /// HTTP GET against a health endpoint
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_status: Option<u16>,
        #[serde(default = "default_poll_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
    /// Plain TCP connect
    Tcp {
        address: String,
        #[serde(default = "default_poll_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
    /// Connect and run `SELECT 1`
    Postgres {
        connection_string: String,
        #[serde(default = "default_poll_timeout", with = "humantime_serde")]
        timeout: Duration,
    },
}

impl PollingConfig {
    pub fn timeout(&self) -> Duration {
        match self {
            Self::Http { timeout, .. } | Self::Tcp { timeout, .. } | Self::Postgres { timeout, .. } => *timeout,
        }
    }
}

impl SamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.groups.is_empty() {
            return Err(ConfigError::Invalid("sam.groups must contain at least one resource group".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for group in &self.groups {
            if group.id.is_empty() {
                return Err(ConfigError::Invalid("sam group id cannot be empty".into()));
            }
            if !seen.insert(group.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate sam group id: {}", group.id)));
            }
            if group.interval.is_zero() {
                return Err(ConfigError::Invalid(format!("sam group {} has a zero interval", group.id)));
            }
            if group.resources.is_empty() {
                return Err(ConfigError::Invalid(format!("sam group {} has no resources", group.id)));
            }
            for resource in &group.resources {
                if resource.id.is_empty() {
                    return Err(ConfigError::Invalid(format!("resource id cannot be empty in group {}", group.id)));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Prometheus scrape port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_table() -> String {
    "broker_store".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Resolve "env:VAR_NAME" indirection; any other value is returned unchanged.
pub fn resolve_secret(value: &str) -> Result<String, ConfigError> {
    match value.strip_prefix("env:") {
        Some(var) => std::env::var(var).map_err(|_| ConfigError::MissingEnv(var.to_string())),
        None => Ok(value.to_string()),
    }
}

impl Default for BrokerConfigSpec {
    fn default() -> Self {
        Self {
            sessions: StoreConfig::default_sessions(),
            tickets: StoreConfig::default_tickets(),
            sam: None,
            observability: None,
        }
    }
}

impl Default for BrokerConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "ssobroker".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: BrokerConfigSpec::default(),
        }
    }
}

impl BrokerConfigManifest {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. SSOBROKER_CONFIG_PATH environment variable
    /// 2. ./ssobroker-config.yaml (working directory)
    /// 3. ~/.ssobroker/config.yaml (user home)
    /// 4. /etc/ssobroker/config.yaml
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("SSOBROKER_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./ssobroker-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".ssobroker").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/ssobroker/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)?;
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = match Self::discover_config() {
            Some(config_path) => {
                tracing::info!("Loading configuration from discovered path: {:?}", config_path);
                Self::from_yaml_file(config_path)?
            }
            None => {
                tracing::warn!("No configuration file found in standard locations. Using defaults.");
                Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides for store limits
    pub fn apply_env_overrides(&mut self) {
        for (var, store) in [
            ("SSOBROKER_SESSION_MAX", &mut self.spec.sessions),
            ("SSOBROKER_TICKET_MAX", &mut self.spec.tickets),
        ] {
            if let Ok(val) = std::env::var(var) {
                match val.trim() {
                    "" | "unbounded" => {
                        tracing::info!("Environment override: {}=unbounded", var);
                        store.max = None;
                    }
                    v => match v.parse::<u64>() {
                        Ok(max) => {
                            tracing::info!("Environment override: {}={}", var, max);
                            store.max = Some(max);
                        }
                        Err(_) => tracing::warn!(
                            "Invalid value for {}: '{}'. Expected a number. Ignoring.",
                            var,
                            val
                        ),
                    },
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version != API_VERSION {
            return Err(ConfigError::Invalid(format!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version, API_VERSION
            )));
        }
        if self.kind != KIND {
            return Err(ConfigError::Invalid(format!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND)));
        }
        if self.metadata.name.is_empty() {
            return Err(ConfigError::Invalid("metadata.name cannot be empty".into()));
        }
        self.spec.sessions.validate("sessions")?;
        self.spec.tickets.validate("tickets")?;
        if let (
            BackendConfig::Postgres { connection_string: a, table: ta, .. },
            BackendConfig::Postgres { connection_string: b, table: tb, .. },
        ) = (&self.spec.sessions.backend, &self.spec.tickets.backend)
        {
            if a == b && ta == tb {
                return Err(ConfigError::Invalid(format!(
                    "sessions and tickets cannot share postgres table '{ta}'"
                )));
            }
        }
        if let Some(sam) = &self.spec.sam {
            sam.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
apiVersion: ssobroker/v1
kind: BrokerConfig
metadata:
  name: broker-a
spec:
  sessions:
    max: 2
    expire: 15m
    interval: 30s
  tickets:
    expire: 8h
    backend:
      type: postgres
      connection_string: postgres://broker@db/broker
      table: tgt_store
  sam:
    groups:
      - id: db
        interval: 5s
        resources:
          - id: primary
            attributes:
              url: postgres://db1/broker
            polling:
              method: tcp
              address: 10.0.0.1:5432
          - id: replica
            polling:
              method: http
              url: http://10.0.0.2/health
              timeout: 500ms
"#;

    #[test]
    fn test_default_manifest_is_valid() {
        let manifest = BrokerConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.spec.sessions.backend, BackendConfig::Memory);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let manifest = BrokerConfigManifest::from_yaml_str(SAMPLE).unwrap();
        assert!(manifest.validate().is_ok());

        assert_eq!(manifest.spec.sessions.max, Some(2));
        assert_eq!(manifest.spec.sessions.expire, Duration::from_secs(900));
        assert_eq!(manifest.spec.sessions.interval, Some(Duration::from_secs(30)));

        assert_eq!(manifest.spec.tickets.max, None);
        assert_eq!(manifest.spec.tickets.interval, None);
        match &manifest.spec.tickets.backend {
            BackendConfig::Postgres { table, max_connections, .. } => {
                assert_eq!(table, "tgt_store");
                assert_eq!(*max_connections, 5);
            }
            other => panic!("expected postgres backend, got {:?}", other),
        }

        let sam = manifest.spec.sam.unwrap();
        assert_eq!(sam.groups[0].resources.len(), 2);
        assert_eq!(sam.groups[0].resources[0].attributes["url"], "postgres://db1/broker");
        assert_eq!(sam.groups[0].resources[0].polling.timeout(), Duration::from_secs(2));
        assert_eq!(sam.groups[0].resources[1].polling.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_validation_rejects_bad_manifests() {
        let mut manifest = BrokerConfigManifest::default();

        manifest.kind = "Other".into();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.into();

        manifest.spec.sessions.expire = Duration::ZERO;
        assert!(manifest.validate().is_err());
        manifest.spec.sessions.expire = Duration::from_secs(1);

        manifest.spec.tickets.backend = BackendConfig::Postgres {
            connection_string: String::new(),
            table: "t".into(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(1),
        };
        assert!(manifest.validate().is_err());

        manifest.spec.tickets.backend = BackendConfig::Postgres {
            connection_string: "postgres://x".into(),
            table: "t; drop table users".into(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(1),
        };
        assert!(manifest.validate().is_err());
        manifest.spec.tickets.backend = BackendConfig::Memory;

        manifest.spec.sam = Some(SamConfig { groups: vec![] });
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_stores_cannot_share_a_table() {
        let backend = BackendConfig::Postgres {
            connection_string: "postgres://db/broker".into(),
            table: "broker_store".into(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(1),
        };
        let mut manifest = BrokerConfigManifest::default();
        manifest.spec.sessions.backend = backend.clone();
        manifest.spec.tickets.backend = backend;
        assert!(manifest.validate().is_err());

        if let BackendConfig::Postgres { table, .. } = &mut manifest.spec.tickets.backend {
            *table = "tgt_store".into();
        }
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let group = ResourceGroupConfig {
            id: "db".into(),
            interval: Duration::from_secs(1),
            resources: vec![ResourceConfig {
                id: "r1".into(),
                attributes: HashMap::new(),
                polling: PollingConfig::Tcp {
                    address: "127.0.0.1:1".into(),
                    timeout: Duration::from_secs(1),
                },
            }],
        };
        let sam = SamConfig {
            groups: vec![group.clone(), group],
        };
        assert!(sam.validate().is_err());
    }

    #[test]
    fn test_resolve_secret() {
        assert_eq!(resolve_secret("postgres://plain").unwrap(), "postgres://plain");
        assert!(matches!(
            resolve_secret("env:SSOBROKER_TEST_DEFINITELY_UNSET_VAR"),
            Err(ConfigError::MissingEnv(_))
        ));
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let manifest = BrokerConfigManifest::from_yaml_str(SAMPLE).unwrap();
        std::fs::write(&path, manifest.to_yaml_string().unwrap()).unwrap();

        let loaded = BrokerConfigManifest::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.metadata.name, "broker-a");
        assert_eq!(loaded.spec.sessions, manifest.spec.sessions);
        assert_eq!(loaded.spec.tickets, manifest.spec.tickets);
    }
}
