//! Configuration types for fdm-pipe-backend.
//!
//! Configuration is layered, lowest precedence first:
//!
//! 1. built-in defaults, including the `staging` and `release` profiles
//! 2. an optional TOML file
//! 3. `FDM_PIPE__*` environment variables (e.g. `FDM_PIPE__BACKEND__NAME`)
//! 4. an explicit environment selector (`--environment` / `DEPLOY_ENV`)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use crate::error::BackendError;
use crate::key::KeyFunction;
use crate::partition::{PartitionRule, PartitionTable, TargetSelection};
use crate::router::RoutingConfig;

/// Configuration file read when none is given explicitly.
pub const DEFAULT_CONFIG_FILE: &str = "fdm-pipe-backend.toml";

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "FDM_PIPE";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Pipe backend configuration.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from defaults, `file`, the environment and an optional
    /// environment selector.
    ///
    /// When `file` is `None`, [`DEFAULT_CONFIG_FILE`] is read if it exists.
    pub fn load(file: Option<&Path>, environment: Option<&str>) -> Result<Self, BackendError> {
        let file_source = match file {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: Config = config::Config::builder()
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("backend.environment", environment)?
            .build()?
            .try_deserialize()?;

        Ok(config)
    }
}

/// Pipe backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Name announced in the handshake acknowledgment (`OK\t<name>`).
    pub name: String,

    /// Active deployment environment; selects an entry of `profiles`.
    pub environment: String,

    /// Use `FirstLetter` keys verbatim instead of lowercasing them first.
    pub case_sensitive: bool,

    /// Response to a query line that cannot be parsed.
    pub on_malformed: MalformedPolicy,

    /// Synthetic SOA record.
    pub soa: SoaConfig,

    /// Routing profiles keyed by environment name.
    pub profiles: BTreeMap<String, ProfileConfig>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            name: default_backend_name(),
            environment: default_environment(),
            case_sensitive: false,
            on_malformed: MalformedPolicy::default(),
            soa: SoaConfig::default(),
            profiles: default_profiles(),
        }
    }
}

impl BackendConfig {
    /// The profile for the active environment.
    pub fn active_profile(&self) -> Result<&ProfileConfig, BackendError> {
        self.profiles.get(&self.environment).ok_or_else(|| {
            let known: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
            BackendError::Config(format!(
                "unknown environment '{}' (known: {})",
                self.environment,
                known.join(", ")
            ))
        })
    }

    /// Validate the active profile and build its routing configuration.
    pub fn routing_config(&self) -> Result<RoutingConfig, BackendError> {
        let profile = self.active_profile()?;
        profile.validate_targets()?;
        let table = PartitionTable::build(&profile.splits)?;

        Ok(RoutingConfig {
            key_function: profile.key_function,
            table,
            record_type: profile.record_type,
            ttl: profile.ttl,
            target_selection: profile.target_selection,
            case_sensitive: self.case_sensitive,
            soa: self.soa.clone(),
        })
    }
}

/// One deployment environment's routing profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Partition key derivation.
    #[serde(default = "default_key_function")]
    pub key_function: KeyFunction,

    /// Record type of routed answers.
    #[serde(default)]
    pub record_type: RecordKind,

    /// TTL of routed answers in seconds.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Policy for keys mapped to several targets.
    #[serde(default)]
    pub target_selection: TargetSelection,

    /// Partition rules.
    pub splits: Vec<PartitionRule>,
}

impl ProfileConfig {
    fn validate_targets(&self) -> Result<(), BackendError> {
        if self.record_type != RecordKind::A {
            return Ok(());
        }
        for rule in &self.splits {
            for target in &rule.targets {
                if target.parse::<Ipv4Addr>().is_err() {
                    return Err(BackendError::Config(format!(
                        "A record target '{}' for '{}'..'{}' is not an IPv4 address",
                        target, rule.start, rule.end
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Record type emitted for routed queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordKind {
    /// IPv4 address record.
    #[default]
    #[serde(rename = "A", alias = "a")]
    A,
    /// Canonical name record.
    #[serde(rename = "CNAME", alias = "cname")]
    Cname,
}

impl RecordKind {
    /// Wire name of the record type.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::A => "A",
            RecordKind::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to answer when a query line cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedPolicy {
    /// `FAIL`, the pipe ABI's failure line.
    #[default]
    Fail,
    /// `NXDOMAIN` followed by the usual `LOG` and `END` lines.
    #[serde(alias = "nx_domain")]
    Nxdomain,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "fdm_pipe_backend=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

/// SOA (Start of Authority) record configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoaConfig {
    /// Primary nameserver hostname.
    #[serde(default = "default_mname")]
    pub mname: String,

    /// Responsible-party mailbox in DNS format.
    #[serde(default = "default_rname")]
    pub rname: String,

    /// Zone serial.
    #[serde(default = "default_serial")]
    pub serial: u32,

    /// Refresh interval in seconds.
    #[serde(default = "default_refresh")]
    pub refresh: u32,

    /// Retry interval in seconds.
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// Expire time in seconds.
    #[serde(default = "default_expire")]
    pub expire: u32,

    /// Minimum TTL in seconds.
    #[serde(default = "default_minimum")]
    pub minimum: u32,

    /// TTL of the SOA record itself.
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl SoaConfig {
    /// SOA record content as written after the id field of a `DATA` line.
    pub fn content(&self) -> String {
        format!(
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire, self.minimum
        )
    }
}

impl Default for SoaConfig {
    fn default() -> Self {
        Self {
            mname: default_mname(),
            rname: default_rname(),
            serial: default_serial(),
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            minimum: default_minimum(),
            ttl: default_ttl(),
        }
    }
}

fn default_backend_name() -> String {
    "FDM Pipe Backend".to_string()
}

fn default_environment() -> String {
    "staging".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_key_function() -> KeyFunction {
    KeyFunction::FirstLetter
}

fn default_ttl() -> u32 {
    3600
}

fn default_mname() -> String {
    "ns1.runonflux.io".to_string()
}

fn default_rname() -> String {
    "st.runonflux.io".to_string()
}

fn default_serial() -> u32 {
    2022040801
}

fn default_refresh() -> u32 {
    3600
}

fn default_retry() -> u32 {
    600
}

fn default_expire() -> u32 {
    86400
}

fn default_minimum() -> u32 {
    3600
}

fn default_profiles() -> BTreeMap<String, ProfileConfig> {
    let split = || ProfileConfig {
        key_function: KeyFunction::FirstLetter,
        record_type: RecordKind::A,
        ttl: default_ttl(),
        target_selection: TargetSelection::First,
        splits: vec![
            PartitionRule::new('a', 'n', &["1.1.1.1"]),
            PartitionRule::new('o', 'z', &["1.1.1.1"]),
        ],
    };

    BTreeMap::from([
        ("staging".to_string(), split()),
        ("release".to_string(), split()),
    ])
}
