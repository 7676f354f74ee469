// ABOUTME: YAML gateway configuration: listener settings, dispatch policy and the carrier table
// ABOUTME: Parsing is followed by validation so ambiguous routing data never reaches the router

use crate::client::{BindCredentials, CarrierLink, ClientConfig, KeepAliveConfig, SubmitParams};
use crate::codec::limits;
use crate::datatypes::{NumericPlanIndicator, TypeOfNumber};
use crate::ratelimit::RateLimitConfig;
use crate::server::{DEFAULT_PORT, ServerConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

/// Whole gateway configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub dispatch: DispatchSection,
    /// Carrier table keyed by carrier name.
    pub carriers: BTreeMap<String, CarrierConfig>,
}

/// Inbound listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_keep_alive", with = "humantime_serde")]
    pub enquire_link_interval: Duration,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            enquire_link_interval: default_keep_alive(),
        }
    }
}

impl ServerSection {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::default().with_enquire_link_interval(self.enquire_link_interval)
    }
}

/// Routing and outbound link policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchSection {
    /// Carrier used when no prefix matches.
    pub default_carrier: String,

    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Digits in a national number, without the trunk `0`.
    #[serde(default = "default_national_length")]
    pub national_length: usize,

    /// Pause between throughput-sized chunks of a batch.
    #[serde(default = "default_batch_delay", with = "humantime_serde")]
    pub batch_delay: Duration,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    #[serde(default = "default_unbind_timeout", with = "humantime_serde")]
    pub unbind_timeout: Duration,

    #[serde(default = "default_keep_alive", with = "humantime_serde")]
    pub keep_alive_interval: Duration,
}

impl DispatchSection {
    /// Link settings shared by every carrier client.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_request_timeout(self.request_timeout)
            .with_unbind_timeout(self.unbind_timeout)
            .with_keep_alive(KeepAliveConfig::new(self.keep_alive_interval))
    }
}

/// One carrier SMSC and the traffic rules that apply to it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierConfig {
    pub system_id: String,
    pub password: String,
    pub host: String,
    pub port: u16,

    #[serde(default)]
    pub system_type: String,

    /// Messages per second the carrier accepts.
    #[serde(default = "default_throughput")]
    pub throughput: u64,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_registered_delivery")]
    pub registered_delivery: u8,

    #[serde(default, rename = "sourceTON")]
    pub source_ton: u8,
    #[serde(default, rename = "sourceNPI")]
    pub source_npi: u8,
    #[serde(default = "default_dest_ton", rename = "destTON")]
    pub dest_ton: u8,
    #[serde(default = "default_dest_npi", rename = "destNPI")]
    pub dest_npi: u8,

    #[serde(default)]
    pub specific_params: SpecificParams,

    #[serde(default)]
    pub rate_limits: RateLimits,

    /// National-number prefixes routed to this carrier.
    #[serde(default)]
    pub number_prefixes: Vec<String>,
}

/// Protocol field overrides for every submit_sm sent to a carrier.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificParams {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub validity_period: String,
    #[serde(default)]
    pub schedule_delivery_time: String,
    #[serde(default)]
    pub esm_class: u8,
    #[serde(default)]
    pub protocol_id: u8,
    #[serde(default)]
    pub priority_flag: u8,
    #[serde(default)]
    pub replace_if_present_flag: u8,
    #[serde(default)]
    pub sm_default_msg_id: u8,
}

/// Volume caps on top of the per-second throughput.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimits {
    pub per_minute: Option<u64>,
    pub per_hour: Option<u64>,
    pub per_day: Option<u64>,
}

impl CarrierConfig {
    /// `host:port` of the SMSC.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn submit_params(&self) -> SubmitParams {
        let specific = &self.specific_params;
        SubmitParams {
            service_type: specific.service_type.clone(),
            source_addr_ton: TypeOfNumber::from_byte(self.source_ton),
            source_addr_npi: NumericPlanIndicator::from_byte(self.source_npi),
            dest_addr_ton: TypeOfNumber::from_byte(self.dest_ton),
            dest_addr_npi: NumericPlanIndicator::from_byte(self.dest_npi),
            esm_class: specific.esm_class,
            protocol_id: specific.protocol_id,
            priority_flag: specific.priority_flag,
            schedule_delivery_time: specific.schedule_delivery_time.clone(),
            validity_period: specific.validity_period.clone(),
            registered_delivery: self.registered_delivery,
            replace_if_present_flag: specific.replace_if_present_flag,
            sm_default_msg_id: specific.sm_default_msg_id,
        }
    }

    pub fn link(&self, carrier: &str) -> CarrierLink {
        CarrierLink {
            carrier: carrier.to_string(),
            address: self.address(),
            credentials: BindCredentials::new(self.system_id.as_str(), self.password.as_str())
                .with_system_type(self.system_type.as_str()),
            params: self.submit_params(),
        }
    }

    /// Token buckets for this carrier: throughput per second, then any
    /// per-minute, per-hour and per-day caps.
    pub fn rate_windows(&self) -> Vec<RateLimitConfig> {
        let mut windows = vec![RateLimitConfig::per(self.throughput, Duration::from_secs(1))];
        let caps = [
            (self.rate_limits.per_minute, 60),
            (self.rate_limits.per_hour, 60 * 60),
            (self.rate_limits.per_day, 24 * 60 * 60),
        ];
        for (limit, secs) in caps {
            if let Some(limit) = limit {
                windows.push(RateLimitConfig::per(limit, Duration::from_secs(secs)));
            }
        }
        windows
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.system_id.is_empty() || self.system_id.len() >= limits::SYSTEM_ID {
            return Err(invalid(format!(
                "carrier '{name}': systemId must be 1 to {} characters",
                limits::SYSTEM_ID - 1
            )));
        }
        if self.password.len() >= limits::PASSWORD {
            return Err(invalid(format!(
                "carrier '{name}': password longer than {} characters",
                limits::PASSWORD - 1
            )));
        }
        if self.host.is_empty() || self.port == 0 {
            return Err(invalid(format!("carrier '{name}': host and port are required")));
        }
        if self.throughput == 0 {
            return Err(invalid(format!("carrier '{name}': throughput must be positive")));
        }
        if TypeOfNumber::try_from(self.source_ton).is_err()
            || TypeOfNumber::try_from(self.dest_ton).is_err()
        {
            return Err(invalid(format!("carrier '{name}': unknown type of number")));
        }
        if NumericPlanIndicator::try_from(self.source_npi).is_err()
            || NumericPlanIndicator::try_from(self.dest_npi).is_err()
        {
            return Err(invalid(format!("carrier '{name}': unknown numbering plan")));
        }
        let caps = [
            self.rate_limits.per_minute,
            self.rate_limits.per_hour,
            self.rate_limits.per_day,
        ];
        if caps.contains(&Some(0)) {
            return Err(invalid(format!("carrier '{name}': rate limits must be positive")));
        }
        Ok(())
    }
}

impl GatewayConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: GatewayConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.carriers.is_empty() {
            return Err(invalid("at least one carrier must be defined"));
        }
        if !self.carriers.contains_key(&self.dispatch.default_carrier) {
            return Err(invalid(format!(
                "default carrier '{}' is not defined",
                self.dispatch.default_carrier
            )));
        }
        if self.dispatch.country_code.is_empty()
            || !self.dispatch.country_code.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("countryCode must be digits"));
        }
        if self.dispatch.national_length == 0 {
            return Err(invalid("nationalLength must be positive"));
        }

        let mut prefixes: HashMap<&str, &str> = HashMap::new();
        let mut system_ids: HashMap<&str, &str> = HashMap::new();
        for (name, carrier) in &self.carriers {
            carrier.validate(name)?;

            if let Some(other) = system_ids.insert(&carrier.system_id, name) {
                return Err(invalid(format!(
                    "systemId '{}' is used by both '{other}' and '{name}'",
                    carrier.system_id
                )));
            }

            for prefix in &carrier.number_prefixes {
                if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid(format!(
                        "carrier '{name}': prefix '{prefix}' must be digits"
                    )));
                }
                if let Some(other) = prefixes.insert(prefix, name) {
                    return Err(invalid(format!(
                        "prefix '{prefix}' is claimed by both '{other}' and '{name}'"
                    )));
                }
            }
        }

        // A prefix nested in another carrier's prefix would split its range.
        for (prefix, name) in &prefixes {
            for len in 1..prefix.len() {
                let shorter = &prefix[..len];
                if let Some(other) = prefixes.get(shorter).filter(|other| *other != name) {
                    return Err(invalid(format!(
                        "prefix '{prefix}' of '{name}' overlaps prefix '{shorter}' of '{other}'"
                    )));
                }
            }
        }

        info!(carriers = self.carriers.len(), "configuration validated");
        Ok(())
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(30)
}

fn default_country_code() -> String {
    "233".to_string()
}

fn default_national_length() -> usize {
    9
}

fn default_batch_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_unbind_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_throughput() -> u64 {
    10
}

fn default_max_connections() -> u32 {
    1
}

fn default_registered_delivery() -> u8 {
    1
}

fn default_dest_ton() -> u8 {
    TypeOfNumber::International as u8
}

fn default_dest_npi() -> u8 {
    NumericPlanIndicator::Isdn as u8
}
