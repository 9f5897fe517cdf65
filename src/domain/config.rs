//! Configuration profiles
//!
//! `ClientConfig` is a saved profile for one fldigi instance: where its
//! XML-RPC server listens and how the transmit supervisor behaves.
//! Profiles are stored as pretty-printed JSON.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{FldigiError, FldigiResult};

fn default_poll_interval_idle_secs() -> f64 {
    1.0
}

fn default_poll_interval_transmitting_secs() -> f64 {
    0.15
}

fn default_transmit_inactivity_timeout_secs() -> f64 {
    1.5
}

fn default_max_duty_cycle_percent() -> f64 {
    95.0
}

fn default_max_transmit_time_secs() -> f64 {
    120.0
}

fn default_max_text_length() -> usize {
    10_000
}

fn default_max_history_secs() -> f64 {
    900.0
}

fn default_sample_retries() -> u32 {
    3
}

fn default_sample_retry_delay_ms() -> u64 {
    5
}

/// Transmit supervisor tuning.
///
/// `max_duty_cycle_percent`, `max_transmit_time_secs` and `max_text_length`
/// are advisory: breaching them is logged, never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Poll interval while not transmitting
    #[serde(default = "default_poll_interval_idle_secs")]
    pub poll_interval_idle_secs: f64,
    /// Poll interval while transmitting, short so end of TX is caught quickly
    #[serde(default = "default_poll_interval_transmitting_secs")]
    pub poll_interval_transmitting_secs: f64,
    /// Time after the last transmitted byte at which TX is presumed finished
    #[serde(default = "default_transmit_inactivity_timeout_secs")]
    pub transmit_inactivity_timeout_secs: f64,
    #[serde(default = "default_max_duty_cycle_percent")]
    pub max_duty_cycle_percent: f64,
    #[serde(default = "default_max_transmit_time_secs")]
    pub max_transmit_time_secs: f64,
    /// Characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    /// Retention window of the state/TX-data history
    #[serde(default = "default_max_history_secs")]
    pub max_history_secs: f64,
    /// Status query attempts before a sample counts as ERROR
    #[serde(default = "default_sample_retries")]
    pub sample_retries: u32,
    #[serde(default = "default_sample_retry_delay_ms")]
    pub sample_retry_delay_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            poll_interval_idle_secs: default_poll_interval_idle_secs(),
            poll_interval_transmitting_secs: default_poll_interval_transmitting_secs(),
            transmit_inactivity_timeout_secs: default_transmit_inactivity_timeout_secs(),
            max_duty_cycle_percent: default_max_duty_cycle_percent(),
            max_transmit_time_secs: default_max_transmit_time_secs(),
            max_text_length: default_max_text_length(),
            max_history_secs: default_max_history_secs(),
            sample_retries: default_sample_retries(),
            sample_retry_delay_ms: default_sample_retry_delay_ms(),
        }
    }
}

/// Seconds that convert to a non-zero `Duration` without overflow.
fn positive_secs(name: &str, value: f64) -> FldigiResult<Duration> {
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(FldigiError::Config(format!(
            "{name} must be a positive number of seconds, got {value}"
        ))),
    }
}

impl SupervisorConfig {
    /// Reject values that would make the supervisor loop meaningless or
    /// that cannot be turned into a `Duration`.
    pub fn validate(&self) -> FldigiResult<()> {
        let positive = [
            ("poll_interval_idle_secs", self.poll_interval_idle_secs),
            ("poll_interval_transmitting_secs", self.poll_interval_transmitting_secs),
            ("transmit_inactivity_timeout_secs", self.transmit_inactivity_timeout_secs),
            ("max_transmit_time_secs", self.max_transmit_time_secs),
            ("max_history_secs", self.max_history_secs),
        ];
        for (name, value) in positive {
            positive_secs(name, value)?;
        }
        if !(self.max_duty_cycle_percent > 0.0 && self.max_duty_cycle_percent <= 100.0) {
            return Err(FldigiError::Config(format!(
                "max_duty_cycle_percent must be in (0, 100], got {}",
                self.max_duty_cycle_percent
            )));
        }
        if self.sample_retries == 0 {
            return Err(FldigiError::Config("sample_retries must be at least 1".into()));
        }
        Ok(())
    }

    pub fn poll_interval_idle(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_idle_secs)
    }

    pub fn poll_interval_transmitting(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_transmitting_secs)
    }

    pub fn transmit_inactivity_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.transmit_inactivity_timeout_secs)
    }

    pub fn max_transmit_time(&self) -> Duration {
        Duration::from_secs_f64(self.max_transmit_time_secs)
    }

    pub fn max_history(&self) -> Duration {
        Duration::from_secs_f64(self.max_history_secs)
    }

    pub fn sample_retry_delay(&self) -> Duration {
        Duration::from_millis(self.sample_retry_delay_ms)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    7362
}

fn default_request_timeout_secs() -> f64 {
    5.0
}

/// Connection profile for one fldigi instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host running fldigi's XML-RPC server
    #[serde(default = "default_host")]
    pub host: String,
    /// fldigi's XML-RPC port (7362 unless changed on its command line)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: f64,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> FldigiResult<()> {
        if self.host.trim().is_empty() {
            return Err(FldigiError::Config("host cannot be empty".into()));
        }
        positive_secs("request_timeout_secs", self.request_timeout_secs)?;
        self.supervisor.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs)
    }

    /// Read a JSON profile. Missing fields take their defaults.
    pub fn load(path: &Path) -> FldigiResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            FldigiError::Config(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        let config: ClientConfig = serde_json::from_str(&json).map_err(|e| {
            FldigiError::Config(format!("Failed to parse config '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> FldigiResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FldigiError::Config(format!("Serialization error: {e}")))?;
        std::fs::write(path, json).map_err(|e| {
            FldigiError::Config(format!("Failed to write config '{}': {e}", path.display()))
        })
    }
}
