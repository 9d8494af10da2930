//! Protocol configuration
//!
//! Defaults follow the reference deployment: a 500 ms announce delay, a 10 s
//! origination period, 50 ms inter-send jitter, 1 s start-up spread, and a
//! sink heartbeat every ten periods. Configuration can be loaded from TOML
//! or from key/value parameters as a hosting simulator passes them.
//!
//! ```toml
//! sink = 0
//! origin = 1
//! buffer_capacity = 10
//! sequence_capacity = 10
//!
//! [timing]
//! delay = "500ms"
//! period = "10s"
//! jitter = "50ms"
//! time_space = "1s"
//! heartbeat_periods = 10
//! ```

use std::path::Path;
use std::time::Duration;

use gradient_core::{ConfigError, NodeId, Role};
use serde::{Deserialize, Serialize};

/// Default forward buffer capacity (M)
pub const DEFAULT_BUFFER_CAPACITY: usize = 10;

/// Default sequence cache capacity (N)
pub const DEFAULT_SEQUENCE_CAPACITY: usize = 10;

/// Timing parameters shared by every node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Upper bound of the random delay before a re-announcement or the
    /// first drain of the forward buffer
    #[serde(with = "time_format")]
    pub delay: Duration,
    /// Origination period; the sink heartbeat is a multiple of it
    #[serde(with = "time_format")]
    pub period: Duration,
    /// Upper bound of the random delay between consecutive sends
    #[serde(with = "time_format")]
    pub jitter: Duration,
    /// Upper bound of the extra random delay before the first origination
    #[serde(with = "time_format")]
    pub time_space: Duration,
    /// Sink heartbeat interval, in periods (K)
    pub heartbeat_periods: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            period: Duration::from_secs(10),
            jitter: Duration::from_millis(50),
            time_space: Duration::from_secs(1),
            heartbeat_periods: 10,
        }
    }
}

impl TimingConfig {
    /// Interval between two sink heartbeats (`K × Period`)
    pub fn heartbeat_interval(&self) -> Duration {
        self.period.saturating_mul(self.heartbeat_periods)
    }
}

/// Complete protocol configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    pub timing: TimingConfig,
    /// The single, fixed sink
    pub sink: NodeId,
    /// The node that originates DATA packets, if any
    pub origin: Option<NodeId>,
    /// Forward buffer capacity (M)
    pub buffer_capacity: usize,
    /// Sequence cache capacity (N)
    pub sequence_capacity: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            sink: NodeId::SINK,
            origin: Some(NodeId(1)),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            sequence_capacity: DEFAULT_SEQUENCE_CAPACITY,
        }
    }
}

impl ProtocolConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build a configuration from key/value parameters
    ///
    /// Recognised keys: `Delay`, `Period`, `Jitter`, `TimeSpace`,
    /// `Heartbeat`, `sink`, `origin` (a node id or `none`), `buffer`,
    /// `sequence`. Unset keys keep their defaults.
    pub fn from_params<'a, I>(params: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (key, value) in params {
            match key {
                "Delay" => config.timing.delay = time_param(key, value)?,
                "Period" => config.timing.period = time_param(key, value)?,
                "Jitter" => config.timing.jitter = time_param(key, value)?,
                "TimeSpace" => config.timing.time_space = time_param(key, value)?,
                "Heartbeat" => config.timing.heartbeat_periods = int_param(key, value)?,
                "sink" => config.sink = NodeId(int_param(key, value)?),
                "origin" => {
                    config.origin = if value.trim().eq_ignore_ascii_case("none") {
                        None
                    } else {
                        Some(NodeId(int_param(key, value)?))
                    }
                }
                "buffer" => config.buffer_capacity = int_param(key, value)?,
                "sequence" => config.sequence_capacity = int_param(key, value)?,
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that would make the protocol misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.period.is_zero() {
            return Err(invalid("timing.period", "must be greater than zero"));
        }
        if self.timing.heartbeat_periods == 0 {
            return Err(invalid("timing.heartbeat_periods", "must be at least 1"));
        }
        if self.buffer_capacity == 0 {
            return Err(invalid("buffer_capacity", "must be at least 1"));
        }
        if self.sequence_capacity == 0 {
            return Err(invalid("sequence_capacity", "must be at least 1"));
        }
        if self.origin == Some(self.sink) {
            return Err(invalid("origin", "the sink cannot originate data"));
        }
        Ok(())
    }

    /// Role assigned to a node
    pub fn role_of(&self, node: NodeId) -> Role {
        if node == self.sink {
            Role::Sink
        } else {
            Role::Sensor
        }
    }

    /// Whether a node originates DATA packets
    pub fn is_origin(&self, node: NodeId) -> bool {
        self.origin == Some(node)
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn time_param(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_time(value).ok_or_else(|| ConfigError::InvalidTime {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn int_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: format!("not an integer: {:?}", value),
    })
}

/// Parse a time value
///
/// Accepts an integer number of nanoseconds, or a non-negative number
/// followed by `ns`, `us`, `ms`, or `s`.
pub fn parse_time(value: &str) -> Option<Duration> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    if number.is_empty() {
        return None;
    }

    let nanos_per_unit = match unit.trim() {
        "" => return number.parse::<u64>().ok().map(Duration::from_nanos),
        "ns" => 1.0,
        "us" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        _ => return None,
    };
    let number: f64 = number.parse().ok()?;
    let nanos = (number * nanos_per_unit).round();
    if !nanos.is_finite() || nanos < 0.0 || nanos > u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos as u64))
}

/// Render a duration in the largest unit that represents it exactly
pub fn format_time(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    for (unit, scale) in [("s", 1_000_000_000u128), ("ms", 1_000_000), ("us", 1_000)] {
        if nanos % scale == 0 {
            return format!("{}{}", nanos / scale, unit);
        }
    }
    format!("{}ns", nanos)
}

mod time_format {
    use std::time::Duration;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Nanos(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_time(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Nanos(n) => Ok(Duration::from_nanos(n)),
            Raw::Text(s) => super::parse_time(&s)
                .ok_or_else(|| D::Error::custom(format!("invalid time value {:?}", s))),
        }
    }
}
