//! Broadcast radio model
//!
//! Every neighbour of the sender hears a frame after a fixed propagation
//! delay, unless that copy is lost. Losses are independent per receiver.
//! Attaching the link header can also fail, in which case nothing is sent.

use std::time::Duration;

use gradient_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Radio parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioConfig {
    /// Delay between a broadcast and its reception
    #[serde(with = "millis")]
    pub propagation_delay: Duration,
    /// Probability that one receiver misses a frame
    pub loss_probability: f64,
    /// Probability that the link layer rejects a frame before sending
    pub header_failure_probability: f64,
    /// Bytes the link layer prepends to every frame
    pub header_overhead: usize,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            propagation_delay: Duration::from_millis(1),
            loss_probability: 0.0,
            header_failure_probability: 0.0,
            header_overhead: 16,
        }
    }
}

impl RadioConfig {
    /// A perfect radio with the given loss probability
    pub fn lossy(loss_probability: f64) -> Self {
        Self {
            loss_probability,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, p) in [
            ("loss_probability", self.loss_probability),
            ("header_failure_probability", self.header_failure_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("{} is not a probability", p),
                });
            }
        }
        Ok(())
    }
}

/// Propagation delay as a float number of milliseconds
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(value.as_secs_f64() * 1_000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Duration::try_from_secs_f64(ms / 1_000.0).map_err(serde::de::Error::custom)
    }
}
