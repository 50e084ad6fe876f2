use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Error, Result};

/// Byte order applied to every multi-byte field, independent of host order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// TSIP wire order
    #[default]
    Big,
    Little,
}

/// Serial framing guess for the receiver family on the other end of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// 8 data bits, odd parity (Thunderbolt default)
    #[default]
    Odd,
    /// 8 data bits, no parity
    None,
}

impl Dialect {
    /// The other dialect
    pub fn toggled(self) -> Self {
        match self {
            Dialect::Odd => Dialect::None,
            Dialect::None => Dialect::Odd,
        }
    }
}

/// Clamp limits applied to receiver-reported measurements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Upper limit for every dilution-of-precision figure
    pub max_dop: f32,
    /// Upper limit for the reported SV accuracy (meters)
    pub max_sv_accuracy: f32,
    /// Report negative signal levels by magnitude
    pub flip_negative_levels: bool,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            max_dop: 20.0,
            max_sv_accuracy: 100.0,
            flip_negative_levels: true,
        }
    }
}

impl Bounds {
    /// Clamps a DOP value into `[0, max_dop]`, mapping non-finite values to the limit
    pub fn dop(&self, value: f32) -> f32 {
        if !value.is_finite() || value > self.max_dop {
            self.max_dop
        } else {
            value.max(0.0)
        }
    }

    /// Clamps an SV accuracy into `[0, max_sv_accuracy]`
    pub fn sv_accuracy(&self, value: f32) -> f32 {
        if !value.is_finite() || value > self.max_sv_accuracy {
            self.max_sv_accuracy
        } else {
            value.max(0.0)
        }
    }

    /// Applies the signal-level sign convention. Non-finite levels carry no reading.
    pub fn signal_level(&self, value: f32) -> Option<f32> {
        if !value.is_finite() {
            None
        } else if self.flip_negative_levels && value < 0.0 {
            Some(-value)
        } else {
            Some(value)
        }
    }

    /// Caps a self-survey progress percentage at 100
    pub fn survey_progress(&self, value: u8) -> u8 {
        value.min(100)
    }
}

/// Configuration for the driver core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Receiver byte order
    pub byte_order: ByteOrder,
    /// Message ids accepted as a start marker when their escape byte was dropped
    pub repair_ids: Vec<u8>,
    /// Tokens discarded while resynchronizing before giving up
    pub resync_limit: usize,
    /// Longest payload buffered for one message
    pub max_payload: usize,
    /// Discard up to the first end marker (the stream may be entered mid-message)
    pub resync_on_start: bool,
    /// Measurement clamps
    pub bounds: Bounds,
    /// Initial serial dialect guess
    pub dialect: Dialect,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            byte_order: ByteOrder::Big,
            repair_ids: vec![0x47, 0x5B, 0x5C, 0x6D, 0x8F],
            resync_limit: super::RESYNC_LIMIT,
            max_payload: super::MAX_PAYLOAD,
            resync_on_start: true,
            bounds: Bounds::default(),
            dialect: Dialect::Odd,
        }
    }
}

impl DriverConfig {
    /// Checks that limits and bounds are usable
    pub fn validate(&self) -> Result<()> {
        if self.resync_limit == 0 {
            return Err(Error::config("resync limit must be non-zero"));
        }
        if self.max_payload == 0 {
            return Err(Error::config("max payload must be non-zero"));
        }
        if !(self.bounds.max_dop > 0.0) || !(self.bounds.max_sv_accuracy > 0.0) {
            return Err(Error::config("clamp bounds must be positive"));
        }
        if self.repair_ids.iter().any(|&id| id == super::DLE || id == super::ETX) {
            return Err(Error::config("framing bytes cannot be repair ids"));
        }
        Ok(())
    }
}

/// Serial transport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Serial device path
    pub device: String,
    /// Baud rate
    pub baud: u32,
    /// Parity guess used for the first open
    pub dialect: Dialect,
    /// Read timeout; a timed-out read means "no data yet"
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub read_timeout: Duration,
    /// Interval of the idle request poll
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub idle_poll: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            device: "/dev/ttyUSB0".to_string(),
            baud: 9600,
            dialect: Dialect::Odd,
            read_timeout: Duration::from_millis(10),
            idle_poll: Duration::from_secs(1),
        }
    }
}
