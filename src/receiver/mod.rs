//! Receiver state model
//!
//! The satellite table, timing, alarms, survey and oscillator parameters,
//! and identity, as last reported by the receiver.

pub mod satellite;
pub mod state;
pub mod status;

pub use self::satellite::{SatelliteRecord, SatelliteTable};
pub use self::state::{Applied, Dops, Identity, OscillatorParams, ReceiverState, Rejected, SurveyState};
pub use self::status::{CriticalAlarms, DisciplineMode, MinorAlarms, ReceiverMode, SignalUnits, TimingFlags};
