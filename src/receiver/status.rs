//! Receiver-asserted status enumerations and bitmasks.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Fix / receiver mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiverMode {
    Automatic,
    SingleSatellite,
    Horizontal,
    FullPosition,
    DgpsReference,
    ClockHold,
    OverdeterminedClock,
    Other(u8),
}

impl ReceiverMode {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ReceiverMode::Automatic,
            1 => ReceiverMode::SingleSatellite,
            3 => ReceiverMode::Horizontal,
            4 => ReceiverMode::FullPosition,
            5 => ReceiverMode::DgpsReference,
            6 => ReceiverMode::ClockHold,
            7 => ReceiverMode::OverdeterminedClock,
            other => ReceiverMode::Other(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            ReceiverMode::Automatic => 0,
            ReceiverMode::SingleSatellite => 1,
            ReceiverMode::Horizontal => 3,
            ReceiverMode::FullPosition => 4,
            ReceiverMode::DgpsReference => 5,
            ReceiverMode::ClockHold => 6,
            ReceiverMode::OverdeterminedClock => 7,
            ReceiverMode::Other(raw) => raw,
        }
    }
}

/// Oscillator disciplining mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisciplineMode {
    Normal,
    PowerUp,
    AutoHoldover,
    ManualHoldover,
    Recovery,
    DisabledOrExternal,
}

impl DisciplineMode {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => DisciplineMode::Normal,
            1 => DisciplineMode::PowerUp,
            2 => DisciplineMode::AutoHoldover,
            3 => DisciplineMode::ManualHoldover,
            4 => DisciplineMode::Recovery,
            _ => DisciplineMode::DisabledOrExternal,
        }
    }

    pub fn is_holdover(self) -> bool {
        matches!(self, DisciplineMode::AutoHoldover | DisciplineMode::ManualHoldover)
    }
}

/// Units of reported signal levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalUnits {
    #[default]
    Amu,
    DbHz,
}

bitflags! {
    /// Critical alarms from the supplemental timing report
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct CriticalAlarms: u16 {
        const ROM = 0x0001;
        const RAM = 0x0002;
        const POWER = 0x0004;
        const FPGA = 0x0008;
        /// Oscillator control voltage at rail
        const OSCILLATOR = 0x0010;
    }
}

bitflags! {
    /// Minor alarms from the supplemental timing report
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct MinorAlarms: u16 {
        const OSC_NEAR_RAIL = 0x0001;
        const ANTENNA_OPEN = 0x0002;
        const ANTENNA_SHORT = 0x0004;
        const NOT_TRACKING = 0x0008;
        const NOT_DISCIPLINING = 0x0010;
        const SURVEY_IN_PROGRESS = 0x0020;
        const NO_SAVED_POSITION = 0x0040;
        const LEAP_PENDING = 0x0080;
        const TEST_MODE = 0x0100;
        const POSITION_QUESTIONABLE = 0x0200;
        const EEPROM_CORRUPT = 0x0400;
        const ALMANAC_INCOMPLETE = 0x0800;
        const NO_PPS = 0x1000;
    }
}

bitflags! {
    /// Timing flags from the primary timing report
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct TimingFlags: u8 {
        /// Time fields are UTC rather than GPS
        const UTC_TIME = 0x01;
        /// PPS is aligned to UTC rather than GPS
        const UTC_PPS = 0x02;
        const TIME_NOT_SET = 0x04;
        const NO_UTC_INFO = 0x08;
        const USER_TIME = 0x10;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receiver_mode_raw_roundtrip() {
        for raw in 0..=8u8 {
            assert_eq!(ReceiverMode::from_raw(raw).raw(), raw);
        }
        assert_eq!(ReceiverMode::from_raw(7), ReceiverMode::OverdeterminedClock);
        assert_eq!(ReceiverMode::from_raw(2), ReceiverMode::Other(2));
    }

    #[test]
    fn test_discipline_mode_mapping() {
        assert_eq!(DisciplineMode::from_raw(0), DisciplineMode::Normal);
        assert_eq!(DisciplineMode::from_raw(3), DisciplineMode::ManualHoldover);
        assert_eq!(DisciplineMode::from_raw(6), DisciplineMode::DisabledOrExternal);
        assert!(DisciplineMode::from_raw(2).is_holdover());
        assert!(!DisciplineMode::from_raw(4).is_holdover());
    }

    #[test]
    fn test_alarm_bits_keep_unknown() {
        let minor = MinorAlarms::from_bits_retain(0x8002);
        assert!(minor.contains(MinorAlarms::ANTENNA_OPEN));
        assert_eq!(minor.bits(), 0x8002);
    }
}
