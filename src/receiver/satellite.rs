//! Per-PRN satellite table.

use serde::{Deserialize, Serialize};

use crate::core::MAX_PRN;

/// Everything known about one satellite
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SatelliteRecord {
    /// Message id that last supplied this slot; cleared on every signal-level broadcast
    pub level_msg: Option<u8>,
    pub tracking: bool,
    /// Channel in bits 3..7, slot in bits 0..2
    pub slot_channel: Option<u8>,
    /// Degrees, `[0, 360]`
    pub azimuth: Option<f32>,
    /// Degrees, `[0, 90]`
    pub elevation: Option<f32>,
    pub signal_level: Option<f32>,
    pub doppler: Option<f32>,
    pub code_phase: Option<f32>,
    /// Nanoseconds
    pub clock_bias: Option<f32>,
    pub last_measurement: Option<f32>,
    pub acquisition: Option<u8>,
    pub ephemeris_flag: Option<u8>,
    pub health: Option<u8>,
    pub iode: Option<u8>,
    pub toe: Option<f32>,
    /// Metres
    pub sv_accuracy: Option<f32>,
    pub enabled: Option<bool>,
    pub heed_health: Option<bool>,
    /// Counted in the current fix
    pub in_fix: bool,
}

impl SatelliteRecord {
    /// Marked in use by the latest signal-level or tracking report
    pub fn in_use(&self) -> bool {
        self.level_msg.is_some()
    }
}

/// Radians to degrees, clamped to `[0, max]`; non-finite input has no value
pub fn clamp_degrees(radians: f32, max: f32) -> Option<f32> {
    if !radians.is_finite() {
        return None;
    }
    Some(radians.to_degrees().clamp(0.0, max))
}

/// Satellite records for PRN 1 through 32
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SatelliteTable {
    records: [SatelliteRecord; MAX_PRN as usize],
}

impl SatelliteTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(prn: u8) -> Option<usize> {
        if (1..=MAX_PRN).contains(&prn) {
            Some(prn as usize - 1)
        } else {
            None
        }
    }

    pub fn get(&self, prn: u8) -> Option<&SatelliteRecord> {
        Self::slot(prn).map(|i| &self.records[i])
    }

    pub fn get_mut(&mut self, prn: u8) -> Option<&mut SatelliteRecord> {
        Self::slot(prn).map(move |i| &mut self.records[i])
    }

    /// Clears the in-use marker of every slot
    pub fn clear_level_msgs(&mut self) {
        for record in self.records.iter_mut() {
            record.level_msg = None;
        }
    }

    pub fn clear_in_fix(&mut self) {
        for record in self.records.iter_mut() {
            record.in_fix = false;
        }
    }

    /// (PRN, record) for every slot currently in use
    pub fn in_use(&self) -> impl Iterator<Item = (u8, &SatelliteRecord)> {
        self.iter().filter(|(_, r)| r.in_use())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u8, &SatelliteRecord)> {
        self.records.iter().enumerate().map(|(i, r)| (i as u8 + 1, r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_prn_bounds() {
        let mut table = SatelliteTable::new();
        assert!(table.get(0).is_none());
        assert!(table.get(33).is_none());
        assert!(table.get_mut(32).is_some());
        assert_eq!(table.iter().count(), 32);
    }

    #[test]
    fn test_in_use_tracks_level_msg() {
        let mut table = SatelliteTable::new();
        if let Some(r) = table.get_mut(7) {
            r.level_msg = Some(0x47);
        }
        let used: Vec<u8> = table.in_use().map(|(prn, _)| prn).collect();
        assert_eq!(used, vec![7]);
        table.clear_level_msgs();
        assert_eq!(table.in_use().count(), 0);
    }

    #[test]
    fn test_angle_clamping() {
        assert_eq!(clamp_degrees(PI / 2.0, 90.0), Some(90.0));
        assert_eq!(clamp_degrees(PI, 90.0), Some(90.0));
        assert_eq!(clamp_degrees(-0.1, 360.0), Some(0.0));
        assert_eq!(clamp_degrees(f32::NAN, 360.0), None);
        let az = clamp_degrees(PI, 360.0).unwrap();
        assert!((az - 180.0).abs() < 1e-3);
    }
}
