//! Receiver state model.
//!
//! Every field is `None` until a report supplying it has been committed.
//! Only fault-free reports reach [ReceiverState::apply]; a report that fails
//! a range check leaves every field untouched.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use super::satellite::{clamp_degrees, SatelliteTable};
use super::status::{CriticalAlarms, DisciplineMode, MinorAlarms, ReceiverMode, SignalUnits};
use crate::core::{Bounds, Result};
use crate::protocol::report::*;

/// A decoded report held a value the state model will not accept
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("{field} out of range: {value}")]
pub struct Rejected {
    pub field: &'static str,
    pub value: f64,
}

impl Rejected {
    fn new(field: &'static str, value: impl Into<f64>) -> Self {
        Rejected {
            field,
            value: value.into(),
        }
    }
}

/// Side effects of a committed report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    /// The report was primary timing
    pub primary_timing: bool,
    /// Survey configuration changed while surveying; read it back
    pub survey_readback: bool,
}

/// Oscillator disciplining parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OscillatorParams {
    pub time_constant: Option<f32>,
    pub damping: Option<f32>,
    pub gain: Option<f32>,
    pub min_volts: Option<f32>,
    pub max_volts: Option<f32>,
    pub jam_sync_threshold: Option<f32>,
    pub max_freq_offset: Option<f32>,
    pub initial_voltage: Option<f32>,
    /// (min, max) volts, not reported by every firmware
    pub dac_range: Option<(f32, f32)>,
}

impl OscillatorParams {
    fn apply(&mut self, params: DisciplineParams) {
        match params {
            DisciplineParams::Loop { time_constant, damping } => {
                self.time_constant = Some(time_constant);
                self.damping = Some(damping);
            }
            DisciplineParams::Oscillator { gain, min_volts, max_volts } => {
                self.gain = Some(gain);
                self.min_volts = Some(min_volts);
                self.max_volts = Some(max_volts);
            }
            DisciplineParams::JamSync { threshold, max_freq_offset } => {
                self.jam_sync_threshold = Some(threshold);
                self.max_freq_offset = Some(max_freq_offset);
            }
            DisciplineParams::InitialVoltage(volts) => self.initial_voltage = Some(volts),
            DisciplineParams::DacRange { min_volts, max_volts } => self.dac_range = Some((min_volts, max_volts)),
        }
    }
}

/// Self-survey progress and configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyState {
    /// Percent, 0..=100
    pub progress: Option<u8>,
    pub params: Option<SurveyParams>,
}

/// Dilution-of-precision figures, clamped
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dops {
    pub pdop: f32,
    pub hdop: f32,
    pub vdop: f32,
    pub tdop: f32,
}

/// Receiver identity and version reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub software: Option<SoftwareVersion>,
    pub firmware: Option<FirmwareVersion>,
    pub hardware: Option<HardwareInfo>,
    pub manufacturing: Option<ManufacturingParams>,
    pub production: Option<ProductionParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReceiverState {
    pub satellites: SatelliteTable,
    pub identity: Identity,

    pub receiver_mode: Option<ReceiverMode>,
    pub discipline_mode: Option<DisciplineMode>,
    pub timing: Option<PrimaryTiming>,
    pub gps_time: Option<GpsTime>,
    pub supplemental: Option<SupplementalTiming>,
    pub critical_alarms: Option<CriticalAlarms>,
    pub minor_alarms: Option<MinorAlarms>,
    pub survey: SurveyState,
    pub oscillator: OscillatorParams,
    pub pps: Option<PpsConfig>,
    pub dac: Option<DacReport>,
    pub ten_mhz_sense: Option<u8>,
    pub timing_mode: Option<TimingMode>,
    pub broadcast_mask: Option<BroadcastMask>,
    pub clock_solutions: Option<SatelliteSolutions>,

    pub dops: Option<Dops>,
    pub fix_dimension: Option<u8>,
    pub io_options: Option<IoOptions>,
    pub signal_units: SignalUnits,
    pub receiver_config: Option<ReceiverConfig>,
    pub filter_config: Option<FilterConfig>,
    pub port_config: Option<PortConfig>,
    pub dgps_mode: Option<u8>,

    pub health: Option<Health>,
    pub machine_status: Option<MachineStatus>,
    pub last_fix: Option<LastFix>,
    pub position_xyz: Option<PositionXyz>,
    pub position_lla: Option<PositionLla>,
    pub velocity_xyz: Option<VelocityXyz>,
    pub velocity_enu: Option<VelocityEnu>,

    /// Id of the last command the receiver could not parse
    pub unparsable_command: Option<u8>,
}

fn check_primary_timing(t: &PrimaryTiming) -> std::result::Result<(), Rejected> {
    if t.seconds > 60 {
        return Err(Rejected::new("seconds", t.seconds));
    }
    if t.minutes > 59 {
        return Err(Rejected::new("minutes", t.minutes));
    }
    if t.hours > 23 {
        return Err(Rejected::new("hours", t.hours));
    }
    if !(1..=31).contains(&t.day) {
        return Err(Rejected::new("day", t.day));
    }
    if !(1..=12).contains(&t.month) {
        return Err(Rejected::new("month", t.month));
    }
    if t.time_of_week >= 604_800 {
        return Err(Rejected::new("time of week", t.time_of_week));
    }
    Ok(())
}

fn check_prn(prn: u8) -> std::result::Result<(), Rejected> {
    if (1..=crate::core::MAX_PRN).contains(&prn) {
        Ok(())
    } else {
        Err(Rejected::new("prn", prn))
    }
}

impl ReceiverState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a primary timing report has been committed
    pub fn have_time(&self) -> bool {
        self.timing.is_some()
    }

    /// Commits one decoded report.
    ///
    /// Range checks run before any field is written, so on `Err` the state is
    /// exactly as it was.
    pub fn apply(&mut self, report: Report, bounds: &Bounds) -> std::result::Result<Applied, Rejected> {
        let mut applied = Applied::default();
        match report {
            Report::Unparsable { id } => self.unparsable_command = Some(id),
            Report::FirmwareVersion(v) => self.identity.firmware = Some(v),
            Report::HardwareInfo(h) => self.identity.hardware = Some(h),
            Report::SoftwareVersion(v) => self.identity.software = Some(v),
            Report::ManufacturingParams(m) => self.identity.manufacturing = Some(m),
            Report::ProductionParams(p) => self.identity.production = Some(p),
            Report::GpsTime(t) => self.gps_time = Some(t),
            Report::PositionXyz(p) => self.position_xyz = Some(p),
            Report::PositionLla(p) => self.position_lla = Some(p),
            Report::VelocityXyz(v) => self.velocity_xyz = Some(v),
            Report::VelocityEnu(v) => self.velocity_enu = Some(v),
            Report::Health(h) => self.health = Some(h),
            Report::MachineStatus(m) => self.machine_status = Some(m),
            Report::LastFix(f) => self.last_fix = Some(f),
            Report::IoOptions(io) => {
                self.signal_units = io.signal_units();
                self.io_options = Some(io);
            }
            Report::SignalLevels(levels) => {
                self.satellites.clear_level_msgs();
                for (prn, level) in levels {
                    if let Some(record) = self.satellites.get_mut(prn) {
                        let level = bounds.signal_level(level);
                        record.signal_level = level;
                        record.tracking = level.map_or(false, |l| l > 0.0);
                        record.level_msg = Some(0x47);
                    }
                }
            }
            Report::SatelliteAttributes(attrs) => {
                for (i, &flag) in attrs.flags.iter().enumerate() {
                    if let Some(record) = self.satellites.get_mut(i as u8 + 1) {
                        match attrs.operation {
                            3 => record.enabled = Some(flag == 0),
                            6 => record.heed_health = Some(flag == 0),
                            _ => {}
                        }
                    }
                }
            }
            Report::RawMeasurement(m) => {
                check_prn(m.prn)?;
                if let Some(record) = self.satellites.get_mut(m.prn) {
                    record.signal_level = bounds.signal_level(m.level);
                    record.code_phase = Some(m.code_phase);
                    record.doppler = Some(m.doppler);
                    record.level_msg = Some(0x5A);
                }
            }
            Report::EphemerisStatus(e) => {
                check_prn(e.prn)?;
                if let Some(record) = self.satellites.get_mut(e.prn) {
                    record.health = Some(e.health);
                    record.iode = Some(e.iode);
                    record.toe = Some(e.toe);
                    record.sv_accuracy = Some(bounds.sv_accuracy(e.accuracy));
                }
            }
            Report::TrackingStatus(t) => {
                check_prn(t.prn)?;
                if let Some(record) = self.satellites.get_mut(t.prn) {
                    record.slot_channel = Some(t.slot_channel);
                    record.acquisition = Some(t.acquisition);
                    record.ephemeris_flag = Some(t.ephemeris);
                    record.tracking = t.acquisition > 0;
                    record.signal_level = bounds.signal_level(t.level);
                    record.last_measurement = Some(t.last_measurement);
                    record.elevation = clamp_degrees(t.elevation, 90.0);
                    record.azimuth = clamp_degrees(t.azimuth, 360.0);
                    record.level_msg = Some(0x5C);
                }
            }
            Report::SatelliteSelection(sel) => {
                self.dops = Some(Dops {
                    pdop: bounds.dop(sel.pdop),
                    hdop: bounds.dop(sel.hdop),
                    vdop: bounds.dop(sel.vdop),
                    tdop: bounds.dop(sel.tdop),
                });
                self.fix_dimension = Some(sel.fix_dimension());
                self.satellites.clear_in_fix();
                for prn in sel.prns.iter().filter(|&&p| p > 0) {
                    if let Some(record) = self.satellites.get_mut(*prn as u8) {
                        record.in_fix = true;
                    }
                }
            }
            Report::SatelliteSolutions(sol) => {
                for &(prn, bias) in &sol.biases {
                    if let Some(record) = self.satellites.get_mut(prn) {
                        record.clock_bias = Some(bias);
                    }
                }
                self.clock_solutions = Some(sol);
            }
            Report::FilterConfig(f) => self.filter_config = Some(f),
            Report::DgpsMode(mode) => self.dgps_mode = Some(mode),
            Report::ReceiverConfig(c) => {
                self.receiver_mode = Some(c.receiver_mode);
                self.receiver_config = Some(c);
            }
            Report::PortConfig(p) => self.port_config = Some(p),
            Report::PpsCharacteristics(pps) => self.pps = Some(pps),
            Report::DacValue(dac) => self.dac = Some(dac),
            Report::TenMhzSense(sense) => self.ten_mhz_sense = Some(sense),
            Report::TimingMode(mode) => self.timing_mode = Some(mode),
            Report::BroadcastMask(mask) => self.broadcast_mask = Some(mask),
            Report::SurveyCommand(_) => {}
            Report::DisciplineParams(params) => self.oscillator.apply(params),
            Report::SurveyParams(params) => {
                applied.survey_readback = params.enabled && self.survey.params != Some(params);
                self.survey.params = Some(params);
            }
            Report::PrimaryTiming(t) => {
                check_primary_timing(&t)?;
                self.timing = Some(t);
                applied.primary_timing = true;
            }
            Report::SupplementalTiming(s) => {
                self.receiver_mode = Some(s.receiver_mode);
                self.discipline_mode = Some(s.discipline_mode);
                self.critical_alarms = Some(s.critical);
                self.minor_alarms = Some(s.minor);
                self.survey.progress = Some(bounds.survey_progress(s.survey_progress));
                self.supplemental = Some(s);
            }
        }
        trace!(?applied, "report committed");
        Ok(applied)
    }

    /// Writes a binary snapshot of the state
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        bincode::serialize_into(writer, self)?;
        Ok(())
    }

    /// Reads a snapshot written by [ReceiverState::save]
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        Ok(bincode::deserialize_from(reader)?)
    }
}
