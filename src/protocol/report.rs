//! Typed reports decoded from receiver messages.
//!
//! Every report mirrors its wire layout: fields are read in wire order and
//! hold the values the receiver sent, in the receiver's units. Range checks
//! and clamping happen when a report is committed to the receiver state.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::fields::{DecodeFault, FieldDecoder, FieldResult};
use crate::receiver::status::{CriticalAlarms, DisciplineMode, MinorAlarms, ReceiverMode, SignalUnits, TimingFlags};

/// A fully decoded receiver message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Report {
    /// 0x13: the receiver could not parse a command
    Unparsable { id: u8 },
    FirmwareVersion(FirmwareVersion),
    HardwareInfo(HardwareInfo),
    GpsTime(GpsTime),
    PositionXyz(PositionXyz),
    VelocityXyz(VelocityXyz),
    SoftwareVersion(SoftwareVersion),
    Health(Health),
    /// 0x47: (PRN, level) pairs
    SignalLevels(Vec<(u8, f32)>),
    PositionLla(PositionLla),
    MachineStatus(MachineStatus),
    IoOptions(IoOptions),
    VelocityEnu(VelocityEnu),
    LastFix(LastFix),
    SatelliteAttributes(SatelliteAttributes),
    RawMeasurement(RawMeasurement),
    EphemerisStatus(EphemerisStatus),
    TrackingStatus(TrackingStatus),
    SatelliteSelection(SatelliteSelection),
    FilterConfig(FilterConfig),
    /// 0x82
    DgpsMode(u8),
    ReceiverConfig(ReceiverConfig),
    PortConfig(PortConfig),
    ManufacturingParams(ManufacturingParams),
    ProductionParams(ProductionParams),
    PpsCharacteristics(PpsConfig),
    DacValue(DacReport),
    /// 8F-A1: 0 for sine, 1 for square
    TenMhzSense(u8),
    TimingMode(TimingMode),
    BroadcastMask(BroadcastMask),
    /// 8F-A6: acknowledged self-survey command
    SurveyCommand(u8),
    SatelliteSolutions(SatelliteSolutions),
    DisciplineParams(DisciplineParams),
    SurveyParams(SurveyParams),
    PrimaryTiming(PrimaryTiming),
    SupplementalTiming(SupplementalTiming),
}

fn text(d: &mut FieldDecoder<'_>, len: usize) -> FieldResult<String> {
    Ok(String::from_utf8_lossy(d.bytes(len)?).into_owned())
}

/// Expands a two-digit year as the receiver reports it
fn full_year(raw: u8) -> u16 {
    if raw >= 80 {
        1900 + raw as u16
    } else {
        2000 + raw as u16
    }
}

/// 0x1C-81
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub month: u8,
    pub day: u8,
    pub year: u16,
    pub name: String,
}

impl FirmwareVersion {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        d.skip(1)?;
        let major = d.u8()?;
        let minor = d.u8()?;
        let build = d.u8()?;
        let month = d.u8()?;
        let day = d.u8()?;
        let year = d.u16()?;
        let len = d.u8()? as usize;
        let name = text(d, len)?;
        Ok(FirmwareVersion { major, minor, build, month, day, year, name })
    }
}

/// 0x1C-83
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub serial: u32,
    pub day: u8,
    pub month: u8,
    pub year: u16,
    pub hour: u8,
    pub code: u16,
    pub id: String,
}

impl HardwareInfo {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        let serial = d.u32()?;
        let day = d.u8()?;
        let month = d.u8()?;
        let year = d.u16()?;
        let hour = d.u8()?;
        let code = d.u16()?;
        let len = d.u8()? as usize;
        let id = text(d, len)?;
        Ok(HardwareInfo { serial, day, month, year, hour, code, id })
    }
}

/// 0x41
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsTime {
    pub time_of_week: f32,
    pub week: u16,
    pub utc_offset: f32,
}

impl GpsTime {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(GpsTime {
            time_of_week: d.f32()?,
            week: d.u16()?,
            utc_offset: d.f32()?,
        })
    }
}

/// 0x42 and 0x83: ECEF position in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionXyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Clock bias; only the double-precision report carries it
    pub clock_bias: Option<f64>,
    pub time_of_fix: f32,
}

impl PositionXyz {
    pub fn decode_single(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(PositionXyz {
            x: d.f32()? as f64,
            y: d.f32()? as f64,
            z: d.f32()? as f64,
            clock_bias: None,
            time_of_fix: d.f32()?,
        })
    }

    pub fn decode_double(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(PositionXyz {
            x: d.f64()?,
            y: d.f64()?,
            z: d.f64()?,
            clock_bias: Some(d.f64()?),
            time_of_fix: d.f32()?,
        })
    }
}

/// 0x43: ECEF velocity in m/s
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityXyz {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub bias_rate: f32,
    pub time_of_fix: f32,
}

impl VelocityXyz {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(VelocityXyz {
            x: d.f32()?,
            y: d.f32()?,
            z: d.f32()?,
            bias_rate: d.f32()?,
            time_of_fix: d.f32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub month: u8,
    pub day: u8,
    pub year: u16,
}

impl Version {
    fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(Version {
            major: d.u8()?,
            minor: d.u8()?,
            month: d.u8()?,
            day: d.u8()?,
            year: full_year(d.u8()?),
        })
    }
}

/// 0x45
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareVersion {
    pub application: Version,
    pub core: Version,
}

impl SoftwareVersion {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(SoftwareVersion {
            application: Version::decode(d)?,
            core: Version::decode(d)?,
        })
    }
}

/// 0x46
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: u8,
    pub errors: u8,
}

impl Health {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(Health {
            status: d.u8()?,
            errors: d.u8()?,
        })
    }
}

fn decode_signal_levels(d: &mut FieldDecoder<'_>) -> FieldResult<Vec<(u8, f32)>> {
    let count = d.u8()? as usize;
    let mut levels = Vec::with_capacity(count);
    for _ in 0..count {
        let prn = d.u8()?;
        let level = d.f32()?;
        levels.push((prn, level));
    }
    Ok(levels)
}

/// 0x4A and 0x84: geodetic position, angles in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionLla {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub clock_bias: f64,
    pub time_of_fix: f32,
}

impl PositionLla {
    pub fn decode_single(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(PositionLla {
            latitude: d.f32()? as f64,
            longitude: d.f32()? as f64,
            altitude: d.f32()? as f64,
            clock_bias: d.f32()? as f64,
            time_of_fix: d.f32()?,
        })
    }

    pub fn decode_double(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(PositionLla {
            latitude: d.f64()?,
            longitude: d.f64()?,
            altitude: d.f64()?,
            clock_bias: d.f64()?,
            time_of_fix: d.f32()?,
        })
    }
}

/// 0x4B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineStatus {
    pub machine_id: u8,
    pub status1: u8,
    pub status2: u8,
}

impl MachineStatus {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(MachineStatus {
            machine_id: d.u8()?,
            status1: d.u8()?,
            status2: d.u8()?,
        })
    }
}

/// 0x55 report, and the payload of the matching set command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IoOptions {
    pub position: u8,
    pub velocity: u8,
    pub timing: u8,
    pub auxiliary: u8,
}

impl IoOptions {
    const AUX_DB_HZ: u8 = 0x08;

    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(IoOptions {
            position: d.u8()?,
            velocity: d.u8()?,
            timing: d.u8()?,
            auxiliary: d.u8()?,
        })
    }

    pub fn signal_units(&self) -> SignalUnits {
        if self.auxiliary & Self::AUX_DB_HZ != 0 {
            SignalUnits::DbHz
        } else {
            SignalUnits::Amu
        }
    }
}

/// 0x56: east/north/up velocity in m/s
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityEnu {
    pub east: f32,
    pub north: f32,
    pub up: f32,
    pub bias_rate: f32,
    pub time_of_fix: f32,
}

impl VelocityEnu {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(VelocityEnu {
            east: d.f32()?,
            north: d.f32()?,
            up: d.f32()?,
            bias_rate: d.f32()?,
            time_of_fix: d.f32()?,
        })
    }
}

/// 0x57
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastFix {
    pub source: u8,
    pub diagnostic: u8,
    pub time_of_fix: f32,
    pub week: u16,
}

impl LastFix {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(LastFix {
            source: d.u8()?,
            diagnostic: d.u8()?,
            time_of_fix: d.f32()?,
            week: d.u16()?,
        })
    }
}

/// 0x59: per-PRN enable or heed-health flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteAttributes {
    /// 3 for enable flags, 6 for heed-health flags
    pub operation: u8,
    pub flags: [u8; 32],
}

impl SatelliteAttributes {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        let operation = d.u8()?;
        let mut flags = [0u8; 32];
        flags.copy_from_slice(d.bytes(32)?);
        Ok(SatelliteAttributes { operation, flags })
    }
}

/// 0x5A
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    pub prn: u8,
    pub sample_length: f32,
    pub level: f32,
    pub code_phase: f32,
    pub doppler: f32,
    pub time: f64,
}

impl RawMeasurement {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(RawMeasurement {
            prn: d.u8()?,
            sample_length: d.f32()?,
            level: d.f32()?,
            code_phase: d.f32()?,
            doppler: d.f32()?,
            time: d.f64()?,
        })
    }
}

/// 0x5B
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EphemerisStatus {
    pub prn: u8,
    pub collected_at: f32,
    pub health: u8,
    pub iode: u8,
    pub toe: f32,
    pub fit_interval: u8,
    pub accuracy: f32,
}

impl EphemerisStatus {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(EphemerisStatus {
            prn: d.u8()?,
            collected_at: d.f32()?,
            health: d.u8()?,
            iode: d.u8()?,
            toe: d.f32()?,
            fit_interval: d.u8()?,
            accuracy: d.f32()?,
        })
    }
}

/// 0x5C: angles in radians
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingStatus {
    pub prn: u8,
    /// Channel in bits 3..7, slot in bits 0..2
    pub slot_channel: u8,
    pub acquisition: u8,
    pub ephemeris: u8,
    pub level: f32,
    pub last_measurement: f32,
    pub elevation: f32,
    pub azimuth: f32,
    pub old_measurement: u8,
    pub integer_msec: u8,
    pub bad_data: u8,
    pub collecting: u8,
}

impl TrackingStatus {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(TrackingStatus {
            prn: d.u8()?,
            slot_channel: d.u8()?,
            acquisition: d.u8()?,
            ephemeris: d.u8()?,
            level: d.f32()?,
            last_measurement: d.f32()?,
            elevation: d.f32()?,
            azimuth: d.f32()?,
            old_measurement: d.u8()?,
            integer_msec: d.u8()?,
            bad_data: d.u8()?,
            collecting: d.u8()?,
        })
    }

    pub fn channel(&self) -> u8 {
        self.slot_channel >> 3
    }
}

/// 0x6D: satellites in the fix and their DOPs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteSelection {
    pub mode: u8,
    pub pdop: f32,
    pub hdop: f32,
    pub vdop: f32,
    pub tdop: f32,
    /// Negative entries are satellites excluded from the solution
    pub prns: Vec<i8>,
}

impl SatelliteSelection {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        let mode = d.u8()?;
        let pdop = d.f32()?;
        let hdop = d.f32()?;
        let vdop = d.f32()?;
        let tdop = d.f32()?;
        let count = (mode >> 4) as usize;
        let mut prns = Vec::with_capacity(count);
        for _ in 0..count {
            prns.push(d.i8()?);
        }
        Ok(SatelliteSelection { mode, pdop, hdop, vdop, tdop, prns })
    }

    /// 3 for a 2D fix, 4 for a 3D fix
    pub fn fix_dimension(&self) -> u8 {
        self.mode & 0x07
    }

    pub fn is_manual(&self) -> bool {
        self.mode & 0x08 != 0
    }
}

/// 0x70 report, and the payload of the matching set command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    pub pv_filter: u8,
    pub static_filter: u8,
    pub altitude_filter: u8,
    pub reserved: u8,
}

impl FilterConfig {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(FilterConfig {
            pv_filter: d.u8()?,
            static_filter: d.u8()?,
            altitude_filter: d.u8()?,
            reserved: d.u8()?,
        })
    }
}

/// 0xBB report (subcode 0), and the payload of the matching set command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub receiver_mode: ReceiverMode,
    pub dynamics: u8,
    /// Radians
    pub elevation_mask: f32,
    pub signal_mask: f32,
    pub pdop_mask: f32,
    pub pdop_switch: f32,
    pub foliage: u8,
}

impl ReceiverConfig {
    /// Length of the body after the subcode
    pub const BODY_LEN: usize = 39;
    /// Reserved bytes closing the body, after the 22 defined ones
    pub const RESERVED_TAIL: usize = Self::BODY_LEN - 22;

    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        d.skip(1)?;
        let receiver_mode = ReceiverMode::from_raw(d.u8()?);
        d.skip(1)?;
        let dynamics = d.u8()?;
        d.skip(1)?;
        let elevation_mask = d.f32()?;
        let signal_mask = d.f32()?;
        let pdop_mask = d.f32()?;
        let pdop_switch = d.f32()?;
        d.skip(1)?;
        let foliage = d.u8()?;
        d.skip(Self::RESERVED_TAIL)?;
        Ok(ReceiverConfig {
            receiver_mode,
            dynamics,
            elevation_mask,
            signal_mask,
            pdop_mask,
            pdop_switch,
            foliage,
        })
    }
}

/// 0xBC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    pub port: u8,
    pub input_baud: u8,
    pub output_baud: u8,
    pub data_bits: u8,
    pub parity: u8,
    pub stop_bits: u8,
    pub flow_control: u8,
    pub input_protocol: u8,
    pub output_protocol: u8,
    pub reserved: u8,
}

impl PortConfig {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(PortConfig {
            port: d.u8()?,
            input_baud: d.u8()?,
            output_baud: d.u8()?,
            data_bits: d.u8()?,
            parity: d.u8()?,
            stop_bits: d.u8()?,
            flow_control: d.u8()?,
            input_protocol: d.u8()?,
            output_protocol: d.u8()?,
            reserved: d.u8()?,
        })
    }
}

/// 8F-41
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManufacturingParams {
    pub serial_prefix: u16,
    pub serial: u32,
    pub build_year: u8,
    pub build_month: u8,
    pub build_day: u8,
    pub build_hour: u8,
    pub oscillator_offset: f32,
    pub test_code: u16,
}

impl ManufacturingParams {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(ManufacturingParams {
            serial_prefix: d.u16()?,
            serial: d.u32()?,
            build_year: d.u8()?,
            build_month: d.u8()?,
            build_day: d.u8()?,
            build_hour: d.u8()?,
            oscillator_offset: d.f32()?,
            test_code: d.u16()?,
        })
    }
}

/// 8F-42
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionParams {
    pub options_prefix: u8,
    pub extension: u8,
    pub case_prefix: u16,
    pub case_serial: u32,
    pub production_number: u32,
    pub reserved: u16,
    pub machine_id: u16,
    pub reserved2: u16,
}

impl ProductionParams {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(ProductionParams {
            options_prefix: d.u8()?,
            extension: d.u8()?,
            case_prefix: d.u16()?,
            case_serial: d.u32()?,
            production_number: d.u32()?,
            reserved: d.u16()?,
            machine_id: d.u16()?,
            reserved2: d.u16()?,
        })
    }
}

/// 8F-4A report, and the payload of the matching set command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PpsConfig {
    pub enabled: bool,
    /// 0 for positive, 1 for negative
    pub polarity: u8,
    /// Seconds
    pub cable_delay: f64,
    /// Bias uncertainty threshold in metres
    pub threshold: f32,
}

impl PpsConfig {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        let enabled = d.u8()? != 0;
        d.skip(1)?;
        let polarity = d.u8()?;
        let cable_delay = d.f64()?;
        let threshold = d.f32()?;
        Ok(PpsConfig { enabled, polarity, cable_delay, threshold })
    }
}

/// 8F-A0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DacReport {
    pub value: u32,
    pub voltage: f32,
    pub resolution: u8,
    pub format: u8,
    pub min_volts: f32,
    pub max_volts: f32,
}

impl DacReport {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(DacReport {
            value: d.u32()?,
            voltage: d.f32()?,
            resolution: d.u8()?,
            format: d.u8()?,
            min_volts: d.f32()?,
            max_volts: d.f32()?,
        })
    }
}

/// 8F-A2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimingMode {
    pub utc_time: bool,
    pub utc_pps: bool,
}

impl TimingMode {
    pub fn from_raw(raw: u8) -> Self {
        TimingMode {
            utc_time: raw & 0x01 != 0,
            utc_pps: raw & 0x02 != 0,
        }
    }

    pub fn raw(&self) -> u8 {
        (self.utc_time as u8) | ((self.utc_pps as u8) << 1)
    }
}

/// 8F-A5 report, and the payload of the matching set command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BroadcastMask {
    pub mask0: u16,
    pub mask1: u16,
}

impl BroadcastMask {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(BroadcastMask {
            mask0: d.u16()?,
            mask1: d.u16()?,
        })
    }
}

/// 8F-A7: individual satellite clock solutions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteSolutions {
    pub time_of_week: u32,
    /// Nanoseconds
    pub clock_bias: f32,
    /// PPB
    pub bias_rate: f32,
    /// (PRN, bias in nanoseconds)
    pub biases: Vec<(u8, f32)>,
}

impl SatelliteSolutions {
    pub fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeFault> {
        let format = d.u8()?;
        let time_of_week = d.u32()?;
        let mut biases = Vec::new();
        let (clock_bias, bias_rate) = match format {
            0 => {
                let bias = d.f32()?;
                let rate = d.f32()?;
                while !d.is_empty() {
                    let prn = d.u8()?;
                    biases.push((prn, d.f32()?));
                }
                (bias, rate)
            }
            1 => {
                // scaled integers: bias in 100 ps, rate in 1e-3 ppb
                let bias = d.i16()? as f32 * 0.1;
                let rate = d.i16()? as f32 * 0.001;
                while !d.is_empty() {
                    let prn = d.u8()?;
                    biases.push((prn, d.i16()? as f32 * 0.1));
                }
                (bias, rate)
            }
            other => return Err(DecodeFault::Unsupported(other)),
        };
        Ok(SatelliteSolutions { time_of_week, clock_bias, bias_rate, biases })
    }
}

/// 8F-A8 report, and the payload of the matching set command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DisciplineParams {
    /// Type 0: loop time constant in seconds and damping factor
    Loop { time_constant: f32, damping: f32 },
    /// Type 1: EFC gain in Hz/V and the control voltage range
    Oscillator { gain: f32, min_volts: f32, max_volts: f32 },
    /// Type 2: jam-sync threshold in ns and maximum frequency offset in ppb
    JamSync { threshold: f32, max_freq_offset: f32 },
    /// Type 3: initial DAC voltage
    InitialVoltage(f32),
    /// Type 4: allowed DAC voltage range
    DacRange { min_volts: f32, max_volts: f32 },
}

impl DisciplineParams {
    pub fn type_code(&self) -> u8 {
        match self {
            DisciplineParams::Loop { .. } => 0,
            DisciplineParams::Oscillator { .. } => 1,
            DisciplineParams::JamSync { .. } => 2,
            DisciplineParams::InitialVoltage(_) => 3,
            DisciplineParams::DacRange { .. } => 4,
        }
    }

    pub fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeFault> {
        let params = match d.u8()? {
            0 => DisciplineParams::Loop {
                time_constant: d.f32()?,
                damping: d.f32()?,
            },
            1 => DisciplineParams::Oscillator {
                gain: d.f32()?,
                min_volts: d.f32()?,
                max_volts: d.f32()?,
            },
            2 => DisciplineParams::JamSync {
                threshold: d.f32()?,
                max_freq_offset: d.f32()?,
            },
            3 => DisciplineParams::InitialVoltage(d.f32()?),
            4 => DisciplineParams::DacRange {
                min_volts: d.f32()?,
                max_volts: d.f32()?,
            },
            other => return Err(DecodeFault::Unsupported(other)),
        };
        Ok(params)
    }
}

/// 8F-A9 report, and the payload of the matching set command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyParams {
    pub enabled: bool,
    pub save_position: bool,
    /// Number of fixes to average
    pub length: u32,
}

impl SurveyParams {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        let enabled = d.u8()? != 0;
        let save_position = d.u8()? != 0;
        let length = d.u32()?;
        d.skip(4)?;
        Ok(SurveyParams { enabled, save_position, length })
    }
}

/// 8F-AB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryTiming {
    pub time_of_week: u32,
    pub week: u16,
    pub utc_offset: i16,
    pub flags: TimingFlags,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl PrimaryTiming {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        Ok(PrimaryTiming {
            time_of_week: d.u32()?,
            week: d.u16()?,
            utc_offset: d.i16()?,
            flags: TimingFlags::from_bits_retain(d.u8()?),
            seconds: d.u8()?,
            minutes: d.u8()?,
            hours: d.u8()?,
            day: d.u8()?,
            month: d.u8()?,
            year: d.u16()?,
        })
    }

    /// The reported instant as UTC, if the fields form a valid calendar time.
    ///
    /// When the receiver reports GPS time the UTC offset is subtracted.
    pub fn utc(&self) -> Option<DateTime<Utc>> {
        let date = NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?;
        let (h, m, s) = (self.hours as u32, self.minutes as u32, self.seconds as u32);
        let naive = if s == 60 {
            // leap second
            date.and_hms_milli_opt(h, m, 59, 1_000)?
        } else {
            date.and_hms_opt(h, m, s)?
        };
        let instant = Utc.from_utc_datetime(&naive);
        if self.flags.contains(TimingFlags::UTC_TIME) {
            Some(instant)
        } else {
            Some(instant - Duration::seconds(self.utc_offset as i64))
        }
    }
}

/// 8F-AC
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupplementalTiming {
    pub receiver_mode: ReceiverMode,
    pub discipline_mode: DisciplineMode,
    /// Self-survey progress in percent
    pub survey_progress: u8,
    /// Seconds in holdover
    pub holdover: u32,
    pub critical: CriticalAlarms,
    pub minor: MinorAlarms,
    pub decoding_status: u8,
    pub discipline_activity: u8,
    /// Nanoseconds
    pub pps_offset: f32,
    /// PPB
    pub oscillator_offset: f32,
    pub dac_value: u32,
    pub dac_voltage: f32,
    /// Degrees C
    pub temperature: f32,
    /// Radians
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub quantization_error: f32,
}

impl SupplementalTiming {
    pub fn decode(d: &mut FieldDecoder<'_>) -> FieldResult<Self> {
        let receiver_mode = ReceiverMode::from_raw(d.u8()?);
        let discipline_mode = DisciplineMode::from_raw(d.u8()?);
        let survey_progress = d.u8()?;
        let holdover = d.u32()?;
        let critical = CriticalAlarms::from_bits_retain(d.u16()?);
        let minor = MinorAlarms::from_bits_retain(d.u16()?);
        let decoding_status = d.u8()?;
        let discipline_activity = d.u8()?;
        d.skip(2)?;
        let pps_offset = d.f32()?;
        let oscillator_offset = d.f32()?;
        let dac_value = d.u32()?;
        let dac_voltage = d.f32()?;
        let temperature = d.f32()?;
        let latitude = d.f64()?;
        let longitude = d.f64()?;
        let altitude = d.f64()?;
        let quantization_error = d.f32()?;
        d.skip(4)?;
        Ok(SupplementalTiming {
            receiver_mode,
            discipline_mode,
            survey_progress,
            holdover,
            critical,
            minor,
            decoding_status,
            discipline_activity,
            pps_offset,
            oscillator_offset,
            dac_value,
            dac_voltage,
            temperature,
            latitude,
            longitude,
            altitude,
            quantization_error,
        })
    }
}

// Report constructors used by the dispatch table

pub(crate) fn unparsable(d: &mut FieldDecoder<'_>) -> Result<Report, DecodeFault> {
    let id = d.u8()?;
    // the echoed command bytes follow
    d.skip_rest();
    Ok(Report::Unparsable { id })
}

pub(crate) fn signal_levels(d: &mut FieldDecoder<'_>) -> Result<Report, DecodeFault> {
    Ok(Report::SignalLevels(decode_signal_levels(d)?))
}

pub(crate) fn dgps_mode(d: &mut FieldDecoder<'_>) -> Result<Report, DecodeFault> {
    Ok(Report::DgpsMode(d.u8()?))
}

pub(crate) fn receiver_config(d: &mut FieldDecoder<'_>) -> Result<Report, DecodeFault> {
    Ok(Report::ReceiverConfig(ReceiverConfig::decode(d)?))
}

pub(crate) fn ten_mhz_sense(d: &mut FieldDecoder<'_>) -> Result<Report, DecodeFault> {
    Ok(Report::TenMhzSense(d.u8()?))
}

pub(crate) fn timing_mode(d: &mut FieldDecoder<'_>) -> Result<Report, DecodeFault> {
    Ok(Report::TimingMode(TimingMode::from_raw(d.u8()?)))
}

pub(crate) fn survey_command(d: &mut FieldDecoder<'_>) -> Result<Report, DecodeFault> {
    Ok(Report::SurveyCommand(d.u8()?))
}
