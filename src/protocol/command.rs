//! Outgoing commands.
//!
//! Each command knows its id, sub-id and fields; framing and escaping are
//! left to [MessageWriter](super::encoder::MessageWriter).

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

use super::encoder::{encode_message, MessageWriter};
use super::report::{BroadcastMask, DisciplineParams, FilterConfig, IoOptions, PpsConfig, ReceiverConfig, SurveyParams, TimingMode};
use super::{ID_TIMING_COMMAND, ID_VERSION};
use crate::core::ByteOrder;

/// Selector for a per-satellite request; 0 means all satellites
pub type Prn = u8;

/// Commands the driver can send to the receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    RequestSoftwareVersion,
    RequestFirmwareVersion,
    RequestHardwareInfo,
    RequestGpsTime,
    RequestSatelliteSelection,
    RequestHealth,
    RequestSignalLevels,
    RequestLastFix,
    RequestIoOptions,
    SetIoOptions(IoOptions),
    RequestRawMeasurement(Prn),
    RequestEphemerisStatus(Prn),
    RequestTrackingStatus(Prn),
    RequestSatelliteAttributes,
    RequestFilterConfig,
    SetFilterConfig(FilterConfig),
    RequestReceiverConfig,
    SetReceiverConfig(ReceiverConfig),
    RequestPortConfig,
    RequestDacValue,
    /// Sets the oscillator control voltage directly
    SetDacVoltage(f32),
    RequestTimingMode,
    SetTimingMode(TimingMode),
    /// Manual holdover: true to enter, false to leave
    Holdover(bool),
    RequestBroadcastMask,
    SetBroadcastMask(BroadcastMask),
    StartSelfSurvey,
    SaveSurveyPosition,
    /// Disciplining parameters of one type (0..=4)
    RequestDisciplineParams(u8),
    SetDisciplineParams(DisciplineParams),
    RequestSurveyParams,
    SetSurveyParams(SurveyParams),
    RequestPrimaryTiming,
    RequestSupplementalTiming,
    RequestPpsCharacteristics,
    SetPpsCharacteristics(PpsConfig),
    SaveConfig,
    RevertConfig,
    RequestManufacturingParams,
    RequestProductionParams,
    WarmReset,
    ColdReset,
    FactoryReset,
}

impl Command {
    /// Stops a survey in progress and keeps its parameters
    pub fn stop_survey(params: SurveyParams) -> Self {
        Command::SetSurveyParams(SurveyParams { enabled: false, ..params })
    }

    /// Wire id of the command message
    pub fn id(&self) -> u8 {
        use Command::*;
        match self {
            RequestSoftwareVersion => 0x1F,
            RequestFirmwareVersion | RequestHardwareInfo => ID_VERSION,
            RequestGpsTime => 0x21,
            RequestSatelliteSelection => 0x24,
            WarmReset => 0x25,
            RequestHealth => 0x26,
            RequestSignalLevels => 0x27,
            RequestLastFix => 0x37,
            RequestIoOptions | SetIoOptions(_) => 0x35,
            RequestRawMeasurement(_) => 0x3A,
            RequestEphemerisStatus(_) => 0x3B,
            RequestTrackingStatus(_) => 0x3C,
            RequestSatelliteAttributes => 0x39,
            RequestFilterConfig | SetFilterConfig(_) => 0x70,
            RequestReceiverConfig | SetReceiverConfig(_) => 0xBB,
            RequestPortConfig => 0xBC,
            ColdReset | FactoryReset => 0x1E,
            _ => ID_TIMING_COMMAND,
        }
    }

    /// Encodes the framed command into `dst`
    pub fn encode(&self, order: ByteOrder, dst: &mut BytesMut) {
        encode_message(dst, order, self.id(), |w| self.write_fields(w));
    }

    /// Encodes the framed command into a fresh buffer
    pub fn to_bytes(&self, order: ByteOrder) -> BytesMut {
        let mut dst = BytesMut::new();
        self.encode(order, &mut dst);
        dst
    }

    fn write_fields(&self, w: &mut MessageWriter<'_>) {
        use Command::*;
        match self {
            RequestSoftwareVersion
            | RequestGpsTime
            | RequestSatelliteSelection
            | WarmReset
            | RequestHealth
            | RequestSignalLevels
            | RequestLastFix
            | RequestIoOptions
            | RequestFilterConfig => {}
            RequestFirmwareVersion => {
                w.byte(0x01);
            }
            RequestHardwareInfo => {
                w.byte(0x03);
            }
            ColdReset => {
                w.byte(0x4B);
            }
            FactoryReset => {
                w.byte(0x46);
            }
            SetIoOptions(io) => {
                w.byte(io.position).byte(io.velocity).byte(io.timing).byte(io.auxiliary);
            }
            RequestRawMeasurement(prn) | RequestEphemerisStatus(prn) | RequestTrackingStatus(prn) => {
                w.byte(*prn);
            }
            RequestSatelliteAttributes => {
                // operation 3: report enable flags for all satellites
                w.byte(0x03).byte(0x00);
            }
            SetFilterConfig(f) => {
                w.byte(f.pv_filter).byte(f.static_filter).byte(f.altitude_filter).byte(f.reserved);
            }
            RequestReceiverConfig => {
                w.byte(0x00);
            }
            SetReceiverConfig(c) => {
                w.byte(0x00)
                    .byte(c.receiver_mode.raw())
                    .byte(0xFF)
                    .byte(c.dynamics)
                    .byte(0xFF)
                    .single(c.elevation_mask)
                    .single(c.signal_mask)
                    .single(c.pdop_mask)
                    .single(c.pdop_switch)
                    .byte(0xFF)
                    .byte(c.foliage)
                    .bytes(&[0xFF; ReceiverConfig::RESERVED_TAIL]);
            }
            RequestPortConfig => {
                w.byte(0xFF);
            }
            RequestDacValue => {
                w.byte(0xA0);
            }
            SetDacVoltage(volts) => {
                w.byte(0xA0).byte(0x00).single(*volts);
            }
            RequestTimingMode => {
                w.byte(0xA2);
            }
            SetTimingMode(mode) => {
                w.byte(0xA2).byte(mode.raw());
            }
            Holdover(enter) => {
                w.byte(0xA3).byte(if *enter { 0x00 } else { 0x01 });
            }
            RequestBroadcastMask => {
                w.byte(0xA5);
            }
            SetBroadcastMask(mask) => {
                w.byte(0xA5).word(mask.mask0).word(mask.mask1);
            }
            StartSelfSurvey => {
                w.byte(0xA6).byte(0x00);
            }
            SaveSurveyPosition => {
                w.byte(0xA6).byte(0x01);
            }
            RequestDisciplineParams(kind) => {
                w.byte(0xA8).byte(*kind);
            }
            SetDisciplineParams(params) => {
                w.byte(0xA8).byte(params.type_code());
                match *params {
                    DisciplineParams::Loop { time_constant, damping } => {
                        w.single(time_constant).single(damping);
                    }
                    DisciplineParams::Oscillator { gain, min_volts, max_volts } => {
                        w.single(gain).single(min_volts).single(max_volts);
                    }
                    DisciplineParams::JamSync { threshold, max_freq_offset } => {
                        w.single(threshold).single(max_freq_offset);
                    }
                    DisciplineParams::InitialVoltage(volts) => {
                        w.single(volts);
                    }
                    DisciplineParams::DacRange { min_volts, max_volts } => {
                        w.single(min_volts).single(max_volts);
                    }
                }
            }
            RequestSurveyParams => {
                w.byte(0xA9);
            }
            SetSurveyParams(p) => {
                w.byte(0xA9)
                    .byte(p.enabled as u8)
                    .byte(p.save_position as u8)
                    .dword(p.length)
                    .dword(0);
            }
            RequestPrimaryTiming => {
                w.byte(0xAB).byte(0x00);
            }
            RequestSupplementalTiming => {
                w.byte(0xAC).byte(0x00);
            }
            RequestPpsCharacteristics => {
                w.byte(0x4A);
            }
            SetPpsCharacteristics(pps) => {
                w.byte(0x4A)
                    .byte(pps.enabled as u8)
                    .byte(0x00)
                    .byte(pps.polarity)
                    .double(pps.cable_delay)
                    .single(pps.threshold);
            }
            SaveConfig => {
                w.byte(0x4C).byte(0xFF);
            }
            RevertConfig => {
                w.byte(0x45).byte(0xFF);
            }
            RequestManufacturingParams => {
                w.byte(0x41);
            }
            RequestProductionParams => {
                w.byte(0x42);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DriverConfig, DLE, ETX};
    use crate::protocol::dispatch::dispatch;
    use crate::protocol::report::Report;
    use crate::protocol::resync::{Deframer, FrameEvent, Packet};
    use crate::receiver::status::ReceiverMode;

    fn packet(cmd: &Command, order: ByteOrder) -> Packet {
        let config = DriverConfig {
            resync_on_start: false,
            byte_order: order,
            ..DriverConfig::default()
        };
        let mut deframer = Deframer::new(&config);
        let events: Vec<_> = cmd.to_bytes(order).iter().filter_map(|&b| deframer.push(b)).collect();
        match &events[..] {
            [FrameEvent::Packet(p)] => p.clone(),
            other => panic!("expected one packet, got {:?}", other),
        }
    }

    #[test]
    fn test_simple_requests() {
        assert_eq!(&Command::RequestSoftwareVersion.to_bytes(ByteOrder::Big)[..], &[DLE, 0x1F, DLE, ETX]);
        assert_eq!(
            &Command::RequestFirmwareVersion.to_bytes(ByteOrder::Big)[..],
            &[DLE, 0x1C, 0x01, DLE, ETX]
        );
        assert_eq!(
            &Command::RequestSurveyParams.to_bytes(ByteOrder::Big)[..],
            &[DLE, 0x8E, 0xA9, DLE, ETX]
        );
        assert_eq!(&Command::ColdReset.to_bytes(ByteOrder::Big)[..], &[DLE, 0x1E, 0x4B, DLE, ETX]);
        assert_eq!(&Command::SaveConfig.to_bytes(ByteOrder::Big)[..], &[DLE, 0x8E, 0x4C, 0xFF, DLE, ETX]);
    }

    #[test]
    fn test_tracking_request_for_prn_sixteen_is_escaped() {
        assert_eq!(
            &Command::RequestTrackingStatus(0x10).to_bytes(ByteOrder::Big)[..],
            &[DLE, 0x3C, DLE, DLE, DLE, ETX]
        );
    }

    #[test]
    fn test_set_survey_params_layout() {
        let cmd = Command::SetSurveyParams(SurveyParams { enabled: true, save_position: true, length: 1000 });
        let p = packet(&cmd, ByteOrder::Big);
        assert_eq!(p.id, 0x8E);
        assert_eq!(&p.payload[..], &[0xA9, 1, 1, 0x00, 0x00, 0x03, 0xE8, 0, 0, 0, 0]);
    }

    #[test]
    fn test_set_payloads_mirror_report_layouts() {
        // a set command carries the same body as the report it configures,
        // so re-tagging it as a report must decode to the same value
        let pps = PpsConfig { enabled: true, polarity: 1, cable_delay: 1.6e-8, threshold: 1000.0 };
        let config = ReceiverConfig {
            receiver_mode: ReceiverMode::OverdeterminedClock,
            dynamics: 4,
            elevation_mask: 0.174_532_93,
            signal_mask: 4.0,
            pdop_mask: 12.0,
            pdop_switch: 8.0,
            foliage: 1,
        };
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let p = packet(&Command::SetPpsCharacteristics(pps), order);
            assert_eq!(
                dispatch(&Packet::new(0x8F, p.payload), order).unwrap(),
                Report::PpsCharacteristics(pps)
            );

            let p = packet(&Command::SetReceiverConfig(config), order);
            assert_eq!(p.payload.len(), 40);
            assert_eq!(dispatch(&Packet::new(0xBB, p.payload), order).unwrap(), Report::ReceiverConfig(config));

            let params = DisciplineParams::JamSync { threshold: 300.0, max_freq_offset: 50.0 };
            let p = packet(&Command::SetDisciplineParams(params), order);
            assert_eq!(dispatch(&Packet::new(0x8F, p.payload), order).unwrap(), Report::DisciplineParams(params));
        }
    }

    #[test]
    fn test_stop_survey_keeps_length() {
        let params = SurveyParams { enabled: true, save_position: true, length: 2000 };
        match Command::stop_survey(params) {
            Command::SetSurveyParams(p) => {
                assert!(!p.enabled);
                assert_eq!(p.length, 2000);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_holdover_selector() {
        assert_eq!(&Command::Holdover(true).to_bytes(ByteOrder::Big)[..], &[DLE, 0x8E, 0xA3, 0x00, DLE, ETX]);
        assert_eq!(&Command::Holdover(false).to_bytes(ByteOrder::Big)[..], &[DLE, 0x8E, 0xA3, 0x01, DLE, ETX]);
    }
}
