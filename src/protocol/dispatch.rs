//! Message dispatcher: maps a message id, and for container messages the
//! sub-id, to the parser for its report.

use std::fmt;

use tracing::{debug, trace};

use super::fields::{DecodeFault, FieldDecoder};
use super::report::{self, *};
use super::resync::Packet;
use super::{is_container, ID_TIMING_REPORT, ID_VERSION};
use crate::core::{ByteOrder, Diagnostic, FaultBits, FaultKind};

/// Dispatch table key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey {
    pub id: u8,
    pub sub_id: Option<u8>,
}

impl MessageKey {
    pub fn new(id: u8, sub_id: Option<u8>) -> Self {
        MessageKey { id, sub_id }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_id {
            Some(sub) => write!(f, "{:02X}-{:02X}", self.id, sub),
            None => write!(f, "{:02X}", self.id),
        }
    }
}

/// Parser for one report layout. The decoder is positioned after the sub-id.
pub type Handler = fn(&mut FieldDecoder<'_>) -> Result<Report, DecodeFault>;

/// Looks up the parser for `key`
pub fn handler(key: MessageKey) -> Option<Handler> {
    let handler: Handler = match (key.id, key.sub_id) {
        (0x13, None) => report::unparsable,
        (ID_VERSION, Some(0x81)) => |d| Ok(Report::FirmwareVersion(FirmwareVersion::decode(d)?)),
        (ID_VERSION, Some(0x83)) => |d| Ok(Report::HardwareInfo(HardwareInfo::decode(d)?)),
        (0x41, None) => |d| Ok(Report::GpsTime(GpsTime::decode(d)?)),
        (0x42, None) => |d| Ok(Report::PositionXyz(PositionXyz::decode_single(d)?)),
        (0x43, None) => |d| Ok(Report::VelocityXyz(VelocityXyz::decode(d)?)),
        (0x45, None) => |d| Ok(Report::SoftwareVersion(SoftwareVersion::decode(d)?)),
        (0x46, None) => |d| Ok(Report::Health(Health::decode(d)?)),
        (0x47, None) => report::signal_levels,
        (0x4A, None) => |d| Ok(Report::PositionLla(PositionLla::decode_single(d)?)),
        (0x4B, None) => |d| Ok(Report::MachineStatus(MachineStatus::decode(d)?)),
        (0x55, None) => |d| Ok(Report::IoOptions(IoOptions::decode(d)?)),
        (0x56, None) => |d| Ok(Report::VelocityEnu(VelocityEnu::decode(d)?)),
        (0x57, None) => |d| Ok(Report::LastFix(LastFix::decode(d)?)),
        (0x59, None) => |d| Ok(Report::SatelliteAttributes(SatelliteAttributes::decode(d)?)),
        (0x5A, None) => |d| Ok(Report::RawMeasurement(RawMeasurement::decode(d)?)),
        (0x5B, None) => |d| Ok(Report::EphemerisStatus(EphemerisStatus::decode(d)?)),
        (0x5C, None) => |d| Ok(Report::TrackingStatus(TrackingStatus::decode(d)?)),
        (0x6D, None) => |d| Ok(Report::SatelliteSelection(SatelliteSelection::decode(d)?)),
        (0x70, None) => |d| Ok(Report::FilterConfig(FilterConfig::decode(d)?)),
        (0x82, None) => report::dgps_mode,
        (0x83, None) => |d| Ok(Report::PositionXyz(PositionXyz::decode_double(d)?)),
        (0x84, None) => |d| Ok(Report::PositionLla(PositionLla::decode_double(d)?)),
        (0xBB, None) => report::receiver_config,
        (0xBC, None) => |d| Ok(Report::PortConfig(PortConfig::decode(d)?)),
        (ID_TIMING_REPORT, Some(sub)) => match sub {
            0x41 => |d| Ok(Report::ManufacturingParams(ManufacturingParams::decode(d)?)),
            0x42 => |d| Ok(Report::ProductionParams(ProductionParams::decode(d)?)),
            0x4A => |d| Ok(Report::PpsCharacteristics(PpsConfig::decode(d)?)),
            0xA0 => |d| Ok(Report::DacValue(DacReport::decode(d)?)),
            0xA1 => report::ten_mhz_sense,
            0xA2 => report::timing_mode,
            0xA5 => |d| Ok(Report::BroadcastMask(BroadcastMask::decode(d)?)),
            0xA6 => report::survey_command,
            0xA7 => |d| Ok(Report::SatelliteSolutions(SatelliteSolutions::decode(d)?)),
            0xA8 => |d| Ok(Report::DisciplineParams(DisciplineParams::decode(d)?)),
            0xA9 => |d| Ok(Report::SurveyParams(SurveyParams::decode(d)?)),
            0xAB => |d| Ok(Report::PrimaryTiming(PrimaryTiming::decode(d)?)),
            0xAC => |d| Ok(Report::SupplementalTiming(SupplementalTiming::decode(d)?)),
            _ => return None,
        },
        _ => return None,
    };
    Some(handler)
}

/// Decodes one packet into its report.
///
/// The whole payload must be consumed: a field running off the end, or bytes
/// left after the last field, fail the packet and nothing from it is
/// returned. Ids outside the table fail as `UnknownMessage`.
pub fn dispatch(packet: &Packet, order: ByteOrder) -> Result<Report, Diagnostic> {
    let mut d = FieldDecoder::new(&packet.payload, order);
    let sub_id = if is_container(packet.id) {
        // a container without a selector cannot name a layout
        d.u8().ok()
    } else {
        None
    };
    let key = MessageKey::new(packet.id, sub_id);

    let Some(parse) = handler(key) else {
        debug!(%key, len = packet.payload.len(), "unknown message drained");
        return Err(Diagnostic::new(
            Some(packet.id),
            sub_id,
            FaultKind::UnknownMessage,
            FaultBits::empty(),
        ));
    };

    match parse(&mut d).and_then(|report| d.finish().map(|_| report)) {
        Ok(report) => {
            trace!(%key, "decoded");
            Ok(report)
        }
        Err(fault) => {
            let bits = fault.bits() | d.faults();
            debug!(%key, bits = bits.bits(), %fault, "decode fault, message dropped");
            Err(Diagnostic::new(Some(packet.id), sub_id, fault.kind(), bits))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Width;

    fn primary_timing_payload(day: u8) -> Vec<u8> {
        let mut payload = vec![0xAB, 0x00, 0x00, 0x00, 0x10, 0x08, 0x7C, 0x00, 0x12, 0x03];
        payload.extend_from_slice(&[0, 0, 0, day, 1, 0x07, 0xE5]);
        payload
    }

    #[test]
    fn test_dispatch_container_sub_id() {
        let packet = Packet::new(0x8F, primary_timing_payload(1));
        match dispatch(&packet, ByteOrder::Big) {
            Ok(Report::PrimaryTiming(t)) => {
                assert_eq!(t.time_of_week, 0x10);
                assert_eq!(t.year, 2021);
            }
            other => panic!("expected primary timing, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_ids() {
        let diag = dispatch(&Packet::new(0x99, vec![1, 2, 3]), ByteOrder::Big).unwrap_err();
        assert_eq!(diag.kind, FaultKind::UnknownMessage);
        assert_eq!(diag.id, Some(0x99));
        assert!(!diag.kind.is_bad_packet());

        let diag = dispatch(&Packet::new(0x8F, vec![0xEE]), ByteOrder::Big).unwrap_err();
        assert_eq!(diag.kind, FaultKind::UnknownMessage);
        assert_eq!(diag.sub_id, Some(0xEE));
    }

    #[test]
    fn test_truncated_container_reports_width() {
        let mut payload = primary_timing_payload(1);
        payload.truncate(payload.len() - 1);
        let diag = dispatch(&Packet::new(0x8F, payload), ByteOrder::Big).unwrap_err();
        assert_eq!(diag.kind, FaultKind::FieldDecode(Width::Word));
        assert_eq!(diag.bits, FaultBits::WORD);
        assert_eq!(diag.sub_id, Some(0xAB));
    }

    #[test]
    fn test_extra_data_is_framing_fault() {
        let diag = dispatch(&Packet::new(0x82, vec![1, 2]), ByteOrder::Big).unwrap_err();
        assert_eq!(diag.kind, FaultKind::Framing);
        assert_eq!(diag.bits, FaultBits::EXTRA_DATA);
    }

    #[test]
    fn test_unsupported_discipline_type() {
        let diag = dispatch(&Packet::new(0x8F, vec![0xA8, 0x07]), ByteOrder::Big).unwrap_err();
        assert_eq!(diag.kind, FaultKind::UnknownMessage);
        assert_eq!(diag.bits, FaultBits::UNSUPPORTED);
    }

    #[test]
    fn test_unparsable_echo_ignores_tail() {
        let report = dispatch(&Packet::new(0x13, vec![0x8E, 0xA9, 0x01]), ByteOrder::Big).unwrap();
        assert_eq!(report, Report::Unparsable { id: 0x8E });
    }

    #[test]
    fn test_key_display() {
        assert_eq!(MessageKey::new(0x8F, Some(0xAC)).to_string(), "8F-AC");
        assert_eq!(MessageKey::new(0x47, None).to_string(), "47");
    }
}
