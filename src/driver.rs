//! Driver: bytes in, receiver state and outgoing requests out.
//!
//! Runs to completion per byte. Everything the driver mutates (state,
//! counters, sequencer, outbox) is owned here, so several drivers can run
//! side by side.

use std::collections::VecDeque;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::{Diagnostic, Dialect, DriverConfig, FaultBits, FaultKind, Result};
use crate::protocol::command::Command;
use crate::protocol::dispatch::{dispatch, MessageKey};
use crate::protocol::framer::{ByteSink, ByteSource};
use crate::protocol::resync::{Deframer, FrameEvent, Packet};
use crate::protocol::sequencer::{RequestSequencer, Step};
use crate::receiver::ReceiverState;

/// Running fault counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Messages that closed cleanly
    pub messages: u64,
    /// Framing, decode and sync faults
    pub bad_packets: u64,
    pub unknown_messages: u64,
    /// Start markers recovered by the repair heuristic
    pub repaired: u64,
    pub resync_timeouts: u64,
    /// Clean messages whose values failed a range check
    pub rejected: u64,
    /// Every fault bit seen since startup
    pub bits_seen: FaultBits,
    pub last_fault: Option<Diagnostic>,
}

/// Something an observer may want to know about
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A report was committed to the receiver state
    Updated(MessageKey),
    /// A message was dropped, drained or rejected
    Fault(Diagnostic),
}

pub struct Driver {
    config: DriverConfig,
    deframer: Deframer,
    state: ReceiverState,
    sequencer: RequestSequencer,
    diagnostics: Diagnostics,
    outbox: VecDeque<Command>,
    reconnect: Option<Dialect>,
    anything_received: bool,
    timing_since_idle: bool,
}

impl Driver {
    /// Creates a driver with empty receiver state
    pub fn new(config: DriverConfig) -> Result<Self> {
        Self::with_state(config, ReceiverState::new())
    }

    /// Creates a driver that continues from previously known state
    pub fn with_state(config: DriverConfig, state: ReceiverState) -> Result<Self> {
        config.validate()?;
        Ok(Driver {
            deframer: Deframer::new(&config),
            sequencer: RequestSequencer::new(config.dialect),
            config,
            state,
            diagnostics: Diagnostics::default(),
            outbox: VecDeque::new(),
            reconnect: None,
            anything_received: false,
            timing_since_idle: false,
        })
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn state(&self) -> &ReceiverState {
        &self.state
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn sequencer(&self) -> &RequestSequencer {
        &self.sequencer
    }

    /// Serial dialect the driver currently expects
    pub fn dialect(&self) -> Dialect {
        self.sequencer.dialect()
    }

    /// Feeds one received byte
    pub fn push_byte(&mut self, byte: u8) -> Option<Notification> {
        let event = self.deframer.push(byte)?;
        self.handle_event(event)
    }

    /// Handles one event from the deframer
    pub fn handle_event(&mut self, event: FrameEvent) -> Option<Notification> {
        match event {
            FrameEvent::Packet(packet) => Some(self.handle_packet(&packet)),
            FrameEvent::Fault(diag) => {
                self.record(diag);
                Some(Notification::Fault(diag))
            }
            FrameEvent::Repaired { id } => {
                self.diagnostics.repaired += 1;
                trace!(id, "start marker repaired");
                None
            }
        }
    }

    fn handle_packet(&mut self, packet: &Packet) -> Notification {
        self.anything_received = true;
        self.diagnostics.messages += 1;

        let key = MessageKey::new(packet.id, packet.sub_id());
        let report = match dispatch(packet, self.config.byte_order) {
            Ok(report) => report,
            Err(diag) => {
                self.record(diag);
                return Notification::Fault(diag);
            }
        };

        match self.state.apply(report, &self.config.bounds) {
            Ok(applied) => {
                if applied.survey_readback {
                    self.sequencer.push_follow_up(Command::RequestSurveyParams);
                }
                if applied.primary_timing {
                    self.timing_since_idle = true;
                    self.advance();
                }
                Notification::Updated(key)
            }
            Err(rejected) => {
                debug!(%key, %rejected, "report rejected");
                let diag = Diagnostic::new(Some(key.id), key.sub_id, FaultKind::Rejected, FaultBits::REJECTED);
                self.record(diag);
                Notification::Fault(diag)
            }
        }
    }

    fn record(&mut self, diag: Diagnostic) {
        let counters = &mut self.diagnostics;
        if diag.kind.is_bad_packet() {
            counters.bad_packets += 1;
        }
        match diag.kind {
            FaultKind::UnknownMessage => counters.unknown_messages += 1,
            FaultKind::ResyncTimeout => counters.resync_timeouts += 1,
            FaultKind::Rejected => counters.rejected += 1,
            _ => {}
        }
        counters.bits_seen |= diag.bits;
        counters.last_fault = Some(diag);
    }

    fn advance(&mut self) {
        match self.sequencer.next_request(self.anything_received) {
            Step::Send(command) => self.outbox.push_back(command),
            Step::Reconnect(dialect) => {
                warn!(?dialect, "requesting link reconnect");
                self.reconnect = Some(dialect);
            }
        }
    }

    /// Idle tick from the event loop. Advances the request cycle when no
    /// primary timing arrived since the previous tick.
    pub fn on_idle(&mut self) {
        if !self.timing_since_idle {
            self.advance();
        }
        self.timing_since_idle = false;
    }

    /// Takes the pending reconnect signal, if any
    pub fn take_reconnect(&mut self) -> Option<Dialect> {
        self.reconnect.take()
    }

    /// Drops any partial message after the transport was reopened
    pub fn link_reset(&mut self) {
        self.deframer.reset();
    }

    /// Queues a command for the receiver
    pub fn send(&mut self, command: Command) {
        self.outbox.push_back(command);
    }

    /// Takes every queued command, oldest first
    pub fn drain_outgoing(&mut self) -> impl Iterator<Item = Command> + '_ {
        self.outbox.drain(..)
    }

    /// Encodes every queued command into `dst`
    pub fn encode_outgoing(&mut self, dst: &mut BytesMut) {
        let order = self.config.byte_order;
        for command in self.outbox.drain(..) {
            command.encode(order, dst);
        }
    }

    /// Reads until the source has no more data, then writes queued commands.
    pub fn poll<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<Vec<Notification>>
    where
        S: ByteSource + ?Sized,
        K: ByteSink + ?Sized,
    {
        let mut notifications = Vec::new();
        while let Some(byte) = source.read_byte()? {
            notifications.extend(self.push_byte(byte));
        }

        if !self.outbox.is_empty() {
            let mut out = BytesMut::new();
            self.encode_outgoing(&mut out);
            sink.write_all(&out)?;
            sink.flush()?;
        }
        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ByteOrder, Width, DLE, ETX};
    use crate::protocol::encoder::encode_message;
    use crate::protocol::framer::{IoSink, IoSource};
    use crate::receiver::TimingFlags;
    use std::collections::VecDeque;

    fn driver() -> Driver {
        Driver::new(DriverConfig::default()).unwrap()
    }

    fn feed(driver: &mut Driver, bytes: &[u8]) -> Vec<Notification> {
        bytes.iter().filter_map(|&b| driver.push_byte(b)).collect()
    }

    fn primary_timing(day: u8) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_message(&mut buf, ByteOrder::Big, 0x8F, |w| {
            w.byte(0xAB)
                .dword(432_000)
                .word(2172)
                .sword(18)
                .byte(0x03)
                .byte(0)
                .byte(30)
                .byte(17)
                .byte(day)
                .byte(8)
                .word(2021);
        });
        buf.to_vec()
    }

    #[test]
    fn test_signal_level_broadcast() {
        let mut d = driver();
        feed(&mut d, &[DLE, ETX]);
        feed(&mut d, &[DLE, 0x47, 0x02, 0x03]);
        feed(&mut d, &38.0f32.to_be_bytes());
        feed(&mut d, &[0x07]);
        feed(&mut d, &41.0f32.to_be_bytes());
        feed(&mut d, &[DLE, ETX]);

        let mut levels = BytesMut::new();
        encode_message(&mut levels, ByteOrder::Big, 0x47, |w| {
            w.byte(2).byte(1).single(45.5).byte(5).single(39.25);
        });
        let notes = feed(&mut d, &levels);
        assert_eq!(notes, vec![Notification::Updated(MessageKey::new(0x47, None))]);

        let sats = &d.state().satellites;
        assert_eq!(sats.get(1).and_then(|r| r.signal_level), Some(45.5));
        assert_eq!(sats.get(5).and_then(|r| r.signal_level), Some(39.25));
        for (prn, record) in sats.iter() {
            assert_eq!(record.in_use(), prn == 1 || prn == 5, "prn {}", prn);
        }
    }

    #[test]
    fn test_out_of_range_day_rejected() {
        let mut d = driver();
        feed(&mut d, &[DLE, ETX]);
        feed(&mut d, &primary_timing(21));
        let before = d.state().clone();
        let queued = d.drain_outgoing().count();
        assert_eq!(queued, 1);
        let index = d.sequencer().index();

        let notes = feed(&mut d, &primary_timing(32));
        match &notes[..] {
            [Notification::Fault(diag)] => {
                assert_eq!(diag.kind, FaultKind::Rejected);
                assert_eq!(diag.sub_id, Some(0xAB));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(d.state(), &before);
        assert!(d.state().have_time());
        assert_eq!(d.diagnostics().rejected, 1);
        assert_eq!(d.diagnostics().bad_packets, 0);
        assert_eq!(d.sequencer().index(), index);
        assert_eq!(d.drain_outgoing().count(), 0);
    }

    #[test]
    fn test_survey_params_read_back() {
        let mut d = driver();
        feed(&mut d, &[DLE, ETX]);
        feed(
            &mut d,
            &[DLE, 0x8F, 0xA9, 0x01, 0x01, 0x00, 0x00, 0x03, 0xE8, 0x00, 0x00, 0x00, 0x00, DLE, ETX],
        );
        let survey = d.state().survey.params.unwrap();
        assert!(survey.enabled && survey.save_position);
        assert_eq!(survey.length, 1000);

        // the next request slot goes to the survey parameters
        feed(&mut d, &primary_timing(21));
        let sent: Vec<Command> = d.drain_outgoing().collect();
        assert_eq!(sent, vec![Command::RequestSurveyParams]);

        feed(&mut d, &primary_timing(21));
        let sent: Vec<Command> = d.drain_outgoing().collect();
        assert_eq!(sent, vec![Command::RequestSoftwareVersion]);
    }

    #[test]
    fn test_truncated_message_commits_nothing() {
        let mut d = driver();
        feed(&mut d, &[DLE, ETX]);
        feed(&mut d, &primary_timing(21));
        let snapshot = d.state().clone();

        // drop the final word (year) of a different timing report
        let mut truncated = primary_timing(22);
        let end = truncated.len() - 2;
        truncated.drain(end - 2..end);
        let notes = feed(&mut d, &truncated);
        match &notes[..] {
            [Notification::Fault(diag)] => assert_eq!(diag.kind, FaultKind::FieldDecode(Width::Word)),
            other => panic!("expected decode fault, got {:?}", other),
        }
        assert_eq!(d.state(), &snapshot);
        assert_eq!(d.diagnostics().bad_packets, 1);
        assert_eq!(d.diagnostics().bits_seen, FaultBits::WORD);
    }

    #[test]
    fn test_dropped_escape_before_signal_levels_repaired() {
        let mut d = driver();
        feed(&mut d, &[DLE, ETX]);
        let mut levels = BytesMut::new();
        encode_message(&mut levels, ByteOrder::Big, 0x47, |w| {
            w.byte(1).byte(9).single(44.0);
        });
        // lose the escape in front of the id
        feed(&mut d, &levels[1..]);
        assert_eq!(d.diagnostics().repaired, 1);
        assert_eq!(d.diagnostics().bad_packets, 0);
        assert_eq!(d.state().satellites.get(9).and_then(|r| r.signal_level), Some(44.0));

        // the same loss in front of a non-listed id is discarded
        let mut health = BytesMut::new();
        encode_message(&mut health, ByteOrder::Big, 0x46, |w| {
            w.byte(0).byte(0);
        });
        feed(&mut d, &health[1..]);
        assert!(d.state().health.is_none());
        assert_eq!(d.diagnostics().bad_packets, 1);
        assert_eq!(
            d.diagnostics().last_fault.map(|f| f.bits),
            Some(FaultBits::MISSING_START)
        );
    }

    #[test]
    fn test_resync_timeout_counted() {
        let mut d = driver();
        feed(&mut d, &[DLE, ETX, 0x00]);
        feed(&mut d, &[0x55; 2000]);
        assert_eq!(d.diagnostics().resync_timeouts, 1);
        assert_eq!(d.diagnostics().bad_packets, 2);

        // a later message decodes normally
        feed(&mut d, &[DLE, ETX]);
        feed(&mut d, &primary_timing(21));
        assert!(d.state().have_time());
    }

    #[test]
    fn test_unknown_message_not_bad_packet() {
        let mut d = driver();
        feed(&mut d, &[DLE, ETX, DLE, 0x99, 0x01, DLE, DLE, DLE, ETX]);
        assert_eq!(d.diagnostics().unknown_messages, 1);
        assert_eq!(d.diagnostics().bad_packets, 0);
        assert_eq!(d.diagnostics().messages, 1);
    }

    #[test]
    fn test_silent_link_requests_reconnect() {
        let mut d = driver();
        for _ in 0..23 {
            d.on_idle();
            assert_eq!(d.take_reconnect(), None);
        }
        assert_eq!(d.drain_outgoing().count(), 23);
        d.on_idle();
        assert_eq!(d.take_reconnect(), Some(Dialect::None));
        assert_eq!(d.take_reconnect(), None);
        assert_eq!(d.dialect(), Dialect::None);
    }

    #[test]
    fn test_idle_tick_skipped_after_timing() {
        let mut d = driver();
        feed(&mut d, &[DLE, ETX]);
        feed(&mut d, &primary_timing(21));
        d.on_idle();
        assert_eq!(d.drain_outgoing().count(), 1);
        d.on_idle();
        assert_eq!(d.drain_outgoing().count(), 1);
    }

    #[test]
    fn test_poll_reads_and_writes() {
        let mut d = driver();
        let mut source: VecDeque<u8> = VecDeque::from(vec![DLE, ETX]);
        source.extend(primary_timing(21));
        let mut sink: Vec<u8> = Vec::new();

        let notes = d.poll(&mut source, &mut sink).unwrap();
        assert_eq!(
            notes,
            vec![Notification::Updated(MessageKey::new(0x8F, Some(0xAB)))]
        );
        assert_eq!(sink, vec![DLE, 0x1F, DLE, ETX]);
        let timing = d.state().timing.unwrap();
        assert!(timing.flags.contains(TimingFlags::UTC_TIME));
        assert_eq!(timing.hours, 17);
    }

    #[test]
    fn test_poll_through_io_adapters() {
        let mut bytes = vec![DLE, ETX];
        bytes.extend(primary_timing(21));
        let mut source = IoSource::new(std::io::Cursor::new(bytes));
        let mut written: Vec<u8> = Vec::new();

        let mut d = driver();
        d.send(Command::RequestSurveyParams);
        let notes = {
            let mut sink = IoSink::new(&mut written);
            d.poll(&mut source, &mut sink).unwrap()
        };
        assert_eq!(notes.len(), 1);
        assert_eq!(d.state().timing.map(|t| t.day), Some(21));
        let mut expected = Command::RequestSurveyParams.to_bytes(ByteOrder::Big).to_vec();
        expected.extend_from_slice(&[DLE, 0x1F, DLE, ETX]);
        assert_eq!(written, expected);
    }

    #[test]
    fn test_invalid_config_refused() {
        let config = DriverConfig {
            resync_limit: 0,
            ..DriverConfig::default()
        };
        assert!(Driver::new(config).is_err());
    }
}
