//! Resynchronizer: turns framing tokens into whole packets and recovers
//! from dropped or duplicated escape bytes.

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use super::framer::{Framer, Token};
use super::is_container;
use crate::core::{Diagnostic, DriverConfig, FaultBits, FaultKind};

/// A complete, de-escaped message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: u8,
    pub payload: Bytes,
}

impl Packet {
    pub fn new(id: u8, payload: impl Into<Bytes>) -> Self {
        Packet {
            id,
            payload: payload.into(),
        }
    }

    /// Selector byte of a container message
    pub fn sub_id(&self) -> Option<u8> {
        if is_container(self.id) {
            self.payload.first().copied()
        } else {
            None
        }
    }
}

/// Message being assembled between its start and end markers
#[derive(Debug)]
pub struct MessageFrame {
    id: u8,
    payload: BytesMut,
}

impl MessageFrame {
    fn new(id: u8) -> Self {
        MessageFrame {
            id,
            payload: BytesMut::with_capacity(64),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn sub_id(&self) -> Option<u8> {
        if is_container(self.id) {
            self.payload.first().copied()
        } else {
            None
        }
    }

    fn into_packet(self) -> Packet {
        Packet {
            id: self.id,
            payload: self.payload.freeze(),
        }
    }
}

/// Output of the resynchronizer
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// A message closed cleanly by its end marker
    Packet(Packet),
    /// A framing or sync fault; the current message was discarded
    Fault(Diagnostic),
    /// A data byte from the repair list was taken as a message start
    Repaired { id: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Synced,
    Resyncing,
}

/// Framing state machine. Buffers at most the message in progress.
#[derive(Debug)]
pub struct Resynchronizer {
    state: SyncState,
    discarded: usize,
    frame: Option<MessageFrame>,
    repair_ids: Vec<u8>,
    limit: usize,
    max_payload: usize,
}

impl Resynchronizer {
    pub fn new(config: &DriverConfig) -> Self {
        let state = if config.resync_on_start {
            SyncState::Resyncing
        } else {
            SyncState::Synced
        };
        Resynchronizer {
            state,
            discarded: 0,
            frame: None,
            repair_ids: config.repair_ids.clone(),
            limit: config.resync_limit,
            max_payload: config.max_payload,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Tokens thrown away by the current (or last) resync
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// The message being assembled, if any
    pub fn frame(&self) -> Option<&MessageFrame> {
        self.frame.as_ref()
    }

    /// Forces a resync, e.g. after the transport was reopened mid-stream.
    pub fn reset(&mut self) {
        self.frame = None;
        self.discarded = 0;
        self.state = SyncState::Resyncing;
    }

    fn fault(&mut self, id: Option<u8>, sub_id: Option<u8>, kind: FaultKind, bits: FaultBits) -> FrameEvent {
        debug!(?id, ?sub_id, bits = bits.bits(), "framing fault, resyncing");
        self.frame = None;
        self.discarded = 0;
        self.state = SyncState::Resyncing;
        FrameEvent::Fault(Diagnostic::new(id, sub_id, kind, bits))
    }

    fn begin(&mut self, id: u8) {
        self.frame = Some(MessageFrame::new(id));
    }

    /// Feeds one token
    pub fn push(&mut self, token: Token) -> Option<FrameEvent> {
        match self.state {
            SyncState::Resyncing => self.resync(token),
            SyncState::Synced => match self.frame.take() {
                None => self.between_messages(token),
                Some(frame) => self.in_message(frame, token),
            },
        }
    }

    fn resync(&mut self, token: Token) -> Option<FrameEvent> {
        if token == Token::End {
            trace!(discarded = self.discarded, "resynced on end marker");
            self.state = SyncState::Synced;
            return None;
        }
        self.discarded += 1;
        if self.discarded < self.limit {
            return None;
        }
        warn!(discarded = self.discarded, "no end marker within resync bound");
        self.state = SyncState::Synced;
        Some(FrameEvent::Fault(Diagnostic::new(
            None,
            None,
            FaultKind::ResyncTimeout,
            FaultBits::RESYNC_TIMEOUT,
        )))
    }

    fn between_messages(&mut self, token: Token) -> Option<FrameEvent> {
        match token {
            Token::Start(id) => {
                self.begin(id);
                None
            }
            Token::Data(b) if self.repair_ids.contains(&b) => {
                debug!(id = b, "missing escape before message id, repaired");
                self.begin(b);
                Some(FrameEvent::Repaired { id: b })
            }
            Token::Data(_) => Some(self.fault(None, None, FaultKind::Framing, FaultBits::MISSING_START)),
            Token::End => {
                // already at a boundary, nothing to discard
                let event = self.fault(None, None, FaultKind::Framing, FaultBits::UNEXPECTED_END);
                self.state = SyncState::Synced;
                Some(event)
            }
        }
    }

    fn in_message(&mut self, mut frame: MessageFrame, token: Token) -> Option<FrameEvent> {
        match token {
            Token::Data(b) => {
                if frame.payload.len() >= self.max_payload {
                    return Some(self.fault(Some(frame.id), frame.sub_id(), FaultKind::Framing, FaultBits::OVERRUN));
                }
                frame.payload.extend_from_slice(&[b]);
                self.frame = Some(frame);
                None
            }
            Token::End => Some(FrameEvent::Packet(frame.into_packet())),
            Token::Start(_) => Some(self.fault(Some(frame.id), frame.sub_id(), FaultKind::Sync, FaultBits::UNEXPECTED_START)),
        }
    }
}

/// Framer and resynchronizer in one byte-at-a-time pipeline.
#[derive(Debug)]
pub struct Deframer {
    framer: Framer,
    resync: Resynchronizer,
}

impl Deframer {
    pub fn new(config: &DriverConfig) -> Self {
        Deframer {
            framer: Framer::new(),
            resync: Resynchronizer::new(config),
        }
    }

    pub fn push(&mut self, byte: u8) -> Option<FrameEvent> {
        self.framer.push(byte).and_then(|token| self.resync.push(token))
    }

    pub fn resync(&self) -> &Resynchronizer {
        &self.resync
    }

    pub fn reset(&mut self) {
        self.framer = Framer::new();
        self.resync.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DLE, ETX};

    fn synced() -> Resynchronizer {
        let config = DriverConfig {
            resync_on_start: false,
            ..DriverConfig::default()
        };
        Resynchronizer::new(&config)
    }

    fn feed(deframer: &mut Deframer, bytes: &[u8]) -> Vec<FrameEvent> {
        bytes.iter().filter_map(|&b| deframer.push(b)).collect()
    }

    #[test]
    fn test_clean_message() {
        let mut r = synced();
        assert_eq!(r.push(Token::Start(0x41)), None);
        assert_eq!(r.push(Token::Data(1)), None);
        assert_eq!(r.push(Token::Data(2)), None);
        assert_eq!(r.push(Token::End), Some(FrameEvent::Packet(Packet::new(0x41, vec![1, 2]))));
        assert_eq!(r.state(), SyncState::Synced);
        assert!(r.frame().is_none());
    }

    #[test]
    fn test_first_message_is_discarded() {
        let mut deframer = Deframer::new(&DriverConfig::default());
        // entered mid-message: the tail and its end marker are dropped quietly
        let events = feed(&mut deframer, &[0x22, 0x33, DLE, ETX, DLE, 0x41, 0x01, DLE, ETX]);
        assert_eq!(events, vec![FrameEvent::Packet(Packet::new(0x41, vec![0x01]))]);
    }

    #[test]
    fn test_start_mid_message_is_sync_fault() {
        let mut r = synced();
        r.push(Token::Start(0x8F));
        r.push(Token::Data(0xAB));
        match r.push(Token::Start(0x47)) {
            Some(FrameEvent::Fault(d)) => {
                assert_eq!(d.kind, FaultKind::Sync);
                assert_eq!(d.id, Some(0x8F));
                assert_eq!(d.sub_id, Some(0xAB));
                assert_eq!(d.bits, FaultBits::UNEXPECTED_START);
            }
            other => panic!("expected sync fault, got {:?}", other),
        }
        assert_eq!(r.state(), SyncState::Resyncing);
        // everything up to the next end marker is dropped
        assert_eq!(r.push(Token::Data(9)), None);
        assert_eq!(r.push(Token::End), None);
        assert_eq!(r.state(), SyncState::Synced);
    }

    #[test]
    fn test_resync_timeout_at_bound() {
        let mut r = synced();
        assert!(matches!(r.push(Token::Data(0x00)), Some(FrameEvent::Fault(_))));

        let mut consumed = 0;
        let mut timeout_at = None;
        for _ in 0..2000 {
            consumed += 1;
            if let Some(FrameEvent::Fault(d)) = r.push(Token::Data(0x55)) {
                if d.kind == FaultKind::ResyncTimeout {
                    timeout_at = Some(consumed);
                    break;
                }
            }
        }
        assert_eq!(timeout_at, Some(crate::core::RESYNC_LIMIT));
        assert_eq!(r.discarded(), crate::core::RESYNC_LIMIT);
        assert_eq!(r.state(), SyncState::Synced);

        // a later start re-establishes framing
        r.push(Token::Start(0x41));
        assert!(matches!(r.push(Token::End), Some(FrameEvent::Packet(_))));
    }

    #[test]
    fn test_repair_allow_listed_id() {
        let mut deframer = Deframer::new(&DriverConfig::default());
        // 0x6D arrives without its escape
        let events = feed(&mut deframer, &[DLE, ETX, 0x6D, 0x04, DLE, ETX]);
        assert_eq!(
            events,
            vec![
                FrameEvent::Repaired { id: 0x6D },
                FrameEvent::Packet(Packet::new(0x6D, vec![0x04])),
            ]
        );
    }

    #[test]
    fn test_missing_escape_before_other_id_discards() {
        let mut deframer = Deframer::new(&DriverConfig::default());
        let events = feed(&mut deframer, &[DLE, ETX, 0x45, 0x01, 0x02, DLE, ETX, DLE, 0x41, DLE, ETX]);
        assert_eq!(events.len(), 2);
        match &events[0] {
            FrameEvent::Fault(d) => {
                assert_eq!(d.kind, FaultKind::Framing);
                assert_eq!(d.bits, FaultBits::MISSING_START);
            }
            other => panic!("expected framing fault, got {:?}", other),
        }
        assert_eq!(events[1], FrameEvent::Packet(Packet::new(0x41, Bytes::new())));
    }

    #[test]
    fn test_overrun_faults() {
        let config = DriverConfig {
            resync_on_start: false,
            max_payload: 4,
            ..DriverConfig::default()
        };
        let mut r = Resynchronizer::new(&config);
        r.push(Token::Start(0x13));
        for b in 0..4 {
            assert_eq!(r.push(Token::Data(b)), None);
        }
        match r.push(Token::Data(4)) {
            Some(FrameEvent::Fault(d)) => assert_eq!(d.bits, FaultBits::OVERRUN),
            other => panic!("expected overrun, got {:?}", other),
        }
    }

    #[test]
    fn test_stray_end_between_messages() {
        let mut r = synced();
        match r.push(Token::End) {
            Some(FrameEvent::Fault(d)) => assert_eq!(d.bits, FaultBits::UNEXPECTED_END),
            other => panic!("expected framing fault, got {:?}", other),
        }
        assert_eq!(r.state(), SyncState::Synced);
    }

    #[test]
    fn test_escaped_payload_bytes() {
        let mut deframer = Deframer::new(&DriverConfig::default());
        let events = feed(&mut deframer, &[DLE, ETX, DLE, 0x8F, DLE, DLE, ETX, DLE, ETX]);
        assert_eq!(events, vec![FrameEvent::Packet(Packet::new(0x8F, vec![DLE, ETX]))]);
        if let FrameEvent::Packet(p) = &events[0] {
            assert_eq!(p.sub_id(), Some(DLE));
        }
    }
}
