use std::fmt;
use std::io;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Custom error types for the TSIP driver
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Link error: {0}")]
    Link(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] bincode::Error),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new link error
    pub fn link(msg: impl Into<String>) -> Self {
        Error::Link(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

/// Width of a multi-byte wire field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Width {
    Byte,
    Word,
    Dword,
    Single,
    Double,
}

impl Width {
    /// Number of wire bytes the field occupies
    pub fn len(self) -> usize {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
            Width::Dword | Width::Single => 4,
            Width::Double => 8,
        }
    }

    /// Fault bit recorded when a field of this width runs off the end of a message
    pub fn fault_bit(self) -> FaultBits {
        match self {
            Width::Byte => FaultBits::BYTE,
            Width::Word => FaultBits::WORD,
            Width::Dword => FaultBits::DWORD,
            Width::Single => FaultBits::SINGLE,
            Width::Double => FaultBits::DOUBLE,
        }
    }
}

bitflags! {
    /// Raw fault code accumulated for one message.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct FaultBits: u16 {
        const BYTE = 0x0001;
        const WORD = 0x0002;
        const DWORD = 0x0004;
        const SINGLE = 0x0008;
        const DOUBLE = 0x0010;
        /// Data left over after the last field of a known layout
        const EXTRA_DATA = 0x0020;
        /// Message start seen where payload data was expected
        const UNEXPECTED_START = 0x0040;
        /// Message end seen where a message start was expected
        const UNEXPECTED_END = 0x0080;
        /// Data byte seen where a message start was expected
        const MISSING_START = 0x0100;
        /// Payload longer than the configured maximum
        const OVERRUN = 0x0200;
        const RESYNC_TIMEOUT = 0x0400;
        /// Framing and decode were clean but a value was out of range
        const REJECTED = 0x0800;
        /// Selector byte inside the payload named an unknown layout
        const UNSUPPORTED = 0x1000;
    }
}

/// Fault taxonomy surfaced to diagnostics consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    /// End or start marker where data was expected, or data where a start was expected
    Framing,
    /// Not enough data before the end of the message for a field
    FieldDecode(Width),
    /// Control token seen mid-message
    Sync,
    /// Id or sub-id outside the dispatch table
    UnknownMessage,
    /// Resynchronization gave up after the configured token bound
    ResyncTimeout,
    /// Value failed a range check at commit time
    Rejected,
}

impl FaultKind {
    /// Whether the fault increments the bad-packet counter.
    pub fn is_bad_packet(self) -> bool {
        !matches!(
            self,
            FaultKind::UnknownMessage | FaultKind::Rejected | FaultKind::ResyncTimeout
        )
    }
}

/// One fault report, keyed by message id and sub-id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Message id, if a start marker had been seen
    pub id: Option<u8>,
    /// Sub-id for container messages
    pub sub_id: Option<u8>,
    pub kind: FaultKind,
    pub bits: FaultBits,
}

impl Diagnostic {
    pub fn new(id: Option<u8>, sub_id: Option<u8>, kind: FaultKind, bits: FaultBits) -> Self {
        Diagnostic { id, sub_id, kind, bits }
    }

    /// Raw fault code for a logging collaborator
    pub fn code(&self) -> u16 {
        self.bits.bits()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.id, self.sub_id) {
            (Some(id), Some(sub)) => write!(f, "{:?} in {:02X}-{:02X} (code {:04X})", self.kind, id, sub, self.code()),
            (Some(id), None) => write!(f, "{:?} in {:02X} (code {:04X})", self.kind, id, self.code()),
            _ => write!(f, "{:?} between messages (code {:04X})", self.kind, self.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::link("port vanished");
        assert!(matches!(err, Error::Link(_)));
        assert_eq!(err.to_string(), "Link error: port vanished");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::Other, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_width_fault_bits_are_distinct() {
        let all = [Width::Byte, Width::Word, Width::Dword, Width::Single, Width::Double];
        let mut seen = FaultBits::empty();
        for w in all {
            assert!(!seen.intersects(w.fault_bit()));
            seen |= w.fault_bit();
        }
        assert_eq!(Width::Double.len(), 8);
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new(
            Some(0x8F),
            Some(0xAB),
            FaultKind::FieldDecode(Width::Word),
            FaultBits::WORD,
        );
        assert_eq!(diag.code(), 0x0002);
        assert_eq!(diag.to_string(), "FieldDecode(Word) in 8F-AB (code 0002)");
        assert!(diag.kind.is_bad_packet());
        assert!(!FaultKind::UnknownMessage.is_bad_packet());
    }
}
