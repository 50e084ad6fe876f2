//! Protocol implementation module
//!
//! This module defines TSIP framing, field decoding, resynchronization,
//! the typed reports and commands, and the request sequencer.

pub mod codec;
pub mod command;
pub mod dispatch;
pub mod encoder;
pub mod fields;
pub mod framer;
pub mod report;
pub mod resync;
pub mod sequencer;

pub use self::codec::TsipCodec;
pub use self::command::Command;
pub use self::dispatch::{dispatch, MessageKey};
pub use self::encoder::{encode_message, MessageWriter};
pub use self::fields::{DecodeFault, FieldDecoder, FieldFault};
pub use self::framer::{ByteSink, ByteSource, Framer, IoSink, IoSource, Token};
pub use self::report::Report;
pub use self::resync::{Deframer, FrameEvent, Packet, Resynchronizer, SyncState};
pub use self::sequencer::{RequestSequencer, Step};

// Message ids
/// Container for the timing-receiver reports
pub const ID_TIMING_REPORT: u8 = 0x8F;
/// Container for the timing-receiver commands
pub const ID_TIMING_COMMAND: u8 = 0x8E;
/// Container for firmware and hardware version reports and requests
pub const ID_VERSION: u8 = 0x1C;

/// Sub-id of the primary timing report
pub const SUB_PRIMARY_TIMING: u8 = 0xAB;
/// Sub-id of the supplemental timing report
pub const SUB_SUPPLEMENTAL_TIMING: u8 = 0xAC;

/// Whether the first payload byte of `id` selects a sub-shape
pub fn is_container(id: u8) -> bool {
    matches!(id, ID_TIMING_REPORT | ID_VERSION)
}
