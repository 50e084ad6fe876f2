//! Core types shared by the TSIP driver
//!
//! Errors, the fault taxonomy, configuration and wire constants.

pub mod error;
pub mod serde;
pub mod types;

pub use self::error::{Diagnostic, Error, FaultBits, FaultKind, Result, Width};
pub use self::types::{Bounds, ByteOrder, Dialect, DriverConfig, LinkConfig};

/// Escape byte: doubled for literal data, prefixes message start and end
pub const DLE: u8 = 0x10;

/// End-of-message byte following an escape
pub const ETX: u8 = 0x03;

/// Tokens discarded while resynchronizing before giving up
pub const RESYNC_LIMIT: usize = 1024;

/// Longest payload buffered for one message
pub const MAX_PAYLOAD: usize = 1024;

/// Highest satellite PRN tracked in the satellite table
pub const MAX_PRN: u8 = 32;
