//! Field decoder over one message payload.
//!
//! Multi-byte fields follow the configured receiver byte order. The first
//! read that runs off the end of the payload is remembered, so every later
//! read in the same message fails without consuming input.

use bytes::Buf;
use thiserror::Error;

use crate::core::{ByteOrder, FaultBits, FaultKind, Width};

/// A field ran off the end of its message.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("message ended inside a {width:?} field")]
pub struct FieldFault {
    pub width: Width,
}

/// Why a payload could not be turned into a report.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFault {
    #[error(transparent)]
    Field(#[from] FieldFault),

    #[error("{0} bytes left after the last field")]
    ExtraData(usize),

    #[error("unsupported layout selector {0:#04x}")]
    Unsupported(u8),
}

impl DecodeFault {
    pub fn kind(&self) -> FaultKind {
        match self {
            DecodeFault::Field(f) => FaultKind::FieldDecode(f.width),
            DecodeFault::ExtraData(_) => FaultKind::Framing,
            DecodeFault::Unsupported(_) => FaultKind::UnknownMessage,
        }
    }

    pub fn bits(&self) -> FaultBits {
        match self {
            DecodeFault::Field(f) => f.width.fault_bit(),
            DecodeFault::ExtraData(_) => FaultBits::EXTRA_DATA,
            DecodeFault::Unsupported(_) => FaultBits::UNSUPPORTED,
        }
    }
}

pub type FieldResult<T> = std::result::Result<T, FieldFault>;

/// Reads wire fields from one message payload in receiver byte order.
pub struct FieldDecoder<'a> {
    buf: &'a [u8],
    order: ByteOrder,
    faults: FaultBits,
    early_end: Option<FieldFault>,
}

impl<'a> FieldDecoder<'a> {
    pub fn new(payload: &'a [u8], order: ByteOrder) -> Self {
        FieldDecoder {
            buf: payload,
            order,
            faults: FaultBits::empty(),
            early_end: None,
        }
    }

    fn claim(&mut self, width: Width, len: usize) -> FieldResult<()> {
        if self.early_end.is_some() || self.buf.remaining() < len {
            let fault = FieldFault { width };
            self.faults |= width.fault_bit();
            self.early_end.get_or_insert(fault);
            return Err(fault);
        }
        Ok(())
    }

    pub fn u8(&mut self) -> FieldResult<u8> {
        self.claim(Width::Byte, Width::Byte.len())?;
        Ok(self.buf.get_u8())
    }

    pub fn i8(&mut self) -> FieldResult<i8> {
        self.claim(Width::Byte, Width::Byte.len())?;
        Ok(self.buf.get_i8())
    }

    pub fn u16(&mut self) -> FieldResult<u16> {
        self.claim(Width::Word, Width::Word.len())?;
        Ok(match self.order {
            ByteOrder::Big => self.buf.get_u16(),
            ByteOrder::Little => self.buf.get_u16_le(),
        })
    }

    pub fn i16(&mut self) -> FieldResult<i16> {
        self.u16().map(|v| v as i16)
    }

    pub fn u32(&mut self) -> FieldResult<u32> {
        self.claim(Width::Dword, Width::Dword.len())?;
        Ok(match self.order {
            ByteOrder::Big => self.buf.get_u32(),
            ByteOrder::Little => self.buf.get_u32_le(),
        })
    }

    pub fn i32(&mut self) -> FieldResult<i32> {
        self.u32().map(|v| v as i32)
    }

    pub fn f32(&mut self) -> FieldResult<f32> {
        self.claim(Width::Single, Width::Single.len())?;
        Ok(match self.order {
            ByteOrder::Big => self.buf.get_f32(),
            ByteOrder::Little => self.buf.get_f32_le(),
        })
    }

    pub fn f64(&mut self) -> FieldResult<f64> {
        self.claim(Width::Double, Width::Double.len())?;
        Ok(match self.order {
            ByteOrder::Big => self.buf.get_f64(),
            ByteOrder::Little => self.buf.get_f64_le(),
        })
    }

    /// Reads `len` raw bytes
    pub fn bytes(&mut self, len: usize) -> FieldResult<&'a [u8]> {
        self.claim(Width::Byte, len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Skips reserved bytes
    pub fn skip(&mut self, len: usize) -> FieldResult<()> {
        self.bytes(len).map(|_| ())
    }

    /// Discards whatever is left; for messages whose tail varies by firmware
    pub fn skip_rest(&mut self) {
        self.buf = &[];
    }

    /// Payload bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Per-width fault bits recorded so far
    pub fn faults(&self) -> FaultBits {
        self.faults
    }

    pub fn early_end(&self) -> Option<FieldFault> {
        self.early_end
    }

    /// Checks frame end: no pending fault and no bytes past the last field.
    pub fn finish(&self) -> std::result::Result<(), DecodeFault> {
        if let Some(fault) = self.early_end {
            return Err(fault.into());
        }
        if !self.buf.is_empty() {
            return Err(DecodeFault::ExtraData(self.buf.len()));
        }
        Ok(())
    }
}
