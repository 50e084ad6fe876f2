//! Outgoing message encoder.
//!
//! A [MessageWriter] writes the start marker when it is created and the end
//! marker when it is finished or dropped, so a frame cannot be left open.
//! Every payload byte equal to the escape value is doubled.

use bytes::{BufMut, BytesMut};

use crate::core::{ByteOrder, DLE, ETX};

/// Writes one escaped message into a buffer.
pub struct MessageWriter<'a> {
    dst: &'a mut BytesMut,
    order: ByteOrder,
    open: bool,
}

impl<'a> MessageWriter<'a> {
    /// Writes the start marker for `id`
    pub fn begin(dst: &'a mut BytesMut, order: ByteOrder, id: u8) -> Self {
        dst.reserve(16);
        dst.put_u8(DLE);
        dst.put_u8(id);
        MessageWriter {
            dst,
            order,
            open: true,
        }
    }

    fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        for &b in bytes {
            if b == DLE {
                self.dst.put_u8(DLE);
            }
            self.dst.put_u8(b);
        }
        self
    }

    pub fn byte(&mut self, value: u8) -> &mut Self {
        self.raw(&[value])
    }

    pub fn sbyte(&mut self, value: i8) -> &mut Self {
        self.raw(&value.to_be_bytes())
    }

    pub fn word(&mut self, value: u16) -> &mut Self {
        match self.order {
            ByteOrder::Big => self.raw(&value.to_be_bytes()),
            ByteOrder::Little => self.raw(&value.to_le_bytes()),
        }
    }

    pub fn sword(&mut self, value: i16) -> &mut Self {
        self.word(value as u16)
    }

    pub fn dword(&mut self, value: u32) -> &mut Self {
        match self.order {
            ByteOrder::Big => self.raw(&value.to_be_bytes()),
            ByteOrder::Little => self.raw(&value.to_le_bytes()),
        }
    }

    pub fn single(&mut self, value: f32) -> &mut Self {
        self.dword(value.to_bits())
    }

    pub fn double(&mut self, value: f64) -> &mut Self {
        match self.order {
            ByteOrder::Big => self.raw(&value.to_bits().to_be_bytes()),
            ByteOrder::Little => self.raw(&value.to_bits().to_le_bytes()),
        }
    }

    /// Raw payload bytes, escaped
    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.raw(bytes)
    }

    /// Writes the end marker
    pub fn end(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if self.open {
            self.dst.put_u8(DLE);
            self.dst.put_u8(ETX);
            self.open = false;
        }
    }
}

impl Drop for MessageWriter<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Encodes one message: start marker, the fields written by `fields`, end marker.
pub fn encode_message<F>(dst: &mut BytesMut, order: ByteOrder, id: u8, fields: F)
where
    F: FnOnce(&mut MessageWriter<'_>),
{
    let mut writer = MessageWriter::begin(dst, order, id);
    fields(&mut writer);
    writer.end();
}
