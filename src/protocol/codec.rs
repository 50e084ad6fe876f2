use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::command::Command;
use super::resync::{Deframer, FrameEvent};
use crate::core::{ByteOrder, DriverConfig, Error};

/// TSIP codec for framed transports.
///
/// Decoding consumes bytes until the deframer yields an event, so a partial
/// message is held by the deframer rather than left in the read buffer.
#[derive(Debug)]
pub struct TsipCodec {
    deframer: Deframer,
    order: ByteOrder,
}

impl TsipCodec {
    /// Creates a new codec
    pub fn new(config: &DriverConfig) -> Self {
        TsipCodec {
            deframer: Deframer::new(config),
            order: config.byte_order,
        }
    }

    pub fn deframer(&self) -> &Deframer {
        &self.deframer
    }

    /// Drops any partial message and resynchronizes, e.g. after a reopen
    pub fn reset(&mut self) {
        self.deframer.reset();
    }
}

impl Decoder for TsipCodec {
    type Item = FrameEvent;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while src.has_remaining() {
            let byte = src.get_u8();
            if let Some(event) = self.deframer.push(byte) {
                return Ok(Some(event));
            }
        }
        Ok(None)
    }
}

impl Encoder<Command> for TsipCodec {
    type Error = Error;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(self.order, dst);
        Ok(())
    }
}
