//! Byte framer: raw link bytes to framing tokens.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};

use crate::core::{DLE, ETX};

/// One framing token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Literal payload byte
    Data(u8),
    /// Start of a message with the given id
    Start(u8),
    /// End of the current message
    End,
}

/// Non-blocking byte source. `Ok(None)` means no data is available yet.
pub trait ByteSource {
    fn read_byte(&mut self) -> io::Result<Option<u8>>;
}

/// Byte sink for outgoing frames.
pub trait ByteSink {
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        for &b in bytes {
            self.write_byte(b)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteSource for VecDeque<u8> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        Ok(self.pop_front())
    }
}

impl ByteSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.push(byte);
        Ok(())
    }
}

/// Adapts any [Read] into a [ByteSource]; zero-length, would-block and
/// timed-out reads report "no data".
pub struct IoSource<R> {
    inner: R,
}

impl<R: Read> IoSource<R> {
    pub fn new(inner: R) -> Self {
        IoSource { inner }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R: Read> ByteSource for IoSource<R> {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Adapts any [Write] into a [ByteSink].
pub struct IoSink<W> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        IoSink { inner }
    }
}

impl<W: Write> ByteSink for IoSink<W> {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_all(&[byte])
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// De-escapes the link byte stream. Holds at most one pending escape byte.
#[derive(Debug, Default, Clone)]
pub struct Framer {
    escaped: bool,
}

impl Framer {
    pub fn new() -> Self {
        Framer { escaped: false }
    }

    /// Feeds one byte, returning a token once a whole pair (or a plain byte) is seen.
    pub fn push(&mut self, byte: u8) -> Option<Token> {
        if self.escaped {
            self.escaped = false;
            return Some(match byte {
                DLE => Token::Data(DLE),
                ETX => Token::End,
                id => Token::Start(id),
            });
        }
        if byte == DLE {
            self.escaped = true;
            None
        } else {
            Some(Token::Data(byte))
        }
    }

    /// Pulls bytes from `source` until a token is complete or no data is available.
    pub fn next_token<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> io::Result<Option<Token>> {
        while let Some(byte) = source.read_byte()? {
            if let Some(token) = self.push(byte) {
                return Ok(Some(token));
            }
        }
        Ok(None)
    }

    /// Whether an escape byte is waiting for its pair
    pub fn is_escaped(&self) -> bool {
        self.escaped
    }
}
