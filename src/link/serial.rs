use std::io;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::core::{Dialect, Error, LinkConfig, Result};
use crate::driver::{Driver, Notification};
use crate::protocol::framer::{ByteSink, ByteSource, IoSink, IoSource};

/// Serial parity used for a dialect
pub fn parity(dialect: Dialect) -> Parity {
    match dialect {
        Dialect::Odd => Parity::Odd,
        Dialect::None => Parity::None,
    }
}

/// Receiver serial port
pub struct SerialLink {
    port: IoSource<Box<dyn SerialPort>>,
    writer: IoSink<Box<dyn SerialPort>>,
    dialect: Dialect,
}

impl SerialLink {
    /// Opens the configured device, 8 data bits and one stop bit, parity per `dialect`.
    ///
    /// Reads time out after `read_timeout`, which the driver treats as "no data yet".
    pub fn open(config: &LinkConfig, dialect: Dialect) -> Result<Self> {
        let port = serialport::new(config.device.as_str(), config.baud)
            .data_bits(DataBits::Eight)
            .parity(parity(dialect))
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| Error::link(format!("Failed to open {}: {}", config.device, e)))?;

        let writer = port
            .try_clone()
            .map_err(|e| Error::link(format!("Failed to clone {}: {}", config.device, e)))?;

        info!(device = %config.device, baud = config.baud, ?dialect, "serial link open");
        Ok(SerialLink {
            port: IoSource::new(port),
            writer: IoSink::new(writer),
            dialect,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Switches parity in place, for a reconnect with the other dialect
    pub fn set_dialect(&mut self, dialect: Dialect) -> Result<()> {
        self.port
            .get_mut()
            .set_parity(parity(dialect))
            .map_err(|e| Error::link(format!("Failed to set parity: {}", e)))?;
        self.dialect = dialect;
        info!(?dialect, "serial parity changed");
        Ok(())
    }

    /// Feeds every available byte to `driver`, then writes its queued commands.
    ///
    /// Returns when the port has no more data, so a caller's loop stays responsive.
    pub fn pump(&mut self, driver: &mut Driver) -> Result<Vec<Notification>> {
        driver.poll(&mut self.port, &mut self.writer)
    }
}

impl ByteSource for SerialLink {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        self.port.read_byte()
    }
}

impl ByteSink for SerialLink {
    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.writer.write_byte(byte)
    }

    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
