//! Serial sensor links
//!
//! 8N1 at the target's baud rate, no flow control. The port is opened with
//! the link read timeout, so a silent sensor surfaces as `TimedOut` reads
//! rather than a blocked thread.

use std::io;

use fisiotech_core::stream::LinkConfig;
use fisiotech_core::{LinkOpener, LinkTarget};
use log::debug;
use serialport::SerialPort;

/// Opens serial ports
#[derive(Debug, Clone, Default)]
pub struct SerialLinkOpener {
    config: LinkConfig,
}

impl SerialLinkOpener {
    /// Opener applying `config.read_timeout` to every port
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }
}

impl LinkOpener for SerialLinkOpener {
    type Link = Box<dyn SerialPort>;

    fn open(&self, target: &LinkTarget) -> io::Result<Box<dyn SerialPort>> {
        let port = serialport::new(target.address.as_str(), target.baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(self.config.read_timeout)
            .open()
            .map_err(to_io_error)?;

        debug!("Serial port {} open at {} baud", target.address, target.baud);
        Ok(port)
    }
}

/// Names of the serial ports present on this machine
pub fn list_ports() -> io::Result<Vec<String>> {
    let ports = serialport::available_ports().map_err(to_io_error)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

fn to_io_error(e: serialport::Error) -> io::Error {
    let kind = match e.kind() {
        serialport::ErrorKind::NoDevice => io::ErrorKind::NotFound,
        serialport::ErrorKind::InvalidInput => io::ErrorKind::InvalidInput,
        serialport::ErrorKind::Io(kind) => kind,
        serialport::ErrorKind::Unknown => io::ErrorKind::Other,
    };
    io::Error::new(kind, e.description)
}
