//! Sensor link abstraction
//!
//! A link is any byte source that yields newline-terminated sensor lines:
//! a serial port, a TCP socket bridged from one, or a scripted reader in
//! tests. Opening is separated from reading so the session can hand the
//! opened link to its ingestion thread and own it there until disconnect.

use std::fmt;
use std::io::{self, Read};

/// Where and how to open a link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Port name (`/dev/ttyUSB0`, `COM3`) or `host:port`
    pub address: String,
    /// Serial line rate, ignored by non-serial links
    pub baud: u32,
}

impl LinkTarget {
    /// Serial rate used by the sensor firmware
    pub const DEFAULT_BAUD: u32 = 9600;

    /// Target at the default baud rate
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            baud: Self::DEFAULT_BAUD,
        }
    }

    /// Override the baud rate
    pub fn with_baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.address, self.baud)
    }
}

/// Opens links to a sensor
///
/// The returned link must honour a read timeout so a reader never blocks
/// forever: a timed-out read should surface as `WouldBlock` or `TimedOut`.
/// The link is closed when it is dropped.
pub trait LinkOpener: Send + Sync + 'static {
    /// Concrete link type
    type Link: Read + Send + 'static;

    /// Open a link to `target`
    fn open(&self, target: &LinkTarget) -> io::Result<Self::Link>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_defaults_to_firmware_baud() {
        let target = LinkTarget::new("/dev/ttyUSB0");
        assert_eq!(target.baud, 9600);
        assert_eq!(target.to_string(), "/dev/ttyUSB0@9600");
        assert_eq!(target.with_baud(115_200).baud, 115_200);
    }
}
