//! Link selection by address
//!
//! The monitor takes a single `--port` argument; this module decides what
//! kind of link it names.

use std::io::{self, Read};

use fisiotech_core::stream::LinkConfig;
use fisiotech_core::{LinkOpener, LinkTarget};

use crate::tcp::{self, TcpLinkOpener};
use crate::ConnectorError;

/// Kind of link an address names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Serial device path or COM port
    Serial,
    /// `host:port`, optionally prefixed with `tcp://`
    Tcp,
}

impl LinkKind {
    /// Classify an address
    ///
    /// `tcp://...` and anything of the form `host:port` with a numeric port
    /// is TCP. Everything else is treated as a serial port name.
    pub fn parse(address: &str) -> Result<Self, ConnectorError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ConnectorError::InvalidAddress(address.to_string()));
        }

        if let Some(rest) = address.strip_prefix(tcp::SCHEME) {
            return match rest.rsplit_once(':') {
                Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(Self::Tcp),
                _ => Err(ConnectorError::InvalidAddress(address.to_string())),
            };
        }

        match address.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && !host.contains('/') && port.parse::<u16>().is_ok() => {
                Ok(Self::Tcp)
            }
            _ => Ok(Self::Serial),
        }
    }
}

/// Opens a serial or TCP link depending on the target address
#[derive(Debug, Clone, Default)]
pub struct DeviceLinkOpener {
    config: LinkConfig,
}

impl DeviceLinkOpener {
    /// Opener applying `config.read_timeout` to every link
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }
}

impl LinkOpener for DeviceLinkOpener {
    type Link = Box<dyn Read + Send>;

    fn open(&self, target: &LinkTarget) -> io::Result<Self::Link> {
        let kind = LinkKind::parse(&target.address)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        match kind {
            LinkKind::Tcp => Ok(Box::new(TcpLinkOpener::new(self.config).open(target)?)),
            LinkKind::Serial => self.open_serial(target),
        }
    }
}

impl DeviceLinkOpener {
    #[cfg(feature = "serial")]
    fn open_serial(&self, target: &LinkTarget) -> io::Result<Box<dyn Read + Send>> {
        let port = crate::serial::SerialLinkOpener::new(self.config).open(target)?;
        Ok(Box::new(port))
    }

    #[cfg(not(feature = "serial"))]
    fn open_serial(&self, _target: &LinkTarget) -> io::Result<Box<dyn Read + Send>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            ConnectorError::Unsupported("serial").to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    #[test]
    fn classify_addresses() {
        assert_eq!(LinkKind::parse("/dev/ttyUSB0").unwrap(), LinkKind::Serial);
        assert_eq!(LinkKind::parse("COM3").unwrap(), LinkKind::Serial);
        assert_eq!(LinkKind::parse("127.0.0.1:4000").unwrap(), LinkKind::Tcp);
        assert_eq!(LinkKind::parse("tcp://bridge.local:23").unwrap(), LinkKind::Tcp);
        assert_eq!(LinkKind::parse("localhost:4000").unwrap(), LinkKind::Tcp);

        assert!(LinkKind::parse("").is_err());
        assert!(LinkKind::parse("tcp://nohost").is_err());
        assert!(LinkKind::parse("tcp://:80").is_err());
    }

    #[test]
    fn tcp_address_opens_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let target = LinkTarget::new(listener.local_addr().unwrap().to_string());

        let mut link = DeviceLinkOpener::default().open(&target).unwrap();
        let (mut peer, _) = listener.accept().unwrap();
        peer.write_all(b"1,2,3\n").unwrap();

        let mut buf = [0u8; 6];
        link.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"1,2,3\n");
    }
}
