//! TCP sensor links
//!
//! For sensors bridged onto the network (`ser2net`, an ESP32 serial
//! bridge). The stream carries the same newline-terminated lines as the
//! serial port; the baud rate of the target is ignored.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use fisiotech_core::stream::LinkConfig;
use fisiotech_core::{LinkOpener, LinkTarget};
use log::debug;

/// Address prefix accepted in front of `host:port`
pub const SCHEME: &str = "tcp://";

/// Opens TCP links with a bounded connect and read timeout
#[derive(Debug, Clone)]
pub struct TcpLinkOpener {
    config: LinkConfig,
    connect_timeout: Duration,
}

impl Default for TcpLinkOpener {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}

impl TcpLinkOpener {
    /// Opener applying `config.read_timeout` to every link
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            connect_timeout: Duration::from_secs(2),
        }
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl LinkOpener for TcpLinkOpener {
    type Link = TcpStream;

    fn open(&self, target: &LinkTarget) -> io::Result<TcpStream> {
        let address = target.address.strip_prefix(SCHEME).unwrap_or(&target.address);
        let mut last_error = None;

        for addr in address.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.config.read_timeout))?;
                    stream.set_nodelay(true)?;
                    debug!("TCP link open to {}", addr);
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} resolved to no address", address))
        }))
    }
}
