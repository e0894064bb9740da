//! Line reader over a sensor link
//!
//! Turns any `std::io::Read` byte source into a [`Stream`] of
//! [`SensorSample`]s. The reader is the only place that knows about line
//! framing:
//!
//! ```text
//!   link bytes ──► read buffer (512 B) ──► line buffer (256 B) ──► parse_line
//!                                               │                      │
//!                                  overflow: discard until '\n'   Err: drop line
//!                                                                  Ok: yield sample
//! ```
//!
//! ## Result Kinds
//!
//! | outcome                                 | returned as                          |
//! |-----------------------------------------|--------------------------------------|
//! | complete valid line                     | `Ok(sample)`                         |
//! | no complete valid line yet, timeout     | `Err(WouldBlock)`                    |
//! | other read error                        | `Err(Other(Transport(e)))`           |
//! | zero-byte read, reset, abort, broken pipe | `Err(Other(EndOfStream))`, sticky  |
//!
//! Malformed lines never surface. They are counted in [`LinkStats`] and the
//! reader moves on to the next line.
//!
//! Each poll performs at most one `read` call, so a poll is bounded by the
//! link's read timeout.

use std::io::{self, ErrorKind, Read};
use std::time::Duration;

use super::{Stream, StreamError};
use crate::errors::ParseError;
use crate::sample::SensorSample;

/// Longest accepted line, excluding the terminator
pub const MAX_LINE_LEN: usize = 256;

const READ_CHUNK: usize = 512;

/// Link timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Read timeout applied when the link is opened
    pub read_timeout: Duration,
    /// Pause after a transport error before polling again
    pub backoff: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(250),
            backoff: Duration::from_millis(500),
        }
    }
}

impl LinkConfig {
    /// Set the read timeout
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the transport error backoff
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Statistics for a link reader
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LinkStats {
    /// Bytes read from the link
    pub bytes_read: usize,
    /// Complete lines seen, valid or not
    pub lines_processed: usize,
    /// Lines that became samples
    pub samples_parsed: usize,
    /// Lines dropped as malformed or too long
    pub lines_discarded: usize,
    /// Read errors reported as `Transport`
    pub transport_errors: usize,
    /// Why the most recent discarded line was dropped
    pub last_discard: Option<ParseError>,
}

/// Sensor line reader
///
/// ## Example
///
/// ```rust
/// use fisiotech_core::stream::{SensorLinkReader, Stream};
///
/// let bytes: &[u8] = b"abc,1,2\n0.1,0.2,0.3,0.4,0.5,0.6,0.7\n";
/// let mut reader = SensorLinkReader::new(bytes);
///
/// let sample = reader.poll_next().unwrap();
/// assert_eq!(sample.intensity, 0.7);
/// assert_eq!(reader.stats().lines_discarded, 1);
/// ```
pub struct SensorLinkReader<R> {
    link: R,
    config: LinkConfig,
    buffer: [u8; READ_CHUNK],
    buffer_pos: usize,
    buffer_len: usize,
    line_buffer: heapless::String<MAX_LINE_LEN>,
    /// Current line overflowed, skip to the next newline
    discarding: bool,
    closed: bool,
    stats: LinkStats,
}

impl<R: Read> SensorLinkReader<R> {
    /// Wrap a link with the default configuration
    pub fn new(link: R) -> Self {
        Self::with_config(link, LinkConfig::default())
    }

    /// Wrap a link
    pub fn with_config(link: R, config: LinkConfig) -> Self {
        Self {
            link,
            config,
            buffer: [0; READ_CHUNK],
            buffer_pos: 0,
            buffer_len: 0,
            line_buffer: heapless::String::new(),
            discarding: false,
            closed: false,
            stats: LinkStats::default(),
        }
    }

    /// Pause to apply after a transport error
    pub fn backoff(&self) -> Duration {
        self.config.backoff
    }

    /// Get statistics
    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Whether the peer has closed the link
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Give back the underlying link
    pub fn into_inner(self) -> R {
        self.link
    }

    /// Scan buffered bytes for the next valid sample
    fn next_buffered(&mut self) -> Option<SensorSample> {
        while self.buffer_pos < self.buffer_len {
            let byte = self.buffer[self.buffer_pos];
            self.buffer_pos += 1;

            match byte {
                b'\n' => {
                    if let Some(sample) = self.finish_line() {
                        return Some(sample);
                    }
                }
                b'\r' => {}
                _ if self.discarding || !byte.is_ascii() => {}
                _ => {
                    if self.line_buffer.push(byte as char).is_err() {
                        self.discarding = true;
                        self.line_buffer.clear();
                    }
                }
            }
        }
        None
    }

    /// Close the current line, returning a sample if it parsed
    fn finish_line(&mut self) -> Option<SensorSample> {
        self.stats.lines_processed += 1;

        if self.discarding {
            self.discarding = false;
            self.discard(ParseError::LineTooLong { max: MAX_LINE_LEN });
            return None;
        }

        let parsed = SensorSample::parse_line(self.line_buffer.as_str());
        self.line_buffer.clear();

        match parsed {
            Ok(sample) => {
                self.stats.samples_parsed += 1;
                Some(sample)
            }
            Err(e) => {
                self.discard(e);
                None
            }
        }
    }

    fn discard(&mut self, reason: ParseError) {
        self.stats.lines_discarded += 1;
        self.stats.last_discard = Some(reason);
        #[cfg(feature = "log")]
        log::debug!("Discarded sensor line: {}", reason);
    }

    /// Peer is gone: flush a trailing unterminated line, then latch closed
    fn close(&mut self) -> nb::Result<SensorSample, StreamError<io::Error>> {
        self.closed = true;
        let pending = !self.line_buffer.is_empty() || self.discarding;
        if pending {
            if let Some(sample) = self.finish_line() {
                return Ok(sample);
            }
        }
        Err(nb::Error::Other(StreamError::EndOfStream))
    }
}

/// Read errors that mean the peer is gone for good
fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof
            | ErrorKind::NotConnected
    )
}

impl<R: Read> Stream for SensorLinkReader<R> {
    type Item = SensorSample;
    type Error = StreamError<io::Error>;

    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error> {
        if self.closed {
            return Err(nb::Error::Other(StreamError::EndOfStream));
        }

        if let Some(sample) = self.next_buffered() {
            return Ok(sample);
        }

        self.buffer_pos = 0;
        self.buffer_len = 0;

        match self.link.read(&mut self.buffer) {
            Ok(0) => self.close(),
            Ok(n) => {
                self.buffer_len = n;
                self.stats.bytes_read += n;
                self.next_buffered().ok_or(nb::Error::WouldBlock)
            }
            Err(e) => match e.kind() {
                ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => {
                    Err(nb::Error::WouldBlock)
                }
                kind if is_disconnect(kind) => {
                    #[cfg(feature = "log")]
                    log::info!("Sensor link closed by peer: {}", e);
                    self.close()
                }
                _ => {
                    self.stats.transport_errors += 1;
                    Err(nb::Error::Other(StreamError::Transport(e)))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::memory::{ScriptedLink, Step};

    fn drain<R: Read>(reader: &mut SensorLinkReader<R>) -> (Vec<SensorSample>, bool) {
        let mut samples = Vec::new();
        for _ in 0..64 {
            match reader.poll_next() {
                Ok(s) => samples.push(s),
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(StreamError::EndOfStream)) => return (samples, true),
                Err(nb::Error::Other(StreamError::Transport(_))) => {}
            }
        }
        (samples, false)
    }

    #[test]
    fn malformed_line_is_skipped() {
        let bytes: &[u8] = b"abc,1,2\n1,2,3,4,5,6,0.5\n";
        let mut reader = SensorLinkReader::new(bytes);

        let (samples, closed) = drain(&mut reader);
        assert!(closed);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].intensity, 0.5);
        assert_eq!(reader.stats().lines_discarded, 1);
        assert_eq!(reader.stats().lines_processed, 2);
        assert_eq!(
            reader.stats().last_discard,
            Some(ParseError::TooFewFields { found: 2 })
        );
    }

    #[test]
    fn lines_split_across_reads() {
        let link = ScriptedLink::new(vec![
            Step::data("0.1,0.2,0."),
            Step::data("3,1,2,3,0.9\r\n0.2,"),
            Step::Idle,
            Step::data("0.2,0.2,0,0,0,0.4\n"),
        ]);
        let mut reader = SensorLinkReader::new(link);

        let (samples, closed) = drain(&mut reader);
        assert!(closed);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].az, 0.3);
        assert_eq!(samples[1].intensity, 0.4);
    }

    #[test]
    fn overlong_line_resyncs_at_newline() {
        let mut bytes = vec![b'1'; MAX_LINE_LEN + 40];
        bytes.extend_from_slice(b"\n1,1,1,1,1,1,1\n");
        let mut reader = SensorLinkReader::new(&bytes[..]);

        let (samples, _) = drain(&mut reader);
        assert_eq!(samples.len(), 1);
        assert_eq!(reader.stats().lines_discarded, 1);
        assert_eq!(
            reader.stats().last_discard,
            Some(ParseError::LineTooLong { max: MAX_LINE_LEN })
        );
    }

    #[test]
    fn trailing_line_without_newline_is_flushed() {
        let bytes: &[u8] = b"1,2,3,4,5,6,7";
        let mut reader = SensorLinkReader::new(bytes);

        assert_eq!(reader.poll_next().ok().map(|s| s.intensity), Some(7.0));
        assert!(matches!(
            reader.poll_next(),
            Err(nb::Error::Other(StreamError::EndOfStream))
        ));
    }

    #[test]
    fn non_ascii_bytes_are_dropped() {
        let bytes: &[u8] = b"1,2,3,\xff4,5,6,7\n";
        let mut reader = SensorLinkReader::new(bytes);
        assert_eq!(reader.poll_next().ok().map(|s| s.gx), Some(4.0));
    }

    #[test]
    fn timeout_is_would_block_and_error_is_transport() {
        let link = ScriptedLink::new(vec![
            Step::Idle,
            Step::Error(ErrorKind::Other),
            Step::data("1,1,1,1,1,1,1\n"),
        ]);
        let mut reader = SensorLinkReader::new(link);

        assert!(matches!(reader.poll_next(), Err(nb::Error::WouldBlock)));
        assert!(matches!(
            reader.poll_next(),
            Err(nb::Error::Other(StreamError::Transport(_)))
        ));
        assert!(reader.poll_next().is_ok());
        assert_eq!(reader.stats().transport_errors, 1);
    }

    #[test]
    fn reset_is_end_of_stream_and_sticky() {
        let link = ScriptedLink::new(vec![Step::Error(ErrorKind::ConnectionReset), Step::data("1,1,1,1,1,1,1\n")]);
        let mut reader = SensorLinkReader::new(link);

        assert!(matches!(
            reader.poll_next(),
            Err(nb::Error::Other(StreamError::EndOfStream))
        ));
        assert!(reader.is_closed());
        assert!(matches!(
            reader.poll_next(),
            Err(nb::Error::Other(StreamError::EndOfStream))
        ));
    }

    #[test]
    fn config_builder() {
        let config = LinkConfig::default().with_backoff(Duration::from_millis(20));
        let reader = SensorLinkReader::with_config(&b""[..], config);
        assert_eq!(reader.backoff(), Duration::from_millis(20));
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }
}
