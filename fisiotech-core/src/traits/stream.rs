//! Stream Processing Traits
//!
//! The sensor link is consumed through a pull-based interface built on the
//! `nb` crate. A reader thread calls [`Stream::poll_next`] in a loop and
//! decides what to do with each of the three possible outcomes:
//!
//! - `Ok(item)` - a complete item is available
//! - `Err(nb::Error::WouldBlock)` - nothing yet, poll again
//! - `Err(nb::Error::Other(e))` - the source reported an error
//!
//! ```rust
//! use fisiotech_core::traits::Stream;
//!
//! fn drain<S: Stream>(stream: &mut S) -> Result<usize, S::Error> {
//!     let mut seen = 0;
//!     loop {
//!         match stream.poll_next() {
//!             Ok(_item) => seen += 1,
//!             Err(nb::Error::WouldBlock) => return Ok(seen),
//!             Err(nb::Error::Other(e)) => return Err(e),
//!         }
//!     }
//! }
//! ```

/// Pull-based source of items
///
/// ## Contract
///
/// - `poll_next` never blocks longer than the source's read timeout
/// - Repeated `WouldBlock` returns are normal
/// - After a non-fatal error the stream may still be polled
pub trait Stream {
    /// Type of items produced by the stream
    type Item;

    /// Type of errors that can occur
    type Error;

    /// Attempt to pull the next item from the stream
    fn poll_next(&mut self) -> nb::Result<Self::Item, Self::Error>;

    /// Bounds on remaining items, `(0, None)` when unknown
    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, None)
    }
}
