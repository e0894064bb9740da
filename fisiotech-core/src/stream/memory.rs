//! Scripted in-memory links for tests and replay
//!
//! A [`ScriptedLink`] plays back a fixed list of [`Step`]s through
//! `std::io::Read`: data chunks, read timeouts and errors. Once the script
//! is exhausted it either reports end of stream or keeps timing out like an
//! idle sensor, depending on how it was built.
//!
//! Every link shares a drop counter with the [`ScriptedOpener`] that made
//! it, so tests can check that a session released its handle exactly once.
//!
//! ```rust
//! use fisiotech_core::stream::{ScriptedLink, SensorLinkReader, Step, Stream};
//!
//! let link = ScriptedLink::new(vec![Step::data("1,2,3,4,5,6,0.8\n")]);
//! let mut reader = SensorLinkReader::new(link);
//! assert_eq!(reader.poll_next().unwrap().intensity, 0.8);
//! ```

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::traits::{LinkOpener, LinkTarget};

/// One scripted read outcome
#[derive(Debug, Clone)]
pub enum Step {
    /// Bytes returned by the next read
    Data(Vec<u8>),
    /// A read that times out
    Idle,
    /// A read that fails with this kind
    Error(ErrorKind),
}

impl Step {
    /// Data step from text
    pub fn data(text: &str) -> Self {
        Self::Data(text.as_bytes().to_vec())
    }

    /// One data step per line, each terminated by `\n`
    pub fn lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<Self> {
        lines.into_iter().map(|l| Self::Data(format!("{}\n", l).into_bytes())).collect()
    }
}

/// Read-only link that plays back a script
#[derive(Debug)]
pub struct ScriptedLink {
    steps: VecDeque<Step>,
    /// Pending bytes of a data step larger than the read buffer
    partial: VecDeque<u8>,
    /// After the script: `None` means EOF, `Some(t)` means time out after `t`
    hold_open: Option<Duration>,
    idle_delay: Duration,
    drops: Arc<AtomicUsize>,
}

impl ScriptedLink {
    /// Link that reports end of stream once the script is played
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            partial: VecDeque::new(),
            hold_open: None,
            idle_delay: Duration::ZERO,
            drops: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Keep timing out after the script, sleeping `timeout` per read
    pub fn hold_open(mut self, timeout: Duration) -> Self {
        self.hold_open = Some(timeout);
        self
    }

    /// Sleep this long on every scripted `Idle` step
    pub fn with_idle_delay(mut self, delay: Duration) -> Self {
        self.idle_delay = delay;
        self
    }

    /// Counter incremented when the link is dropped
    pub fn drop_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.drops)
    }

    fn timed_out(delay: Duration) -> io::Result<usize> {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        Err(io::Error::new(ErrorKind::TimedOut, "scripted read timeout"))
    }
}

impl Read for ScriptedLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.partial.is_empty() {
            match self.steps.pop_front() {
                Some(Step::Data(bytes)) => self.partial.extend(bytes),
                Some(Step::Idle) => return Self::timed_out(self.idle_delay),
                Some(Step::Error(kind)) => return Err(io::Error::new(kind, "scripted read error")),
                None => {
                    return match self.hold_open {
                        Some(timeout) => Self::timed_out(timeout),
                        None => Ok(0),
                    };
                }
            }
        }

        let n = buf.len().min(self.partial.len());
        for (slot, byte) in buf.iter_mut().zip(self.partial.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Drop for ScriptedLink {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opener that hands out prepared links in order
///
/// Opening fails with `NotFound` once every prepared link has been handed
/// out, or with the scripted error if one was queued with
/// [`ScriptedOpener::push_failure`].
#[derive(Debug, Default)]
pub struct ScriptedOpener {
    links: Mutex<VecDeque<io::Result<ScriptedLink>>>,
    opened: AtomicUsize,
    drops: Arc<AtomicUsize>,
}

impl ScriptedOpener {
    /// Opener with no links queued
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a link; its drops are counted by this opener
    pub fn push_link(&self, mut link: ScriptedLink) {
        link.drops = Arc::clone(&self.drops);
        self.queue().push_back(Ok(link));
    }

    /// Queue a failed open
    pub fn push_failure(&self, kind: ErrorKind) {
        self.queue().push_back(Err(io::Error::new(kind, "scripted open failure")));
    }

    /// Number of successful opens
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of links dropped so far
    pub fn dropped(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    fn queue(&self) -> std::sync::MutexGuard<'_, VecDeque<io::Result<ScriptedLink>>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LinkOpener for ScriptedOpener {
    type Link = ScriptedLink;

    fn open(&self, target: &LinkTarget) -> io::Result<Self::Link> {
        let next = self.queue().pop_front();
        match next {
            Some(Ok(link)) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(link)
            }
            Some(Err(e)) => Err(e),
            None => Err(io::Error::new(
                ErrorKind::NotFound,
                format!("no scripted link for {}", target),
            )),
        }
    }
}
