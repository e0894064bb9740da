//! Streaming session: connection state machine and worker loops
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────────────────── Session ───────────────────────────┐
//!   connect(target) ──┤ state: Disconnected → Connecting → Streaming → Disconnected    │
//!                     │                                                                │
//!                     │  ingestion thread (owns the link)        refresh thread        │
//!                     │  ┌─────────────────────────────┐        ┌───────────────────┐  │
//!                     │  │ SensorLinkReader::poll_next │        │ every interval:   │  │
//!                     │  │ FeatureVector::derive       │        │ snapshot history  │  │
//!                     │  │ InferenceClient::predict    │        │ diagnose          │  │
//!                     │  │ record history + latest ────┼──┐  ┌──┼─► on_diagnosis    │  │
//!                     │  └─────────────────────────────┘  │  │  └───────────────────┘  │
//!                     │                          Mutex<SharedState>                    │
//!                     └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The two loops share only the history and the latest prediction, behind a
//! single mutex. Readers always get copies.
//!
//! ## Failure Handling
//!
//! | event                        | effect                                         |
//! |------------------------------|------------------------------------------------|
//! | malformed line               | dropped inside the reader, nothing surfaced    |
//! | read error                   | `TransportError` status, backoff, keep reading |
//! | inference failure            | `InferenceFailed` status, backoff, sample skipped |
//! | peer closed the link         | link released, history cleared, `LinkClosed`   |
//!
//! The link is moved into the ingestion thread and dropped when that thread
//! exits, so it is released exactly once whichever way the loop ends.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use crate::diagnosis::{DiagnosisRecord, StabilityDiagnoser};
use crate::errors::SessionError;
use crate::features::FeatureVector;
use crate::history::{HistoryBuffer, HistorySnapshot};
use crate::stream::{LinkConfig, SensorLinkReader, Stream, StreamError};
use crate::traits::{InferenceClient, LinkOpener, LinkTarget, PredictionResult};

/// Longest single sleep while waiting, so a stop request is seen quickly
const SLEEP_SLICE: Duration = Duration::from_millis(25);

/// Session timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Link read timeout and transport backoff
    pub link: LinkConfig,
    /// Pause after each successful prediction
    pub prediction_pause: Duration,
    /// Period of the diagnosis refresh loop
    pub refresh_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            prediction_pause: Duration::from_millis(300),
            refresh_interval: Duration::from_millis(500),
        }
    }
}

impl SessionConfig {
    /// Set the link configuration
    pub fn with_link(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    /// Set the pause after each prediction
    pub fn with_prediction_pause(mut self, pause: Duration) -> Self {
        self.prediction_pause = pause;
        self
    }

    /// Set the diagnosis refresh period
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }
}

/// Connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No link
    Disconnected,
    /// Link is being opened
    Connecting,
    /// Link open, loops running
    Streaming,
}

/// Status updates for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkStatus {
    /// Opening the link
    Connecting,
    /// Link open and loops running
    Connected,
    /// Disconnected on request
    Disconnected,
    /// The link could not be opened
    ConnectFailed(String),
    /// A read failed; the loop backs off and keeps going
    TransportError(String),
    /// One sample could not be classified
    InferenceFailed(String),
    /// The peer closed the link
    LinkClosed,
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnected => write!(f, "Disconnected"),
            Self::ConnectFailed(e) => write!(f, "Connection failed: {}", e),
            Self::TransportError(e) => write!(f, "Transport error: {}", e),
            Self::InferenceFailed(e) => write!(f, "Inference failed: {}", e),
            Self::LinkClosed => write!(f, "Link closed"),
        }
    }
}

/// Receives session events
///
/// Called from the session's worker threads. Implementations should return
/// quickly; a slow observer delays the loop that called it.
pub trait SessionObserver: Send + Sync {
    /// Connection status changed or a transient failure happened
    fn on_status(&self, _status: &LinkStatus) {}

    /// A sample was classified
    fn on_prediction(&self, _label: &str, _confidence: f64, _intensity: f64) {}

    /// Periodic diagnosis
    fn on_diagnosis(&self, _diagnosis: &DiagnosisRecord) {}
}

impl SessionObserver for () {}

#[derive(Default)]
struct SharedState {
    history: HistoryBuffer,
    latest: Option<PredictionResult>,
}

impl SharedState {
    fn reset(&mut self) {
        self.history.clear();
        self.latest = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sleep up to `total`, returning early once `running` is cleared
fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let deadline = Instant::now() + total;
    loop {
        if !running.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

/// One logical sensor connection with its ingestion and refresh loops
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use fisiotech_core::{InferenceClient, InferenceError, LinkTarget, PredictionResult, Session};
/// use fisiotech_core::stream::{ScriptedLink, ScriptedOpener, Step};
///
/// struct Fixed;
/// impl InferenceClient for Fixed {
///     fn predict(&self, _features: &[f64]) -> Result<PredictionResult, InferenceError> {
///         PredictionResult::new("reposo", 0.9)
///     }
/// }
///
/// let opener = ScriptedOpener::new();
/// opener.push_link(ScriptedLink::new(Step::lines(["1,2,3,4,5,6,0.5"])));
///
/// let mut session = Session::new(opener, Arc::new(Fixed));
/// session.connect(LinkTarget::new("scripted")).unwrap();
/// session.disconnect();
/// ```
pub struct Session<O: LinkOpener> {
    opener: O,
    client: Arc<dyn InferenceClient>,
    observer: Arc<dyn SessionObserver>,
    config: SessionConfig,
    state: Arc<Mutex<ConnectionState>>,
    shared: Arc<Mutex<SharedState>>,
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    target: Option<LinkTarget>,
}

impl<O: LinkOpener> Session<O> {
    /// Disconnected session with default timing and no observer
    pub fn new(opener: O, client: Arc<dyn InferenceClient>) -> Self {
        Self {
            opener,
            client,
            observer: Arc::new(()),
            config: SessionConfig::default(),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            shared: Arc::new(Mutex::new(SharedState::default())),
            running: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
            target: None,
        }
    }

    /// Set the timing configuration
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the event observer
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Current state
    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    /// Target of the current or last connection
    pub fn target(&self) -> Option<&LinkTarget> {
        self.target.as_ref()
    }

    /// Copy of the history
    pub fn history(&self) -> HistorySnapshot {
        lock(&self.shared).history.snapshot()
    }

    /// Most recent successful prediction
    pub fn latest_prediction(&self) -> Option<PredictionResult> {
        lock(&self.shared).latest.clone()
    }

    /// Diagnose the current history
    pub fn diagnosis(&self) -> DiagnosisRecord {
        StabilityDiagnoser::diagnose_snapshot(&self.history())
    }

    /// Open the link and start both loops
    ///
    /// Fails with [`SessionError::AlreadyConnected`] unless the session is
    /// disconnected. A failed open leaves it disconnected.
    pub fn connect(&mut self, target: LinkTarget) -> Result<(), SessionError> {
        {
            let mut state = lock(&self.state);
            if *state != ConnectionState::Disconnected {
                return Err(SessionError::AlreadyConnected);
            }
            *state = ConnectionState::Connecting;
        }

        // Loops that ended on their own (peer closed the link)
        self.join_workers();

        info!("Connecting to {}", target);
        self.observer.on_status(&LinkStatus::Connecting);
        lock(&self.shared).reset();

        let link = match self.opener.open(&target) {
            Ok(link) => link,
            Err(source) => {
                error!("Failed to open {}: {}", target, source);
                self.set_state(ConnectionState::Disconnected);
                self.observer.on_status(&LinkStatus::ConnectFailed(source.to_string()));
                return Err(SessionError::Connect {
                    target: target.to_string(),
                    source,
                });
            }
        };

        self.running.store(true, Ordering::Release);
        self.set_state(ConnectionState::Streaming);

        if let Err(e) = self.spawn_workers(link) {
            self.running.store(false, Ordering::Release);
            self.join_workers();
            self.set_state(ConnectionState::Disconnected);
            self.observer.on_status(&LinkStatus::ConnectFailed(e.to_string()));
            return Err(e);
        }

        info!("Streaming from {}", target);
        self.observer.on_status(&LinkStatus::Connected);
        self.target = Some(target);
        Ok(())
    }

    /// Stop both loops, release the link and clear the history
    ///
    /// Does nothing when already disconnected.
    pub fn disconnect(&mut self) {
        let was_connected = self.state() != ConnectionState::Disconnected;

        self.running.store(false, Ordering::Release);
        self.join_workers();

        if was_connected {
            lock(&self.shared).reset();
            self.set_state(ConnectionState::Disconnected);
            info!("Disconnected");
            self.observer.on_status(&LinkStatus::Disconnected);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }

    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Session worker panicked");
            }
        }
    }

    fn spawn_workers(&mut self, link: O::Link) -> Result<(), SessionError> {
        let ingestion = Ingestion {
            reader: SensorLinkReader::with_config(link, self.config.link),
            client: Arc::clone(&self.client),
            observer: Arc::clone(&self.observer),
            shared: Arc::clone(&self.shared),
            state: Arc::clone(&self.state),
            running: Arc::clone(&self.running),
            prediction_pause: self.config.prediction_pause,
        };
        let handle = thread::Builder::new()
            .name("fisiotech-ingest".into())
            .spawn(move || ingestion.run())
            .map_err(|source| SessionError::Spawn {
                name: "ingestion",
                source,
            })?;
        self.workers.push(handle);

        let observer = Arc::clone(&self.observer);
        let shared = Arc::clone(&self.shared);
        let running = Arc::clone(&self.running);
        let interval = self.config.refresh_interval;
        let handle = thread::Builder::new()
            .name("fisiotech-refresh".into())
            .spawn(move || refresh_loop(&running, &shared, observer.as_ref(), interval))
            .map_err(|source| SessionError::Spawn {
                name: "refresh",
                source,
            })?;
        self.workers.push(handle);

        Ok(())
    }
}

impl<O: LinkOpener> Drop for Session<O> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Everything the ingestion thread owns
struct Ingestion<R> {
    reader: SensorLinkReader<R>,
    client: Arc<dyn InferenceClient>,
    observer: Arc<dyn SessionObserver>,
    shared: Arc<Mutex<SharedState>>,
    state: Arc<Mutex<ConnectionState>>,
    running: Arc<AtomicBool>,
    prediction_pause: Duration,
}

impl<R: std::io::Read> Ingestion<R> {
    fn run(self) {
        let Self {
            mut reader,
            client,
            observer,
            shared,
            state,
            running,
            prediction_pause,
        } = self;
        let backoff = reader.backoff();

        while running.load(Ordering::Acquire) {
            let sample = match reader.poll_next() {
                Ok(sample) => sample,
                Err(nb::Error::WouldBlock) => continue,
                Err(nb::Error::Other(StreamError::Transport(e))) => {
                    warn!("Sensor read failed: {}", e);
                    observer.on_status(&LinkStatus::TransportError(e.to_string()));
                    sleep_while_running(&running, backoff);
                    continue;
                }
                Err(nb::Error::Other(StreamError::EndOfStream)) => {
                    info!("Sensor link closed ({} samples)", reader.stats().samples_parsed);
                    running.store(false, Ordering::Release);
                    drop(reader);
                    lock(&shared).reset();
                    *lock(&state) = ConnectionState::Disconnected;
                    observer.on_status(&LinkStatus::LinkClosed);
                    return;
                }
            };

            let features = FeatureVector::derive(&sample);
            match client.predict(features.as_slice()) {
                Ok(prediction) => {
                    debug!(
                        "{} ({:.3}) intensity {:.3}",
                        prediction.label, prediction.confidence, sample.intensity
                    );
                    {
                        let mut guard = lock(&shared);
                        guard.history.record(sample.intensity, prediction.confidence);
                        guard.latest = Some(prediction.clone());
                    }
                    observer.on_prediction(&prediction.label, prediction.confidence, sample.intensity);
                    sleep_while_running(&running, prediction_pause);
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!("Inference failed, sample skipped: {}", e);
                    } else {
                        error!("Inference rejected sample: {}", e);
                    }
                    observer.on_status(&LinkStatus::InferenceFailed(e.to_string()));
                    sleep_while_running(&running, backoff);
                }
            }
        }

        debug!("Ingestion stopped after {} lines", reader.stats().lines_processed);
    }
}

fn refresh_loop(
    running: &AtomicBool,
    shared: &Mutex<SharedState>,
    observer: &dyn SessionObserver,
    interval: Duration,
) {
    loop {
        sleep_while_running(running, interval);

        // Both stop paths clear `running` before taking the lock to reset
        let snapshot = {
            let guard = lock(shared);
            if !running.load(Ordering::Acquire) {
                return;
            }
            guard.history.snapshot()
        };
        let diagnosis = StabilityDiagnoser::diagnose_snapshot(&snapshot);
        debug!("Diagnosis: {} over {} samples", diagnosis.severity, snapshot.len());
        observer.on_diagnosis(&diagnosis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timing() {
        let config = SessionConfig::default();
        assert_eq!(config.prediction_pause, Duration::from_millis(300));
        assert_eq!(config.refresh_interval, Duration::from_millis(500));
        assert_eq!(config.link.backoff, Duration::from_millis(500));
    }

    #[test]
    fn sleep_returns_once_stopped() {
        let running = AtomicBool::new(false);
        let start = Instant::now();
        sleep_while_running(&running, Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn status_display() {
        assert_eq!(LinkStatus::LinkClosed.to_string(), "Link closed");
        assert_eq!(
            LinkStatus::TransportError("reset".into()).to_string(),
            "Transport error: reset"
        );
    }
}
