//! Common test utilities for session integration tests
//!
//! - [`ScriptedClient`]: inference client with scripted failures
//! - [`RecordingObserver`]: collects every session event
//! - [`wait_until`]: bounded polling for asynchronous conditions

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use fisiotech_core::{
    DiagnosisRecord, InferenceClient, InferenceError, LinkStatus, PredictionResult, SessionConfig,
    SessionObserver,
};
use fisiotech_core::stream::LinkConfig;

/// Timing that keeps tests fast
pub fn fast_config() -> SessionConfig {
    SessionConfig::default()
        .with_link(
            LinkConfig::default()
                .with_read_timeout(Duration::from_millis(5))
                .with_backoff(Duration::from_millis(5)),
        )
        .with_prediction_pause(Duration::ZERO)
        .with_refresh_interval(Duration::from_millis(10))
}

/// Poll `cond` until it holds or two seconds pass
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Inference client answering with a fixed label, failing the calls listed
/// in `fail_calls` (0-based)
pub struct ScriptedClient {
    label: &'static str,
    confidence: f64,
    fail_calls: Vec<usize>,
    calls: AtomicUsize,
    widths: Mutex<Vec<usize>>,
}

impl ScriptedClient {
    pub fn new(label: &'static str, confidence: f64) -> Self {
        Self {
            label,
            confidence,
            fail_calls: Vec::new(),
            calls: AtomicUsize::new(0),
            widths: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, calls: &[usize]) -> Self {
        self.fail_calls = calls.to_vec();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Feature vector widths seen so far
    pub fn widths(&self) -> Vec<usize> {
        self.widths.lock().unwrap().clone()
    }
}

impl InferenceClient for ScriptedClient {
    fn predict(&self, features: &[f64]) -> Result<PredictionResult, InferenceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.widths.lock().unwrap().push(features.len());
        if self.fail_calls.contains(&call) {
            return Err(InferenceError::Timeout { millis: 2000 });
        }
        PredictionResult::new(self.label, self.confidence)
    }
}

/// Observer recording every callback
#[derive(Default)]
pub struct RecordingObserver {
    pub statuses: Mutex<Vec<LinkStatus>>,
    pub predictions: Mutex<Vec<(String, f64, f64)>>,
    pub diagnoses: Mutex<Vec<DiagnosisRecord>>,
}

impl RecordingObserver {
    pub fn statuses(&self) -> Vec<LinkStatus> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn predictions(&self) -> Vec<(String, f64, f64)> {
        self.predictions.lock().unwrap().clone()
    }

    pub fn diagnosis_count(&self) -> usize {
        self.diagnoses.lock().unwrap().len()
    }

    pub fn last_diagnosis(&self) -> Option<DiagnosisRecord> {
        self.diagnoses.lock().unwrap().last().copied()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_status(&self, status: &LinkStatus) {
        self.statuses.lock().unwrap().push(status.clone());
    }

    fn on_prediction(&self, label: &str, confidence: f64, intensity: f64) {
        self.predictions.lock().unwrap().push((label.to_string(), confidence, intensity));
    }

    fn on_diagnosis(&self, diagnosis: &DiagnosisRecord) {
        self.diagnoses.lock().unwrap().push(*diagnosis);
    }
}
