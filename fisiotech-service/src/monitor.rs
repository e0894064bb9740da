//! Headless presentation layer
//!
//! Logs what a dashboard would draw: the connection status, every
//! prediction with its confidence band, and the periodic diagnosis. With
//! `json` set, diagnoses are also printed to stdout as JSON lines for other
//! tools to consume.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use fisiotech_core::{
    ConfidenceLevel, DiagnosisRecord, LinkOpener, LinkStatus, Session, SessionObserver, Severity, StabilityDiagnoser,
};
use log::{error, info, warn};

/// [`SessionObserver`] that reports through `log` and optionally stdout
#[derive(Debug, Default)]
pub struct MonitorObserver {
    json: bool,
    closed: AtomicBool,
    predictions: AtomicU64,
    last_diagnosis: Mutex<Option<DiagnosisRecord>>,
}

impl MonitorObserver {
    /// Observer; `json` prints every diagnosis as one JSON line
    pub fn new(json: bool) -> Self {
        Self {
            json,
            ..Self::default()
        }
    }

    /// The link closed on its own
    pub fn link_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Predictions received so far
    pub fn predictions(&self) -> u64 {
        self.predictions.load(Ordering::Relaxed)
    }

    /// Most recent periodic diagnosis
    pub fn last_diagnosis(&self) -> Option<DiagnosisRecord> {
        *self.last_diagnosis.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Diagnosis to report when the monitor stops
    ///
    /// Must be called before [`Session::disconnect`], which clears the
    /// history. A session whose link already closed has lost its history
    /// too, so the last periodic diagnosis stands in for it.
    pub fn closing_diagnosis<O: LinkOpener>(&self, session: &Session<O>) -> Option<DiagnosisRecord> {
        let history = session.history();
        if history.is_empty() {
            self.last_diagnosis()
        } else {
            Some(StabilityDiagnoser::diagnose_snapshot(&history))
        }
    }

    fn print_json(&self, diagnosis: &DiagnosisRecord) {
        let line = match serde_json::to_string(diagnosis) {
            Ok(line) => line,
            Err(e) => {
                error!("Diagnosis not serializable: {}", e);
                return;
            }
        };
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", line).and_then(|_| stdout.flush()) {
            warn!("stdout: {}", e);
        }
    }
}

impl SessionObserver for MonitorObserver {
    fn on_status(&self, status: &LinkStatus) {
        match status {
            LinkStatus::Connecting | LinkStatus::Connected | LinkStatus::Disconnected => info!("{}", status),
            LinkStatus::LinkClosed => {
                self.closed.store(true, Ordering::Release);
                warn!("{}", status);
            }
            LinkStatus::ConnectFailed(_) | LinkStatus::TransportError(_) | LinkStatus::InferenceFailed(_) => {
                warn!("{}", status)
            }
        }
    }

    fn on_prediction(&self, label: &str, confidence: f64, intensity: f64) {
        self.predictions.fetch_add(1, Ordering::Relaxed);
        info!(
            "{:<14} confidence {:.3} ({:?})  intensity {:.3}",
            label,
            confidence,
            ConfidenceLevel::from_confidence(confidence),
            intensity
        );
    }

    fn on_diagnosis(&self, diagnosis: &DiagnosisRecord) {
        *self.last_diagnosis.lock().unwrap_or_else(PoisonError::into_inner) = Some(*diagnosis);
        if self.json {
            self.print_json(diagnosis);
        }
        if diagnosis.severity != Severity::Insufficient {
            info!(
                "[{}] {}: {} {}",
                diagnosis.severity, diagnosis.title, diagnosis.message, diagnosis.recommended_action
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_closure_and_predictions() {
        let observer = MonitorObserver::new(false);
        assert!(!observer.link_closed());

        observer.on_prediction("reposo", 0.9, 0.1);
        observer.on_status(&LinkStatus::TransportError("reset".into()));
        assert!(!observer.link_closed());

        observer.on_status(&LinkStatus::LinkClosed);
        assert!(observer.link_closed());
        assert_eq!(observer.predictions(), 1);
    }

    #[test]
    fn keeps_latest_diagnosis() {
        let observer = MonitorObserver::new(false);
        assert!(observer.last_diagnosis().is_none());

        let stable = StabilityDiagnoser::diagnose(&[0.5; 12], &[0.9; 12]);
        observer.on_diagnosis(&stable);
        assert_eq!(observer.last_diagnosis(), Some(stable));
    }
}
