//! In-process inference client
//!
//! Runs a [`HybridModel`] on a dedicated worker thread. Each call sends a
//! job over a channel and waits for the answer with a bounded timeout, so a
//! slow model delays the ingestion loop by at most that timeout.
//!
//! ```text
//!   predict() ──► jobs channel ──► worker thread ──► HybridModel::predict
//!       ▲                                                   │
//!       └──── recv_timeout(timeout) ◄── reply channel ◄─────┘
//! ```

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fisiotech_core::{InferenceClient, InferenceError, PredictionResult};
use log::{debug, error};

use crate::pipeline::{Classification, HybridModel};
use crate::{MLError, MLResult};

/// Default per-call timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

struct Job {
    features: Vec<f64>,
    reply: Sender<MLResult<Classification>>,
}

/// [`InferenceClient`] backed by a model on a worker thread
pub struct LocalInferenceClient {
    jobs: Mutex<Option<Sender<Job>>>,
    worker: Option<JoinHandle<()>>,
    timeout: Duration,
}

impl LocalInferenceClient {
    /// Move `model` onto a new worker thread
    pub fn spawn(model: HybridModel) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let worker = thread::Builder::new()
            .name("fisiotech-model".into())
            .spawn(move || {
                for job in rx {
                    // Receiver may have timed out and gone away
                    let _ = job.reply.send(model.predict(&job.features));
                }
                debug!("Model worker stopped");
            })?;

        Ok(Self {
            jobs: Mutex::new(Some(tx)),
            worker: Some(worker),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-call timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl InferenceClient for LocalInferenceClient {
    fn predict(&self, features: &[f64]) -> Result<PredictionResult, InferenceError> {
        let (reply, answer) = mpsc::channel();
        let job = Job {
            features: features.to_vec(),
            reply,
        };

        {
            let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            let sender = jobs
                .as_ref()
                .ok_or_else(|| InferenceError::Transport("model worker stopped".into()))?;
            sender
                .send(job)
                .map_err(|_| InferenceError::Transport("model worker stopped".into()))?;
        }

        match answer.recv_timeout(self.timeout) {
            Ok(Ok(classification)) => Ok(classification.into_prediction()),
            Ok(Err(e @ MLError::FeatureCount { .. })) => Err(InferenceError::Rejected(e.to_string())),
            Ok(Err(e)) => Err(InferenceError::Transport(e.to_string())),
            Err(RecvTimeoutError::Timeout) => Err(InferenceError::Timeout {
                millis: self.timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(InferenceError::Transport("model worker stopped".into()))
            }
        }
    }
}

impl Drop for LocalInferenceClient {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Model worker panicked");
            }
        }
    }
}
