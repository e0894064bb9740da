//! FisioTech Service
//!
//! The two executables of the workspace and the pieces they share:
//!
//! - [`api`]: the inference HTTP API served by `fisiotech-api`
//! - [`monitor`]: the headless presentation driver behind `fisiotech-monitor`
//!
//! Both load a [`HybridModel`](fisiotech_ml::HybridModel) exactly once at
//! start; a load failure is fatal.

pub mod api;
pub mod monitor;

pub use api::{router, serve, ApiError, AppState};
pub use monitor::MonitorObserver;

/// Service version reported by `GET /`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
