//! Sensor lines through a session, the HTTP client and a live API

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fisiotech_connectors::http::{HttpConfig, HttpInferenceClient};
use fisiotech_core::stream::{LinkConfig, ScriptedLink, ScriptedOpener, Step};
use fisiotech_core::{ConnectionState, InferenceClient, InferenceError, LinkTarget, Session, SessionConfig, Severity};
use fisiotech_ml::{HybridModel, ModelArtifacts};
use tokio::runtime::Runtime;

const MODEL_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../fisiotech-ml/tests/fixtures/model");

/// Serve the fixture model on an ephemeral port
///
/// The API lives as long as the returned runtime.
fn start_api() -> (Runtime, SocketAddr) {
    let model = Arc::new(HybridModel::load(&ModelArtifacts::new(MODEL_DIR)).unwrap());
    let runtime = Runtime::new().unwrap();
    let listener = runtime
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();

    runtime.spawn(async move {
        let _ = fisiotech_service::serve(listener, model, std::future::pending()).await;
    });
    (runtime, addr)
}

fn client(addr: SocketAddr) -> HttpInferenceClient {
    HttpInferenceClient::new(HttpConfig::new(format!("http://{}", addr))).unwrap()
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

#[test]
fn http_client_against_live_api() {
    let (_runtime, addr) = start_api();
    let client = client(addr);

    let mut features = [0.0; 10];
    features[6] = 0.9;
    features[9] = 2.0;
    let result = client.predict(&features).unwrap();
    assert_eq!(result.label, "estiramiento");
    assert_eq!(result.confidence, 0.525);

    let err = client.predict(&features[..9]).unwrap_err();
    assert_eq!(
        err,
        InferenceError::Rejected("X has 9 features, but the model expects 10.".into())
    );

    let health = client.health().unwrap();
    assert_eq!(health.classes, vec!["reposo", "movimiento", "estiramiento"]);
}

#[test]
fn session_streams_through_remote_model() {
    let (_runtime, addr) = start_api();

    // accel (1,0,0), gyro (2,0,0): energy 2.0
    let mut lines = vec!["1,0,0,2,0,0,0.3"; 6];
    lines.insert(3, "abc,1,2");
    lines.extend(vec!["1,0,0,2,0,0,0.9"; 6]);

    let opener = ScriptedOpener::new();
    opener.push_link(ScriptedLink::new(Step::lines(lines)).hold_open(Duration::from_millis(5)));

    let config = SessionConfig::default()
        .with_link(LinkConfig::default().with_backoff(Duration::from_millis(5)))
        .with_prediction_pause(Duration::ZERO)
        .with_refresh_interval(Duration::from_millis(10));
    let mut session = Session::new(opener, Arc::new(client(addr))).with_config(config);

    session.connect(LinkTarget::new("scripted")).unwrap();
    assert!(wait_until(|| session.history().len() == 12));

    let latest = session.latest_prediction().unwrap();
    assert_eq!(latest.label, "estiramiento");
    assert_eq!(latest.confidence, 0.525);

    // Two intensity plateaus and middling confidence: not stable
    let diagnosis = session.diagnosis();
    assert_eq!(diagnosis.metrics.samples, 12);
    assert_ne!(diagnosis.severity, Severity::Stable);
    assert_ne!(diagnosis.severity, Severity::Insufficient);

    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
}
