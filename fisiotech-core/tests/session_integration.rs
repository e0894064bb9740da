//! Integration tests for the streaming session
//!
//! Drives a real [`Session`] over scripted links and checks the
//! connection state machine, history bookkeeping and handle release.

mod common;

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use fisiotech_core::stream::{ScriptedLink, ScriptedOpener, Step};
use fisiotech_core::{
    ConnectionState, LinkOpener, LinkStatus, LinkTarget, Session, SessionError, Severity,
    FEATURE_COUNT,
};

use common::{fast_config, wait_until, RecordingObserver, ScriptedClient};

fn open_link(lines: &[&str]) -> ScriptedLink {
    ScriptedLink::new(Step::lines(lines.iter().copied())).hold_open(Duration::from_millis(5))
}

#[test]
fn malformed_line_does_not_stop_ingestion() {
    let opener = ScriptedOpener::new();
    opener.push_link(open_link(&["abc,1,2", "0.1,0.9,0.2,1.0,0.5,0.1,0.7"]));
    let client = Arc::new(ScriptedClient::new("movimiento", 0.9));
    let observer = Arc::new(RecordingObserver::default());

    let mut session = Session::new(opener, client.clone())
        .with_config(fast_config())
        .with_observer(observer.clone());
    session.connect(LinkTarget::new("scripted")).unwrap();

    assert!(wait_until(|| session.history().len() == 1));
    assert_eq!(client.calls(), 1);
    assert_eq!(client.widths(), vec![FEATURE_COUNT]);
    assert_eq!(&session.history().intensity[..], &[0.7]);
    assert_eq!(
        observer.predictions(),
        vec![("movimiento".to_string(), 0.9, 0.7)]
    );
    assert_eq!(session.latest_prediction().map(|p| p.label), Some("movimiento".to_string()));
    assert_eq!(session.state(), ConnectionState::Streaming);

    session.disconnect();
}

#[test]
fn disconnect_releases_link_exactly_once() {
    let opener = ScriptedOpener::new();
    opener.push_link(open_link(&["1,1,1,1,1,1,0.5"]));
    let client = Arc::new(ScriptedClient::new("reposo", 0.8));

    let mut session = Session::new(opener, client).with_config(fast_config());
    session.connect(LinkTarget::new("scripted")).unwrap();
    assert!(wait_until(|| session.history().len() == 1));

    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.history().is_empty());
    assert!(session.latest_prediction().is_none());

    // No-op when already disconnected
    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

#[test]
fn handle_release_is_counted_across_drop() {
    let opener = Arc::new(ScriptedOpener::new());
    opener.push_link(open_link(&[]));
    let client = Arc::new(ScriptedClient::new("reposo", 0.8));

    let mut session = Session::new(SharedOpener(opener.clone()), client).with_config(fast_config());
    session.connect(LinkTarget::new("scripted")).unwrap();
    assert_eq!(opener.opened(), 1);
    assert_eq!(opener.dropped(), 0);

    session.disconnect();
    assert_eq!(opener.dropped(), 1);
    session.disconnect();
    drop(session);
    assert_eq!(opener.dropped(), 1);
}

#[test]
fn peer_close_forces_disconnected() {
    let opener = Arc::new(ScriptedOpener::new());
    opener.push_link(ScriptedLink::new(Step::lines(["1,1,1,1,1,1,0.5"])));
    let client = Arc::new(ScriptedClient::new("reposo", 0.8));
    let observer = Arc::new(RecordingObserver::default());

    let mut session = Session::new(SharedOpener(opener.clone()), client)
        .with_config(fast_config())
        .with_observer(observer.clone());
    session.connect(LinkTarget::new("scripted")).unwrap();

    assert!(wait_until(|| session.state() == ConnectionState::Disconnected));
    assert_eq!(opener.dropped(), 1);
    assert!(session.history().is_empty());
    assert!(wait_until(|| observer.statuses().contains(&LinkStatus::LinkClosed)));

    // A closed session can be reconnected
    opener.push_link(open_link(&[]));
    session.connect(LinkTarget::new("scripted")).unwrap();
    assert_eq!(session.state(), ConnectionState::Streaming);
    session.disconnect();
    assert_eq!(opener.dropped(), 2);
}

#[test]
fn failed_inference_skips_sample() {
    let opener = ScriptedOpener::new();
    opener.push_link(open_link(&["1,1,1,1,1,1,0.1", "1,1,1,1,1,1,0.2"]));
    let client = Arc::new(ScriptedClient::new("estiramiento", 0.6).failing_on(&[0]));
    let observer = Arc::new(RecordingObserver::default());

    let mut session = Session::new(opener, client.clone())
        .with_config(fast_config())
        .with_observer(observer.clone());
    session.connect(LinkTarget::new("scripted")).unwrap();

    assert!(wait_until(|| client.calls() == 2));
    assert!(wait_until(|| session.history().len() == 1));
    assert_eq!(&session.history().intensity[..], &[0.2]);
    assert_eq!(&session.history().confidence[..], &[0.6]);
    assert!(observer
        .statuses()
        .iter()
        .any(|s| matches!(s, LinkStatus::InferenceFailed(_))));
    assert_eq!(session.state(), ConnectionState::Streaming);

    session.disconnect();
}

#[test]
fn transport_error_keeps_streaming() {
    let opener = ScriptedOpener::new();
    let mut steps = vec![Step::Error(ErrorKind::Other)];
    steps.extend(Step::lines(["1,1,1,1,1,1,0.3"]));
    opener.push_link(ScriptedLink::new(steps).hold_open(Duration::from_millis(5)));
    let observer = Arc::new(RecordingObserver::default());

    let mut session = Session::new(opener, Arc::new(ScriptedClient::new("reposo", 0.9)))
        .with_config(fast_config())
        .with_observer(observer.clone());
    session.connect(LinkTarget::new("scripted")).unwrap();

    assert!(wait_until(|| session.history().len() == 1));
    assert!(observer
        .statuses()
        .iter()
        .any(|s| matches!(s, LinkStatus::TransportError(_))));

    session.disconnect();
}

#[test]
fn connect_twice_is_rejected() {
    let opener = ScriptedOpener::new();
    opener.push_link(open_link(&[]));
    opener.push_link(open_link(&[]));

    let mut session = Session::new(opener, Arc::new(ScriptedClient::new("reposo", 0.9)))
        .with_config(fast_config());
    session.connect(LinkTarget::new("a")).unwrap();

    assert!(matches!(
        session.connect(LinkTarget::new("b")),
        Err(SessionError::AlreadyConnected)
    ));
    assert_eq!(session.target().map(|t| t.address.as_str()), Some("a"));
    session.disconnect();
}

#[test]
fn failed_open_stays_disconnected() {
    let opener = ScriptedOpener::new();
    opener.push_failure(ErrorKind::NotFound);
    let observer = Arc::new(RecordingObserver::default());

    let mut session = Session::new(opener, Arc::new(ScriptedClient::new("reposo", 0.9)))
        .with_observer(observer.clone());

    let err = session.connect(LinkTarget::new("/dev/ttyUSB9")).unwrap_err();
    assert!(matches!(err, SessionError::Connect { .. }));
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(matches!(
        observer.statuses().last(),
        Some(LinkStatus::ConnectFailed(_))
    ));
}

#[test]
fn refresh_loop_reports_diagnoses() {
    let opener = ScriptedOpener::new();
    let lines: Vec<String> = (0..12).map(|_| "0,0,1,0,0,0,0.5".to_string()).collect();
    opener.push_link(open_link(&lines.iter().map(String::as_str).collect::<Vec<_>>()));
    let observer = Arc::new(RecordingObserver::default());

    let mut session = Session::new(opener, Arc::new(ScriptedClient::new("reposo", 0.9)))
        .with_config(fast_config())
        .with_observer(observer.clone());
    session.connect(LinkTarget::new("scripted")).unwrap();

    assert!(wait_until(|| session.history().len() == 12));
    assert!(wait_until(|| observer
        .last_diagnosis()
        .map_or(false, |d| d.severity == Severity::Stable)));
    assert_eq!(session.diagnosis().severity, Severity::Stable);

    session.disconnect();
    let after = observer.diagnosis_count();
    std::thread::sleep(Duration::from_millis(40));
    assert_eq!(observer.diagnosis_count(), after);
}

/// Lets a test keep a handle on the opener the session owns
struct SharedOpener(Arc<ScriptedOpener>);

impl LinkOpener for SharedOpener {
    type Link = ScriptedLink;

    fn open(&self, target: &LinkTarget) -> std::io::Result<ScriptedLink> {
        self.0.open(target)
    }
}
