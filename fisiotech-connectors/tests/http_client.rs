//! HTTP inference client against a scripted server

#![cfg(feature = "http")]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use fisiotech_connectors::http::{HttpConfig, HttpError, HttpInferenceClient};
use fisiotech_connectors::wire::PredictRequest;
use fisiotech_core::{InferenceClient, InferenceError};

/// Answers each incoming request with the next canned response
///
/// Sends every request body it saw through the returned channel.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let (stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let request_body = read_request(&stream);
            let _ = tx.send(request_body);
            respond(stream, status, body);
        }
    });

    (url, rx)
}

fn read_request(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut content_length = 0;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();
    String::from_utf8(body).unwrap()
}

fn respond(mut stream: TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
}

fn client(url: &str) -> HttpInferenceClient {
    HttpInferenceClient::new(HttpConfig::new(url).timeout(Duration::from_millis(500))).unwrap()
}

#[test]
fn successful_prediction() {
    let (url, requests) = serve(vec![(200, r#"{"prediccion":"movimiento","confianza":0.912}"#)]);
    let client = client(&url);

    let features = [0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.42, 1.0, 0.0, 0.5];
    let result = client.predict(&features).unwrap();
    assert_eq!(result.label, "movimiento");
    assert_eq!(result.confidence, 0.912);

    // Features travel unscaled
    let sent: PredictRequest = serde_json::from_str(&requests.recv().unwrap()).unwrap();
    assert_eq!(sent.features, features.to_vec());

    let stats = client.stats();
    assert_eq!(stats.messages_sent, 1);
    assert_eq!(stats.messages_failed, 0);
    assert!(stats.bytes_sent > 0);
}

#[test]
fn bad_request_is_rejected_with_server_message() {
    let (url, _requests) = serve(vec![(
        400,
        r#"{"error":"X has 9 features, but the model expects 10."}"#,
    )]);

    let err = client(&url).predict(&[0.0; 9]).unwrap_err();
    assert_eq!(
        err,
        InferenceError::Rejected("X has 9 features, but the model expects 10.".into())
    );
}

#[test]
fn server_error_is_transient() {
    let (url, _requests) = serve(vec![(500, r#"{"error":"model exploded"}"#)]);
    let client = client(&url);

    let err = client.predict(&[0.0; 10]).unwrap_err();
    assert!(matches!(err, InferenceError::Transport(_)));
    assert!(err.is_transient());
    assert_eq!(client.stats().messages_failed, 1);
    assert!(client.stats().last_error.unwrap().contains("model exploded"));
}

#[test]
fn retries_after_server_error() {
    let (url, _requests) = serve(vec![
        (503, r#"{"error":"warming up"}"#),
        (200, r#"{"prediccion":"reposo","confianza":0.7}"#),
    ]);
    let client = HttpInferenceClient::new(
        HttpConfig::new(&url)
            .max_retries(1)
            .retry_backoff(Duration::from_millis(10)),
    )
    .unwrap();

    assert_eq!(client.predict(&[0.0; 10]).unwrap().label, "reposo");
    assert_eq!(client.stats().retries, 1);
}

#[test]
fn malformed_body() {
    let (url, _requests) = serve(vec![(200, r#"{"label":"reposo"}"#)]);
    let err = client(&url).predict(&[0.0; 10]).unwrap_err();
    assert!(matches!(err, InferenceError::MalformedResponse(_)));
}

#[test]
fn out_of_range_confidence_is_malformed() {
    let (url, _requests) = serve(vec![(200, r#"{"prediccion":"reposo","confianza":1.7}"#)]);
    let err = client(&url).predict(&[0.0; 10]).unwrap_err();
    assert!(matches!(err, InferenceError::MalformedResponse(_)));
}

#[test]
fn silent_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let (done_tx, done_rx) = mpsc::channel::<()>();
    thread::spawn(move || {
        // Accept and hold the connection without answering
        let conn = listener.accept();
        let _ = done_rx.recv_timeout(Duration::from_secs(5));
        drop(conn);
    });

    let client = HttpInferenceClient::new(HttpConfig::new(&url).timeout(Duration::from_millis(150))).unwrap();
    let err = client.predict(&[0.0; 10]).unwrap_err();
    assert_eq!(err, InferenceError::Timeout { millis: 150 });
    let _ = done_tx.send(());
}

#[test]
fn health_lists_classes() {
    let (url, _requests) = serve(vec![(
        200,
        r#"{"status":"ok","version":"0.1.0","classes":["reposo","movimiento"]}"#,
    )]);
    let health = client(&url).health().unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.classes, vec!["reposo", "movimiento"]);
}

#[test]
fn unreachable_server() {
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let client = client(&format!("http://127.0.0.1:{}", port));
    let err = client.predict_request(&[0.0; 10]).unwrap_err();
    assert!(matches!(err, HttpError::Request(_)));
}
