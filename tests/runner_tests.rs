//! Worker-runner protocol behavior, driven by a scripted coordinator.

use std::time::Duration;

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{accept_async, WebSocketStream};
use uuid::Uuid;

use farmhand::error::FarmhandError;
use farmhand::protocol::{Assignment, Completion, Message};
use farmhand::worker::runner;

async fn next_message<S>(frames: &mut S) -> Message
where
    S: Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match frames.next().await {
                Some(Ok(WsMessage::Binary(data))) => {
                    if let Some(message) = Message::decode(&data) {
                        return message;
                    }
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("socket error: {}", e),
                None => panic!("worker closed the connection unexpectedly"),
            }
        }
    })
    .await
    .expect("timed out waiting for the worker")
}

async fn accept_worker(listener: &TcpListener) -> WebSocketStream<tokio::net::TcpStream> {
    let (stream, _peer) = listener.accept().await.expect("accept");
    accept_async(stream).await.expect("websocket handshake")
}

/// The runner executes an assignment and reports captured output.
#[tokio::test]
async fn test_runner_executes_and_reports_success() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let worker = tokio::spawn(async move { runner::run(&url).await });

    let ws = accept_worker(&listener).await;
    let (mut sink, mut frames) = ws.split();

    let id = Uuid::new_v4();
    let assignment = Message::Assignment(Assignment {
        id,
        command: "echo hello".to_string(),
    });
    sink.send(WsMessage::Binary(assignment.to_bytes()))
        .await
        .unwrap();

    match next_message(&mut frames).await {
        Message::Success(c) => {
            assert_eq!(c.id, id);
            assert!(c.std_out.contains("hello"));
            assert!(c.std_err.is_empty());
        }
        other => panic!("expected success, got {:?}", other),
    }

    // Closing the coordinator side ends the worker cleanly.
    sink.close().await.unwrap();
    let result = worker.await.unwrap();
    assert!(result.is_ok());
}

/// Non-zero exit comes back as a failure with the captured stderr.
#[tokio::test]
async fn test_runner_reports_failure_with_stderr() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let worker = tokio::spawn(async move { runner::run(&url).await });

    let ws = accept_worker(&listener).await;
    let (mut sink, mut frames) = ws.split();

    let id = Uuid::new_v4();
    let assignment = Message::Assignment(Assignment {
        id,
        command: "echo oops >&2; exit 3".to_string(),
    });
    sink.send(WsMessage::Binary(assignment.to_bytes()))
        .await
        .unwrap();

    match next_message(&mut frames).await {
        Message::Failed(c) => {
            assert_eq!(c.id, id);
            assert!(c.std_err.contains("oops"));
        }
        other => panic!("expected failure, got {:?}", other),
    }

    worker.abort();
}

/// A second assignment while one is running is refused immediately and
/// the first job is undisturbed.
#[tokio::test]
async fn test_runner_refuses_second_assignment() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let worker = tokio::spawn(async move { runner::run(&url).await });

    let ws = accept_worker(&listener).await;
    let (mut sink, mut frames) = ws.split();

    let first = Uuid::new_v4();
    let second = Uuid::new_v4();

    sink.send(WsMessage::Binary(
        Message::Assignment(Assignment {
            id: first,
            command: "sleep 1".to_string(),
        })
        .to_bytes(),
    ))
    .await
    .unwrap();
    sink.send(WsMessage::Binary(
        Message::Assignment(Assignment {
            id: second,
            command: "echo never".to_string(),
        })
        .to_bytes(),
    ))
    .await
    .unwrap();

    match next_message(&mut frames).await {
        Message::Failed(c) => {
            assert_eq!(c.id, second);
            assert_eq!(c.std_out, "Already have assignment!");
        }
        other => panic!("expected the refusal first, got {:?}", other),
    }

    match next_message(&mut frames).await {
        Message::Success(c) => assert_eq!(c.id, first),
        other => panic!("expected the first job to finish, got {:?}", other),
    }

    worker.abort();
}

/// Completions flowing toward a worker are a fatal protocol violation.
#[tokio::test]
async fn test_runner_dies_on_confusing_message() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let worker = tokio::spawn(async move { runner::run(&url).await });

    let ws = accept_worker(&listener).await;
    let (mut sink, _frames) = ws.split();

    let confusing = Message::Success(Completion {
        id: Uuid::new_v4(),
        std_out: String::new(),
        std_err: String::new(),
    });
    sink.send(WsMessage::Binary(confusing.to_bytes()))
        .await
        .unwrap();

    let result = worker.await.unwrap();
    assert!(matches!(result, Err(FarmhandError::ConfusingMessage)));
}

/// Frames that decode to nothing are dropped without ending the session.
#[tokio::test]
async fn test_runner_ignores_undecodable_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    let worker = tokio::spawn(async move { runner::run(&url).await });

    let ws = accept_worker(&listener).await;
    let (mut sink, mut frames) = ws.split();

    sink.send(WsMessage::Binary(b"{\"mystery\": 1}".to_vec()))
        .await
        .unwrap();

    let id = Uuid::new_v4();
    sink.send(WsMessage::Binary(
        Message::Assignment(Assignment {
            id,
            command: "true".to_string(),
        })
        .to_bytes(),
    ))
    .await
    .unwrap();

    match next_message(&mut frames).await {
        Message::Success(c) => assert_eq!(c.id, id),
        other => panic!("expected success, got {:?}", other),
    }

    worker.abort();
}
