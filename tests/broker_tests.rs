use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;

use askme::broker::{BrokerError, RequestBroker};
use askme::config::Config;
use askme::launcher::TerminalLaunch;
use askme::tool;

fn test_config(timeout_ms: u64) -> Config {
    Config {
        terminal_app: "TestTerm".to_string(),
        timeout_ms,
        double_enter_ms: 500,
    }
}

type SeenPath = Arc<Mutex<Option<PathBuf>>>;

fn seen(handle: &SeenPath) -> PathBuf {
    handle
        .lock()
        .expect("lock")
        .clone()
        .expect("launcher was never invoked")
}

/// Stands in for the real terminal: records the socket path it was handed
/// and optionally spawns an in-process "editor" that writes `reply_bytes`.
struct ScriptedLauncher {
    seen_path: SeenPath,
    reply_bytes: Option<&'static [u8]>,
}

impl ScriptedLauncher {
    fn replying(bytes: &'static [u8]) -> (Self, SeenPath) {
        let seen_path = SeenPath::default();
        (
            Self {
                seen_path: Arc::clone(&seen_path),
                reply_bytes: Some(bytes),
            },
            seen_path,
        )
    }

    fn silent() -> (Self, SeenPath) {
        let seen_path = SeenPath::default();
        (
            Self {
                seen_path: Arc::clone(&seen_path),
                reply_bytes: None,
            },
            seen_path,
        )
    }
}

impl TerminalLaunch for ScriptedLauncher {
    fn launch(
        &self,
        _prompt: &str,
        socket_path: &Path,
        _terminal_app: &str,
    ) -> Result<(), BrokerError> {
        *self.seen_path.lock().expect("lock") = Some(socket_path.to_path_buf());
        if let Some(bytes) = self.reply_bytes {
            let path = socket_path.to_path_buf();
            tokio::spawn(async move {
                let mut stream = UnixStream::connect(&path).await.expect("connect");
                stream.write_all(bytes).await.expect("write");
                stream.shutdown().await.expect("shutdown");
            });
        }
        Ok(())
    }
}

struct FailingLauncher;

impl TerminalLaunch for FailingLauncher {
    fn launch(
        &self,
        _prompt: &str,
        _socket_path: &Path,
        terminal_app: &str,
    ) -> Result<(), BrokerError> {
        Err(BrokerError::Launch {
            app: terminal_app.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such application"),
        })
    }
}

#[tokio::test]
async fn test_reply_resolves_broker_and_removes_socket() {
    let (launcher, seen_path) =
        ScriptedLauncher::replying(br#"{"ask_me":"go ahead","timestamp":1700000000000}"#);
    let broker = RequestBroker::with_launcher(test_config(5_000), launcher);

    let message = broker.open("ship it?").await.expect("reply");
    assert_eq!(message.ask_me, "go ahead");
    assert_eq!(message.timestamp, 1_700_000_000_000);
    assert!(message.images.is_empty());
    assert!(!seen(&seen_path).exists(), "socket must be removed");
}

#[tokio::test]
async fn test_timeout_fails_fast_and_removes_socket() {
    let (launcher, seen_path) = ScriptedLauncher::silent();
    let broker = RequestBroker::with_launcher(test_config(50), launcher);

    let started = Instant::now();
    let result = broker.open("anyone there?").await;
    let elapsed = started.elapsed();

    let err = result.expect_err("must time out");
    assert!(matches!(err, BrokerError::Timeout { ms: 50 }));
    assert!(
        elapsed >= Duration::from_millis(50) && elapsed < Duration::from_millis(500),
        "timeout fired after {elapsed:?}"
    );
    assert!(!seen(&seen_path).exists(), "socket must be removed");
}

#[tokio::test]
async fn test_launch_failure_surfaces_app_name() {
    let broker = RequestBroker::with_launcher(test_config(5_000), FailingLauncher);
    let err = broker.open("q").await.expect_err("launch must fail");
    match err {
        BrokerError::Launch { app, .. } => assert_eq!(app, "TestTerm"),
        other => panic!("expected launch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_garbage_reply_is_malformed_and_removes_socket() {
    let (launcher, seen_path) = ScriptedLauncher::replying(b"this is not json");
    let broker = RequestBroker::with_launcher(test_config(5_000), launcher);
    let err = broker.open("q").await.expect_err("must fail");
    assert!(matches!(err, BrokerError::MalformedReply));
    assert!(!seen(&seen_path).exists(), "socket must be removed");
}

#[tokio::test]
async fn test_reply_with_image_round_trips() {
    let (launcher, _seen) = ScriptedLauncher::replying(
        br#"{"ask_me":"see [Image #1]","timestamp":3,"images":[{"id":"Image #1","data":"data:image/png;base64,aGk=","mimeType":"image/png","size":2,"placeholder":"[Image #1]"}]}"#,
    );
    let broker = RequestBroker::with_launcher(test_config(5_000), launcher);
    let message = broker.open("q").await.expect("reply");
    assert_eq!(message.images.len(), 1);
    assert_eq!(message.images[0].mime_type, "image/png");
}

#[tokio::test]
async fn test_tool_wrapper_degrades_failures_to_text() {
    let broker = RequestBroker::with_launcher(test_config(5_000), FailingLauncher);
    let reply = tool::confirm_with_broker(&broker, "q").await;
    assert!(reply.text.contains("Error collecting user confirmation"));
    assert!(reply.text.contains("TestTerm"));
    assert!(reply.images.is_empty());

    let (launcher, _seen) = ScriptedLauncher::silent();
    let broker = RequestBroker::with_launcher(test_config(50), launcher);
    let reply = tool::confirm_with_broker(&broker, "q").await;
    assert!(reply.text.contains("No response from user"));
}

#[tokio::test]
async fn test_tool_wrapper_replaces_blank_reply_text() {
    let (launcher, _seen) = ScriptedLauncher::replying(br#"{"ask_me":"   ","timestamp":2}"#);
    let broker = RequestBroker::with_launcher(test_config(5_000), launcher);
    let reply = tool::confirm_with_broker(&broker, "q").await;
    assert_eq!(reply.text, "User did not enter any content");
}
