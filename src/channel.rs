use bytes::BytesMut;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

use crate::broker::BrokerError;
use crate::logging;
use crate::message::{now_millis, AskMeMessage};

const READ_CHUNK: usize = 8 * 1024;

/// Allocates a fresh socket path under the system temp directory, unique per
/// request.
pub fn allocate_socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("askme-socket-{}.sock", now_millis()))
}

/// Removes the socket file. Safe to call from any exit path; a missing file
/// is not an error.
pub fn cleanup_socket(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => logging::emit_event("channel", &format!("removed socket {}", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => logging::emit_error(
            "channel",
            &format!("failed to remove socket {}: {err}", path.display()),
        ),
    }
}

/// Host side of the rendezvous: a unix socket listener that lives for
/// exactly one reply.
#[derive(Debug)]
pub struct ChannelServer {
    listener: UnixListener,
    path: PathBuf,
}

impl ChannelServer {
    pub fn bind(path: &Path) -> Result<Self, BrokerError> {
        let listener = UnixListener::bind(path).map_err(|source| BrokerError::ChannelBind {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            listener,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accepts one connection and reads until the accumulated bytes parse as
    /// a complete message.
    ///
    /// There is no length prefix on the wire; a failed parse while the
    /// connection is open just means more bytes are coming. EOF before a
    /// successful parse is a malformed reply. The socket file is removed
    /// before returning on both paths.
    pub async fn recv_one(self) -> Result<AskMeMessage, BrokerError> {
        let result = self.accept_and_parse().await;
        cleanup_socket(&self.path);
        result
    }

    async fn accept_and_parse(&self) -> Result<AskMeMessage, BrokerError> {
        let (mut stream, _addr) = self.listener.accept().await?;
        let mut accumulated = BytesMut::with_capacity(READ_CHUNK);
        loop {
            let read = stream.read_buf(&mut accumulated).await?;
            if let Ok(message) = serde_json::from_slice::<AskMeMessage>(&accumulated) {
                return Ok(message);
            }
            if read == 0 {
                logging::emit_error(
                    "channel",
                    &format!(
                        "connection closed after {} bytes without a parseable reply",
                        accumulated.len()
                    ),
                );
                return Err(BrokerError::MalformedReply);
            }
        }
    }
}

/// Editor side: connect once, write the whole serialized reply, close.
pub async fn send_reply(path: &Path, message: &AskMeMessage) -> anyhow::Result<()> {
    let payload = serde_json::to_vec(message)?;
    let mut stream = UnixStream::connect(path).await?;
    stream.write_all(&payload).await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_socket(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("reply.sock")
    }

    #[tokio::test]
    async fn test_single_reply_round_trip_removes_socket() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = scratch_socket(&dir);
        let server = ChannelServer::bind(&path).expect("bind");

        let client_path = path.clone();
        let client = tokio::spawn(async move {
            let message = AskMeMessage {
                ask_me: "go ahead".to_string(),
                timestamp: 1_700_000_000_000,
                images: Vec::new(),
            };
            send_reply(&client_path, &message).await.expect("send");
        });

        let received = server.recv_one().await.expect("recv");
        client.await.expect("client task");
        assert_eq!(received.ask_me, "go ahead");
        assert_eq!(received.timestamp, 1_700_000_000_000);
        assert!(!path.exists(), "socket file must be removed after success");
    }

    #[tokio::test]
    async fn test_partial_writes_are_buffered_until_parse_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = scratch_socket(&dir);
        let server = ChannelServer::bind(&path).expect("bind");

        let client_path = path.clone();
        let client = tokio::spawn(async move {
            let payload = br#"{"ask_me":"split frame","timestamp":7}"#;
            let mut stream = UnixStream::connect(&client_path).await.expect("connect");
            let (first, rest) = payload.split_at(10);
            stream.write_all(first).await.expect("write");
            stream.flush().await.expect("flush");
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            stream.write_all(rest).await.expect("write");
            stream.shutdown().await.expect("shutdown");
        });

        let received = server.recv_one().await.expect("recv");
        client.await.expect("client task");
        assert_eq!(received.ask_me, "split frame");
    }

    #[tokio::test]
    async fn test_eof_without_parse_is_malformed_reply() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = scratch_socket(&dir);
        let server = ChannelServer::bind(&path).expect("bind");

        let client_path = path.clone();
        tokio::spawn(async move {
            let mut stream = UnixStream::connect(&client_path).await.expect("connect");
            stream.write_all(b"{\"ask_me\": trunc").await.expect("write");
            stream.shutdown().await.expect("shutdown");
        });

        let err = server.recv_one().await.expect_err("must fail");
        assert!(matches!(err, BrokerError::MalformedReply));
        assert!(!path.exists(), "socket file must be removed after failure");
    }

    #[test]
    fn test_bind_fails_on_taken_address() {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        runtime.block_on(async {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = scratch_socket(&dir);
            let _server = ChannelServer::bind(&path).expect("bind");
            let err = ChannelServer::bind(&path).expect_err("second bind must fail");
            assert!(matches!(err, BrokerError::ChannelBind { .. }));
        });
    }

    #[test]
    fn test_allocated_paths_point_at_temp_dir() {
        let path = allocate_socket_path();
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("askme-socket-") && n.ends_with(".sock")));
    }
}
