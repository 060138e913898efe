use std::path::PathBuf;
use std::time::Duration;

use crate::channel::{allocate_socket_path, cleanup_socket, ChannelServer};
use crate::config::Config;
use crate::launcher::{SystemLauncher, TerminalLaunch};
use crate::logging;
use crate::message::AskMeMessage;

/// Everything that can go wrong between "ask" and "reply". `Timeout` is an
/// expected outcome, not a crash; none of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Cannot open terminal application '{app}': {source}. Make sure it is installed.")]
    Launch {
        app: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot listen on rendezvous socket {path}: {source}")]
    ChannelBind {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("No reply within {ms} ms")]
    Timeout { ms: u64 },
    #[error("Editor closed the connection without a complete reply")]
    MalformedReply,
    #[error("Rendezvous socket I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Host-side orchestrator: one socket, one terminal window, one reply.
///
/// Generic over the launcher so tests can substitute an in-process replier
/// for the real terminal application.
pub struct RequestBroker<L: TerminalLaunch = SystemLauncher> {
    config: Config,
    launcher: L,
}

impl RequestBroker<SystemLauncher> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            launcher: SystemLauncher,
        }
    }
}

impl<L: TerminalLaunch> RequestBroker<L> {
    pub fn with_launcher(config: Config, launcher: L) -> Self {
        Self { config, launcher }
    }

    /// Asks the operator one question and waits for the single reply.
    ///
    /// Exactly one of three things happens: a message arrives, the launch
    /// fails, or the timeout fires. The socket file is gone on every exit.
    pub async fn open(&self, prompt: &str) -> Result<AskMeMessage, BrokerError> {
        let socket_path = allocate_socket_path();
        let server = ChannelServer::bind(&socket_path)?;

        if let Err(err) = self
            .launcher
            .launch(prompt, &socket_path, &self.config.terminal_app)
        {
            cleanup_socket(&socket_path);
            return Err(err);
        }

        let timeout = Duration::from_millis(self.config.timeout_ms);
        tokio::select! {
            received = server.recv_one() => {
                // recv_one removed the socket itself on success and failure.
                received
            }
            _ = tokio::time::sleep(timeout) => {
                logging::emit_event(
                    "broker",
                    &format!("no reply within {} ms, giving up", self.config.timeout_ms),
                );
                cleanup_socket(&socket_path);
                Err(BrokerError::Timeout { ms: self.config.timeout_ms })
            }
        }
    }
}
