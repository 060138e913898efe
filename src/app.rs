use anyhow::Result;
use crossterm::event::EventStream;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::channel;
use crate::clipboard::{self, ClipboardProvider};
use crate::editor::{EditorAction, EditorEngine, PasteContent};
use crate::logging;
use crate::terminal::TerminalType;
use crate::ui::render::render_app;

/// How the editor session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppOutcome {
    Submitted,
    Cancelled,
}

/// The editor process: one engine, one terminal, one reply socket.
///
/// Runs a single cooperative loop over terminal events, the paste-result
/// channel, and a cancellation latch. Clipboard queries are blocking child
/// processes, so they run off-thread and report back through the channel;
/// typing stays live in the meantime.
pub struct App {
    prompt: String,
    socket_path: Option<PathBuf>,
    engine: EditorEngine,
    clipboard: Arc<dyn ClipboardProvider>,
    cancel: CancellationToken,
}

impl App {
    pub fn new(prompt: String, socket_path: Option<PathBuf>, double_enter_ms: u64) -> Self {
        Self {
            prompt,
            socket_path,
            engine: EditorEngine::new(Duration::from_millis(double_enter_ms)),
            clipboard: Arc::from(clipboard::system_clipboard()),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn run(&mut self, terminal: &mut TerminalType) -> Result<AppOutcome> {
        let mut events = EventStream::new();
        let (paste_tx, mut paste_rx) = mpsc::channel::<PasteContent>(1);

        loop {
            terminal.draw(|frame| render_app(frame, &self.prompt, &self.engine))?;

            let action = tokio::select! {
                maybe_event = events.next() => {
                    match maybe_event {
                        Some(Ok(event)) => self.engine.apply_event(event, Instant::now()),
                        Some(Err(err)) => {
                            logging::emit_error("editor", &format!("event stream failed: {err}"));
                            EditorAction::Cancel
                        }
                        None => EditorAction::Cancel,
                    }
                }
                Some(content) = paste_rx.recv() => {
                    self.engine.complete_paste(content);
                    EditorAction::None
                }
                _ = self.cancel.cancelled() => {
                    return Ok(AppOutcome::Cancelled);
                }
            };

            match action {
                EditorAction::None => {}
                EditorAction::RequestPaste => self.spawn_paste_query(&paste_tx),
                EditorAction::Submit(message) => {
                    if let Some(path) = &self.socket_path {
                        channel::send_reply(path, &message).await?;
                    } else {
                        // No host to report to; useful when run standalone.
                        logging::emit_event("editor", &format!("reply: {}", message.ask_me));
                    }
                    return Ok(AppOutcome::Submitted);
                }
                EditorAction::Cancel => {
                    self.cancel.cancel();
                }
            }
        }
    }

    /// Starts the asynchronous clipboard query unless one is already in
    /// flight; a concurrent request is dropped, not queued.
    fn spawn_paste_query(&mut self, paste_tx: &mpsc::Sender<PasteContent>) {
        if !self.engine.begin_paste() {
            return;
        }
        let provider = Arc::clone(&self.clipboard);
        let tx = paste_tx.clone();
        tokio::spawn(async move {
            let content = tokio::task::spawn_blocking(move || clipboard::query(provider.as_ref()))
                .await
                .unwrap_or_else(|err| {
                    logging::emit_error("editor", &format!("paste task failed: {err}"));
                    PasteContent::Empty
                });
            let _ = tx.send(content).await;
        });
    }
}
