use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::{Duration, Instant};

use crate::attachments;
use crate::config::DEFAULT_DOUBLE_ENTER_MS;
use crate::message::{AskMeMessage, ImageAttachment};

/// Row/column of the cursor, derived from `(buffer, cursor)` on demand.
/// `col` counts Unicode scalar values on the line, not bytes or cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorPosition {
    pub row: usize,
    pub col: usize,
}

/// Lifecycle of the engine. Input is only processed while `Editing`;
/// both other states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Editing,
    Submitting,
    Cancelled,
}

/// What the surrounding event loop must do after feeding the engine one event.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    None,
    /// Kick off an asynchronous clipboard query, then report back through
    /// [`EditorEngine::complete_paste`].
    RequestPaste,
    /// The reply is final; serialize it over the channel and exit.
    Submit(AskMeMessage),
    /// Tear down without producing a reply.
    Cancel,
}

/// Result of the asynchronous clipboard query started by a paste request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasteContent {
    Image(Vec<u8>),
    Text(String),
    /// Nothing usable on the clipboard, or the query failed. Either way the
    /// buffer stays untouched and the paste guard is released.
    Empty,
}

/// The single source of truth for the in-progress answer.
///
/// Owns the buffer, the cursor (a byte offset that always sits on a char
/// boundary), the active attachment set, and the double-enter clock. The
/// event loop feeds it discrete events; it never touches the terminal.
pub struct EditorEngine {
    buffer: String,
    cursor: usize,
    attachments: Vec<ImageAttachment>,
    last_enter_at: Option<Instant>,
    paste_in_flight: bool,
    double_enter_window: Duration,
    state: EngineState,
}

impl EditorEngine {
    pub fn new(double_enter_window: Duration) -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            attachments: Vec::new(),
            last_enter_at: None,
            paste_in_flight: false,
            double_enter_window,
            state: EngineState::Editing,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn attachments(&self) -> &[ImageAttachment] {
        &self.attachments
    }

    pub fn paste_in_flight(&self) -> bool {
        self.paste_in_flight
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Row and column of the cursor, recomputed from scratch every call.
    pub fn cursor_position(&self) -> CursorPosition {
        let before = &self.buffer[..self.cursor];
        let row = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let col = before[line_start..].chars().count();
        CursorPosition { row, col }
    }

    fn prev_char_boundary(&self, idx: usize) -> usize {
        if idx == 0 {
            return 0;
        }
        let mut j = idx - 1;
        while j > 0 && !self.buffer.is_char_boundary(j) {
            j -= 1;
        }
        j
    }

    fn next_char_boundary(&self, idx: usize) -> usize {
        match self.buffer[idx..].chars().next() {
            Some(ch) => idx + ch.len_utf8(),
            None => self.buffer.len(),
        }
    }

    /// Inserts text at the cursor. CR and CRLF sequences are normalized to
    /// plain newlines so pasted Windows text behaves.
    pub fn insert_str(&mut self, value: &str) {
        let normalized = normalize_newlines(value);
        self.buffer.insert_str(self.cursor, &normalized);
        self.cursor += normalized.len();
    }

    /// Removes the single scalar value before the cursor; no-op at offset 0.
    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let start = self.prev_char_boundary(self.cursor);
        self.buffer.replace_range(start..self.cursor, "");
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.prev_char_boundary(self.cursor);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.buffer.len() {
            self.cursor = self.next_char_boundary(self.cursor);
        }
    }

    /// Sticky-column move to the previous line; no-op on the first line.
    pub fn move_up(&mut self) {
        let line_start = self.current_line_start();
        if line_start == 0 {
            return;
        }
        let col = self.buffer[line_start..self.cursor].chars().count();
        let prev_end = line_start - 1;
        let prev_start = self.buffer[..prev_end].rfind('\n').map(|i| i + 1).unwrap_or(0);
        self.cursor = prev_start + byte_offset_at_col(&self.buffer[prev_start..prev_end], col);
    }

    /// Sticky-column move to the next line; no-op on the last line.
    pub fn move_down(&mut self) {
        let Some(rel) = self.buffer[self.cursor..].find('\n') else {
            return;
        };
        let line_start = self.current_line_start();
        let col = self.buffer[line_start..self.cursor].chars().count();
        let next_start = self.cursor + rel + 1;
        let next_end = self.buffer[next_start..]
            .find('\n')
            .map(|i| next_start + i)
            .unwrap_or(self.buffer.len());
        self.cursor = next_start + byte_offset_at_col(&self.buffer[next_start..next_end], col);
    }

    pub fn move_line_start(&mut self) {
        self.cursor = self.current_line_start();
    }

    pub fn move_line_end(&mut self) {
        self.cursor = self.buffer[self.cursor..]
            .find('\n')
            .map(|i| self.cursor + i)
            .unwrap_or(self.buffer.len());
    }

    /// Empties the buffer. Attachments are not touched here; the next
    /// reconciliation point drops the ones whose placeholder is gone.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
    }

    fn current_line_start(&self) -> usize {
        self.buffer[..self.cursor]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    /// Drops attachments whose placeholder no longer occurs in the buffer.
    pub fn reconcile_attachments(&mut self) {
        self.attachments = attachments::reconcile(&self.attachments, &self.buffer);
    }

    /// A plain Enter press at time `now`. Two presses inside the window
    /// submit; otherwise a newline goes in. A would-be submit over an
    /// empty buffer is ignored outright: no newline, no timer reset.
    pub fn handle_enter(&mut self, now: Instant) -> EditorAction {
        let within_window = self
            .last_enter_at
            .is_some_and(|prev| now.duration_since(prev) < self.double_enter_window);

        if within_window {
            if self.buffer.trim().is_empty() {
                return EditorAction::None;
            }
            return EditorAction::Submit(self.submit());
        }

        self.last_enter_at = Some(now);
        self.insert_str("\n");
        EditorAction::None
    }

    fn submit(&mut self) -> AskMeMessage {
        self.reconcile_attachments();
        let text = self.buffer.trim().to_string();
        let images = attachments::reconcile(&self.attachments, &text);
        self.state = EngineState::Submitting;
        AskMeMessage::new(text, images)
    }

    /// Tries to claim the paste guard. Returns false (and the caller drops
    /// the request) while an earlier paste is still resolving.
    pub fn begin_paste(&mut self) -> bool {
        if self.paste_in_flight {
            return false;
        }
        self.paste_in_flight = true;
        true
    }

    /// Applies the clipboard query result and releases the guard. Runs the
    /// post-paste reconciliation pass on every outcome.
    pub fn complete_paste(&mut self, content: PasteContent) {
        match content {
            PasteContent::Image(bytes) => {
                let attachment = attachments::create_attachment(&bytes, &self.attachments);
                // Trailing space so the user can keep typing immediately.
                self.insert_str(&format!("{} ", attachment.placeholder));
                self.attachments.push(attachment);
            }
            PasteContent::Text(text) => {
                self.insert_str(&text);
            }
            PasteContent::Empty => {}
        }
        self.reconcile_attachments();
        self.paste_in_flight = false;
    }

    /// Feeds one terminal event through the engine. Everything is gated on
    /// `Editing`; terminal states swallow input.
    pub fn apply_event(&mut self, event: Event, now: Instant) -> EditorAction {
        if self.state != EngineState::Editing {
            return EditorAction::None;
        }
        match event {
            Event::Paste(text) => {
                self.insert_str(&text);
                EditorAction::None
            }
            Event::Key(key) if key.kind != KeyEventKind::Release => self.apply_key(key, now),
            _ => EditorAction::None,
        }
    }

    fn apply_key(&mut self, key: KeyEvent, now: Instant) -> EditorAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => {
                self.state = EngineState::Cancelled;
                return EditorAction::Cancel;
            }
            KeyCode::Char('v') if ctrl => return EditorAction::RequestPaste,
            KeyCode::Char('f') if ctrl => self.move_right(),
            KeyCode::Char('b') if ctrl => self.move_left(),
            KeyCode::Char('p') if ctrl => self.move_up(),
            KeyCode::Char('n') if ctrl => self.move_down(),
            KeyCode::Char('a') if ctrl => self.move_line_start(),
            KeyCode::Char('e') if ctrl => self.move_line_end(),
            KeyCode::Char('l') if ctrl => self.clear(),
            KeyCode::Char('j') if ctrl => self.insert_str("\n"),
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => self.insert_str("\n"),
            KeyCode::Enter => return self.handle_enter(now),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up => self.move_up(),
            KeyCode::Down => self.move_down(),
            KeyCode::Home => self.move_line_start(),
            KeyCode::End => self.move_line_end(),
            KeyCode::Char(ch) if !ctrl => self.insert_str(ch.encode_utf8(&mut [0u8; 4])),
            _ => {}
        }
        EditorAction::None
    }
}

impl Default for EditorEngine {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DOUBLE_ENTER_MS))
    }
}

fn normalize_newlines(value: &str) -> String {
    if !value.contains('\r') {
        return value.to_string();
    }
    value.replace("\r\n", "\n").replace('\r', "\n")
}

/// Byte offset of the clamped column `col` (in scalar values) within `line`.
fn byte_offset_at_col(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len())
}
