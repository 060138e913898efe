use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::editor::EditorEngine;
use crate::ui::input_metrics::{cursor_visual_position, wrap_buffer_lines};

/// Full-frame layout for the editor window: header, prompt, input box,
/// attachment list, status line.
pub fn render_app(frame: &mut Frame<'_>, prompt: &str, engine: &EditorEngine) {
    let area = frame.area();
    let prompt_height = prompt_rows(prompt, area.width) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(prompt_height.min(area.height / 2)),
            Constraint::Min(3),
            Constraint::Length(attachment_rows(engine)),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(frame, chunks[0]);
    render_prompt(frame, chunks[1], prompt);
    render_input(frame, chunks[2], engine);
    render_attachments(frame, chunks[3], engine);
    render_status(frame, chunks[4], engine);
}

fn render_header(frame: &mut Frame<'_>, area: Rect) {
    frame.render_widget(
        Paragraph::new("Ask User Confirmation").style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        area,
    );
}

fn render_prompt(frame: &mut Frame<'_>, area: Rect, prompt: &str) {
    frame.render_widget(
        Paragraph::new(prompt).wrap(Wrap { trim: false }),
        area,
    );
}

/// Bordered input with the hardware cursor placed at the editor cursor.
/// When the buffer is taller than the box, the window follows the cursor.
fn render_input(frame: &mut Frame<'_>, area: Rect, engine: &EditorEngine) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let input_width = inner.width as usize;
    let lines = wrap_buffer_lines(engine.buffer(), input_width);
    let (cursor_row, cursor_col) = cursor_visual_position(engine.buffer(), engine.cursor(), input_width);
    let visible_rows = inner.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let mut rendered = Vec::with_capacity(visible_rows);
    for offset in 0..visible_rows {
        let line = lines.get(window_start + offset).cloned().unwrap_or_default();
        rendered.push(Line::from(line));
    }
    frame.render_widget(Paragraph::new(rendered), inner);

    let cursor_y = inner.y.saturating_add((cursor_row - window_start) as u16);
    let cursor_x = inner
        .x
        .saturating_add(cursor_col as u16)
        .min(inner.x + inner.width.saturating_sub(1));
    frame.set_cursor_position((cursor_x, cursor_y));
}

fn render_attachments(frame: &mut Frame<'_>, area: Rect, engine: &EditorEngine) {
    if area.height == 0 {
        return;
    }
    let lines: Vec<Line<'_>> = engine
        .attachments()
        .iter()
        .map(|image| {
            Line::from(format!(
                "• {} ({}KB, {})",
                image.placeholder,
                image.size.div_ceil(1024),
                image.mime_type
            ))
            .style(Style::default().fg(Color::Green))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_status(frame: &mut Frame<'_>, area: Rect, engine: &EditorEngine) {
    let (text, color) = if engine.paste_in_flight() {
        ("Reading clipboard...", Color::Yellow)
    } else if engine.buffer().trim().is_empty() {
        ("Type your reply. Enter for newline, double Enter to submit, Ctrl+V to paste.", Color::DarkGray)
    } else {
        ("Double Enter to submit", Color::DarkGray)
    };
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(color)),
        area,
    );
}

fn prompt_rows(prompt: &str, width: u16) -> usize {
    wrap_buffer_lines(prompt, width.max(1) as usize).len() + 1
}

fn attachment_rows(engine: &EditorEngine) -> u16 {
    engine.attachments().len().min(6) as u16
}
