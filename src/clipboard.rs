use std::process::Command;

use crate::editor::PasteContent;
use crate::logging;

/// Capability handed to the editor for paste handling. Implementations must
/// never panic on clipboard trouble; a failed query is just "nothing there".
pub trait ClipboardProvider: Send + Sync {
    fn has_image(&self) -> bool;
    fn image_bytes(&self) -> Option<Vec<u8>>;
    fn text(&self) -> Option<String>;
}

/// Runs the image-first/text-second paste precedence against a provider.
/// This is the blocking half of a paste; the event loop runs it off-thread.
pub fn query(provider: &dyn ClipboardProvider) -> PasteContent {
    if provider.has_image() {
        if let Some(bytes) = provider.image_bytes() {
            return PasteContent::Image(bytes);
        }
        logging::emit_error("clipboard", "image advertised but unreadable");
    }
    match provider.text() {
        Some(text) if !text.is_empty() => PasteContent::Text(text),
        _ => PasteContent::Empty,
    }
}

/// Platform clipboard. macOS is the only platform with image support; the
/// others get an inert provider (bracketed paste still covers plain text).
pub fn system_clipboard() -> Box<dyn ClipboardProvider> {
    if cfg!(target_os = "macos") {
        Box::new(MacClipboard)
    } else {
        Box::new(NullClipboard)
    }
}

/// Shells out to `osascript`/`pbpaste`, the same child-process route the
/// rest of the tooling in this ecosystem takes on macOS.
struct MacClipboard;

impl ClipboardProvider for MacClipboard {
    fn has_image(&self) -> bool {
        match run_capture("osascript", &["-e", "clipboard info"]) {
            Some(info) => {
                info.contains("«class PNGf»")
                    || info.contains("TIFF picture")
                    || info.contains("JPEG picture")
                    || info.contains("GIF picture")
            }
            None => false,
        }
    }

    fn image_bytes(&self) -> Option<Vec<u8>> {
        // AppleScript prints binary clipboard data as «data PNGf<hex>».
        let raw = run_capture("osascript", &["-e", "the clipboard as «class PNGf»"])?;
        match parse_apple_hex_data(&raw) {
            Some(bytes) if !bytes.is_empty() => Some(bytes),
            _ => {
                logging::emit_error("clipboard", "could not decode clipboard image data");
                None
            }
        }
    }

    fn text(&self) -> Option<String> {
        run_capture("pbpaste", &[]).filter(|text| !text.is_empty())
    }
}

struct NullClipboard;

impl ClipboardProvider for NullClipboard {
    fn has_image(&self) -> bool {
        false
    }

    fn image_bytes(&self) -> Option<Vec<u8>> {
        None
    }

    fn text(&self) -> Option<String> {
        None
    }
}

fn run_capture(program: &str, args: &[&str]) -> Option<String> {
    match Command::new(program).args(args).output() {
        Ok(output) if output.status.success() => {
            Some(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
        }
        Ok(output) => {
            logging::emit_error(
                "clipboard",
                &format!("{program} exited with {}", output.status),
            );
            None
        }
        Err(err) => {
            logging::emit_error("clipboard", &format!("failed to run {program}: {err}"));
            None
        }
    }
}

/// Extracts the hex payload from `«data PNGf89504e47...»` style output.
fn parse_apple_hex_data(raw: &str) -> Option<Vec<u8>> {
    let start = raw.find("«data ")?;
    let rest = &raw[start + "«data ".len()..];
    let end = rest.find('»')?;
    // Skip the four-character type code before the hex run.
    let hex = rest[..end].get(4..)?;
    decode_hex(hex)
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    let hex = hex.trim();
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    let bytes = hex.as_bytes();
    for pair in bytes.chunks(2) {
        let hi = (pair[0] as char).to_digit(16)?;
        let lo = (pair[1] as char).to_digit(16)?;
        out.push(((hi << 4) | lo) as u8);
    }
    Some(out)
}
