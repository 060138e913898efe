use aho_corasick::AhoCorasick;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::message::ImageAttachment;

const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a];
const JPEG_SIGNATURE: [u8; 3] = [0xff, 0xd8, 0xff];

/// Returns the smallest free "Image #N" id, N starting at 1.
///
/// Ids freed by deleting a placeholder from the buffer become reusable only
/// after the attachment leaves `existing`; while active they are never
/// handed out again.
pub fn next_image_id(existing: &[ImageAttachment]) -> String {
    let mut counter = 1usize;
    loop {
        let candidate = format!("Image #{counter}");
        if !existing.iter().any(|image| image.id == candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Sniffs the image container from leading bytes. Unknown data is treated as
/// PNG, matching what clipboard bitmaps usually are.
pub fn detect_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.len() >= PNG_SIGNATURE.len() && bytes[..PNG_SIGNATURE.len()] == PNG_SIGNATURE {
        return "image/png";
    }
    if bytes.len() >= JPEG_SIGNATURE.len() && bytes[..JPEG_SIGNATURE.len()] == JPEG_SIGNATURE {
        return "image/jpeg";
    }
    if bytes.len() >= 6 && (&bytes[..6] == b"GIF87a" || &bytes[..6] == b"GIF89a") {
        return "image/gif";
    }
    "image/png"
}

pub fn to_data_url(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", BASE64.encode(bytes))
}

/// Builds a fully populated attachment with a fresh id and matching
/// placeholder for raw clipboard image bytes.
pub fn create_attachment(bytes: &[u8], existing: &[ImageAttachment]) -> ImageAttachment {
    let mime_type = detect_image_mime(bytes);
    let id = next_image_id(existing);
    let placeholder = format!("[{id}]");
    ImageAttachment {
        data: to_data_url(bytes, mime_type),
        mime_type: mime_type.to_string(),
        size: bytes.len(),
        id,
        placeholder,
    }
}

/// Keeps the subsequence of `attachments` whose placeholder still occurs
/// verbatim in `buffer`, preserving order. Attachments dropped here are gone
/// for good; re-typing the placeholder text does not bring the image back.
pub fn reconcile(attachments: &[ImageAttachment], buffer: &str) -> Vec<ImageAttachment> {
    if attachments.is_empty() {
        return Vec::new();
    }
    let patterns: Vec<&str> = attachments.iter().map(|a| a.placeholder.as_str()).collect();
    let Ok(searcher) = AhoCorasick::new(&patterns) else {
        return attachments.to_vec();
    };
    let mut present = vec![false; attachments.len()];
    for found in searcher.find_iter(buffer) {
        present[found.pattern().as_usize()] = true;
    }
    attachments
        .iter()
        .zip(present)
        .filter(|(_, hit)| *hit)
        .map(|(attachment, _)| attachment.clone())
        .collect()
}

/// Strips the `data:<mime>;base64,` prefix, returning the raw payload.
pub fn base64_payload(data_url: &str) -> &str {
    match data_url.split_once(',') {
        Some((_, payload)) => payload,
        None => data_url,
    }
}
