use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// One pasted image, referenced from the text buffer by its placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// "Image #N", unique while the attachment is active.
    pub id: String,
    /// Base64 data URL: `data:image/png;base64,...`.
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Raw image size in bytes.
    pub size: usize,
    /// "[Image #N]" as it appears verbatim in the buffer.
    pub placeholder: String,
}

/// The single reply sent from the editor process back to the host.
///
/// Built once at submission time and immutable afterward. `images` carries
/// only attachments whose placeholder survived in the submitted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskMeMessage {
    pub ask_me: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

impl AskMeMessage {
    pub fn new(text: String, images: Vec<ImageAttachment>) -> Self {
        Self {
            ask_me: text,
            timestamp: now_millis(),
            images,
        }
    }
}

/// Milliseconds since the unix epoch.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
