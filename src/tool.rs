use crate::attachments::base64_payload;
use crate::broker::{BrokerError, RequestBroker};
use crate::config::Config;
use crate::launcher::TerminalLaunch;
use crate::message::ImageAttachment;

/// What a caller (the tool-protocol layer above this crate) receives.
/// Always populated; broker failures degrade into descriptive text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReply {
    pub text: String,
    pub images: Vec<ImageAttachment>,
}

impl ToolReply {
    /// Raw base64 payloads with the data-URL prefix stripped, paired with
    /// their mime types, for callers that forward images onward.
    pub fn image_payloads(&self) -> Vec<(String, String)> {
        self.images
            .iter()
            .map(|image| {
                (
                    base64_payload(&image.data).to_string(),
                    image.mime_type.clone(),
                )
            })
            .collect()
    }
}

/// Asks the operator one question and never fails: every broker error comes
/// back as a best-effort textual reply instead of propagating.
pub async fn request_confirmation(prompt: &str, config: &Config) -> ToolReply {
    confirm_with_broker(&RequestBroker::new(config.clone()), prompt).await
}

pub async fn confirm_with_broker<L: TerminalLaunch>(
    broker: &RequestBroker<L>,
    prompt: &str,
) -> ToolReply {
    match broker.open(prompt).await {
        Ok(message) => {
            let text = if message.ask_me.trim().is_empty() {
                "User did not enter any content".to_string()
            } else {
                message.ask_me
            };
            ToolReply {
                text,
                images: message.images,
            }
        }
        Err(err @ BrokerError::Timeout { .. }) => ToolReply {
            text: format!("No response from user: {err}"),
            images: Vec::new(),
        },
        Err(err) => ToolReply {
            text: format!("Error collecting user confirmation: {err}"),
            images: Vec::new(),
        },
    }
}
