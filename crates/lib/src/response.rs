//! Interaction response payloads (pong, channel message, modal).
//!
//! Wire format: `{ "type": 1 }`, `{ "type": 4, "data": { "content": ... } }`, or
//! `{ "type": 9, "data": { "custom_id", "title", "components": [...] } }`.

use serde::Serialize;

pub const RESPONSE_PONG: u8 = 1;
pub const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
pub const RESPONSE_MODAL: u8 = 9;

const COMPONENT_ACTION_ROW: u8 = 1;
const COMPONENT_TEXT_INPUT: u8 = 4;
const TEXT_INPUT_PARAGRAPH: u8 = 2;

/// Prefix of the modal `custom_id`; the recipient id follows it.
pub const MODAL_ID_PREFIX: &str = "instamsg_modal_";
/// `custom_id` of the modal's text input.
pub const DM_TEXT_FIELD: &str = "dm_text";

const MODAL_TITLE: &str = "Send Instagram DM";
const DM_TEXT_LABEL: &str = "Message to send";
const DM_TEXT_PLACEHOLDER: &str = "Type your Instagram DM here...";
pub const DM_TEXT_MIN_LENGTH: u16 = 1;
pub const DM_TEXT_MAX_LENGTH: u16 = 2000;

/// Response to one interaction. Serializes to the wire shape above.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "WireResponse")]
pub enum ResponsePayload {
    Pong,
    ChannelMessage { content: String },
    Modal(ModalPrompt),
}

impl ResponsePayload {
    pub fn pong() -> Self {
        ResponsePayload::Pong
    }

    pub fn message(content: impl Into<String>) -> Self {
        ResponsePayload::ChannelMessage {
            content: content.into(),
        }
    }

    /// Modal asking for the DM text; `recipient_id` rides in the modal's `custom_id`.
    pub fn dm_modal(recipient_id: &str) -> Self {
        ResponsePayload::Modal(ModalPrompt::for_recipient(recipient_id))
    }

    pub fn response_type(&self) -> u8 {
        match self {
            ResponsePayload::Pong => RESPONSE_PONG,
            ResponsePayload::ChannelMessage { .. } => RESPONSE_CHANNEL_MESSAGE,
            ResponsePayload::Modal(_) => RESPONSE_MODAL,
        }
    }
}

/// `data` of a modal response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalPrompt {
    pub custom_id: String,
    pub title: String,
    pub components: Vec<ActionRow>,
}

impl ModalPrompt {
    pub fn for_recipient(recipient_id: &str) -> Self {
        Self {
            custom_id: format!("{}{}", MODAL_ID_PREFIX, recipient_id),
            title: MODAL_TITLE.to_string(),
            components: vec![ActionRow {
                typ: COMPONENT_ACTION_ROW,
                components: vec![TextInput {
                    typ: COMPONENT_TEXT_INPUT,
                    custom_id: DM_TEXT_FIELD.to_string(),
                    style: TEXT_INPUT_PARAGRAPH,
                    label: DM_TEXT_LABEL.to_string(),
                    min_length: DM_TEXT_MIN_LENGTH,
                    max_length: DM_TEXT_MAX_LENGTH,
                    placeholder: DM_TEXT_PLACEHOLDER.to_string(),
                    required: true,
                }],
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRow {
    #[serde(rename = "type")]
    pub typ: u8,
    pub components: Vec<TextInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextInput {
    #[serde(rename = "type")]
    pub typ: u8,
    pub custom_id: String,
    pub style: u8,
    pub label: String,
    pub min_length: u16,
    pub max_length: u16,
    pub placeholder: String,
    pub required: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WireData {
    Message { content: String },
    Modal(ModalPrompt),
}

#[derive(Serialize)]
struct WireResponse {
    #[serde(rename = "type")]
    typ: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<WireData>,
}

impl From<ResponsePayload> for WireResponse {
    fn from(p: ResponsePayload) -> Self {
        let typ = p.response_type();
        let data = match p {
            ResponsePayload::Pong => None,
            ResponsePayload::ChannelMessage { content } => Some(WireData::Message { content }),
            ResponsePayload::Modal(m) => Some(WireData::Modal(m)),
        };
        Self { typ, data }
    }
}
