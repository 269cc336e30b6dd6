//! Interaction dispatch: maps a parsed interaction to exactly one response.
//!
//! - ping → pong
//! - message command on a relayed message → modal carrying the hidden recipient id
//! - modal submit → send the draft to Instagram and report the outcome
//! - anything else → pong
//!
//! Soft failures (no hidden id, empty draft, foreign modal, send error) are
//! ordinary channel messages shown to the Discord user, never HTTP errors.

use crate::channels::MessageSender;
use crate::codec;
use crate::interaction::{CommandData, Interaction, InteractionKind, ModalSubmitData};
use crate::response::{ResponsePayload, DM_TEXT_FIELD, MODAL_ID_PREFIX};
use std::sync::Arc;

pub const NOT_RELAYED_MESSAGE: &str =
    "⚠️ You must respond to a message that was sent by an Instagram user";
pub const NO_MESSAGE_PROVIDED: &str = "No message provided.";
pub const INVALID_MODAL_CONTEXT: &str = "Invalid modal context.";

/// Routes interactions; holds the outbound sender and nothing else.
#[derive(Clone)]
pub struct Dispatcher {
    sender: Arc<dyn MessageSender>,
}

impl Dispatcher {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }

    pub async fn dispatch(&self, interaction: &Interaction) -> ResponsePayload {
        match &interaction.kind {
            InteractionKind::Ping => ResponsePayload::pong(),
            InteractionKind::Command(data) => handle_command(data),
            InteractionKind::ModalSubmit(data) => self.handle_modal_submit(interaction, data).await,
            InteractionKind::Other(typ) => {
                log::debug!("interaction type {:?} not handled, answering pong", typ);
                ResponsePayload::pong()
            }
        }
    }

    async fn handle_modal_submit(
        &self,
        interaction: &Interaction,
        data: &ModalSubmitData,
    ) -> ResponsePayload {
        let Some(recipient_id) = data
            .custom_id
            .strip_prefix(MODAL_ID_PREFIX)
            .filter(|id| !id.is_empty())
        else {
            log::debug!("modal submit with foreign custom_id: {}", data.custom_id);
            return ResponsePayload::message(INVALID_MODAL_CONTEXT);
        };
        let draft = data.field_value(DM_TEXT_FIELD);
        if draft.is_empty() {
            return ResponsePayload::message(NO_MESSAGE_PROVIDED);
        }
        let text = compose_outbound_text(interaction.username(), draft);

        log::info!("sending instagram message to {}", recipient_id);
        match self.sender.send_message(recipient_id, &text).await {
            Ok(_) => ResponsePayload::message(format!("Message sent: {}", draft)),
            Err(e) => {
                log::warn!("instagram send to {} failed: {}", recipient_id, e);
                ResponsePayload::message(format!("Failed to send message: {}. Error: {}", draft, e))
            }
        }
    }
}

fn handle_command(data: &CommandData) -> ResponsePayload {
    match data
        .target_message()
        .and_then(|m| codec::decode(&m.content))
    {
        Some(recipient_id) => ResponsePayload::dm_modal(&recipient_id),
        None => ResponsePayload::message(NOT_RELAYED_MESSAGE),
    }
}

/// Prefix the draft with the Discord username so the Instagram recipient sees who replied.
fn compose_outbound_text(username: Option<&str>, draft: &str) -> String {
    match username {
        Some(name) => format!("{}: {}", name, draft),
        None => draft.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SendError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSender {
        sent: Mutex<Vec<(String, String)>>,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl MessageSender for FakeSender {
        async fn send_message(&self, recipient_id: &str, text: &str) -> Result<String, SendError> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient_id.to_string(), text.to_string()));
            match &self.fail_with {
                Some(body) => Err(SendError::Rejected {
                    status: 400,
                    body: body.clone(),
                }),
                None => Ok("{}".to_string()),
            }
        }
    }

    fn dispatcher(sender: Arc<FakeSender>) -> Dispatcher {
        Dispatcher::new(sender)
    }

    fn interaction(v: serde_json::Value) -> Interaction {
        Interaction::parse(v.to_string().as_bytes()).unwrap()
    }

    fn modal_submit(custom_id: &str, dm_text: &str, username: Option<&str>) -> Interaction {
        let mut v = json!({
            "type": 5,
            "data": {
                "custom_id": custom_id,
                "components": [{
                    "type": 1,
                    "components": [{ "type": 4, "custom_id": "dm_text", "value": dm_text }]
                }]
            }
        });
        if let Some(name) = username {
            v["member"] = json!({ "user": { "id": "42", "username": name } });
        }
        interaction(v)
    }

    fn content(payload: &ResponsePayload) -> &str {
        match payload {
            ResponsePayload::ChannelMessage { content } => content,
            other => panic!("expected channel message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ping_answers_pong() {
        let d = dispatcher(Arc::new(FakeSender::default()));
        let out = d.dispatch(&interaction(json!({ "type": 1 }))).await;
        assert_eq!(out, ResponsePayload::Pong);
    }

    #[tokio::test]
    async fn unknown_type_answers_pong() {
        let d = dispatcher(Arc::new(FakeSender::default()));
        let out = d.dispatch(&interaction(json!({ "type": 3, "data": {} }))).await;
        assert_eq!(out, ResponsePayload::Pong);
        for body in [json!({ "type": -1 }), json!({ "type": null }), json!({})] {
            assert_eq!(d.dispatch(&interaction(body)).await, ResponsePayload::Pong);
        }
    }

    #[tokio::test]
    async fn command_on_relayed_message_opens_modal() {
        let d = dispatcher(Arc::new(FakeSender::default()));
        let i = interaction(json!({
            "type": 2,
            "data": { "resolved": { "messages": { "1": { "content": codec::embed("hello", "998877") } } } }
        }));
        match d.dispatch(&i).await {
            ResponsePayload::Modal(m) => assert_eq!(m.custom_id, "instamsg_modal_998877"),
            other => panic!("expected modal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn command_on_plain_message_warns() {
        let d = dispatcher(Arc::new(FakeSender::default()));
        let i = interaction(json!({
            "type": 2,
            "data": { "resolved": { "messages": { "1": { "content": "hello" } } } }
        }));
        assert_eq!(content(&d.dispatch(&i).await), NOT_RELAYED_MESSAGE);
    }

    #[tokio::test]
    async fn command_without_resolved_message_warns() {
        let d = dispatcher(Arc::new(FakeSender::default()));
        let i = interaction(json!({ "type": 2, "data": { "name": "Reply" } }));
        assert_eq!(content(&d.dispatch(&i).await), NOT_RELAYED_MESSAGE);
    }

    #[tokio::test]
    async fn command_with_null_data_warns() {
        let d = dispatcher(Arc::new(FakeSender::default()));
        for body in [
            json!({ "type": 2 }),
            json!({ "type": 2, "data": null }),
            json!({ "type": 2, "data": { "resolved": null } }),
        ] {
            assert_eq!(content(&d.dispatch(&interaction(body)).await), NOT_RELAYED_MESSAGE);
        }
    }

    #[tokio::test]
    async fn modal_submit_with_null_data_is_invalid_context() {
        let sender = Arc::new(FakeSender::default());
        let d = dispatcher(sender.clone());
        let i = interaction(json!({ "type": 5, "data": null }));
        assert_eq!(content(&d.dispatch(&i).await), INVALID_MODAL_CONTEXT);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn modal_submit_sends_with_username() {
        let sender = Arc::new(FakeSender::default());
        let d = dispatcher(sender.clone());
        let out = d
            .dispatch(&modal_submit("instamsg_modal_998877", "hi there", Some("alice")))
            .await;
        assert_eq!(content(&out), "Message sent: hi there");
        assert_eq!(
            *sender.sent.lock().unwrap(),
            vec![("998877".to_string(), "alice: hi there".to_string())]
        );
    }

    #[tokio::test]
    async fn modal_submit_without_username_sends_draft_only() {
        let sender = Arc::new(FakeSender::default());
        let d = dispatcher(sender.clone());
        d.dispatch(&modal_submit("instamsg_modal_5", "plain", None)).await;
        assert_eq!(
            *sender.sent.lock().unwrap(),
            vec![("5".to_string(), "plain".to_string())]
        );
    }

    #[tokio::test]
    async fn modal_submit_empty_draft_sends_nothing() {
        let sender = Arc::new(FakeSender::default());
        let d = dispatcher(sender.clone());
        let out = d
            .dispatch(&modal_submit("instamsg_modal_998877", "", Some("alice")))
            .await;
        assert_eq!(content(&out), NO_MESSAGE_PROVIDED);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn modal_submit_foreign_prefix_is_invalid_context() {
        let sender = Arc::new(FakeSender::default());
        let d = dispatcher(sender.clone());
        let out = d
            .dispatch(&modal_submit("other_modal_998877", "hi", Some("alice")))
            .await;
        assert_eq!(content(&out), INVALID_MODAL_CONTEXT);
        let out = d.dispatch(&modal_submit("instamsg_modal_", "hi", None)).await;
        assert_eq!(content(&out), INVALID_MODAL_CONTEXT);
        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn modal_submit_send_failure_echoes_detail() {
        let sender = Arc::new(FakeSender {
            fail_with: Some(r#"{"error":"nope"}"#.to_string()),
            ..Default::default()
        });
        let d = dispatcher(sender.clone());
        let out = d
            .dispatch(&modal_submit("instamsg_modal_1", "hi", Some("alice")))
            .await;
        assert_eq!(
            content(&out),
            r#"Failed to send message: hi. Error: {"error":"nope"}"#
        );
    }
}
