//! Inbound Discord interaction envelope and the sub-payloads we act on.
//!
//! Wire format: `{ "type": <int>, "data": {...}, "member": { "user": {...} }, "user": {...} }`.
//! Only ping (1), application command (2) and modal submit (5) are interpreted; every
//! other type parses to `InteractionKind::Other` without touching `data`.
//!
//! JSON `null` is read as the zero value everywhere below the envelope: a null or
//! out-of-range `type` is unknown, a null `data` is an empty payload.

use crate::error::RequestError;
use serde::{Deserialize, Deserializer};

pub const INTERACTION_PING: i64 = 1;
pub const INTERACTION_APPLICATION_COMMAND: i64 = 2;
pub const INTERACTION_MESSAGE_COMPONENT: i64 = 3;
pub const INTERACTION_MODAL_SUBMIT: i64 = 5;

#[derive(Debug, Deserialize)]
struct RawInteraction {
    #[serde(rename = "type", default)]
    typ: Option<i64>,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    member: Option<Member>,
    #[serde(default)]
    user: Option<User>,
}

/// Discord user object (subset).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "null_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub username: String,
}

/// Guild member wrapper; present for interactions inside a server.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
}

/// A message referenced by a message command.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolvedMessage {
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resolved {
    /// Message id → message, in document order.
    #[serde(default, deserialize_with = "ordered_messages")]
    pub messages: Vec<(String, ResolvedMessage)>,
}

/// `data` of an application command interaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandData {
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub resolved: Resolved,
}

impl CommandData {
    /// The message a message command targets. Discord resolves exactly one for these
    /// commands; if several are present the first in the payload is used.
    pub fn target_message(&self) -> Option<&ResolvedMessage> {
        self.resolved.messages.first().map(|(_, m)| m)
    }
}

/// A node in a modal's component tree (action rows contain inputs; rows may nest).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Component {
    #[serde(rename = "type", default, deserialize_with = "null_default")]
    pub typ: i64,
    #[serde(default)]
    pub custom_id: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub components: Vec<Component>,
}

/// `data` of a modal submit interaction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModalSubmitData {
    #[serde(default, deserialize_with = "null_default")]
    pub custom_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub components: Vec<Component>,
}

impl ModalSubmitData {
    /// Depth-first, pre-order search for the first component whose `custom_id` is `field`.
    pub fn find_component(&self, field: &str) -> Option<&Component> {
        let mut stack: Vec<&Component> = self.components.iter().rev().collect();
        while let Some(c) = stack.pop() {
            if c.custom_id.as_deref() == Some(field) {
                return Some(c);
            }
            stack.extend(c.components.iter().rev());
        }
        None
    }

    /// Submitted value of `field`; empty when the field is absent or has no value.
    pub fn field_value(&self, field: &str) -> &str {
        self.find_component(field)
            .and_then(|c| c.value.as_deref())
            .unwrap_or("")
    }
}

/// Interaction type with its parsed payload.
#[derive(Debug, Clone)]
pub enum InteractionKind {
    Ping,
    Command(CommandData),
    ModalSubmit(ModalSubmitData),
    /// Any other type (message component, autocomplete, ...), or none at all. `data` is not parsed.
    Other(Option<i64>),
}

/// One inbound interaction. Built once per request and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub member: Option<Member>,
    pub user: Option<User>,
}

impl Interaction {
    /// Parse a raw request body. A malformed envelope or a mistyped command/modal
    /// payload is a request error; a missing or null payload is an empty one. Ping and
    /// unknown types never look at `data`.
    pub fn parse(body: &[u8]) -> Result<Self, RequestError> {
        let raw: RawInteraction = serde_json::from_slice(body).map_err(RequestError::InvalidBody)?;
        let kind = match raw.typ {
            Some(INTERACTION_PING) => InteractionKind::Ping,
            Some(INTERACTION_APPLICATION_COMMAND) => InteractionKind::Command(
                payload(raw.data).map_err(RequestError::InvalidCommandData)?,
            ),
            Some(INTERACTION_MODAL_SUBMIT) => InteractionKind::ModalSubmit(
                payload(raw.data).map_err(RequestError::InvalidModalData)?,
            ),
            other => InteractionKind::Other(other),
        };
        Ok(Self {
            kind,
            member: raw.member,
            user: raw.user,
        })
    }

    /// Username of the acting user: guild member first, then the direct user (DMs).
    pub fn username(&self) -> Option<&str> {
        let member_name = self
            .member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .map(|u| u.username.as_str());
        let user_name = self.user.as_ref().map(|u| u.username.as_str());
        member_name
            .filter(|s| !s.is_empty())
            .or(user_name.filter(|s| !s.is_empty()))
    }
}

fn payload<T>(data: serde_json::Value) -> Result<T, serde_json::Error>
where
    T: Default + serde::de::DeserializeOwned,
{
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data)
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn ordered_messages<'de, D>(deserializer: D) -> Result<Vec<(String, ResolvedMessage)>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let map = Option::<serde_json::Map<String, serde_json::Value>>::deserialize(deserializer)?;
    map.unwrap_or_default()
        .into_iter()
        .map(|(id, v)| {
            payload::<ResolvedMessage>(v)
                .map(|m| (id, m))
                .map_err(D::Error::custom)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: serde_json::Value) -> Result<Interaction, RequestError> {
        Interaction::parse(v.to_string().as_bytes())
    }

    #[test]
    fn ping_ignores_data() {
        let i = parse(json!({ "type": 1, "data": "not an object" })).unwrap();
        assert!(matches!(i.kind, InteractionKind::Ping));
    }

    #[test]
    fn unknown_type_is_other() {
        let i = parse(json!({ "type": 3, "data": { "custom_id": 12 } })).unwrap();
        assert!(matches!(
            i.kind,
            InteractionKind::Other(Some(INTERACTION_MESSAGE_COMPONENT))
        ));
        let i = parse(json!({})).unwrap();
        assert!(matches!(i.kind, InteractionKind::Other(None)));
    }

    #[test]
    fn negative_or_null_type_is_other() {
        let i = parse(json!({ "type": -1 })).unwrap();
        assert!(matches!(i.kind, InteractionKind::Other(Some(-1))));
        let i = parse(json!({ "type": null, "data": null })).unwrap();
        assert!(matches!(i.kind, InteractionKind::Other(None)));
    }

    #[test]
    fn malformed_envelope_is_invalid_body() {
        assert!(matches!(
            Interaction::parse(b"not json"),
            Err(RequestError::InvalidBody(_))
        ));
        assert!(matches!(
            parse(json!({ "type": "one" })),
            Err(RequestError::InvalidBody(_))
        ));
    }

    #[test]
    fn command_with_mistyped_data_is_invalid() {
        assert!(matches!(
            parse(json!({ "type": 2, "data": "Reply" })),
            Err(RequestError::InvalidCommandData(_))
        ));
        assert!(matches!(
            parse(json!({ "type": 2, "data": { "resolved": { "messages": { "1": { "content": 5 } } } } })),
            Err(RequestError::InvalidCommandData(_))
        ));
    }

    #[test]
    fn modal_with_bad_components_is_invalid() {
        assert!(matches!(
            parse(json!({ "type": 5, "data": { "custom_id": "x", "components": "nope" } })),
            Err(RequestError::InvalidModalData(_))
        ));
    }

    #[test]
    fn command_target_is_first_resolved_message() {
        let i = parse(json!({
            "type": 2,
            "data": {
                "name": "Reply",
                "resolved": { "messages": {
                    "900": { "content": "second id, first in payload" },
                    "100": { "content": "other" }
                } }
            }
        }))
        .unwrap();
        let InteractionKind::Command(data) = i.kind else {
            panic!("expected command");
        };
        assert_eq!(data.name, "Reply");
        assert_eq!(
            data.target_message().map(|m| m.content.as_str()),
            Some("second id, first in payload")
        );
    }

    #[test]
    fn command_without_resolved_has_no_target() {
        let i = parse(json!({ "type": 2, "data": { "name": "Reply" } })).unwrap();
        let InteractionKind::Command(data) = i.kind else {
            panic!("expected command");
        };
        assert!(data.target_message().is_none());
    }

    #[test]
    fn null_payloads_are_empty() {
        for body in [
            json!({ "type": 2 }),
            json!({ "type": 2, "data": null }),
            json!({ "type": 2, "data": { "name": null, "resolved": null } }),
            json!({ "type": 2, "data": { "resolved": { "messages": null } } }),
        ] {
            let i = parse(body.clone()).unwrap_or_else(|e| panic!("{}: {}", body, e));
            let InteractionKind::Command(data) = i.kind else {
                panic!("expected command for {}", body);
            };
            assert!(data.target_message().is_none());
        }

        let i = parse(json!({ "type": 2, "data": { "resolved": { "messages": { "7": null } } } })).unwrap();
        let InteractionKind::Command(data) = i.kind else {
            panic!("expected command");
        };
        assert_eq!(data.target_message().map(|m| m.content.as_str()), Some(""));

        let i = parse(json!({ "type": 5, "data": null, "user": { "id": null, "username": null } })).unwrap();
        let InteractionKind::ModalSubmit(ref data) = i.kind else {
            panic!("expected modal submit");
        };
        assert_eq!(data.custom_id, "");
        assert!(data.components.is_empty());
        assert_eq!(i.username(), None);
    }

    #[test]
    fn find_component_walks_nested_rows() {
        let i = parse(json!({
            "type": 5,
            "data": {
                "custom_id": "instamsg_modal_1",
                "components": [
                    { "type": 1, "components": [ { "type": 4, "custom_id": "other", "value": "x" } ] },
                    { "type": 1, "components": [
                        { "type": 1, "components": [ { "type": 4, "custom_id": "dm_text", "value": "deep" } ] },
                        { "type": 4, "custom_id": "dm_text", "value": "later" }
                    ] }
                ]
            }
        }))
        .unwrap();
        let InteractionKind::ModalSubmit(data) = i.kind else {
            panic!("expected modal submit");
        };
        assert_eq!(data.field_value("dm_text"), "deep");
        assert_eq!(data.field_value("missing"), "");
    }

    #[test]
    fn username_prefers_member() {
        let i = parse(json!({
            "type": 1,
            "member": { "user": { "id": "1", "username": "guild_alice" } },
            "user": { "id": "1", "username": "dm_alice" }
        }))
        .unwrap();
        assert_eq!(i.username(), Some("guild_alice"));

        let i = parse(json!({ "type": 1, "user": { "id": "1", "username": "dm_alice" } })).unwrap();
        assert_eq!(i.username(), Some("dm_alice"));

        let i = parse(json!({ "type": 1, "member": {} })).unwrap();
        assert_eq!(i.username(), None);
    }
}
