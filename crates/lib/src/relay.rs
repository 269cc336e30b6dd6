//! Instagram → Discord relay: turn one Instagram messaging webhook event into one Discord
//! message whose "From" line carries the sender's id in invisible characters, so a later
//! "Reply via Instagram" command can recover it.
//!
//! Only text DMs are forwarded. Reel and post shares are acknowledged and dropped.

use crate::channels::{DiscordChannel, InstagramChannel};
use crate::codec;
use crate::config::{Config, Secrets};
use crate::error::{RequestError, SendError};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::sync::Arc;

/// Shown when the sender's profile cannot be fetched.
pub const UNKNOWN_USER: &str = "Unknown User";

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    messaging: Vec<Messaging>,
}

#[derive(Debug, Deserialize)]
struct Messaging {
    sender: Party,
    #[serde(default)]
    message: Option<InstagramMessage>,
}

#[derive(Debug, Deserialize)]
struct Party {
    #[serde(deserialize_with = "id_text")]
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct InstagramMessage {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    #[serde(rename = "type", default)]
    typ: String,
}

fn id_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(u64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

/// The part of a webhook event the relay acts on: the first messaging item of the first entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstagramEvent {
    pub sender_id: String,
    pub text: Option<String>,
    /// The message shares a reel or a post.
    pub shares_media: bool,
}

impl InstagramEvent {
    pub fn parse(body: &[u8]) -> Result<Self, RequestError> {
        let body: WebhookBody =
            serde_json::from_slice(body).map_err(|_| RequestError::InvalidWebhook)?;
        let messaging = body
            .entry
            .into_iter()
            .next()
            .and_then(|e| e.messaging.into_iter().next())
            .ok_or(RequestError::InvalidWebhook)?;
        let message = messaging.message.unwrap_or_default();
        let shares_media = message
            .attachments
            .iter()
            .any(|a| a.typ == "ig_reel" || a.typ == "share");
        Ok(Self {
            sender_id: messaging.sender.id,
            text: message.text.filter(|t| !t.is_empty()),
            shares_media,
        })
    }

    /// Text without a reel or post attached.
    fn forwardable_text(&self) -> Option<&str> {
        if self.shares_media {
            return None;
        }
        self.text.as_deref()
    }
}

/// What the relay did with one event. Reported back to Instagram as `{"status": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    Sent,
    SkippedOwnMessage,
    Unsupported,
}

impl Forwarded {
    pub fn status(self) -> &'static str {
        match self {
            Forwarded::Sent => "success",
            Forwarded::SkippedOwnMessage => "skipped bot message",
            Forwarded::Unsupported => "unsupported type, skipped",
        }
    }
}

/// Where a forwarded text goes.
#[derive(Debug, PartialEq, Eq)]
pub enum Destination<'a> {
    /// The shared relay channel, with the full text.
    Channel(&'a str),
    /// A Discord user named by the first word; the rest of the words, if any, are the message.
    User { user_id: &'a str, message: Option<String> },
}

/// A text whose first word is a known name goes to that user's DMs; anything else goes to the channel.
pub fn route<'a>(text: &'a str, user_ids: &'a HashMap<String, String>) -> Destination<'a> {
    let mut words = text.split_whitespace();
    let Some(user_id) = words.next().and_then(|first| user_ids.get(first)) else {
        return Destination::Channel(text);
    };
    let rest = words.collect::<Vec<_>>().join(" ");
    Destination::User {
        user_id: user_id.as_str(),
        message: Some(rest).filter(|m| !m.is_empty()),
    }
}

/// Replace `@name` with a Discord mention `<@id>` for every known name; unknown names stay as typed.
pub fn rewrite_mentions(text: &str, user_ids: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let end = after
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        match user_ids.get(&after[..end]).filter(|_| end > 0) {
            Some(id) => {
                out.push_str("<@");
                out.push_str(id);
                out.push('>');
            }
            None => {
                out.push('@');
                out.push_str(&after[..end]);
            }
        }
        rest = &after[end..];
    }
    out.push_str(rest);
    out
}

/// Discord quote block: the hidden-id "From" line, then the message if there is one.
pub fn compose_discord_message(
    username: &str,
    sender_id: &str,
    message: Option<&str>,
    user_ids: &HashMap<String, String>,
) -> String {
    let mut lines = vec![codec::sender_line(username, sender_id)];
    if let Some(m) = message {
        lines.push(format!("**Message**: {}", rewrite_mentions(m, user_ids)));
    }
    format!("> {}", lines.join("\n> "))
}

/// Forwards Instagram DMs into Discord. Stateless between events.
pub struct Relay {
    instagram: Arc<InstagramChannel>,
    discord: DiscordChannel,
    channel_id: String,
    bot_user_id: Option<String>,
    user_ids: HashMap<String, String>,
}

impl Relay {
    /// None when the secrets carry no Discord bot credentials.
    pub fn from_secrets(
        config: &Config,
        secrets: &Secrets,
        instagram: Arc<InstagramChannel>,
    ) -> Option<Self> {
        let forwarding = secrets.discord.as_ref()?;
        Some(Self {
            instagram,
            discord: DiscordChannel::new(config.discord.api_base.clone(), forwarding.bot_token.clone()),
            channel_id: forwarding.channel_id.clone(),
            bot_user_id: secrets.instagram_bot_user_id.clone(),
            user_ids: secrets.discord_user_ids.clone(),
        })
    }

    pub async fn forward(&self, event: &InstagramEvent) -> Result<Forwarded, SendError> {
        if self.bot_user_id.as_deref() == Some(event.sender_id.as_str()) {
            log::debug!("skipping instagram event sent by the page itself");
            return Ok(Forwarded::SkippedOwnMessage);
        }
        let Some(text) = event.forwardable_text() else {
            log::info!("unsupported instagram message from {}, skipping", event.sender_id);
            return Ok(Forwarded::Unsupported);
        };

        let username = match self.instagram.fetch_username(&event.sender_id).await {
            Ok(name) => name,
            Err(e) => {
                log::warn!("instagram username lookup for {} failed: {}", event.sender_id, e);
                UNKNOWN_USER.to_string()
            }
        };

        match route(text, &self.user_ids) {
            Destination::User { user_id, message } => {
                let content =
                    compose_discord_message(&username, &event.sender_id, message.as_deref(), &self.user_ids);
                self.discord.send_to_user(user_id, &content).await?;
                log::info!("forwarded instagram message from {} to discord user {}", event.sender_id, user_id);
            }
            Destination::Channel(message) => {
                let content =
                    compose_discord_message(&username, &event.sender_id, Some(message), &self.user_ids);
                self.discord.send_to_channel(&self.channel_id, &content).await?;
                log::info!("forwarded instagram message from {} to discord channel", event.sender_id);
            }
        }
        Ok(Forwarded::Sent)
    }
}
