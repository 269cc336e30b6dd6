//! Discord channel: post relayed Instagram messages through the bot REST API.

use crate::error::SendError;
use serde::Deserialize;

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Deserialize)]
struct DmChannel {
    id: String,
}

/// Discord REST client authenticated with a bot token.
pub struct DiscordChannel {
    api_base: String,
    bot_token: String,
    client: reqwest::Client,
}

impl DiscordChannel {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<String, SendError> {
        let res = self
            .client
            .post(format!("{}{}", self.api_base, path))
            .header(reqwest::header::AUTHORIZATION, format!("Bot {}", self.bot_token))
            .json(&body)
            .send()
            .await
            .map_err(|e| SendError::Http(e.without_url().to_string()))?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(body)
        } else {
            Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Post `content` to a guild text channel.
    pub async fn send_to_channel(&self, channel_id: &str, content: &str) -> Result<String, SendError> {
        self.post_json(
            &format!("/channels/{}/messages", channel_id),
            serde_json::json!({ "content": content }),
        )
        .await
    }

    /// Open (or reuse) the DM channel with `user_id` and post `content` there.
    pub async fn send_to_user(&self, user_id: &str, content: &str) -> Result<String, SendError> {
        let body = self
            .post_json("/users/@me/channels", serde_json::json!({ "recipient_id": user_id }))
            .await?;
        let dm: DmChannel = serde_json::from_str(&body).map_err(|_| SendError::Rejected {
            status: 200,
            body: body.clone(),
        })?;
        self.send_to_channel(&dm.id, content).await
    }
}
