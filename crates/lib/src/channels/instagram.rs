//! Instagram channel: send DMs, look up sender usernames and refresh the long-lived
//! access token via the Graph API.

use crate::channels::sender::MessageSender;
use crate::error::SendError;
use async_trait::async_trait;
use serde::Deserialize;

pub const INSTAGRAM_API_BASE: &str = "https://graph.instagram.com";
pub const INSTAGRAM_API_VERSION: &str = "v12.0";

#[derive(Debug, Deserialize)]
struct UserProfile {
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Instagram Graph API client for the messaging endpoint.
pub struct InstagramChannel {
    api_base: String,
    api_version: String,
    access_token: String,
    client: reqwest::Client,
}

impl InstagramChannel {
    pub fn new(
        api_base: impl Into<String>,
        api_version: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            access_token: access_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/{}/me/messages", self.api_base, self.api_version)
    }

    /// POST `{recipient:{id}, message:{text}}` to `/me/messages`. Only HTTP 200 counts as sent.
    pub async fn send_message(&self, recipient_id: &str, text: &str) -> Result<String, SendError> {
        let body = serde_json::json!({
            "recipient": { "id": recipient_id },
            "message": { "text": text },
        });
        let res = self
            .client
            .post(self.messages_url())
            .query(&[("access_token", self.access_token.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| SendError::Http(e.without_url().to_string()))?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::OK {
            Ok(body)
        } else {
            Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Username of an Instagram-scoped user id (`GET /{id}?fields=username`).
    pub async fn fetch_username(&self, user_id: &str) -> Result<String, SendError> {
        let url = format!("{}/{}", self.api_base, user_id);
        let res = self
            .client
            .get(&url)
            .query(&[("fields", "username"), ("access_token", self.access_token.as_str())])
            .send()
            .await
            .map_err(|e| SendError::Http(e.without_url().to_string()))?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if status != reqwest::StatusCode::OK {
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str::<UserProfile>(&body)
            .ok()
            .and_then(|p| p.username)
            .filter(|u| !u.is_empty())
            .ok_or(SendError::Rejected {
                status: status.as_u16(),
                body,
            })
    }

    /// Exchange the current long-lived token for a fresh one (`ig_refresh_token` grant).
    pub async fn refresh_access_token(&self) -> Result<String, SendError> {
        let url = format!("{}/refresh_access_token", self.api_base);
        let res = self
            .client
            .get(&url)
            .query(&[
                ("grant_type", "ig_refresh_token"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SendError::Http(e.without_url().to_string()))?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: RefreshTokenResponse = serde_json::from_str(&body).map_err(|_| SendError::Rejected {
            status: status.as_u16(),
            body: body.clone(),
        })?;
        parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(SendError::Rejected {
                status: status.as_u16(),
                body,
            })
    }
}

#[async_trait]
impl MessageSender for InstagramChannel {
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<String, SendError> {
        InstagramChannel::send_message(self, recipient_id, text).await
    }
}
