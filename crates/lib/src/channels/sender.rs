//! Outbound send capability used by the dispatcher.

use crate::error::SendError;
use async_trait::async_trait;

/// Delivers a text message to a recipient on the external platform.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `text` to `recipient_id`. On success returns the API's raw response body.
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<String, SendError>;
}
