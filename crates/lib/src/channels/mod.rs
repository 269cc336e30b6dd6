//! Outbound channels (Instagram, Discord).
//!
//! The dispatcher only sees the `MessageSender` trait; `InstagramChannel` is the real
//! implementation backed by the Graph API. `DiscordChannel` carries Instagram DMs the
//! other way, into a Discord channel or a user's DMs.

mod discord;
mod instagram;
mod sender;

pub use discord::{DiscordChannel, DISCORD_API_BASE};
pub use instagram::{InstagramChannel, INSTAGRAM_API_BASE, INSTAGRAM_API_VERSION};
pub use sender::MessageSender;
