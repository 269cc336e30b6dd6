//! igrelay core library — invisible id codec, Discord signature checks, interaction
//! dispatch, and the gateway that relays Instagram DMs into Discord and Discord replies
//! back to Instagram.

pub mod channels;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod interaction;
pub mod relay;
pub mod response;
pub mod signature;
