//! Gateway: HTTP endpoint that receives Discord interactions and Instagram webhook events.
//!
//! Single port serves the interactions endpoint, the Instagram webhook (handshake and DM
//! events) and a health check. Every request is handled independently; the only shared state is the
//! read-only config and secrets built at startup.

mod server;

pub use server::{router, run_gateway, GatewayState};
