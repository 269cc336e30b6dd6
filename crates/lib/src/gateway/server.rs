//! Gateway HTTP server: Discord interactions endpoint, Instagram webhook (handshake and
//! DM events), health.

use crate::channels::{InstagramChannel, MessageSender};
use crate::config::{self, Config, Secrets};
use crate::dispatch::Dispatcher;
use crate::error::RequestError;
use crate::interaction::Interaction;
use crate::relay::{InstagramEvent, Relay};
use crate::response::ResponsePayload;
use crate::signature::{self, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Shared, read-only state for request handlers. Built once at startup.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub public_key: VerifyingKey,
    /// When true, interaction requests are accepted without a signature check.
    pub skip_verification: bool,
    /// Expected hub.verify_token for the Instagram webhook handshake. None rejects every handshake.
    pub verify_token: Option<String>,
    pub dispatcher: Dispatcher,
    /// Instagram → Discord forwarding; None when no Discord bot credentials are configured.
    pub relay: Option<Arc<Relay>>,
}

impl GatewayState {
    /// `config.skip_verification` is taken as given; environment overrides are applied by the caller.
    pub fn new(config: Config, secrets: &Secrets, sender: Arc<dyn MessageSender>) -> Self {
        let instagram = Arc::new(InstagramChannel::new(
            config.instagram.api_base.clone(),
            config.instagram.api_version.clone(),
            secrets.access_token.clone(),
        ));
        let relay = Relay::from_secrets(&config, secrets, instagram).map(Arc::new);
        Self {
            skip_verification: config.skip_verification,
            config: Arc::new(config),
            public_key: secrets.public_key,
            verify_token: secrets.verify_token.clone(),
            dispatcher: Dispatcher::new(sender),
            relay,
        }
    }
}

/// Routes served by the gateway.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/interactions", post(interactions))
        .route("/webhook", get(instagram_webhook_verify).post(instagram_webhook))
        .with_state(state)
}

/// Build state from config, secrets and environment, bind, and serve until SIGINT/SIGTERM.
pub async fn run_gateway(mut config: Config, secrets: Secrets) -> Result<()> {
    config.skip_verification = config::resolve_skip_verification(&config);
    let instagram = Arc::new(InstagramChannel::new(
        config.instagram.api_base.clone(),
        config.instagram.api_version.clone(),
        secrets.access_token.clone(),
    ));
    let state = GatewayState::new(config.clone(), &secrets, instagram);
    if state.skip_verification {
        log::warn!("discord signature verification is DISABLED; any caller can invoke the relay");
    }
    if state.relay.is_none() {
        log::info!("no discord bot credentials; instagram messages will not be forwarded");
    }

    let bind_addr = format!("{}:{}", config.gateway.bind.trim(), config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Check the request signature unless verification is bypassed. Runs before the body is parsed.
fn authenticate(state: &GatewayState, headers: &HeaderMap, body: &[u8]) -> Result<(), RequestError> {
    if state.skip_verification {
        log::debug!("skipping discord signature verification");
        return Ok(());
    }
    let ok = signature::verify_with_key(
        body,
        header(headers, SIGNATURE_HEADER),
        header(headers, TIMESTAMP_HEADER),
        &state.public_key,
    );
    if ok {
        Ok(())
    } else {
        log::debug!("failed to verify discord signature");
        Err(RequestError::Unauthorized)
    }
}

/// POST /interactions — verify, parse, dispatch. Exactly one JSON response per request.
async fn interactions(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ResponsePayload>, RequestError> {
    authenticate(&state, &headers, &body)?;
    let interaction = Interaction::parse(&body).map_err(|e| {
        log::debug!("rejecting interaction: {}", e);
        e
    })?;
    Ok(Json(state.dispatcher.dispatch(&interaction).await))
}

#[derive(Debug, Deserialize)]
struct HubParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
}

/// GET /webhook — Instagram subscription handshake: echo hub.challenge when hub.verify_token matches.
async fn instagram_webhook_verify(
    State(state): State<GatewayState>,
    Query(params): Query<HubParams>,
) -> (StatusCode, String) {
    let matches = match (&state.verify_token, &params.verify_token) {
        (Some(expected), Some(provided)) => expected == provided,
        _ => false,
    };
    if !matches {
        return (StatusCode::FORBIDDEN, "Verification failed".to_string());
    }
    log::info!(
        "instagram webhook verified (mode: {})",
        params.mode.as_deref().unwrap_or("-")
    );
    (StatusCode::OK, params.challenge.unwrap_or_default())
}

/// POST /webhook — forward one Instagram DM event to Discord. Answers `{"status": ...}`.
async fn instagram_webhook(State(state): State<GatewayState>, body: Bytes) -> Response {
    let Some(relay) = state.relay.as_ref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "message": "discord forwarding not configured" })),
        )
            .into_response();
    };
    let event = match InstagramEvent::parse(&body) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("rejecting instagram webhook: {}", e);
            return e.into_response();
        }
    };
    match relay.forward(&event).await {
        Ok(outcome) => Json(json!({ "status": outcome.status() })).into_response(),
        Err(e) => {
            log::warn!("forwarding instagram message from {} failed: {}", event.sender_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "verification": if state.skip_verification { "skipped" } else { "enabled" },
        "forwarding": if state.relay.is_some() { "enabled" } else { "disabled" },
    }))
}
