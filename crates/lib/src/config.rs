//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.igrelay/config.json`) and environment.
//! Secrets (Instagram token, Discord public key, Discord bot credentials) live in a
//! separate JSON file mounted by the secret store and are loaded once at startup; any
//! problem there is fatal.

use crate::channels::{DISCORD_API_BASE, INSTAGRAM_API_BASE, INSTAGRAM_API_VERSION};
use crate::signature;
use anyhow::{Context, Result};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_SECRETS_PATH: &str = "/etc/secrets/mysecrets.json";

/// Top-level application config.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Path of the secrets JSON file. Overridden by IGRELAY_SECRETS_PATH env.
    #[serde(default = "default_secrets_path")]
    pub secrets_path: PathBuf,

    /// Skip Discord signature verification (local testing only). Forced on by SKIP_DISCORD_VERIFICATION=true.
    #[serde(default)]
    pub skip_verification: bool,

    /// Instagram Graph API endpoint settings.
    #[serde(default)]
    pub instagram: InstagramConfig,

    /// Discord REST endpoint used to forward Instagram DMs.
    #[serde(default)]
    pub discord: DiscordConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8080).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramConfig {
    #[serde(default = "default_instagram_api_base")]
    pub api_base: String,
    #[serde(default = "default_instagram_api_version")]
    pub api_version: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordConfig {
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_secrets_path() -> PathBuf {
    PathBuf::from(DEFAULT_SECRETS_PATH)
}

fn default_instagram_api_base() -> String {
    INSTAGRAM_API_BASE.to_string()
}

fn default_instagram_api_version() -> String {
    INSTAGRAM_API_VERSION.to_string()
}

fn default_discord_api_base() -> String {
    DISCORD_API_BASE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            secrets_path: default_secrets_path(),
            skip_verification: false,
            instagram: InstagramConfig::default(),
            discord: DiscordConfig::default(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

impl Default for InstagramConfig {
    fn default() -> Self {
        Self {
            api_base: default_instagram_api_base(),
            api_version: default_instagram_api_version(),
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: default_discord_api_base(),
        }
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the secrets path: env IGRELAY_SECRETS_PATH overrides config.
pub fn resolve_secrets_path(config: &Config) -> PathBuf {
    env_nonempty("IGRELAY_SECRETS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| config.secrets_path.clone())
}

/// True when signature verification is disabled by config or SKIP_DISCORD_VERIFICATION=true.
/// Applied once by `run_gateway`; request handling only reads `Config::skip_verification`.
pub fn resolve_skip_verification(config: &Config) -> bool {
    config.skip_verification
        || env_nonempty("SKIP_DISCORD_VERIFICATION").as_deref() == Some("true")
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("IGRELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".igrelay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or IGRELAY_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Secrets file contents. Key names follow the mounted secret.
#[derive(Clone, Deserialize)]
pub struct SecretsFile {
    #[serde(rename = "INSTAGRAM_ACCESS_TOKEN", default)]
    pub access_token: String,
    #[serde(rename = "DISCORD_PUBLIC_KEY", default)]
    pub discord_public_key: String,
    /// Token Instagram echoes back when subscribing the webhook (hub.verify_token).
    #[serde(rename = "VERIFY_TOKEN", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "DISCORD_BOT_TOKEN", default)]
    pub discord_bot_token: Option<String>,
    #[serde(rename = "DISCORD_CHANNEL_ID", default, deserialize_with = "optional_id")]
    pub discord_channel_id: Option<String>,
    /// The page's own Instagram id; webhook events it sent are not forwarded.
    #[serde(rename = "INSTAGRAM_BOT_USER_ID", default, deserialize_with = "optional_id")]
    pub instagram_bot_user_id: Option<String>,
    /// Name → Discord user id, for `@name` mentions and DM routing.
    #[serde(rename = "DISCORD_USER_IDS", default, deserialize_with = "id_map")]
    pub discord_user_ids: HashMap<String, String>,
}

/// Discord snowflakes and Instagram ids appear both as JSON strings and as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(u64),
}

impl From<IdValue> for String {
    fn from(v: IdValue) -> Self {
        match v {
            IdValue::Text(s) => s.trim().to_string(),
            IdValue::Number(n) => n.to_string(),
        }
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdValue>::deserialize(deserializer)?
        .map(String::from)
        .filter(|s| !s.is_empty()))
}

fn id_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, IdValue>>::deserialize(deserializer)?
        .unwrap_or_default()
        .into_iter()
        .map(|(name, id)| (name, String::from(id)))
        .collect())
}

/// Credentials for posting Instagram DMs into Discord.
#[derive(Clone)]
pub struct DiscordForwarding {
    pub bot_token: String,
    pub channel_id: String,
}

/// Validated secrets: the public key is parsed once here.
#[derive(Clone)]
pub struct Secrets {
    pub access_token: String,
    pub public_key: VerifyingKey,
    pub verify_token: Option<String>,
    /// Set when both DISCORD_BOT_TOKEN and DISCORD_CHANNEL_ID are present.
    pub discord: Option<DiscordForwarding>,
    pub instagram_bot_user_id: Option<String>,
    pub discord_user_ids: HashMap<String, String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("access_token", &"<redacted>")
            .field("public_key", &hex::encode(self.public_key.as_bytes()))
            .field("verify_token", &self.verify_token.as_ref().map(|_| "<redacted>"))
            .field(
                "discord_channel_id",
                &self.discord.as_ref().map(|d| d.channel_id.as_str()),
            )
            .field("instagram_bot_user_id", &self.instagram_bot_user_id)
            .field("discord_user_ids", &self.discord_user_ids)
            .finish()
    }
}

impl Secrets {
    /// Validate raw secrets: non-empty access token and a 32-byte hex Ed25519 public key.
    pub fn from_file(file: SecretsFile) -> Result<Self> {
        let access_token = file.access_token.trim().to_string();
        if access_token.is_empty() {
            anyhow::bail!("INSTAGRAM_ACCESS_TOKEN missing or empty");
        }
        let public_key = signature::parse_verifying_key(&file.discord_public_key)
            .context("DISCORD_PUBLIC_KEY")?;
        let verify_token = file
            .verify_token
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let bot_token = file
            .discord_bot_token
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let discord = match (bot_token, file.discord_channel_id) {
            (Some(bot_token), Some(channel_id)) => Some(DiscordForwarding {
                bot_token,
                channel_id,
            }),
            (None, None) => None,
            _ => anyhow::bail!("DISCORD_BOT_TOKEN and DISCORD_CHANNEL_ID must be set together"),
        };
        Ok(Self {
            access_token,
            public_key,
            verify_token,
            discord,
            instagram_bot_user_id: file.instagram_bot_user_id,
            discord_user_ids: file.discord_user_ids,
        })
    }
}

/// Read the raw secrets file (no validation). Used by token refresh, which rewrites it.
pub fn read_secrets_file(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("secret file not found at {}", path.display()))?;
    serde_json::from_str(&s).with_context(|| format!("could not decode JSON from {}", path.display()))
}

/// Load and validate secrets. Any error is fatal to startup.
pub fn load_secrets(path: &Path) -> Result<Secrets> {
    let raw = read_secrets_file(path)?;
    let file: SecretsFile = serde_json::from_value(serde_json::Value::Object(raw))
        .with_context(|| format!("invalid secrets in {}", path.display()))?;
    let secrets = Secrets::from_file(file)
        .with_context(|| format!("invalid secrets in {}", path.display()))?;
    log::info!("loaded secrets from {}", path.display());
    Ok(secrets)
}

/// Replace INSTAGRAM_ACCESS_TOKEN in the secrets file, keeping every other key.
pub fn write_access_token(path: &Path, token: &str) -> Result<()> {
    let mut raw = read_secrets_file(path)?;
    raw.insert(
        "INSTAGRAM_ACCESS_TOKEN".to_string(),
        serde_json::Value::String(token.to_string()),
    );
    let s = serde_json::to_string_pretty(&raw)?;
    std::fs::write(path, s).with_context(|| format!("writing secrets to {}", path.display()))?;
    Ok(())
}
