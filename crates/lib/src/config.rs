//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.yerba/config.json`) and environment.
//! Every hosted-service endpoint and key lives here; the loaded `Config` is
//! immutable and passed into each client constructor.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Webhook server settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Media fetch credentials and download directory.
    #[serde(default)]
    pub media: MediaConfig,

    /// Hosted intent-classification (conversation analysis) service.
    #[serde(default)]
    pub intent: IntentConfig,

    /// Hosted speech-to-text service.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Hosted OCR (read) service.
    #[serde(default)]
    pub vision: VisionConfig,

    /// Hosted chat-completion service for reply generation.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Webhook bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Port for the inbound webhook HTTP server (default 8787).
    #[serde(default = "default_webhook_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_webhook_bind")]
    pub bind: String,
}

fn default_webhook_port() -> u16 {
    8787
}

fn default_webhook_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: default_webhook_port(),
            bind: default_webhook_bind(),
        }
    }
}

/// Media fetch config: basic-auth credentials for the gateway's media host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaConfig {
    /// Account SID for basic auth. Overridden by TWILIO_ACCOUNT_SID env when set.
    pub account_sid: Option<String>,
    /// Auth token for basic auth. Overridden by TWILIO_AUTH_TOKEN env when set.
    pub auth_token: Option<String>,
    /// Directory for transient media downloads (default: OS temp dir).
    pub download_dir: Option<PathBuf>,
}

/// Intent service config (conversation analysis project + deployment).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentConfig {
    /// Service base URL, e.g. "https://my-lang.cognitiveservices.azure.com".
    pub endpoint: Option<String>,
    /// Subscription key. Overridden by YERBA_INTENT_KEY env when set.
    pub key: Option<String>,
    /// Project name for the deployed conversation model.
    pub project: Option<String>,
    /// Deployment name (e.g. "production").
    pub deployment: Option<String>,
    /// Language tag sent with each utterance (default "en").
    #[serde(default = "default_intent_language")]
    pub language: String,
}

fn default_intent_language() -> String {
    "en".to_string()
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            project: None,
            deployment: None,
            language: default_intent_language(),
        }
    }
}

/// Speech-to-text service config (single-utterance recognition endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechConfig {
    /// Recognition base URL, e.g. "https://westeurope.stt.speech.microsoft.com".
    pub endpoint: Option<String>,
    /// Subscription key. Overridden by YERBA_SPEECH_KEY env when set.
    pub key: Option<String>,
    /// Recognition language (default "en-US").
    #[serde(default = "default_speech_language")]
    pub language: String,
}

fn default_speech_language() -> String {
    "en-US".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            language: default_speech_language(),
        }
    }
}

/// OCR (read operation) service config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionConfig {
    /// Service base URL, e.g. "https://my-vision.cognitiveservices.azure.com".
    pub endpoint: Option<String>,
    /// Subscription key. Overridden by YERBA_VISION_KEY env when set.
    pub key: Option<String>,
}

/// Chat-completion service config for reply generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    /// Service base URL, e.g. "https://my-openai.openai.azure.com".
    pub endpoint: Option<String>,
    /// API key. Overridden by YERBA_CHAT_KEY env when set.
    pub key: Option<String>,
    /// Deployment (model) name to call.
    pub deployment: Option<String>,
    /// Sampling temperature (default 0.7).
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    /// Output token bound (default 200).
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
}

fn default_chat_temperature() -> f32 {
    0.7
}

fn default_chat_max_tokens() -> u32 {
    200
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            deployment: None,
            temperature: default_chat_temperature(),
            max_tokens: default_chat_max_tokens(),
        }
    }
}

fn env_or(name: &str, config_value: Option<&String>) -> Option<String> {
    std::env::var(name)
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config_value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve the media account SID: env TWILIO_ACCOUNT_SID overrides config.
pub fn resolve_account_sid(config: &Config) -> Option<String> {
    env_or("TWILIO_ACCOUNT_SID", config.media.account_sid.as_ref())
}

/// Resolve the media auth token: env TWILIO_AUTH_TOKEN overrides config.
pub fn resolve_auth_token(config: &Config) -> Option<String> {
    env_or("TWILIO_AUTH_TOKEN", config.media.auth_token.as_ref())
}

/// Resolve the intent service key: env YERBA_INTENT_KEY overrides config.
pub fn resolve_intent_key(config: &Config) -> Option<String> {
    env_or("YERBA_INTENT_KEY", config.intent.key.as_ref())
}

/// Resolve the speech service key: env YERBA_SPEECH_KEY overrides config.
pub fn resolve_speech_key(config: &Config) -> Option<String> {
    env_or("YERBA_SPEECH_KEY", config.speech.key.as_ref())
}

/// Resolve the vision service key: env YERBA_VISION_KEY overrides config.
pub fn resolve_vision_key(config: &Config) -> Option<String> {
    env_or("YERBA_VISION_KEY", config.vision.key.as_ref())
}

/// Resolve the chat service key: env YERBA_CHAT_KEY overrides config.
pub fn resolve_chat_key(config: &Config) -> Option<String> {
    env_or("YERBA_CHAT_KEY", config.chat.key.as_ref())
}

/// Resolve the media download directory (default: OS temp dir).
pub fn resolve_download_dir(config: &Config) -> PathBuf {
    config
        .media
        .download_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir)
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("YERBA_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".yerba").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the default path (or YERBA_CONFIG_PATH). Missing file => default config.
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

/// Validate that every hosted-service endpoint and credential the pipeline needs
/// is present. Fails closed: the webhook server refuses to start, and the error
/// lists each missing value by config path (with its env override name).
pub fn validate(config: &Config) -> Result<()> {
    let mut missing: Vec<&str> = Vec::new();
    if resolve_account_sid(config).is_none() {
        missing.push("media.accountSid (or TWILIO_ACCOUNT_SID)");
    }
    if resolve_auth_token(config).is_none() {
        missing.push("media.authToken (or TWILIO_AUTH_TOKEN)");
    }
    if config.intent.endpoint.is_none() {
        missing.push("intent.endpoint");
    }
    if resolve_intent_key(config).is_none() {
        missing.push("intent.key (or YERBA_INTENT_KEY)");
    }
    if config.intent.project.is_none() {
        missing.push("intent.project");
    }
    if config.intent.deployment.is_none() {
        missing.push("intent.deployment");
    }
    if config.speech.endpoint.is_none() {
        missing.push("speech.endpoint");
    }
    if resolve_speech_key(config).is_none() {
        missing.push("speech.key (or YERBA_SPEECH_KEY)");
    }
    if config.vision.endpoint.is_none() {
        missing.push("vision.endpoint");
    }
    if resolve_vision_key(config).is_none() {
        missing.push("vision.key (or YERBA_VISION_KEY)");
    }
    if config.chat.endpoint.is_none() {
        missing.push("chat.endpoint");
    }
    if resolve_chat_key(config).is_none() {
        missing.push("chat.key (or YERBA_CHAT_KEY)");
    }
    if config.chat.deployment.is_none() {
        missing.push("chat.deployment");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("missing required configuration: {}", missing.join(", "))
    }
}
