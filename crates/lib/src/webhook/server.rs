//! Webhook HTTP server: health probe plus the inbound WhatsApp endpoint.

use crate::config::{self, Config};
use crate::media::MediaStore;
use crate::services::{ChatClient, IntentClient, SpeechClient, VisionClient};
use crate::webhook::pipeline::{
    InboundMessage, Pipeline, WebhookForm, WebhookReply, MEDIA_FAILED_BODY, NO_USABLE_MESSAGE_BODY,
};
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the webhook server (config + injectable pipeline).
#[derive(Clone)]
pub struct WebhookState {
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
}

impl WebhookState {
    /// Wire the real hosted-service clients from the config. Fails closed when
    /// any required endpoint or credential is missing.
    pub fn from_config(config: Config) -> Result<Self> {
        config::validate(&config)?;
        let media = MediaStore::new(
            config::resolve_account_sid(&config),
            config::resolve_auth_token(&config),
            config::resolve_download_dir(&config),
        );
        let intent = &config.intent;
        let classifier = IntentClient::new(
            intent.endpoint.clone().unwrap_or_default(),
            config::resolve_intent_key(&config).unwrap_or_default(),
            intent.project.clone().unwrap_or_default(),
            intent.deployment.clone().unwrap_or_default(),
            intent.language.clone(),
        );
        let transcriber = SpeechClient::new(
            config.speech.endpoint.clone().unwrap_or_default(),
            config::resolve_speech_key(&config).unwrap_or_default(),
            config.speech.language.clone(),
        );
        let reader = VisionClient::new(
            config.vision.endpoint.clone().unwrap_or_default(),
            config::resolve_vision_key(&config).unwrap_or_default(),
        );
        let generator = ChatClient::new(
            config.chat.endpoint.clone().unwrap_or_default(),
            config::resolve_chat_key(&config).unwrap_or_default(),
            config.chat.deployment.clone().unwrap_or_default(),
            config.chat.temperature,
            config.chat.max_tokens,
        );
        let pipeline = Pipeline {
            media: Arc::new(media),
            transcriber: Arc::new(transcriber),
            reader: Arc::new(reader),
            classifier: Arc::new(classifier),
            generator: Arc::new(generator),
        };
        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        })
    }
}

/// Build the router (health + webhook). Exposed so tests can serve it on a
/// free port.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/whatsapp/webhook", post(whatsapp_webhook))
        .with_state(state)
}

/// Run the webhook server; binds to config.webhook.bind:config.webhook.port.
/// Fails closed when required configuration is missing.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_webhook(config: Config) -> Result<()> {
    let bind = config.webhook.bind.trim().to_string();
    let port = config.webhook.port;
    let state = WebhookState::from_config(config)?;
    let app = router(state);

    let bind_addr = format!("{}:{}", bind, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("webhook listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("webhook server exited")?;
    log::info!("webhook stopped");
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

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<WebhookState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.webhook.port,
    }))
}

/// POST /whatsapp/webhook — form-encoded inbound message from the gateway.
async fn whatsapp_webhook(
    State(state): State<WebhookState>,
    Form(form): Form<WebhookForm>,
) -> Response {
    let msg = InboundMessage::from(form);
    log::debug!(
        "webhook: inbound from {} ({} attachment(s))",
        msg.sender,
        msg.num_media
    );
    match state.pipeline.handle(msg).await {
        WebhookReply::Envelope(xml) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/xml")],
            xml,
        )
            .into_response(),
        WebhookReply::NoUsableMessage => {
            (StatusCode::OK, NO_USABLE_MESSAGE_BODY).into_response()
        }
        WebhookReply::MediaFailed => {
            (StatusCode::INTERNAL_SERVER_ERROR, MEDIA_FAILED_BODY).into_response()
        }
        WebhookReply::BadAttachment => (
            StatusCode::BAD_REQUEST,
            "attachment url or content type missing",
        )
            .into_response(),
    }
}
