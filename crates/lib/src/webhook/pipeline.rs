//! The request pipeline: media download → media-type dispatch →
//! transcription/OCR → intent detection → reply generation.
//!
//! The pipeline is parameterized over injectable client traits so tests can
//! substitute fakes for every hosted service. Within one request every call
//! is sequential and attempted exactly once; content failures degrade rather
//! than abort (only media resolution is terminal).

use crate::media::{MediaError, MediaKind, MediaStore, ResolvedMedia};
use crate::services::{ChatClient, IntentClient, IntentResult, SpeechClient, VisionClient};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

/// Fixed body for a failed media download (HTTP 500).
pub const MEDIA_FAILED_BODY: &str = "media download failed";
/// Fixed body when neither the message body nor extraction produced text (HTTP 200).
pub const NO_USABLE_MESSAGE_BODY: &str = "no usable message";
/// Substituted when reply generation fails outright.
pub const APOLOGY_REPLY: &str =
    "Sorry, something went wrong while preparing your reply. Please try again in a moment.";
/// Substituted when the generator returns an empty reply.
pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, I don't have an answer for that right now.";

/// Inbound webhook form fields. Only the first attachment is processed.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookForm {
    #[serde(rename = "From", default)]
    pub from: Option<String>,
    #[serde(rename = "Body", default)]
    pub body: Option<String>,
    #[serde(rename = "NumMedia", default)]
    pub num_media: Option<String>,
    #[serde(rename = "MediaUrl0", default)]
    pub media_url0: Option<String>,
    #[serde(rename = "MediaContentType0", default)]
    pub media_content_type0: Option<String>,
}

/// Request-scoped message parsed from the webhook form; read-only after creation.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: String,
    pub body: Option<String>,
    pub num_media: u32,
    pub media_url: Option<String>,
    pub media_content_type: Option<String>,
}

impl From<WebhookForm> for InboundMessage {
    fn from(form: WebhookForm) -> Self {
        let body = form
            .body
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        // Absent or unparseable NumMedia is treated as no attachments.
        let num_media = form
            .num_media
            .as_deref()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(0);
        Self {
            sender: form.from.unwrap_or_default(),
            body,
            num_media,
            media_url: form.media_url0.filter(|s| !s.trim().is_empty()),
            media_content_type: form.media_content_type0.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Final outcome of one webhook request; the server maps this to HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReply {
    /// Reply envelope, HTTP 200, content type application/xml.
    Envelope(String),
    /// Fixed "no usable message" body, HTTP 200.
    NoUsableMessage,
    /// Fixed media-failure body, HTTP 500.
    MediaFailed,
    /// Attachment declared but URL or content type missing, HTTP 400.
    BadAttachment,
}

/// Fetches an attachment and stores it locally.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str, declared_content_type: &str)
        -> Result<ResolvedMedia, String>;
}

/// Turns an audio file into text. `Ok(None)` means "no text found".
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, path: &Path, content_type: &str)
        -> Result<Option<String>, String>;
}

/// Turns an image file into text. `Ok(None)` means "no text found" (including
/// an exhausted poll budget).
#[async_trait]
pub trait TextReader: Send + Sync {
    async fn read_text(&self, path: &Path) -> Result<Option<String>, String>;
}

/// Classifies message text into an intent label and confidence.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<IntentResult, String>;
}

/// Generates reply text for a message and its detected intent.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate(&self, text: &str, intent: &str) -> Result<String, String>;
}

#[async_trait]
impl MediaFetcher for MediaStore {
    async fn fetch(
        &self,
        url: &str,
        declared_content_type: &str,
    ) -> Result<ResolvedMedia, String> {
        MediaStore::fetch(self, url, declared_content_type)
            .await
            .map_err(|e: MediaError| e.to_string())
    }
}

#[async_trait]
impl Transcriber for SpeechClient {
    async fn transcribe(
        &self,
        path: &Path,
        content_type: &str,
    ) -> Result<Option<String>, String> {
        SpeechClient::transcribe(self, path, content_type)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl TextReader for VisionClient {
    async fn read_text(&self, path: &Path) -> Result<Option<String>, String> {
        VisionClient::read_text(self, path)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl IntentClassifier for IntentClient {
    async fn classify(&self, text: &str) -> Result<IntentResult, String> {
        IntentClient::classify(self, text)
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ReplyGenerator for ChatClient {
    async fn generate(&self, text: &str, intent: &str) -> Result<String, String> {
        ChatClient::generate(self, text, intent)
            .await
            .map_err(|e| e.to_string())
    }
}

/// The capability set the handler runs against. Built from the real clients at
/// startup; tests build it from fakes.
pub struct Pipeline {
    pub media: Arc<dyn MediaFetcher>,
    pub transcriber: Arc<dyn Transcriber>,
    pub reader: Arc<dyn TextReader>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub generator: Arc<dyn ReplyGenerator>,
}

impl Pipeline {
    /// Run the full pipeline for one inbound message.
    pub async fn handle(&self, msg: InboundMessage) -> WebhookReply {
        let mut text = msg.body.clone();

        if msg.num_media > 0 {
            let (Some(url), Some(content_type)) =
                (msg.media_url.as_deref(), msg.media_content_type.as_deref())
            else {
                log::warn!(
                    "webhook: {} attachment(s) declared but url or content type missing",
                    msg.num_media
                );
                return WebhookReply::BadAttachment;
            };
            let resolved = match self.media.fetch(url, content_type).await {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("webhook: media resolution failed: {}", e);
                    return WebhookReply::MediaFailed;
                }
            };
            let extracted = match resolved.kind {
                MediaKind::Audio => {
                    match self.transcriber.transcribe(&resolved.path, content_type).await {
                        Ok(t) => t,
                        Err(e) => {
                            log::warn!("webhook: transcription failed: {}", e);
                            None
                        }
                    }
                }
                MediaKind::Image => match self.reader.read_text(&resolved.path).await {
                    Ok(t) => t,
                    Err(e) => {
                        log::warn!("webhook: ocr failed: {}", e);
                        None
                    }
                },
                MediaKind::Unsupported => {
                    log::debug!("webhook: unsupported media type {}", content_type);
                    None
                }
            };
            if extracted.is_some() {
                text = extracted;
            }
        }

        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return WebhookReply::NoUsableMessage;
        };

        let intent = match self.classifier.classify(&text).await {
            Ok(result) => {
                log::info!(
                    "webhook: intent {} ({:.2}) for {}",
                    result.label,
                    result.confidence,
                    msg.sender
                );
                result
            }
            Err(e) => {
                log::warn!("webhook: intent classification failed: {}", e);
                IntentResult::unknown()
            }
        };

        let reply = match self.generator.generate(&text, &intent.label).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                log::warn!("webhook: generator returned empty reply, using fallback");
                EMPTY_REPLY_FALLBACK.to_string()
            }
            Err(e) => {
                log::warn!("webhook: reply generation failed: {}", e);
                APOLOGY_REPLY.to_string()
            }
        };

        WebhookReply::Envelope(crate::webhook::twiml::message_response(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(body: Option<&str>, num_media: Option<&str>) -> WebhookForm {
        WebhookForm {
            from: Some("whatsapp:+15551234567".to_string()),
            body: body.map(|s| s.to_string()),
            num_media: num_media.map(|s| s.to_string()),
            media_url0: None,
            media_content_type0: None,
        }
    }

    #[test]
    fn absent_num_media_is_zero() {
        let msg = InboundMessage::from(form(Some("hi"), None));
        assert_eq!(msg.num_media, 0);
    }

    #[test]
    fn unparseable_num_media_is_zero() {
        let msg = InboundMessage::from(form(Some("hi"), Some("lots")));
        assert_eq!(msg.num_media, 0);
    }

    #[test]
    fn blank_body_is_none() {
        let msg = InboundMessage::from(form(Some("   "), Some("0")));
        assert!(msg.body.is_none());
    }

    #[test]
    fn parses_attachment_count() {
        let msg = InboundMessage::from(form(None, Some("2")));
        assert_eq!(msg.num_media, 2);
    }
}
