//! Inbound WhatsApp webhook: HTTP server, request pipeline, and the gateway
//! reply envelope.

pub mod pipeline;
pub mod server;
pub mod twiml;

pub use pipeline::{InboundMessage, Pipeline, WebhookForm, WebhookReply};
pub use server::{router, run_webhook, WebhookState};
