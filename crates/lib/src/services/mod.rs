//! Hosted-service clients: intent classification, speech-to-text, OCR, and
//! chat-completion reply generation. Each client is constructed once from the
//! immutable config and reached over plain HTTP.

mod chat;
mod intent;
mod speech;
mod vision;

pub use chat::{ChatClient, ChatError};
pub use intent::{IntentClient, IntentError, IntentResult};
pub use speech::{SpeechClient, SpeechError};
pub use vision::{VisionClient, VisionError};
