//! Chat-completion client for reply generation. Stateless: each call sends a
//! system instruction embedding the detected intent plus the user's message.

use serde::{Deserialize, Serialize};

const API_VERSION: &str = "2024-02-01";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat api error: {0}")]
    Api(String),
}

/// Client for the hosted chat-completion deployment.
#[derive(Clone)]
pub struct ChatClient {
    endpoint: String,
    key: String,
    deployment: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(
        endpoint: String,
        key: String,
        deployment: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key,
            deployment,
            temperature,
            max_tokens,
            client: reqwest::Client::new(),
        }
    }

    /// Generate a reply for the user's message given the detected intent label.
    /// Returns whatever text the model produced (possibly empty; the caller
    /// substitutes a fallback for empty replies).
    pub async fn generate(&self, text: &str, intent: &str) -> Result<String, ChatError> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, API_VERSION
        );
        let system = format!(
            "You are a helpful WhatsApp concierge. The user's detected intent is \"{}\". \
             Answer their message briefly and politely.",
            intent
        );
        let body = CompletionRequest {
            messages: vec![
                Message {
                    role: "system",
                    content: &system,
                },
                Message {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let res = self
            .client
            .post(&url)
            .header("api-key", &self.key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChatError::Api(format!("{} {}", status, body)));
        }
        let data: CompletionResponse = res.json().await?;
        Ok(data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_completion_response() {
        let data: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"Your order is on the way!"}}]}"#,
        )
        .expect("parse");
        assert_eq!(
            data.choices[0].message.content.as_deref(),
            Some("Your order is on the way!")
        );
    }

    #[test]
    fn missing_choices_yield_no_content() {
        let data: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).expect("parse");
        assert!(data.choices.is_empty());
    }
}
