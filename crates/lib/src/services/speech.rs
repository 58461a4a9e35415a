//! Speech-to-text client: single-utterance ("recognize once") transcription
//! of a local audio file.

use serde::Deserialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("speech request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("speech api error: {0}")]
    Api(String),
    #[error("reading audio file failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for the hosted single-utterance recognition endpoint.
#[derive(Clone)]
pub struct SpeechClient {
    endpoint: String,
    key: String,
    language: String,
    client: reqwest::Client,
}

impl SpeechClient {
    pub fn new(endpoint: String, key: String, language: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key,
            language,
            client: reqwest::Client::new(),
        }
    }

    /// Submit the audio file in single-utterance mode. Returns the recognized
    /// transcript, or None when the service reports a non-success reason or an
    /// empty transcript ("no text found").
    pub async fn transcribe(
        &self,
        path: &Path,
        content_type: &str,
    ) -> Result<Option<String>, SpeechError> {
        let audio = tokio::fs::read(path).await?;
        let url = format!(
            "{}/speech/recognition/conversation/cognitiveservices/v1?language={}",
            self.endpoint, self.language
        );
        let res = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(audio)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(SpeechError::Api(format!("{} {}", status, body)));
        }
        let data: RecognitionResponse = res.json().await?;
        if data.recognition_status != "Success" {
            log::debug!("speech: recognition status {}", data.recognition_status);
            return Ok(None);
        }
        let text = data.display_text.unwrap_or_default();
        if text.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    #[serde(rename = "RecognitionStatus", default)]
    recognition_status: String,
    #[serde(rename = "DisplayText", default)]
    display_text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognition_response() {
        let data: RecognitionResponse = serde_json::from_str(
            r#"{"RecognitionStatus":"Success","DisplayText":"hello there","Offset":0,"Duration":12}"#,
        )
        .expect("parse");
        assert_eq!(data.recognition_status, "Success");
        assert_eq!(data.display_text.as_deref(), Some("hello there"));
    }

    #[test]
    fn parses_no_match_response() {
        let data: RecognitionResponse =
            serde_json::from_str(r#"{"RecognitionStatus":"NoMatch"}"#).expect("parse");
        assert_eq!(data.recognition_status, "NoMatch");
        assert!(data.display_text.is_none());
    }
}
