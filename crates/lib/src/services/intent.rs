//! Conversation-analysis client: classifies a single utterance into an intent
//! label with a confidence score.
//!
//! The service's `intents` field arrives in one of two shapes (a map keyed by
//! label, or a list of `{category, confidenceScore}` objects); both are
//! normalized into one `IntentResult` as soon as the response is parsed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const API_VERSION: &str = "2023-04-01";

/// Intent label used when the top intent cannot be located in the response.
pub const UNKNOWN_INTENT: &str = "unknown";

/// Canonical classification result: label plus confidence in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct IntentResult {
    pub label: String,
    pub confidence: f64,
}

impl IntentResult {
    /// The degraded default: "unknown" with zero confidence.
    pub fn unknown() -> Self {
        Self {
            label: UNKNOWN_INTENT.to_string(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("intent request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("intent api error: {0}")]
    Api(String),
}

/// Client for the hosted conversation-analysis endpoint.
#[derive(Clone)]
pub struct IntentClient {
    endpoint: String,
    key: String,
    project: String,
    deployment: String,
    language: String,
    client: reqwest::Client,
}

impl IntentClient {
    pub fn new(
        endpoint: String,
        key: String,
        project: String,
        deployment: String,
        language: String,
    ) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key,
            project,
            deployment,
            language,
            client: reqwest::Client::new(),
        }
    }

    /// POST one utterance for classification and normalize the prediction.
    pub async fn classify(&self, text: &str) -> Result<IntentResult, IntentError> {
        let url = format!(
            "{}/language/:analyze-conversations?api-version={}",
            self.endpoint, API_VERSION
        );
        let body = AnalyzeRequest {
            kind: "Conversation",
            analysis_input: AnalysisInput {
                conversation_item: ConversationItem {
                    id: "1",
                    participant_id: "user",
                    language: &self.language,
                    text,
                },
            },
            parameters: AnalyzeParameters {
                project_name: &self.project,
                deployment_name: &self.deployment,
                string_index_type: "Utf16CodeUnit",
            },
        };
        let res = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(IntentError::Api(format!("{} {}", status, body)));
        }
        let data: AnalyzeResponse = res.json().await?;
        Ok(normalize_prediction(&data))
    }
}

/// Locate the top intent's score in whichever shape the `intents` field took.
/// Missing prediction, missing top intent, or a top intent absent from the
/// `intents` field all degrade to `IntentResult::unknown()`.
fn normalize_prediction(response: &AnalyzeResponse) -> IntentResult {
    let Some(prediction) = response.result.as_ref().map(|r| &r.prediction) else {
        return IntentResult::unknown();
    };
    let Some(top) = prediction.top_intent.as_deref().filter(|s| !s.is_empty()) else {
        return IntentResult::unknown();
    };
    let confidence = match &prediction.intents {
        Some(IntentsField::Map(map)) => map.get(top).map(|s| s.confidence_score),
        Some(IntentsField::List(list)) => list
            .iter()
            .find(|entry| entry.category == top)
            .map(|entry| entry.confidence_score),
        None => None,
    };
    match confidence {
        Some(score) => IntentResult {
            label: top.to_string(),
            confidence: score,
        },
        None => IntentResult::unknown(),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeRequest<'a> {
    kind: &'a str,
    analysis_input: AnalysisInput<'a>,
    parameters: AnalyzeParameters<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisInput<'a> {
    conversation_item: ConversationItem<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationItem<'a> {
    id: &'a str,
    participant_id: &'a str,
    language: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeParameters<'a> {
    project_name: &'a str,
    deployment_name: &'a str,
    string_index_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    prediction: Prediction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    #[serde(default)]
    top_intent: Option<String>,
    #[serde(default)]
    intents: Option<IntentsField>,
}

/// The two upstream shapes for the `intents` field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntentsField {
    List(Vec<IntentEntry>),
    Map(HashMap<String, IntentScore>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentEntry {
    category: String,
    #[serde(default)]
    confidence_score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IntentScore {
    #[serde(default)]
    confidence_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> IntentResult {
        let response: AnalyzeResponse = serde_json::from_str(raw).expect("parse response");
        normalize_prediction(&response)
    }

    #[test]
    fn normalizes_map_shape() {
        let result = parse(
            r#"{"result":{"prediction":{"topIntent":"book_flight",
                "intents":{"book_flight":{"confidenceScore":0.87},"cancel":{"confidenceScore":0.1}}}}}"#,
        );
        assert_eq!(result.label, "book_flight");
        assert!((result.confidence - 0.87).abs() < 1e-9);
    }

    #[test]
    fn normalizes_list_shape() {
        let result = parse(
            r#"{"result":{"prediction":{"topIntent":"book_flight",
                "intents":[{"category":"book_flight","confidenceScore":0.87},
                           {"category":"cancel","confidenceScore":0.1}]}}}"#,
        );
        assert_eq!(result.label, "book_flight");
        assert!((result.confidence - 0.87).abs() < 1e-9);
    }

    #[test]
    fn both_shapes_yield_identical_results() {
        let map = parse(
            r#"{"result":{"prediction":{"topIntent":"order_status",
                "intents":{"order_status":{"confidenceScore":0.91}}}}}"#,
        );
        let list = parse(
            r#"{"result":{"prediction":{"topIntent":"order_status",
                "intents":[{"category":"order_status","confidenceScore":0.91}]}}}"#,
        );
        assert_eq!(map, list);
    }

    #[test]
    fn missing_top_intent_is_unknown() {
        let result = parse(r#"{"result":{"prediction":{"intents":[]}}}"#);
        assert_eq!(result, IntentResult::unknown());
    }

    #[test]
    fn top_intent_absent_from_intents_is_unknown() {
        let result = parse(
            r#"{"result":{"prediction":{"topIntent":"book_flight",
                "intents":[{"category":"cancel","confidenceScore":0.5}]}}}"#,
        );
        assert_eq!(result, IntentResult::unknown());
    }

    #[test]
    fn missing_result_is_unknown() {
        let result = parse(r#"{}"#);
        assert_eq!(result, IntentResult::unknown());
        assert_eq!(result.label, "unknown");
        assert_eq!(result.confidence, 0.0);
    }
}
