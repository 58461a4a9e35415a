//! OCR client: submits image bytes to the asynchronous read operation and
//! polls the operation-status URL until the result is ready or the poll
//! budget runs out. Exhausting the budget is an outcome, not an error.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_POLLS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("vision request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("vision api error: {0}")]
    Api(String),
    #[error("reading image file failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Client for the hosted async read (OCR) operation.
#[derive(Clone)]
pub struct VisionClient {
    endpoint: String,
    key: String,
    initial_delay: Duration,
    poll_interval: Duration,
    max_polls: u32,
    client: reqwest::Client,
}

impl VisionClient {
    pub fn new(endpoint: String, key: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            key,
            initial_delay: DEFAULT_INITIAL_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_polls: DEFAULT_MAX_POLLS,
            client: reqwest::Client::new(),
        }
    }

    /// Override the poll timing (tests use near-zero delays).
    pub fn with_poll_timing(
        mut self,
        initial_delay: Duration,
        poll_interval: Duration,
        max_polls: u32,
    ) -> Self {
        self.initial_delay = initial_delay;
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }

    /// Submit the image and poll for the read result. Returns all recognized
    /// lines joined by newlines in service order, or None on failure status,
    /// empty result, or an exhausted poll budget.
    pub async fn read_text(&self, path: &Path) -> Result<Option<String>, VisionError> {
        let image = tokio::fs::read(path).await?;
        let url = format!("{}/vision/v3.2/read/analyze", self.endpoint);
        let res = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.key)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VisionError::Api(format!("{} {}", status, body)));
        }
        let operation_url = res
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| VisionError::Api("missing Operation-Location header".to_string()))?;

        tokio::time::sleep(self.initial_delay).await;
        for attempt in 1..=self.max_polls {
            let res = self
                .client
                .get(&operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.key)
                .send()
                .await?;
            if !res.status().is_success() {
                let status = res.status();
                let body = res.text().await.unwrap_or_default();
                return Err(VisionError::Api(format!("{} {}", status, body)));
            }
            let data: ReadOperation = res.json().await?;
            match data.status.as_str() {
                "succeeded" => {
                    let text = joined_lines(&data);
                    return Ok(if text.is_empty() { None } else { Some(text) });
                }
                "failed" => {
                    log::debug!("vision: read operation failed");
                    return Ok(None);
                }
                other => {
                    log::debug!("vision: poll {}/{}: status {}", attempt, self.max_polls, other);
                }
            }
            if attempt < self.max_polls {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        log::debug!("vision: poll budget exhausted, treating as no text");
        Ok(None)
    }
}

/// Concatenate all recognized line strings in the order the service returned
/// them, joined by newlines.
fn joined_lines(operation: &ReadOperation) -> String {
    let mut lines: Vec<&str> = Vec::new();
    if let Some(ref result) = operation.analyze_result {
        for page in &result.read_results {
            for line in &page.lines {
                lines.push(&line.text);
            }
        }
    }
    lines.join("\n")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadOperation {
    #[serde(default)]
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResult {
    #[serde(default)]
    read_results: Vec<ReadPage>,
}

#[derive(Debug, Deserialize)]
struct ReadPage {
    #[serde(default)]
    lines: Vec<ReadLine>,
}

#[derive(Debug, Deserialize)]
struct ReadLine {
    text: String,
}
