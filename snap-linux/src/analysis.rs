//! Vision-model collaborator: send a received photo with a prompt, get free text back.
//! One request per photo, never retried.

use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use snap_core::analysis::{MAX_TOKENS, TEST_MODE_KEY, TEST_MODE_RESULT};
use snap_core::collab::{CollabFuture, PhotoAnalyzer};
use snap_core::AssembledPhoto;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unexpected response format")]
    UnexpectedResponse,
}

pub type Analyzer = Box<dyn PhotoAnalyzer<Error = AnalysisError>>;

/// `TEST_MODE` selects the local analyzer; a blank key disables analysis.
pub fn from_config(cfg: &Config) -> Result<Analyzer, AnalysisError> {
    match cfg.api_key.trim() {
        "" => Err(AnalysisError::MissingApiKey),
        TEST_MODE_KEY => Ok(Box::new(TestModeAnalyzer)),
        key => Ok(Box::new(OpenAiAnalyzer {
            client: reqwest::Client::new(),
            url: cfg.api_url.clone(),
            api_key: key.to_string(),
            model: cfg.model.clone(),
        })),
    }
}

/// Answers with a canned text without touching the network.
pub struct TestModeAnalyzer;

impl PhotoAnalyzer for TestModeAnalyzer {
    type Error = AnalysisError;

    fn analyze<'a>(
        &'a self,
        _photo: &'a AssembledPhoto,
        _prompt: &'a str,
    ) -> CollabFuture<'a, Result<String, AnalysisError>> {
        Box::pin(async { Ok(TEST_MODE_RESULT.to_string()) })
    }
}

pub struct OpenAiAnalyzer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl PhotoAnalyzer for OpenAiAnalyzer {
    type Error = AnalysisError;

    fn analyze<'a>(
        &'a self,
        photo: &'a AssembledPhoto,
        prompt: &'a str,
    ) -> CollabFuture<'a, Result<String, AnalysisError>> {
        Box::pin(async move {
            let body = request_body(&self.model, photo, prompt);
            let resp = self
                .client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;
            let status = resp.status();
            let bytes = resp.bytes().await?;
            tracing::debug!(event = "analysis_response", status = status.as_u16(), len = bytes.len());
            parse_response(&bytes)
        })
    }
}

/// Chat-completions request carrying the photo inline as a base64 data URL.
pub fn request_body(model: &str, photo: &AssembledPhoto, prompt: &str) -> serde_json::Value {
    let encoded = base64::engine::general_purpose::STANDARD.encode(photo.bytes());
    json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": prompt },
                {
                    "type": "image_url",
                    "image_url": { "url": format!("data:{};base64,{}", photo.mime_type(), encoded) }
                }
            ]
        }],
        "max_tokens": MAX_TOKENS
    })
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// First choice's content, else the API's error message.
pub fn parse_response(bytes: &[u8]) -> Result<String, AnalysisError> {
    let resp: ChatResponse = serde_json::from_slice(bytes)?;
    if let Some(content) = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
    {
        return Ok(content);
    }
    if let Some(message) = resp.error.and_then(|e| e.message) {
        return Err(AnalysisError::Api(message));
    }
    tracing::warn!(
        event = "analysis_unexpected_response",
        raw = %String::from_utf8_lossy(bytes)
    );
    Err(AnalysisError::UnexpectedResponse)
}
