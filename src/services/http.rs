use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{AnswerDetection, AnswerRequest, AudioClip, BatchTranscript, EnrichmentService};
use crate::error::EnrichmentError;
use crate::kernel::segment::Answer;

/// Client for the meeting service's `/api/*` endpoints.
///
/// Every endpoint answers 2xx with a JSON body, or non-2xx with
/// `{error: <message>}` where the message is meant for the user.
#[derive(Clone)]
pub struct HttpEnrichmentClient {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnswerPayload {
    #[serde(default)]
    is_question: bool,
    #[serde(default)]
    answer: Option<AnswerFields>,
}

#[derive(Deserialize)]
struct AnswerFields {
    #[serde(default)]
    english: Option<String>,
    #[serde(default)]
    chinese: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscribePayload {
    #[serde(default)]
    english_transcript: String,
    #[serde(default)]
    chinese_translation: String,
}

impl HttpEnrichmentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Read the body of a response, turning the error convention into `EnrichmentError`.
    async fn read_payload(response: Response) -> Result<Value, EnrichmentError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .filter(|m| !m.trim().is_empty());
            warn!("Enrichment endpoint returned {}", status);
            return Err(match message {
                Some(m) => EnrichmentError::Service(m),
                None => EnrichmentError::Status(status.as_u16()),
            });
        }

        serde_json::from_str(&body).map_err(|e| EnrichmentError::Decode(e.to_string()))
    }
}

#[async_trait]
impl EnrichmentService for HttpEnrichmentClient {
    async fn translate(&self, text: &str) -> Result<String, EnrichmentError> {
        debug!("POST /api/translate ({} chars)", text.len());
        let response = self
            .client
            .post(self.endpoint("translate"))
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let payload = Self::read_payload(response).await?;
        // Absent or non-string translation reads as empty
        Ok(payload
            .get("translation")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn detect_answer(&self, request: &AnswerRequest) -> Result<AnswerDetection, EnrichmentError> {
        debug!(
            "POST /api/answer ({} chars, {} history entries)",
            request.text.len(),
            request.history.len()
        );
        let response = self
            .client
            .post(self.endpoint("answer"))
            .json(request)
            .send()
            .await?;

        let payload = Self::read_payload(response).await?;
        let parsed: AnswerPayload =
            serde_json::from_value(payload).map_err(|e| EnrichmentError::Decode(e.to_string()))?;

        if !parsed.is_question {
            return Ok(AnswerDetection::not_a_question());
        }

        Ok(AnswerDetection {
            is_question: true,
            answer: parsed.answer.map(|a| Answer {
                english: a.english.unwrap_or_default(),
                chinese: a.chinese.unwrap_or_default(),
            }),
        })
    }

    async fn transcribe(&self, clip: AudioClip) -> Result<BatchTranscript, EnrichmentError> {
        clip.ensure_within_limit()?;
        debug!("POST /api/transcribe ({} bytes)", clip.bytes.len());

        let part = Part::bytes(clip.bytes)
            .file_name(clip.file_name)
            .mime_str(&clip.mime_type)?;
        let form = Form::new().part("audio", part);

        let response = self
            .client
            .post(self.endpoint("transcribe"))
            .multipart(form)
            .send()
            .await?;

        let payload = Self::read_payload(response).await?;
        let parsed: TranscribePayload =
            serde_json::from_value(payload).map_err(|e| EnrichmentError::Decode(e.to_string()))?;

        Ok(BatchTranscript {
            english_transcript: parsed.english_transcript,
            chinese_translation: parsed.chinese_translation,
        })
    }
}
