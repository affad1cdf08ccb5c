use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::prompts::{
    context_line, question_prompt, ANSWER_CONTEXT_LIMIT, ANSWER_SEPARATOR, QUESTION_DETECTOR_SYSTEM,
    TRANSCRIPT_TRANSLATOR_SYSTEM, TRANSLATOR_SYSTEM,
};
use crate::config::OpenAiConfig;
use crate::error::EnrichmentError;
use crate::kernel::segment::Answer;
use crate::services::{AnswerDetection, AnswerRequest, AudioClip, BatchTranscript, EnrichmentService};

/// Talks to an OpenAI-compatible API directly, doing the request shaping the
/// meeting service would otherwise do server side.
#[derive(Clone)]
pub struct DirectCompletionService {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    error: Option<UpstreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: Option<String>,
}

impl DirectCompletionService {
    pub fn new(config: OpenAiConfig, timeout: Duration) -> Result<Self, EnrichmentError> {
        if config.api_key.trim().is_empty() {
            return Err(EnrichmentError::MissingCredential("OPENAI_API_KEY".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
        max_tokens: Option<u32>,
        fallback: &str,
    ) -> Result<String, EnrichmentError> {
        let request = ChatCompletionRequest {
            model: &self.config.chat_model,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let response = check_upstream(response, fallback).await?;
        let parsed: ChatCompletionResponse = response.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default())
    }

    async fn translate_with(&self, system: &str, text: &str) -> Result<String, EnrichmentError> {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: system.to_string(),
            },
            ChatMessage {
                role: "user",
                content: text.trim().to_string(),
            },
        ];
        let translation = self
            .chat(messages, 0.2, None, "The translation request to the model failed.")
            .await?;
        if translation.is_empty() {
            return Err(EnrichmentError::Service(
                "The model did not return a usable translation.".to_string(),
            ));
        }
        Ok(translation)
    }
}

/// Map a non-2xx upstream response to its `error.message`.
async fn check_upstream(response: Response, fallback: &str) -> Result<Response, EnrichmentError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let message = response
        .json::<UpstreamError>()
        .await
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| fallback.to_string());
    warn!("Upstream completion API returned {}: {}", status, message);
    Err(EnrichmentError::Service(message))
}

/// Split a bilingual answer on the separator. If either half is missing,
/// the whole reply is used for both languages.
pub fn split_bilingual(full: &str) -> Answer {
    let full = full.trim();
    let mut parts = full.split(ANSWER_SEPARATOR).map(str::trim);
    let english = parts.next().unwrap_or_default();
    let chinese = parts.next().unwrap_or_default();

    if english.is_empty() || chinese.is_empty() {
        return Answer {
            english: full.to_string(),
            chinese: full.to_string(),
        };
    }

    Answer {
        english: english.to_string(),
        chinese: chinese.to_string(),
    }
}

#[async_trait]
impl EnrichmentService for DirectCompletionService {
    async fn translate(&self, text: &str) -> Result<String, EnrichmentError> {
        if text.trim().is_empty() {
            return Err(EnrichmentError::Service("Missing English text to translate.".to_string()));
        }
        self.translate_with(TRANSLATOR_SYSTEM, text).await
    }

    async fn detect_answer(&self, request: &AnswerRequest) -> Result<AnswerDetection, EnrichmentError> {
        if request.text.trim().is_empty() {
            return Err(EnrichmentError::Service("Provide some text to analyze.".to_string()));
        }

        // Step 1: is this a question at all?
        let verdict = self
            .chat(
                vec![
                    ChatMessage {
                        role: "system",
                        content: QUESTION_DETECTOR_SYSTEM.to_string(),
                    },
                    ChatMessage {
                        role: "user",
                        content: request.text.clone(),
                    },
                ],
                0.1,
                Some(10),
                "Question detection failed.",
            )
            .await?;

        if !verdict.trim().eq_ignore_ascii_case("true") {
            debug!("Detector verdict: not a question");
            return Ok(AnswerDetection::not_a_question());
        }

        // Step 2: answer it with recent context
        let skip = request.history.len().saturating_sub(ANSWER_CONTEXT_LIMIT);
        let mut messages = vec![ChatMessage {
            role: "system",
            content: request.custom_prompt.clone(),
        }];
        messages.extend(request.history.iter().skip(skip).map(|entry| ChatMessage {
            role: "user",
            content: context_line(&entry.english, entry.chinese.as_deref()),
        }));
        messages.push(ChatMessage {
            role: "user",
            content: question_prompt(&request.text),
        });

        let full = self
            .chat(messages, 0.7, Some(500), "Generating the answer failed.")
            .await?;

        Ok(AnswerDetection::answered(split_bilingual(&full)))
    }

    async fn transcribe(&self, clip: AudioClip) -> Result<BatchTranscript, EnrichmentError> {
        clip.ensure_within_limit()?;

        let part = Part::bytes(clip.bytes)
            .file_name(clip.file_name)
            .mime_str(&clip.mime_type)?;
        let form = Form::new()
            .text("model", self.config.transcribe_model.clone())
            .text("response_format", "json")
            .part("file", part);

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let response = check_upstream(response, "The transcription request to the model failed.").await?;
        let parsed: TranscriptionResponse = response.json().await?;
        let english_transcript = parsed.text.trim().to_string();
        if english_transcript.is_empty() {
            return Err(EnrichmentError::Service(
                "The model did not return a usable English transcript.".to_string(),
            ));
        }

        let chinese_translation = self
            .translate_with(TRANSCRIPT_TRANSLATOR_SYSTEM, &english_transcript)
            .await?;

        Ok(BatchTranscript {
            english_transcript,
            chinese_translation,
        })
    }
}
