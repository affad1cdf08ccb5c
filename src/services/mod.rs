//! Remote enrichment: translation, question answering and batch transcription.

pub mod http;
pub mod llm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::EnrichmentError;
use crate::kernel::segment::{Answer, Segment};

pub use http::HttpEnrichmentClient;
pub use llm::client::DirectCompletionService;

/// Upload limit for the batch transcription path.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// One prior utterance sent as conversational context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub english: String,
    pub chinese: Option<String>,
}

impl From<&Segment> for HistoryEntry {
    fn from(segment: &Segment) -> Self {
        Self {
            english: segment.english.clone(),
            chinese: segment.chinese.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    pub text: String,
    pub history: Vec<HistoryEntry>,
    pub custom_prompt: String,
}

/// Outcome of question detection. `answer` is only meaningful when `is_question`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerDetection {
    pub is_question: bool,
    pub answer: Option<Answer>,
}

impl AnswerDetection {
    pub fn not_a_question() -> Self {
        Self::default()
    }

    pub fn answered(answer: Answer) -> Self {
        Self {
            is_question: true,
            answer: Some(answer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTranscript {
    pub english_transcript: String,
    pub chinese_translation: String,
}

/// A recorded audio file for the batch path.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording.webm".to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn ensure_within_limit(&self) -> Result<(), EnrichmentError> {
        if self.bytes.len() > MAX_AUDIO_BYTES {
            return Err(EnrichmentError::AudioTooLarge {
                size: self.bytes.len(),
                limit: MAX_AUDIO_BYTES,
            });
        }
        Ok(())
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "audio/webm",
    }
}

/// The remote completion service as seen by the session.
#[async_trait]
pub trait EnrichmentService: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, EnrichmentError>;

    async fn detect_answer(&self, request: &AnswerRequest) -> Result<AnswerDetection, EnrichmentError>;

    async fn transcribe(&self, clip: AudioClip) -> Result<BatchTranscript, EnrichmentError>;
}
