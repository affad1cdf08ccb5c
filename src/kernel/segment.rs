use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::services::AnswerDetection;

/// Unique segment identifier: creation time in millis plus a random suffix.
/// Only uniqueness matters; display order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(String);

impl SegmentId {
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", millis, &suffix[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationState {
    Translating,
    Done,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerState {
    Pending,
    Answering,
    Done,
    Error,
}

/// Bilingual answer to a detected question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub english: String,
    pub chinese: String,
}

/// A finalized utterance and its derived artifacts.
///
/// Translation and answer progress independently: a transition on one side
/// never touches the fields of the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub id: SegmentId,
    pub english: String,
    pub chinese: Option<String>,
    pub translation_state: TranslationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation_error: Option<String>,
    pub is_question: bool,
    pub answer: Option<Answer>,
    pub answer_state: AnswerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_error: Option<String>,
}

impl Segment {
    pub fn new(english: impl Into<String>) -> Self {
        Self {
            id: SegmentId::generate(),
            english: english.into(),
            chinese: None,
            translation_state: TranslationState::Translating,
            translation_error: None,
            is_question: false,
            answer: None,
            answer_state: AnswerState::Pending,
            answer_error: None,
        }
    }

    pub fn mark_answering(&mut self) {
        self.answer_state = AnswerState::Answering;
        self.answer_error = None;
    }

    pub fn apply_translation(&mut self, outcome: Result<String, String>) {
        match outcome {
            Ok(translation) => {
                self.chinese = Some(translation);
                self.translation_state = TranslationState::Done;
                self.translation_error = None;
            }
            Err(message) => {
                self.translation_state = TranslationState::Error;
                self.translation_error = Some(message);
            }
        }
    }

    pub fn apply_answer(&mut self, outcome: Result<AnswerDetection, String>) {
        match outcome {
            Ok(detection) => {
                self.is_question = detection.is_question;
                self.answer = if detection.is_question { detection.answer } else { None };
                self.answer_state = AnswerState::Done;
                self.answer_error = None;
            }
            Err(message) => {
                self.answer_state = AnswerState::Error;
                self.answer_error = Some(message);
            }
        }
    }
}
