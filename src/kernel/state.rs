use super::interim::InterimState;
use super::segment::{Segment, SegmentId};
use super::store::SegmentStore;
use crate::config::DEFAULT_ANSWER_PROMPT;
use crate::services::AnswerDetection;

/// Strict state delta. This is the ONLY way session state mutates.
#[derive(Debug, Clone)]
pub enum StateDelta {
    Supported(bool),
    ListeningChanged(bool),
    ErrorRaised(String),
    ErrorCleared,

    // Interim preview
    InterimTranscript(String),
    InterimTranslating,
    InterimTranslated(String),
    InterimTranslationFailed,
    InterimTranslationCleared,
    InterimAnswering,
    InterimAnswered(AnswerDetection),
    InterimAnswerFailed,
    InterimAnswerCleared,
    InterimReset,

    // Finalized segments
    SegmentAppended(Segment),
    SegmentAnswering(SegmentId),
    SegmentTranslated {
        id: SegmentId,
        outcome: Result<String, String>,
    },
    SegmentAnswered {
        id: SegmentId,
        outcome: Result<AnswerDetection, String>,
    },

    AnswerPromptChanged(String),
    Cleared,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    /// A recognition engine is attached.
    pub supported: bool,
    pub listening: bool,
    /// Most recent session-level (recognition) error.
    pub error: Option<String>,
    pub interim: InterimState,
    pub segments: SegmentStore,
    pub answer_prompt: String,
    /// Monotonic, bumped on every reduction.
    pub version: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            supported: false,
            listening: false,
            error: None,
            interim: InterimState::default(),
            segments: SegmentStore::new(),
            answer_prompt: DEFAULT_ANSWER_PROMPT.to_string(),
            version: 0,
        }
    }
}

impl SessionState {
    pub fn new(answer_prompt: impl Into<String>) -> Self {
        Self {
            answer_prompt: answer_prompt.into(),
            ..Self::default()
        }
    }

    /// Pure reduction: State + Delta -> Mutated State
    pub fn reduce(&mut self, delta: StateDelta) {
        self.version += 1;

        match delta {
            StateDelta::Supported(supported) => self.supported = supported,
            StateDelta::ListeningChanged(listening) => self.listening = listening,
            StateDelta::ErrorRaised(message) => self.error = Some(message),
            StateDelta::ErrorCleared => self.error = None,

            StateDelta::InterimTranscript(text) => self.interim.transcript = text,
            StateDelta::InterimTranslating => self.interim.is_translating = true,
            StateDelta::InterimTranslated(translation) => {
                self.interim.translation = translation;
                self.interim.is_translating = false;
            }
            StateDelta::InterimTranslationFailed => self.interim.is_translating = false,
            StateDelta::InterimTranslationCleared => self.interim.clear_translation(),
            StateDelta::InterimAnswering => self.interim.is_answering = true,
            StateDelta::InterimAnswered(detection) => {
                self.interim.is_question = detection.is_question;
                self.interim.answer = if detection.is_question { detection.answer } else { None };
                self.interim.is_answering = false;
            }
            StateDelta::InterimAnswerFailed => self.interim.is_answering = false,
            StateDelta::InterimAnswerCleared => self.interim.clear_answer(),
            StateDelta::InterimReset => self.interim = InterimState::default(),

            StateDelta::SegmentAppended(segment) => self.segments.append(segment),
            StateDelta::SegmentAnswering(id) => {
                self.segments.patch(&id, |s| s.mark_answering());
            }
            StateDelta::SegmentTranslated { id, outcome } => {
                if !self.segments.patch(&id, |s| s.apply_translation(outcome)) {
                    tracing::debug!("Translation for vanished segment {} dropped", id);
                }
            }
            StateDelta::SegmentAnswered { id, outcome } => {
                if !self.segments.patch(&id, |s| s.apply_answer(outcome)) {
                    tracing::debug!("Answer for vanished segment {} dropped", id);
                }
            }

            StateDelta::AnswerPromptChanged(prompt) => self.answer_prompt = prompt,
            StateDelta::Cleared => {
                self.segments.clear();
                self.interim = InterimState::default();
                self.error = None;
            }
        }
    }
}
