use serde::Serialize;

use super::segment::Answer;

/// Single-slot preview of the utterance still being recognized.
/// Overwritten on every interim result, wiped on finalization or stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterimState {
    pub transcript: String,
    pub translation: String,
    pub is_translating: bool,
    pub is_question: bool,
    pub answer: Option<Answer>,
    pub is_answering: bool,
}

impl InterimState {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn clear_translation(&mut self) {
        self.translation.clear();
        self.is_translating = false;
    }

    pub fn clear_answer(&mut self) {
        self.answer = None;
        self.is_answering = false;
        self.is_question = false;
    }
}
