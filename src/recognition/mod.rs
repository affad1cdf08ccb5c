//! Continuous speech recognition: the engine capability, its events, and the
//! restart/refresh policy that keeps a session alive.

pub mod adapter;
pub mod console;

use crate::error::RecognizerError;
use crate::kernel::event::{Event, EventSender};

pub use adapter::{EndOutcome, RecognitionAdapter};
pub use console::{ConsoleFeed, ConsoleRecognizer};

pub const PERMISSION_DENIED_MESSAGE: &str =
    "Microphone access was denied. Allow the permission and start again.";
pub const NO_SPEECH_MESSAGE: &str = "No speech was detected. Please try again shortly.";
pub const RECOGNITION_FAILED_MESSAGE: &str =
    "Speech recognition ran into a problem. Please try again later.";
pub const RESTART_FAILED_MESSAGE: &str =
    "Speech recognition could not restart. Please start it again manually.";
pub const START_FAILED_MESSAGE: &str = "Unable to start speech recognition. Please try again.";

/// One recognition hypothesis as delivered by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn finalized(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

/// Engine callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    /// `results[result_index..]` are the entries that changed in this cycle.
    Result {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
    Error {
        kind: String,
    },
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Explicit abort. Benign.
    Aborted,
    NotAllowed,
    NoSpeech,
    Other(String),
}

impl RecognitionErrorKind {
    pub fn parse(kind: &str) -> Self {
        match kind {
            "aborted" => Self::Aborted,
            "not-allowed" => Self::NotAllowed,
            "no-speech" => Self::NoSpeech,
            other => Self::Other(other.to_string()),
        }
    }

    /// User-facing message, or `None` for a benign cancellation.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Aborted => None,
            Self::NotAllowed => Some(PERMISSION_DENIED_MESSAGE),
            Self::NoSpeech => Some(NO_SPEECH_MESSAGE),
            Self::Other(_) => Some(RECOGNITION_FAILED_MESSAGE),
        }
    }
}

/// What one result cycle contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptBatch {
    /// Raw final transcripts in arrival order (untrimmed, possibly empty).
    pub finals: Vec<String>,
    /// Concatenated non-final transcripts, trimmed.
    pub interim: String,
}

pub fn collect_results(result_index: usize, results: &[RecognitionResult]) -> TranscriptBatch {
    let mut batch = TranscriptBatch::default();
    let mut interim = String::new();

    for result in results.iter().skip(result_index) {
        if result.is_final {
            batch.finals.push(result.transcript.clone());
        } else {
            interim.push_str(&result.transcript);
        }
    }

    batch.interim = interim.trim().to_string();
    batch
}

/// Where an engine delivers its callbacks. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    tx: EventSender,
}

impl RecognitionSink {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }

    /// Returns false once the session is gone.
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        self.tx.send(Event::Recognition(event)).is_ok()
    }
}

/// Engine configuration applied once, when the engine is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSettings {
    /// BCP 47 tag, e.g. `en-US`.
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognitionSettings {
    /// Continuous recognition with interim hypotheses in `language`.
    pub fn live(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            continuous: true,
            interim_results: true,
        }
    }
}

/// Platform speech recognition capability.
///
/// `start` and `stop` only request a transition; the engine confirms through
/// `RecognitionEvent::Started` / `RecognitionEvent::Ended` on its sink.
pub trait SpeechRecognizer: Send {
    /// Called before the first `start`.
    fn configure(&mut self, settings: &RecognitionSettings);

    fn start(&mut self) -> Result<(), RecognizerError>;

    fn stop(&mut self) -> Result<(), RecognizerError>;

    /// Stop immediately, discarding pending results.
    fn abort(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finals_and_interim_are_separated() {
        let results = vec![
            RecognitionResult::finalized("already handled"),
            RecognitionResult::finalized(" first "),
            RecognitionResult::interim("still "),
            RecognitionResult::interim("talking "),
        ];
        let batch = collect_results(1, &results);
        assert_eq!(batch.finals, vec![" first ".to_string()]);
        assert_eq!(batch.interim, "still talking");
    }

    #[test]
    fn live_settings_enable_interim_results() {
        let settings = RecognitionSettings::live("fr-FR");
        assert_eq!(settings.language, "fr-FR");
        assert!(settings.continuous);
        assert!(settings.interim_results);
    }

    #[test]
    fn error_kinds_map_to_messages() {
        assert_eq!(RecognitionErrorKind::parse("aborted").user_message(), None);
        assert_eq!(
            RecognitionErrorKind::parse("not-allowed").user_message(),
            Some(PERMISSION_DENIED_MESSAGE)
        );
        assert_eq!(
            RecognitionErrorKind::parse("no-speech").user_message(),
            Some(NO_SPEECH_MESSAGE)
        );
        assert_eq!(
            RecognitionErrorKind::parse("network").user_message(),
            Some(RECOGNITION_FAILED_MESSAGE)
        );
    }
}
