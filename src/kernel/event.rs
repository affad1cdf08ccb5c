use tokio::sync::mpsc;

use super::segment::SegmentId;
use super::slot::EnrichmentKind;
use crate::error::EnrichmentError;
use crate::recognition::RecognitionEvent;
use crate::services::AnswerDetection;

pub type EventSender = mpsc::UnboundedSender<Event>;
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Everything the reactor reacts to. Spawned work never touches state
/// directly; it reports back with one of these.
#[derive(Debug)]
pub enum Event {
    /// Engine callbacks (start, result, error, end)
    Recognition(RecognitionEvent),
    /// User intent
    Command(Command),
    /// A debounce timer for an interim slot expired.
    DebounceElapsed { kind: EnrichmentKind, generation: u64 },
    /// Periodic engine refresh is due.
    RefreshDue,
    InterimTranslated {
        generation: u64,
        outcome: Result<String, EnrichmentError>,
    },
    InterimAnswered {
        generation: u64,
        outcome: Result<AnswerDetection, EnrichmentError>,
    },
    SegmentTranslated {
        id: SegmentId,
        outcome: Result<String, EnrichmentError>,
    },
    SegmentAnswered {
        id: SegmentId,
        outcome: Result<AnswerDetection, EnrichmentError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    /// Start if idle, stop if listening.
    Toggle,
    Clear,
    SetAnswerPrompt(String),
    Shutdown,
}
