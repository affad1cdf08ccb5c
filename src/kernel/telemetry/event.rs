use serde::{Deserialize, Serialize};

use crate::kernel::slot::EnrichmentKind;

/// Which flow issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnrichmentPath {
    /// Debounced preview of the utterance in progress
    Interim,
    /// Permanent enrichment of a committed segment
    Final,
}

// Allowed: kinds, paths, error kinds, counts
// Forbidden: any text spoken, translated or answered

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    RequestDispatched {
        kind: EnrichmentKind,
        path: EnrichmentPath,
    },

    RequestSucceeded {
        kind: EnrichmentKind,
        path: EnrichmentPath,
    },

    RequestFailed {
        kind: EnrichmentKind,
        path: EnrichmentPath,
    },

    /// A completion arrived for a superseded or canceled interim dispatch.
    StaleDiscarded { kind: EnrichmentKind },

    /// A newer interim value replaced a pending debounce.
    DebounceRescheduled { kind: EnrichmentKind },

    SegmentCommitted,

    EmptyFinalSkipped,

    /// Engine error kind as reported by the platform (e.g. "no-speech").
    RecognitionError { kind: String },

    SessionRestarted,

    RestartFailed,

    SessionRefreshed,
}
