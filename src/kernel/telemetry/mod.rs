//! Pipeline telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside decision logic (reactor, slots, adapter).
//! It exists solely for observability and verification.
//!
//! # PRIVACY INVARIANT
//! Telemetry events must **NEVER** contain user content (transcripts, translations, answers).
//! Only enrichment kinds, paths, error kinds and counts are allowed.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::{EnrichmentPath, TelemetryEvent};
pub use metrics::{RequestStats, TelemetrySnapshot};
pub use recorder::TelemetryRecorder;
