use std::collections::VecDeque;

use super::event::{EnrichmentPath, TelemetryEvent};
use crate::kernel::slot::EnrichmentKind;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub interim_translation: RequestStats,
    pub interim_answer: RequestStats,
    pub segment_translation: RequestStats,
    pub segment_answer: RequestStats,
    pub debounce_rescheduled: u64,
    pub segments_committed: u64,
    pub empty_finals_skipped: u64,
    pub recognition_errors: u64,
    pub restarts: u64,
    pub restart_failures: u64,
    pub refreshes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub stale_discarded: u64,
}

impl TelemetrySnapshot {
    fn stats_mut(&mut self, kind: EnrichmentKind, path: EnrichmentPath) -> &mut RequestStats {
        match (path, kind) {
            (EnrichmentPath::Interim, EnrichmentKind::Translation) => &mut self.interim_translation,
            (EnrichmentPath::Interim, EnrichmentKind::Answer) => &mut self.interim_answer,
            (EnrichmentPath::Final, EnrichmentKind::Translation) => &mut self.segment_translation,
            (EnrichmentPath::Final, EnrichmentKind::Answer) => &mut self.segment_answer,
        }
    }
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::RequestDispatched { kind, path } => {
                snap.stats_mut(*kind, *path).dispatched += 1;
            }
            TelemetryEvent::RequestSucceeded { kind, path } => {
                snap.stats_mut(*kind, *path).succeeded += 1;
            }
            TelemetryEvent::RequestFailed { kind, path } => {
                snap.stats_mut(*kind, *path).failed += 1;
            }
            // Stale completions only exist on the interim path
            TelemetryEvent::StaleDiscarded { kind } => {
                snap.stats_mut(*kind, EnrichmentPath::Interim).stale_discarded += 1;
            }
            TelemetryEvent::DebounceRescheduled { .. } => snap.debounce_rescheduled += 1,
            TelemetryEvent::SegmentCommitted => snap.segments_committed += 1,
            TelemetryEvent::EmptyFinalSkipped => snap.empty_finals_skipped += 1,
            TelemetryEvent::RecognitionError { .. } => snap.recognition_errors += 1,
            TelemetryEvent::SessionRestarted => snap.restarts += 1,
            TelemetryEvent::RestartFailed => snap.restart_failures += 1,
            TelemetryEvent::SessionRefreshed => snap.refreshes += 1,
        }
    }

    snap
}
