use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};

/// Oldest entries are dropped past this many.
const MAX_EVENTS: usize = 10_000;

/// Rolling log of what the session pipeline did: dispatches, outcomes,
/// discarded stale replies, restarts. Entries carry kinds and counts only,
/// never meeting text, so the log is safe to dump at shutdown.
#[derive(Debug)]
pub struct TelemetryRecorder {
    events: VecDeque<TelemetryEvent>,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Counters over whatever is still retained.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.events)
    }
}
