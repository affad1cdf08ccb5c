use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::event::{Event, EventSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnrichmentKind {
    Translation,
    Answer,
}

/// Result of feeding a new interim value to a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Value was empty: timer and in-flight request dropped.
    Cleared,
    /// Value equals the last dispatched one; nothing to do.
    Unchanged,
    /// Debounce (re)armed under this generation.
    Scheduled(u64),
}

/// A request the reactor should issue now.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub generation: u64,
    pub text: String,
    pub token: CancellationToken,
}

/// Latest-wins async slot: one debounce timer plus at most one in-flight request.
///
/// Every schedule bumps the generation, so an older timer that slips past
/// `abort` is recognized and ignored in `fire`. Completions are only accepted
/// from the dispatch that is still current (`settle`).
#[derive(Debug)]
pub struct LatestWinsSlot {
    kind: EnrichmentKind,
    delay: Duration,
    parent: CancellationToken,
    generation: u64,
    pending: Option<String>,
    timer: Option<JoinHandle<()>>,
    inflight: Option<(u64, CancellationToken)>,
    last_dispatched: Option<String>,
}

impl LatestWinsSlot {
    pub fn new(kind: EnrichmentKind, delay: Duration, parent: CancellationToken) -> Self {
        Self {
            kind,
            delay,
            parent,
            generation: 0,
            pending: None,
            timer: None,
            inflight: None,
            last_dispatched: None,
        }
    }

    pub fn schedule(&mut self, text: &str, tx: &EventSender) -> ScheduleOutcome {
        if text.is_empty() {
            self.cancel();
            return ScheduleOutcome::Cleared;
        }

        if self.last_dispatched.as_deref() == Some(text) {
            // The preview already reflects this value; drop a timer armed for another one.
            self.abort_timer();
            self.pending = None;
            return ScheduleOutcome::Unchanged;
        }

        self.abort_timer();
        self.generation += 1;
        self.pending = Some(text.to_string());

        let generation = self.generation;
        let kind = self.kind;
        let delay = self.delay;
        let tx = tx.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event::DebounceElapsed { kind, generation });
        }));

        ScheduleOutcome::Scheduled(generation)
    }

    /// Timer expiry. Supersedes whatever is in flight and hands back the new request.
    pub fn fire(&mut self, generation: u64) -> Option<Dispatch> {
        if generation != self.generation {
            debug!(kind = ?self.kind, generation, current = self.generation, "Stale debounce ignored");
            return None;
        }
        let text = self.pending.take()?;
        self.timer = None;

        if let Some((_, token)) = self.inflight.take() {
            token.cancel();
        }

        let token = self.parent.child_token();
        self.inflight = Some((generation, token.clone()));
        self.last_dispatched = Some(text.clone());

        Some(Dispatch {
            generation,
            text,
            token,
        })
    }

    /// Accept a completion only if it belongs to the active, uncanceled dispatch.
    pub fn settle(&mut self, generation: u64) -> bool {
        match &self.inflight {
            Some((current, token)) if *current == generation && !token.is_cancelled() => {
                self.inflight = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the pending timer and the in-flight request, and forget the last value.
    pub fn cancel(&mut self) {
        self.abort_timer();
        if let Some((_, token)) = self.inflight.take() {
            token.cancel();
        }
        self.pending = None;
        self.last_dispatched = None;
        self.generation += 1;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_in_flight(&self) -> bool {
        self.inflight.is_some()
    }

    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for LatestWinsSlot {
    fn drop(&mut self) {
        self.abort_timer();
        if let Some((_, token)) = self.inflight.take() {
            token.cancel();
        }
    }
}
