use std::collections::HashMap;

use super::segment::{Segment, SegmentId};
use crate::services::HistoryEntry;

/// Ordered, append-only collection of finalized segments.
///
/// Segments are only ever appended or patched by id. The position index makes
/// patches O(1); it is rebuilt only on clear since nothing is removed otherwise.
#[derive(Debug, Clone, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    index: HashMap<SegmentId, usize>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, segment: Segment) {
        self.index.insert(segment.id.clone(), self.segments.len());
        self.segments.push(segment);
    }

    pub fn get(&self, id: &SegmentId) -> Option<&Segment> {
        self.index.get(id).and_then(|&i| self.segments.get(i))
    }

    /// Apply `f` to the segment with `id`. Returns false if it no longer exists
    /// (e.g. the store was cleared while a request was in flight).
    pub fn patch<F>(&mut self, id: &SegmentId, f: F) -> bool
    where
        F: FnOnce(&mut Segment),
    {
        match self.index.get(id).and_then(|&i| self.segments.get_mut(i)) {
            Some(segment) => {
                f(segment);
                true
            }
            None => false,
        }
    }

    /// Conversation context, oldest first. `limit` keeps only the most recent entries.
    pub fn history(&self, limit: Option<usize>) -> Vec<HistoryEntry> {
        let skip = match limit {
            Some(n) => self.segments.len().saturating_sub(n),
            None => 0,
        };
        self.segments
            .iter()
            .skip(skip)
            .map(HistoryEntry::from)
            .collect()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.index.clear();
    }
}
