// src/ingest/dedup.rs
use std::collections::{HashSet, VecDeque};

pub const DEFAULT_CACHE_SIZE: usize = 800;

/// Bounded, insertion-ordered set of recently seen headline texts.
///
/// Eviction is FIFO by first sighting; seeing a text again does not move
/// it to the back.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    order: VecDeque<String>,
    seen: HashSet<String>,
    cap: usize,
}

impl DedupWindow {
    /// `capacity` of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let cap = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(cap.min(10_000) + 1),
            seen: HashSet::with_capacity(cap.min(10_000) + 1),
            cap,
        }
    }

    /// True exactly once per distinct text until it is evicted or the
    /// window is cleared.
    pub fn accept(&mut self, text: &str) -> bool {
        if self.seen.contains(text) {
            return false;
        }
        self.seen.insert(text.to_string());
        self.order.push_back(text.to_string());
        while self.order.len() > self.cap {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        true
    }

    /// Pre-load texts in insertion order, e.g. from an existing journal.
    /// Returns how many were new.
    pub fn seed<I, S>(&mut self, texts: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        texts
            .into_iter()
            .filter(|t| self.accept(t.as_ref()))
            .count()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.seen.contains(text)
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}
