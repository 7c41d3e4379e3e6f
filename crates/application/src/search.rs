//! Search field state: debounced suggestion requests and keyboard highlight.

use std::time::{Duration, Instant};

use bookfinder_core::Book;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const MIN_QUERY_CHARS: usize = 2;

/// A single cancellable delayed request.
///
/// Every `schedule` or `cancel` advances the sequence number, so a request
/// issued under an older number is recognisably stale when it returns.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    seq: u64,
    pending: Option<Pending>,
}

#[derive(Debug, Clone)]
struct Pending {
    seq: u64,
    query: String,
    due: Instant,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            seq: 0,
            pending: None,
        }
    }

    pub fn schedule(&mut self, query: String, now: Instant) -> u64 {
        self.seq += 1;
        self.pending = Some(Pending {
            seq: self.seq,
            query,
            due: now + self.delay,
        });
        self.seq
    }

    pub fn cancel(&mut self) {
        self.seq += 1;
        self.pending = None;
    }

    /// Takes the pending request once its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<(u64, String)> {
        if self.pending.as_ref().is_some_and(|p| p.due <= now) {
            return self.pending.take().map(|p| (p.seq, p.query));
        }
        None
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.seq
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

/// Candidates under the search field with a wrapping highlight.
#[derive(Debug, Clone, Default)]
pub struct SuggestionList {
    items: Vec<Book>,
    highlighted: Option<usize>,
}

impl SuggestionList {
    pub fn new(mut items: Vec<Book>, limit: Option<usize>) -> Self {
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Self {
            items,
            highlighted: None,
        }
    }

    pub fn items(&self) -> &[Book] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.highlighted
    }

    pub fn highlighted_book(&self) -> Option<&Book> {
        self.highlighted.and_then(|i| self.items.get(i))
    }

    pub fn highlight_next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(i) => (i + 1) % self.items.len(),
            None => 0,
        });
    }

    pub fn highlight_prev(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.highlighted = Some(match self.highlighted {
            Some(0) | None => self.items.len() - 1,
            Some(i) => i - 1,
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchBox {
    pub query: String,
    /// `None` until the first response arrives.
    pub suggestions: Option<SuggestionList>,
    pub visible: bool,
    pub debouncer: Debouncer,
}

impl SearchBox {
    pub fn shows_suggestions(&self) -> bool {
        self.visible && self.suggestions.is_some()
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}
