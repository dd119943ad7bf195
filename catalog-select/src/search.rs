use alloc::collections::BTreeSet;
use alloc::string::String;

use crate::{SearchFilters, SearchQuery};

/// What to do with a response that just arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Newest response so far: display it.
    Accepted {
        sequence: u64,
        /// Sequence of the result it replaces, if one was displayed.
        replaced: Option<u64>,
    },
    /// A newer response is already displayed.
    Stale { sequence: u64, displayed: u64 },
    /// Issued before the last `cancel()`.
    Cancelled { sequence: u64 },
    /// Never issued by this session.
    Unknown { sequence: u64 },
}

impl Resolution {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// What to do with a failed request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    /// The failed query is still the one the user is waiting for.
    Surface { sequence: u64 },
    /// The failure belongs to a superseded or cancelled query; drop it silently.
    Superseded { sequence: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PendingTerm {
    term: String,
    due_ms: u64,
}

/// Search text, debounce and sequence bookkeeping for one picker.
///
/// This type is clock-free: callers pass `now_ms` on every time-dependent call and arm a single
/// timer for [`Self::next_deadline_ms`]. It never talks to a provider; issued queries are
/// returned to the caller, which performs the fetch and reports back via [`Self::resolve`] or
/// [`Self::fail`].
///
/// Race rule: a response is displayed only when its sequence is strictly greater than both the
/// displayed sequence and the cancellation watermark. Slow responses to older queries are
/// dropped without being treated as errors.
#[derive(Clone, Debug)]
pub struct SearchSession {
    debounce_ms: u64,
    term: String,
    filters: SearchFilters,
    pending: Option<PendingTerm>,
    last_issued: u64,
    displayed: u64,
    watermark: u64,
    in_flight: BTreeSet<u64>,
    last_query: Option<SearchQuery>,
}

impl SearchSession {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            term: String::new(),
            filters: SearchFilters::default(),
            pending: None,
            last_issued: 0,
            displayed: 0,
            watermark: 0,
            in_flight: BTreeSet::new(),
            last_query: None,
        }
    }

    pub fn debounce_ms(&self) -> u64 {
        self.debounce_ms
    }

    pub fn set_debounce_ms(&mut self, debounce_ms: u64) {
        self.debounce_ms = debounce_ms;
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn filters(&self) -> &SearchFilters {
        &self.filters
    }

    /// Records a keystroke and restarts the debounce window.
    pub fn set_term(&mut self, term: impl Into<String>, now_ms: u64) {
        let term = term.into();
        strace!(term = %term, now_ms, "SearchSession::set_term");
        self.term = term.clone();
        self.pending = Some(PendingTerm {
            term,
            due_ms: now_ms.saturating_add(self.debounce_ms),
        });
    }

    /// Replaces the term without scheduling a query (e.g. the term was cleared by a commit).
    pub fn reset_term(&mut self, term: impl Into<String>) {
        self.term = term.into();
        self.pending = None;
    }

    /// Changes the filters and issues a query immediately.
    ///
    /// Any pending debounce is dropped: the returned query already carries the current term.
    pub fn set_filters(&mut self, filters: SearchFilters) -> SearchQuery {
        self.filters = filters;
        self.issue_now()
    }

    /// Updates the filters without issuing (e.g. a local-only threshold change).
    pub fn replace_filters(&mut self, filters: SearchFilters) {
        self.filters = filters;
    }

    pub fn is_debouncing(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending debounce fires, if any.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.due_ms)
    }

    /// Fires the debounce when its deadline has passed.
    pub fn tick(&mut self, now_ms: u64) -> Option<SearchQuery> {
        let due = self.pending.as_ref()?.due_ms;
        if now_ms < due {
            return None;
        }
        self.flush()
    }

    /// Fires the pending debounce now, regardless of its deadline.
    pub fn flush(&mut self) -> Option<SearchQuery> {
        let pending = self.pending.take()?;
        if pending.term != self.term {
            strace!("SearchSession: term changed since scheduling, skipping");
            return None;
        }
        Some(self.issue())
    }

    /// Issues a query for the current term and filters, dropping any pending debounce.
    pub fn issue_now(&mut self) -> SearchQuery {
        self.pending = None;
        self.issue()
    }

    /// Re-issues the last query with a new sequence number.
    ///
    /// The current term, filters and pending debounce are left untouched.
    pub fn retry(&mut self) -> Option<SearchQuery> {
        let last = self.last_query.clone()?;
        Some(self.reissue(&last))
    }

    /// Issues `query`'s term and filters again under a new sequence number.
    pub fn reissue(&mut self, query: &SearchQuery) -> SearchQuery {
        self.issue_with(query.term.clone(), query.filters.clone())
    }

    /// Drops the pending debounce and makes every in-flight response ignorable.
    pub fn cancel(&mut self) {
        sdebug!(
            in_flight = self.in_flight.len(),
            watermark = self.last_issued,
            "SearchSession::cancel"
        );
        self.pending = None;
        self.watermark = self.last_issued;
        self.in_flight.clear();
    }

    pub fn resolve(&mut self, sequence: u64) -> Resolution {
        if sequence == 0 || sequence > self.last_issued {
            swarn!(sequence, "SearchSession: response for a sequence never issued");
            return Resolution::Unknown { sequence };
        }
        if sequence <= self.watermark {
            self.in_flight.remove(&sequence);
            strace!(sequence, "SearchSession: response after cancel dropped");
            return Resolution::Cancelled { sequence };
        }
        if sequence <= self.displayed {
            self.in_flight.remove(&sequence);
            sdebug!(
                sequence,
                displayed = self.displayed,
                "SearchSession: stale response dropped"
            );
            return Resolution::Stale {
                sequence,
                displayed: self.displayed,
            };
        }

        let replaced = (self.displayed != 0).then_some(self.displayed);
        self.displayed = sequence;
        // Anything older can no longer be displayed.
        self.in_flight.retain(|&s| s > sequence);
        Resolution::Accepted { sequence, replaced }
    }

    pub fn fail(&mut self, sequence: u64) -> Failure {
        self.in_flight.remove(&sequence);
        // Only the newest issued query may surface an error.
        let superseded = sequence == 0
            || sequence != self.last_issued
            || sequence <= self.watermark
            || sequence <= self.displayed;
        if superseded {
            sdebug!(sequence, "SearchSession: failure of superseded query dropped");
            Failure::Superseded { sequence }
        } else {
            Failure::Surface { sequence }
        }
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn latest_issued(&self) -> u64 {
        self.last_issued
    }

    pub fn displayed_sequence(&self) -> Option<u64> {
        (self.displayed != 0).then_some(self.displayed)
    }

    pub fn last_query(&self) -> Option<&SearchQuery> {
        self.last_query.as_ref()
    }

    fn issue(&mut self) -> SearchQuery {
        self.issue_with(self.term.clone(), self.filters.clone())
    }

    fn issue_with(&mut self, term: String, filters: SearchFilters) -> SearchQuery {
        self.last_issued += 1;
        let query = SearchQuery {
            term,
            filters,
            sequence: self.last_issued,
        };
        self.in_flight.insert(query.sequence);
        self.last_query = Some(query.clone());
        sdebug!(
            sequence = query.sequence,
            term = %query.term,
            "SearchSession: query issued"
        );
        query
    }
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new(300)
    }
}
