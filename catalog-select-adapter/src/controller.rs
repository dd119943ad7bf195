use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use catalog_select::{
    Align, CacheLookup, CacheStats, CatalogItem, CloseReason, ConfigError, Failure,
    FilterPipeline, ItemId, NavKey, PickerConfig, QueryKey, Resolution, ResultCache,
    SearchFilters, SearchQuery, SearchResult, SearchSession, SelectionMachine, SelectionState,
    Transition, VirtualWindow,
};

use crate::{
    PickerEvent, PickerSnapshot, ProviderError, ProviderRequest, ProviderResponse, SearchFailure,
    VisibleRow,
};

/// A provider call the host must perform, then report back via [`Picker::on_response`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub sequence: u64,
    pub request: ProviderRequest,
    /// Background refresh of a stale cache entry. Its failure is never surfaced.
    pub revalidation: bool,
}

#[derive(Clone, Debug)]
struct InFlight {
    key: QueryKey,
    revalidation: bool,
}

/// A framework-neutral controller that wires the search session, the result cache, the local
/// filter, the selection machine and the virtual window together.
///
/// This type holds no UI objects and performs no I/O. Hosts drive it by calling:
/// - input methods (`set_search_term`, `on_key`, `hover`, `select`, `focus`, `blur`, ...)
/// - `tick(now_ms)` when the deadline reported by `next_deadline_ms()` passes
/// - `on_response(sequence, result, now_ms)` when a provider call returns
///
/// Every method that may start a provider call returns the [`FetchRequest`] to perform. For a
/// tokio-driven version that performs fetches itself, see [`crate::SelectorHandle`].
#[derive(Clone, Debug)]
pub struct Picker {
    config: PickerConfig,
    session: SearchSession,
    cache: ResultCache,
    filter: FilterPipeline,
    selection: SelectionMachine,
    window: VirtualWindow,

    displayed: Option<Arc<SearchResult>>,
    displayed_key: Option<QueryKey>,
    items: Vec<Arc<CatalogItem>>,
    selected: Option<Arc<CatalogItem>>,
    pending: BTreeMap<u64, InFlight>,
    error: Option<SearchFailure>,
    events: VecDeque<PickerEvent>,
}

impl Picker {
    pub fn new(config: PickerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(?config, "Picker::new");
        Ok(Self {
            session: config.search_session(),
            cache: ResultCache::new(config.cache_policy()),
            filter: config.filter_pipeline(),
            selection: SelectionMachine::new(),
            window: VirtualWindow::new(config.window_options(0)),
            config,
            displayed: None,
            displayed_key: None,
            items: Vec::new(),
            selected: None,
            pending: BTreeMap::new(),
            error: None,
            events: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// The input gained focus: opens the list and loads results if they are out of date.
    pub fn focus(&mut self, now_ms: u64) -> Option<FetchRequest> {
        let t = self.selection.open();
        self.settle(t, now_ms)
    }

    pub fn open(&mut self, now_ms: u64) -> Option<FetchRequest> {
        self.focus(now_ms)
    }

    /// Focus moved outside the picker: closes the list and clears the term.
    pub fn blur(&mut self) {
        let t = self.selection.dismiss(CloseReason::FocusLost);
        self.settle(t, 0);
    }

    /// Closes the list, keeping the term.
    pub fn close(&mut self) {
        let t = self.selection.close(CloseReason::Programmatic);
        self.settle(t, 0);
    }

    /// Clears the committed selection and the term.
    pub fn clear(&mut self, now_ms: u64) -> Option<FetchRequest> {
        let t = self.selection.clear();
        self.settle(t, now_ms);
        if self.selection.is_open() {
            self.load_if_outdated(now_ms)
        } else {
            None
        }
    }

    pub fn search_term(&self) -> &str {
        self.session.term()
    }

    /// Records a keystroke. Opens the list and (re)starts the debounce window.
    pub fn set_search_term(
        &mut self,
        term: impl Into<String>,
        now_ms: u64,
    ) -> Option<FetchRequest> {
        let term = term.into();
        self.session.set_term(term.clone(), now_ms);
        let t = self.selection.set_search_term(term);
        let fetch = self.settle(t, now_ms);
        fetch.or_else(|| self.tick(now_ms))
    }

    /// Changes the query filters.
    ///
    /// A change of location or category issues a query immediately. A change of
    /// `min_available` alone only re-filters the displayed result.
    pub fn set_filters(&mut self, filters: SearchFilters, now_ms: u64) -> Option<FetchRequest> {
        let current = self.session.filters();
        let remote = filters.location_id != current.location_id
            || filters.category_id != current.category_id;
        self.filter.set_min_available(
            filters
                .min_available
                .or(self.config.min_available_quantity),
        );
        if remote {
            let query = self.session.set_filters(filters);
            return self.dispatch(query, now_ms);
        }
        self.session.replace_filters(filters);
        self.refilter();
        None
    }

    /// Changes the local availability threshold without touching the network.
    pub fn set_min_available(&mut self, min: Option<u32>) {
        self.filter.set_min_available(min);
        self.refilter();
    }

    /// Fires the debounce if its deadline has passed.
    pub fn tick(&mut self, now_ms: u64) -> Option<FetchRequest> {
        let query = self.session.tick(now_ms)?;
        self.dispatch(query, now_ms)
    }

    /// When `tick` should be called next, if anything is pending.
    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.session.next_deadline_ms()
    }

    /// Re-issues the last query with a new sequence number.
    ///
    /// The term shown in the input is not changed.
    pub fn retry(&mut self, now_ms: u64) -> Option<FetchRequest> {
        self.error = None;
        let query = self.session.retry()?;
        tracing::debug!(sequence = query.sequence, "Picker::retry");
        self.dispatch(query, now_ms)
    }

    /// Makes every outstanding response ignorable and drops the pending debounce.
    ///
    /// The displayed list stays as it is.
    pub fn cancel(&mut self) {
        self.session.cancel();
        for flight in core::mem::take(&mut self.pending).into_values() {
            if flight.revalidation {
                self.cache.release_refresh(&flight.key);
            }
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn on_key(&mut self, key: NavKey, now_ms: u64) -> Option<FetchRequest> {
        let t = self.selection.on_key(key, &self.items);
        self.settle(t, now_ms)
    }

    /// Pointer moved over the row at `index`.
    pub fn hover(&mut self, index: usize) -> Transition {
        let t = self.selection.hover(index, &self.items);
        self.settle(t.clone(), 0);
        t
    }

    /// Pointer clicked the row at `index`. Blocked rows return `Transition::Rejected`.
    pub fn select(&mut self, index: usize) -> Transition {
        let t = self.selection.select(index, &self.items);
        self.settle(t.clone(), 0);
        t
    }

    /// The host scrolled the list. Returns the applied (clamped) offset.
    pub fn on_scroll(&mut self, scroll_offset: u64) -> u64 {
        self.window.set_scroll_offset(scroll_offset)
    }

    pub fn on_viewport_height(&mut self, viewport_height: u32) {
        self.window.set_viewport_height(viewport_height);
    }

    /// Reports the outcome of a [`FetchRequest`].
    ///
    /// Successful responses are cached even when superseded; only the newest one is displayed.
    pub fn on_response(
        &mut self,
        sequence: u64,
        response: Result<ProviderResponse, ProviderError>,
        now_ms: u64,
    ) {
        let Some(flight) = self.pending.remove(&sequence) else {
            tracing::debug!(sequence, "Picker: response for a request no longer tracked");
            return;
        };

        let response = response.and_then(|r| {
            let result = SearchResult::new(r.items, r.total, r.has_more, sequence);
            if result.is_well_formed() {
                Ok(Arc::new(result))
            } else {
                Err(ProviderError::Malformed(format!(
                    "{} items with total {} or duplicate ids",
                    result.items.len(),
                    result.total
                )))
            }
        });

        match response {
            Ok(result) => {
                self.cache.set(flight.key.clone(), Arc::clone(&result), now_ms);
                let resolution = self.session.resolve(sequence);
                // A refresh still applies when a cache hit for the same query took a newer
                // sequence while it was in flight.
                let refreshes_current = flight.revalidation
                    && matches!(resolution, Resolution::Stale { .. })
                    && self.displayed_key.as_ref() == Some(&flight.key)
                    && self
                        .session
                        .last_query()
                        .is_some_and(|q| q.key(self.config.max_results) == flight.key);
                if resolution.is_accepted() {
                    self.show(result, flight.key, flight.revalidation);
                } else if refreshes_current {
                    self.show_refresh(&result, flight.key);
                } else {
                    tracing::debug!(?resolution, "Picker: response not displayed");
                }
            }
            Err(err) => self.fail(sequence, flight, err),
        }
    }

    /// Drops cached results matching `predicate` (e.g. after a stock change). Returns how many
    /// entries were removed.
    pub fn invalidate_cache(
        &mut self,
        predicate: impl FnMut(&QueryKey, &SearchResult) -> bool,
    ) -> usize {
        self.cache.invalidate(predicate)
    }

    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    pub fn purge_expired(&mut self, now_ms: u64) -> usize {
        self.cache.purge_expired(now_ms)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The displayed (filtered) items.
    pub fn items(&self) -> &[Arc<CatalogItem>] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&Arc<CatalogItem>> {
        self.items.get(index)
    }

    pub fn selected_id(&self) -> Option<&ItemId> {
        self.selection.selected_id()
    }

    pub fn selected_item(&self) -> Option<&Arc<CatalogItem>> {
        self.selected.as_ref()
    }

    pub fn selection_state(&self) -> &SelectionState {
        self.selection.state()
    }

    pub fn is_open(&self) -> bool {
        self.selection.is_open()
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        self.selection.highlighted_index()
    }

    /// Text for the input: the term while searching, otherwise the selected item's label.
    pub fn display_text(&self) -> String {
        let term = self.selection.search_term();
        if self.selection.is_open() || !term.is_empty() {
            return term.to_owned();
        }
        self.selected
            .as_ref()
            .map(|item| item.label())
            .unwrap_or_default()
    }

    pub fn error(&self) -> Option<&SearchFailure> {
        self.error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    pub fn total(&self) -> usize {
        self.displayed.as_ref().map_or(0, |r| r.total)
    }

    pub fn has_more(&self) -> bool {
        self.displayed.as_ref().is_some_and(|r| r.has_more)
    }

    pub fn window(&self) -> &VirtualWindow {
        &self.window
    }

    /// The rows to materialize at the current scroll offset, paired with their items.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let highlighted = self.selection.highlighted_index();
        let selected = self.selection.selected_id();
        let mut rows = Vec::with_capacity(self.window.visible_range().len());
        self.window.for_each_row(|row| {
            let Some(item) = self.items.get(row.index) else {
                return;
            };
            rows.push(VisibleRow {
                row,
                item: Arc::clone(item),
                highlighted: highlighted == Some(row.index),
                selected: selected == Some(&item.id),
            });
        });
        rows
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = PickerEvent> + '_ {
        self.events.drain(..)
    }

    pub fn snapshot(&self) -> PickerSnapshot {
        PickerSnapshot {
            selection: self.selection.state().clone(),
            display_text: self.display_text(),
            selected_item: self.selected.clone(),
            rows: self.visible_rows(),
            item_count: self.items.len(),
            total: self.total(),
            has_more: self.has_more(),
            loading: self.is_loading(),
            error: self.error.clone(),
            viewport: self.window.viewport_state(),
            total_height: self.window.total_height(),
        }
    }

    /// Applies the side effects of a selection transition. May start the initial load when
    /// the list opens.
    fn settle(&mut self, t: Transition, now_ms: u64) -> Option<FetchRequest> {
        match t {
            Transition::Ignored => None,
            Transition::Opened => self.load_if_outdated(now_ms),
            Transition::Closed(reason) => {
                tracing::trace!(?reason, "Picker: closed");
                self.sync_term();
                None
            }
            Transition::Highlighted(Some(index)) => {
                self.window.scroll_to_index(index, Align::Auto);
                None
            }
            Transition::Highlighted(None) => None,
            Transition::Committed { id, index } => {
                tracing::debug!(%id, index, "Picker: committed");
                self.selected = self.items.get(index).cloned();
                self.sync_term();
                self.events.push_back(PickerEvent::Changed {
                    selected_id: Some(id),
                    item: self.selected.clone(),
                });
                None
            }
            Transition::Rejected { index } => {
                tracing::debug!(index, "Picker: blocked item not selectable");
                None
            }
            Transition::Cleared => {
                self.selected = None;
                self.sync_term();
                self.events.push_back(PickerEvent::Changed {
                    selected_id: None,
                    item: None,
                });
                None
            }
        }
    }

    fn sync_term(&mut self) {
        let term = self.selection.search_term();
        if self.session.term() != term {
            self.session.reset_term(term.to_owned());
        }
    }

    /// Issues a query when the last one no longer matches the term and filters.
    fn load_if_outdated(&mut self, now_ms: u64) -> Option<FetchRequest> {
        if self.session.is_debouncing() {
            return None;
        }
        let limit = self.config.max_results;
        let wanted = QueryKey::new(self.session.term(), self.session.filters(), limit);
        let outdated = self
            .session
            .last_query()
            .is_none_or(|q| q.key(limit) != wanted);
        if !outdated {
            return None;
        }
        let query = self.session.issue_now();
        self.dispatch(query, now_ms)
    }

    /// Routes an issued query through the cache. Returns a fetch on miss, or a background
    /// refresh on the first stale hit.
    fn dispatch(&mut self, query: SearchQuery, now_ms: u64) -> Option<FetchRequest> {
        let key = query.key(self.config.max_results);
        match self.cache.get(&key, now_ms) {
            CacheLookup::Fresh(result) => {
                tracing::trace!(sequence = query.sequence, "Picker: fresh cache hit");
                self.show_cached(query.sequence, key, &result);
                None
            }
            CacheLookup::Stale { result, refresh } => {
                tracing::trace!(
                    sequence = query.sequence,
                    refresh,
                    "Picker: stale cache hit"
                );
                self.show_cached(query.sequence, key.clone(), &result);
                if !refresh {
                    return None;
                }
                let revalidate = self.session.reissue(&query);
                Some(self.track(revalidate.sequence, key, true))
            }
            CacheLookup::Miss => {
                self.events.push_back(PickerEvent::SearchStarted {
                    sequence: query.sequence,
                });
                Some(self.track(query.sequence, key, false))
            }
        }
    }

    fn track(&mut self, sequence: u64, key: QueryKey, revalidation: bool) -> FetchRequest {
        tracing::debug!(sequence, term = %key.term, revalidation, "Picker: fetch");
        let request = ProviderRequest::from(&key);
        self.pending.insert(sequence, InFlight { key, revalidation });
        FetchRequest {
            sequence,
            request,
            revalidation,
        }
    }

    fn show_cached(&mut self, sequence: u64, key: QueryKey, result: &Arc<SearchResult>) {
        let result = Arc::new((**result).clone().with_sequence(sequence));
        if self.session.resolve(sequence).is_accepted() {
            self.show(result, key, false);
        }
    }

    /// Displays a late refresh of the current query under a fresh sequence number.
    fn show_refresh(&mut self, result: &SearchResult, key: QueryKey) {
        let Some(last) = self.session.last_query().cloned() else {
            return;
        };
        let query = self.session.reissue(&last);
        let result = Arc::new(result.clone().with_sequence(query.sequence));
        if self.session.resolve(query.sequence).is_accepted() {
            self.show(result, key, true);
        }
    }

    fn show(&mut self, result: Arc<SearchResult>, key: QueryKey, revalidation: bool) {
        let sequence = result.sequence;
        let items = self.filter.apply(&result.items);
        let unchanged = revalidation && same_ids(&items, &self.items);

        if let Some(selected) = &self.selected {
            if let Some(fresh) = result.items.iter().find(|i| i.id == selected.id) {
                self.selected = Some(Arc::clone(fresh));
            }
        }

        self.displayed = Some(result);
        self.displayed_key = Some(key);
        self.replace_items(items, unchanged);
        self.error = None;
        self.events.push_back(PickerEvent::SearchEnded {
            sequence,
            items: self.items.clone(),
        });
    }

    fn refilter(&mut self) {
        let Some(result) = &self.displayed else {
            return;
        };
        let items = self.filter.apply(&result.items);
        let unchanged = same_ids(&items, &self.items);
        self.replace_items(items, unchanged);
    }

    fn replace_items(&mut self, items: Vec<Arc<CatalogItem>>, unchanged: bool) {
        self.items = items;
        let t = if unchanged {
            self.selection.reconcile_len(self.items.len())
        } else {
            self.selection.results_replaced()
        };
        self.window.set_count(self.items.len());
        self.settle(t, 0);
    }

    fn fail(&mut self, sequence: u64, flight: InFlight, err: ProviderError) {
        if flight.revalidation {
            self.cache.release_refresh(&flight.key);
        }
        let failure = self.session.fail(sequence);
        if flight.revalidation || !matches!(failure, Failure::Surface { .. }) {
            tracing::debug!(sequence, %err, "Picker: failure dropped");
            return;
        }

        tracing::warn!(sequence, %err, "Picker: search failed");
        let message = err.to_string();
        self.error = Some(SearchFailure {
            sequence,
            message: message.clone(),
            retryable: err.is_retryable(),
        });
        self.events.push_back(PickerEvent::Error { message });
        self.events.push_back(PickerEvent::SearchEnded {
            sequence,
            items: self.items.clone(),
        });
    }
}

fn same_ids(a: &[Arc<CatalogItem>], b: &[Arc<CatalogItem>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.id == y.id)
}
