use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use catalog_select::{ConfigError, NavKey, PickerConfig, QueryKey, SearchFilters, SearchResult};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinSet};
use tokio::time::Instant;

use crate::{
    CatalogSearchProvider, FetchRequest, HandleError, Picker, PickerEvent, PickerSnapshot,
    ProviderError, ProviderResponse,
};

type CachePredicate = Box<dyn FnMut(&QueryKey, &SearchResult) -> bool + Send>;

enum Command {
    Focus,
    Blur,
    Open,
    Close,
    Clear,
    SetSearchTerm(String),
    Key(NavKey),
    Hover(usize),
    Select(usize),
    Scroll(u64),
    ViewportHeight(u32),
    SetFilters(SearchFilters),
    SetMinAvailable(Option<u32>),
    Retry,
    Cancel,
    DismissError,
    InvalidateCache(CachePredicate),
    InvalidateAll,
    GetSearchTerm(oneshot::Sender<String>),
    Shutdown,
}

/// A cloneable handle to a picker running on its own tokio task.
///
/// The task owns a [`Picker`], fires the debounce timer, calls the provider and publishes a
/// fresh [`PickerSnapshot`] after every change. Commands are fire-and-forget; they fail only
/// once the task has stopped.
#[derive(Clone, Debug)]
pub struct SelectorHandle {
    tx: mpsc::UnboundedSender<Command>,
    snapshot: watch::Receiver<PickerSnapshot>,
}

impl SelectorHandle {
    /// Starts the picker task on the current tokio runtime.
    ///
    /// Returns the handle and the receiving end of the event stream.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(
        provider: Arc<dyn CatalogSearchProvider>,
        config: PickerConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PickerEvent>), ConfigError> {
        let picker = Picker::new(config)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(picker.snapshot());

        let actor = Actor {
            picker,
            provider,
            origin: Instant::now(),
            fetches: JoinSet::new(),
            aborts: BTreeMap::new(),
            events: events_tx,
            snapshot: snapshot_tx,
        };
        tokio::spawn(actor.run(rx));

        Ok((
            Self {
                tx,
                snapshot: snapshot_rx,
            },
            events_rx,
        ))
    }

    pub fn focus(&self) -> Result<(), HandleError> {
        self.send(Command::Focus)
    }

    pub fn blur(&self) -> Result<(), HandleError> {
        self.send(Command::Blur)
    }

    pub fn open(&self) -> Result<(), HandleError> {
        self.send(Command::Open)
    }

    pub fn close(&self) -> Result<(), HandleError> {
        self.send(Command::Close)
    }

    pub fn clear(&self) -> Result<(), HandleError> {
        self.send(Command::Clear)
    }

    pub fn set_search_term(&self, term: impl Into<String>) -> Result<(), HandleError> {
        self.send(Command::SetSearchTerm(term.into()))
    }

    pub fn key(&self, key: NavKey) -> Result<(), HandleError> {
        self.send(Command::Key(key))
    }

    pub fn hover(&self, index: usize) -> Result<(), HandleError> {
        self.send(Command::Hover(index))
    }

    pub fn select(&self, index: usize) -> Result<(), HandleError> {
        self.send(Command::Select(index))
    }

    pub fn scroll(&self, scroll_offset: u64) -> Result<(), HandleError> {
        self.send(Command::Scroll(scroll_offset))
    }

    pub fn set_viewport_height(&self, viewport_height: u32) -> Result<(), HandleError> {
        self.send(Command::ViewportHeight(viewport_height))
    }

    pub fn set_filters(&self, filters: SearchFilters) -> Result<(), HandleError> {
        self.send(Command::SetFilters(filters))
    }

    pub fn set_min_available(&self, min: Option<u32>) -> Result<(), HandleError> {
        self.send(Command::SetMinAvailable(min))
    }

    pub fn retry(&self) -> Result<(), HandleError> {
        self.send(Command::Retry)
    }

    /// Aborts outstanding provider calls and ignores any response that still arrives.
    pub fn cancel(&self) -> Result<(), HandleError> {
        self.send(Command::Cancel)
    }

    pub fn dismiss_error(&self) -> Result<(), HandleError> {
        self.send(Command::DismissError)
    }

    pub fn invalidate_cache(
        &self,
        predicate: impl FnMut(&QueryKey, &SearchResult) -> bool + Send + 'static,
    ) -> Result<(), HandleError> {
        self.send(Command::InvalidateCache(Box::new(predicate)))
    }

    pub fn invalidate_all(&self) -> Result<(), HandleError> {
        self.send(Command::InvalidateAll)
    }

    /// Stops the task. Outstanding provider calls are aborted.
    pub fn shutdown(&self) -> Result<(), HandleError> {
        self.send(Command::Shutdown)
    }

    pub async fn get_search_term(&self) -> Result<String, HandleError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetSearchTerm(reply))?;
        rx.await.map_err(|_| HandleError::Closed)
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> PickerSnapshot {
        self.snapshot.borrow().clone()
    }

    /// A receiver notified whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<PickerSnapshot> {
        self.snapshot.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, cmd: Command) -> Result<(), HandleError> {
        self.tx.send(cmd).map_err(|_| HandleError::Closed)
    }
}

struct Actor {
    picker: Picker,
    provider: Arc<dyn CatalogSearchProvider>,
    origin: Instant,
    fetches: JoinSet<(u64, Result<ProviderResponse, ProviderError>)>,
    aborts: BTreeMap<u64, AbortHandle>,
    events: mpsc::UnboundedSender<PickerEvent>,
    snapshot: watch::Sender<PickerSnapshot>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!("selector task started");
        loop {
            let deadline = self
                .picker
                .next_deadline_ms()
                .map(|ms| self.origin + Duration::from_millis(ms));

            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle(cmd),
                },
                Some(joined) = self.fetches.join_next() => match joined {
                    Ok((sequence, result)) => self.on_fetched(sequence, result),
                    Err(err) => tracing::warn!(%err, "fetch wrapper task failed"),
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or(self.origin)), if deadline.is_some() => {
                    let now = self.now_ms();
                    if let Some(fetch) = self.picker.tick(now) {
                        self.spawn_fetch(fetch);
                    }
                }
            }

            self.publish();
        }

        for (_, abort) in std::mem::take(&mut self.aborts) {
            abort.abort();
        }
        self.fetches.abort_all();
        tracing::debug!("selector task stopped");
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn handle(&mut self, cmd: Command) {
        let now = self.now_ms();
        let fetch = match cmd {
            Command::Focus => self.picker.focus(now),
            Command::Open => self.picker.open(now),
            Command::Blur => {
                self.picker.blur();
                None
            }
            Command::Close => {
                self.picker.close();
                None
            }
            Command::Clear => self.picker.clear(now),
            Command::SetSearchTerm(term) => self.picker.set_search_term(term, now),
            Command::Key(key) => self.picker.on_key(key, now),
            Command::Hover(index) => {
                self.picker.hover(index);
                None
            }
            Command::Select(index) => {
                self.picker.select(index);
                None
            }
            Command::Scroll(offset) => {
                self.picker.on_scroll(offset);
                None
            }
            Command::ViewportHeight(height) => {
                self.picker.on_viewport_height(height);
                None
            }
            Command::SetFilters(filters) => self.picker.set_filters(filters, now),
            Command::SetMinAvailable(min) => {
                self.picker.set_min_available(min);
                None
            }
            Command::Retry => self.picker.retry(now),
            Command::Cancel => {
                self.picker.cancel();
                for (sequence, abort) in std::mem::take(&mut self.aborts) {
                    tracing::trace!(sequence, "aborting provider call");
                    abort.abort();
                }
                None
            }
            Command::DismissError => {
                self.picker.dismiss_error();
                None
            }
            Command::InvalidateCache(predicate) => {
                self.picker.invalidate_cache(predicate);
                None
            }
            Command::InvalidateAll => {
                self.picker.invalidate_all();
                None
            }
            Command::GetSearchTerm(reply) => {
                let _ = reply.send(self.picker.search_term().to_owned());
                None
            }
            Command::Shutdown => None,
        };
        if let Some(fetch) = fetch {
            self.spawn_fetch(fetch);
        }
    }

    /// Runs the provider call on its own task so a panic surfaces as a `JoinError`.
    fn spawn_fetch(&mut self, fetch: FetchRequest) {
        let FetchRequest {
            sequence, request, ..
        } = fetch;
        let provider = Arc::clone(&self.provider);
        let call = tokio::spawn(async move { provider.search(request).await });
        self.aborts.insert(sequence, call.abort_handle());

        self.fetches.spawn(async move {
            let result = match call.await {
                Ok(result) => result,
                Err(err) if err.is_panic() => Err(ProviderError::Panicked),
                Err(_) => Err(ProviderError::Cancelled),
            };
            (sequence, result)
        });
    }

    fn on_fetched(&mut self, sequence: u64, result: Result<ProviderResponse, ProviderError>) {
        self.aborts.remove(&sequence);
        if let Err(err) = &result {
            tracing::debug!(sequence, %err, "provider call failed");
        }
        let now = self.now_ms();
        self.picker.on_response(sequence, result, now);
    }

    fn publish(&mut self) {
        for event in self.picker.drain_events() {
            // A dropped receiver only means nobody listens for events.
            let _ = self.events.send(event);
        }
        let next = self.picker.snapshot();
        self.snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}
