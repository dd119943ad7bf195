use alloc::string::String;
use alloc::sync::Arc;

use crate::{CatalogItem, ItemId};

/// Keys the selection machine reacts to. Hosts map their own key events onto these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NavKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    Tab,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionEvent {
    Key(NavKey),
    /// The input gained focus.
    Focus,
    /// Focus moved outside the picker.
    FocusLost,
    /// Programmatic open.
    Open,
    /// Programmatic close; leaves the term and the selection untouched.
    Close,
    /// Pointer moved over a row.
    Hover(usize),
    /// Pointer clicked a row.
    Select(usize),
    /// The search term was edited.
    TermChanged(String),
    /// A newer query's results replaced the displayed list.
    ResultsReplaced,
    Clear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CloseReason {
    Escape,
    FocusLost,
    Tab,
    Programmatic,
}

/// What a single event did to the machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    Opened,
    Closed(CloseReason),
    Highlighted(Option<usize>),
    Committed { id: ItemId, index: usize },
    /// The target row is blocked; nothing changed.
    Rejected { index: usize },
    Cleared,
}

/// A serializable snapshot of the selection state.
///
/// `highlighted_index` of `None` corresponds to "no highlight" (index −1).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionState {
    pub is_open: bool,
    pub highlighted_index: Option<usize>,
    pub selected_id: Option<ItemId>,
    pub search_term: String,
}

impl SelectionState {
    /// The highlight as a signed index, `-1` meaning none.
    pub fn highlighted_signed(&self) -> isize {
        self.highlighted_index.map_or(-1, |i| i as isize)
    }
}

/// Keyboard/pointer driven open/highlight/commit state machine.
///
/// The machine does not own the item list; every event that depends on it receives the
/// currently displayed (filtered) items. Transitions are total: out-of-range indices are
/// clamped or ignored, never panicking.
#[derive(Clone, Debug, Default)]
pub struct SelectionMachine {
    state: SelectionState,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn highlighted_index(&self) -> Option<usize> {
        self.state.highlighted_index
    }

    pub fn selected_id(&self) -> Option<&ItemId> {
        self.state.selected_id.as_ref()
    }

    pub fn search_term(&self) -> &str {
        &self.state.search_term
    }

    pub fn handle(&mut self, event: SelectionEvent, items: &[Arc<CatalogItem>]) -> Transition {
        let t = match event {
            SelectionEvent::Key(key) => self.on_key(key, items),
            SelectionEvent::Focus | SelectionEvent::Open => self.open(),
            SelectionEvent::FocusLost => self.dismiss(CloseReason::FocusLost),
            SelectionEvent::Close => self.close(CloseReason::Programmatic),
            SelectionEvent::Hover(index) => self.hover(index, items),
            SelectionEvent::Select(index) => self.select(index, items),
            SelectionEvent::TermChanged(term) => self.set_search_term(term),
            SelectionEvent::ResultsReplaced => self.results_replaced(),
            SelectionEvent::Clear => self.clear(),
        };
        strace!(?t, "SelectionMachine::handle");
        t
    }

    pub fn on_key(&mut self, key: NavKey, items: &[Arc<CatalogItem>]) -> Transition {
        if !self.state.is_open {
            return match key {
                NavKey::ArrowDown | NavKey::ArrowUp | NavKey::Enter => self.open(),
                NavKey::Escape | NavKey::Tab => Transition::Ignored,
            };
        }

        match key {
            NavKey::ArrowDown => {
                let next = match (self.state.highlighted_index, items.len()) {
                    (_, 0) => None,
                    (None, _) => Some(0),
                    (Some(i), len) => Some((i + 1).min(len - 1)),
                };
                self.move_highlight(next)
            }
            NavKey::ArrowUp => {
                let next = self
                    .state
                    .highlighted_index
                    .and_then(|i| i.min(items.len()).checked_sub(1));
                self.move_highlight(next)
            }
            NavKey::Enter => match self.state.highlighted_index {
                Some(index) => self.select(index, items),
                None => Transition::Ignored,
            },
            NavKey::Escape => self.dismiss(CloseReason::Escape),
            NavKey::Tab => self.close(CloseReason::Tab),
        }
    }

    pub fn open(&mut self) -> Transition {
        if self.state.is_open {
            return Transition::Ignored;
        }
        self.state.is_open = true;
        self.state.highlighted_index = None;
        Transition::Opened
    }

    /// Closes without touching the term or the selection.
    pub fn close(&mut self, reason: CloseReason) -> Transition {
        if !self.state.is_open {
            return Transition::Ignored;
        }
        self.state.is_open = false;
        self.state.highlighted_index = None;
        Transition::Closed(reason)
    }

    /// Escape / focus-lost: closes and clears the term. A committed selection stays, and the
    /// host shows its label in place of the term.
    pub fn dismiss(&mut self, reason: CloseReason) -> Transition {
        if !self.state.is_open {
            return Transition::Ignored;
        }
        self.state.search_term.clear();
        self.close(reason)
    }

    pub fn hover(&mut self, index: usize, items: &[Arc<CatalogItem>]) -> Transition {
        if !self.state.is_open || items.is_empty() {
            return Transition::Ignored;
        }
        self.move_highlight(Some(index.min(items.len() - 1)))
    }

    /// Commits the row at `index` unless it is blocked or out of range.
    pub fn select(&mut self, index: usize, items: &[Arc<CatalogItem>]) -> Transition {
        if !self.state.is_open {
            return Transition::Ignored;
        }
        let Some(item) = items.get(index) else {
            return Transition::Ignored;
        };
        if item.blocked {
            sdebug!(index, id = %item.id, "SelectionMachine: blocked item not selectable");
            return Transition::Rejected { index };
        }
        let id = item.id.clone();
        self.state.selected_id = Some(id.clone());
        self.state.search_term.clear();
        self.state.is_open = false;
        self.state.highlighted_index = None;
        Transition::Committed { id, index }
    }

    /// Records a new term and opens the list if it was closed.
    pub fn set_search_term(&mut self, term: String) -> Transition {
        self.state.search_term = term;
        self.open()
    }

    pub fn results_replaced(&mut self) -> Transition {
        if self.state.highlighted_index.is_none() {
            return Transition::Ignored;
        }
        self.state.highlighted_index = None;
        Transition::Highlighted(None)
    }

    /// Re-clamps the highlight after the list changed length without changing identity.
    pub fn reconcile_len(&mut self, len: usize) -> Transition {
        match self.state.highlighted_index {
            Some(i) if i >= len => self.move_highlight(len.checked_sub(1)),
            _ => Transition::Ignored,
        }
    }

    pub fn clear(&mut self) -> Transition {
        self.state.selected_id = None;
        self.state.search_term.clear();
        self.state.highlighted_index = None;
        Transition::Cleared
    }

    fn move_highlight(&mut self, next: Option<usize>) -> Transition {
        if self.state.highlighted_index == next {
            return Transition::Ignored;
        }
        self.state.highlighted_index = next;
        Transition::Highlighted(next)
    }
}
