use std::sync::Arc;

use catalog_select::{CatalogItem, ItemId, SelectionState, ViewportState, WindowRow};

/// Notifications for host integration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PickerEvent {
    /// The committed selection changed (commit or clear).
    Changed {
        selected_id: Option<ItemId>,
        item: Option<Arc<CatalogItem>>,
    },
    /// The newest query failed; the previous list is still displayed.
    Error { message: String },
    /// A query went to the provider.
    SearchStarted { sequence: u64 },
    /// A query finished: either its result is now displayed, or it failed and `items` is the
    /// list that stays on screen.
    SearchEnded {
        sequence: u64,
        items: Vec<Arc<CatalogItem>>,
    },
}

/// The surfaced failure of the newest query.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchFailure {
    pub sequence: u64,
    pub message: String,
    pub retryable: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleRow {
    pub row: WindowRow,
    pub item: Arc<CatalogItem>,
    pub highlighted: bool,
    pub selected: bool,
}

/// Everything a host needs to draw the picker, captured atomically.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PickerSnapshot {
    pub selection: SelectionState,
    /// Text to show in the input: the term while typing, the selected item's label once the
    /// list is closed on a selection.
    pub display_text: String,
    pub selected_item: Option<Arc<CatalogItem>>,
    pub rows: Vec<VisibleRow>,
    pub item_count: usize,
    pub total: usize,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<SearchFailure>,
    pub viewport: ViewportState,
    pub total_height: u64,
}

impl PickerSnapshot {
    pub fn item_ids(&self) -> Vec<&ItemId> {
        self.rows.iter().map(|r| &r.item.id).collect()
    }
}
