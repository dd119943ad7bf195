use alloc::sync::Arc;

use crate::window::VirtualWindow;

/// A callback fired when the window's state changes (scroll, viewport, count).
pub type OnChangeCallback = Arc<dyn Fn(&VirtualWindow) + Send + Sync>;

/// Configuration for [`crate::VirtualWindow`].
///
/// Cheap to clone: the callback lives in an `Arc`, so hosts can tweak a field and call
/// `VirtualWindow::set_options` without reallocating closures.
#[derive(Clone)]
pub struct WindowOptions {
    pub count: usize,
    /// Fixed row height in the scroll axis.
    pub item_height: u32,
    /// Visible height of the scroll container.
    pub viewport_height: u32,
    pub overscan: usize,

    /// Lists with at most this many rows are materialized in full; windowing only activates
    /// above it.
    pub virtualize_threshold: usize,

    pub initial_offset: u64,

    /// Optional callback fired when the window's internal state changes.
    pub on_change: Option<OnChangeCallback>,
}

impl WindowOptions {
    pub fn new(count: usize, item_height: u32) -> Self {
        Self {
            count,
            item_height,
            viewport_height: 0,
            overscan: 2,
            virtualize_threshold: 0,
            initial_offset: 0,
            on_change: None,
        }
    }

    pub fn with_viewport_height(mut self, viewport_height: u32) -> Self {
        self.viewport_height = viewport_height;
        self
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_virtualize_threshold(mut self, threshold: usize) -> Self {
        self.virtualize_threshold = threshold;
        self
    }

    pub fn with_initial_offset(mut self, initial_offset: u64) -> Self {
        self.initial_offset = initial_offset;
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: Option<impl Fn(&VirtualWindow) + Send + Sync + 'static>,
    ) -> Self {
        self.on_change = on_change.map(|f| Arc::new(f) as _);
        self
    }
}

impl core::fmt::Debug for WindowOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WindowOptions")
            .field("count", &self.count)
            .field("item_height", &self.item_height)
            .field("viewport_height", &self.viewport_height)
            .field("overscan", &self.overscan)
            .field("virtualize_threshold", &self.virtualize_threshold)
            .field("initial_offset", &self.initial_offset)
            .finish_non_exhaustive()
    }
}
