use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::{ViewportState, WindowOptions};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Align {
    Start,
    Center,
    End,
    /// "Smart": no scroll when the row is fully visible, otherwise the minimal adjustment
    /// toward the nearer edge.
    #[default]
    Auto,
}

/// A contiguous range of row indexes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualRange {
    pub start_index: usize,
    pub end_index: usize, // exclusive
}

impl VirtualRange {
    pub const EMPTY: Self = Self {
        start_index: 0,
        end_index: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start_index && index < self.end_index
    }

    /// The last materialized index (inclusive), if any.
    pub fn last_index(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.end_index - 1)
    }
}

/// A materialized row: its index and pixel geometry in the scroll axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowRow {
    pub index: usize,
    pub top: u64,
    pub height: u32,
}

impl WindowRow {
    pub fn bottom(&self) -> u64 {
        self.top.saturating_add(self.height as u64)
    }
}

/// Computes the rows that must be materialized for a fixed-height list.
///
/// The scroll offset is clamped to the maximum scroll offset first. The result is
/// `[floor(off / h) - overscan, ceil((off + view) / h) - 1 + overscan]`, clamped to valid
/// indexes, with an exclusive end. Its length is bounded by
/// `ceil(view / h) + 1 + 2 * overscan` whatever `item_count` is.
pub fn compute_visible_range(
    scroll_offset: u64,
    container_height: u32,
    item_height: u32,
    item_count: usize,
    overscan: usize,
) -> VirtualRange {
    if item_count == 0 || item_height == 0 || container_height == 0 {
        return VirtualRange::EMPTY;
    }

    let h = item_height as u64;
    let view = container_height as u64;
    let total = (item_count as u64).saturating_mul(h);
    let off = scroll_offset.min(total.saturating_sub(view));
    let last = (item_count - 1) as u64;
    let overscan = overscan as u64;

    let start = (off / h).saturating_sub(overscan).min(last);
    let last_visible = off.saturating_add(view).div_ceil(h).saturating_sub(1);
    let end = last_visible.saturating_add(overscan).clamp(start, last);

    VirtualRange {
        start_index: start as usize,
        end_index: end as usize + 1,
    }
}

/// A headless, fixed-row-height virtual window.
///
/// This type is intentionally UI-agnostic:
/// - It does not hold any UI objects or items, only a row count.
/// - The host drives it by providing viewport height and scroll offsets.
/// - Rendering is exposed via zero-allocation iteration (`for_each_row`).
///
/// The scroll offset is always kept within `[0, max(0, count * item_height - viewport)]`, so a
/// list that shrinks never leaves a meaningless offset behind.
#[derive(Clone, Debug)]
pub struct VirtualWindow {
    options: WindowOptions,
    scroll_offset: u64,

    notify_depth: Cell<usize>,
    notify_pending: Cell<bool>,
}

impl VirtualWindow {
    pub fn new(options: WindowOptions) -> Self {
        sdebug!(
            count = options.count,
            item_height = options.item_height,
            overscan = options.overscan,
            "VirtualWindow::new"
        );
        let mut w = Self {
            scroll_offset: 0,
            options,
            notify_depth: Cell::new(0),
            notify_pending: Cell::new(false),
        };
        w.scroll_offset = w.clamp_scroll_offset(w.options.initial_offset);
        w
    }

    pub fn options(&self) -> &WindowOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: WindowOptions) {
        self.options = options;
        strace!(
            count = self.options.count,
            item_height = self.options.item_height,
            "VirtualWindow::set_options"
        );
        self.scroll_offset = self.clamp_scroll_offset(self.scroll_offset);
        self.notify();
    }

    /// Clones the current options, applies `f`, then delegates to `set_options`.
    pub fn update_options(&mut self, f: impl FnOnce(&mut WindowOptions)) {
        let mut next = self.options.clone();
        f(&mut next);
        self.set_options(next);
    }

    pub fn set_on_change(
        &mut self,
        on_change: Option<impl Fn(&VirtualWindow) + Send + Sync + 'static>,
    ) {
        self.options.on_change = on_change.map(|f| Arc::new(f) as _);
        self.notify();
    }

    fn notify_now(&self) {
        if let Some(cb) = &self.options.on_change {
            cb(self);
        }
    }

    fn notify(&self) {
        if self.notify_depth.get() > 0 {
            self.notify_pending.set(true);
            return;
        }
        self.notify_now();
    }

    /// Batches multiple updates into a single `on_change` notification.
    pub fn batch_update(&mut self, f: impl FnOnce(&mut Self)) {
        let depth = self.notify_depth.get();
        self.notify_depth.set(depth.saturating_add(1));

        f(self);

        let depth = self.notify_depth.get();
        debug_assert!(depth > 0, "notify_depth underflow");
        let next = depth.saturating_sub(1);
        self.notify_depth.set(next);

        if next == 0 && self.notify_pending.replace(false) {
            self.notify_now();
        }
    }

    pub fn count(&self) -> usize {
        self.options.count
    }

    /// Updates the row count (e.g. a new result set) and clamps the scroll offset.
    pub fn set_count(&mut self, count: usize) {
        if self.options.count == count {
            return;
        }
        self.options.count = count;
        self.scroll_offset = self.clamp_scroll_offset(self.scroll_offset);
        strace!(count, scroll_offset = self.scroll_offset, "VirtualWindow::set_count");
        self.notify();
    }

    pub fn item_height(&self) -> u32 {
        self.options.item_height
    }

    pub fn set_item_height(&mut self, item_height: u32) {
        if self.options.item_height == item_height {
            return;
        }
        self.options.item_height = item_height;
        self.scroll_offset = self.clamp_scroll_offset(self.scroll_offset);
        self.notify();
    }

    pub fn viewport_height(&self) -> u32 {
        self.options.viewport_height
    }

    pub fn set_viewport_height(&mut self, viewport_height: u32) {
        if self.options.viewport_height == viewport_height {
            return;
        }
        self.options.viewport_height = viewport_height;
        self.scroll_offset = self.clamp_scroll_offset(self.scroll_offset);
        self.notify();
    }

    pub fn overscan(&self) -> usize {
        self.options.overscan
    }

    pub fn set_overscan(&mut self, overscan: usize) {
        self.options.overscan = overscan;
        self.notify();
    }

    /// Whether windowing is active (`count > virtualize_threshold`).
    pub fn is_virtualized(&self) -> bool {
        self.options.count > self.options.virtualize_threshold
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    /// Applies a scroll offset from the host, clamped. Returns the applied offset.
    pub fn set_scroll_offset(&mut self, offset: u64) -> u64 {
        let clamped = self.clamp_scroll_offset(offset);
        if self.scroll_offset != clamped {
            self.scroll_offset = clamped;
            self.notify();
        }
        clamped
    }

    /// Applies viewport height and scroll offset in a single coalesced update.
    pub fn apply_scroll_frame(&mut self, viewport_height: u32, scroll_offset: u64) {
        strace!(viewport_height, scroll_offset, "apply_scroll_frame");
        self.batch_update(|w| {
            w.set_viewport_height(viewport_height);
            w.set_scroll_offset(scroll_offset);
        });
    }

    pub fn total_height(&self) -> u64 {
        (self.options.count as u64).saturating_mul(self.options.item_height as u64)
    }

    pub fn max_scroll_offset(&self) -> u64 {
        self.total_height()
            .saturating_sub(self.options.viewport_height as u64)
    }

    pub fn clamp_scroll_offset(&self, offset: u64) -> u64 {
        offset.min(self.max_scroll_offset())
    }

    /// The rows to materialize at the current scroll offset.
    ///
    /// At or below `virtualize_threshold` this is the whole list.
    pub fn visible_range(&self) -> VirtualRange {
        self.visible_range_for(self.scroll_offset, self.options.viewport_height)
    }

    pub fn visible_range_for(&self, scroll_offset: u64, viewport_height: u32) -> VirtualRange {
        if !self.is_virtualized() {
            return VirtualRange {
                start_index: 0,
                end_index: self.options.count,
            };
        }
        compute_visible_range(
            scroll_offset,
            viewport_height,
            self.options.item_height,
            self.options.count,
            self.options.overscan,
        )
    }

    pub fn for_each_index(&self, mut f: impl FnMut(usize)) {
        let range = self.visible_range();
        for i in range.start_index..range.end_index {
            f(i);
        }
    }

    pub fn for_each_row(&self, mut f: impl FnMut(WindowRow)) {
        let range = self.visible_range();
        let height = self.options.item_height;
        let mut top = (range.start_index as u64).saturating_mul(height as u64);
        for index in range.start_index..range.end_index {
            f(WindowRow { index, top, height });
            top = top.saturating_add(height as u64);
        }
    }

    /// Collects materialized rows into `out` (clears `out` first).
    ///
    /// For maximum performance, prefer `for_each_row` and reuse a scratch buffer in the host.
    pub fn collect_rows(&self, out: &mut Vec<WindowRow>) {
        out.clear();
        self.for_each_row(|row| out.push(row));
    }

    pub fn row(&self, index: usize) -> Option<WindowRow> {
        (index < self.options.count).then(|| WindowRow {
            index,
            top: (index as u64).saturating_mul(self.options.item_height as u64),
            height: self.options.item_height,
        })
    }

    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        let count = self.options.count;
        if count == 0 || self.options.item_height == 0 {
            return None;
        }
        let index = offset / self.options.item_height as u64;
        Some((index as usize).min(count - 1))
    }

    /// Scrolls so that `index` is in view and returns the applied (clamped) offset.
    pub fn scroll_to_index(&mut self, index: usize, align: Align) -> u64 {
        let offset = self.scroll_to_index_offset(index, align);
        self.set_scroll_offset(offset)
    }

    pub fn scroll_to_index_offset(&self, index: usize, align: Align) -> u64 {
        let count = self.options.count;
        if count == 0 || self.options.item_height == 0 {
            return 0;
        }
        let Some(row) = self.row(index.min(count - 1)) else {
            return self.scroll_offset;
        };
        let view = self.options.viewport_height as u64;

        let target = match align {
            Align::Start => row.top,
            Align::End => row.bottom().saturating_sub(view),
            Align::Center => {
                let center = row.top.saturating_add(row.height as u64 / 2);
                center.saturating_sub(view / 2)
            }
            Align::Auto => {
                let cur = self.scroll_offset;
                let cur_end = cur.saturating_add(view);
                if row.top >= cur && row.bottom() <= cur_end {
                    cur
                } else if row.top < cur || row.height as u64 >= view {
                    row.top
                } else {
                    row.bottom().saturating_sub(view)
                }
            }
        };

        self.clamp_scroll_offset(target)
    }

    /// Returns a lightweight snapshot of the current viewport state.
    pub fn viewport_state(&self) -> ViewportState {
        ViewportState {
            scroll_offset: self.scroll_offset,
            container_height: self.options.viewport_height,
            item_height: self.options.item_height,
            overscan: self.options.overscan,
        }
    }

    /// Restores viewport geometry and scroll offset from a previously captured snapshot.
    pub fn restore_viewport_state(&mut self, state: ViewportState) {
        self.batch_update(|w| {
            w.options.item_height = state.item_height;
            w.options.overscan = state.overscan;
            w.set_viewport_height(state.container_height);
            w.scroll_offset = w.clamp_scroll_offset(state.scroll_offset);
            w.notify();
        });
    }
}
