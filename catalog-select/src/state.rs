/// A lightweight, serializable snapshot of the list viewport geometry.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`, which lets hosts
/// restore the scroll position of a picker across frames or sessions without coupling the
/// window to any UI framework.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewportState {
    pub scroll_offset: u64,
    pub container_height: u32,
    pub item_height: u32,
    /// Extra rows materialized beyond each visible edge.
    pub overscan: usize,
}

impl ViewportState {
    /// Number of rows that fit in the container, counting a partially visible last row.
    pub fn rows_per_page(&self) -> usize {
        if self.item_height == 0 {
            return 0;
        }
        self.container_height.div_ceil(self.item_height) as usize
    }
}
