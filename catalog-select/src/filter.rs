use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::CatalogItem;

/// A local predicate over catalog items.
pub type ItemPredicate = Arc<dyn Fn(&CatalogItem) -> bool + Send + Sync>;

/// Returns the items satisfying `predicate`, preserving their relative order.
///
/// The input is never mutated; matching items are shared, not copied.
pub fn apply(
    items: &[Arc<CatalogItem>],
    predicate: impl Fn(&CatalogItem) -> bool,
) -> Vec<Arc<CatalogItem>> {
    items
        .iter()
        .filter(|it| predicate(it))
        .map(Arc::clone)
        .collect()
}

/// The secondary, purely local filter stage between an accepted result and selection/windowing.
///
/// All installed predicates must pass. An empty pipeline passes everything through.
#[derive(Clone, Default)]
pub struct FilterPipeline {
    predicates: Vec<ItemPredicate>,
    min_available: Option<u32>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only items with `availability.total_available >= min`.
    pub fn with_min_available(mut self, min: Option<u32>) -> Self {
        self.min_available = min;
        self
    }

    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&CatalogItem) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn set_min_available(&mut self, min: Option<u32>) {
        self.min_available = min;
    }

    pub fn min_available(&self) -> Option<u32> {
        self.min_available
    }

    pub fn push_predicate(&mut self, predicate: ItemPredicate) {
        self.predicates.push(predicate);
    }

    pub fn clear_predicates(&mut self) {
        self.predicates.clear();
    }

    pub fn is_passthrough(&self) -> bool {
        self.min_available.is_none() && self.predicates.is_empty()
    }

    pub fn matches(&self, item: &CatalogItem) -> bool {
        if let Some(min) = self.min_available {
            if item.availability.total_available < min {
                return false;
            }
        }
        self.predicates.iter().all(|p| p(item))
    }

    pub fn apply(&self, items: &[Arc<CatalogItem>]) -> Vec<Arc<CatalogItem>> {
        if self.is_passthrough() {
            return items.to_vec();
        }
        let out = apply(items, |it| self.matches(it));
        strace!(input = items.len(), output = out.len(), "FilterPipeline::apply");
        out
    }
}

impl core::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("min_available", &self.min_available)
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
