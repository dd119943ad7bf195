use crate::{CachePolicy, FilterPipeline, SearchSession, WindowOptions};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("item_height must be greater than zero")]
    ZeroItemHeight,
    #[error("max_results must be greater than zero")]
    ZeroMaxResults,
    #[error("stale_time_ms ({stale_time_ms}) exceeds cache_time_ms ({cache_time_ms})")]
    StaleAfterExpiry {
        stale_time_ms: u64,
        cache_time_ms: u64,
    },
}

/// Options recognized by a picker. Every field has a default, and with `feature = "serde"`
/// every field may be omitted when deserializing.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct PickerConfig {
    pub debounce_ms: u64,
    /// Page size requested from the provider.
    pub max_results: usize,
    pub cache_time_ms: u64,
    pub stale_time_ms: u64,
    pub cache_capacity: Option<usize>,
    pub min_available_quantity: Option<u32>,
    /// Item count above which windowing activates.
    pub virtualize_threshold: usize,
    pub item_height: u32,
    pub viewport_height: u32,
    pub overscan: usize,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            max_results: 50,
            cache_time_ms: 300_000,
            stale_time_ms: 30_000,
            cache_capacity: Some(256),
            min_available_quantity: None,
            virtualize_threshold: 50,
            item_height: 80,
            viewport_height: 320,
            overscan: 2,
        }
    }
}

impl PickerConfig {
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_cache_time_ms(mut self, cache_time_ms: u64) -> Self {
        self.cache_time_ms = cache_time_ms;
        self
    }

    pub fn with_stale_time_ms(mut self, stale_time_ms: u64) -> Self {
        self.stale_time_ms = stale_time_ms;
        self
    }

    pub fn with_cache_capacity(mut self, cache_capacity: Option<usize>) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    pub fn with_min_available_quantity(mut self, min: Option<u32>) -> Self {
        self.min_available_quantity = min;
        self
    }

    pub fn with_virtualize_threshold(mut self, threshold: usize) -> Self {
        self.virtualize_threshold = threshold;
        self
    }

    pub fn with_item_height(mut self, item_height: u32) -> Self {
        self.item_height = item_height;
        self
    }

    pub fn with_viewport_height(mut self, viewport_height: u32) -> Self {
        self.viewport_height = viewport_height;
        self
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.item_height == 0 {
            return Err(ConfigError::ZeroItemHeight);
        }
        if self.max_results == 0 {
            return Err(ConfigError::ZeroMaxResults);
        }
        if self.stale_time_ms > self.cache_time_ms {
            return Err(ConfigError::StaleAfterExpiry {
                stale_time_ms: self.stale_time_ms,
                cache_time_ms: self.cache_time_ms,
            });
        }
        Ok(())
    }

    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            stale_time_ms: self.stale_time_ms,
            cache_time_ms: self.cache_time_ms,
            max_entries: self.cache_capacity,
        }
    }

    pub fn window_options(&self, count: usize) -> WindowOptions {
        WindowOptions::new(count, self.item_height)
            .with_viewport_height(self.viewport_height)
            .with_overscan(self.overscan)
            .with_virtualize_threshold(self.virtualize_threshold)
    }

    pub fn filter_pipeline(&self) -> FilterPipeline {
        FilterPipeline::new().with_min_available(self.min_available_quantity)
    }

    pub fn search_session(&self) -> SearchSession {
        SearchSession::new(self.debounce_ms)
    }
}
