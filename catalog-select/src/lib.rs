//! A headless engine for picking one item out of a large remote catalog.
//!
//! For host integration (the async provider seam, the picker controller and a tokio-driven
//! selector handle), see the `catalog-select-adapter` crate.
//!
//! This crate holds the parts with actual algorithmic content:
//! - [`SearchSession`]: keystroke debouncing and sequence-numbered race resolution
//! - [`ResultCache`]: stale-while-revalidate memoization keyed by normalized query
//! - [`FilterPipeline`]: order-preserving local filtering of accepted results
//! - [`SelectionMachine`]: open/highlight/commit state machine driven by keys and pointer
//! - [`VirtualWindow`]: fixed-height windowing whose cost is independent of list length
//!
//! It is UI-agnostic and clock-free. A host is expected to provide:
//! - the current time (`now_ms`) on time-dependent calls
//! - viewport height and scroll offset
//! - key/pointer events mapped onto [`NavKey`] and [`SelectionEvent`]
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod cache;
mod config;
mod filter;
mod key;
mod options;
mod search;
mod selection;
mod state;
mod types;
mod window;

#[cfg(test)]
mod tests;

pub use cache::{CacheLookup, CachePolicy, CacheStats, ResultCache};
pub use config::{ConfigError, PickerConfig};
pub use filter::{FilterPipeline, ItemPredicate, apply};
pub use options::{OnChangeCallback, WindowOptions};
pub use search::{Failure, Resolution, SearchSession};
pub use selection::{
    CloseReason, NavKey, SelectionEvent, SelectionMachine, SelectionState, Transition,
};
pub use state::ViewportState;
pub use types::{
    Availability, CatalogItem, ItemId, LocationStock, Pricing, QueryKey, RentalPeriod,
    SearchFilters, SearchQuery, SearchResult, normalize_term,
};
pub use window::{Align, VirtualRange, VirtualWindow, WindowRow, compute_visible_range};

#[doc(hidden)]
pub use key::CacheKey;
