//! Host integration for the `catalog-select` crate.
//!
//! The `catalog-select` crate is UI-agnostic, clock-free and performs no I/O. This crate
//! connects it to a host:
//!
//! - [`CatalogSearchProvider`]: the async seam to the remote catalog
//! - [`Picker`]: a synchronous controller wiring search, cache, filter, selection and window
//!   together; the host performs the [`FetchRequest`]s it returns
//! - [`SelectorHandle`]: a tokio task owning a `Picker`, with debounce timers and provider
//!   calls handled for you
//!
//! This crate is intentionally framework-agnostic (no terminal or web bindings).
#![forbid(unsafe_code)]

mod controller;
mod error;
mod event;
mod handle;
mod provider;


pub use controller::{FetchRequest, Picker};
pub use error::{HandleError, ProviderError};
pub use event::{PickerEvent, PickerSnapshot, SearchFailure, VisibleRow};
pub use handle::SelectorHandle;
pub use provider::{CatalogSearchProvider, ProviderRequest, ProviderResponse};
