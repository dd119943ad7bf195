use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

/// Stable identity of a catalog item as assigned by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RentalPeriod {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pricing {
    pub base_price: f64,
    pub period: RentalPeriod,
    pub min_days: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocationStock {
    pub location_id: String,
    pub available: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Availability {
    pub total_available: u32,
    pub per_location: Vec<LocationStock>,
}

impl Availability {
    pub fn total(total_available: u32) -> Self {
        Self {
            total_available,
            per_location: Vec::new(),
        }
    }

    /// Units available at one location, `0` when the location is unknown.
    pub fn at(&self, location_id: &str) -> u32 {
        self.per_location
            .iter()
            .find(|s| s.location_id == location_id)
            .map_or(0, |s| s.available)
    }
}

/// An immutable snapshot of a rentable item as returned by the search provider.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub sku: String,
    pub category: String,
    pub brand: String,
    pub availability: Availability,
    pub pricing: Pricing,
    pub blocked: bool,
    pub block_reason: Option<String>,
}

impl CatalogItem {
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_sku(mut self, sku: impl Into<String>) -> Self {
        self.sku = sku.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_pricing(mut self, pricing: Pricing) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_blocked(mut self, reason: Option<String>) -> Self {
        self.blocked = true;
        self.block_reason = reason;
        self
    }

    /// The text a host shows in the input once this item is the committed selection.
    pub fn label(&self) -> String {
        if self.sku.is_empty() {
            return self.name.clone();
        }
        alloc::format!("{} - {}", self.sku, self.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchFilters {
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    /// Local-only threshold; applied by the filter pipeline, never sent to the provider.
    pub min_available: Option<u32>,
}

impl SearchFilters {
    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_min_available(mut self, min_available: u32) -> Self {
        self.min_available = Some(min_available);
        self
    }
}

/// A query issued to the provider. `sequence` is assigned at issue time and is strictly
/// increasing per session.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchQuery {
    pub term: String,
    pub filters: SearchFilters,
    pub sequence: u64,
}

impl SearchQuery {
    pub fn key(&self, limit: usize) -> QueryKey {
        QueryKey::new(&self.term, &self.filters, limit)
    }
}

/// Cache identity of a query: normalized term plus every parameter that reaches the provider.
///
/// The sequence number is never part of the key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryKey {
    pub term: String,
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    pub limit: usize,
}

impl QueryKey {
    pub fn new(term: &str, filters: &SearchFilters, limit: usize) -> Self {
        Self {
            term: normalize_term(term),
            location_id: filters.location_id.clone(),
            category_id: filters.category_id.clone(),
            limit,
        }
    }
}

/// Trims the term and collapses inner whitespace runs to a single space.
pub fn normalize_term(term: &str) -> String {
    term.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchResult {
    pub items: Vec<Arc<CatalogItem>>,
    pub total: usize,
    pub has_more: bool,
    /// Copied from the query this result answers.
    pub sequence: u64,
}

impl SearchResult {
    pub fn new(items: Vec<Arc<CatalogItem>>, total: usize, has_more: bool, sequence: u64) -> Self {
        Self {
            items,
            total,
            has_more,
            sequence,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.iter().any(|it| &it.id == id)
    }

    /// `false` when `total` undercounts the page or ids repeat.
    pub fn is_well_formed(&self) -> bool {
        if self.total < self.items.len() {
            return false;
        }
        let mut seen = BTreeSet::new();
        self.items.iter().all(|it| seen.insert(&it.id))
    }
}
