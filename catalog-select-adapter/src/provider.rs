use std::sync::Arc;

use async_trait::async_trait;
use catalog_select::{CatalogItem, QueryKey};

use crate::ProviderError;

/// Parameters sent to the provider for one query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProviderRequest {
    pub term: String,
    pub location_id: Option<String>,
    pub category_id: Option<String>,
    pub limit: usize,
}

impl From<&QueryKey> for ProviderRequest {
    fn from(key: &QueryKey) -> Self {
        Self {
            term: key.term.clone(),
            location_id: key.location_id.clone(),
            category_id: key.category_id.clone(),
            limit: key.limit,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProviderResponse {
    pub items: Vec<Arc<CatalogItem>>,
    pub total: usize,
    pub has_more: bool,
}

impl ProviderResponse {
    pub fn new(items: Vec<CatalogItem>, total: usize, has_more: bool) -> Self {
        Self {
            items: items.into_iter().map(Arc::new).collect(),
            total,
            has_more,
        }
    }
}

/// The remote catalog the picker searches.
///
/// Implementations must be idempotent for identical requests (modulo catalog changes) and safe
/// to call concurrently: the picker may have several requests in flight and does not assume
/// they resolve in order.
#[async_trait]
pub trait CatalogSearchProvider: Send + Sync {
    async fn search(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}

#[async_trait]
impl<P: CatalogSearchProvider + ?Sized> CatalogSearchProvider for Arc<P> {
    async fn search(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        (**self).search(request).await
    }
}
