use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use lumora_schema::Product;
use tracing::info;

/// Immutable catalog snapshot, loaded once at startup and shared by
/// reference for the process lifetime.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    products: Arc<[Product]>,
}

impl CatalogStore {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: products.into(),
        }
    }

    /// An empty catalog. Queries against it degrade to empty results.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Load the extraction pipeline's `catalog.json`. Field-level junk is
    /// tolerated by the `Product` deserializer; only I/O failures and a
    /// broken top-level document are errors.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let products: Vec<Product> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse catalog file {}", path.display()))?;
        info!(count = products.len(), path = %path.display(), "catalog loaded");
        Ok(Self::new(products))
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
