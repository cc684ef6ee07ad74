//! Catalog content port.

use async_trait::async_trait;

use super::error::CatalogSourceError;
use crate::infrastructure::catalog::CatalogBundle;

/// Supplies raw catalog records. Called once at startup; the engine
/// validates and indexes the bundle itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human-readable origin, for logs
    fn describe(&self) -> String;

    async fn load(&self) -> Result<CatalogBundle, CatalogSourceError>;
}
