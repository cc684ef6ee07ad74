//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - Catalog content (could swap JSON bundles -> a content service)
//! - Clock (for testing)

mod catalog;
mod error;
mod testing;

pub use catalog::CatalogSource;
pub use error::CatalogSourceError;
pub use testing::ClockPort;

#[cfg(test)]
pub use catalog::MockCatalogSource;
#[cfg(test)]
pub use testing::MockClockPort;
