//! Content source implementations.
//!
//! Concrete types that satisfy the `CatalogSource` port.

pub mod json;

pub use json::JsonCatalogSource;
