//! Charforge Engine library.
//!
//! Resolves what a character has, what it may still choose, and what its
//! choices add up to, against a read-only content catalog.
//!
//! ## Structure
//!
//! - `use_cases/` - Reachability, selections, availability and aggregation
//! - `infrastructure/` - Catalog, content sources, ports, cache, settings
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Test fixtures module for integration testing.
#[cfg(test)]
pub mod test_fixtures;

/// End-to-end progression scenarios against the sample catalog.
#[cfg(test)]
mod e2e_tests;

pub use app::App;
