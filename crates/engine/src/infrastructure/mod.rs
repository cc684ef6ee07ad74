//! Infrastructure implementations.
//!
//! Contains the content catalog, port trait implementations and
//! process-level concerns (clock, configuration, caching).

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod content_sources;
pub mod ports;
pub mod settings;
