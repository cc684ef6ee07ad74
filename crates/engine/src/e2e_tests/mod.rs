//! End-to-end progression tests.
//!
//! Each test builds a complete [`App`](crate::App) over the sample catalog in
//! `test_data/catalog/sample.json` and drives a character through selection
//! edits, level changes and derivations.
//!
//! ```bash
//! cargo test -p charforge-engine --lib e2e_tests
//! ```

mod e2e_helpers;
mod progression_tests;

pub use e2e_helpers::*;
