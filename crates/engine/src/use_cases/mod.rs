//! Use cases - character progression orchestration.
//!
//! Each module is one engine surface. All of them read the shared
//! [`ContentCatalog`](crate::infrastructure::catalog::ContentCatalog) and
//! never mutate it.

pub mod aggregation;
pub mod availability;
pub mod reachability;
pub mod selections;

pub use aggregation::{AggregationError, EffectAggregator};
pub use availability::{
    AvailabilityResolver, AvailableChoice, AvailableChoices, ChoiceOption, ChoiceState,
};
pub use reachability::{MissingRecord, Reachability};
pub use selections::SelectionUseCases;
