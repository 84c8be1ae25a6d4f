//! Agora Ports
//!
//! Port definitions (traits) for the Agora market simulator.
//! These define the boundaries between the learning, trading and pricing
//! contexts.

mod demand;
mod dialect;
mod price_search;

pub use demand::{Demand, DemandSchedule, Quote};
pub use dialect::{BitUsage, RuleDialect};
pub use price_search::PriceSearch;
