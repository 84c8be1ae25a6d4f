//! Agora Specialist
//!
//! Price formation. Two mutually exclusive mechanisms:
//! - [`Specialist`]: tâtonnement search for the price that balances the
//!   agents' demand schedules (classic stock market)
//! - [`LmsrMarketMaker`]: sequential trades against a logarithmic market
//!   scoring rule (binary contingent claims)

mod lmsr;
mod search;
mod specialist;

pub use lmsr::{LmsrMarketMaker, LmsrParams, cost, first_price, positive_price};
pub use search::{EtaSearch, SearchKind, SlopeSearch, create_price_search};
pub use specialist::{ClearingOutcome, Specialist, SpecialistParams};

// Re-export the ports for convenience
pub use agora_ports::{Demand, DemandSchedule, PriceSearch, Quote};
