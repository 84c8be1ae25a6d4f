//! Agora Core Domain
//!
//! Pure domain types for the Agora market simulator.
//! This crate contains no I/O and is 100% unit testable.

pub mod bits;
pub mod context;
pub mod error;
pub mod kinds;
pub mod market_state;
pub mod rng;

// Re-export commonly used types at crate root
pub use bits::{BitCondition, MAX_TRITS, Trit, Word, count_set, get_trit, matches, set_trit};
pub use context::SimulationContext;
pub use error::{ConfigError, ConfigResult, check_positive, check_probability};
pub use kinds::{AgentKind, ClaimSide, MarketMode};
pub use market_state::{
    FUNDAMENTAL_BITS, Indicators, LADDERS, Ladder, MA_WINDOWS, MarketState, TECHNICAL_BITS,
    bit_name, bits_in,
};
pub use rng::{SimRng, chance, seeded, standard_normal};

/// Bound on retry loops (tournament picks, tâtonnement rounds)
pub const MAX_ITERATIONS: usize = 10;
