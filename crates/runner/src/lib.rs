//! Agora Runner - Market Simulation Orchestrator
//!
//! Builds a world from a configuration and steps it period by period:
//!
//! - **Config**: run parameters, presets and JSON loading
//! - **World**: population, pricing mechanism, dividend process, history
//! - **Executor**: the per-period state machine
//! - **Statistics**: per-period reports, run summary, rule and bit dumps
//!
//! ## Architecture
//!
//! ```text
//!          ┌──────────────────┐
//!          │ Dividend Process │  (classic)
//!          └────────┬─────────┘
//!                   │ d
//!                   ▼
//!          ┌──────────────────┐
//!          │  Market History  │──── state words
//!          └────────┬─────────┘          │
//!                   │                    ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                        AGENTS                           │
//! │   GA (when due) ──▶ rule choice ──▶ demand / orders     │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │
//!               ┌────────────┴────────────┐
//!               ▼                         ▼
//!     ┌───────────────────┐     ┌───────────────────┐
//!     │    Specialist     │     │   LMSR Market     │
//!     │   (tâtonnement)   │     │     Maker         │
//!     └───────────────────┘     └───────────────────┘
//! ```

pub mod config;
pub mod dividend;
pub mod error;
pub mod executor;
pub mod history;
pub mod statistics;
pub mod world;

// Re-export main types
pub use config::{AgentGroup, Shock, SimulationConfig};
pub use dividend::{DividendKind, DividendParams, DividendProcess};
pub use error::{Result, RunnerError};
pub use executor::{PeriodExecutor, PeriodPhase};
pub use history::{MarketHistory, RollingMean};
pub use statistics::{
    AgentBitRecord, BitUsageReport, KindWealth, PeriodReport, RuleRecord, RunSummary,
};
pub use world::{Market, World};
