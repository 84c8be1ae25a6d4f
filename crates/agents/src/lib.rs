//! Agora Agents
//!
//! Boundedly rational traders. Every agent forecasts with its own classifier
//! rule set and trades either a dividend-paying stock through the specialist
//! or binary contingent claims against the market maker.
//!
//! ## Flavours
//!
//! | Kind    | Dialect      | GA schedule                |
//! |---------|--------------|----------------------------|
//! | `sfi`   | SFI          | probability `ga_prob`      |
//! | `nesfi` | NESFI        | probability `ga_prob`      |
//! | `fast`  | configurable | every `fast_interval`      |
//! | `lmsr`  | configurable | probability `ga_prob`      |

mod agent;
mod claims;
mod demand;
mod params;
mod strategy;

pub use agent::{Agent, Belief, BeliefSource, Holdings};
pub use claims::ClaimOrder;
pub use params::{AgentParams, SelectionMethod};
pub use strategy::{
    FastLearner, LearningStrategy, LmsrLearner, NesfiLearner, SfiLearner, create_strategy,
};
