//! Market modes and agent kinds

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pricing mechanism, fixed for a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketMode {
    /// Dividend-paying stock cleared by a tâtonnement specialist
    #[default]
    Classic,
    /// Binary contingent claims priced by a logarithmic market scoring rule
    Lmsr,
}

/// Agent flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Fixed-probability bit mutation
    Sfi,
    /// Usage-neutral bit mutation
    Nesfi,
    /// Learns on a fixed, short GA interval
    Fast,
    /// Trades contingent claims against the market maker
    Lmsr,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Sfi,
        AgentKind::Nesfi,
        AgentKind::Fast,
        AgentKind::Lmsr,
    ];

    /// Market the kind can trade in
    pub fn market(self) -> MarketMode {
        match self {
            AgentKind::Lmsr => MarketMode::Lmsr,
            _ => MarketMode::Classic,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Sfi => "sfi",
            AgentKind::Nesfi => "nesfi",
            AgentKind::Fast => "fast",
            AgentKind::Lmsr => "lmsr",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of a binary contingent claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSide {
    /// Pays one unit if the event happens
    Positive,
    /// Pays one unit if it does not
    Negative,
}

impl ClaimSide {
    pub fn opposite(self) -> Self {
        match self {
            ClaimSide::Positive => ClaimSide::Negative,
            ClaimSide::Negative => ClaimSide::Positive,
        }
    }
}
