//! Simulation context
//!
//! Counters that would otherwise be process-wide. One context per World, so
//! independent simulations can run side by side.

use crate::kinds::AgentKind;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationContext {
    next_rule_id: u64,
    traders: BTreeMap<AgentKind, usize>,
    /// Times any agent fell back to average selection
    pub average_fallbacks: u64,
    /// GA invocations across the population
    pub ga_invocations: u64,
}

impl SimulationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh rule identifier
    pub fn next_rule_id(&mut self) -> u64 {
        let id = self.next_rule_id;
        self.next_rule_id += 1;
        id
    }

    pub fn register_trader(&mut self, kind: AgentKind) {
        *self.traders.entry(kind).or_insert(0) += 1;
    }

    pub fn trader_count(&self, kind: AgentKind) -> usize {
        self.traders.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_traders(&self) -> usize {
        self.traders.values().sum()
    }
}
