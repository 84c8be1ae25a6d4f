use agora_ports::PriceSearch;
use serde::{Deserialize, Serialize};

/// Newton step on aggregate demand: `p - imbalance / slope_total`
///
/// Falls back to an eta step when the slopes sum to zero, which happens when
/// every participant is pinned at a demand limit.
#[derive(Debug, Clone, Copy)]
pub struct SlopeSearch {
    fallback: EtaSearch,
}

impl SlopeSearch {
    pub fn new(eta: f64) -> Self {
        Self {
            fallback: EtaSearch::new(eta),
        }
    }
}

impl PriceSearch for SlopeSearch {
    fn next_price(&self, trial_price: f64, imbalance: f64, slope_total: f64) -> f64 {
        let next = trial_price - imbalance / slope_total;
        if slope_total == 0.0 || !next.is_finite() {
            self.fallback.next_price(trial_price, imbalance, slope_total)
        } else {
            next
        }
    }

    fn name(&self) -> &str {
        "Slope"
    }
}

/// Proportional step: `p (1 + eta * imbalance)`
#[derive(Debug, Clone, Copy)]
pub struct EtaSearch {
    eta: f64,
}

impl EtaSearch {
    pub fn new(eta: f64) -> Self {
        Self { eta }
    }
}

impl PriceSearch for EtaSearch {
    fn next_price(&self, trial_price: f64, imbalance: f64, _slope_total: f64) -> f64 {
        trial_price * (1.0 + self.eta * imbalance)
    }

    fn name(&self) -> &str {
        "Eta"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    #[default]
    Slope,
    Eta,
}

/// Factory function to create price searches by kind
pub fn create_price_search(kind: SearchKind, eta: f64) -> Box<dyn PriceSearch> {
    match kind {
        SearchKind::Slope => Box::new(SlopeSearch::new(eta)),
        SearchKind::Eta => Box::new(EtaSearch::new(eta)),
    }
}
