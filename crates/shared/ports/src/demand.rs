/// Market conditions an agent prices its order against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub trial_price: f64,
    pub dividend: f64,
    pub interest_rate: f64,
}

/// Desired trade at a trial price and its sensitivity to that price
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Demand {
    /// Positive = bid, negative = offer
    pub quantity: f64,
    /// d quantity / d price
    pub slope: f64,
}

/// Port for a participant in the tâtonnement auction
///
/// The specialist calls this once per participant per trial price.
pub trait DemandSchedule {
    fn demand_at(&mut self, quote: &Quote) -> Demand;
}
