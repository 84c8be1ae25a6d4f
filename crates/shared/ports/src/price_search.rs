use std::fmt;

/// Port for the specialist's price-adjustment step
///
/// Implementations:
/// - Slope: Newton step on aggregate demand slope
/// - Eta: proportional step on the imbalance
pub trait PriceSearch: Send + Sync + fmt::Debug {
    /// Next trial price, before clipping to the price bounds
    fn next_price(&self, trial_price: f64, imbalance: f64, slope_total: f64) -> f64;

    /// Name of the search
    fn name(&self) -> &str;
}
