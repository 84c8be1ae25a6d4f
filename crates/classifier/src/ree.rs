//! Rational-expectations benchmark
//!
//! Under an AR(1) dividend `d' = mean + rho (d - mean) + e`, with homogeneous
//! CARA agents, the equilibrium price is linear in the dividend:
//!
//! ```text
//! p = f d + g
//! f = rho / (1 + r - rho)
//! g = ((1 + f)(1 - rho) mean - lambda (1 + f)^2 sigma^2) / r
//! ```
//!
//! The forecast `E[p' + d'] = a (p + d) + b` consistent with that price seeds
//! freshly created rules.

use serde::{Deserialize, Serialize};

/// Forecast coefficients and variance a fresh rule is drawn around
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceCoefficients {
    pub a: f64,
    pub b: f64,
    pub variance: f64,
}

impl ReferenceCoefficients {
    /// `E[x'] = x`, used when forecasting a probability
    pub fn neutral(variance: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            variance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RationalExpectations {
    pub f: f64,
    pub g: f64,
    rho: f64,
    mean: f64,
    noise_variance: f64,
}

impl RationalExpectations {
    pub fn new(
        interest_rate: f64,
        rho: f64,
        mean: f64,
        noise_variance: f64,
        risk_aversion: f64,
    ) -> Self {
        let denominator = 1.0 + interest_rate - rho;
        let f = if denominator == 0.0 { 0.0 } else { rho / denominator };
        let scale = (1.0 + f) * (1.0 + f);
        let g = if interest_rate == 0.0 {
            0.0
        } else {
            ((1.0 + f) * (1.0 - rho) * mean - risk_aversion * scale * noise_variance)
                / interest_rate
        };
        Self {
            f,
            g,
            rho,
            mean,
            noise_variance,
        }
    }

    /// Equilibrium price for a dividend
    pub fn price(&self, dividend: f64) -> f64 {
        self.f * dividend + self.g
    }

    pub fn coefficients(&self) -> ReferenceCoefficients {
        let one_f = 1.0 + self.f;
        ReferenceCoefficients {
            a: self.rho,
            b: (1.0 - self.rho) * (one_f * self.mean + self.g),
            variance: one_f * one_f * self.noise_variance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn classic() -> RationalExpectations {
        RationalExpectations::new(0.1, 0.95, 10.0, 0.0743, 0.5)
    }

    #[test]
    fn test_classic_coefficients() {
        let ree = classic();
        assert_relative_eq!(ree.f, 0.95 / 0.15, epsilon = 1e-12);

        let coeffs = ree.coefficients();
        assert_relative_eq!(coeffs.a, 0.95);
        assert_relative_eq!(coeffs.b, 4.5, epsilon = 0.01);
        assert_relative_eq!(coeffs.variance, 4.0, epsilon = 0.01);
    }

    #[test]
    fn test_forecast_is_self_consistent() {
        // a (p + d) + b must equal (1+f) E[d'] + g for the equilibrium price
        let ree = classic();
        let coeffs = ree.coefficients();
        let d = 10.7;
        let p = ree.price(d);
        let expected_next = 10.0 + 0.95 * (d - 10.0);

        assert_relative_eq!(
            coeffs.a * (p + d) + coeffs.b,
            (1.0 + ree.f) * expected_next + ree.g,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_denominators() {
        let ree = RationalExpectations::new(0.0, 1.0, 10.0, 0.1, 0.5);
        assert_eq!(ree.f, 0.0);
        assert_eq!(ree.g, 0.0);
    }
}
