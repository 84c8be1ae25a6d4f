//! The shared random source
//!
//! Dividend noise, perception noise and the GA all draw from one seeded
//! generator so that a run is reproducible from its seed.

use rand::Rng;
use rand::SeedableRng;
use rand_distr::StandardNormal;

pub type SimRng = rand::rngs::StdRng;

pub fn seeded(seed: u64) -> SimRng {
    SimRng::seed_from_u64(seed)
}

/// One draw from N(0, 1)
#[inline]
pub fn standard_normal(rng: &mut SimRng) -> f64 {
    rng.sample(StandardNormal)
}

/// Bernoulli draw that tolerates probabilities outside [0, 1]
#[inline]
pub fn chance(rng: &mut SimRng, probability: f64) -> bool {
    if probability <= 0.0 {
        false
    } else if probability >= 1.0 {
        true
    } else {
        rng.gen_bool(probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = seeded(7);
        let mut b = seeded(7);
        for _ in 0..10 {
            assert_eq!(standard_normal(&mut a), standard_normal(&mut b));
        }
    }

    #[test]
    fn test_chance_edges() {
        let mut rng = seeded(1);
        assert!(!chance(&mut rng, 0.0));
        assert!(!chance(&mut rng, -1.0));
        assert!(chance(&mut rng, 1.0));
        assert!(chance(&mut rng, 2.0));
    }
}
