/*
 * Episim
 * Copyright (c) 2026  The Episim Developers
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, Poisson};

/// Per-worker random stream. Each worker seeds its own wrapper once, so no
/// cross-worker RNG state is ever exchanged.
pub struct RandomWrapper {
    rng: StdRng,
}

impl RandomWrapper {
    pub fn new() -> RandomWrapper {
        RandomWrapper { rng: StdRng::from_entropy() }
    }

    pub fn seeded(seed: u64) -> RandomWrapper {
        RandomWrapper { rng: StdRng::seed_from_u64(seed) }
    }

    pub fn get(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Bernoulli draw with the probability clamped into [0, 1].
    pub fn chance(&mut self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.gen_bool(probability)
    }

    /// Uniform integer in [0, high). `high` must be positive.
    pub fn below(&mut self, high: usize) -> usize {
        self.rng.gen_range(0..high)
    }

    pub fn poisson(&mut self, lambda: f64) -> f64 {
        if lambda <= 0.0 {
            return 0.0;
        }
        Poisson::new(lambda).expect("poisson lambda must be positive").sample(&mut self.rng)
    }

    pub fn gamma(&mut self, shape: f64, scale: f64) -> f64 {
        if shape <= 0.0 || scale <= 0.0 {
            return 0.0;
        }
        Gamma::new(shape, scale).expect("gamma parameters must be positive").sample(&mut self.rng)
    }
}

impl Default for RandomWrapper {
    fn default() -> Self {
        RandomWrapper::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_clamp_probabilities() {
        let mut rng = RandomWrapper::seeded(1);
        assert!(!rng.chance(0.0));
        assert!(!rng.chance(-0.5));
        assert!(rng.chance(1.0));
        assert!(rng.chance(7.3));
    }

    #[test]
    fn should_reproduce_streams_for_equal_seeds() {
        let mut a = RandomWrapper::seeded(42);
        let mut b = RandomWrapper::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.below(1000), b.below(1000));
        }
    }

    #[test]
    fn should_degenerate_to_zero_for_non_positive_parameters() {
        let mut rng = RandomWrapper::seeded(3);
        assert_eq!(rng.poisson(0.0), 0.0);
        assert_eq!(rng.poisson(-2.0), 0.0);
        assert_eq!(rng.gamma(0.0, 20.0), 0.0);
    }

    #[test]
    fn should_sample_poisson_around_the_mean() {
        let mut rng = RandomWrapper::seeded(7);
        let n = 5000;
        let total: f64 = (0..n).map(|_| rng.poisson(6.0)).sum();
        let mean = total / n as f64;
        assert!((mean - 6.0).abs() < 0.2, "mean was {}", mean);
    }
}
