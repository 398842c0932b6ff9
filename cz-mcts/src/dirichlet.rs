//! Fixed-dimension Dirichlet noise over the action space, sampled as
//! normalized gamma deviates.

use cz_core::NUM_ACTIONS;
use rand::Rng;
use rand_distr::{Distribution, Gamma};

pub struct DirichletNoise {
    gamma: Gamma<f64>,
}

impl DirichletNoise {
    /// # Panics
    /// Panics if `concentration` is not positive and finite.
    pub fn new(concentration: f64) -> DirichletNoise {
        DirichletNoise {
            gamma: Gamma::new(concentration, 1.0).expect("concentration must be > 0"),
        }
    }

    pub fn sample(&self, rng: &mut impl Rng) -> [f64; NUM_ACTIONS] {
        let mut x = [0.0f64; NUM_ACTIONS];
        let mut sum = 0.0;
        for v in &mut x {
            *v = self.gamma.sample(rng);
            sum += *v;
        }
        let inv = 1.0 / sum;
        for v in &mut x {
            *v *= inv;
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn samples_are_distributions() {
        let noise = DirichletNoise::new(1.03);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..100 {
            let x = noise.sample(&mut rng);
            let sum: f64 = x.iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "sum = {}", sum);
            assert!(x.iter().all(|&v| v >= 0.0));
        }
    }

    #[test]
    fn consecutive_samples_differ() {
        let noise = DirichletNoise::new(1.03);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let a = noise.sample(&mut rng);
        let b = noise.sample(&mut rng);
        assert_ne!(a, b);
    }
}
