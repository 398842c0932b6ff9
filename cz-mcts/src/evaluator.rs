//! The seam between the search and whatever estimates priors and values.

use cz_core::{NUM_ACTIONS, STATE_FEATURES};
use cz_net::Mlp;
use rand::Rng;

/// Policy/value estimate for an encoded state. The policy must be a
/// distribution over the fixed action space; the value lies in (0, 1).
pub trait Evaluator {
    fn evaluate(&mut self, features: &[f64; STATE_FEATURES]) -> ([f64; NUM_ACTIONS], f64);
}

impl Evaluator for Mlp {
    fn evaluate(&mut self, features: &[f64; STATE_FEATURES]) -> ([f64; NUM_ACTIONS], f64) {
        let (policy, value) = self.forward(features);
        assert_eq!(policy.len(), NUM_ACTIONS, "network policy head size mismatch");
        let mut out = [0.0f64; NUM_ACTIONS];
        out.copy_from_slice(policy);
        (out, value)
    }
}

/// Build the canonical network for this game: state features in, two hidden
/// layers of twice the action count, policy-plus-value head out.
pub fn default_net(rng: &mut impl Rng) -> Mlp {
    Mlp::new(
        STATE_FEATURES,
        &[2 * NUM_ACTIONS, 2 * NUM_ACTIONS],
        NUM_ACTIONS,
        rng,
    )
}

/// Uniform policy and a mid-scale value; search-behavior baseline for tests.
pub struct UniformEvaluator;

impl Evaluator for UniformEvaluator {
    fn evaluate(&mut self, _features: &[f64; STATE_FEATURES]) -> ([f64; NUM_ACTIONS], f64) {
        ([1.0 / NUM_ACTIONS as f64; NUM_ACTIONS], 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cz_core::{CraftParams, State};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn default_net_matches_the_game_shape() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut net = default_net(&mut rng);
        assert_eq!(net.input_len(), STATE_FEATURES);
        assert_eq!(net.policy_len(), NUM_ACTIONS);

        let params = CraftParams::default();
        let s = State::new(&params);
        let (policy, value) = net.evaluate(&s.features());
        let sum: f64 = policy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(value > 0.0 && value < 1.0);
    }
}
