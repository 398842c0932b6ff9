//! Crafting condition and its turn-to-turn Markov dynamics.
//!
//! Canonical transition matrix:
//!
//! - Normal    => Normal (0.75) | Good (0.25)
//! - Good      => Normal
//! - Excellent => Poor
//! - Poor      => Normal
//!
//! Excellent is never sampled from Normal: the transition probability is not
//! reliably known, so the sampler omits it. The checker still accepts
//! Normal => Excellent for externally injected transitions.

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Condition {
    Normal,
    Good,
    Excellent,
    Poor,
}

impl Condition {
    /// Sample the next condition from the canonical matrix.
    pub fn sample_next(self, rng: &mut impl Rng) -> Condition {
        match self {
            Condition::Normal => {
                if rng.gen::<f64>() > 0.75 {
                    Condition::Good
                } else {
                    Condition::Normal
                }
            }
            Condition::Good => Condition::Normal,
            Condition::Excellent => Condition::Poor,
            Condition::Poor => Condition::Normal,
        }
    }

    /// The deterministic transition used by validity probes, where the
    /// resulting condition does not matter. Every source has at least this
    /// one legal successor.
    pub fn canonical_next(self) -> Condition {
        match self {
            Condition::Normal => Condition::Normal,
            Condition::Good => Condition::Normal,
            Condition::Excellent => Condition::Poor,
            Condition::Poor => Condition::Normal,
        }
    }

    /// Whether `next` is reachable from `self` in one turn. Normal may not
    /// drop to Poor; every non-Normal source transitions deterministically.
    pub fn allows_transition(self, next: Condition) -> bool {
        match self {
            Condition::Normal => next != Condition::Poor,
            Condition::Good => next == Condition::Normal,
            Condition::Excellent => next == Condition::Poor,
            Condition::Poor => next == Condition::Normal,
        }
    }

    /// Quality multiplier applied to actions executed under this condition.
    pub fn quality_factor(self) -> f64 {
        match self {
            Condition::Normal => 1.0,
            Condition::Good => 1.5,
            Condition::Excellent => 4.0,
            Condition::Poor => 0.5,
        }
    }
}
