//! cz-core: crafting rules, action catalogue, craft parameters, and the
//! `State` simulator.

pub mod action;
pub mod condition;
pub mod config;
pub mod state;


pub use action::{Action, ActionRow, Buff, ACTION_TABLE, NUM_ACTIONS, NUM_BUFFS};
pub use condition::Condition;
pub use config::{ConfigError, CraftParams};
pub use state::{State, StateKey, STATE_FEATURES};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }
}
