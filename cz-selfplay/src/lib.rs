//! cz-selfplay: the outer loop. Alternates one self-play episode with a
//! minibatch of gradient steps from a bounded sliding example buffer.

mod driver;

#[cfg(test)]
mod driver_tests;

pub use driver::{Driver, DriverConfig, Example, IterationSummary};
