//! Target-agnostic analysis and optimization passes.

mod cancellation;
mod commutation;
mod fixed_point;

#[cfg(test)]
mod tests;

pub use cancellation::GateCancellation;
pub use commutation::{CommutationAnalysis, CommutationSet};
pub use fixed_point::{DagFixedPoint, FixedPoint, fixed_point_reached};
