//! Built-in compilation passes.

pub mod agnostic;
pub mod target;

pub use agnostic::{
    CommutationAnalysis, CommutationSet, DagFixedPoint, FixedPoint, GateCancellation,
    fixed_point_reached,
};
pub use target::{AsapSchedule, Schedule, StochasticRouting, TrivialLayout};
