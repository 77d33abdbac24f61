//! Fixed-point detection for optimization loops.

use tangle_ir::DagCircuit;

use crate::error::CompileResult;
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Fixed-point state published by [`DagFixedPoint`].
#[derive(Debug, Clone, Default)]
pub struct FixedPoint {
    /// Fingerprint observed on the previous visit.
    previous: Option<(usize, usize)>,
    /// Whether the DAG was unchanged since the previous visit.
    pub reached: bool,
}

/// Analysis pass recording whether the DAG stopped changing.
///
/// The fingerprint is (operation count, depth): the optimization passes in
/// the do-while loop strictly reduce the operation count whenever they
/// change anything, so an unchanged fingerprint means an unchanged DAG.
pub struct DagFixedPoint;

impl Pass for DagFixedPoint {
    fn name(&self) -> &'static str {
        "DagFixedPoint"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut DagCircuit, properties: &mut PropertySet) -> CompileResult<()> {
        let fingerprint = (dag.num_ops(), dag.depth());

        if properties.get::<FixedPoint>().is_none() {
            properties.insert(FixedPoint::default());
        }
        let state = properties
            .get_mut::<FixedPoint>()
            .expect("fixed point state was just inserted");
        state.reached = state.previous == Some(fingerprint);
        state.previous = Some(fingerprint);
        Ok(())
    }
}

/// Whether the last [`DagFixedPoint`] visit saw an unchanged DAG.
///
/// Used as the termination predicate for optimization do-while groups.
pub fn fixed_point_reached(properties: &PropertySet) -> bool {
    properties.get::<FixedPoint>().is_some_and(|s| s.reached)
}
