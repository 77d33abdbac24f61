//! Pass manager for orchestrating compilation.

use rustc_hash::FxHashSet;
use tracing::{debug, info, instrument, warn};

use tangle_ir::DagCircuit;

use crate::error::CompileResult;
use crate::pass::{Pass, PassId, PassKind};
use crate::passes::{
    AsapSchedule, CommutationAnalysis, DagFixedPoint, GateCancellation, StochasticRouting,
    TrivialLayout, fixed_point_reached,
};
use crate::property::{BasisGates, CouplingMap, PropertySet};

/// Default cap on do-while loop iterations.
const DEFAULT_MAX_ITERATION: usize = 10;

/// Predicate over the property set deciding when a do-while group is done.
type DonePredicate = Box<dyn Fn(&PropertySet) -> bool + Send + Sync>;

/// One scheduled unit: a linear run of passes, or a bounded loop.
enum PassGroup {
    /// Passes run once, in order.
    Linear(Vec<Box<dyn Pass>>),
    /// Passes repeated until the predicate holds or the iteration cap is
    /// reached. Exhausting the cap is best effort, not an error.
    DoWhile {
        passes: Vec<Box<dyn Pass>>,
        done: DonePredicate,
        max_iteration: usize,
    },
}

/// Manages and executes a sequence of compilation passes.
///
/// One manager owns one DAG and one property set for the duration of a
/// `run` call. Before each pass, unsatisfied `requires` entries are run
/// first; a valid-pass set tracks which results survive across
/// transformations via their `preserves` declarations.
pub struct PassManager {
    /// The scheduled pass groups, in order.
    groups: Vec<PassGroup>,
}

impl PassManager {
    /// Create a new empty pass manager.
    pub fn new() -> Self {
        Self { groups: vec![] }
    }

    /// Append a single pass.
    pub fn add_pass(&mut self, pass: impl Pass + 'static) {
        self.groups.push(PassGroup::Linear(vec![Box::new(pass)]));
    }

    /// Append a do-while group: the passes repeat until `done` holds on
    /// the property set, bounded by `max_iteration`.
    pub fn add_do_while(
        &mut self,
        passes: Vec<Box<dyn Pass>>,
        done: impl Fn(&PropertySet) -> bool + Send + Sync + 'static,
        max_iteration: usize,
    ) {
        self.groups.push(PassGroup::DoWhile {
            passes,
            done: Box::new(done),
            max_iteration: max_iteration.max(1),
        });
    }

    /// Run all scheduled passes on the given DAG.
    ///
    /// Any pass error aborts the run; the caller decides how a failed
    /// circuit affects the rest of its batch.
    #[instrument(skip_all)]
    pub fn run(&self, dag: &mut DagCircuit, properties: &mut PropertySet) -> CompileResult<()> {
        info!(
            passes = self.len(),
            qubits = dag.num_qubits(),
            "running pass manager"
        );

        let mut valid: FxHashSet<PassId> = FxHashSet::default();

        for group in &self.groups {
            match group {
                PassGroup::Linear(passes) => {
                    for pass in passes {
                        self.do_pass(pass.as_ref(), dag, properties, &mut valid)?;
                    }
                }
                PassGroup::DoWhile {
                    passes,
                    done,
                    max_iteration,
                } => {
                    let mut finished = false;
                    for iteration in 0..*max_iteration {
                        for pass in passes {
                            self.do_pass(pass.as_ref(), dag, properties, &mut valid)?;
                        }
                        if done(properties) {
                            debug!(iteration, "do-while group converged");
                            finished = true;
                            break;
                        }
                    }
                    if !finished {
                        warn!(
                            max_iteration,
                            "do-while group hit its iteration cap; keeping best effort result"
                        );
                    }
                }
            }
        }

        info!(ops = dag.num_ops(), depth = dag.depth(), "pass manager completed");
        Ok(())
    }

    fn do_pass(
        &self,
        pass: &dyn Pass,
        dag: &mut DagCircuit,
        properties: &mut PropertySet,
        valid: &mut FxHashSet<PassId>,
    ) -> CompileResult<()> {
        // Satisfy requirements first; anything already valid is skipped.
        for required in pass.requires() {
            if !valid.contains(&required.id()) {
                self.do_pass(required.as_ref(), dag, properties, valid)?;
            }
        }

        let id = pass.id();
        if valid.contains(&id) {
            debug!(pass = %id, "skipping already-valid pass");
            return Ok(());
        }
        if !pass.should_run(dag, properties) {
            debug!(pass = %id, "pass declined to run");
            valid.insert(id);
            return Ok(());
        }

        debug!(pass = %id, "running pass");
        pass.run(dag, properties)?;
        debug!(pass = pass.name(), ops = dag.num_ops(), "pass completed");

        match pass.kind() {
            // Analysis passes leave the DAG alone, so every prior result
            // stays valid.
            PassKind::Analysis => {
                valid.insert(id);
            }
            // A transformation keeps only what it declares preserved —
            // including itself: a pass that does not preserve its own
            // result runs again on the next loop iteration.
            PassKind::Transformation => {
                let preserved: FxHashSet<PassId> = pass.preserves().into_iter().collect();
                valid.insert(id);
                valid.retain(|p| preserved.contains(p));
            }
        }
        Ok(())
    }

    /// Get the number of scheduled passes.
    pub fn len(&self) -> usize {
        self.groups
            .iter()
            .map(|group| match group {
                PassGroup::Linear(passes) => passes.len(),
                PassGroup::DoWhile { passes, .. } => passes.len(),
            })
            .sum()
    }

    /// Check if the manager has no passes.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for creating pass managers with preset configurations.
pub struct PassManagerBuilder {
    /// Optimization level (0-3).
    optimization_level: u8,
    /// Routing trial count.
    routing_trials: usize,
    /// Routing RNG seed.
    seed: u64,
    /// Do-while iteration cap.
    max_iteration: usize,
    /// Target properties.
    properties: PropertySet,
}

impl PassManagerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            optimization_level: 1,
            routing_trials: 5,
            seed: 0,
            max_iteration: DEFAULT_MAX_ITERATION,
            properties: PropertySet::new(),
        }
    }

    /// Set the optimization level.
    ///
    /// - Level 0: no optimization, only required transformations
    /// - Level 1+: commutation-aware gate cancellation to a fixed point
    #[must_use]
    pub fn with_optimization_level(mut self, level: u8) -> Self {
        self.optimization_level = level.min(3);
        self
    }

    /// Set the routing trial count.
    #[must_use]
    pub fn with_routing_trials(mut self, trials: usize) -> Self {
        self.routing_trials = trials.max(1);
        self
    }

    /// Set the RNG seed for routing trials.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the do-while iteration cap.
    #[must_use]
    pub fn with_max_iteration(mut self, max_iteration: usize) -> Self {
        self.max_iteration = max_iteration.max(1);
        self
    }

    /// Set the target properties wholesale.
    #[must_use]
    pub fn with_properties(mut self, properties: PropertySet) -> Self {
        self.properties = properties;
        self
    }

    /// Set the target coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.properties.coupling_map = Some(coupling_map);
        self.properties.basis_gates = Some(basis_gates);
        self
    }

    /// Set the instruction duration table, enabling scheduling.
    #[must_use]
    pub fn with_durations(mut self, durations: crate::durations::InstructionDurations) -> Self {
        self.properties.durations = Some(durations);
        self
    }

    /// Build the pass manager and return it with the properties.
    pub fn build(self) -> (PassManager, PropertySet) {
        let mut pm = PassManager::new();

        // Layout and routing whenever a device is described.
        if self.properties.coupling_map.is_some() {
            pm.add_pass(TrivialLayout);
            pm.add_pass(StochasticRouting::new(self.routing_trials, self.seed));
        }

        // Commutation-aware cancellation, looped to a fixed point.
        if self.optimization_level >= 1 {
            pm.add_do_while(
                vec![
                    Box::new(CommutationAnalysis),
                    Box::new(GateCancellation),
                    Box::new(DagFixedPoint),
                ],
                fixed_point_reached,
                self.max_iteration,
            );
        }

        // Scheduling when a duration table is supplied.
        if self.properties.durations.is_some() {
            pm.add_pass(AsapSchedule);
        }

        (pm, self.properties)
    }
}

impl Default for PassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::PassKind;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tangle_ir::{Circuit, QubitId};

    #[test]
    fn test_empty_pass_manager() {
        let pm = PassManager::new();
        assert!(pm.is_empty());
        assert_eq!(pm.len(), 0);

        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();
        let mut props = PropertySet::new();
        pm.run(&mut dag, &mut props).unwrap();
        assert_eq!(dag.num_ops(), 2);
    }

    #[test]
    fn test_pass_manager_builder() {
        let (pm, props) = PassManagerBuilder::new()
            .with_optimization_level(2)
            .with_target(CouplingMap::linear(5), BasisGates::universal())
            .build();

        assert!(!pm.is_empty());
        assert!(props.coupling_map.is_some());
        assert!(props.basis_gates.is_some());
    }

    /// Counts how many times it runs; used to check valid-pass tracking.
    struct CountingAnalysis(&'static AtomicUsize);

    impl Pass for CountingAnalysis {
        fn name(&self) -> &'static str {
            "CountingAnalysis"
        }

        fn kind(&self) -> PassKind {
            PassKind::Analysis
        }

        fn run(&self, _dag: &mut DagCircuit, _props: &mut PropertySet) -> CompileResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Transformation declaring it preserves the counting analysis.
    struct PreservingTransform;

    impl Pass for PreservingTransform {
        fn name(&self) -> &'static str {
            "PreservingTransform"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn requires(&self) -> Vec<Box<dyn Pass>> {
            vec![Box::new(CountingAnalysis(&COUNTER))]
        }

        fn preserves(&self) -> Vec<PassId> {
            vec![PassId::new("CountingAnalysis")]
        }

        fn run(&self, _dag: &mut DagCircuit, _props: &mut PropertySet) -> CompileResult<()> {
            Ok(())
        }
    }

    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    static COUNTER_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_requires_runs_once_when_preserved() {
        let _guard = COUNTER_LOCK.lock().unwrap();
        COUNTER.store(0, Ordering::SeqCst);

        let mut pm = PassManager::new();
        pm.add_pass(PreservingTransform);
        pm.add_pass(PreservingTransform);

        let mut dag = Circuit::with_size("test", 1, 0).into_dag();
        let mut props = PropertySet::new();
        pm.run(&mut dag, &mut props).unwrap();

        // The second transform found the analysis still valid.
        assert_eq!(COUNTER.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_do_while_stops_at_cap() {
        let _guard = COUNTER_LOCK.lock().unwrap();
        COUNTER.store(0, Ordering::SeqCst);

        let mut pm = PassManager::new();
        pm.add_do_while(
            vec![Box::new(CountingAnalysis(&COUNTER))],
            |_| false,
            3,
        );

        let mut dag = Circuit::with_size("test", 1, 0).into_dag();
        let mut props = PropertySet::new();
        // Hitting the cap is best effort, not an error.
        pm.run(&mut dag, &mut props).unwrap();
        assert_eq!(COUNTER.load(Ordering::SeqCst), 1);
    }
}
