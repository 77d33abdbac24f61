//! ASAP scheduling.
//!
//! Assigns every operation an absolute start time — as soon as all of its
//! qubits are free — and makes idle time explicit with delay operations,
//! so the circuit can be emitted to a time-resolved execution target.

use rustc_hash::FxHashMap;

use tangle_ir::{DagCircuit, Instruction, NodeId, QubitId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Schedule produced by [`AsapSchedule`].
///
/// Start times are keyed by node id in the rewritten DAG. The total
/// duration is the time at which every qubit timeline ends.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Absolute start time per operation node.
    pub start_times: FxHashMap<NodeId, u64>,
    /// Total circuit duration.
    pub duration: u64,
    /// Time unit of every value, from the duration table.
    pub unit: String,
}

/// As-soon-as-possible scheduling pass.
///
/// Walks operations in topological order; each starts at the maximum
/// next-available time over its qubits. Idle gaps are padded with explicit
/// delays before the operation, and every qubit timeline is padded at the
/// end so all of them finish together. A missing duration entry is fatal.
pub struct AsapSchedule;

impl Pass for AsapSchedule {
    fn name(&self) -> &'static str {
        "AsapSchedule"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn run(&self, dag: &mut DagCircuit, properties: &mut PropertySet) -> CompileResult<()> {
        let durations = properties
            .durations
            .as_ref()
            .ok_or(CompileError::MissingDurations)?;
        let unit = durations.unit().to_string();

        let mut scheduled = dag.copy_empty();
        let mut available: FxHashMap<QubitId, u64> =
            dag.qubits().map(|q| (q, 0)).collect();
        let mut start_times: FxHashMap<NodeId, u64> = FxHashMap::default();

        for (_, inst) in dag.topological_ops() {
            let start = inst
                .qubits
                .iter()
                .filter_map(|q| available.get(q).copied())
                .max()
                .unwrap_or(0);

            // Pad each operand up to the common start time.
            for &qubit in &inst.qubits {
                let free_at = available.get(&qubit).copied().unwrap_or(0);
                if free_at < start {
                    scheduled
                        .apply_back(Instruction::delay(qubit, start - free_at))
                        .map_err(CompileError::Ir)?;
                }
            }

            let duration = durations.get(inst)?;
            let node = scheduled.apply_back(inst.clone()).map_err(CompileError::Ir)?;
            start_times.insert(node, start);

            let stop = start + duration;
            for &qubit in &inst.qubits {
                available.insert(qubit, stop);
            }
        }

        // Align every qubit timeline on the global end time.
        let total = available.values().copied().max().unwrap_or(0);
        for qubit in dag.qubits() {
            let free_at = available.get(&qubit).copied().unwrap_or(0);
            if free_at < total {
                scheduled
                    .apply_back(Instruction::delay(qubit, total - free_at))
                    .map_err(CompileError::Ir)?;
            }
        }

        properties.insert(Schedule {
            start_times,
            duration: total,
            unit,
        });
        *dag = scheduled;
        Ok(())
    }

    fn should_run(&self, _dag: &DagCircuit, properties: &PropertySet) -> bool {
        properties.durations.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::durations::InstructionDurations;
    use tangle_ir::{Circuit, ClbitId, QubitId};

    fn durations() -> InstructionDurations {
        InstructionDurations::from_entries(
            &[
                ("h", None, 10),
                ("x", None, 10),
                ("cx", None, 100),
                ("measure", None, 700),
            ],
            "dt",
        )
    }

    fn schedule(dag: &mut DagCircuit) -> Schedule {
        let mut props = PropertySet::new().with_durations(durations());
        AsapSchedule.run(dag, &mut props).unwrap();
        props.get::<Schedule>().unwrap().clone()
    }

    #[test]
    fn test_independent_ops_start_together() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.x(QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        let sched = schedule(&mut dag);
        assert_eq!(sched.duration, 10);
        for (_, inst) in dag.topological_ops() {
            if inst.is_gate() {
                let node = dag.named_ops(inst.name())[0];
                assert_eq!(sched.start_times.get(&node), Some(&0));
            }
        }
        // Both timelines end together; no padding was needed.
        assert_eq!(dag.count_ops().get("delay"), None);
    }

    #[test]
    fn test_dependent_op_waits_for_both_operands() {
        // q0: h (10), then cx(q0, q1) must wait for q1's measure (700).
        let mut circuit = Circuit::with_size("test", 2, 1);
        circuit.h(QubitId(0)).unwrap();
        circuit.measure(QubitId(1), ClbitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let mut dag = circuit.into_dag();

        let sched = schedule(&mut dag);
        let cx_node = dag.named_ops("cx")[0];
        assert_eq!(sched.start_times.get(&cx_node), Some(&700));
        assert_eq!(sched.duration, 800);

        // q0 idles from 10 to 700 before the cx.
        let delays: Vec<u64> = dag
            .topological_ops()
            .filter(|(_, inst)| inst.is_delay())
            .map(|(_, inst)| match inst.kind {
                tangle_ir::InstructionKind::Delay { duration } => duration,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(delays, vec![690]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_trailing_padding_aligns_timelines() {
        let mut circuit = Circuit::with_size("test", 2, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        circuit.h(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        let sched = schedule(&mut dag);
        assert_eq!(sched.duration, 120);

        // q1 finished at 110 and gets one trailing delay of 10.
        let q1_delays: Vec<_> = dag
            .topological_ops()
            .filter(|(_, inst)| inst.is_delay() && inst.qubits == [QubitId(1)])
            .collect();
        assert_eq!(q1_delays.len(), 1);
    }

    #[test]
    fn test_missing_duration_is_fatal() {
        let mut circuit = Circuit::with_size("test", 1, 0);
        circuit.t(QubitId(0)).unwrap();
        let mut dag = circuit.into_dag();

        let mut props = PropertySet::new().with_durations(durations());
        let result = AsapSchedule.run(&mut dag, &mut props);
        assert!(matches!(result, Err(CompileError::MissingDuration { .. })));
    }
}
