//! Commutation analysis.
//!
//! Partitions the operations on every wire into maximal runs of pairwise
//! commuting operations. Downstream passes (gate cancellation) consume the
//! result from the property set.

use rustc_hash::FxHashMap;

use tangle_ir::{DagCircuit, Instruction, NodeId, WireId};

use crate::error::{CompileError, CompileResult};
use crate::matrix::{EPSILON, instruction_matrix};
use crate::pass::{Pass, PassKind};
use crate::property::PropertySet;

/// Commutation groups per wire, produced by [`CommutationAnalysis`].
///
/// For each wire, operations are grouped into maximal consecutive runs
/// where each operation commutes with the last operation already in the
/// run. A two-qubit operation appears on both of its wires and may sit in
/// different group positions on each.
#[derive(Debug, Clone, Default)]
pub struct CommutationSet {
    /// Node-id groups per wire, in wire order.
    groups: FxHashMap<WireId, Vec<Vec<NodeId>>>,
    /// Group index of a node on a specific wire.
    index: FxHashMap<(NodeId, WireId), usize>,
}

impl CommutationSet {
    /// The commutation groups on a wire, in input-to-output order.
    pub fn groups(&self, wire: WireId) -> &[Vec<NodeId>] {
        self.groups.get(&wire).map_or(&[], Vec::as_slice)
    }

    /// The index of the group a node belongs to on a wire.
    pub fn group_index(&self, node: NodeId, wire: WireId) -> Option<usize> {
        self.index.get(&(node, wire)).copied()
    }
}

/// Decide whether two operations commute.
///
/// Operations on disjoint qubit sets always commute. Otherwise both must
/// have a known matrix (the fixed standard-gate table, or a custom gate
/// with an explicit concrete matrix); the operators are embedded into
/// their combined qubit support and compared as `AB == BA`. Anything
/// opaque — symbolic parameters, measures, resets, barriers — and any
/// conditioned operation is treated as commuting with nothing.
pub(crate) fn commute(a: &Instruction, b: &Instruction) -> bool {
    if a.condition.is_some() || b.condition.is_some() {
        return false;
    }

    if !a.qubits.iter().any(|q| b.qubits.contains(q)) {
        return true;
    }

    let (Some(mat_a), Some(mat_b)) = (instruction_matrix(a), instruction_matrix(b)) else {
        return false;
    };

    let mut support = a.qubits.clone();
    for &q in &b.qubits {
        if !support.contains(&q) {
            support.push(q);
        }
    }
    let n = support.len();

    let positions = |inst: &Instruction| -> Vec<usize> {
        inst.qubits
            .iter()
            .map(|q| {
                support
                    .iter()
                    .position(|s| s == q)
                    .expect("operand is in the combined support by construction")
            })
            .collect()
    };

    let ea = mat_a.embed(&positions(a), n);
    let eb = mat_b.embed(&positions(b), n);
    ea.mul(&eb).approx_eq(&eb.mul(&ea), EPSILON)
}

/// Analysis pass discovering per-wire commutation groups.
pub struct CommutationAnalysis;

impl Pass for CommutationAnalysis {
    fn name(&self) -> &'static str {
        "CommutationAnalysis"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    fn run(&self, dag: &mut DagCircuit, properties: &mut PropertySet) -> CompileResult<()> {
        let mut groups: FxHashMap<WireId, Vec<Vec<NodeId>>> = FxHashMap::default();
        let mut index: FxHashMap<(NodeId, WireId), usize> = FxHashMap::default();

        for wire in dag.wires() {
            let mut wire_groups: Vec<Vec<NodeId>> = vec![];

            for node in dag.wire_ops(wire) {
                let inst = dag.instruction(node).ok_or_else(|| {
                    CompileError::Internal(format!("wire walk yielded non-operation node {node}"))
                })?;

                let extend_current = match wire_groups.last() {
                    Some(group) => {
                        let last = *group.last().expect("commutation groups are never empty");
                        let last_inst = dag.instruction(last).ok_or_else(|| {
                            CompileError::Internal(format!(
                                "commutation group references missing node {last}"
                            ))
                        })?;
                        commute(inst, last_inst)
                    }
                    None => false,
                };

                if extend_current {
                    wire_groups
                        .last_mut()
                        .expect("checked above that a group exists")
                        .push(node);
                } else {
                    wire_groups.push(vec![node]);
                }
                index.insert((node, wire), wire_groups.len() - 1);
            }

            groups.insert(wire, wire_groups);
        }

        properties.insert(CommutationSet { groups, index });
        Ok(())
    }
}
