//! Gate cancellation through commutation relations.
//!
//! Consumes the commutation groups discovered by
//! [`CommutationAnalysis`] and removes redundancy inside each group:
//! self-inverse gates cancel in pairs, and runs of z-axis rotations fuse
//! into a single phase gate carrying the summed angle.

use rustc_hash::FxHashMap;

use tangle_ir::{
    DagCircuit, Instruction, NodeId, ParameterExpression, QubitId, StandardGate, WireId,
};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassId, PassKind};
use crate::property::PropertySet;

use super::commutation::{CommutationAnalysis, CommutationSet};

/// Gates that square to the identity and cancel in adjacent pairs.
const SELF_INVERSE: [&str; 7] = ["h", "x", "y", "z", "cx", "cy", "cz"];

/// Keys grouping cancellation candidates.
///
/// Two operations may only cancel when they are the same gate on the same
/// operands inside the same commutation group — for two-qubit gates, on
/// both wires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CancelKey {
    /// A self-inverse gate, keyed by name, wire, group, and (for
    /// two-qubit gates) the second wire with its group.
    Gate {
        name: &'static str,
        wire: WireId,
        group: usize,
        partner: Option<(WireId, usize)>,
    },
    /// A run of z-axis rotations on one wire inside one group.
    ZRotation { wire: WireId, group: usize },
}

/// Transformation pass cancelling redundant gates inside commutation
/// groups.
pub struct GateCancellation;

impl GateCancellation {
    /// Sum a z-rotation run into a single phase gate on its first node.
    fn fuse_z_rotations(&self, dag: &mut DagCircuit, run: &[NodeId]) -> CompileResult<()> {
        let first = run[0];
        let (run_qubit, run_condition) = {
            let inst = dag.instruction(first).ok_or_else(|| {
                CompileError::Internal(format!("z-rotation run references missing node {first}"))
            })?;
            (inst.qubits[0], inst.condition.clone())
        };

        let mut total_angle = 0.0f64;
        for &node in run {
            let inst = dag.instruction(node).ok_or_else(|| {
                CompileError::Internal(format!("z-rotation run references missing node {node}"))
            })?;
            if inst.qubits.as_slice() != [run_qubit] || inst.condition != run_condition {
                return Err(CompileError::Internal(
                    "z-rotation run changes qubit or condition mid-run".into(),
                ));
            }
            let angle = match inst.as_standard_gate() {
                Some(StandardGate::Rz(p) | StandardGate::P(p)) => p.as_f64(),
                _ => None,
            }
            .ok_or_else(|| {
                CompileError::Internal(format!("node {node} is not a concrete z-rotation"))
            })?;
            // Plain floating addition; no modulo reduction.
            total_angle += angle;
        }

        let mut fused = DagCircuit::new();
        fused.add_qubit(QubitId(0)).map_err(CompileError::Ir)?;
        fused
            .apply_back(Instruction::single_qubit_gate(
                StandardGate::P(ParameterExpression::constant(total_angle)),
                QubitId(0),
            ))
            .map_err(CompileError::Ir)?;

        dag.substitute_node_with_dag(first, &fused, &[WireId::Qubit(QubitId(0))])
            .map_err(CompileError::Ir)?;
        for &node in &run[1..] {
            dag.remove_op(node).map_err(CompileError::Ir)?;
        }
        Ok(())
    }
}

impl Pass for GateCancellation {
    fn name(&self) -> &'static str {
        "GateCancellation"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn requires(&self) -> Vec<Box<dyn Pass>> {
        vec![Box::new(CommutationAnalysis)]
    }

    fn preserves(&self) -> Vec<PassId> {
        // Removing nodes invalidates every analysis, including the
        // commutation groups this pass just consumed.
        vec![]
    }

    fn run(&self, dag: &mut DagCircuit, properties: &mut PropertySet) -> CompileResult<()> {
        let commutation = properties.get::<CommutationSet>().ok_or_else(|| {
            CompileError::UnsatisfiedRequirement("CommutationAnalysis".into())
        })?;

        let mut sets: FxHashMap<CancelKey, Vec<NodeId>> = FxHashMap::default();
        let mut key_order: Vec<CancelKey> = vec![];

        for qubit in dag.qubits().collect::<Vec<_>>() {
            let wire = WireId::Qubit(qubit);
            for (group_idx, group) in commutation.groups(wire).iter().enumerate() {
                for &node in group {
                    let Some(inst) = dag.instruction(node) else {
                        continue;
                    };
                    // Operations keyed on their first operand wire only,
                    // so a two-qubit gate is considered exactly once.
                    if inst.qubits.first() != Some(&qubit) || inst.condition.is_some() {
                        continue;
                    }
                    let Some(gate) = inst.as_standard_gate() else {
                        continue;
                    };

                    let key = match (inst.qubits.len(), gate) {
                        (1, StandardGate::Rz(p) | StandardGate::P(p)) if p.as_f64().is_some() => {
                            Some(CancelKey::ZRotation {
                                wire,
                                group: group_idx,
                            })
                        }
                        (1, _) if SELF_INVERSE.contains(&gate.name()) => Some(CancelKey::Gate {
                            name: gate.name(),
                            wire,
                            group: group_idx,
                            partner: None,
                        }),
                        (2, _) if SELF_INVERSE.contains(&gate.name()) => {
                            let partner_wire = WireId::Qubit(inst.qubits[1]);
                            commutation.group_index(node, partner_wire).map(|partner| {
                                CancelKey::Gate {
                                    name: gate.name(),
                                    wire,
                                    group: group_idx,
                                    partner: Some((partner_wire, partner)),
                                }
                            })
                        }
                        _ => None,
                    };

                    if let Some(key) = key {
                        let entry = sets.entry(key.clone()).or_default();
                        if entry.is_empty() {
                            key_order.push(key);
                        }
                        entry.push(node);
                    }
                }
            }
        }

        for key in key_order {
            let nodes = &sets[&key];
            if nodes.len() < 2 {
                continue;
            }
            match key {
                CancelKey::Gate { .. } => {
                    // Pairs annihilate; an odd count leaves the last one.
                    let even = (nodes.len() / 2) * 2;
                    for &node in &nodes[..even] {
                        dag.remove_op(node).map_err(CompileError::Ir)?;
                    }
                }
                CancelKey::ZRotation { .. } => {
                    self.fuse_z_rotations(dag, &nodes.clone())?;
                }
            }
        }

        Ok(())
    }
}
