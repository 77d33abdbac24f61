//! Qubit routing: SWAP insertion for device connectivity.
//!
//! Rewrites a circuit so every two-qubit operation's physical operands
//! (under the working layout) are adjacent in the coupling map. The
//! search runs several independent trials with randomized tie-breaking
//! among equal-length shortest paths and keeps the cheapest result.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::debug;

use tangle_ir::{DagCircuit, Instruction, NodeId, StandardGate, WireId};

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassId, PassKind};
use crate::property::{CouplingMap, Layout, PropertySet};

use super::layout::TrivialLayout;

/// Stochastic shortest-path routing pass.
///
/// Operations are partitioned into disjoint-qubit-support layers in
/// topological order. For each two-qubit operation whose mapped physical
/// operands are not adjacent, SWAPs are inserted along a shortest physical
/// path (excluding the final hop, which hosts the operation itself),
/// updating the layout after every SWAP. The whole procedure repeats
/// `trials` times with independently seeded path tie-breaking; results are
/// scored by (SWAP count, weighted gate cost) and the first-found best is
/// kept, so the outcome is deterministic for a fixed seed.
pub struct StochasticRouting {
    /// Number of independent routing trials.
    trials: usize,
    /// Base RNG seed; trial t uses `seed + t`.
    seed: u64,
}

impl StochasticRouting {
    /// Create a routing pass with the given trial count and seed.
    pub fn new(trials: usize, seed: u64) -> Self {
        Self {
            trials: trials.max(1),
            seed,
        }
    }
}

impl Default for StochasticRouting {
    fn default() -> Self {
        Self::new(5, 0)
    }
}

/// One routed candidate produced by a trial.
struct RoutedTrial {
    dag: DagCircuit,
    layout: Layout,
    swaps: usize,
    cost: u64,
}

impl Pass for StochasticRouting {
    fn name(&self) -> &'static str {
        "StochasticRouting"
    }

    fn kind(&self) -> PassKind {
        PassKind::Transformation
    }

    fn id(&self) -> PassId {
        PassId::new(self.name())
            .with_param("trials", self.trials)
            .with_param("seed", self.seed)
    }

    fn requires(&self) -> Vec<Box<dyn Pass>> {
        vec![Box::new(TrivialLayout)]
    }

    fn run(&self, dag: &mut DagCircuit, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;
        let base_layout = properties
            .layout
            .clone()
            .ok_or(CompileError::MissingLayout)?;

        if dag.num_qubits() > coupling.num_qubits() as usize {
            return Err(CompileError::CircuitTooLarge {
                required: dag.num_qubits(),
                available: coupling.num_qubits(),
            });
        }

        let layer_plan = layers(dag);

        let mut best: Option<RoutedTrial> = None;
        for trial in 0..self.trials {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(trial as u64));
            let candidate = route_once(dag, coupling, base_layout.clone(), &layer_plan, &mut rng)?;
            debug!(
                trial,
                swaps = candidate.swaps,
                cost = candidate.cost,
                "routing trial finished"
            );
            // Strict comparison keeps the earliest trial on ties.
            let better = best
                .as_ref()
                .is_none_or(|b| (candidate.swaps, candidate.cost) < (b.swaps, b.cost));
            if better {
                best = Some(candidate);
            }
        }

        let best = best.ok_or_else(|| {
            CompileError::Internal("routing produced no candidate despite trials >= 1".into())
        })?;
        debug!(swaps = best.swaps, "routing selected best trial");
        *dag = best.dag;
        properties.layout = Some(best.layout);
        Ok(())
    }

    fn should_run(&self, _dag: &DagCircuit, properties: &PropertySet) -> bool {
        properties.coupling_map.is_some()
    }
}

/// Partition operations into disjoint-wire-support layers in topological
/// order. Flattening the layers in order is itself a topological order.
fn layers(dag: &DagCircuit) -> Vec<Vec<NodeId>> {
    let mut wire_level: FxHashMap<WireId, usize> = FxHashMap::default();
    let mut plan: Vec<Vec<NodeId>> = vec![];

    for (node, inst) in dag.topological_ops() {
        let mut wires: Vec<WireId> = inst.qubits.iter().map(|&q| WireId::Qubit(q)).collect();
        wires.extend(inst.clbits.iter().map(|&c| WireId::Clbit(c)));
        if let Some(cond) = &inst.condition {
            for &bit in dag.creg(&cond.register).unwrap_or(&[]) {
                let wire = WireId::Clbit(bit);
                if !wires.contains(&wire) {
                    wires.push(wire);
                }
            }
        }

        let level = wires
            .iter()
            .map(|w| wire_level.get(w).copied().unwrap_or(0))
            .max()
            .unwrap_or(0);
        if plan.len() <= level {
            plan.push(vec![]);
        }
        plan[level].push(node);
        for wire in wires {
            wire_level.insert(wire, level + 1);
        }
    }

    plan
}

/// Route the whole circuit once with the given tie-breaking RNG.
fn route_once(
    source: &DagCircuit,
    coupling: &CouplingMap,
    mut layout: Layout,
    layer_plan: &[Vec<NodeId>],
    rng: &mut StdRng,
) -> CompileResult<RoutedTrial> {
    let mut routed = source.copy_empty();
    let mut swaps = 0usize;

    for layer in layer_plan {
        for &node in layer {
            let inst = source
                .instruction(node)
                .ok_or_else(|| {
                    CompileError::Internal(format!("layer plan references missing node {node}"))
                })?
                .clone();

            if inst.is_gate() && inst.qubits.len() == 2 {
                let p0 = layout
                    .get_physical(inst.qubits[0])
                    .ok_or(CompileError::MissingLayout)?;
                let p1 = layout
                    .get_physical(inst.qubits[1])
                    .ok_or(CompileError::MissingLayout)?;

                if !coupling.is_connected(p0, p1) {
                    let path = random_shortest_path(coupling, p0, p1, rng)?;
                    // SWAP along the path, excluding the final pair which
                    // hosts the operation itself.
                    for i in 0..path.len().saturating_sub(2) {
                        let (a, b) = (path[i], path[i + 1]);
                        if let (Some(va), Some(vb)) =
                            (layout.get_virtual(a), layout.get_virtual(b))
                        {
                            routed
                                .apply_back(Instruction::two_qubit_gate(
                                    StandardGate::Swap,
                                    va,
                                    vb,
                                ))
                                .map_err(CompileError::Ir)?;
                            swaps += 1;
                        }
                        // An unoccupied slot carries no circuit state, so
                        // relabeling the layout is enough.
                        layout.swap(a, b);
                    }
                }
            }

            routed.apply_back(inst).map_err(CompileError::Ir)?;
        }
    }

    let cost = weighted_cost(&routed);
    Ok(RoutedTrial {
        dag: routed,
        layout,
        swaps,
        cost,
    })
}

/// A shortest path from `from` to `to`, breaking ties between equal-length
/// paths uniformly at random.
fn random_shortest_path(
    coupling: &CouplingMap,
    from: u32,
    to: u32,
    rng: &mut StdRng,
) -> CompileResult<Vec<u32>> {
    let mut dist: FxHashMap<u32, u32> = FxHashMap::default();
    let mut queue = VecDeque::new();
    dist.insert(from, 0);
    queue.push_back(from);
    while let Some(current) = queue.pop_front() {
        let d = dist[&current];
        for neighbor in coupling.neighbors(current) {
            if !dist.contains_key(&neighbor) {
                dist.insert(neighbor, d + 1);
                queue.push_back(neighbor);
            }
        }
    }

    if !dist.contains_key(&to) {
        return Err(CompileError::RoutingFailed {
            qubit1: from,
            qubit2: to,
        });
    }

    // Walk back from the target, choosing uniformly among neighbors one
    // step closer to the source.
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        let d = dist[&current];
        let candidates: Vec<u32> = coupling
            .neighbors(current)
            .filter(|n| dist.get(n) == Some(&(d - 1)))
            .collect();
        let pick = candidates[rng.gen_range(0..candidates.len())];
        path.push(pick);
        current = pick;
    }
    path.reverse();
    Ok(path)
}

/// Weighted gate cost used as the routing tie-breaker.
fn weighted_cost(dag: &DagCircuit) -> u64 {
    dag.topological_ops()
        .map(|(_, inst)| {
            if !inst.is_gate() {
                return 0;
            }
            match inst.qubits.len() {
                1 => 1,
                2 if inst.name() == "swap" => 30,
                2 => 10,
                _ => 50,
            }
        })
        .sum()
}
