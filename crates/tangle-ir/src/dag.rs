//! DAG-based circuit representation.

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::f64::consts::TAU;
use std::fmt;

use crate::bit::{ClbitId, QubitId};
use crate::error::{IrError, IrResult};
use crate::gate::ClassicalCondition;
use crate::instruction::Instruction;

/// Stable identifier for a node in the circuit DAG.
///
/// Ids are allocated monotonically and never reused within one DAG
/// instance, so a stale id held across a mutation can never silently
/// alias a different node. Ids double as the creation-order sort key for
/// deterministic topological iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Identifier for a wire in the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireId {
    /// A quantum wire.
    Qubit(QubitId),
    /// A classical wire.
    Clbit(ClbitId),
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireId::Qubit(q) => write!(f, "{q}"),
            WireId::Clbit(c) => write!(f, "{c}"),
        }
    }
}

impl From<QubitId> for WireId {
    fn from(q: QubitId) -> Self {
        WireId::Qubit(q)
    }
}

impl From<ClbitId> for WireId {
    fn from(c: ClbitId) -> Self {
        WireId::Clbit(c)
    }
}

/// A node in the circuit DAG.
#[derive(Debug, Clone, PartialEq)]
pub enum DagNode {
    /// Input node for a wire.
    In(WireId),
    /// Output node for a wire.
    Out(WireId),
    /// Operation node containing an instruction.
    Op(Instruction),
}

impl DagNode {
    /// Check if this is an input node.
    #[inline]
    pub fn is_input(&self) -> bool {
        matches!(self, DagNode::In(_))
    }

    /// Check if this is an output node.
    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self, DagNode::Out(_))
    }

    /// Check if this is an operation node.
    #[inline]
    pub fn is_op(&self) -> bool {
        matches!(self, DagNode::Op(_))
    }

    /// Get the instruction if this is an operation node.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        match self {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }
}

/// An edge in the circuit DAG, labeled with the wire it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DagEdge {
    /// The wire this edge represents.
    pub wire: WireId,
}

/// Graph node weight: the stable id plus the node payload.
#[derive(Debug, Clone)]
struct NodeWeight {
    id: NodeId,
    node: DagNode,
}

/// DAG-based circuit representation.
///
/// The circuit is a directed acyclic multigraph where:
/// - Nodes are wire inputs, wire outputs, or operations
/// - Edges carry exactly one wire label (quantum or classical)
/// - Each wire has exactly one input and one output node, and every
///   operation touching it lies on the directed path between them
///
/// A conditioned operation is also wired through the bits of its condition
/// register, so classical data dependencies order it against measurements.
///
/// ## Performance
///
/// A `wire_front` index maps each wire to the last node before its output
/// node, so `apply_back` finds the splice point in O(1) instead of
/// scanning the output node's incoming edges.
#[derive(Debug, Clone)]
pub struct DagCircuit {
    /// The underlying graph. `StableDiGraph` keeps indices stable across
    /// removals; the `indices` map guarantees public ids are never reused.
    graph: StableDiGraph<NodeWeight, DagEdge, u32>,
    /// Map from public node id to graph index, live nodes only.
    indices: FxHashMap<NodeId, NodeIndex>,
    /// Next node id to allocate.
    next_node: u32,
    /// Qubits in declaration order.
    qubits: Vec<QubitId>,
    /// Classical bits in declaration order.
    clbits: Vec<ClbitId>,
    /// Input/output node pair per qubit.
    qubit_io: FxHashMap<QubitId, (NodeId, NodeId)>,
    /// Input/output node pair per classical bit.
    clbit_io: FxHashMap<ClbitId, (NodeId, NodeId)>,
    /// Named classical registers, in declaration order.
    cregs: Vec<(String, Vec<ClbitId>)>,
    /// Wire front: the node just before each wire's output node.
    wire_front: FxHashMap<WireId, NodeId>,
    /// Global phase of the circuit, normalized to [0, 2π).
    global_phase: f64,
}

impl DagCircuit {
    /// Create a new empty circuit DAG.
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::default(),
            indices: FxHashMap::default(),
            next_node: 0,
            qubits: vec![],
            clbits: vec![],
            qubit_io: FxHashMap::default(),
            clbit_io: FxHashMap::default(),
            cregs: vec![],
            wire_front: FxHashMap::default(),
            global_phase: 0.0,
        }
    }

    fn alloc(&mut self, node: DagNode) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let idx = self.graph.add_node(NodeWeight { id, node });
        self.indices.insert(id, idx);
        id
    }

    fn index_of(&self, id: NodeId) -> IrResult<NodeIndex> {
        self.indices
            .get(&id)
            .copied()
            .ok_or(IrError::NodeNotFound(id))
    }

    fn register_wire(&mut self, wire: WireId) -> (NodeId, NodeId) {
        let in_node = self.alloc(DagNode::In(wire));
        let out_node = self.alloc(DagNode::Out(wire));
        let (in_idx, out_idx) = (self.indices[&in_node], self.indices[&out_node]);
        self.graph.add_edge(in_idx, out_idx, DagEdge { wire });
        self.wire_front.insert(wire, in_node);
        (in_node, out_node)
    }

    /// Add a qubit wire to the circuit.
    ///
    /// Creates the wire's input/output node pair connected by a direct edge.
    pub fn add_qubit(&mut self, qubit: QubitId) -> IrResult<()> {
        if self.qubit_io.contains_key(&qubit) {
            return Err(IrError::DuplicateWire(qubit.to_string()));
        }
        let io = self.register_wire(WireId::Qubit(qubit));
        self.qubit_io.insert(qubit, io);
        self.qubits.push(qubit);
        Ok(())
    }

    /// Add a classical bit wire to the circuit.
    pub fn add_clbit(&mut self, clbit: ClbitId) -> IrResult<()> {
        if self.clbit_io.contains_key(&clbit) {
            return Err(IrError::DuplicateWire(clbit.to_string()));
        }
        let io = self.register_wire(WireId::Clbit(clbit));
        self.clbit_io.insert(clbit, io);
        self.clbits.push(clbit);
        Ok(())
    }

    /// Register a named classical register over the given bits.
    ///
    /// Bits not yet present are added as wires. Conditions may only
    /// reference registers added here.
    pub fn add_creg(&mut self, name: impl Into<String>, bits: Vec<ClbitId>) -> IrResult<()> {
        let name = name.into();
        if self.cregs.iter().any(|(n, _)| *n == name) {
            return Err(IrError::DuplicateRegister(name));
        }
        let mut seen = FxHashSet::default();
        for &bit in &bits {
            if !seen.insert(bit) {
                return Err(IrError::DuplicateClbit {
                    clbit: bit,
                    op_name: None,
                });
            }
        }
        for &bit in &bits {
            if !self.clbit_io.contains_key(&bit) {
                self.add_clbit(bit)?;
            }
        }
        self.cregs.push((name, bits));
        Ok(())
    }

    /// Get the bits of a named classical register.
    pub fn creg(&self, name: &str) -> Option<&[ClbitId]> {
        self.cregs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bits)| bits.as_slice())
    }

    /// Iterate over the named classical registers in declaration order.
    pub fn cregs(&self) -> impl Iterator<Item = (&str, &[ClbitId])> {
        self.cregs.iter().map(|(n, b)| (n.as_str(), b.as_slice()))
    }

    fn wire_io(&self, wire: WireId) -> Option<(NodeId, NodeId)> {
        match wire {
            WireId::Qubit(q) => self.qubit_io.get(&q).copied(),
            WireId::Clbit(c) => self.clbit_io.get(&c).copied(),
        }
    }

    /// Get the input node for a wire.
    pub fn input_node(&self, wire: WireId) -> Option<NodeId> {
        self.wire_io(wire).map(|(i, _)| i)
    }

    /// Get the output node for a wire.
    pub fn output_node(&self, wire: WireId) -> Option<NodeId> {
        self.wire_io(wire).map(|(_, o)| o)
    }

    /// Resolve the bits of an instruction's condition register.
    fn condition_bits(&self, condition: Option<&ClassicalCondition>) -> IrResult<Vec<ClbitId>> {
        match condition {
            None => Ok(vec![]),
            Some(cond) => self
                .creg(&cond.register)
                .map(<[ClbitId]>::to_vec)
                .ok_or_else(|| IrError::UnknownConditionRegister(cond.register.clone())),
        }
    }

    /// All wires an instruction touches: qubit args, clbit args, then any
    /// condition bits not already among the clbit args.
    fn instruction_wires(&self, inst: &Instruction) -> IrResult<Vec<WireId>> {
        let mut wires: Vec<WireId> = inst.qubits.iter().map(|&q| WireId::Qubit(q)).collect();
        wires.extend(inst.clbits.iter().map(|&c| WireId::Clbit(c)));
        for bit in self.condition_bits(inst.condition.as_ref())? {
            let wire = WireId::Clbit(bit);
            if !wires.contains(&wire) {
                wires.push(wire);
            }
        }
        Ok(wires)
    }

    /// Validate an instruction against this DAG without mutating anything.
    fn validate_instruction(&self, inst: &Instruction) -> IrResult<Vec<WireId>> {
        let op_name = || Some(inst.name().to_string());

        if let Some(gate) = inst.as_gate() {
            let expected = gate.num_qubits();
            let got = inst.qubits.len();
            if expected as usize != got {
                return Err(IrError::QubitCountMismatch {
                    gate_name: gate.name().to_string(),
                    expected,
                    got: u32::try_from(got).unwrap_or(u32::MAX),
                });
            }
        }

        let mut seen_q = FxHashSet::default();
        for &qubit in &inst.qubits {
            if !self.qubit_io.contains_key(&qubit) {
                return Err(IrError::QubitNotFound {
                    qubit,
                    op_name: op_name(),
                });
            }
            if !seen_q.insert(qubit) {
                return Err(IrError::DuplicateQubit {
                    qubit,
                    op_name: op_name(),
                });
            }
        }

        let mut seen_c = FxHashSet::default();
        for &clbit in &inst.clbits {
            if !self.clbit_io.contains_key(&clbit) {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    op_name: op_name(),
                });
            }
            if !seen_c.insert(clbit) {
                return Err(IrError::DuplicateClbit {
                    clbit,
                    op_name: op_name(),
                });
            }
        }

        let wires = self.instruction_wires(inst)?;
        if wires.is_empty() {
            return Err(IrError::InvalidDag(format!(
                "operation '{}' touches no wires",
                inst.name()
            )));
        }
        Ok(wires)
    }

    fn remove_wire_edge(&mut self, from: NodeId, to: NodeId, wire: WireId) -> IrResult<()> {
        let (from_idx, to_idx) = (self.index_of(from)?, self.index_of(to)?);
        let edge = self
            .graph
            .edges_directed(from_idx, Direction::Outgoing)
            .find(|e| e.weight().wire == wire && e.target() == to_idx)
            .map(|e| e.id())
            .ok_or_else(|| {
                IrError::InvalidDag(format!("missing edge {from} -> {to} for wire {wire}"))
            })?;
        self.graph.remove_edge(edge);
        Ok(())
    }

    fn add_wire_edge(&mut self, from: NodeId, to: NodeId, wire: WireId) {
        let (from_idx, to_idx) = (self.indices[&from], self.indices[&to]);
        self.graph.add_edge(from_idx, to_idx, DagEdge { wire });
    }

    /// Append an instruction at the end of every wire it touches.
    ///
    /// All validation happens before any edge is mutated: on error the DAG
    /// is exactly as it was.
    pub fn apply_back(&mut self, instruction: Instruction) -> IrResult<NodeId> {
        let wires = self.validate_instruction(&instruction)?;
        let op = self.alloc(DagNode::Op(instruction));

        for &wire in &wires {
            // The wire was validated, so io and front entries exist.
            let (_, out_node) = self.wire_io(wire).ok_or_else(|| {
                IrError::InvalidDag(format!("wire {wire} lost its input/output pair"))
            })?;
            let prev = self.wire_front[&wire];
            self.remove_wire_edge(prev, out_node, wire)?;
            self.add_wire_edge(prev, op, wire);
            self.add_wire_edge(op, out_node, wire);
            self.wire_front.insert(wire, op);
        }

        Ok(op)
    }

    /// Insert an instruction at the start of every wire it touches,
    /// adjacent to the input nodes.
    pub fn apply_front(&mut self, instruction: Instruction) -> IrResult<NodeId> {
        let wires = self.validate_instruction(&instruction)?;
        let op = self.alloc(DagNode::Op(instruction));

        for &wire in &wires {
            let (in_node, _) = self.wire_io(wire).ok_or_else(|| {
                IrError::InvalidDag(format!("wire {wire} lost its input/output pair"))
            })?;
            let succ = self.successor_on(in_node, wire).ok_or_else(|| {
                IrError::InvalidDag(format!("wire {wire} has no edge out of its input node"))
            })?;
            self.remove_wire_edge(in_node, succ, wire)?;
            self.add_wire_edge(in_node, op, wire);
            self.add_wire_edge(op, succ, wire);
            if self.wire_front[&wire] == in_node {
                self.wire_front.insert(wire, op);
            }
        }

        Ok(op)
    }

    /// Remove an operation node, reconnecting each wire's predecessor
    /// directly to its successor.
    pub fn remove_op(&mut self, node: NodeId) -> IrResult<Instruction> {
        let idx = self.index_of(node)?;
        let instruction = match &self.graph[idx].node {
            DagNode::Op(inst) => inst.clone(),
            _ => return Err(IrError::NotAnOperation(node)),
        };

        let incoming: Vec<(NodeId, WireId)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (self.graph[e.source()].id, e.weight().wire))
            .collect();
        let outgoing: Vec<(NodeId, WireId)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (self.graph[e.target()].id, e.weight().wire))
            .collect();

        self.graph.remove_node(idx);
        self.indices.remove(&node);

        for &(pred, wire) in &incoming {
            if self.wire_front.get(&wire) == Some(&node) {
                self.wire_front.insert(wire, pred);
            }
            for &(succ, succ_wire) in &outgoing {
                if wire == succ_wire {
                    self.add_wire_edge(pred, succ, wire);
                }
            }
        }

        Ok(instruction)
    }

    /// Replace an operation node with the contents of `replacement`.
    ///
    /// `wire_order` lists the replacement circuit's wires in an order that
    /// matches the substituted node's qubit args, then clbit args, then
    /// condition bits. If the node carries a classical condition it is
    /// propagated onto every spliced operation; a spliced operation that
    /// writes one of the condition's bits is rejected, as are replacement
    /// operations carrying conditions of their own.
    pub fn substitute_node_with_dag(
        &mut self,
        node: NodeId,
        replacement: &DagCircuit,
        wire_order: &[WireId],
    ) -> IrResult<Vec<NodeId>> {
        let idx = self.index_of(node)?;
        let inst = match &self.graph[idx].node {
            DagNode::Op(inst) => inst.clone(),
            _ => return Err(IrError::NotAnOperation(node)),
        };

        let cond_bits = self.condition_bits(inst.condition.as_ref())?;
        let node_wires = self.instruction_wires(&inst)?;

        if wire_order.len() != node_wires.len() {
            return Err(IrError::WireCountMismatch {
                expected: node_wires.len(),
                got: wire_order.len(),
            });
        }
        if wire_order.len() != replacement.qubits.len() + replacement.clbits.len() {
            return Err(IrError::InvalidDag(
                "wire order must cover every wire of the replacement circuit".into(),
            ));
        }

        let mut seen = FxHashSet::default();
        for (&rep_wire, &self_wire) in wire_order.iter().zip(&node_wires) {
            if !seen.insert(rep_wire) {
                return Err(IrError::InvalidDag(format!(
                    "duplicate wire {rep_wire} in wire order"
                )));
            }
            if replacement.wire_io(rep_wire).is_none() {
                return Err(IrError::InvalidDag(format!(
                    "wire {rep_wire} is not a wire of the replacement circuit"
                )));
            }
            let kinds_match = matches!(
                (rep_wire, self_wire),
                (WireId::Qubit(_), WireId::Qubit(_)) | (WireId::Clbit(_), WireId::Clbit(_))
            );
            if !kinds_match {
                return Err(IrError::InvalidDag(format!(
                    "wire order maps {rep_wire} onto {self_wire} of a different kind"
                )));
            }
        }

        let wire_map: FxHashMap<WireId, WireId> = wire_order
            .iter()
            .copied()
            .zip(node_wires.iter().copied())
            .collect();

        // Validate the replacement before touching anything.
        for (_, rep_inst) in replacement.topological_ops() {
            if rep_inst.condition.is_some() {
                return Err(IrError::InvalidDag(
                    "replacement operations must not carry classical conditions".into(),
                ));
            }
            if !cond_bits.is_empty() {
                for &clbit in &rep_inst.clbits {
                    if let Some(WireId::Clbit(mapped)) = wire_map.get(&WireId::Clbit(clbit)) {
                        if cond_bits.contains(mapped) {
                            return Err(IrError::ConditionBitWrite(*mapped));
                        }
                    }
                }
            }
        }

        // Per-wire neighbors of the node being replaced, before removal.
        let mut pred: FxHashMap<WireId, NodeId> = FxHashMap::default();
        let mut succ: FxHashMap<WireId, NodeId> = FxHashMap::default();
        for &wire in &node_wires {
            let p = self.predecessor_on(node, wire).ok_or_else(|| {
                IrError::InvalidDag(format!("node {node} has no predecessor on wire {wire}"))
            })?;
            let s = self.successor_on(node, wire).ok_or_else(|| {
                IrError::InvalidDag(format!("node {node} has no successor on wire {wire}"))
            })?;
            pred.insert(wire, p);
            succ.insert(wire, s);
        }

        self.graph.remove_node(idx);
        self.indices.remove(&node);

        let map_qubit = |q: QubitId| match wire_map[&WireId::Qubit(q)] {
            WireId::Qubit(mapped) => mapped,
            WireId::Clbit(_) => unreachable!("wire kinds were checked above"),
        };
        let map_clbit = |c: ClbitId| match wire_map[&WireId::Clbit(c)] {
            WireId::Clbit(mapped) => mapped,
            WireId::Qubit(_) => unreachable!("wire kinds were checked above"),
        };

        let mut frontier = pred.clone();
        let mut new_nodes = vec![];
        for (_, rep_inst) in replacement.topological_ops() {
            let mut spliced = rep_inst.clone();
            spliced.qubits = spliced.qubits.into_iter().map(map_qubit).collect();
            spliced.clbits = spliced.clbits.into_iter().map(map_clbit).collect();
            spliced.condition = inst.condition.clone();

            let mut wires: Vec<WireId> =
                spliced.qubits.iter().map(|&q| WireId::Qubit(q)).collect();
            wires.extend(spliced.clbits.iter().map(|&c| WireId::Clbit(c)));
            for &bit in &cond_bits {
                let wire = WireId::Clbit(bit);
                if !wires.contains(&wire) {
                    wires.push(wire);
                }
            }

            let new_node = self.alloc(DagNode::Op(spliced));
            for wire in wires {
                self.add_wire_edge(frontier[&wire], new_node, wire);
                frontier.insert(wire, new_node);
            }
            new_nodes.push(new_node);
        }

        for &wire in &node_wires {
            self.add_wire_edge(frontier[&wire], succ[&wire], wire);
            if self.wire_front.get(&wire) == Some(&node) {
                self.wire_front.insert(wire, frontier[&wire]);
            }
        }

        Ok(new_nodes)
    }

    /// Graft `other`'s operations onto this circuit's output frontier.
    ///
    /// Wire maps default to positional identity (declaration order of each
    /// circuit) when omitted; a supplied map falls back to same-id for
    /// unmapped bits. The mapped target set must contain no duplicates.
    /// Conditions cross by register name. Global phase accumulates
    /// additively mod 2π.
    pub fn compose(
        &mut self,
        other: &DagCircuit,
        qubit_map: Option<&FxHashMap<QubitId, QubitId>>,
        clbit_map: Option<&FxHashMap<ClbitId, ClbitId>>,
    ) -> IrResult<()> {
        if other.num_qubits() > self.num_qubits() {
            return Err(IrError::ComposeMismatch(format!(
                "other circuit has {} qubits, destination has {}",
                other.num_qubits(),
                self.num_qubits()
            )));
        }
        if other.num_clbits() > self.num_clbits() {
            return Err(IrError::ComposeMismatch(format!(
                "other circuit has {} clbits, destination has {}",
                other.num_clbits(),
                self.num_clbits()
            )));
        }

        let qmap: FxHashMap<QubitId, QubitId> = match qubit_map {
            Some(map) => other
                .qubits
                .iter()
                .map(|&q| (q, map.get(&q).copied().unwrap_or(q)))
                .collect(),
            None => other
                .qubits
                .iter()
                .copied()
                .zip(self.qubits.iter().copied())
                .collect(),
        };
        let cmap: FxHashMap<ClbitId, ClbitId> = match clbit_map {
            Some(map) => other
                .clbits
                .iter()
                .map(|&c| (c, map.get(&c).copied().unwrap_or(c)))
                .collect(),
            None => other
                .clbits
                .iter()
                .copied()
                .zip(self.clbits.iter().copied())
                .collect(),
        };

        let mut seen_q = FxHashSet::default();
        for &target in qmap.values() {
            if !self.qubit_io.contains_key(&target) {
                return Err(IrError::QubitNotFound {
                    qubit: target,
                    op_name: None,
                });
            }
            if !seen_q.insert(target) {
                return Err(IrError::ComposeMismatch(format!(
                    "qubit map targets {target} more than once"
                )));
            }
        }
        let mut seen_c = FxHashSet::default();
        for &target in cmap.values() {
            if !self.clbit_io.contains_key(&target) {
                return Err(IrError::ClbitNotFound {
                    clbit: target,
                    op_name: None,
                });
            }
            if !seen_c.insert(target) {
                return Err(IrError::ComposeMismatch(format!(
                    "clbit map targets {target} more than once"
                )));
            }
        }

        for (_, inst) in other.topological_ops() {
            if let Some(cond) = &inst.condition {
                if self.creg(&cond.register).is_none() {
                    return Err(IrError::ComposeMismatch(format!(
                        "condition register '{}' is not registered in the destination",
                        cond.register
                    )));
                }
            }
        }

        for (_, inst) in other.topological_ops() {
            let mut mapped = inst.clone();
            mapped.qubits = mapped.qubits.into_iter().map(|q| qmap[&q]).collect();
            mapped.clbits = mapped.clbits.into_iter().map(|c| cmap[&c]).collect();
            self.apply_back(mapped)?;
        }

        self.global_phase = (self.global_phase + other.global_phase).rem_euclid(TAU);
        Ok(())
    }

    /// Non-mutating [`compose`](Self::compose): returns the combined
    /// circuit, leaving `self` untouched.
    pub fn composed(
        &self,
        other: &DagCircuit,
        qubit_map: Option<&FxHashMap<QubitId, QubitId>>,
        clbit_map: Option<&FxHashMap<ClbitId, ClbitId>>,
    ) -> IrResult<DagCircuit> {
        let mut combined = self.clone();
        combined.compose(other, qubit_map, clbit_map)?;
        Ok(combined)
    }

    /// Get the node payload by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&DagNode> {
        self.indices.get(&id).map(|&idx| &self.graph[idx].node)
    }

    /// Get an instruction by node id.
    #[inline]
    pub fn instruction(&self, id: NodeId) -> Option<&Instruction> {
        self.node(id).and_then(DagNode::instruction)
    }

    /// Get a mutable instruction by node id.
    #[inline]
    pub fn instruction_mut(&mut self, id: NodeId) -> Option<&mut Instruction> {
        let idx = *self.indices.get(&id)?;
        match &mut self.graph[idx].node {
            DagNode::Op(inst) => Some(inst),
            _ => None,
        }
    }

    fn try_topological_order(&self) -> IrResult<Vec<NodeId>> {
        let mut indegree: FxHashMap<NodeId, usize> =
            FxHashMap::with_capacity_and_hasher(self.graph.node_count(), Default::default());
        for idx in self.graph.node_indices() {
            indegree.insert(
                self.graph[idx].id,
                self.graph.edges_directed(idx, Direction::Incoming).count(),
            );
        }

        // Min-heap on node id: ties between ready nodes break by creation
        // order, so iteration is deterministic.
        let mut ready: BinaryHeap<Reverse<NodeId>> = indegree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(&id, _)| Reverse(id))
            .collect();

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse(id)) = ready.pop() {
            order.push(id);
            let idx = self.indices[&id];
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let target = self.graph[edge.target()].id;
                let deg = indegree
                    .get_mut(&target)
                    .ok_or_else(|| IrError::InvalidDag("edge to unknown node".into()))?;
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse(target));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            return Err(IrError::InvalidDag("graph contains a cycle".into()));
        }
        Ok(order)
    }

    fn topological_order(&self) -> Vec<NodeId> {
        self.try_topological_order()
            .expect("DAG must be acyclic — cycle detected in circuit graph")
    }

    /// Iterate over operations in topological order.
    ///
    /// Recomputed on every call; ties between independent operations break
    /// by node creation order, so the sequence is deterministic.
    pub fn topological_ops(&self) -> impl Iterator<Item = (NodeId, &Instruction)> {
        self.topological_order().into_iter().filter_map(move |id| {
            let idx = self.indices[&id];
            match &self.graph[idx].node {
                DagNode::Op(inst) => Some((id, inst)),
                _ => None,
            }
        })
    }

    /// Operation nodes with a given instruction name, in topological order.
    pub fn named_ops(&self, name: &str) -> Vec<NodeId> {
        self.topological_ops()
            .filter(|(_, inst)| inst.name() == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// Distinct predecessors of a node, in edge order.
    pub fn predecessors(&self, node: NodeId) -> IrResult<Vec<NodeId>> {
        let idx = self.index_of(node)?;
        let mut seen = FxHashSet::default();
        Ok(self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| self.graph[e.source()].id)
            .filter(|id| seen.insert(*id))
            .collect())
    }

    /// Distinct successors of a node, in edge order.
    pub fn successors(&self, node: NodeId) -> IrResult<Vec<NodeId>> {
        let idx = self.index_of(node)?;
        let mut seen = FxHashSet::default();
        Ok(self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| self.graph[e.target()].id)
            .filter(|id| seen.insert(*id))
            .collect())
    }

    /// The node immediately before `node` on a specific wire.
    pub fn predecessor_on(&self, node: NodeId, wire: WireId) -> Option<NodeId> {
        let idx = *self.indices.get(&node)?;
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .find(|e| e.weight().wire == wire)
            .map(|e| self.graph[e.source()].id)
    }

    /// The node immediately after `node` on a specific wire.
    pub fn successor_on(&self, node: NodeId, wire: WireId) -> Option<NodeId> {
        let idx = *self.indices.get(&node)?;
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .find(|e| e.weight().wire == wire)
            .map(|e| self.graph[e.target()].id)
    }

    /// Operation nodes on a wire, walked from input to output.
    pub fn wire_ops(&self, wire: WireId) -> Vec<NodeId> {
        let Some((in_node, out_node)) = self.wire_io(wire) else {
            return vec![];
        };
        let mut ops = vec![];
        let mut current = in_node;
        let mut steps = 0;
        while current != out_node {
            match self.successor_on(current, wire) {
                Some(next) => current = next,
                None => break,
            }
            if current != out_node {
                ops.push(current);
            }
            steps += 1;
            if steps > self.graph.node_count() {
                break;
            }
        }
        ops
    }

    /// All wires in declaration order, qubits first.
    pub fn wires(&self) -> Vec<WireId> {
        self.qubits
            .iter()
            .map(|&q| WireId::Qubit(q))
            .chain(self.clbits.iter().map(|&c| WireId::Clbit(c)))
            .collect()
    }

    /// Wires carrying no operations.
    pub fn idle_wires(&self) -> Vec<WireId> {
        self.wires()
            .into_iter()
            .filter(|&wire| {
                self.wire_io(wire).is_some_and(|(in_node, out_node)| {
                    self.successor_on(in_node, wire) == Some(out_node)
                })
            })
            .collect()
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.qubits.len()
    }

    /// Get the number of classical bits.
    #[inline]
    pub fn num_clbits(&self) -> usize {
        self.clbits.len()
    }

    /// Get the number of operations.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.graph
            .node_weights()
            .filter(|w| w.node.is_op())
            .count()
    }

    /// Count operations per instruction name.
    pub fn count_ops(&self) -> FxHashMap<String, usize> {
        let mut counts = FxHashMap::default();
        for weight in self.graph.node_weights() {
            if let DagNode::Op(inst) = &weight.node {
                *counts.entry(inst.name().to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Calculate the circuit depth: the longest operation-bearing path.
    /// Empty wires contribute nothing.
    pub fn depth(&self) -> usize {
        let mut depths: FxHashMap<NodeId, usize> =
            FxHashMap::with_capacity_and_hasher(self.graph.node_count(), Default::default());
        let mut max_depth = 0usize;

        for id in self.topological_order() {
            let idx = self.indices[&id];
            let max_pred_depth = self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .map(|e| depths.get(&self.graph[e.source()].id).copied().unwrap_or(0))
                .max()
                .unwrap_or(0);

            let node_depth = if self.graph[idx].node.is_op() {
                max_pred_depth + 1
            } else {
                max_pred_depth
            };

            max_depth = max_depth.max(node_depth);
            depths.insert(id, node_depth);
        }

        max_depth
    }

    /// Iterate over qubits in declaration order.
    pub fn qubits(&self) -> impl Iterator<Item = QubitId> + '_ {
        self.qubits.iter().copied()
    }

    /// Iterate over classical bits in declaration order.
    pub fn clbits(&self) -> impl Iterator<Item = ClbitId> + '_ {
        self.clbits.iter().copied()
    }

    /// Get the global phase.
    pub fn global_phase(&self) -> f64 {
        self.global_phase
    }

    /// Set the global phase, normalized to [0, 2π).
    pub fn set_global_phase(&mut self, phase: f64) {
        self.global_phase = phase.rem_euclid(TAU);
    }

    /// A new DAG with the same wires, registers, and global phase, but no
    /// operations. Passes that rebuild a circuit start from this.
    pub fn copy_empty(&self) -> DagCircuit {
        let mut copy = DagCircuit::new();
        for &qubit in &self.qubits {
            let io = copy.register_wire(WireId::Qubit(qubit));
            copy.qubit_io.insert(qubit, io);
            copy.qubits.push(qubit);
        }
        for &clbit in &self.clbits {
            let io = copy.register_wire(WireId::Clbit(clbit));
            copy.clbit_io.insert(clbit, io);
            copy.clbits.push(clbit);
        }
        copy.cregs = self.cregs.clone();
        copy.global_phase = self.global_phase;
        copy
    }

    /// Verify the structural integrity of the DAG.
    ///
    /// Checks that:
    /// - The graph is acyclic
    /// - Every wire has its input/output node pair, the input has exactly
    ///   one outgoing edge and the output exactly one incoming edge
    /// - Each wire forms an unbroken path from input to output
    /// - Every operation node has exactly one incoming and one outgoing
    ///   edge per wire it touches
    pub fn verify_integrity(&self) -> IrResult<()> {
        self.try_topological_order()?;

        for wire in self.wires() {
            let (in_node, out_node) = self.wire_io(wire).ok_or_else(|| {
                IrError::InvalidDag(format!("wire {wire} has no input/output pair"))
            })?;

            let in_degree_out = self
                .graph
                .edges_directed(self.index_of(in_node)?, Direction::Outgoing)
                .count();
            if in_degree_out != 1 {
                return Err(IrError::InvalidDag(format!(
                    "input node of wire {wire} has out-degree {in_degree_out}, expected 1"
                )));
            }
            let out_degree_in = self
                .graph
                .edges_directed(self.index_of(out_node)?, Direction::Incoming)
                .count();
            if out_degree_in != 1 {
                return Err(IrError::InvalidDag(format!(
                    "output node of wire {wire} has in-degree {out_degree_in}, expected 1"
                )));
            }

            let mut current = in_node;
            let mut steps = 0;
            while current != out_node {
                current = self.successor_on(current, wire).ok_or_else(|| {
                    IrError::InvalidDag(format!(
                        "wire {wire} is broken: no outgoing edge from node {current}"
                    ))
                })?;
                steps += 1;
                if steps > self.graph.node_count() {
                    return Err(IrError::InvalidDag(format!(
                        "wire {wire} does not terminate at its output node"
                    )));
                }
            }

            if self.wire_front.get(&wire) != self.predecessor_on(out_node, wire).as_ref() {
                return Err(IrError::InvalidDag(format!(
                    "wire front index for {wire} is stale"
                )));
            }
        }

        for weight in self.graph.node_weights() {
            let DagNode::Op(inst) = &weight.node else {
                continue;
            };
            let idx = self.indices[&weight.id];
            for wire in self.instruction_wires(inst)? {
                let inputs = self
                    .graph
                    .edges_directed(idx, Direction::Incoming)
                    .filter(|e| e.weight().wire == wire)
                    .count();
                let outputs = self
                    .graph
                    .edges_directed(idx, Direction::Outgoing)
                    .filter(|e| e.weight().wire == wire)
                    .count();
                if inputs != 1 || outputs != 1 {
                    return Err(IrError::InvalidDag(format!(
                        "operation {} has {inputs} inputs and {outputs} outputs on wire {wire}",
                        weight.id
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for DagCircuit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::StandardGate;
    use crate::parameter::ParameterExpression;
    use std::f64::consts::PI;

    fn h(q: u32) -> Instruction {
        Instruction::single_qubit_gate(StandardGate::H, QubitId(q))
    }

    fn cx(c: u32, t: u32) -> Instruction {
        Instruction::two_qubit_gate(StandardGate::CX, QubitId(c), QubitId(t))
    }

    fn dag_with_qubits(n: u32) -> DagCircuit {
        let mut dag = DagCircuit::new();
        for i in 0..n {
            dag.add_qubit(QubitId(i)).unwrap();
        }
        dag
    }

    #[test]
    fn test_empty_dag() {
        let dag = DagCircuit::new();
        assert_eq!(dag.num_qubits(), 0);
        assert_eq!(dag.num_clbits(), 0);
        assert_eq!(dag.num_ops(), 0);
        assert_eq!(dag.depth(), 0);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_duplicate_wire_rejected() {
        let mut dag = DagCircuit::new();
        dag.add_qubit(QubitId(0)).unwrap();
        assert!(matches!(
            dag.add_qubit(QubitId(0)),
            Err(IrError::DuplicateWire(_))
        ));
        dag.add_clbit(ClbitId(0)).unwrap();
        assert!(matches!(
            dag.add_clbit(ClbitId(0)),
            Err(IrError::DuplicateWire(_))
        ));
    }

    #[test]
    fn test_apply_gate() {
        let mut dag = dag_with_qubits(1);
        dag.apply_back(h(0)).unwrap();
        assert_eq!(dag.num_ops(), 1);
        assert_eq!(dag.depth(), 1);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_bell_depth() {
        let mut dag = dag_with_qubits(2);
        dag.apply_back(h(0)).unwrap();
        dag.apply_back(cx(0, 1)).unwrap();
        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.depth(), 2);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_parallel_gates_depth() {
        let mut dag = dag_with_qubits(2);
        dag.apply_back(h(0)).unwrap();
        dag.apply_back(h(1)).unwrap();
        assert_eq!(dag.num_ops(), 2);
        assert_eq!(dag.depth(), 1);
    }

    #[test]
    fn test_gate_arity_mismatch() {
        let mut dag = dag_with_qubits(2);
        let result = dag.apply_back(Instruction::gate(StandardGate::CX, [QubitId(0)]));
        match result {
            Err(IrError::QubitCountMismatch {
                gate_name,
                expected,
                got,
            }) => {
                assert_eq!(gate_name, "cx");
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
            }
            other => panic!("Expected QubitCountMismatch, got {other:?}"),
        }
        // Nothing was mutated.
        assert_eq!(dag.num_ops(), 0);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_qubit_not_found() {
        let mut dag = dag_with_qubits(1);
        let result = dag.apply_back(cx(0, 99));
        assert!(matches!(
            result,
            Err(IrError::QubitNotFound {
                qubit: QubitId(99),
                ..
            })
        ));
    }

    #[test]
    fn test_duplicate_qubit_arg() {
        let mut dag = dag_with_qubits(2);
        let result = dag.apply_back(cx(0, 0));
        assert!(matches!(result, Err(IrError::DuplicateQubit { .. })));
    }

    #[test]
    fn test_apply_front_orders_before_back() {
        let mut dag = dag_with_qubits(1);
        dag.apply_back(h(0)).unwrap();
        dag.apply_front(Instruction::single_qubit_gate(StandardGate::X, QubitId(0)))
            .unwrap();

        let names: Vec<_> = dag
            .topological_ops()
            .map(|(_, inst)| inst.name().to_string())
            .collect();
        assert_eq!(names, vec!["x", "h"]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_remove_op_roundtrip() {
        let mut dag = dag_with_qubits(2);
        let first = dag.apply_back(h(0)).unwrap();
        let w0 = WireId::Qubit(QubitId(0));
        let w1 = WireId::Qubit(QubitId(1));

        let pred_before = (
            dag.predecessor_on(first, w0),
            dag.successor_on(first, w0),
        );

        let added = dag.apply_back(cx(0, 1)).unwrap();
        dag.remove_op(added).unwrap();

        // The edges around the surviving node are exactly as before.
        assert_eq!(dag.predecessor_on(first, w0), pred_before.0);
        assert_eq!(dag.successor_on(first, w0), pred_before.1);
        // Wire 1 is idle again.
        assert!(dag.idle_wires().contains(&w1));
        assert_eq!(dag.num_ops(), 1);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_remove_non_op_rejected() {
        let mut dag = dag_with_qubits(1);
        let in_node = dag.input_node(WireId::Qubit(QubitId(0))).unwrap();
        assert!(matches!(
            dag.remove_op(in_node),
            Err(IrError::NotAnOperation(_))
        ));
    }

    #[test]
    fn test_node_ids_never_reused() {
        let mut dag = dag_with_qubits(1);
        let first = dag.apply_back(h(0)).unwrap();
        dag.remove_op(first).unwrap();
        let second = dag.apply_back(h(0)).unwrap();
        assert_ne!(first, second);
        assert!(dag.instruction(first).is_none());
        assert!(dag.instruction(second).is_some());
    }

    #[test]
    fn test_substitute_node_with_dag() {
        let mut dag = dag_with_qubits(2);
        dag.apply_back(h(0)).unwrap();
        let target = dag.apply_back(cx(0, 1)).unwrap();
        dag.apply_back(h(1)).unwrap();

        // CX = H(t) · CZ · H(t)
        let mut replacement = DagCircuit::new();
        replacement.add_qubit(QubitId(0)).unwrap();
        replacement.add_qubit(QubitId(1)).unwrap();
        replacement.apply_back(h(1)).unwrap();
        replacement
            .apply_back(Instruction::two_qubit_gate(
                StandardGate::CZ,
                QubitId(0),
                QubitId(1),
            ))
            .unwrap();
        replacement.apply_back(h(1)).unwrap();

        let new_nodes = dag
            .substitute_node_with_dag(
                target,
                &replacement,
                &[WireId::Qubit(QubitId(0)), WireId::Qubit(QubitId(1))],
            )
            .unwrap();

        assert_eq!(new_nodes.len(), 3);
        assert_eq!(dag.num_ops(), 5);
        let names: Vec<_> = dag
            .topological_ops()
            .map(|(_, inst)| inst.name().to_string())
            .collect();
        assert_eq!(names, vec!["h", "h", "cz", "h", "h"]);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_substitute_wire_count_mismatch() {
        let mut dag = dag_with_qubits(2);
        let target = dag.apply_back(cx(0, 1)).unwrap();

        let mut replacement = DagCircuit::new();
        replacement.add_qubit(QubitId(0)).unwrap();
        replacement.apply_back(h(0)).unwrap();

        let result = dag.substitute_node_with_dag(
            target,
            &replacement,
            &[WireId::Qubit(QubitId(0))],
        );
        assert!(matches!(
            result,
            Err(IrError::WireCountMismatch {
                expected: 2,
                got: 1
            })
        ));
        // Rejected before mutation.
        assert_eq!(dag.num_ops(), 1);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_substitute_propagates_condition() {
        let mut dag = dag_with_qubits(1);
        dag.add_creg("c", vec![ClbitId(0)]).unwrap();
        let target = dag
            .apply_back(h(0).with_condition(ClassicalCondition::new("c", 1)))
            .unwrap();

        // The conditioned node spans its qubit plus the condition bit, so
        // the replacement carries an (idle) classical wire to map onto it.
        let mut replacement = DagCircuit::new();
        replacement.add_qubit(QubitId(0)).unwrap();
        replacement.add_clbit(ClbitId(0)).unwrap();
        replacement
            .apply_back(Instruction::single_qubit_gate(StandardGate::Z, QubitId(0)))
            .unwrap();
        replacement
            .apply_back(Instruction::single_qubit_gate(StandardGate::X, QubitId(0)))
            .unwrap();

        let new_nodes = dag
            .substitute_node_with_dag(
                target,
                &replacement,
                &[WireId::Qubit(QubitId(0)), WireId::Clbit(ClbitId(0))],
            )
            .unwrap();

        for id in new_nodes {
            let inst = dag.instruction(id).unwrap();
            assert_eq!(
                inst.condition,
                Some(ClassicalCondition::new("c", 1)),
                "condition must be propagated onto {id}"
            );
        }
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_substitute_rejects_condition_bit_write() {
        let mut dag = DagCircuit::new();
        dag.add_qubit(QubitId(0)).unwrap();
        dag.add_creg("c", vec![ClbitId(0)]).unwrap();
        let target = dag
            .apply_back(h(0).with_condition(ClassicalCondition::new("c", 1)))
            .unwrap();

        // Replacement measures into the bit the condition depends on.
        let mut replacement = DagCircuit::new();
        replacement.add_qubit(QubitId(0)).unwrap();
        replacement.add_clbit(ClbitId(0)).unwrap();
        replacement
            .apply_back(Instruction::measure(QubitId(0), ClbitId(0)))
            .unwrap();

        let result = dag.substitute_node_with_dag(
            target,
            &replacement,
            &[WireId::Qubit(QubitId(0)), WireId::Clbit(ClbitId(0))],
        );
        assert!(matches!(result, Err(IrError::ConditionBitWrite(_))));
        assert_eq!(dag.num_ops(), 1);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_condition_requires_registered_creg() {
        let mut dag = dag_with_qubits(1);
        let result = dag.apply_back(h(0).with_condition(ClassicalCondition::new("nope", 1)));
        assert!(matches!(
            result,
            Err(IrError::UnknownConditionRegister(_))
        ));
    }

    #[test]
    fn test_compose_counts_and_phase() {
        let mut a = dag_with_qubits(3);
        a.set_global_phase(PI);
        a.apply_back(h(0)).unwrap();
        a.apply_back(cx(0, 1)).unwrap();

        let mut b = dag_with_qubits(2);
        b.set_global_phase(3.0 * PI / 2.0);
        b.apply_back(h(1)).unwrap();
        b.apply_back(cx(1, 0)).unwrap();

        a.compose(&b, None, None).unwrap();

        assert_eq!(a.num_ops(), 4);
        // π + 3π/2 = 5π/2 ≡ π/2 (mod 2π)
        assert!((a.global_phase() - PI / 2.0).abs() < 1e-12);
        a.verify_integrity().unwrap();
    }

    #[test]
    fn test_compose_rejects_wider_circuit() {
        let mut a = dag_with_qubits(1);
        let b = dag_with_qubits(2);
        assert!(matches!(
            a.compose(&b, None, None),
            Err(IrError::ComposeMismatch(_))
        ));
    }

    #[test]
    fn test_compose_rejects_duplicate_targets() {
        let mut a = dag_with_qubits(3);
        let b = dag_with_qubits(2);
        let mut map = FxHashMap::default();
        map.insert(QubitId(0), QubitId(2));
        map.insert(QubitId(1), QubitId(2));
        assert!(matches!(
            a.compose(&b, Some(&map), None),
            Err(IrError::ComposeMismatch(_))
        ));
    }

    #[test]
    fn test_topological_order_deterministic() {
        let mut dag = dag_with_qubits(3);
        dag.apply_back(h(2)).unwrap();
        dag.apply_back(h(0)).unwrap();
        dag.apply_back(h(1)).unwrap();

        // Independent operations come out in creation order, every time.
        let ids: Vec<_> = dag.topological_ops().map(|(id, _)| id).collect();
        let again: Vec<_> = dag.topological_ops().map(|(id, _)| id).collect();
        assert_eq!(ids, again);
        let qubits: Vec<_> = dag
            .topological_ops()
            .map(|(_, inst)| inst.qubits[0].0)
            .collect();
        assert_eq!(qubits, vec![2, 0, 1]);
    }

    #[test]
    fn test_wire_ops_and_idle_wires() {
        let mut dag = dag_with_qubits(2);
        dag.add_clbit(ClbitId(0)).unwrap();
        let n1 = dag.apply_back(h(0)).unwrap();
        let n2 = dag.apply_back(cx(0, 1)).unwrap();

        assert_eq!(dag.wire_ops(WireId::Qubit(QubitId(0))), vec![n1, n2]);
        assert_eq!(dag.wire_ops(WireId::Qubit(QubitId(1))), vec![n2]);
        assert_eq!(dag.idle_wires(), vec![WireId::Clbit(ClbitId(0))]);
    }

    #[test]
    fn test_count_ops() {
        let mut dag = dag_with_qubits(2);
        dag.apply_back(h(0)).unwrap();
        dag.apply_back(h(1)).unwrap();
        dag.apply_back(cx(0, 1)).unwrap();

        let counts = dag.count_ops();
        assert_eq!(counts.get("h"), Some(&2));
        assert_eq!(counts.get("cx"), Some(&1));
    }

    #[test]
    fn test_measure_wiring() {
        let mut dag = dag_with_qubits(1);
        dag.add_clbit(ClbitId(0)).unwrap();
        dag.apply_back(h(0)).unwrap();
        dag.apply_back(Instruction::measure(QubitId(0), ClbitId(0)))
            .unwrap();
        assert_eq!(dag.num_ops(), 2);
        dag.verify_integrity().unwrap();
    }

    #[test]
    fn test_parameterized_gate_applies() {
        let mut dag = dag_with_qubits(1);
        dag.apply_back(Instruction::single_qubit_gate(
            StandardGate::Rz(ParameterExpression::symbol("theta")),
            QubitId(0),
        ))
        .unwrap();
        assert_eq!(dag.num_ops(), 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const WIDTH: u32 = 4;

        #[derive(Debug, Clone)]
        enum Step {
            H(u32),
            X(u32),
            Rz(u32, f64),
            Cx(u32, u32),
            RemoveLatest,
        }

        fn step_strategy() -> impl Strategy<Value = Step> {
            prop_oneof![
                (0..WIDTH).prop_map(Step::H),
                (0..WIDTH).prop_map(Step::X),
                ((0..WIDTH), -6.3f64..6.3).prop_map(|(q, a)| Step::Rz(q, a)),
                ((0..WIDTH), (0..WIDTH)).prop_map(|(a, b)| Step::Cx(a, b)),
                Just(Step::RemoveLatest),
            ]
        }

        proptest! {
            #[test]
            fn random_mutations_preserve_invariants(steps in prop::collection::vec(step_strategy(), 0..40)) {
                let mut dag = DagCircuit::new();
                for i in 0..WIDTH {
                    dag.add_qubit(QubitId(i)).unwrap();
                }
                let mut live = vec![];
                for step in steps {
                    match step {
                        Step::H(q) => live.push(dag.apply_back(h(q)).unwrap()),
                        Step::X(q) => live.push(
                            dag.apply_back(Instruction::single_qubit_gate(StandardGate::X, QubitId(q))).unwrap(),
                        ),
                        Step::Rz(q, a) => live.push(
                            dag.apply_back(Instruction::single_qubit_gate(
                                StandardGate::Rz(ParameterExpression::constant(a)),
                                QubitId(q),
                            )).unwrap(),
                        ),
                        Step::Cx(a, b) => {
                            if a != b {
                                live.push(dag.apply_back(cx(a, b)).unwrap());
                            }
                        }
                        Step::RemoveLatest => {
                            if let Some(id) = live.pop() {
                                dag.remove_op(id).unwrap();
                            }
                        }
                    }
                    prop_assert!(dag.verify_integrity().is_ok());
                }
                prop_assert_eq!(dag.num_ops(), live.len());
            }
        }
    }
}
