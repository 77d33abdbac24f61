//! `PropertySet` and the target-description types passes communicate with.
//!
//! During compilation, passes share information: the layout pass decides
//! which virtual qubits sit on which physical qubits, routing consults the
//! coupling map and rewrites the layout, scheduling consults the duration
//! table. The [`PropertySet`] is the shared context carried through one
//! pipeline run; it is created per circuit and discarded when the run ends.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::VecDeque;

use tangle_ir::QubitId;

use crate::durations::InstructionDurations;
use crate::error::{CompileError, CompileResult};

/// A mapping between virtual (circuit) qubits and physical (device) qubits.
///
/// The mapping is partial and injective: at most one physical slot per
/// virtual qubit and vice versa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Map from virtual qubit to physical qubit index.
    virtual_to_physical: FxHashMap<QubitId, u32>,
    /// Map from physical qubit index to virtual qubit.
    physical_to_virtual: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a trivial layout (virtual qubit i -> physical qubit i).
    pub fn trivial(num_qubits: u32) -> Self {
        let mut layout = Self::new();
        for i in 0..num_qubits {
            layout.add(QubitId(i), i);
        }
        layout
    }

    /// Add a mapping from virtual to physical qubit.
    ///
    /// Any prior occupant of either side is removed first, so the maps
    /// never hold dangling duplicate entries.
    pub fn add(&mut self, virt: QubitId, physical: u32) {
        if let Some(&old_virt) = self.physical_to_virtual.get(&physical) {
            if old_virt != virt {
                self.virtual_to_physical.remove(&old_virt);
            }
        }
        if let Some(&old_physical) = self.virtual_to_physical.get(&virt) {
            if old_physical != physical {
                self.physical_to_virtual.remove(&old_physical);
            }
        }
        self.virtual_to_physical.insert(virt, physical);
        self.physical_to_virtual.insert(physical, virt);
    }

    /// Get the physical qubit for a virtual qubit.
    pub fn get_physical(&self, virt: QubitId) -> Option<u32> {
        self.virtual_to_physical.get(&virt).copied()
    }

    /// Get the virtual qubit for a physical qubit.
    pub fn get_virtual(&self, physical: u32) -> Option<QubitId> {
        self.physical_to_virtual.get(&physical).copied()
    }

    /// Exchange the virtual qubits assigned to two physical slots.
    ///
    /// Used by routing after it inserts a SWAP, so later adjacency checks
    /// see the updated mapping. Either slot may be unoccupied.
    pub fn swap(&mut self, p1: u32, p2: u32) {
        let v1 = self.physical_to_virtual.get(&p1).copied();
        let v2 = self.physical_to_virtual.get(&p2).copied();

        if let Some(v1) = v1 {
            self.virtual_to_physical.insert(v1, p2);
            self.physical_to_virtual.insert(p2, v1);
        } else {
            self.physical_to_virtual.remove(&p2);
        }

        if let Some(v2) = v2 {
            self.virtual_to_physical.insert(v2, p1);
            self.physical_to_virtual.insert(p1, v2);
        } else {
            self.physical_to_virtual.remove(&p1);
        }
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.virtual_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.virtual_to_physical.is_empty()
    }

    /// Iterate over (virtual, physical) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        self.virtual_to_physical.iter().map(|(&v, &p)| (v, p))
    }
}

/// Target device coupling map.
///
/// The coupling map is the device's allowed two-qubit interaction graph,
/// supplied as a list of directed physical-qubit edge pairs and immutable
/// for the duration of a compilation run. Adjacency and distance queries
/// are evaluated symmetrically: a SWAP is a symmetric interaction, and a
/// routed gate only needs its operand pair to interact.
///
/// ## Performance
///
/// Distance and predecessor matrices are precomputed with one BFS per
/// node, giving O(1) `distance` lookups and O(length) `shortest_path`
/// reconstruction during routing. Adding an edge invalidates the
/// matrices; they are rebuilt on the next query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMap {
    /// List of coupled qubit pairs, as supplied.
    edges: Vec<(u32, u32)>,
    /// Number of physical qubits.
    num_qubits: u32,
    /// Symmetrized adjacency list.
    #[serde(skip)]
    adjacency: FxHashMap<u32, Vec<u32>>,
    /// All-pairs distance matrix; `u32::MAX` marks unreachable pairs.
    #[serde(skip)]
    dist_matrix: Vec<Vec<u32>>,
    /// Predecessor matrix for shortest-path reconstruction.
    #[serde(skip)]
    pred_matrix: Vec<Vec<u32>>,
}

impl CouplingMap {
    /// Create a new coupling map with the given number of qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            edges: vec![],
            num_qubits,
            adjacency: FxHashMap::default(),
            dist_matrix: vec![],
            pred_matrix: vec![],
        }
    }

    /// Create a coupling map from an edge list.
    pub fn from_edges(num_qubits: u32, edges: &[(u32, u32)]) -> Self {
        let mut map = Self::new(num_qubits);
        for &(a, b) in edges {
            map.add_edge(a, b);
        }
        map.rebuild_caches();
        map
    }

    /// Add a directed edge between two qubits.
    ///
    /// Exact duplicate edges are silently ignored. Any precomputed
    /// distance data is invalidated.
    pub fn add_edge(&mut self, from: u32, to: u32) {
        if self.edges.contains(&(from, to)) {
            return;
        }
        self.edges.push((from, to));
        let fwd = self.adjacency.entry(from).or_default();
        if !fwd.contains(&to) {
            fwd.push(to);
        }
        let rev = self.adjacency.entry(to).or_default();
        if !rev.contains(&from) {
            rev.push(from);
        }
        self.dist_matrix.clear();
        self.pred_matrix.clear();
    }

    /// Rebuild the adjacency list and distance/predecessor matrices from
    /// the edge list. Also needed after deserialization, which skips the
    /// derived caches.
    pub fn rebuild_caches(&mut self) {
        self.adjacency.clear();
        for &(from, to) in &self.edges {
            let fwd = self.adjacency.entry(from).or_default();
            if !fwd.contains(&to) {
                fwd.push(to);
            }
            let rev = self.adjacency.entry(to).or_default();
            if !rev.contains(&from) {
                rev.push(from);
            }
        }

        let n = self.num_qubits as usize;
        self.dist_matrix = vec![vec![u32::MAX; n]; n];
        self.pred_matrix = vec![vec![u32::MAX; n]; n];

        for src in 0..n {
            self.dist_matrix[src][src] = 0;
            let mut queue = VecDeque::new();
            queue.push_back(src as u32);

            while let Some(current) = queue.pop_front() {
                let cur = current as usize;
                for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                    let nb = neighbor as usize;
                    if self.dist_matrix[src][nb] == u32::MAX {
                        self.dist_matrix[src][nb] = self.dist_matrix[src][cur] + 1;
                        self.pred_matrix[src][nb] = current;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    fn matrices_ready(&self) -> bool {
        self.dist_matrix.len() == self.num_qubits as usize
    }

    /// Check if two qubits may interact directly (either edge direction).
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.adjacency
            .get(&q1)
            .is_some_and(|neighbors| neighbors.contains(&q2))
    }

    /// Get the number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the coupling edges as supplied.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Get neighbors of a qubit.
    pub fn neighbors(&self, qubit: u32) -> impl Iterator<Item = u32> + '_ {
        self.adjacency
            .get(&qubit)
            .map(|v| v.iter().copied())
            .into_iter()
            .flatten()
    }

    /// Create a linear coupling map (0-1-2-3-...).
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(i, i + 1);
        }
        map.rebuild_caches();
        map
    }

    /// Create a fully connected coupling map.
    pub fn full(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n {
            for j in (i + 1)..n {
                map.add_edge(i, j);
            }
        }
        map.rebuild_caches();
        map
    }

    /// Create a star topology (qubit 0 connected to all others).
    pub fn star(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 1..n {
            map.add_edge(0, i);
        }
        map.rebuild_caches();
        map
    }

    /// Shortest-path hop count between two physical qubits.
    ///
    /// Fails with a connectivity error when no path exists.
    pub fn distance(&self, from: u32, to: u32) -> CompileResult<u32> {
        if from == to {
            return Ok(0);
        }
        if from >= self.num_qubits || to >= self.num_qubits {
            return Err(CompileError::RoutingFailed {
                qubit1: from,
                qubit2: to,
            });
        }

        let d = if self.matrices_ready() {
            self.dist_matrix[from as usize][to as usize]
        } else {
            self.distance_bfs(from, to).unwrap_or(u32::MAX)
        };

        if d == u32::MAX {
            Err(CompileError::RoutingFailed {
                qubit1: from,
                qubit2: to,
            })
        } else {
            Ok(d)
        }
    }

    /// One shortest path from `from` to `to`, endpoints included.
    ///
    /// Fails with a connectivity error when no path exists.
    pub fn shortest_path(&self, from: u32, to: u32) -> CompileResult<Vec<u32>> {
        if from == to {
            return Ok(vec![from]);
        }
        // The distance check also validates the qubit indices.
        self.distance(from, to)?;

        if self.matrices_ready() {
            let f = from as usize;
            let mut path = vec![to];
            let mut current = to;
            while current != from {
                let pred = self.pred_matrix[f][current as usize];
                if pred == u32::MAX {
                    return Err(CompileError::RoutingFailed {
                        qubit1: from,
                        qubit2: to,
                    });
                }
                path.push(pred);
                current = pred;
            }
            path.reverse();
            return Ok(path);
        }

        self.path_bfs(from, to).ok_or(CompileError::RoutingFailed {
            qubit1: from,
            qubit2: to,
        })
    }

    /// BFS fallback for distance computation on maps without caches.
    fn distance_bfs(&self, from: u32, to: u32) -> Option<u32> {
        let mut visited = FxHashMap::default();
        let mut queue = VecDeque::new();
        queue.push_back((from, 0u32));
        visited.insert(from, 0u32);

        while let Some((current, dist)) = queue.pop_front() {
            for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                if neighbor == to {
                    return Some(dist + 1);
                }
                if let std::collections::hash_map::Entry::Vacant(e) = visited.entry(neighbor) {
                    e.insert(dist + 1);
                    queue.push_back((neighbor, dist + 1));
                }
            }
        }

        None
    }

    /// BFS fallback for path reconstruction on maps without caches.
    fn path_bfs(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        let mut prev: FxHashMap<u32, u32> = FxHashMap::default();
        let mut queue = VecDeque::new();
        prev.insert(from, from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for &neighbor in self.adjacency.get(&current).into_iter().flatten() {
                if prev.contains_key(&neighbor) {
                    continue;
                }
                prev.insert(neighbor, current);
                if neighbor == to {
                    let mut path = vec![to];
                    let mut node = to;
                    while node != from {
                        node = prev[&node];
                        path.push(node);
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(neighbor);
            }
        }

        None
    }
}

/// Basis gates for the target device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasisGates {
    /// List of gate names in the basis.
    gates: Vec<String>,
}

impl BasisGates {
    /// Create a new basis gates set.
    pub fn new(gates: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            gates: gates.into_iter().map(std::convert::Into::into).collect(),
        }
    }

    /// Check if a gate is in the basis.
    pub fn contains(&self, gate: &str) -> bool {
        self.gates.iter().any(|g| g == gate)
    }

    /// Get the basis gates.
    pub fn gates(&self) -> &[String] {
        &self.gates
    }

    /// Create IBM-style basis gates (RZ + SX + X + CX).
    pub fn ibm() -> Self {
        Self::new(["rz", "sx", "x", "cx", "measure", "barrier", "id"])
    }

    /// Create a universal basis (all standard gates).
    pub fn universal() -> Self {
        Self::new([
            "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg", "rx", "ry", "rz", "p",
            "u", "cx", "cy", "cz", "ch", "swap", "iswap", "cp", "crz", "rzz", "ccx", "cswap",
            "measure", "reset", "barrier", "delay",
        ])
    }
}

/// Properties shared between compilation passes.
///
/// Standard properties — layout, coupling map, basis gates, instruction
/// durations — have dedicated fields. Analysis passes publish arbitrary
/// payloads through the type-keyed store: each payload type has at most
/// one value, and the payload type itself names the analysis that produced
/// it.
///
/// # Examples
///
/// ```
/// use tangle_compile::{PropertySet, CouplingMap, BasisGates};
///
/// let props = PropertySet::new()
///     .with_target(CouplingMap::linear(5), BasisGates::ibm());
///
/// let cm = props.coupling_map.as_ref().unwrap();
/// assert!(cm.is_connected(0, 1));
/// assert!(!cm.is_connected(0, 2));
/// ```
#[derive(Debug, Default)]
pub struct PropertySet {
    /// Qubit layout mapping (virtual → physical).
    ///
    /// Set by layout passes, rewritten in place by routing.
    pub layout: Option<Layout>,

    /// Target coupling map defining allowed two-qubit interactions.
    pub coupling_map: Option<CouplingMap>,

    /// Target basis gates.
    pub basis_gates: Option<BasisGates>,

    /// Instruction duration table for scheduling.
    pub durations: Option<InstructionDurations>,

    /// Analysis payload storage (type-erased).
    custom: FxHashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: CouplingMap, basis_gates: BasisGates) -> Self {
        self.coupling_map = Some(coupling_map);
        self.basis_gates = Some(basis_gates);
        self
    }

    /// Set the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Set the instruction duration table.
    #[must_use]
    pub fn with_durations(mut self, durations: InstructionDurations) -> Self {
        self.durations = Some(durations);
        self
    }

    /// Insert an analysis payload, replacing any previous value of the
    /// same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) {
        self.custom.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get an analysis payload.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.custom
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Get a mutable analysis payload.
    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.custom
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Remove an analysis payload.
    pub fn remove<T: Any>(&mut self) -> Option<T> {
        self.custom
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_trivial() {
        let layout = Layout::trivial(5);
        assert_eq!(layout.get_physical(QubitId(0)), Some(0));
        assert_eq!(layout.get_physical(QubitId(4)), Some(4));
        assert_eq!(layout.get_virtual(2), Some(QubitId(2)));
        assert_eq!(layout.len(), 5);
    }

    #[test]
    fn test_layout_swap() {
        let mut layout = Layout::trivial(3);
        layout.swap(0, 2);

        assert_eq!(layout.get_physical(QubitId(0)), Some(2));
        assert_eq!(layout.get_physical(QubitId(2)), Some(0));
        assert_eq!(layout.get_virtual(0), Some(QubitId(2)));
        assert_eq!(layout.get_virtual(2), Some(QubitId(0)));
    }

    #[test]
    fn test_layout_swap_with_empty_slot() {
        let mut layout = Layout::trivial(2);
        layout.swap(1, 4);

        assert_eq!(layout.get_physical(QubitId(1)), Some(4));
        assert_eq!(layout.get_virtual(1), None);
        assert_eq!(layout.get_virtual(4), Some(QubitId(1)));
    }

    #[test]
    fn test_layout_add_evicts_conflicts() {
        let mut layout = Layout::trivial(2);
        layout.add(QubitId(0), 1);

        assert_eq!(layout.get_physical(QubitId(0)), Some(1));
        // Qubit 1 lost its slot to qubit 0.
        assert_eq!(layout.get_physical(QubitId(1)), None);
        assert_eq!(layout.get_virtual(0), None);
    }

    #[test]
    fn test_layout_serde_roundtrip() {
        let layout = Layout::trivial(3);
        let json = serde_json::to_string(&layout).unwrap();
        let back: Layout = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get_physical(QubitId(2)), Some(2));
    }

    #[test]
    fn test_coupling_map_linear() {
        let map = CouplingMap::linear(5);
        assert!(map.is_connected(0, 1));
        assert!(map.is_connected(1, 0));
        assert!(!map.is_connected(0, 2));
        assert_eq!(map.distance(0, 4).unwrap(), 4);
        assert_eq!(map.shortest_path(0, 3).unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_coupling_map_star() {
        let map = CouplingMap::star(5);
        assert!(map.is_connected(0, 4));
        assert!(!map.is_connected(1, 2));
        assert_eq!(map.distance(1, 2).unwrap(), 2);
    }

    #[test]
    fn test_coupling_map_disconnected() {
        let map = CouplingMap::from_edges(4, &[(0, 1), (2, 3)]);
        assert!(matches!(
            map.distance(0, 3),
            Err(CompileError::RoutingFailed {
                qubit1: 0,
                qubit2: 3
            })
        ));
        assert!(map.shortest_path(1, 2).is_err());
    }

    #[test]
    fn test_coupling_map_directed_edges_symmetric_queries() {
        let map = CouplingMap::from_edges(3, &[(0, 1), (1, 2)]);
        assert_eq!(map.edges(), &[(0, 1), (1, 2)]);
        assert_eq!(map.distance(2, 0).unwrap(), 2);
        assert_eq!(map.shortest_path(2, 0).unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn test_coupling_map_add_edge_invalidates_cache() {
        let mut map = CouplingMap::linear(4);
        assert_eq!(map.distance(0, 3).unwrap(), 3);
        map.add_edge(0, 3);
        assert_eq!(map.distance(0, 3).unwrap(), 1);
    }

    #[test]
    fn test_basis_gates() {
        let ibm = BasisGates::ibm();
        assert!(ibm.contains("cx"));
        assert!(ibm.contains("rz"));
        assert!(!ibm.contains("ccx"));
        assert!(BasisGates::universal().contains("ccx"));
    }

    #[test]
    #[allow(clippy::items_after_statements)]
    fn test_property_set_custom() {
        let mut props = PropertySet::new();

        #[derive(Debug, PartialEq)]
        struct CustomData(i32);

        props.insert(CustomData(42));
        assert_eq!(props.get::<CustomData>(), Some(&CustomData(42)));

        let removed = props.remove::<CustomData>();
        assert_eq!(removed, Some(CustomData(42)));
        assert_eq!(props.get::<CustomData>(), None);
    }
}
