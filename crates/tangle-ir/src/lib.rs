//! Tangle Circuit Intermediate Representation
//!
//! This crate provides the core data structures for representing quantum
//! circuits in Tangle. It is the foundation the compilation pipeline in
//! `tangle-compile` is built on.
//!
//! # Overview
//!
//! Circuits are held as a DAG (directed acyclic multigraph): one input and
//! one output node per wire, operation nodes threaded along the wires they
//! touch, and every edge labeled with exactly one wire. The representation
//! supports the structural rewrites compilation passes need — appending and
//! prepending operations, removing them, splicing in replacement
//! sub-circuits, and composing whole circuits — while keeping the wire
//! path and acyclicity invariants intact across every mutation.
//!
//! # Core Components
//!
//! - **Bits**: [`QubitId`], [`ClbitId`] for addressing quantum and
//!   classical wires
//! - **Gates**: [`StandardGate`] for built-in gates (H, X, CX, ...) and
//!   [`CustomGate`] for user-defined operations
//! - **Parameters**: [`ParameterExpression`] for symbolic angles in
//!   variational circuits
//! - **Instructions**: [`Instruction`] combining an operation with its
//!   operands and optional classical condition
//! - **DAG**: [`DagCircuit`], the graph representation passes operate on
//! - **Circuit**: [`Circuit`], the high-level builder API
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use tangle_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//!
//! // |00⟩ → (|00⟩ + |11⟩)/√2
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Example: Rewriting the DAG directly
//!
//! ```rust
//! use tangle_ir::{DagCircuit, Instruction, QubitId, StandardGate};
//!
//! let mut dag = DagCircuit::new();
//! dag.add_qubit(QubitId(0)).unwrap();
//! let node = dag
//!     .apply_back(Instruction::single_qubit_gate(StandardGate::H, QubitId(0)))
//!     .unwrap();
//!
//! // Removing the operation reconnects the wire it sat on.
//! dag.remove_op(node).unwrap();
//! assert_eq!(dag.num_ops(), 0);
//! assert!(dag.verify_integrity().is_ok());
//! ```

pub mod bit;
pub mod circuit;
pub mod dag;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod parameter;

pub use bit::{Clbit, ClbitId, Qubit, QubitId};
pub use circuit::Circuit;
pub use dag::{DagCircuit, DagEdge, DagNode, NodeId, WireId};
pub use error::{IrError, IrResult};
pub use gate::{ClassicalCondition, CustomGate, GateKind, StandardGate};
pub use instruction::{Instruction, InstructionKind};
pub use parameter::{BinaryOp, ParameterExpression};
