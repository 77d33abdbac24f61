//! Tangle Compilation and Transpilation Framework
//!
//! This crate rewrites quantum circuits for execution on constrained
//! hardware: device connectivity, a restricted gate basis, and timing.
//! It implements a pass-based architecture over the `tangle-ir` circuit
//! DAG, in the LLVM tradition: small analysis and transformation passes,
//! sequenced and looped by a pass manager, communicating through a shared
//! property set.
//!
//! # Architecture
//!
//! ```text
//! Input DAG
//!     │
//!     ▼
//! ┌─────────────┐
//! │ PassManager │ ◄── PropertySet (coupling map, layout, durations, ...)
//! └─────────────┘
//!     │
//!     ├── TrivialLayout
//!     ├── StochasticRouting
//!     ├── CommutationAnalysis ─► GateCancellation ─► DagFixedPoint  (loop)
//!     └── AsapSchedule
//!     │
//!     ▼
//! Output DAG + final Layout
//! ```
//!
//! # Example: Basic Compilation
//!
//! ```rust
//! use tangle_compile::{BasisGates, CouplingMap, PassManagerBuilder};
//! use tangle_ir::Circuit;
//!
//! let circuit = Circuit::bell().unwrap();
//!
//! let (pm, mut props) = PassManagerBuilder::new()
//!     .with_optimization_level(2)
//!     .with_target(CouplingMap::linear(5), BasisGates::universal())
//!     .build();
//!
//! let mut dag = circuit.into_dag();
//! pm.run(&mut dag, &mut props).unwrap();
//!
//! // The final layout maps virtual qubits to physical positions.
//! assert!(props.layout.is_some());
//! ```
//!
//! # Built-in Passes
//!
//! - [`passes::TrivialLayout`]: 1:1 virtual-to-physical mapping
//! - [`passes::StochasticRouting`]: multi-trial shortest-path SWAP
//!   insertion for connectivity
//! - [`passes::CommutationAnalysis`]: per-wire commutation groups
//! - [`passes::GateCancellation`]: self-inverse pair cancellation and
//!   z-rotation fusion inside commutation groups
//! - [`passes::DagFixedPoint`]: convergence detection for the
//!   optimization loop
//! - [`passes::AsapSchedule`]: as-soon-as-possible scheduling with
//!   explicit delay padding
//!
//! # Custom Passes
//!
//! Implement the [`Pass`] trait to add a pass:
//!
//! ```rust
//! use tangle_compile::{CompileResult, Pass, PassKind, PropertySet};
//! use tangle_ir::DagCircuit;
//!
//! struct MyCustomPass;
//!
//! impl Pass for MyCustomPass {
//!     fn name(&self) -> &'static str { "my_custom_pass" }
//!     fn kind(&self) -> PassKind { PassKind::Transformation }
//!
//!     fn run(&self, dag: &mut DagCircuit, props: &mut PropertySet) -> CompileResult<()> {
//!         // Pass logic here.
//!         Ok(())
//!     }
//! }
//! ```

pub mod durations;
pub mod error;
pub mod manager;
pub mod matrix;
pub mod pass;
pub mod property;

// Built-in passes
pub mod passes;

pub use durations::InstructionDurations;
pub use error::{CompileError, CompileResult};
pub use manager::{PassManager, PassManagerBuilder};
pub use pass::{Pass, PassId, PassKind};
pub use property::{BasisGates, CouplingMap, Layout, PropertySet};
