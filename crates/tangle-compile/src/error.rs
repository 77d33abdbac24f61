//! Error types for the compilation framework.

use tangle_ir::IrError;
use thiserror::Error;

/// Errors that can occur during compilation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// No coupling map was configured for a pass that needs one.
    #[error("No coupling map configured")]
    MissingCouplingMap,

    /// No layout was configured for a pass that needs one.
    #[error("No layout configured")]
    MissingLayout,

    /// No instruction duration table was configured for scheduling.
    #[error("No instruction durations configured")]
    MissingDurations,

    /// Circuit requires more qubits than the device provides.
    #[error("Circuit requires {required} qubits but device has {available}")]
    CircuitTooLarge {
        /// Qubits required by the circuit.
        required: usize,
        /// Physical qubits available on the device.
        available: u32,
    },

    /// No path between two physical qubits in the coupling map.
    #[error("No path between physical qubits {qubit1} and {qubit2}")]
    RoutingFailed {
        /// First physical qubit.
        qubit1: u32,
        /// Second physical qubit.
        qubit2: u32,
    },

    /// No duration is known for an instruction.
    #[error("Duration of '{name}' on qubits {qubits:?} is not found")]
    MissingDuration {
        /// Instruction name.
        name: String,
        /// Qubit indices the instruction acts on.
        qubits: Vec<u32>,
    },

    /// A pass ran without a prerequisite analysis result.
    #[error("Pass requirement not satisfied: {0}")]
    UnsatisfiedRequirement(String),

    /// A pass was constructed or invoked with an invalid parameter.
    #[error("Invalid pass parameter: {0}")]
    InvalidParameter(String),

    /// An internal consistency check failed.
    #[error("Internal error: {0}")]
    Internal(String),

    /// An IR operation failed.
    #[error(transparent)]
    Ir(#[from] IrError),
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
