//! Error types for the IR crate.

use crate::bit::{ClbitId, QubitId};
use crate::dag::NodeId;
use thiserror::Error;

/// Structural errors raised by IR operations.
///
/// Every mutation on the DAG either completes or raises one of these before
/// touching any edge; no partial mutation is left visible.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Wire is already registered in the circuit.
    #[error("Wire {0} is already registered in the circuit")]
    DuplicateWire(String),

    /// Classical register name is already registered.
    #[error("Classical register '{0}' is already registered")]
    DuplicateRegister(String),

    /// Qubit not found in circuit.
    #[error("Qubit {qubit:?} not found in circuit{}", format_op_context(.op_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Classical bit not found in circuit.
    #[error("Classical bit {clbit:?} not found in circuit{}", format_op_context(.op_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Duplicate qubit argument in one operation.
    #[error("Duplicate qubit {qubit:?} in operation{}", format_op_context(.op_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Duplicate classical bit argument in one operation.
    #[error("Duplicate classical bit {clbit:?} in operation{}", format_op_context(.op_name))]
    DuplicateClbit {
        /// The duplicate classical bit.
        clbit: ClbitId,
        /// Optional operation name for context.
        op_name: Option<String>,
    },

    /// Condition references a classical register that is not registered.
    #[error("Condition references unregistered classical register '{0}'")]
    UnknownConditionRegister(String),

    /// Node id does not reference a live node.
    #[error("Node {0:?} not found in circuit")]
    NodeNotFound(NodeId),

    /// Node id references an input or output node where an operation was expected.
    #[error("Node {0:?} is not an operation node")]
    NotAnOperation(NodeId),

    /// Replacement wire order does not match the substituted node.
    #[error("Wire order has {got} wires, substituted node spans {expected}")]
    WireCountMismatch {
        /// Wires spanned by the substituted node.
        expected: usize,
        /// Wires supplied by the caller.
        got: usize,
    },

    /// A spliced operation would write a bit its condition depends on.
    #[error("Substituted operations would alter condition bit {0:?}")]
    ConditionBitWrite(ClbitId),

    /// Circuits cannot be composed as requested.
    #[error("Cannot compose circuits: {0}")]
    ComposeMismatch(String),

    /// Invalid DAG structure.
    #[error("Invalid DAG structure: {0}")]
    InvalidDag(String),
}

/// Helper function to format optional operation context.
#[allow(clippy::ref_option)]
fn format_op_context(op_name: &Option<String>) -> String {
    match op_name {
        Some(name) => format!(" (operation: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
