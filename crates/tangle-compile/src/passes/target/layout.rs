//! Layout passes for mapping virtual qubits to physical qubits.

use tangle_ir::DagCircuit;

use crate::error::{CompileError, CompileResult};
use crate::pass::{Pass, PassKind};
use crate::property::{Layout, PropertySet};

/// Trivial layout pass.
///
/// Maps virtual qubit i to physical qubit i, in circuit declaration
/// order. Works whenever the circuit fits the device and no placement
/// optimization is wanted.
pub struct TrivialLayout;

impl Pass for TrivialLayout {
    fn name(&self) -> &'static str {
        "TrivialLayout"
    }

    fn kind(&self) -> PassKind {
        PassKind::Analysis
    }

    #[allow(clippy::cast_possible_truncation)]
    fn run(&self, dag: &mut DagCircuit, properties: &mut PropertySet) -> CompileResult<()> {
        let coupling_map = properties
            .coupling_map
            .as_ref()
            .ok_or(CompileError::MissingCouplingMap)?;

        let num_virtual = dag.num_qubits();
        let num_physical = coupling_map.num_qubits() as usize;
        if num_virtual > num_physical {
            return Err(CompileError::CircuitTooLarge {
                required: num_virtual,
                available: coupling_map.num_qubits(),
            });
        }

        properties.layout = Some(Layout::trivial(num_virtual as u32));
        Ok(())
    }

    fn should_run(&self, _dag: &DagCircuit, properties: &PropertySet) -> bool {
        // Skip when a layout was already chosen (externally supplied or by
        // an earlier layout pass).
        properties.layout.is_none() && properties.coupling_map.is_some()
    }
}
