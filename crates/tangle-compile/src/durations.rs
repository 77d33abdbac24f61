//! Instruction duration table for scheduling.

use rustc_hash::FxHashMap;

use tangle_ir::{Instruction, InstructionKind};

use crate::error::{CompileError, CompileResult};

/// Durations of instructions, keyed by name and optionally by the exact
/// qubit tuple. One of the scheduling inputs supplied by the caller.
///
/// Lookups try the (name, qubits) entry first and fall back to the
/// per-name default. Barriers take no time; a delay reports its own
/// duration. A missing entry is a fatal error — there is no silent
/// default duration.
#[derive(Debug, Clone)]
pub struct InstructionDurations {
    /// Per-name default durations.
    by_name: FxHashMap<String, u64>,
    /// Durations for an instruction on a specific qubit tuple.
    by_name_qubits: FxHashMap<(String, Vec<u32>), u64>,
    /// The time unit every entry is expressed in (e.g. "dt" or "ns").
    unit: String,
}

impl InstructionDurations {
    /// Create an empty duration table with the given time unit.
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            by_name: FxHashMap::default(),
            by_name_qubits: FxHashMap::default(),
            unit: unit.into(),
        }
    }

    /// Create a table from (name, qubits, duration) entries.
    ///
    /// `None` qubits registers a per-name default.
    pub fn from_entries(
        entries: &[(&str, Option<&[u32]>, u64)],
        unit: impl Into<String>,
    ) -> Self {
        let mut durations = Self::new(unit);
        for &(name, qubits, duration) in entries {
            durations.add(name, qubits, duration);
        }
        durations
    }

    /// Add or overwrite an entry.
    pub fn add(&mut self, name: &str, qubits: Option<&[u32]>, duration: u64) {
        match qubits {
            Some(qubits) => {
                self.by_name_qubits
                    .insert((name.to_string(), qubits.to_vec()), duration);
            }
            None => {
                self.by_name.insert(name.to_string(), duration);
            }
        }
    }

    /// Get the time unit.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Get the duration of an instruction on its qubits.
    pub fn get(&self, instruction: &Instruction) -> CompileResult<u64> {
        match &instruction.kind {
            InstructionKind::Barrier => return Ok(0),
            InstructionKind::Delay { duration } => return Ok(*duration),
            _ => {}
        }

        let qubits: Vec<u32> = instruction.qubits.iter().map(|q| q.0).collect();
        let name = instruction.name();

        if let Some(&duration) = self
            .by_name_qubits
            .get(&(name.to_string(), qubits.clone()))
        {
            return Ok(duration);
        }
        if let Some(&duration) = self.by_name.get(name) {
            return Ok(duration);
        }

        Err(CompileError::MissingDuration {
            name: name.to_string(),
            qubits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_ir::{ClbitId, QubitId, StandardGate};

    #[test]
    fn test_name_fallback_and_override() {
        let durations = InstructionDurations::from_entries(
            &[
                ("h", None, 10),
                ("cx", None, 100),
                ("cx", Some(&[1, 2]), 120),
            ],
            "dt",
        );

        let generic = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1));
        assert_eq!(durations.get(&generic).unwrap(), 100);

        let calibrated = Instruction::two_qubit_gate(StandardGate::CX, QubitId(1), QubitId(2));
        assert_eq!(durations.get(&calibrated).unwrap(), 120);
    }

    #[test]
    fn test_barrier_and_delay() {
        let durations = InstructionDurations::new("dt");
        assert_eq!(
            durations
                .get(&Instruction::barrier([QubitId(0), QubitId(1)]))
                .unwrap(),
            0
        );
        assert_eq!(
            durations.get(&Instruction::delay(QubitId(0), 42)).unwrap(),
            42
        );
    }

    #[test]
    fn test_missing_duration_is_fatal() {
        let durations = InstructionDurations::from_entries(&[("h", None, 10)], "dt");
        let measure = Instruction::measure(QubitId(3), ClbitId(0));
        match durations.get(&measure) {
            Err(CompileError::MissingDuration { name, qubits }) => {
                assert_eq!(name, "measure");
                assert_eq!(qubits, vec![3]);
            }
            other => panic!("Expected MissingDuration, got {other:?}"),
        }
    }
}
