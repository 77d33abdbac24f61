//! Tests for the commutation-aware optimization passes.

use std::f64::consts::PI;

use tangle_ir::{Circuit, DagCircuit, QubitId, StandardGate};

use crate::pass::Pass;
use crate::property::PropertySet;

use super::{CommutationAnalysis, GateCancellation};

/// Run commutation analysis followed by gate cancellation once.
fn cancel(dag: &mut DagCircuit) {
    let mut props = PropertySet::new();
    CommutationAnalysis.run(dag, &mut props).unwrap();
    GateCancellation.run(dag, &mut props).unwrap();
    dag.verify_integrity().unwrap();
}

#[test]
fn test_hh_cancels() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn test_hhh_leaves_one() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 1);
    assert_eq!(dag.count_ops().get("h"), Some(&1));
}

#[test]
fn test_h_z_h_does_not_cancel() {
    // Z does not commute with H, so the two H gates sit in different
    // commutation groups.
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.z(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 3);
}

#[test]
fn test_z_pair_cancels_through_commuting_phase() {
    // p commutes with z, so z · p · z is one group: the two z cancel and
    // the phase survives.
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.z(QubitId(0)).unwrap();
    circuit.p(PI / 8.0, QubitId(0)).unwrap();
    circuit.z(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 1);
    assert_eq!(dag.count_ops().get("p"), Some(&1));
}

#[test]
fn test_cx_pair_cancels() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 0);
}

#[test]
fn test_cx_pair_cancels_across_commuting_z() {
    // Z on the control commutes with CX, so the pair still cancels.
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.z(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 1);
    assert_eq!(dag.count_ops().get("z"), Some(&1));
}

#[test]
fn test_cx_pair_blocked_by_h_on_control() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 3);
}

#[test]
fn test_reversed_cx_does_not_cancel() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.cx(QubitId(1), QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 2);
}

#[test]
fn test_z_rotation_run_fuses_to_one_phase_gate() {
    let angles = [PI / 4.0, PI / 8.0, PI / 16.0];
    let mut circuit = Circuit::with_size("test", 1, 0);
    for angle in angles {
        circuit.p(angle, QubitId(0)).unwrap();
    }
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 1);

    let (_, inst) = dag.topological_ops().next().unwrap();
    let Some(StandardGate::P(param)) = inst.as_standard_gate() else {
        panic!("expected a fused phase gate, got {}", inst.name());
    };
    let total: f64 = angles.iter().sum();
    assert!((param.as_f64().unwrap() - total).abs() < 1e-12);
}

#[test]
fn test_mixed_rz_and_p_fuse() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rz(0.5, QubitId(0)).unwrap();
    circuit.p(0.25, QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 1);

    let (_, inst) = dag.topological_ops().next().unwrap();
    let Some(StandardGate::P(param)) = inst.as_standard_gate() else {
        panic!("expected a fused phase gate, got {}", inst.name());
    };
    assert!((param.as_f64().unwrap() - 0.75).abs() < 1e-12);
}

#[test]
fn test_rotation_angles_sum_without_modulo() {
    // 3π/2 + 3π/2 = 3π stays 3π; no wrap-around to π.
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rz(3.0 * PI / 2.0, QubitId(0)).unwrap();
    circuit.rz(3.0 * PI / 2.0, QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    let (_, inst) = dag.topological_ops().next().unwrap();
    let Some(StandardGate::P(param)) = inst.as_standard_gate() else {
        panic!("expected a fused phase gate, got {}", inst.name());
    };
    assert!((param.as_f64().unwrap() - 3.0 * PI).abs() < 1e-12);
}

#[test]
fn test_symbolic_rotation_is_left_alone() {
    use tangle_ir::{Instruction, ParameterExpression};

    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.rz(0.5, QubitId(0)).unwrap();
    circuit
        .append(Instruction::single_qubit_gate(
            StandardGate::Rz(ParameterExpression::symbol("theta")),
            QubitId(0),
        ))
        .unwrap();
    circuit.rz(0.25, QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    // The symbolic rotation splits the groups; nothing fuses across it.
    assert_eq!(dag.num_ops(), 3);
}

#[test]
fn test_cancellation_on_parallel_wires() {
    let mut circuit = Circuit::with_size("test", 2, 0);
    circuit.h(QubitId(0)).unwrap();
    circuit.h(QubitId(0)).unwrap();
    circuit.x(QubitId(1)).unwrap();
    circuit.x(QubitId(1)).unwrap();
    circuit.x(QubitId(1)).unwrap();
    let mut dag = circuit.into_dag();

    cancel(&mut dag);
    assert_eq!(dag.num_ops(), 1);
    assert_eq!(dag.count_ops().get("x"), Some(&1));
}

#[test]
fn test_cancellation_requires_analysis() {
    let mut circuit = Circuit::with_size("test", 1, 0);
    circuit.h(QubitId(0)).unwrap();
    let mut dag = circuit.into_dag();

    let mut props = PropertySet::new();
    let result = GateCancellation.run(&mut dag, &mut props);
    assert!(matches!(
        result,
        Err(crate::error::CompileError::UnsatisfiedRequirement(_))
    ));
}
