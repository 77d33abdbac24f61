//! Benchmarks for Tangle DAG operations
//!
//! Run with: cargo bench -p tangle-ir

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tangle_ir::{Circuit, DagCircuit, Instruction, QubitId, StandardGate};

/// Benchmark appending operations to a DAG.
fn bench_apply_back(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_back");

    group.bench_function("h_gate", |b| {
        let mut dag = DagCircuit::new();
        dag.add_qubit(QubitId(0)).unwrap();
        b.iter(|| {
            dag.apply_back(black_box(Instruction::single_qubit_gate(
                StandardGate::H,
                QubitId(0),
            )))
            .unwrap();
        });
    });

    group.bench_function("cx_gate", |b| {
        let mut dag = DagCircuit::new();
        dag.add_qubit(QubitId(0)).unwrap();
        dag.add_qubit(QubitId(1)).unwrap();
        b.iter(|| {
            dag.apply_back(black_box(Instruction::two_qubit_gate(
                StandardGate::CX,
                QubitId(0),
                QubitId(1),
            )))
            .unwrap();
        });
    });

    group.finish();
}

/// Benchmark GHZ circuit construction through the builder.
fn bench_ghz_circuit(c: &mut Criterion) {
    let mut group = c.benchmark_group("ghz_circuit");

    for num_qubits in &[3u32, 10, 50, 100] {
        group.bench_with_input(
            BenchmarkId::new("create", num_qubits),
            num_qubits,
            |b, &n| {
                b.iter(|| black_box(Circuit::ghz(n).unwrap()));
            },
        );
    }

    group.finish();
}

/// Benchmark topological iteration and depth on layered circuits.
fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("traversal");

    for num_qubits in &[5u32, 20, 50] {
        let mut circuit = Circuit::with_size("bench", *num_qubits, 0);
        for _layer in 0..5 {
            for i in 0..*num_qubits {
                circuit.h(QubitId(i)).unwrap();
            }
            for i in (0..*num_qubits - 1).step_by(2) {
                circuit.cx(QubitId(i), QubitId(i + 1)).unwrap();
            }
        }
        let dag = circuit.into_dag();

        group.bench_with_input(BenchmarkId::new("depth", num_qubits), &dag, |b, dag| {
            b.iter(|| black_box(dag.depth()));
        });

        group.bench_with_input(
            BenchmarkId::new("topological_ops", num_qubits),
            &dag,
            |b, dag| {
                b.iter(|| black_box(dag.topological_ops().count()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_apply_back, bench_ghz_circuit, bench_traversal);

criterion_main!(benches);
