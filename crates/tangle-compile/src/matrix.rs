//! Dense unitary matrices for gate analysis.
//!
//! Provides small complex square matrices with the operations commutation
//! checking needs: multiplication, embedding of a k-qubit operator into a
//! larger qubit support, and elementwise approximate comparison. Only the
//! fixed allow-list of standard gates has a known matrix; everything else
//! is opaque to analysis.

use num_complex::Complex64;
use std::f64::consts::FRAC_PI_4;

use tangle_ir::{Instruction, StandardGate};

/// Tolerance for elementwise matrix comparisons.
pub const EPSILON: f64 = 1e-10;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A dense complex square matrix in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Unitary {
    /// Matrix dimension (rows == columns).
    dim: usize,
    /// Elements in row-major order, `dim * dim` entries.
    data: Vec<Complex64>,
}

impl Unitary {
    /// Create a matrix from row-major data.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != dim * dim`.
    pub fn from_vec(dim: usize, data: Vec<Complex64>) -> Self {
        assert_eq!(
            data.len(),
            dim * dim,
            "matrix data length {} does not match dimension {dim}",
            data.len()
        );
        Self { dim, data }
    }

    /// The zero matrix.
    fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![ZERO; dim * dim],
        }
    }

    /// The identity matrix.
    pub fn identity(dim: usize) -> Self {
        let mut m = Self::zeros(dim);
        for i in 0..dim {
            m.data[i * dim + i] = ONE;
        }
        m
    }

    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Get one element.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.dim + col]
    }

    /// Matrix product `self · other`.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn mul(&self, other: &Unitary) -> Unitary {
        assert_eq!(self.dim, other.dim, "dimension mismatch in matrix product");
        let dim = self.dim;
        let mut out = Self::zeros(dim);
        for row in 0..dim {
            for k in 0..dim {
                let a = self.data[row * dim + k];
                if a == ZERO {
                    continue;
                }
                for col in 0..dim {
                    out.data[row * dim + col] += a * other.data[k * dim + col];
                }
            }
        }
        out
    }

    /// Embed this k-qubit operator into an `num_qubits`-qubit space.
    ///
    /// `positions[j]` is the position (0 = most significant bit of the
    /// basis index) that the operator's j-th qubit occupies in the larger
    /// space. This covers plain Kronecker products, identity padding, and
    /// reversed-operand tensor-factor swaps uniformly.
    pub fn embed(&self, positions: &[usize], num_qubits: usize) -> Unitary {
        let k = positions.len();
        assert_eq!(self.dim, 1 << k, "operator dimension does not match positions");
        let dim = 1usize << num_qubits;
        let bit_of = |pos: usize| num_qubits - 1 - pos;

        let mut rest_mask = dim - 1;
        for &pos in positions {
            rest_mask &= !(1usize << bit_of(pos));
        }

        let mut out = Self::zeros(dim);
        for row in 0..dim {
            for col in 0..dim {
                // Bits outside the operator's support must be unchanged.
                if row & rest_mask != col & rest_mask {
                    continue;
                }
                let mut sub_row = 0usize;
                let mut sub_col = 0usize;
                for (j, &pos) in positions.iter().enumerate() {
                    let bit = bit_of(pos);
                    sub_row |= ((row >> bit) & 1) << (k - 1 - j);
                    sub_col |= ((col >> bit) & 1) << (k - 1 - j);
                }
                out.data[row * dim + col] = self.data[sub_row * self.dim + sub_col];
            }
        }
        out
    }

    /// Elementwise approximate equality.
    pub fn approx_eq(&self, other: &Unitary, eps: f64) -> bool {
        self.dim == other.dim
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| (a - b).norm() <= eps)
    }
}

fn single(data: [Complex64; 4]) -> Unitary {
    Unitary::from_vec(2, data.to_vec())
}

fn controlled(block: [Complex64; 4]) -> Unitary {
    let mut m = Unitary::identity(4);
    m.data[2 * 4 + 2] = block[0];
    m.data[2 * 4 + 3] = block[1];
    m.data[3 * 4 + 2] = block[2];
    m.data[3 * 4 + 3] = block[3];
    m
}

/// The fixed table of known gate matrices.
///
/// Covers the commutation allow-list: single-qubit Paulis and Cliffords,
/// parametrized single-qubit rotations with concrete angles, and CX/CY/CZ.
/// Every other gate — and any gate with an unbound symbolic parameter —
/// returns `None` and is treated as commuting with nothing.
pub fn standard_gate_matrix(gate: &StandardGate) -> Option<Unitary> {
    let frac = |v: f64| Complex64::new(v, 0.0);
    let im = |v: f64| Complex64::new(0.0, v);
    let phase = |angle: f64| Complex64::from_polar(1.0, angle);

    let m = match gate {
        StandardGate::I => Unitary::identity(2),
        StandardGate::X => single([ZERO, ONE, ONE, ZERO]),
        StandardGate::Y => single([ZERO, im(-1.0), im(1.0), ZERO]),
        StandardGate::Z => single([ONE, ZERO, ZERO, frac(-1.0)]),
        StandardGate::H => {
            let s = frac(1.0 / 2.0_f64.sqrt());
            single([s, s, s, -s])
        }
        StandardGate::S => single([ONE, ZERO, ZERO, im(1.0)]),
        StandardGate::Sdg => single([ONE, ZERO, ZERO, im(-1.0)]),
        StandardGate::T => single([ONE, ZERO, ZERO, phase(FRAC_PI_4)]),
        StandardGate::Tdg => single([ONE, ZERO, ZERO, phase(-FRAC_PI_4)]),
        StandardGate::Rx(p) => {
            let half = p.as_f64()? / 2.0;
            single([
                frac(half.cos()),
                im(-half.sin()),
                im(-half.sin()),
                frac(half.cos()),
            ])
        }
        StandardGate::Ry(p) => {
            let half = p.as_f64()? / 2.0;
            single([
                frac(half.cos()),
                frac(-half.sin()),
                frac(half.sin()),
                frac(half.cos()),
            ])
        }
        StandardGate::Rz(p) => {
            let half = p.as_f64()? / 2.0;
            single([phase(-half), ZERO, ZERO, phase(half)])
        }
        StandardGate::P(p) => single([ONE, ZERO, ZERO, phase(p.as_f64()?)]),
        StandardGate::U(theta, phi, lambda) => {
            let half = theta.as_f64()? / 2.0;
            let phi = phi.as_f64()?;
            let lambda = lambda.as_f64()?;
            single([
                frac(half.cos()),
                -phase(lambda) * half.sin(),
                phase(phi) * half.sin(),
                phase(phi + lambda) * half.cos(),
            ])
        }
        StandardGate::CX => controlled([ZERO, ONE, ONE, ZERO]),
        StandardGate::CY => controlled([ZERO, im(-1.0), im(1.0), ZERO]),
        StandardGate::CZ => controlled([ONE, ZERO, ZERO, frac(-1.0)]),
        _ => return None,
    };
    Some(m)
}

/// The matrix of an instruction, when analysis may reason about it.
///
/// Conditioned instructions and instructions touching classical bits are
/// opaque regardless of their gate.
pub fn instruction_matrix(instruction: &Instruction) -> Option<Unitary> {
    if instruction.condition.is_some() || !instruction.clbits.is_empty() {
        return None;
    }
    match instruction.as_gate()? {
        tangle_ir::GateKind::Standard(gate) => standard_gate_matrix(gate),
        tangle_ir::GateKind::Custom(gate) => {
            if gate.params.iter().any(tangle_ir::ParameterExpression::is_symbolic) {
                return None;
            }
            let dim = 1usize << gate.num_qubits;
            gate.matrix
                .as_ref()
                .filter(|m| m.len() == dim * dim)
                .map(|m| Unitary::from_vec(dim, m.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_ir::{ParameterExpression, QubitId};

    #[test]
    fn test_h_squared_is_identity() {
        let h = standard_gate_matrix(&StandardGate::H).unwrap();
        assert!(h.mul(&h).approx_eq(&Unitary::identity(2), EPSILON));
    }

    #[test]
    fn test_s_dagger_inverts_s() {
        let s = standard_gate_matrix(&StandardGate::S).unwrap();
        let sdg = standard_gate_matrix(&StandardGate::Sdg).unwrap();
        assert!(s.mul(&sdg).approx_eq(&Unitary::identity(2), EPSILON));
    }

    #[test]
    fn test_cx_matrix_entries() {
        let cx = standard_gate_matrix(&StandardGate::CX).unwrap();
        // |10⟩ → |11⟩ with the control as the most significant bit.
        assert_eq!(cx.get(3, 2), ONE);
        assert_eq!(cx.get(2, 3), ONE);
        assert_eq!(cx.get(2, 2), ZERO);
    }

    #[test]
    fn test_symbolic_rotation_has_no_matrix() {
        let gate = StandardGate::Rz(ParameterExpression::symbol("theta"));
        assert!(standard_gate_matrix(&gate).is_none());
    }

    #[test]
    fn test_embed_pads_with_identity() {
        let z = standard_gate_matrix(&StandardGate::Z).unwrap();
        // Z on the least significant of two qubits: diag(1, -1, 1, -1).
        let embedded = z.embed(&[1], 2);
        assert_eq!(embedded.get(0, 0), ONE);
        assert_eq!(embedded.get(1, 1), Complex64::new(-1.0, 0.0));
        assert_eq!(embedded.get(2, 2), ONE);
        assert_eq!(embedded.get(3, 3), Complex64::new(-1.0, 0.0));
    }

    #[test]
    fn test_embed_reversed_operands() {
        // CX with reversed operand order equals the tensor-factor swap of
        // the plain CX matrix: target becomes the most significant bit.
        let cx = standard_gate_matrix(&StandardGate::CX).unwrap();
        let reversed = cx.embed(&[1, 0], 2);
        // Control on qubit 1 (LSB): |01⟩ → |11⟩.
        assert_eq!(reversed.get(3, 1), ONE);
        assert_eq!(reversed.get(1, 3), ONE);
        assert_eq!(reversed.get(0, 0), ONE);
        assert_eq!(reversed.get(2, 2), ONE);
    }

    #[test]
    fn test_conditioned_instruction_is_opaque() {
        use tangle_ir::ClassicalCondition;
        let inst = Instruction::single_qubit_gate(StandardGate::X, QubitId(0))
            .with_condition(ClassicalCondition::new("c", 1));
        assert!(instruction_matrix(&inst).is_none());
    }
}
