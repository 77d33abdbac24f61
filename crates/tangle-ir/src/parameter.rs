//! Symbolic and concrete gate parameters.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::fmt;

/// Arithmetic operators on parameter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

/// A gate parameter: either a concrete angle or a symbolic expression to be
/// bound before hardware emission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A concrete numeric value.
    Constant(f64),
    /// The constant π.
    Pi,
    /// A named free symbol.
    Symbol(String),
    /// Negation of a sub-expression.
    Neg(Box<ParameterExpression>),
    /// A binary arithmetic node.
    Binary(
        BinaryOp,
        Box<ParameterExpression>,
        Box<ParameterExpression>,
    ),
}

impl ParameterExpression {
    /// Create a concrete parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    /// The constant π.
    pub fn pi() -> Self {
        ParameterExpression::Pi
    }

    /// Check whether any free symbol remains in this expression.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => false,
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Binary(_, a, b) => a.is_symbolic() || b.is_symbolic(),
        }
    }

    /// Evaluate to a concrete value, or `None` if a symbol is unbound.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Pi => Some(PI),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Neg(e) => e.as_f64().map(|v| -v),
            ParameterExpression::Binary(op, a, b) => {
                let a = a.as_f64()?;
                let b = b.as_f64()?;
                match op {
                    BinaryOp::Add => Some(a + b),
                    BinaryOp::Sub => Some(a - b),
                    BinaryOp::Mul => Some(a * b),
                    BinaryOp::Div => {
                        if b == 0.0 {
                            None
                        } else {
                            Some(a / b)
                        }
                    }
                }
            }
        }
    }

    /// Collect the names of all free symbols.
    pub fn symbols(&self) -> HashSet<String> {
        let mut set = HashSet::new();
        self.collect_symbols(&mut set);
        set
    }

    fn collect_symbols(&self, set: &mut HashSet<String>) {
        match self {
            ParameterExpression::Constant(_) | ParameterExpression::Pi => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Binary(_, a, b) => {
                a.collect_symbols(set);
                b.collect_symbols(set);
            }
        }
    }

    /// Substitute a symbol with a value, returning a new expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        match self {
            ParameterExpression::Symbol(n) if n == name => ParameterExpression::Constant(value),
            ParameterExpression::Constant(_)
            | ParameterExpression::Pi
            | ParameterExpression::Symbol(_) => self.clone(),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.bind(name, value))),
            ParameterExpression::Binary(op, a, b) => ParameterExpression::Binary(
                *op,
                Box::new(a.bind(name, value)),
                Box::new(b.bind(name, value)),
            ),
        }
    }

    /// Fold constant sub-expressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return ParameterExpression::Constant(v);
        }
        match self {
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.simplify())),
            ParameterExpression::Binary(op, a, b) => {
                ParameterExpression::Binary(*op, Box::new(a.simplify()), Box::new(b.simplify()))
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Pi => write!(f, "π"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Binary(op, a, b) => {
                let sym = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                };
                write!(f, "({a} {sym} {b})")
            }
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::Binary(BinaryOp::Add, Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::Binary(BinaryOp::Sub, Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::Binary(BinaryOp::Mul, Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::Binary(BinaryOp::Div, Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_and_pi() {
        assert_eq!(ParameterExpression::constant(1.5).as_f64(), Some(1.5));
        assert_eq!(ParameterExpression::pi().as_f64(), Some(PI));
        assert!(!ParameterExpression::pi().is_symbolic());
    }

    #[test]
    fn test_symbol_bind() {
        let theta = ParameterExpression::symbol("theta");
        assert!(theta.is_symbolic());
        assert_eq!(theta.as_f64(), None);
        assert!(theta.symbols().contains("theta"));

        let bound = theta.bind("theta", PI / 2.0);
        assert!(!bound.is_symbolic());
        assert!((bound.as_f64().unwrap() - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_arithmetic_simplify() {
        let expr = (ParameterExpression::constant(2.0) + ParameterExpression::constant(3.0))
            * ParameterExpression::constant(0.5);
        assert_eq!(expr.simplify(), ParameterExpression::Constant(2.5));

        let half_theta =
            ParameterExpression::symbol("theta") / ParameterExpression::constant(2.0);
        assert!(half_theta.is_symbolic());
        assert_eq!(half_theta.bind("theta", PI).as_f64(), Some(PI / 2.0));
    }

    #[test]
    fn test_division_by_zero_is_unbound() {
        let expr = ParameterExpression::constant(1.0) / ParameterExpression::constant(0.0);
        assert_eq!(expr.as_f64(), None);
    }
}
