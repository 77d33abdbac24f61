//! Pass trait and identity types for compilation passes.

use tangle_ir::DagCircuit;

use crate::error::CompileResult;
use crate::property::PropertySet;

/// The kind of compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Analysis pass that reads the DAG and writes the `PropertySet`.
    Analysis,
    /// Transformation pass that modifies the DAG.
    Transformation,
}

/// Structural identity of a configured pass.
///
/// Two pass instances are the same pass exactly when their kind tag and
/// canonicalized constructor parameters agree. The pass manager uses this
/// to recognize that a `requires` entry already ran and to maintain the
/// valid-pass set across transformations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassId {
    /// Kind tag, conventionally the pass's type name.
    pub name: &'static str,
    /// Constructor parameters as sorted key/value pairs.
    pub params: Vec<(&'static str, String)>,
}

impl PassId {
    /// Create a pass id with no parameters.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            params: vec![],
        }
    }

    /// Add a constructor parameter. Parameters are kept sorted by key so
    /// identity does not depend on declaration order.
    #[must_use]
    pub fn with_param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self.params.sort_by_key(|(k, _)| *k);
        self
    }
}

impl std::fmt::Display for PassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.params.is_empty() {
            write!(f, "(")?;
            for (i, (key, value)) in self.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A compilation pass that operates on a circuit DAG.
///
/// Passes are the fundamental unit of compilation. Each pass performs one
/// analysis or transformation; the [`PassManager`](crate::PassManager)
/// orders them, satisfies their `requires` lists, and tracks which
/// analysis results remain valid through `preserves`.
pub trait Pass: Send + Sync {
    /// Get the name of this pass.
    fn name(&self) -> &'static str;

    /// Get the kind of this pass.
    fn kind(&self) -> PassKind;

    /// Get the structural identity of this pass instance.
    ///
    /// Passes with constructor parameters must fold them into the id.
    fn id(&self) -> PassId {
        PassId::new(self.name())
    }

    /// Passes that must have run (and still be valid) before this one.
    ///
    /// The manager runs any entry whose result is not currently valid.
    fn requires(&self) -> Vec<Box<dyn Pass>> {
        vec![]
    }

    /// Identities of passes whose results survive this transformation.
    ///
    /// Analysis passes implicitly preserve everything.
    fn preserves(&self) -> Vec<PassId> {
        vec![]
    }

    /// Run the pass.
    ///
    /// Analysis passes read the DAG and write the `PropertySet`.
    /// Transformation passes mutate the DAG; the only property-set state
    /// they may touch is their own output slot (e.g. routing updates the
    /// layout it owns).
    fn run(&self, dag: &mut DagCircuit, properties: &mut PropertySet) -> CompileResult<()>;

    /// Check if this pass should run given the current state.
    fn should_run(&self, _dag: &DagCircuit, _properties: &PropertySet) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestPass;

    impl Pass for TestPass {
        fn name(&self) -> &'static str {
            "test"
        }

        fn kind(&self) -> PassKind {
            PassKind::Transformation
        }

        fn run(&self, _dag: &mut DagCircuit, _properties: &mut PropertySet) -> CompileResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_pass_kind() {
        let pass = TestPass;
        assert_eq!(pass.kind(), PassKind::Transformation);
        assert_eq!(pass.name(), "test");
        assert_eq!(pass.id(), PassId::new("test"));
    }

    #[test]
    fn test_pass_id_canonicalizes_params() {
        let a = PassId::new("p").with_param("seed", 7).with_param("trials", 3);
        let b = PassId::new("p").with_param("trials", 3).with_param("seed", 7);
        assert_eq!(a, b);
        assert_eq!(format!("{a}"), "p(seed=7, trials=3)");

        let c = PassId::new("p").with_param("seed", 8).with_param("trials", 3);
        assert_ne!(a, c);
    }
}
