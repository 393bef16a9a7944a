//! The top-level elaboration entry point.

use crate::common::RRC;
use crate::elaborator::Elaborator;
use crate::module::{build_module, Module, ModuleCache};
use crate::signal::SignalNode;
use crate::typespec::TypeSpec;
use hdl_utils::{Id, Result};

/// A fully elaborated design: its top module plus the shared module cache
/// and elaborator state used while building it (kept around so submodule
/// instantiation during emission, or further incremental elaboration, can
/// still memoize against the same table).
pub struct Circuit {
    pub top: RRC<Module>,
    pub modules: ModuleCache,
    elaborator: Elaborator,
}

impl Circuit {
    /// Elaborate a top-level module. This is the only supported entry point
    /// into the IR: nothing can be elaborated outside of a `Circuit` build.
    /// Creating a signal or operator outside a module is a context error;
    /// an empty module stack before this call guarantees that.
    pub fn elaborate<F>(top_name: Id, io_spec: &TypeSpec, body: F) -> Result<Self>
    where
        F: FnOnce(&mut Elaborator, &RRC<SignalNode>) -> Result<()>,
    {
        let mut elaborator = Elaborator::new();
        elaborator.enter_circuit()?;
        let top = build_module(&mut elaborator, top_name, io_spec, body);
        elaborator.exit_circuit();
        Ok(Self {
            top: top?,
            modules: ModuleCache::new(),
            elaborator,
        })
    }

    /// Elaborate and instantiate a submodule under the same circuit,
    /// memoizing on `(ctor, args)`.
    pub fn instantiate<A>(
        &mut self,
        ctor: fn(&mut Elaborator, &A) -> Result<RRC<Module>>,
        args: A,
    ) -> Result<RRC<Module>>
    where
        A: std::hash::Hash,
    {
        self.modules.get_or_build(&mut self.elaborator, ctor, args)
    }

    /// Every distinct module belonging to this circuit — the top module
    /// followed by every memoized submodule — in the order each was first
    /// built.
    pub fn modules(&self) -> impl Iterator<Item = RRC<Module>> + '_ {
        std::iter::once(self.top.clone()).chain(self.modules.modules_in_order().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirTag;

    #[test]
    fn elaborate_builds_a_named_top_module() {
        let spec = TypeSpec::Bundle {
            fields: vec![(Id::new("x"), TypeSpec::Bits { width: 1, signed: false, dir: DirTag::Input })],
            dir: DirTag::Inherit,
        };
        let circuit = Circuit::elaborate(Id::new("top"), &spec, |_, _| Ok(())).unwrap();
        assert_eq!(circuit.top.borrow().name, Id::new("top"));
    }

    #[test]
    fn modules_preserves_first_built_order() {
        fn leaf(el: &mut Elaborator, width: &u32) -> Result<RRC<Module>> {
            let spec = TypeSpec::bundle([(Id::new("x"), TypeSpec::bits(*width).input())]);
            build_module(el, Id::new(format!("leaf{width}")), &spec, |_, _| Ok(()))
        }

        let mut circuit = Circuit::elaborate(Id::new("top"), &TypeSpec::bits(1).input(), |_, _| Ok(())).unwrap();
        circuit.instantiate(leaf, 8u32).unwrap();
        circuit.instantiate(leaf, 16u32).unwrap();
        circuit.instantiate(leaf, 8u32).unwrap(); // memoized, not a new entry

        let names: Vec<_> = circuit.modules().map(|m| m.borrow().name.to_string()).collect();
        assert_eq!(names, vec!["top", "leaf8", "leaf16"]);
    }
}
