//! Modules and their memoized instantiation.

use crate::common::{rrc, RRC};
use crate::elaborator::Elaborator;
use crate::memory::Memory;
use crate::operator::OperatorArena;
use crate::signal::{create_signal, SignalNode, SignalParent};
use crate::typespec::TypeSpec;
use hdl_utils::{Id, Result};
use linked_hash_map::LinkedHashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// An elaborated module: its io bundle, any free-standing internal wires
/// and registers, the instances it created, and the operator results
/// synthesized in its body.
pub struct Module {
    pub name: Id,
    pub io: RRC<SignalNode>,
    pub internal_signals: Vec<RRC<SignalNode>>,
    pub instances: Vec<Instance>,
    pub operators: OperatorArena,
    pub memories: Vec<RRC<Memory>>,
}

/// A submodule instantiation: a name local to the parent module, the
/// (possibly shared, if memoized) child `Module`, and a fresh io signal
/// tree name-scoped under this instance (`{instance}_{port}` from the
/// parent's perspective) that the parent wires into like any other signal
///.
pub struct Instance {
    pub name: Id,
    pub module: RRC<Module>,
    pub io: RRC<SignalNode>,
}

/// Elaborate `name`'s body, collecting everything the body declares into a
/// fresh [`Module`].
pub fn build_module<F>(elaborator: &mut Elaborator, name: Id, io_spec: &TypeSpec, body: F) -> Result<RRC<Module>>
where
    F: FnOnce(&mut Elaborator, &RRC<SignalNode>) -> Result<()>,
{
    elaborator.enter_module(name);
    let io = create_signal(io_spec, Id::new("io"), SignalParent::None);
    let result = body(elaborator, &io);
    let frame = elaborator.exit_module()?;
    result?;
    Ok(rrc(Module {
        name,
        io,
        internal_signals: frame.internal_signals,
        instances: frame.instances,
        operators: frame.operators,
        memories: frame.memories,
    }))
}

/// Per-circuit cache mapping a module constructor (identified by its
/// function pointer) and its argument hash to the `Module` it already
/// built, so instantiating the same parameterized module twice with equal
/// arguments reuses one elaborated body, memoized on (function, argument-hash).
///
/// A freshly built module's ctor-given name is suffixed with its argument
/// hash before it's cached, so two structurally distinct modules built from
/// the same ctor (different argument values) never collide on the plain
/// name a backend dedups emitted bodies by.
///
/// Backed by a [`LinkedHashMap`] rather than a plain `HashMap` (mirroring
/// `calyx_ir::component::IdList`) so `modules_in_order` can hand back every
/// distinct elaborated module in first-built order, matching the ordering
/// guarantee on `circuit.modules`.
#[derive(Default)]
pub struct ModuleCache {
    table: LinkedHashMap<(usize, u64), RRC<Module>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build<A>(
        &mut self,
        elaborator: &mut Elaborator,
        ctor: fn(&mut Elaborator, &A) -> Result<RRC<Module>>,
        args: A,
    ) -> Result<RRC<Module>>
    where
        A: Hash,
    {
        let mut hasher = DefaultHasher::new();
        args.hash(&mut hasher);
        let hash = hasher.finish();
        let key = (ctor as usize, hash);
        if let Some(existing) = self.table.get(&key) {
            return Ok(existing.clone());
        }
        let built = ctor(elaborator, &args)?;
        let base = built.borrow().name;
        built.borrow_mut().name = Id::new(format!("{base}_{hash:016x}"));
        self.table.insert(key, built.clone());
        Ok(built)
    }

    /// Every module memoized through this cache, in the order it was first
    /// built.
    pub fn modules_in_order(&self) -> impl Iterator<Item = &RRC<Module>> {
        self.table.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::RhsValue;

    fn adder_io() -> TypeSpec {
        TypeSpec::bundle([
            (Id::new("a"), TypeSpec::bits(8).input()),
            (Id::new("b"), TypeSpec::bits(8).input()),
            (Id::new("sum"), TypeSpec::bits(8).output()),
        ])
    }

    fn field(io: &RRC<SignalNode>, name: &str) -> RRC<SignalNode> {
        match &*io.borrow() {
            SignalNode::Bundle(b) => b.fields.iter().find(|(n, _)| n == name).unwrap().1.clone(),
            _ => panic!("expected bundle"),
        }
    }

    #[test]
    fn build_module_collects_operators() {
        let mut el = Elaborator::new();
        el.enter_circuit().unwrap();
        let m = build_module(&mut el, Id::new("adder"), &adder_io(), |el, io| {
            let a = field(io, "a");
            let b = field(io, "b");
            let sum = field(io, "sum");
            let result = el
                .operators()?
                .build(crate::operator::Operator::Binary {
                    op: crate::operator::BinOpKind::Add,
                    lhs: a,
                    rhs: b,
                })?;
            el.connect(&sum, RhsValue::Signal(result))
        })
        .unwrap();
        assert_eq!(m.borrow().operators.results().len(), 1);
    }

    #[test]
    fn memoized_instantiation_reuses_the_same_module() {
        fn ctor(el: &mut Elaborator, width: &u32) -> Result<RRC<Module>> {
            let spec = TypeSpec::bundle([(Id::new("x"), TypeSpec::bits(*width).input())]);
            build_module(el, Id::new("sized"), &spec, |_, _| Ok(()))
        }
        let mut el = Elaborator::new();
        el.enter_circuit().unwrap();
        let mut cache = ModuleCache::new();
        let m1 = cache.get_or_build::<u32>(&mut el, ctor, 8).unwrap();
        let m2 = cache.get_or_build::<u32>(&mut el, ctor, 8).unwrap();
        assert!(std::rc::Rc::ptr_eq(&m1, &m2));
        let m3 = cache.get_or_build::<u32>(&mut el, ctor, 16).unwrap();
        assert!(!std::rc::Rc::ptr_eq(&m1, &m3));
        assert_ne!(m1.borrow().name, m3.borrow().name);
    }
}
