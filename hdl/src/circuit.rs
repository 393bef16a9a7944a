//! Top-level `Circuit`/`Module`/`Instance` ergonomics, wrapping
//! [`hdl_ir::Circuit`] and its memoized module cache.

use crate::io::{io_spec, Io};
use crate::sig::connect;
use hdl_ir::{Circuit, Elaborator, Module, TypeSpec, RRC};
use hdl_utils::{Id, Result};

/// A fully elaborated design plus the `default_clock`/`default_reset`
/// switches it was built with, so submodules can inherit them without the
/// caller re-threading the flags by hand.
pub struct HdlCircuit {
    pub default_clock: bool,
    pub default_reset: bool,
    pub inner: Circuit,
}

impl HdlCircuit {
    /// Elaborate the top module. `fields` is the user-visible part of the
    /// io bundle; `clock`/`reset` are prepended automatically when enabled.
    pub fn build<F>(
        name: &str,
        default_clock: bool,
        default_reset: bool,
        fields: Vec<(&'static str, TypeSpec)>,
        body: F,
    ) -> Result<Self>
    where
        F: FnOnce(&mut Elaborator, &Io) -> Result<()>,
    {
        let spec = io_spec(fields, default_clock, default_reset);
        let inner = Circuit::elaborate(Id::new(name), &spec, |el, io_node| {
            let io = Io::new(io_node.clone());
            body(el, &io)
        })?;
        Ok(Self {
            default_clock,
            default_reset,
            inner,
        })
    }

    /// Elaborate and memoize a submodule, keyed on `(ctor, args)`.
    pub fn module<A>(&mut self, ctor: fn(&mut Elaborator, &A) -> Result<RRC<Module>>, args: A) -> Result<RRC<Module>>
    where
        A: std::hash::Hash,
    {
        self.inner.instantiate(ctor, args)
    }
}

/// Instantiate `module` under `name` in the current module body, returning
/// an [`Io`] handle over its fresh, instance-scoped port tree. If both the
/// instance and `parent_io` expose a `clock`/`reset` field, it's silently
/// wired from the parent's, mirroring how a circuit's `default_clock`/
/// `default_reset` switches propagate into every instance rather than
/// needing to be re-threaded by hand at each call site.
pub fn instance(el: &mut Elaborator, name: &str, module: RRC<Module>, parent_io: &Io) -> Result<Io> {
    let io = Io::new(el.instantiate(Id::new(name), module)?);
    if let (Some(inst_clock), Some(parent_clock)) = (io.clock(), parent_io.clock()) {
        connect(el, &inst_clock, parent_clock)?;
    }
    if let (Some(inst_reset), Some(parent_reset)) = (io.reset(), parent_io.reset()) {
        connect(el, &inst_reset, parent_reset)?;
    }
    Ok(io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_ir::SignalNode;

    #[test]
    fn build_elaborates_a_named_top_module() {
        let circuit = HdlCircuit::build(
            "top",
            false,
            false,
            vec![("x", TypeSpec::bits(1).input())],
            |_, _| Ok(()),
        )
        .unwrap();
        assert_eq!(circuit.inner.top.borrow().name, Id::new("top"));
    }

    #[test]
    fn default_clock_and_reset_add_io_fields() {
        let circuit = HdlCircuit::build("top", true, true, vec![], |_, io| {
            assert!(io.clock().is_some());
            assert!(io.reset().is_some());
            Ok(())
        })
        .unwrap();
        assert!(circuit.default_clock);
        assert!(circuit.default_reset);
    }

    fn sub_ctor(el: &mut Elaborator, width: &u32) -> Result<RRC<Module>> {
        hdl_ir::module::build_module(
            el,
            Id::new("sub"),
            &io_spec([("x", TypeSpec::bits(*width).input())], false, false),
            |_, _| Ok(()),
        )
    }

    #[test]
    fn module_memoizes_identical_instantiations() {
        let mut circuit = HdlCircuit::build("top", false, false, vec![], |_, _| Ok(())).unwrap();
        let m1 = circuit.module(sub_ctor, 8).unwrap();
        let m2 = circuit.module(sub_ctor, 8).unwrap();
        assert!(std::rc::Rc::ptr_eq(&m1, &m2));
    }

    #[test]
    fn instance_exposes_a_fresh_port_tree() {
        HdlCircuit::build(
            "top",
            false,
            false,
            vec![
                ("a", TypeSpec::bits(4).input()),
                ("b", TypeSpec::bits(4).output()),
            ],
            |el, io| {
                let a = io.field("a")?;
                let b = io.field("b")?;
                let child = hdl_ir::module::build_module(
                    el,
                    Id::new("child"),
                    &TypeSpec::bundle([
                        (Id::new("x"), TypeSpec::bits(4).input()),
                        (Id::new("y"), TypeSpec::bits(4).output()),
                    ]),
                    |el, child_io| {
                        let child_io = Io::new(child_io.clone());
                        let x = child_io.field("x")?;
                        let y = child_io.field("y")?;
                        connect(el, &y, x)
                    },
                )?;
                let inst = instance(el, "child_inst", child, io)?;
                connect(el, &inst.field("x")?, a)?;
                connect(el, &b, inst.field("y")?)
            },
        )
        .unwrap();
    }

    #[test]
    fn instance_auto_wires_clock_and_reset_when_both_sides_have_them() {
        fn clocked_child(el: &mut Elaborator, _args: &()) -> Result<RRC<Module>> {
            hdl_ir::module::build_module(el, Id::new("clocked_child"), &io_spec([], true, true), |_, _| Ok(()))
        }

        HdlCircuit::build("top", true, true, vec![], |el, io| {
            let child = clocked_child(el, &())?;
            let inst = instance(el, "child_inst", child, io)?;
            let inst_clock = inst.clock().unwrap();
            let SignalNode::Bits(bits) = &*inst_clock.node().borrow() else {
                panic!("clock field is always a Bits leaf");
            };
            assert_eq!(bits.connections.len(), 1);
            Ok(())
        })
        .unwrap();
    }
}
