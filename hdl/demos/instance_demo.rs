use crate::{connect, instance, HdlCircuit, Io, TypeSpec};
use hdl_ir::{module::build_module, Elaborator, Module, RRC};
use hdl_utils::{Id, Result};

fn child_io() -> TypeSpec {
    TypeSpec::bundle([
        (Id::new("x"), TypeSpec::bits(4).input()),
        (Id::new("y"), TypeSpec::bits(4).output()),
    ])
}

fn child_ctor(el: &mut Elaborator, _args: &()) -> Result<RRC<Module>> {
    build_module(el, Id::new("passthrough"), &child_io(), |el, io| {
        let io = Io::new(io.clone());
        let x = io.field("x")?;
        let y = io.field("y")?;
        connect(el, &y, x)
    })
}

/// Instantiates `passthrough` once: inside the parent, `inst.x` is a local
/// output wire and `inst.y` a local input wire, the mirror image of the
/// child's own io declaration.
pub fn build() -> Result<RRC<Module>> {
    let circuit = HdlCircuit::build(
        "instance_demo",
        false,
        false,
        vec![
            ("a", TypeSpec::bits(4).input()),
            ("b", TypeSpec::bits(4).output()),
        ],
        |el, io| {
            let a = io.field("a")?;
            let b = io.field("b")?;

            let child = child_ctor(el, &())?;
            let inst = instance(el, "child_inst", child, io)?;

            connect(el, &inst.field("x")?, a)?;
            connect(el, &b, inst.field("y")?)
        },
    )?;
    Ok(circuit.inner.top)
}
