use crate::{cat, connect, instance, HdlCircuit, Io, TypeSpec};
use hdl_ir::{module::build_module, Elaborator, Module, ModuleCache, RRC};
use hdl_utils::{Id, Result};

fn full_adder_io() -> TypeSpec {
    TypeSpec::bundle([
        (Id::new("a"), TypeSpec::bits(1).input()),
        (Id::new("b"), TypeSpec::bits(1).input()),
        (Id::new("cin"), TypeSpec::bits(1).input()),
        (Id::new("sum"), TypeSpec::bits(1).output()),
        (Id::new("cout"), TypeSpec::bits(1).output()),
    ])
}

fn full_adder_ctor(el: &mut Elaborator, _args: &()) -> Result<RRC<Module>> {
    build_module(el, Id::new("full_adder"), &full_adder_io(), |el, io| {
        let io = Io::new(io.clone());
        let a = io.field("a")?;
        let b = io.field("b")?;
        let cin = io.field("cin")?;
        let sum_port = io.field("sum")?;
        let cout_port = io.field("cout")?;

        let a_xor_b = a.xor(el, &b)?;
        let sum = a_xor_b.xor(el, &cin)?;
        let a_and_b = a.and(el, &b)?;
        let carry_in_and = a_xor_b.and(el, &cin)?;
        let cout = a_and_b.or(el, &carry_in_and)?;

        connect(el, &sum_port, sum)?;
        connect(el, &cout_port, cout)
    })
}

/// A 2-bit ripple-carry adder: two `full_adder` instances (memoized to the
/// same elaborated module) chained on their carry bit.
pub fn build() -> Result<RRC<Module>> {
    let circuit = HdlCircuit::build(
        "ripple_adder2",
        false,
        false,
        vec![
            ("a", TypeSpec::bits(2).input()),
            ("b", TypeSpec::bits(2).input()),
            ("cin", TypeSpec::bits(1).input()),
            ("sum", TypeSpec::bits(2).output()),
            ("cout", TypeSpec::bits(1).output()),
        ],
        |el, io| {
            let a = io.field("a")?;
            let b = io.field("b")?;
            let cin = io.field("cin")?;
            let sum = io.field("sum")?;
            let cout = io.field("cout")?;

            let mut cache = ModuleCache::new();
            let fa0 = cache.get_or_build(el, full_adder_ctor, ())?;
            let fa1 = cache.get_or_build(el, full_adder_ctor, ())?;

            let inst0 = instance(el, "fa0", fa0, io)?;
            let a0 = a.slice(el, 0, 0)?;
            let b0 = b.slice(el, 0, 0)?;
            connect(el, &inst0.field("a")?, a0)?;
            connect(el, &inst0.field("b")?, b0)?;
            connect(el, &inst0.field("cin")?, cin)?;

            let inst1 = instance(el, "fa1", fa1, io)?;
            let a1 = a.slice(el, 1, 1)?;
            let b1 = b.slice(el, 1, 1)?;
            connect(el, &inst1.field("a")?, a1)?;
            connect(el, &inst1.field("b")?, b1)?;
            connect(el, &inst1.field("cin")?, inst0.field("cout")?)?;

            let sum_bits = cat(el, &[inst1.field("sum")?, inst0.field("sum")?])?;
            connect(el, &sum, sum_bits)?;
            connect(el, &cout, inst1.field("cout")?)
        },
    )?;
    Ok(circuit.inner.top)
}
