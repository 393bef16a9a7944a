use crate::{connect, when_otherwise, HdlCircuit, TypeSpec};
use hdl_ir::{Module, RRC};
use hdl_utils::Result;

/// `out <<= sel ? a : b`, built from `with`/`otherwise` rather than the
/// `Mux` operator, matching how a two-way select reads in the source DSL.
pub fn build() -> Result<RRC<Module>> {
    let circuit = HdlCircuit::build(
        "mux2to1",
        false,
        false,
        vec![
            ("sel", TypeSpec::bits(1).input()),
            ("a", TypeSpec::bits(8).input()),
            ("b", TypeSpec::bits(8).input()),
            ("out", TypeSpec::bits(8).output()),
        ],
        |el, io| {
            let sel = io.field("sel")?;
            let a = io.field("a")?;
            let b = io.field("b")?;
            let out = io.field("out")?;
            when_otherwise(el, &sel, |el| connect(el, &out, a), |el| connect(el, &out, b))
        },
    )?;
    Ok(circuit.inner.top)
}
