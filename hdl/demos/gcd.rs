use crate::{connect, literal, reg, when, when_otherwise, HdlCircuit, TypeSpec};
use hdl_ir::{Module, RRC};
use hdl_utils::Result;

/// Subtractive GCD: on `load`, latch `a_in`/`b_in` into `a_reg`/`b_reg`;
/// otherwise step `a_reg -= b_reg` or `b_reg -= a_reg` until `b_reg` hits
/// zero. `done` follows `b_reg == 0` combinationally.
pub fn build() -> Result<RRC<Module>> {
    let circuit = HdlCircuit::build(
        "gcd",
        true,
        false,
        vec![
            ("load", TypeSpec::bits(1).input()),
            ("a_in", TypeSpec::bits(8).input()),
            ("b_in", TypeSpec::bits(8).input()),
            ("done", TypeSpec::bits(1).output()),
            ("result", TypeSpec::bits(8).output()),
        ],
        |el, io| {
            let clock = io.clock().expect("default_clock enabled");
            let load = io.field("load")?;
            let a_in = io.field("a_in")?;
            let b_in = io.field("b_in")?;
            let done = io.field("done")?;
            let result = io.field("result")?;

            let a_reg = reg(el, "a_reg", 8, &clock, None, Some(0))?;
            let b_reg = reg(el, "b_reg", 8, &clock, None, Some(0))?;

            let zero = literal(el, 0, 8, false)?;
            let is_done = b_reg.eq(el, &zero)?;
            connect(el, &done, is_done.clone())?;
            connect(el, &result, a_reg.clone())?;

            let not_done = is_done.not(el)?;

            when_otherwise(
                el,
                &load,
                |el| {
                    connect(el, &a_reg, a_in.clone())?;
                    connect(el, &b_reg, b_in.clone())
                },
                |el| {
                    when(el, &not_done, |el| {
                        let a_gt_b = a_reg.gt(el, &b_reg)?;
                        when_otherwise(
                            el,
                            &a_gt_b,
                            |el| {
                                let diff = a_reg.sub(el, &b_reg)?;
                                connect(el, &a_reg, diff)
                            },
                            |el| {
                                let diff = b_reg.sub(el, &a_reg)?;
                                connect(el, &b_reg, diff)
                            },
                        )
                    })
                },
            )
        },
    )?;
    Ok(circuit.inner.top)
}
