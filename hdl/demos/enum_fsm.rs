use crate::{connect, literal, reg, when, when_otherwise, Enum, HdlCircuit, TypeSpec};
use hdl_ir::{Module, RRC};
use hdl_utils::Result;

/// A three-state traffic-light-style FSM (`idle` -> `run` -> `done` ->
/// `idle`) whose state register width is derived from `Enum::new`'s state
/// count rather than hardcoded.
pub fn build() -> Result<RRC<Module>> {
    let states = Enum::new(&["idle", "run", "done"]);
    let width = states.width;
    let idle = states.code("idle").expect("idle is a declared state");
    let run = states.code("run").expect("run is a declared state");
    let done = states.code("done").expect("done is a declared state");

    let circuit = HdlCircuit::build(
        "enum_fsm",
        true,
        true,
        vec![
            ("start", TypeSpec::bits(1).input()),
            ("state", TypeSpec::bits(width).output()),
        ],
        |el, io| {
            let clock = io.clock().expect("default_clock enabled");
            let reset = io.reset();
            let start = io.field("start")?;
            let state_out = io.field("state")?;

            let state = reg(el, "state", width, &clock, reset.as_ref(), Some(idle))?;
            connect(el, &state_out, state.clone())?;

            let idle_lit = literal(el, idle, width, false)?;
            let run_lit = literal(el, run, width, false)?;
            let done_lit = literal(el, done, width, false)?;

            let in_idle = state.eq(el, &idle_lit)?;
            let in_run = state.eq(el, &run_lit)?;
            let in_done = state.eq(el, &done_lit)?;

            when(el, &in_idle, |el| {
                when(el, &start, |el| connect(el, &state, run_lit.clone()))
            })?;
            when(el, &in_run, |el| connect(el, &state, done_lit.clone()))?;
            when(el, &in_done, |el| connect(el, &state, idle_lit.clone()))
        },
    )?;
    Ok(circuit.inner.top)
}
