use crate::{connect, HdlCircuit, Mem, TypeSpec};
use hdl_ir::{Module, RRC};
use hdl_utils::Result;

/// An 8-bit-wide, 256-entry single read/write-port memory wired straight
/// through to the module's io.
pub fn build() -> Result<RRC<Module>> {
    let circuit = HdlCircuit::build(
        "memory_demo",
        true,
        false,
        vec![
            ("raddr", TypeSpec::bits(8).input()),
            ("waddr", TypeSpec::bits(8).input()),
            ("wdata", TypeSpec::bits(8).input()),
            ("wen", TypeSpec::bits(1).input()),
            ("rdata", TypeSpec::bits(8).output()),
        ],
        |el, io| {
            let clock = io.clock().expect("default_clock enabled");
            let raddr = io.field("raddr")?;
            let waddr = io.field("waddr")?;
            let wdata = io.field("wdata")?;
            let wen = io.field("wen")?;
            let rdata = io.field("rdata")?;

            let mem = Mem::declare(el, 8, 256, &clock)?;
            let read = mem.read(&raddr)?;
            mem.write(&waddr, &wdata, &wen)?;
            connect(el, &rdata, read)
        },
    )?;
    Ok(circuit.inner.top)
}
