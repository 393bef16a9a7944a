//! `Mem(width, depth, clock)`: a synchronous memory with registered and
//! combinational read ports and an enabled write port.

use crate::sig::Sig;
use hdl_ir::{Elaborator, Memory, RRC};
use hdl_utils::Result;

/// A handle to a declared memory, shared with the module frame that owns
/// it so the backend can find it without the caller threading it through
/// by hand.
#[derive(Clone)]
pub struct Mem(RRC<Memory>);

impl Mem {
    pub fn declare(el: &mut Elaborator, width: u32, depth: u32, clock: &Sig) -> Result<Self> {
        Ok(Mem(el.declare_memory(width, depth, clock.node())?))
    }

    /// `result <= mem[addr]`, unconditionally each cycle.
    pub fn read(&self, addr: &Sig) -> Result<Sig> {
        let result = self.0.borrow_mut().read(addr.node(), None)?;
        Ok(Sig::from_node(result))
    }

    /// `result <= mem[addr]`, only on cycles where `enable` holds.
    pub fn read_enabled(&self, addr: &Sig, enable: &Sig) -> Result<Sig> {
        let result = self.0.borrow_mut().read(addr.node(), Some(enable.node()))?;
        Ok(Sig::from_node(result))
    }

    /// `result = mem[addr]`, combinational, no clock edge.
    pub fn read_comb(&self, addr: &Sig) -> Result<Sig> {
        let result = self.0.borrow_mut().read_comb(addr.node())?;
        Ok(Sig::from_node(result))
    }

    /// `if (enable) mem[addr] <= data;`
    pub fn write(&self, addr: &Sig, data: &Sig, enable: &Sig) -> Result<()> {
        self.0.borrow_mut().write(addr.node(), data.node(), enable.node())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_ir::{Circuit, TypeSpec};
    use hdl_utils::Id;

    #[test]
    fn declare_read_and_write_round_trip() {
        Circuit::elaborate(
            Id::new("m"),
            &TypeSpec::bundle([
                (Id::new("clock"), TypeSpec::bits(1).input()),
                (Id::new("raddr"), TypeSpec::bits(8).input()),
                (Id::new("waddr"), TypeSpec::bits(8).input()),
                (Id::new("wdata"), TypeSpec::bits(8).input()),
                (Id::new("wen"), TypeSpec::bits(1).input()),
                (Id::new("out"), TypeSpec::bits(8).output()),
            ]),
            |el, io| {
                let io = crate::io::Io::new(io.clone());
                let clock = io.field("clock")?;
                let raddr = io.field("raddr")?;
                let waddr = io.field("waddr")?;
                let wdata = io.field("wdata")?;
                let wen = io.field("wen")?;
                let out = io.field("out")?;
                let mem = Mem::declare(el, 8, 256, &clock)?;
                let read = mem.read(&raddr)?;
                mem.write(&waddr, &wdata, &wen)?;
                crate::sig::connect(el, &out, read)
            },
        )
        .unwrap();
    }
}
