//! Synchronous memories: a registered read port, a combinational read port,
//! and an enabled write port, all sharing one clock. Memory reads/writes
//! don't flow through the ordinary per-leaf [`crate::connection`] machinery
//! — `mem[addr]` isn't expressible as an ordinary rhs — so a `Memory` is
//! carried alongside a module's operators and emitted by the backend as its
//! own declaration plus a block inside the owning clock's `always`.

use crate::common::RRC;
use crate::signal::{create_signal, SignalNode, SignalParent};
use crate::typespec::TypeSpec;
use hdl_utils::{Error, Id, Result};

/// `result <= mem[addr]`, each cycle `enable` holds (or unconditionally, if
/// `enable` is absent).
pub struct ReadPort {
    pub result: RRC<SignalNode>,
    pub addr: RRC<SignalNode>,
    pub enable: Option<RRC<SignalNode>>,
}

/// `result = mem[addr]` — no clock involved, `result` is an ordinary wire.
pub struct CombReadPort {
    pub result: RRC<SignalNode>,
    pub addr: RRC<SignalNode>,
}

/// `if (enable) mem[addr] <= data;`
pub struct WritePort {
    pub addr: RRC<SignalNode>,
    pub data: RRC<SignalNode>,
    pub enable: RRC<SignalNode>,
}

pub struct Memory {
    pub name: Id,
    pub width: u32,
    pub depth: u32,
    pub clock: RRC<SignalNode>,
    pub reads: Vec<ReadPort>,
    pub comb_reads: Vec<CombReadPort>,
    pub writes: Vec<WritePort>,
}

impl Memory {
    pub fn new(name: Id, width: u32, depth: u32, clock: RRC<SignalNode>) -> Self {
        Self {
            name,
            width,
            depth,
            clock,
            reads: Vec::new(),
            comb_reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    fn check_addr_width(&self, addr: &RRC<SignalNode>) -> Result<()> {
        let required = addr_width(self.depth);
        let got = addr
            .borrow()
            .as_bits()
            .ok_or_else(|| Error::malformed_structure("memory address must be a Bits leaf"))?
            .width;
        if got < required {
            return Err(Error::width_mismatch(format!(
                "memory `{}` needs a {required}-bit address, got {got}",
                self.name
            )));
        }
        Ok(())
    }

    /// Registered read: `read`'s result updates on the next posedge of this
    /// memory's clock. Unenabled reads behave as always-enabled.
    pub fn read(&mut self, addr: RRC<SignalNode>, enable: Option<RRC<SignalNode>>) -> Result<RRC<SignalNode>> {
        self.check_addr_width(&addr)?;
        let idx = self.reads.len();
        let result = create_signal(
            &TypeSpec::bits(self.width),
            Id::new(format!("{}_read_{idx}", self.name)),
            SignalParent::None,
        );
        self.reads.push(ReadPort { result: result.clone(), addr, enable });
        Ok(result)
    }

    /// Combinational read: no clock edge, `result` just tracks `mem[addr]`.
    pub fn read_comb(&mut self, addr: RRC<SignalNode>) -> Result<RRC<SignalNode>> {
        self.check_addr_width(&addr)?;
        let idx = self.comb_reads.len();
        let result = create_signal(
            &TypeSpec::bits(self.width),
            Id::new(format!("{}_read_comb_{idx}", self.name)),
            SignalParent::None,
        );
        self.comb_reads.push(CombReadPort { result: result.clone(), addr });
        Ok(result)
    }

    pub fn write(&mut self, addr: RRC<SignalNode>, data: RRC<SignalNode>, enable: RRC<SignalNode>) -> Result<()> {
        self.check_addr_width(&addr)?;
        let got = data
            .borrow()
            .as_bits()
            .ok_or_else(|| Error::malformed_structure("memory write data must be a Bits leaf"))?
            .width;
        if got != self.width {
            return Err(Error::width_mismatch(format!(
                "memory `{}` is {} bits wide, write data is {got} bits wide",
                self.name, self.width
            )));
        }
        self.writes.push(WritePort { addr, data, enable });
        Ok(())
    }
}

/// Bits needed to address `depth` distinct rows.
pub fn addr_width(depth: u32) -> u32 {
    if depth <= 1 {
        return 1;
    }
    (u32::BITS - (depth - 1).leading_zeros()).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirTag;

    fn clock() -> RRC<SignalNode> {
        create_signal(&TypeSpec::bits(1), Id::new("clk"), SignalParent::None)
    }

    fn bits(width: u32) -> RRC<SignalNode> {
        create_signal(
            &TypeSpec::Bits { width, signed: false, dir: DirTag::Output },
            Id::new("s"),
            SignalParent::None,
        )
    }

    #[test]
    fn addr_width_covers_the_full_depth() {
        assert_eq!(addr_width(1), 1);
        assert_eq!(addr_width(2), 1);
        assert_eq!(addr_width(256), 8);
        assert_eq!(addr_width(257), 9);
    }

    #[test]
    fn read_result_has_the_memory_width() {
        let mut mem = Memory::new(Id::new("m"), 8, 256, clock());
        let addr = bits(8);
        let r = mem.read(addr, None).unwrap();
        assert_eq!(r.borrow().as_bits().unwrap().width, 8);
        assert_eq!(mem.reads.len(), 1);
    }

    #[test]
    fn write_data_width_is_checked() {
        let mut mem = Memory::new(Id::new("m"), 8, 256, clock());
        let addr = bits(8);
        let data = bits(4);
        let en = bits(1);
        assert!(mem.write(addr, data, en).is_err());
    }

    #[test]
    fn address_too_narrow_is_rejected() {
        let mut mem = Memory::new(Id::new("m"), 8, 256, clock());
        let short_addr = bits(4);
        assert!(mem.read(short_addr, None).is_err());
    }
}
