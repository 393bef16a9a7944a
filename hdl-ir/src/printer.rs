//! Structural debug-printing of an elaborated [`Module`], independent of any
//! backend. Mirrors `calyx_ir::Printer`: a namespace of formatting helpers
//! over borrowed IR, not a `Display` impl, since naming a leaf or resolving
//! its direction can fail and a `Display::fmt` can't propagate that.

use crate::module::Module;
use crate::signal::{collect_leaves, resolve_direction, verilog_name, SignalNode};
use crate::RRC;
use hdl_utils::Result;

/// Namespace for formatting helpers over the elaborated IR. Holds no state;
/// every method borrows the IR it's given.
pub struct Printer;

impl Printer {
    /// One line per io/internal leaf: its dotted name, direction, and width.
    pub fn format_leaves(leaves: &[RRC<SignalNode>]) -> Result<String> {
        let mut lines = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            let name = verilog_name(leaf)?;
            let dir = resolve_direction(leaf)?;
            let b = leaf.borrow();
            let bits = b.as_bits().expect("collect_leaves only yields Bits signals");
            let signed = if bits.signed { " signed" } else { "" };
            lines.push(format!("{name}: {dir:?}{signed}<{}>", bits.width));
        }
        Ok(lines.join("\n"))
    }

    /// A full structural dump of `module`: its io ports, internal signals,
    /// operator results, instances, and memories. Not a valid emission
    /// target for any backend, just a readable snapshot of the IR for
    /// `--dump-ir` and tests that want to assert on structure without going
    /// through Verilog or FIRRTL.
    pub fn format_module(module: &Module) -> Result<String> {
        let mut out = format!("module {} {{\n", module.name);

        let mut io_leaves = Vec::new();
        collect_leaves(&module.io, &mut io_leaves);
        out.push_str("  io:\n");
        for line in Self::format_leaves(&io_leaves)?.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }

        if !module.internal_signals.is_empty() {
            out.push_str("  internal:\n");
            for line in Self::format_leaves(&module.internal_signals)?.lines() {
                out.push_str("    ");
                out.push_str(line);
                out.push('\n');
            }
        }

        if !module.operators.results().is_empty() {
            out.push_str("  operators:\n");
            for (op, result) in module.operators.results() {
                let name = verilog_name(result)?;
                out.push_str(&format!("    {name} = {}\n", op.opcode_label()));
            }
        }

        for inst in &module.instances {
            out.push_str(&format!("  inst {}: {}\n", inst.name, inst.module.borrow().name));
        }

        for mem in &module.memories {
            let mem = mem.borrow();
            out.push_str(&format!("  memory {}: {} x {} bits\n", mem.name, mem.depth, mem.width));
        }

        out.push_str("}\n");
        Ok(out)
    }
}
