//! A FIRRTL-like textual sibling of the Verilog backend.
//!
//! Two-space indentation, keyword-prefixed (`circuit`, `module`, `input`,
//! `output`, `wire`, `reg`, `node`, `when`, `else`), `UInt<w>`/`SInt<w>`
//! scalar types, and `<=` connections. Like the Verilog backend, every
//! port and internal signal is flattened to its `Bits` leaves rather than
//! kept as nested bundle/vector types — this backend is a textual sibling
//! of the same flattened IR, not a from-scratch FIRRTL compiler frontend.

use crate::traits::{Backend, EmitConfig};
use hdl_ir::{
    connection::{build_tree, ConnectionTree, RhsValue},
    collect_leaves, resolve_direction, verilog_name, BinOpKind, Direction, Memory, Module,
    Operator, SignalNode, RRC,
};
use hdl_utils::{Error, Id, Result};
use std::collections::HashSet;
use std::io::Write;

#[derive(Default)]
pub struct FirrtlBackend;

impl Backend for FirrtlBackend {
    fn name(&self) -> &'static str {
        "firrtl"
    }

    fn validate(module: &Module) -> Result<()> {
        let mut leaves = Vec::new();
        collect_leaves(&module.io, &mut leaves);
        for leaf in &leaves {
            resolve_direction(leaf)?;
            verilog_name(leaf)?;
        }
        Ok(())
    }

    fn emit(module: &Module, conf: &EmitConfig, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "circuit {} :", module.name).map_err(io_err)?;
        let mut seen = HashSet::new();
        emit_module_tree(module, conf, out, &mut seen)
    }
}

fn io_err(e: std::io::Error) -> Error {
    Error::write_error(e.to_string())
}

fn emit_module_tree(
    module: &Module,
    conf: &EmitConfig,
    out: &mut dyn Write,
    seen: &mut HashSet<Id>,
) -> Result<()> {
    if !seen.insert(module.name) {
        return Ok(());
    }
    emit_module(module, conf, out)?;
    for inst in &module.instances {
        emit_module_tree(&inst.module.borrow(), conf, out, seen)?;
    }
    Ok(())
}

fn scalar_type(signal: &RRC<SignalNode>) -> String {
    let b = signal.borrow();
    let bits = b.as_bits().expect("leaf is always Bits");
    if bits.signed {
        format!("SInt<{}>", bits.width)
    } else {
        format!("UInt<{}>", bits.width)
    }
}

fn emit_module(module: &Module, _conf: &EmitConfig, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "  module {} :", module.name).map_err(io_err)?;

    let mut io_leaves = Vec::new();
    collect_leaves(&module.io, &mut io_leaves);
    for leaf in &io_leaves {
        let kw = match resolve_direction(leaf)? {
            Direction::Input => "input",
            Direction::Output | Direction::Inout => "output",
        };
        writeln!(out, "    {} {} : {}", kw, verilog_name(leaf)?, scalar_type(leaf)).map_err(io_err)?;
    }

    let mut internal_leaves = Vec::new();
    for sig in &module.internal_signals {
        collect_leaves(sig, &mut internal_leaves);
    }
    for (_, result) in module.operators.results() {
        internal_leaves.push(result.clone());
    }
    for leaf in &internal_leaves {
        if bits_is_register(leaf) {
            continue; // declared alongside the others below, with its clock
        }
        writeln!(out, "    wire {} : {}", verilog_name(leaf)?, scalar_type(leaf)).map_err(io_err)?;
    }

    for inst in &module.instances {
        let mut inst_leaves = Vec::new();
        collect_leaves(&inst.io, &mut inst_leaves);
        for leaf in &inst_leaves {
            writeln!(out, "    wire {} : {}", verilog_name(leaf)?, scalar_type(leaf)).map_err(io_err)?;
        }
        writeln!(out, "    inst {} of {}", inst.name, inst.module.borrow().name).map_err(io_err)?;
        let child = inst.module.borrow();
        let mut child_leaves = Vec::new();
        collect_leaves(&child.io, &mut child_leaves);
        for (child_leaf, inst_leaf) in child_leaves.iter().zip(inst_leaves.iter()) {
            match resolve_direction(child_leaf)? {
                Direction::Input => writeln!(
                    out,
                    "    {}.{} <= {}",
                    inst.name,
                    verilog_name(child_leaf)?,
                    verilog_name(inst_leaf)?
                ),
                Direction::Output | Direction::Inout => writeln!(
                    out,
                    "    {} <= {}.{}",
                    verilog_name(inst_leaf)?,
                    inst.name,
                    verilog_name(child_leaf)?
                ),
            }
            .map_err(io_err)?;
        }
    }

    let mut all_leaves: Vec<RRC<SignalNode>> = io_leaves.clone();
    all_leaves.extend(internal_leaves.iter().cloned());
    for inst in &module.instances {
        let mut inst_leaves = Vec::new();
        collect_leaves(&inst.io, &mut inst_leaves);
        all_leaves.extend(inst_leaves);
    }

    for (op, result) in module.operators.results() {
        writeln!(out, "    node {} = {}", verilog_name(result)?, render_operator(op)?).map_err(io_err)?;
    }

    // Registers, declared with their clock and then driven in their own
    // `when reset : ... else : ...` block.
    for leaf in &all_leaves {
        if !bits_is_register(leaf) {
            continue;
        }
        let (clock, reset, reset_value, tree) = {
            let b = leaf.borrow();
            let SignalNode::Bits(bits) = &*b else { unreachable!() };
            (bits.clock.clone(), bits.reset.clone(), bits.reset_value.clone(), build_tree(&bits.connections)?)
        };
        let clock = clock.expect("bits_is_register implies a clock");
        writeln!(out, "    reg {} : {}, {}", verilog_name(leaf)?, scalar_type(leaf), verilog_name(&clock)?)
            .map_err(io_err)?;
        let name = verilog_name(leaf)?;
        if let Some(reset) = reset {
            writeln!(out, "    when {} :", verilog_name(&reset)?).map_err(io_err)?;
            let reset_expr = match reset_value {
                Some(rv) => render_rhs(&rv)?,
                None => format!("UInt<{}>(0)", width_of(leaf)),
            };
            writeln!(out, "      {name} <= {reset_expr}").map_err(io_err)?;
            writeln!(out, "    else :").map_err(io_err)?;
            if let Some(tree) = tree {
                emit_when_tree(&name, &tree, 3, out)?;
            }
        } else if let Some(tree) = tree {
            emit_when_tree(&name, &tree, 2, out)?;
        }
    }

    // Combinational drivers.
    for leaf in &all_leaves {
        if bits_is_register(leaf) {
            continue;
        }
        let tree = {
            let b = leaf.borrow();
            let SignalNode::Bits(bits) = &*b else { unreachable!() };
            build_tree(&bits.connections)?
        };
        if let Some(tree) = tree {
            emit_when_tree(&verilog_name(leaf)?, &tree, 2, out)?;
        }
    }

    emit_memories(&module.memories, out)?;

    Ok(())
}

/// Memory backing stores and their ports. Like the rest of this backend,
/// this is a flattened textual sibling, not a real FIRRTL `mem` construct:
/// the store is a `wire` vector, registered reads are modeled as a `reg`
/// driven each cycle, and writes are a conditional index-assign.
fn emit_memories(memories: &[RRC<Memory>], out: &mut dyn Write) -> Result<()> {
    for mem in memories {
        let mem = mem.borrow();
        let scalar = if mem.width == 1 { "UInt<1>".to_string() } else { format!("UInt<{}>", mem.width) };
        writeln!(out, "    wire {} : {}[{}]", mem.name, scalar, mem.depth).map_err(io_err)?;

        for read in &mem.reads {
            let result = verilog_name(&read.result)?;
            writeln!(out, "    reg {result} : {scalar}, {}", verilog_name(&mem.clock)?).map_err(io_err)?;
            let rhs = format!("{}[{}]", mem.name, verilog_name(&read.addr)?);
            match &read.enable {
                Some(en) => {
                    writeln!(out, "    when {} :", verilog_name(en)?).map_err(io_err)?;
                    writeln!(out, "      {result} <= {rhs}").map_err(io_err)?;
                }
                None => writeln!(out, "    {result} <= {rhs}").map_err(io_err)?,
            }
        }
        for read in &mem.comb_reads {
            writeln!(
                out,
                "    node {} = {}[{}]",
                verilog_name(&read.result)?,
                mem.name,
                verilog_name(&read.addr)?
            )
            .map_err(io_err)?;
        }
        for write in &mem.writes {
            writeln!(out, "    when {} :", verilog_name(&write.enable)?).map_err(io_err)?;
            writeln!(
                out,
                "      {}[{}] <= {}",
                mem.name,
                verilog_name(&write.addr)?,
                verilog_name(&write.data)?
            )
            .map_err(io_err)?;
        }
    }
    Ok(())
}

fn bits_is_register(signal: &RRC<SignalNode>) -> bool {
    matches!(&*signal.borrow(), SignalNode::Bits(b) if b.is_register())
}

fn width_of(signal: &RRC<SignalNode>) -> u32 {
    signal.borrow().as_bits().expect("leaf is always Bits").width
}

/// Emit `target <= ...` for a connection tree as nested `when`/`else`
/// blocks, FIRRTL's native conditional-connect form (no ternary).
fn emit_when_tree(target: &str, tree: &ConnectionTree, indent: usize, out: &mut dyn Write) -> Result<()> {
    let pad = "  ".repeat(indent);
    match tree {
        ConnectionTree::Leaf(rhs) => {
            writeln!(out, "{pad}{target} <= {}", render_rhs(rhs)?).map_err(io_err)
        }
        ConnectionTree::Node { predicate, true_path, false_path } => {
            writeln!(out, "{pad}when {} :", verilog_name(predicate)?).map_err(io_err)?;
            emit_when_tree(target, true_path, indent + 1, out)?;
            writeln!(out, "{pad}else :").map_err(io_err)?;
            emit_when_tree(target, false_path, indent + 1, out)
        }
    }
}

fn render_rhs(rhs: &RhsValue) -> Result<String> {
    match rhs {
        RhsValue::Signal(s) => verilog_name(s),
        RhsValue::Literal { value, width, signed } => Ok(render_literal(*value, *width, *signed)),
        RhsValue::ListIndex { list, index } => render_list_select(list, index),
    }
}

fn render_literal(value: i64, width: u32, signed: bool) -> String {
    if signed {
        format!("SInt<{width}>({value})")
    } else {
        format!("UInt<{width}>({value})")
    }
}

fn render_list_select(list: &RRC<SignalNode>, index: &RRC<SignalNode>) -> Result<String> {
    let SignalNode::List(l) = &*list.borrow() else {
        return Err(Error::malformed_structure("ListIndex target must be a List signal"));
    };
    let index_name = verilog_name(index)?;
    let mut expr = verilog_name(l.fields.last().expect("non-empty list"))?;
    for (i, field) in l.fields.iter().enumerate().rev().skip(1) {
        expr = format!("mux(eq({index_name}, UInt({i})), {}, {expr})", verilog_name(field)?);
    }
    Ok(expr)
}

fn render_operator(op: &Operator) -> Result<String> {
    match op {
        Operator::Not(s) => Ok(format!("not({})", verilog_name(s)?)),
        Operator::Binary { op: kind, lhs, rhs } => {
            Ok(format!("{}({}, {})", primop(*kind), verilog_name(lhs)?, verilog_name(rhs)?))
        }
        Operator::Slice { signal, hi, lo } => Ok(format!("bits({}, {hi}, {lo})", verilog_name(signal)?)),
        Operator::Concat(parts) => {
            let mut iter = parts.iter();
            let Some(first) = iter.next() else {
                return Err(Error::malformed_structure("concat with no operands"));
            };
            let mut expr = verilog_name(first)?;
            for part in iter {
                expr = format!("cat({expr}, {})", verilog_name(part)?);
            }
            Ok(expr)
        }
        Operator::Mux { cond, when_true, when_false } => Ok(format!(
            "mux({}, {}, {})",
            verilog_name(cond)?,
            verilog_name(when_true)?,
            verilog_name(when_false)?
        )),
        Operator::ListSelect { list, index } => render_list_select(list, index),
    }
}

fn primop(op: BinOpKind) -> &'static str {
    match op {
        BinOpKind::Add => "add",
        BinOpKind::Sub => "sub",
        BinOpKind::Mul => "mul",
        BinOpKind::Div => "div",
        BinOpKind::And => "and",
        BinOpKind::Or => "or",
        BinOpKind::Xor => "xor",
        BinOpKind::Shl => "dshl",
        BinOpKind::Shr => "dshr",
        BinOpKind::Eq => "eq",
        BinOpKind::Neq => "neq",
        BinOpKind::Lt => "lt",
        BinOpKind::Leq => "leq",
        BinOpKind::Gt => "gt",
        BinOpKind::Geq => "geq",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_ir::{circuit::Circuit, connection::RhsValue, Operator as Op, TypeSpec};

    fn mux2_io() -> TypeSpec {
        TypeSpec::bundle([
            (Id::new("a"), TypeSpec::bits(8).input()),
            (Id::new("b"), TypeSpec::bits(8).input()),
            (Id::new("sel"), TypeSpec::bits(1).input()),
            (Id::new("out"), TypeSpec::bits(8).output()),
        ])
    }

    fn field(io: &RRC<SignalNode>, name: &str) -> RRC<SignalNode> {
        match &*io.borrow() {
            SignalNode::Bundle(b) => b.fields.iter().find(|(n, _)| n == name).unwrap().1.clone(),
            _ => panic!("expected bundle"),
        }
    }

    #[test]
    fn emits_circuit_and_module_headers() {
        let circuit = Circuit::elaborate(Id::new("mux2"), &mux2_io(), |el, io| {
            let a = field(io, "a");
            let b = field(io, "b");
            let sel = field(io, "sel");
            let out = field(io, "out");
            let muxed = el.operators()?.build(Op::Mux { cond: sel, when_true: a, when_false: b })?;
            el.connect(&out, RhsValue::Signal(muxed))
        })
        .unwrap();

        let mut buf = Vec::new();
        FirrtlBackend::emit(&circuit.top.borrow(), &EmitConfig::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("circuit mux2 :\n"));
        assert!(text.contains("module mux2 :"));
        assert!(text.contains("input io_a : UInt<8>"));
        assert!(text.contains("output io_out : UInt<8>"));
        assert!(text.contains("node mux_0_result = mux(io_sel, io_a, io_b)"));
        assert!(text.contains("io_out <= mux_0_result"));
    }

    #[test]
    fn predicated_assignment_becomes_a_when_else_block() {
        let circuit = Circuit::elaborate(Id::new("sel2"), &mux2_io(), |el, io| {
            let a = field(io, "a");
            let b = field(io, "b");
            let sel = field(io, "sel");
            let out = field(io, "out");
            el.push_with(sel)?;
            el.connect(&out, RhsValue::Signal(a))?;
            el.enter_otherwise()?;
            el.connect(&out, RhsValue::Signal(b))?;
            el.pop_predicate()
        })
        .unwrap();

        let mut buf = Vec::new();
        FirrtlBackend::emit(&circuit.top.borrow(), &EmitConfig::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("when io_sel :"));
        assert!(text.contains("io_out <= io_a"));
        assert!(text.contains("else :"));
        assert!(text.contains("io_out <= io_b"));
    }

    #[test]
    fn emits_a_memory_backing_store_and_its_ports() {
        let spec = TypeSpec::bundle([
            (Id::new("clk"), TypeSpec::bits(1).input()),
            (Id::new("raddr"), TypeSpec::bits(8).input()),
            (Id::new("waddr"), TypeSpec::bits(8).input()),
            (Id::new("wdata"), TypeSpec::bits(8).input()),
            (Id::new("wen"), TypeSpec::bits(1).input()),
            (Id::new("out"), TypeSpec::bits(8).output()),
        ]);
        let circuit = Circuit::elaborate(Id::new("memuser"), &spec, |el, io| {
            let clk = field(io, "clk");
            let raddr = field(io, "raddr");
            let waddr = field(io, "waddr");
            let wdata = field(io, "wdata");
            let wen = field(io, "wen");
            let out = field(io, "out");
            let mem = el.declare_memory(8, 256, clk)?;
            let read_result = mem.borrow_mut().read(raddr, None)?;
            mem.borrow_mut().write(waddr, wdata, wen)?;
            el.connect(&out, RhsValue::Signal(read_result))
        })
        .unwrap();

        let mut buf = Vec::new();
        FirrtlBackend::emit(&circuit.top.borrow(), &EmitConfig::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("wire mem_0 : UInt<8>[256]"));
        assert!(text.contains("reg mem_0_read_0 : UInt<8>, io_clk"));
        assert!(text.contains("mem_0_read_0 <= mem_0[io_raddr]"));
        assert!(text.contains("when io_wen :"));
        assert!(text.contains("mem_0[io_waddr] <= io_wdata"));
    }
}
