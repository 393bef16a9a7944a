//! Verilog backend.
//!
//! Each elaborated [`Module`] becomes one `module ... endmodule`: a port
//! list taken from its io tree, `wire`/`reg` declarations for internal wires,
//! registers, and operator results, submodule instantiations, a
//! combinational `assign` per driven leaf (built from its connection
//! tree), and one `always @(posedge clock)` block per distinct clock
//! driving a register.

use crate::traits::{Backend, EmitConfig};
use hdl_ir::{
    connection::{build_tree, ConnectionTree, RhsValue},
    collect_leaves, resolve_direction, verilog_name, BinOpKind, Direction, Memory, Module,
    Operator, SignalNode, RRC,
};
use hdl_utils::{Error, Id, Result};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::rc::Rc;

#[derive(Default)]
pub struct VerilogBackend;

impl Backend for VerilogBackend {
    fn name(&self) -> &'static str {
        "verilog"
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
        let mut seen = HashSet::new();
        emit_module_tree(module, conf, out, &mut seen)
    }
}

fn io_err(e: std::io::Error) -> Error {
    Error::write_error(e.to_string())
}

/// Emit every module transitively instantiated by `module` before emitting
/// `module` itself, so each distinct module body appears exactly once and
/// always before its first use.
fn emit_module_tree(
    module: &Module,
    conf: &EmitConfig,
    out: &mut dyn Write,
    seen: &mut HashSet<Id>,
) -> Result<()> {
    for inst in &module.instances {
        let child = inst.module.borrow();
        if seen.insert(child.name) {
            emit_module_tree(&child, conf, out, seen)?;
        }
    }
    emit_module(module, conf, out)
}

fn width_of(signal: &RRC<SignalNode>) -> u32 {
    signal.borrow().as_bits().expect("leaf is always Bits").width
}

fn signed_of(signal: &RRC<SignalNode>) -> bool {
    signal.borrow().as_bits().expect("leaf is always Bits").signed
}

fn decl_keyword(signal: &RRC<SignalNode>) -> &'static str {
    match &*signal.borrow() {
        SignalNode::Bits(b) if b.is_register() => "reg",
        _ => "wire",
    }
}

fn logic_decl(keyword: &str, name: &str, width: u32, signed: bool) -> String {
    let signed_kw = if signed { "signed " } else { "" };
    if width == 1 {
        format!("  {keyword} {signed_kw}{name};")
    } else {
        format!("  {keyword} {signed_kw}[{}:0] {name};", width - 1)
    }
}

fn emit_module(module: &Module, conf: &EmitConfig, out: &mut dyn Write) -> Result<()> {
    let mut io_leaves = Vec::new();
    collect_leaves(&module.io, &mut io_leaves);

    writeln!(out, "module {}(", module.name).map_err(io_err)?;
    for (idx, leaf) in io_leaves.iter().enumerate() {
        let dir = resolve_direction(leaf)?;
        let kw = match dir {
            Direction::Input => "input",
            Direction::Output => "output",
            Direction::Inout => "inout",
        };
        let name = verilog_name(leaf)?;
        let width = width_of(leaf);
        let signed_kw = if signed_of(leaf) { "signed " } else { "" };
        let decl = if width == 1 {
            format!("  {kw} wire {signed_kw}{name}")
        } else {
            format!("  {kw} wire {signed_kw}[{}:0] {name}", width - 1)
        };
        let sep = if idx + 1 == io_leaves.len() { "" } else { "," };
        writeln!(out, "{decl}{sep}").map_err(io_err)?;
    }
    writeln!(out, ");").map_err(io_err)?;

    // Internal wire/register declarations: free-standing signals and
    // operator results. io leaves are declared in the port list above.
    let mut internal_leaves = Vec::new();
    for sig in &module.internal_signals {
        collect_leaves(sig, &mut internal_leaves);
    }
    for (_, result) in module.operators.results() {
        internal_leaves.push(result.clone());
    }
    for leaf in &internal_leaves {
        writeln!(out, "{}", logic_decl(decl_keyword(leaf), &verilog_name(leaf)?, width_of(leaf), signed_of(leaf)))
            .map_err(io_err)?;
    }

    // Instance-local wires mirroring each submodule's io, plus the
    // instantiation statement itself.
    for inst in &module.instances {
        let mut inst_leaves = Vec::new();
        collect_leaves(&inst.io, &mut inst_leaves);
        for leaf in &inst_leaves {
            writeln!(out, "{}", logic_decl("wire", &verilog_name(leaf)?, width_of(leaf), signed_of(leaf)))
                .map_err(io_err)?;
        }

        let child = inst.module.borrow();
        let mut child_leaves = Vec::new();
        collect_leaves(&child.io, &mut child_leaves);

        writeln!(out, "  {} {} (", child.name, inst.name).map_err(io_err)?;
        for (idx, (child_leaf, inst_leaf)) in child_leaves.iter().zip(inst_leaves.iter()).enumerate() {
            let port_name = verilog_name(child_leaf)?;
            let wire_name = verilog_name(inst_leaf)?;
            let sep = if idx + 1 == child_leaves.len() { "" } else { "," };
            writeln!(out, "    .{port_name}({wire_name}){sep}").map_err(io_err)?;
        }
        writeln!(out, "  );").map_err(io_err)?;
    }

    // Memories: the backing array, declarations for every read result (both
    // registered and combinational), and an `assign` per combinational read.
    for mem in &module.memories {
        let mem = mem.borrow();
        writeln!(
            out,
            "  reg [{}:0] {} [0:{}];",
            mem.width - 1,
            mem.name,
            mem.depth - 1
        )
        .map_err(io_err)?;
        for read in &mem.reads {
            writeln!(out, "{}", logic_decl("reg", &verilog_name(&read.result)?, mem.width, false)).map_err(io_err)?;
        }
        for read in &mem.comb_reads {
            writeln!(out, "{}", logic_decl("wire", &verilog_name(&read.result)?, mem.width, false)).map_err(io_err)?;
            writeln!(
                out,
                "  assign {} = {}[{}];",
                verilog_name(&read.result)?,
                mem.name,
                verilog_name(&read.addr)?
            )
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

    let mut mux_counter = 0usize;

    // Combinational drivers: every non-register leaf with a non-empty
    // connection list.
    for leaf in &all_leaves {
        let is_register = matches!(&*leaf.borrow(), SignalNode::Bits(b) if b.is_register());
        if is_register {
            continue;
        }
        let (tree, width) = {
            let b = leaf.borrow();
            let SignalNode::Bits(bits) = &*b else { unreachable!() };
            (build_tree(&bits.connections)?, bits.width)
        };
        if let Some(tree) = tree {
            let expr = render_driver(&tree, width, conf, out, &mut mux_counter)?;
            writeln!(out, "  assign {} = {};", verilog_name(leaf)?, expr).map_err(io_err)?;
        }
    }

    for (op, result) in module.operators.results() {
        writeln!(out, "  assign {} = {};", verilog_name(result)?, render_operator(op)?).map_err(io_err)?;
    }

    // Registers, grouped by clock.
    let mut by_clock: HashMap<usize, (RRC<SignalNode>, Vec<RRC<SignalNode>>)> = HashMap::new();
    for leaf in &all_leaves {
        let (clock, is_reg) = {
            let b = leaf.borrow();
            let SignalNode::Bits(bits) = &*b else { unreachable!() };
            (bits.clock.clone(), bits.is_register())
        };
        if is_reg {
            let clock = clock.expect("is_register() implies a clock");
            by_clock
                .entry(Rc::as_ptr(&clock) as usize)
                .or_insert_with(|| (clock.clone(), Vec::new()))
                .1
                .push(leaf.clone());
        }
    }
    let mut mem_by_clock: HashMap<usize, (RRC<SignalNode>, Vec<RRC<Memory>>)> = HashMap::new();
    for mem in &module.memories {
        let clock = mem.borrow().clock.clone();
        mem_by_clock
            .entry(Rc::as_ptr(&clock) as usize)
            .or_insert_with(|| (clock.clone(), Vec::new()))
            .1
            .push(mem.clone());
    }

    let mut clock_ptrs: HashSet<usize> = by_clock.keys().copied().collect();
    clock_ptrs.extend(mem_by_clock.keys().copied());
    let mut clocks: Vec<(RRC<SignalNode>, Vec<RRC<SignalNode>>, Vec<RRC<Memory>>)> = clock_ptrs
        .into_iter()
        .map(|ptr| {
            let regs = by_clock.get(&ptr);
            let mems = mem_by_clock.get(&ptr);
            let clock = regs
                .map(|(c, _)| c.clone())
                .or_else(|| mems.map(|(c, _)| c.clone()))
                .expect("clock present in at least one map");
            (
                clock,
                regs.map(|(_, r)| r.clone()).unwrap_or_default(),
                mems.map(|(_, m)| m.clone()).unwrap_or_default(),
            )
        })
        .collect();
    clocks.sort_by_key(|(clock, _, _)| verilog_name(clock).unwrap_or_default());
    for (clock, regs, mems) in clocks {
        writeln!(out, "  always @(posedge {}) begin", verilog_name(&clock)?).map_err(io_err)?;
        for reg in &regs {
            let (reset, reset_value, tree, width) = {
                let b = reg.borrow();
                let SignalNode::Bits(bits) = &*b else { unreachable!() };
                (bits.reset.clone(), bits.reset_value.clone(), build_tree(&bits.connections)?, bits.width)
            };
            let name = verilog_name(reg)?;
            if let Some(reset) = reset {
                let reset_expr = reset_value
                    .map(|rv| render_rhs(&rv))
                    .transpose()?
                    .unwrap_or_else(|| format!("{}'d0", width));
                writeln!(out, "    if ({}) begin", verilog_name(&reset)?).map_err(io_err)?;
                writeln!(out, "      {name} <= {reset_expr};").map_err(io_err)?;
                writeln!(out, "    end else begin").map_err(io_err)?;
                if let Some(tree) = tree {
                    emit_if_tree(&name, &tree, 3, out)?;
                }
                writeln!(out, "    end").map_err(io_err)?;
            } else if let Some(tree) = tree {
                emit_if_tree(&name, &tree, 2, out)?;
            }
        }
        for mem in &mems {
            let mem = mem.borrow();
            for read in &mem.reads {
                let rhs = format!("{}[{}]", mem.name, verilog_name(&read.addr)?);
                let result = verilog_name(&read.result)?;
                match &read.enable {
                    Some(en) => {
                        writeln!(out, "    if ({}) begin", verilog_name(en)?).map_err(io_err)?;
                        writeln!(out, "      {result} <= {rhs};").map_err(io_err)?;
                        writeln!(out, "    end").map_err(io_err)?;
                    }
                    None => {
                        writeln!(out, "    {result} <= {rhs};").map_err(io_err)?;
                    }
                }
            }
            for write in &mem.writes {
                writeln!(out, "    if ({}) begin", verilog_name(&write.enable)?).map_err(io_err)?;
                writeln!(
                    out,
                    "      {}[{}] <= {};",
                    mem.name,
                    verilog_name(&write.addr)?,
                    verilog_name(&write.data)?
                )
                .map_err(io_err)?;
                writeln!(out, "    end").map_err(io_err)?;
            }
        }
        writeln!(out, "  end").map_err(io_err)?;
    }

    if !conf.synthesis_mode {
        writeln!(out, "  // synthesis translate_off").map_err(io_err)?;
        writeln!(out, "  initial begin").map_err(io_err)?;
        writeln!(out, "    $dumpfile(\"{}.vcd\");", module.name).map_err(io_err)?;
        writeln!(out, "    $dumpvars(0, {});", module.name).map_err(io_err)?;
        writeln!(out, "  end").map_err(io_err)?;
        writeln!(out, "  // synthesis translate_on").map_err(io_err)?;
    }

    writeln!(out, "endmodule").map_err(io_err)?;
    writeln!(out).map_err(io_err)?;
    Ok(())
}

/// Render a driven leaf's connection tree as the rhs of an `assign`/`<=`.
/// With `flat_assign` set, each mux stage is hoisted into its own named
/// `_MUX_n` wire (declared and assigned ahead of the statement using it)
/// instead of nesting ternaries.
fn render_driver(
    tree: &ConnectionTree,
    width: u32,
    conf: &EmitConfig,
    out: &mut dyn Write,
    counter: &mut usize,
) -> Result<String> {
    if conf.flat_assign {
        flatten_tree(tree, width, counter, out)
    } else {
        render_tree(tree)
    }
}

fn render_tree(tree: &ConnectionTree) -> Result<String> {
    match tree {
        ConnectionTree::Leaf(rhs) => render_rhs(rhs),
        ConnectionTree::Node { predicate, true_path, false_path } => Ok(format!(
            "{} ? {} : {}",
            verilog_name(predicate)?,
            render_tree(true_path)?,
            render_tree(false_path)?
        )),
    }
}

fn flatten_tree(tree: &ConnectionTree, width: u32, counter: &mut usize, out: &mut dyn Write) -> Result<String> {
    match tree {
        ConnectionTree::Leaf(rhs) => render_rhs(rhs),
        ConnectionTree::Node { predicate, true_path, false_path } => {
            let t = flatten_tree(true_path, width, counter, out)?;
            let f = flatten_tree(false_path, width, counter, out)?;
            let name = format!("_MUX_{counter}");
            *counter += 1;
            writeln!(out, "{}", logic_decl("wire", &name, width, false)).map_err(io_err)?;
            writeln!(out, "  assign {name} = {} ? {t} : {f};", verilog_name(predicate)?).map_err(io_err)?;
            Ok(name)
        }
    }
}

/// Emit `target <= ...` for a register's connection tree as nested
/// `if (pred) begin ... end else begin ... end` blocks, matching the
/// worked GCD example's nested-if/else form for sequential bodies (the
/// `always` block this lives in already rules out a ternary `<=`).
fn emit_if_tree(target: &str, tree: &ConnectionTree, indent: usize, out: &mut dyn Write) -> Result<()> {
    let pad = "  ".repeat(indent);
    match tree {
        ConnectionTree::Leaf(rhs) => writeln!(out, "{pad}{target} <= {};", render_rhs(rhs)?).map_err(io_err),
        ConnectionTree::Node { predicate, true_path, false_path } => {
            writeln!(out, "{pad}if ({}) begin", verilog_name(predicate)?).map_err(io_err)?;
            emit_if_tree(target, true_path, indent + 1, out)?;
            writeln!(out, "{pad}end else begin").map_err(io_err)?;
            emit_if_tree(target, false_path, indent + 1, out)?;
            writeln!(out, "{pad}end").map_err(io_err)
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
    if signed && value < 0 {
        format!("-{width}'sd{}", value.unsigned_abs())
    } else if signed {
        format!("{width}'sd{value}")
    } else {
        format!("{width}'d{value}")
    }
}

fn render_list_select(list: &RRC<SignalNode>, index: &RRC<SignalNode>) -> Result<String> {
    let SignalNode::List(l) = &*list.borrow() else {
        return Err(Error::malformed_structure("ListIndex target must be a List signal"));
    };
    let index_name = verilog_name(index)?;
    let mut expr = verilog_name(l.fields.last().expect("non-empty list"))?;
    for (i, field) in l.fields.iter().enumerate().rev().skip(1) {
        expr = format!("({index_name} == {i}) ? {} : {expr}", verilog_name(field)?);
    }
    Ok(expr)
}

fn render_operator(op: &Operator) -> Result<String> {
    match op {
        Operator::Not(s) => Ok(format!("~{}", verilog_name(s)?)),
        Operator::Binary { op: kind, lhs, rhs } => {
            Ok(format!("({} {} {})", verilog_name(lhs)?, bin_symbol(*kind), verilog_name(rhs)?))
        }
        Operator::Slice { signal, hi, lo } => Ok(format!("{}[{hi}:{lo}]", verilog_name(signal)?)),
        Operator::Concat(parts) => {
            let names: Result<Vec<_>> = parts.iter().map(verilog_name).collect();
            Ok(format!("{{{}}}", names?.iter().join(", ")))
        }
        Operator::Mux { cond, when_true, when_false } => Ok(format!(
            "{} ? {} : {}",
            verilog_name(cond)?,
            verilog_name(when_true)?,
            verilog_name(when_false)?
        )),
        Operator::ListSelect { list, index } => render_list_select(list, index),
    }
}

fn bin_symbol(op: BinOpKind) -> &'static str {
    op.symbol()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_ir::{
        circuit::Circuit, connection::RhsValue, create_signal, module::build_module, operator::BinOpKind,
        DirTag, Operator as Op, SignalParent, TypeSpec,
    };
    use hdl_utils::Id;

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
    fn emits_a_combinational_mux_module() {
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
        VerilogBackend::emit(&circuit.top.borrow(), &EmitConfig::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("module mux2("));
        assert!(text.contains("input wire io_sel"));
        assert!(text.contains("output wire [7:0] io_out"));
        assert!(text.contains("assign mux_0_result = io_sel ? io_a : io_b;"));
        assert!(text.contains("assign io_out = mux_0_result;"));
    }

    #[test]
    fn emits_a_synchronous_register_with_reset() {
        let spec = TypeSpec::bundle([
            (Id::new("en"), TypeSpec::bits(1).input()),
            (Id::new("clk"), TypeSpec::bits(1).input()),
            (Id::new("rst"), TypeSpec::bits(1).input()),
            (Id::new("count"), TypeSpec::bits(8).output()),
        ]);
        let circuit = Circuit::elaborate(Id::new("counter"), &spec, |el, io| {
            let en = field(io, "en");
            let clk = field(io, "clk");
            let rst = field(io, "rst");
            let count = field(io, "count");
            let reg = create_signal(
                &TypeSpec::Bits { width: 8, signed: false, dir: DirTag::Output },
                Id::new("acc"),
                SignalParent::None,
            );
            if let SignalNode::Bits(b) = &mut *reg.borrow_mut() {
                b.clock = Some(clk);
                b.reset = Some(rst);
                b.reset_value = Some(RhsValue::Literal { value: 0, width: 8, signed: false });
            }
            let one = create_signal(&TypeSpec::bits(8), Id::new("one"), SignalParent::None);
            if let SignalNode::Bits(b) = &mut *one.borrow_mut() {
                b.connections.push(hdl_ir::ConnectionEntry::Rhs(RhsValue::Literal {
                    value: 1,
                    width: 8,
                    signed: false,
                }));
            }
            el.declare_internal(one.clone())?;
            let incremented =
                el.operators()?.build(Op::Binary { op: BinOpKind::Add, lhs: reg.clone(), rhs: one })?;
            el.push_with(en)?;
            el.connect(&reg, RhsValue::Signal(incremented))?;
            el.pop_predicate()?;
            el.declare_internal(reg.clone())?;
            el.connect(&count, RhsValue::Signal(reg))
        })
        .unwrap();

        let mut buf = Vec::new();
        VerilogBackend::emit(&circuit.top.borrow(), &EmitConfig::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("always @(posedge io_clk) begin"));
        assert!(text.contains("if (io_rst) begin"));
        assert!(text.contains("acc <= 8'd0;"));
    }

    #[test]
    fn flat_assign_hoists_mux_stages_into_named_wires() {
        let circuit = Circuit::elaborate(Id::new("mux2_flat"), &mux2_io(), |el, io| {
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
        let conf = EmitConfig { synthesis_mode: false, flat_assign: true };
        VerilogBackend::emit(&circuit.top.borrow(), &conf, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("_MUX_0"));
        assert!(text.contains("assign io_out = _MUX_0;"));
    }

    #[test]
    fn emits_a_memory_with_registered_read_and_enabled_write() {
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
        VerilogBackend::emit(&circuit.top.borrow(), &EmitConfig::default(), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("reg [7:0] mem_0 [0:255];"));
        assert!(text.contains("mem_0_read_0 <= mem_0[io_raddr];"));
        assert!(text.contains("if (io_wen) begin"));
        assert!(text.contains("mem_0[io_waddr] <= io_wdata;"));
        assert!(text.contains("assign io_out = mem_0_read_0;"));
    }

    #[test]
    fn build_module_is_used_directly_for_submodule_fixtures() {
        let mut el = hdl_ir::Elaborator::new();
        el.enter_circuit().unwrap();
        let m = build_module(&mut el, Id::new("pass"), &TypeSpec::bits(1).output(), |_, _| Ok(())).unwrap();
        assert_eq!(m.borrow().name, Id::new("pass"));
    }
}
