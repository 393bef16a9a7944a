//! Structural operator algebra with common-subexpression elimination.
//!
//! Every operator produces a single `Bits` result signal, memoized per
//! module keyed on `(opcode, input identities, scalar parameters)` so that
//! re-evaluating the same expression — e.g. inside two branches of a
//! `with` — returns the same IR node rather than duplicating hardware.

use crate::connection::RhsValue;
use crate::signal::{create_signal, resolve_direction, verilog_name, SignalNode, SignalParent};
use crate::typespec::TypeSpec;
use hdl_utils::{Error, Id, Result};
use std::collections::HashMap;
use std::rc::Rc;

use crate::common::RRC;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
}

impl BinOpKind {
    fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOpKind::Eq | BinOpKind::Neq | BinOpKind::Lt | BinOpKind::Leq | BinOpKind::Gt | BinOpKind::Geq
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Div => "/",
            BinOpKind::And => "&",
            BinOpKind::Or => "|",
            BinOpKind::Xor => "^",
            BinOpKind::Shl => "<<",
            BinOpKind::Shr => ">>",
            BinOpKind::Eq => "==",
            BinOpKind::Neq => "!=",
            BinOpKind::Lt => "<",
            BinOpKind::Leq => "<=",
            BinOpKind::Gt => ">",
            BinOpKind::Geq => ">=",
        }
    }

    fn opcode(self) -> &'static str {
        match self {
            BinOpKind::Add => "add",
            BinOpKind::Sub => "sub",
            BinOpKind::Mul => "mul",
            BinOpKind::Div => "div",
            BinOpKind::And => "and",
            BinOpKind::Or => "or",
            BinOpKind::Xor => "xor",
            BinOpKind::Shl => "shl",
            BinOpKind::Shr => "shr",
            BinOpKind::Eq => "eq",
            BinOpKind::Neq => "neq",
            BinOpKind::Lt => "lt",
            BinOpKind::Leq => "leq",
            BinOpKind::Gt => "gt",
            BinOpKind::Geq => "geq",
        }
    }
}

/// A structural operator. Each variant names the signals it reads; the
/// result is always a fresh `Bits` leaf owned by the arena.
#[derive(Debug, Clone)]
pub enum Operator {
    Not(RRC<SignalNode>),
    Binary { op: BinOpKind, lhs: RRC<SignalNode>, rhs: RRC<SignalNode> },
    Slice { signal: RRC<SignalNode>, hi: u32, lo: u32 },
    Concat(Vec<RRC<SignalNode>>),
    Mux { cond: RRC<SignalNode>, when_true: RRC<SignalNode>, when_false: RRC<SignalNode> },
    /// Dynamic select over a `List` signal's elements — the operator form of
    /// [`crate::connection::RhsValue::ListIndex`], used when the selected
    /// value needs its own named node (e.g. reused across branches).
    ListSelect { list: RRC<SignalNode>, index: RRC<SignalNode> },
}

impl Operator {
    fn opcode(&self) -> &'static str {
        match self {
            Operator::Not(_) => "not",
            Operator::Binary { op, .. } => op.opcode(),
            Operator::Slice { .. } => "slice",
            Operator::Concat(_) => "concat",
            Operator::Mux { .. } => "mux",
            Operator::ListSelect { .. } => "sel",
        }
    }

    /// A backend-independent structural summary, e.g. `io_a + io_b` or
    /// `mux(io_sel, io_a, io_b)`. Used by [`crate::printer::Printer`], not
    /// by any emitter.
    pub fn opcode_label(&self) -> String {
        let name = |s: &RRC<SignalNode>| verilog_name(s).unwrap_or_else(|_| "<?>".to_string());
        match self {
            Operator::Not(s) => format!("!{}", name(s)),
            Operator::Binary { op, lhs, rhs } => format!("{} {} {}", name(lhs), op.symbol(), name(rhs)),
            Operator::Slice { signal, hi, lo } => format!("{}[{hi}:{lo}]", name(signal)),
            Operator::Concat(parts) => format!("{{{}}}", parts.iter().map(name).collect::<Vec<_>>().join(", ")),
            Operator::Mux { cond, when_true, when_false } => {
                format!("mux({}, {}, {})", name(cond), name(when_true), name(when_false))
            }
            Operator::ListSelect { list, index } => format!("{}[{}]", name(list), name(index)),
        }
    }

    /// The pointer-identity + scalar-parameter key used for CSE dedup.
    fn dedup_key(&self) -> OperatorKey {
        let inputs = match self {
            Operator::Not(s) => vec![ptr_id(s)],
            Operator::Binary { lhs, rhs, .. } => vec![ptr_id(lhs), ptr_id(rhs)],
            Operator::Slice { signal, .. } => vec![ptr_id(signal)],
            Operator::Concat(parts) => parts.iter().map(ptr_id).collect(),
            Operator::Mux { cond, when_true, when_false } => {
                vec![ptr_id(cond), ptr_id(when_true), ptr_id(when_false)]
            }
            Operator::ListSelect { list, index } => vec![ptr_id(list), ptr_id(index)],
        };
        let scalars = match self {
            Operator::Slice { hi, lo, .. } => vec![*hi, *lo],
            _ => Vec::new(),
        };
        OperatorKey { opcode: self.opcode(), inputs, scalars }
    }

    fn result_width(&self) -> Result<(u32, bool)> {
        match self {
            Operator::Not(s) => bits_of(s),
            Operator::Binary { op, lhs, rhs } => {
                let (lw, ls) = bits_of(lhs)?;
                let (rw, _) = bits_of(rhs)?;
                if op.is_comparison() {
                    Ok((1, false))
                } else if lw == rw {
                    Ok((lw, ls))
                } else {
                    Err(Error::width_mismatch(format!(
                        "binary operator operands have widths {lw} and {rw}"
                    )))
                }
            }
            Operator::Slice { hi, lo, .. } => {
                if hi < lo {
                    return Err(Error::malformed_structure("slice high bound below low bound"));
                }
                Ok((hi - lo + 1, false))
            }
            Operator::Concat(parts) => {
                let mut total = 0;
                for p in parts {
                    total += bits_of(p)?.0;
                }
                Ok((total, false))
            }
            Operator::Mux { when_true, when_false, .. } => {
                let (tw, ts) = bits_of(when_true)?;
                let (fw, _) = bits_of(when_false)?;
                if tw != fw {
                    return Err(Error::width_mismatch(format!(
                        "mux branches have widths {tw} and {fw}"
                    )));
                }
                Ok((tw, ts))
            }
            Operator::ListSelect { list, .. } => match &*list.borrow() {
                SignalNode::List(l) => {
                    let first = l
                        .fields
                        .first()
                        .ok_or_else(|| Error::malformed_structure("ListSelect over an empty list"))?;
                    bits_of(first)
                }
                _ => Err(Error::malformed_structure("ListSelect target must be a List signal")),
            },
        }
    }
}

fn ptr_id(signal: &RRC<SignalNode>) -> usize {
    Rc::as_ptr(signal) as usize
}

fn bits_of(signal: &RRC<SignalNode>) -> Result<(u32, bool)> {
    signal
        .borrow()
        .as_bits()
        .map(|b| (b.width, b.signed))
        .ok_or_else(|| Error::malformed_structure("operator operand must be a Bits leaf"))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OperatorKey {
    opcode: &'static str,
    inputs: Vec<usize>,
    scalars: Vec<u32>,
}

/// Per-module memoization table for operator results, keyed on structural
/// equality of opcode, inputs, and scalar parameters within a module.
#[derive(Default)]
pub struct OperatorArena {
    results: Vec<(Operator, RRC<SignalNode>)>,
    index: HashMap<OperatorKey, usize>,
}

impl OperatorArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize `op`, reusing a structurally identical prior result if
    /// one exists in this module.
    pub fn build(&mut self, op: Operator) -> Result<RRC<SignalNode>> {
        let key = op.dedup_key();
        if let Some(&idx) = self.index.get(&key) {
            return Ok(self.results[idx].1.clone());
        }
        let (width, signed) = op.result_width()?;
        let idx = self.results.len();
        let name = Id::new(format!("{}_{idx}_result", op.opcode()));
        let result = create_signal(
            &TypeSpec::Bits { width, signed, dir: crate::direction::DirTag::Output },
            name,
            SignalParent::Operator(idx),
        );
        self.index.insert(key, idx);
        self.results.push((op, result.clone()));
        Ok(result)
    }

    pub fn results(&self) -> &[(Operator, RRC<SignalNode>)] {
        &self.results
    }
}

/// Promote a raw rhs to a usable signal, lowering `ListIndex` thunks to a
/// `ListSelect` operator on demand. A
/// bare literal is wrapped in a throwaway internal wire so it has a stable
/// identity to feed into an `Operator` operand slot, and registered with
/// the current module so the backend still finds and declares it.
pub fn materialize(elaborator: &mut crate::elaborator::Elaborator, rhs: &RhsValue) -> Result<RRC<SignalNode>> {
    match rhs {
        RhsValue::Signal(s) => Ok(s.clone()),
        RhsValue::ListIndex { list, index } => {
            elaborator.operators()?.build(Operator::ListSelect { list: list.clone(), index: index.clone() })
        }
        RhsValue::Literal { value, width, signed } => {
            let sig = rrc_literal(*value, *width, *signed);
            elaborator.declare_internal(sig.clone())?;
            Ok(sig)
        }
    }
}

fn rrc_literal(value: i64, width: u32, signed: bool) -> RRC<SignalNode> {
    let sig = create_signal(
        &TypeSpec::Bits { width, signed, dir: crate::direction::DirTag::Output },
        Id::new(format!("lit_{value}_{width}")),
        SignalParent::None,
    );
    if let SignalNode::Bits(b) = &mut *sig.borrow_mut() {
        b.connections.push(crate::connection::ConnectionEntry::Rhs(RhsValue::Literal {
            value,
            width,
            signed,
        }));
    }
    sig
}

/// Guard that an operand is readable in the current context: any direction
/// is fine for a combinational read except a bare container.
pub fn check_readable(signal: &RRC<SignalNode>) -> Result<()> {
    resolve_direction(signal).map(|_| ())
}
