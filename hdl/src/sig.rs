//! `Sig`: a handle to one elaborated signal, plus the free functions that
//! build structural operators and connections against it.
//!
//! Every method here takes `&mut Elaborator` explicitly rather than hiding
//! it behind an operator-trait overload: building an operator is an eager,
//! mutating call into the current module's [`hdl_ir::OperatorArena`], which
//! doesn't fit `std::ops`'s context-free signatures.

use hdl_ir::{
    create_signal, BinOpKind, Elaborator, Operator, RhsValue, SignalNode, SignalParent, TypeSpec,
    RRC,
};
use hdl_utils::{Error, Id, Result};

/// A handle to one elaborated `Bits` signal: an IO leaf, an internal
/// wire/register, or a prior operator result.
#[derive(Clone)]
pub struct Sig(pub(crate) RRC<SignalNode>);

impl Sig {
    pub fn from_node(node: RRC<SignalNode>) -> Self {
        Sig(node)
    }

    pub fn node(&self) -> RRC<SignalNode> {
        self.0.clone()
    }

    pub fn width(&self) -> Result<u32> {
        self.0
            .borrow()
            .as_bits()
            .map(|b| b.width)
            .ok_or_else(|| Error::malformed_structure("signal is not a Bits leaf"))
    }

    pub fn signed(&self) -> Result<bool> {
        self.0
            .borrow()
            .as_bits()
            .map(|b| b.signed)
            .ok_or_else(|| Error::malformed_structure("signal is not a Bits leaf"))
    }

    fn binary(&self, el: &mut Elaborator, op: BinOpKind, rhs: &Sig) -> Result<Sig> {
        let result = el.operators()?.build(Operator::Binary {
            op,
            lhs: self.0.clone(),
            rhs: rhs.0.clone(),
        })?;
        Ok(Sig(result))
    }

    pub fn add(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Add, rhs)
    }
    pub fn sub(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Sub, rhs)
    }
    pub fn mul(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Mul, rhs)
    }
    pub fn div(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Div, rhs)
    }
    pub fn and(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::And, rhs)
    }
    pub fn or(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Or, rhs)
    }
    pub fn xor(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Xor, rhs)
    }
    pub fn shl(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Shl, rhs)
    }
    pub fn shr(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Shr, rhs)
    }

    pub fn eq(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Eq, rhs)
    }
    pub fn neq(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Neq, rhs)
    }
    pub fn lt(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Lt, rhs)
    }
    pub fn leq(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Leq, rhs)
    }
    pub fn gt(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Gt, rhs)
    }
    pub fn geq(&self, el: &mut Elaborator, rhs: &Sig) -> Result<Sig> {
        self.binary(el, BinOpKind::Geq, rhs)
    }

    pub fn not(&self, el: &mut Elaborator) -> Result<Sig> {
        let result = el.operators()?.build(Operator::Not(self.0.clone()))?;
        Ok(Sig(result))
    }

    /// `self(hi, lo)` — an inclusive bit slice.
    pub fn slice(&self, el: &mut Elaborator, hi: u32, lo: u32) -> Result<Sig> {
        let result = el.operators()?.build(Operator::Slice {
            signal: self.0.clone(),
            hi,
            lo,
        })?;
        Ok(Sig(result))
    }

    /// Dynamic select over a `List` signal's elements: `self[index]`.
    pub fn index(&self, el: &mut Elaborator, index: &Sig) -> Result<Sig> {
        let result = el.operators()?.build(Operator::ListSelect {
            list: self.0.clone(),
            index: index.0.clone(),
        })?;
        Ok(Sig(result))
    }
}

/// `Cat([a, b, c])` — MSB-to-LSB concatenation.
pub fn cat(el: &mut Elaborator, parts: &[Sig]) -> Result<Sig> {
    let result = el
        .operators()?
        .build(Operator::Concat(parts.iter().map(|s| s.0.clone()).collect()))?;
    Ok(Sig(result))
}

/// A two-way structural mux: `cond ? when_true : when_false`.
pub fn mux2(el: &mut Elaborator, cond: &Sig, when_true: &Sig, when_false: &Sig) -> Result<Sig> {
    let result = el.operators()?.build(Operator::Mux {
        cond: cond.0.clone(),
        when_true: when_true.0.clone(),
        when_false: when_false.0.clone(),
    })?;
    Ok(Sig(result))
}

/// `Mux(list, idx)` — select one of `list`'s elements by a dynamic index.
pub fn mux_list(el: &mut Elaborator, list: &Sig, idx: &Sig) -> Result<Sig> {
    list.index(el, idx)
}

/// A value connectable to a `Sig`: another signal, or an integer literal
/// that adopts the target leaf's width and signedness.
pub enum Rhs {
    Sig(Sig),
    Int(i64),
}

impl From<Sig> for Rhs {
    fn from(s: Sig) -> Self {
        Rhs::Sig(s)
    }
}
impl From<&Sig> for Rhs {
    fn from(s: &Sig) -> Self {
        Rhs::Sig(s.clone())
    }
}
impl From<i64> for Rhs {
    fn from(v: i64) -> Self {
        Rhs::Int(v)
    }
}
impl From<i32> for Rhs {
    fn from(v: i32) -> Self {
        Rhs::Int(v as i64)
    }
}
impl From<u32> for Rhs {
    fn from(v: u32) -> Self {
        Rhs::Int(v as i64)
    }
}

/// `lhs <<= rhs`. An explicit function rather than an overloaded operator,
/// since connecting is a side-effecting write into the current `with`
/// scope, not a pure expression.
pub fn connect(el: &mut Elaborator, lhs: &Sig, rhs: impl Into<Rhs>) -> Result<()> {
    let value = match rhs.into() {
        Rhs::Sig(s) => RhsValue::Signal(s.0),
        Rhs::Int(value) => {
            let width = lhs.width()?;
            let signed = lhs.signed()?;
            RhsValue::Literal { value, width, signed }
        }
    };
    el.connect(&lhs.0, value)
}

/// Open a `with(cond)` scope, run `body`, then close it. Use
/// [`when_otherwise`] instead when the leaf also needs a fallback branch.
pub fn when<F>(el: &mut Elaborator, cond: &Sig, body: F) -> Result<()>
where
    F: FnOnce(&mut Elaborator) -> Result<()>,
{
    el.push_with(cond.0.clone())?;
    let result = body(el);
    el.pop_predicate()?;
    result
}

/// `with(cond): then_body` followed by `with otherwise: else_body`, sharing
/// one predicate scope so the lowered connection tree covers both branches.
pub fn when_otherwise<T, F>(el: &mut Elaborator, cond: &Sig, then_body: T, else_body: F) -> Result<()>
where
    T: FnOnce(&mut Elaborator) -> Result<()>,
    F: FnOnce(&mut Elaborator) -> Result<()>,
{
    el.push_with(cond.0.clone())?;
    then_body(el)?;
    el.enter_otherwise()?;
    let result = else_body(el);
    el.pop_predicate()?;
    result
}

/// Declare a free-standing combinational wire.
pub fn wire(el: &mut Elaborator, name: &str, width: u32) -> Result<Sig> {
    let node = create_signal(&TypeSpec::bits(width).output(), Id::new(name), SignalParent::None);
    el.declare_internal(node.clone())?;
    Ok(Sig(node))
}

/// Declare a register clocked by `clock`, with an optional synchronous,
/// active-high reset. With no user connection the register holds its value,
/// same as leaving it undriven inside a clocked block.
pub fn reg(
    el: &mut Elaborator,
    name: &str,
    width: u32,
    clock: &Sig,
    reset: Option<&Sig>,
    reset_value: Option<i64>,
) -> Result<Sig> {
    let node = create_signal(&TypeSpec::bits(width).output(), Id::new(name), SignalParent::None);
    {
        let mut leaf = node.borrow_mut();
        let SignalNode::Bits(bits) = &mut *leaf else {
            unreachable!("create_signal(Bits) always produces a Bits node")
        };
        bits.clock = Some(clock.0.clone());
        bits.reset = reset.map(|r| r.0.clone());
        bits.reset_value = reset_value.map(|value| RhsValue::Literal {
            value,
            width,
            signed: false,
        });
    }
    el.declare_internal(node.clone())?;
    // Seed the connection list with a self-hold so any later `with` scope
    // that doesn't cover every branch falls back to holding rather than
    // tripping the incomplete-decision check.
    el.connect(&node, RhsValue::Signal(node.clone()))?;
    Ok(Sig(node))
}

/// Materialize a bare integer literal as an addressable signal, for use as
/// an operator operand. `connect`'s rhs sugar infers width/signedness from
/// the target leaf and doesn't need this.
pub fn literal(el: &mut Elaborator, value: i64, width: u32, signed: bool) -> Result<Sig> {
    let node = hdl_ir::operator::materialize(el, &RhsValue::Literal { value, width, signed })?;
    Ok(Sig(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_ir::Circuit;

    fn bit_io() -> TypeSpec {
        TypeSpec::bundle([
            (Id::new("a"), TypeSpec::bits(4).input()),
            (Id::new("b"), TypeSpec::bits(4).input()),
            (Id::new("sum"), TypeSpec::bits(4).output()),
        ])
    }

    fn field(io: &RRC<SignalNode>, name: &str) -> Sig {
        match &*io.borrow() {
            SignalNode::Bundle(b) => Sig(b
                .fields
                .iter()
                .find(|(n, _)| n.as_str() == name)
                .unwrap()
                .1
                .clone()),
            _ => unreachable!("test fixture is always a bundle"),
        }
    }

    #[test]
    fn add_then_connect_round_trips() {
        let circuit = Circuit::elaborate(Id::new("adder"), &bit_io(), |el, io| {
            let a = field(io, "a");
            let b = field(io, "b");
            let sum = field(io, "sum");
            let result = a.add(el, &b)?;
            connect(el, &sum, result)
        })
        .unwrap();
        assert_eq!(circuit.top.borrow().operators.results().len(), 1);
    }

    #[test]
    fn when_otherwise_produces_a_covering_tree() {
        let io_spec = TypeSpec::bundle([
            (Id::new("sel"), TypeSpec::bits(1).input()),
            (Id::new("out"), TypeSpec::bits(4).output()),
        ]);
        Circuit::elaborate(Id::new("m"), &io_spec, |el, io| {
            let sel = field(io, "sel");
            let out = field(io, "out");
            when_otherwise(
                el,
                &sel,
                |el| connect(el, &out, 1i64),
                |el| connect(el, &out, 2i64),
            )
        })
        .unwrap();
    }

    #[test]
    fn connect_literal_adopts_lhs_width() {
        let io_spec = TypeSpec::bundle([(Id::new("out"), TypeSpec::bits(8).output())]);
        Circuit::elaborate(Id::new("m"), &io_spec, |el, io| {
            let out = field(io, "out");
            connect(el, &out, 5i64)
        })
        .unwrap();
    }

    #[test]
    fn a_register_with_no_otherwise_holds_instead_of_erroring() {
        let io_spec = TypeSpec::bundle([(Id::new("load"), TypeSpec::bits(1).input())]);
        Circuit::elaborate(Id::new("m"), &io_spec, |el, io| {
            let load = field(io, "load");
            let clock = wire(el, "clk", 1)?;
            let counter = reg(el, "counter", 8, &clock, None, None)?;
            when(el, &load, |el| connect(el, &counter, 1i64))
        })
        .unwrap();
    }
}
