//! The elaborated counterpart of a [`TypeSpec`].

use crate::common::{rrc, WRC, RRC};
use crate::connection::{ConnectionEntry, RhsValue};
use crate::direction::{DirTag, Direction};
use crate::typespec::TypeSpec;
use hdl_utils::{Error, GetName, Id, Result};
use smallvec::SmallVec;

/// Where a signal sits in the ownership tree. Container signals hold their
/// children as strong [`RRC`]s; the child points back at its container with
/// this weak reference. A signal with `Operator` parent is an operator
/// result (named after the operator, not nested under any container). A
/// signal with `None` parent is either an IO root (named `io`) or a
/// free-standing internal `Wire`/`Reg`.
#[derive(Clone, Debug)]
pub enum SignalParent {
    Signal(WRC<SignalNode>),
    Operator(usize),
    None,
}

#[derive(Debug)]
pub struct SignalMeta {
    pub name: Id,
    pub parent: SignalParent,
    pub sigdir: DirTag,
}

/// The only assignable unit in the IR. A `BitsSignal` with a non-`None`
/// clock is a register; otherwise it is a wire.
#[derive(Debug)]
pub struct BitsSignal {
    pub meta: SignalMeta,
    pub width: u32,
    pub signed: bool,
    pub connections: Vec<ConnectionEntry>,
    pub clock: Option<RRC<SignalNode>>,
    pub reset: Option<RRC<SignalNode>>,
    pub reset_value: Option<RhsValue>,
}

impl BitsSignal {
    pub fn is_register(&self) -> bool {
        self.clock.is_some()
    }
}

/// Most `List` signals are small fixed-size vectors (adder bit slices,
/// FSM one-hot banks); inlining a handful of fields avoids a heap
/// allocation for the common case, mirroring `calyx_ir::Component::ports`.
#[derive(Debug)]
pub struct ListSignal {
    pub meta: SignalMeta,
    pub fields: SmallVec<[RRC<SignalNode>; 8]>,
}

#[derive(Debug)]
pub struct BundleSignal {
    pub meta: SignalMeta,
    pub fields: SmallVec<[(Id, RRC<SignalNode>); 8]>,
}

#[derive(Debug)]
pub enum SignalNode {
    Bits(BitsSignal),
    List(ListSignal),
    Bundle(BundleSignal),
}

impl SignalNode {
    pub fn meta(&self) -> &SignalMeta {
        match self {
            SignalNode::Bits(b) => &b.meta,
            SignalNode::List(l) => &l.meta,
            SignalNode::Bundle(b) => &b.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut SignalMeta {
        match self {
            SignalNode::Bits(b) => &mut b.meta,
            SignalNode::List(l) => &mut l.meta,
            SignalNode::Bundle(b) => &mut b.meta,
        }
    }

    pub fn as_bits(&self) -> Option<&BitsSignal> {
        match self {
            SignalNode::Bits(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_bits_mut(&mut self) -> Option<&mut BitsSignal> {
        match self {
            SignalNode::Bits(b) => Some(b),
            _ => None,
        }
    }
}

impl GetName for SignalNode {
    fn name(&self) -> Id {
        self.meta().name
    }
}

/// Recursively instantiate the Signal IR variant matching `spec`, wiring
/// child parent pointers to the freshly created container.
pub fn create_signal(spec: &TypeSpec, name: Id, parent: SignalParent) -> RRC<SignalNode> {
    match spec {
        TypeSpec::Bits { width, signed, dir } => rrc(SignalNode::Bits(BitsSignal {
            meta: SignalMeta {
                name,
                parent,
                sigdir: *dir,
            },
            width: *width,
            signed: *signed,
            connections: Vec::new(),
            clock: None,
            reset: None,
            reset_value: None,
        })),
        TypeSpec::List { len, elem, dir } => {
            let container = rrc(SignalNode::List(ListSignal {
                meta: SignalMeta {
                    name,
                    parent,
                    sigdir: *dir,
                },
                fields: SmallVec::new(),
            }));
            let child_parent = SignalParent::Signal(WRC::from(&container));
            let fields: SmallVec<[_; 8]> = (0..*len)
                .map(|i| create_signal(elem, Id::new(i.to_string()), child_parent.clone()))
                .collect();
            if let SignalNode::List(l) = &mut *container.borrow_mut() {
                l.fields = fields;
            }
            container
        }
        TypeSpec::Bundle { fields, dir } => {
            let container = rrc(SignalNode::Bundle(BundleSignal {
                meta: SignalMeta {
                    name,
                    parent,
                    sigdir: *dir,
                },
                fields: SmallVec::new(),
            }));
            let child_parent = SignalParent::Signal(WRC::from(&container));
            let built: SmallVec<[_; 8]> = fields
                .iter()
                .map(|(fname, ftype)| (*fname, create_signal(ftype, *fname, child_parent.clone())))
                .collect();
            if let SignalNode::Bundle(b) = &mut *container.borrow_mut() {
                b.fields = built;
            }
            container
        }
    }
}

/// Reconstruct a [`TypeSpec`] from an elaborated signal, carrying directions
/// back up the tree.
pub fn typespec_of(signal: &RRC<SignalNode>) -> TypeSpec {
    match &*signal.borrow() {
        SignalNode::Bits(b) => TypeSpec::Bits {
            width: b.width,
            signed: b.signed,
            dir: b.meta.sigdir,
        },
        SignalNode::List(l) => TypeSpec::List {
            len: l.fields.len(),
            elem: Box::new(typespec_of(&l.fields[0])),
            dir: l.meta.sigdir,
        },
        SignalNode::Bundle(b) => TypeSpec::Bundle {
            fields: b
                .fields
                .iter()
                .map(|(name, sig)| (*name, typespec_of(sig)))
                .collect(),
            dir: b.meta.sigdir,
        },
    }
}

fn parent_signal(signal: &RRC<SignalNode>) -> Option<RRC<SignalNode>> {
    match &signal.borrow().meta().parent {
        SignalParent::Signal(weak) => Some(weak.upgrade()),
        SignalParent::Operator(_) | SignalParent::None => None,
    }
}

/// Walk ancestors to resolve a signal's effective direction.
pub fn resolve_direction(signal: &RRC<SignalNode>) -> Result<Direction> {
    let tag = signal.borrow().meta().sigdir;
    match tag {
        DirTag::Input => Ok(Direction::Input),
        DirTag::Output => Ok(Direction::Output),
        DirTag::Inout => Ok(Direction::Inout),
        DirTag::Inherit => match parent_signal(signal) {
            Some(parent) => resolve_direction(&parent),
            None => Err(Error::context(
                "direction resolution chain terminated at `inherit` with no ancestor",
            )),
        },
        DirTag::Flipped => match parent_signal(signal) {
            Some(parent) => Ok(resolve_direction(&parent)?.reverse()),
            None => Err(Error::context(
                "direction resolution chain terminated at `flipped` with no ancestor",
            )),
        },
    }
}

/// The `_`-joined ancestor chain up to, but not including, the module
///. Errors if `signal` is a
/// container rather than a leaf.
pub fn verilog_name(signal: &RRC<SignalNode>) -> Result<String> {
    if signal.borrow().as_bits().is_none() {
        return Err(Error::lowering(
            "attempted to compute a Verilog name for a container signal; only leaves are nameable",
        ));
    }
    let mut chain = Vec::new();
    let mut cursor = signal.clone();
    loop {
        let name = cursor.borrow().meta().name;
        chain.push(name.to_string());
        match parent_signal(&cursor) {
            Some(parent) => cursor = parent,
            None => break,
        }
    }
    chain.reverse();
    Ok(chain.join("_"))
}

/// Flatten a signal tree down to its `Bits` leaves, in declaration order
///.
pub fn collect_leaves(signal: &RRC<SignalNode>, out: &mut Vec<RRC<SignalNode>>) {
    match &*signal.borrow() {
        SignalNode::Bits(_) => out.push(signal.clone()),
        SignalNode::List(l) => {
            for field in &l.fields {
                collect_leaves(field, out);
            }
        }
        SignalNode::Bundle(b) => {
            for (_, field) in &b.fields {
                collect_leaves(field, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::DirTag;

    fn io_bundle() -> RRC<SignalNode> {
        let spec = TypeSpec::bundle([
            (Id::new("a"), TypeSpec::bits(8).input()),
            (Id::new("b"), TypeSpec::bits(8).input()),
            (Id::new("sel"), TypeSpec::bits(1).input()),
            (Id::new("out"), TypeSpec::bits(8).output()),
        ]);
        create_signal(&spec, Id::new("io"), SignalParent::None)
    }

    fn field(io: &RRC<SignalNode>, name: &str) -> RRC<SignalNode> {
        match &*io.borrow() {
            SignalNode::Bundle(b) => b
                .fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, s)| s.clone())
                .unwrap(),
            _ => panic!("expected bundle"),
        }
    }

    #[test]
    fn naming_is_dollar_joined_chain() {
        let io = io_bundle();
        let sel = field(&io, "sel");
        assert_eq!(verilog_name(&sel).unwrap(), "io_sel");
    }

    #[test]
    fn freestanding_internal_signal_has_bare_name() {
        let reg = create_signal(&TypeSpec::bits(4).output(), Id::new("a_reg"), SignalParent::None);
        assert_eq!(verilog_name(&reg).unwrap(), "a_reg");
    }

    #[test]
    fn naming_a_container_is_an_error() {
        let io = io_bundle();
        assert!(verilog_name(&io).is_err());
    }

    #[test]
    fn direction_resolves_from_declared_tag() {
        let io = io_bundle();
        let a = field(&io, "a");
        let out = field(&io, "out");
        assert_eq!(resolve_direction(&a).unwrap(), Direction::Input);
        assert_eq!(resolve_direction(&out).unwrap(), Direction::Output);
    }

    #[test]
    fn flip_inverts_the_ancestor_direction() {
        let spec = TypeSpec::bundle([(
            Id::new("inner"),
            TypeSpec::bundle([(Id::new("x"), TypeSpec::bits(4).flip())]).input(),
        )]);
        let io = create_signal(&spec, Id::new("io"), SignalParent::None);
        let inner = field(&io, "inner");
        let x = field(&inner, "x");
        assert_eq!(resolve_direction(&inner).unwrap(), Direction::Input);
        assert_eq!(resolve_direction(&x).unwrap(), Direction::Output);
    }

    #[test]
    fn inherit_with_no_ancestor_fails() {
        let lone = create_signal(
            &TypeSpec::Bits {
                width: 1,
                signed: false,
                dir: DirTag::Inherit,
            },
            Id::new("dangling"),
            SignalParent::None,
        );
        assert!(resolve_direction(&lone).is_err());
    }

    #[test]
    fn collect_leaves_flattens_in_declaration_order() {
        let io = io_bundle();
        let mut leaves = Vec::new();
        collect_leaves(&io, &mut leaves);
        let names: Vec<_> = leaves.iter().map(|s| s.borrow().meta().name.to_string()).collect();
        assert_eq!(names, vec!["a", "b", "sel", "out"]);
    }

    #[test]
    fn typespec_round_trips_through_create_signal() {
        let spec = TypeSpec::bundle([
            (Id::new("a"), TypeSpec::bits(8).input()),
            (Id::new("b"), TypeSpec::list(3, TypeSpec::bits(2))),
        ]);
        let sig = create_signal(&spec, Id::new("io"), SignalParent::None);
        let back = typespec_of(&sig);
        assert!(TypeSpec::compare(&spec, &back));
    }
}
