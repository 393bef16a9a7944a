//! Per-leaf ordered connection lists and
//! their lowering to a binary mux tree.

use crate::common::RRC;
use crate::signal::{verilog_name, SignalNode};
use hdl_utils::{Error, Result};
use std::rc::Rc;

/// The right-hand side of a connection: another leaf, a dynamic select into
/// a `List` signal, or an integer/bool literal.
#[derive(Clone, Debug)]
pub enum RhsValue {
    Signal(RRC<SignalNode>),
    /// `list(index)` — a dynamic, unregistered select over a `List` signal's
    /// elements. Lowered directly to a ternary chain at emission time
    ///.
    ListIndex {
        list: RRC<SignalNode>,
        index: RRC<SignalNode>,
    },
    Literal { value: i64, width: u32, signed: bool },
}

impl RhsValue {
    pub fn width(&self) -> Result<u32> {
        match self {
            RhsValue::Signal(sig) => sig
                .borrow()
                .as_bits()
                .map(|b| b.width)
                .ok_or_else(|| Error::malformed_structure("connection rhs must be a leaf signal")),
            RhsValue::ListIndex { list, .. } => match &*list.borrow() {
                SignalNode::List(l) => Ok(l
                    .fields
                    .first()
                    .and_then(|f| f.borrow().as_bits().map(|b| b.width))
                    .unwrap_or(0)),
                _ => Err(Error::malformed_structure("ListIndex target must be a List signal")),
            },
            RhsValue::Literal { width, .. } => Ok(*width),
        }
    }
}

/// A single entry in a leaf's ordered connection list: either a raw RHS or a
/// nested predicate block.
#[derive(Clone, Debug)]
pub enum ConnectionEntry {
    Rhs(RhsValue),
    Block(ConnectionBlock),
}

#[derive(Clone, Debug)]
pub struct ConnectionBlock {
    pub predicate: RRC<SignalNode>,
    pub true_branch: Vec<ConnectionEntry>,
    pub false_branch: Vec<ConnectionEntry>,
}

/// The lowered, binary-mux form of a connection list.
#[derive(Clone, Debug)]
pub enum ConnectionTree {
    Leaf(RhsValue),
    Node {
        predicate: RRC<SignalNode>,
        true_path: Box<ConnectionTree>,
        false_path: Box<ConnectionTree>,
    },
}

/// Append `rhs` to `connections`, nested under the predicate frames in
/// `predicate_path`, reusing the most recent block at each scope when its
/// predicate matches.
pub fn insert_connection(
    connections: &mut Vec<ConnectionEntry>,
    predicate_path: &[(RRC<SignalNode>, bool)],
    rhs: RhsValue,
) {
    let mut cursor: &mut Vec<ConnectionEntry> = connections;
    for (pred_sig, branch) in predicate_path {
        let reuse = matches!(
            cursor.last(),
            Some(ConnectionEntry::Block(b)) if Rc::ptr_eq(&b.predicate, pred_sig)
        );
        if !reuse {
            cursor.push(ConnectionEntry::Block(ConnectionBlock {
                predicate: pred_sig.clone(),
                true_branch: Vec::new(),
                false_branch: Vec::new(),
            }));
        }
        let Some(ConnectionEntry::Block(block)) = cursor.last_mut() else {
            unreachable!("just pushed or matched a Block entry")
        };
        cursor = if *branch {
            &mut block.true_branch
        } else {
            &mut block.false_branch
        };
    }
    cursor.push(ConnectionEntry::Rhs(rhs));
}

/// Lower an ordered connection list to a [`ConnectionTree`].
/// Returns `Ok(None)` only for an empty list (rule 1); any other shape
/// either produces a tree or a lowering [`Error`] (rule 3, incomplete
/// decision).
pub fn build_tree(entries: &[ConnectionEntry]) -> Result<Option<ConnectionTree>> {
    let Some(last) = entries.last() else {
        return Ok(None);
    };
    match last {
        // Rule 2: a trailing raw rhs shadows everything earlier.
        ConnectionEntry::Rhs(rhs) => Ok(Some(ConnectionTree::Leaf(rhs.clone()))),
        ConnectionEntry::Block(block) => {
            // Rule 3: a lone predicated entry must cover both branches.
            if entries.len() == 1
                && (block.true_branch.is_empty() || block.false_branch.is_empty())
            {
                return Err(Error::lowering(
                    "incomplete decision: a predicated assignment has no fallback",
                ));
            }
            let prefix = &entries[..entries.len() - 1];
            let true_tree = branch_tree(prefix, &block.true_branch)?;
            let false_tree = branch_tree(prefix, &block.false_branch)?;
            Ok(Some(ConnectionTree::Node {
                predicate: block.predicate.clone(),
                true_path: Box::new(true_tree),
                false_path: Box::new(false_tree),
            }))
        }
    }
}

/// Rules 4/5: a non-empty branch is lowered together with the prefix acting
/// as its default; an empty branch falls through to the prefix alone.
fn branch_tree(prefix: &[ConnectionEntry], branch: &[ConnectionEntry]) -> Result<ConnectionTree> {
    if branch.is_empty() {
        return Ok(build_tree(prefix)?
            .expect("prefix is non-empty whenever a sibling branch was required to be"));
    }
    let combined: Vec<ConnectionEntry> = prefix.iter().cloned().chain(branch.iter().cloned()).collect();
    Ok(build_tree(&combined)?.expect("a non-empty entry list always lowers to a tree"))
}

/// Structural zip of container-to-container assignment sugar: list
/// assignment is index-parallel, bundle assignment is key-parallel and may
/// supply a subset of `lhs`'s keys. Leaf-to-leaf
/// assignment is delegated to `connect_leaf` via the caller.
pub fn zip_leaves(
    lhs: &RRC<SignalNode>,
    rhs: &RRC<SignalNode>,
) -> Result<Vec<(RRC<SignalNode>, RRC<SignalNode>)>> {
    let mut pairs = Vec::new();
    zip_leaves_into(lhs, rhs, &mut pairs)?;
    Ok(pairs)
}

fn zip_leaves_into(
    lhs: &RRC<SignalNode>,
    rhs: &RRC<SignalNode>,
    out: &mut Vec<(RRC<SignalNode>, RRC<SignalNode>)>,
) -> Result<()> {
    let lhs_ref = lhs.borrow();
    let rhs_ref = rhs.borrow();
    match (&*lhs_ref, &*rhs_ref) {
        (SignalNode::Bits(_), SignalNode::Bits(_)) => {
            out.push((lhs.clone(), rhs.clone()));
            Ok(())
        }
        (SignalNode::List(l), SignalNode::List(r)) => {
            if l.fields.len() != r.fields.len() {
                return Err(Error::malformed_structure(format!(
                    "list length mismatch in container assignment: {} vs {}",
                    l.fields.len(),
                    r.fields.len()
                )));
            }
            let pairs: Vec<_> = l.fields.iter().cloned().zip(r.fields.iter().cloned()).collect();
            drop(lhs_ref);
            drop(rhs_ref);
            for (l_field, r_field) in pairs {
                zip_leaves_into(&l_field, &r_field, out)?;
            }
            Ok(())
        }
        (SignalNode::Bundle(l), SignalNode::Bundle(r)) => {
            let mut pairs = Vec::new();
            for (name, r_field) in &r.fields {
                let Some((_, l_field)) = l.fields.iter().find(|(n, _)| n == name) else {
                    return Err(Error::malformed_structure(format!(
                        "bundle assignment references unknown key `{name}`"
                    )));
                };
                pairs.push((l_field.clone(), r_field.clone()));
            }
            drop(lhs_ref);
            drop(rhs_ref);
            for (l_field, r_field) in pairs {
                zip_leaves_into(&l_field, &r_field, out)?;
            }
            Ok(())
        }
        _ => Err(Error::malformed_structure(
            "container assignment shape mismatch",
        )),
    }
}

/// The emission-time name of a leaf, surfaced for error messages. An
/// unnamed or unnameable signal is a hard lowering error.
pub fn debug_name(signal: &RRC<SignalNode>) -> String {
    verilog_name(signal).unwrap_or_else(|_| "<unnamed>".to_string())
}
