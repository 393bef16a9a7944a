//! Declarative type descriptors.

use crate::DirTag;
use hdl_utils::{Error, Id, Result};

/// A recursive, algebraic type descriptor: a scalar bit-vector, a fixed
/// homogeneous sequence, or a named record, each carrying a direction tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Bits {
        width: u32,
        signed: bool,
        dir: DirTag,
    },
    List {
        len: usize,
        elem: Box<TypeSpec>,
        dir: DirTag,
    },
    Bundle {
        fields: Vec<(Id, TypeSpec)>,
        dir: DirTag,
    },
}

impl TypeSpec {
    pub fn bits(width: u32) -> Self {
        TypeSpec::Bits {
            width,
            signed: false,
            dir: DirTag::Inherit,
        }
    }

    pub fn signed_bits(width: u32) -> Self {
        TypeSpec::Bits {
            width,
            signed: true,
            dir: DirTag::Inherit,
        }
    }

    pub fn list(len: usize, elem: TypeSpec) -> Self {
        TypeSpec::List {
            len,
            elem: Box::new(elem),
            dir: DirTag::Inherit,
        }
    }

    pub fn bundle<I: IntoIterator<Item = (Id, TypeSpec)>>(fields: I) -> Self {
        TypeSpec::Bundle {
            fields: fields.into_iter().collect(),
            dir: DirTag::Inherit,
        }
    }

    pub fn dir(&self) -> DirTag {
        match self {
            TypeSpec::Bits { dir, .. }
            | TypeSpec::List { dir, .. }
            | TypeSpec::Bundle { dir, .. } => *dir,
        }
    }

    fn with_dir(mut self, dir: DirTag) -> Self {
        match &mut self {
            TypeSpec::Bits { dir: d, .. }
            | TypeSpec::List { dir: d, .. }
            | TypeSpec::Bundle { dir: d, .. } => *d = dir,
        }
        self
    }

    pub fn input(self) -> Self {
        self.with_dir(DirTag::Input)
    }

    pub fn output(self) -> Self {
        self.with_dir(DirTag::Output)
    }

    pub fn inout(self) -> Self {
        self.with_dir(DirTag::Inout)
    }

    pub fn flip(self) -> Self {
        self.with_dir(DirTag::Flipped)
    }

    /// Build a `List` TypeSpec from a sequence of already-built element
    /// typespecs, checking that all elements are structurally equal
    ///.
    pub fn build_list(elems: Vec<TypeSpec>) -> Result<Self> {
        let mut iter = elems.into_iter();
        let Some(first) = iter.next() else {
            return Err(Error::malformed_structure(
                "List TypeSpec must have at least one element",
            ));
        };
        let len = 1 + iter.clone().count();
        for other in iter {
            if !TypeSpec::compare(&first, &other) {
                return Err(Error::malformed_structure(
                    "all elements of a List TypeSpec must be structurally equal",
                ));
            }
        }
        Ok(TypeSpec::List {
            len,
            elem: Box::new(first),
            dir: DirTag::Inherit,
        })
    }

    /// Invert every concrete `Input`/`Output` tag in this tree, recursively.
    /// `Inout` stays put (it has no opposite); `Inherit`/`Flipped` stay put
    /// too since they're defined relative to a parent that's being flipped
    /// right alongside them. Used to shadow an instantiated module's IO
    /// with the enclosing module's perspective on each port.
    pub fn flip_directions(self) -> Self {
        let flip_tag = |dir: DirTag| match dir {
            DirTag::Input => DirTag::Output,
            DirTag::Output => DirTag::Input,
            other => other,
        };
        match self {
            TypeSpec::Bits { width, signed, dir } => TypeSpec::Bits {
                width,
                signed,
                dir: flip_tag(dir),
            },
            TypeSpec::List { len, elem, dir } => TypeSpec::List {
                len,
                elem: Box::new(elem.flip_directions()),
                dir: flip_tag(dir),
            },
            TypeSpec::Bundle { fields, dir } => TypeSpec::Bundle {
                fields: fields
                    .into_iter()
                    .map(|(name, field)| (name, field.flip_directions()))
                    .collect(),
                dir: flip_tag(dir),
            },
        }
    }

    /// Deep structural equality, ignoring direction tags (direction is
    /// resolved relative to context, not part of a type's shape).
    pub fn compare(a: &TypeSpec, b: &TypeSpec) -> bool {
        match (a, b) {
            (
                TypeSpec::Bits { width: w1, signed: s1, .. },
                TypeSpec::Bits { width: w2, signed: s2, .. },
            ) => w1 == w2 && s1 == s2,
            (
                TypeSpec::List { len: l1, elem: e1, .. },
                TypeSpec::List { len: l2, elem: e2, .. },
            ) => l1 == l2 && TypeSpec::compare(e1, e2),
            (
                TypeSpec::Bundle { fields: f1, .. },
                TypeSpec::Bundle { fields: f2, .. },
            ) => {
                f1.len() == f2.len()
                    && f1
                        .iter()
                        .zip(f2.iter())
                        .all(|((n1, t1), (n2, t2))| n1 == n2 && TypeSpec::compare(t1, t2))
            }
            _ => false,
        }
    }
}
