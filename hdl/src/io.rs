//! `Io`: named access into a module's io bundle, plus the sugar that turns
//! a circuit's `default_clock`/`default_reset` switches into silently
//! prepended `clock`/`reset` input fields.

use crate::sig::Sig;
use hdl_ir::{SignalNode, TypeSpec, RRC};
use hdl_utils::{Error, Id, Result};

/// A handle to a module's `io` bundle (or any nested bundle/instance io),
/// giving named field access instead of walking `SignalNode::Bundle` by
/// hand.
#[derive(Clone)]
pub struct Io(RRC<SignalNode>);

impl Io {
    pub fn new(node: RRC<SignalNode>) -> Self {
        Io(node)
    }

    pub fn node(&self) -> RRC<SignalNode> {
        self.0.clone()
    }

    pub fn field(&self, name: &str) -> Result<Sig> {
        match &*self.0.borrow() {
            SignalNode::Bundle(b) => b
                .fields
                .iter()
                .find(|(n, _)| n.as_str() == name)
                .map(|(_, s)| Sig::from_node(s.clone()))
                .ok_or_else(|| Error::malformed_structure(format!("io has no field `{name}`"))),
            _ => Err(Error::malformed_structure("io root is not a Bundle")),
        }
    }

    /// The auto-added `clock` input, if this circuit enabled it.
    pub fn clock(&self) -> Option<Sig> {
        self.field("clock").ok()
    }

    /// The auto-added `reset` input, if this circuit enabled it.
    pub fn reset(&self) -> Option<Sig> {
        self.field("reset").ok()
    }
}

/// Build a module's io `TypeSpec`, prepending `clock`/`reset` input bits
/// when the enclosing circuit was configured to supply them.
pub fn io_spec<I>(fields: I, default_clock: bool, default_reset: bool) -> TypeSpec
where
    I: IntoIterator<Item = (&'static str, TypeSpec)>,
{
    let mut built: Vec<(Id, TypeSpec)> = Vec::new();
    if default_clock {
        built.push((Id::new("clock"), TypeSpec::bits(1).input()));
    }
    if default_reset {
        built.push((Id::new("reset"), TypeSpec::bits(1).input()));
    }
    built.extend(fields.into_iter().map(|(name, spec)| (Id::new(name), spec)));
    TypeSpec::bundle(built)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdl_ir::{create_signal, SignalParent};

    #[test]
    fn io_spec_prepends_clock_and_reset() {
        let spec = io_spec([("x", TypeSpec::bits(4).input())], true, true);
        match spec {
            TypeSpec::Bundle { fields, .. } => {
                assert_eq!(fields[0].0, Id::new("clock"));
                assert_eq!(fields[1].0, Id::new("reset"));
                assert_eq!(fields[2].0, Id::new("x"));
            }
            _ => panic!("expected a Bundle"),
        }
    }

    #[test]
    fn field_lookup_finds_named_entries() {
        let spec = io_spec([("x", TypeSpec::bits(4).input())], false, false);
        let node = create_signal(&spec, Id::new("io"), SignalParent::None);
        let io = Io::new(node);
        assert_eq!(io.field("x").unwrap().width().unwrap(), 4);
        assert!(io.field("missing").is_err());
        assert!(io.clock().is_none());
    }
}
