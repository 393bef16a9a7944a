use std::collections::HashSet;
use std::sync::Mutex;

lazy_static::lazy_static! {
    static ref INTERNER: Mutex<HashSet<&'static str>> = Mutex::new(HashSet::new());
}

fn intern(s: &str) -> &'static str {
    let mut table = INTERNER.lock().unwrap();
    if let Some(existing) = table.get(s) {
        return existing;
    }
    let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
    table.insert(leaked);
    leaked
}

/// A cheap, `Copy` identifier interned in a process-global string table.
///
/// Every signal, module, and operator name in the IR is an `Id`. Two `Id`s
/// compare equal iff they were interned from equal strings. Interned strings
/// live for the remainder of the process, so `Id` never borrows.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(&'static str);

impl Id {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Id(intern(s.as_ref()))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::new("")
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        self.0
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::new(s)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::new(s)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Anything that exposes a stable [`Id`] name, used by collections that key
/// entities by name (module registries, per-module operator dedup tables).
pub trait GetName {
    fn name(&self) -> Id;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedups() {
        let a = Id::new("io_sel");
        let b = Id::new("io_sel");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "io_sel");
    }

    #[test]
    fn distinct_strings_are_distinct() {
        assert_ne!(Id::new("a"), Id::new("b"));
    }
}
