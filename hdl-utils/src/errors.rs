use crate::Id;

/// Convenience wrapper around the result of any fallible elaboration,
/// lowering, or emission step.
pub type Result<T> = std::result::Result<T, Error>;

/// A single fatal error produced by elaboration, lowering, or emission.
///
/// There is no local recovery: any `Error` aborts the circuit currently
/// being built.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Mismatched container shapes, bundle key mismatch, empty connection
    /// list on a driven non-register leaf, one-sided predicated assignment,
    /// or a container asked for a Verilog name.
    pub fn malformed_structure<S: ToString>(msg: S) -> Self {
        Self {
            kind: ErrorKind::MalformedStructure(msg.to_string()),
        }
    }

    /// Operand width mismatch, non-width-1 predicate, or assignment to an
    /// input-direction leaf.
    pub fn width_mismatch<S: ToString>(msg: S) -> Self {
        Self {
            kind: ErrorKind::WidthMismatch(msg.to_string()),
        }
    }

    /// Operator/signal created outside a module, condition popped from an
    /// empty stack, circuit re-entry, or unbalanced predicate stack on
    /// module exit.
    pub fn context<S: ToString>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Context(msg.to_string()),
        }
    }

    /// Incomplete decision tree or an unnamed signal
    /// encountered while computing a Verilog name.
    pub fn lowering<S: ToString>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Lowering(msg.to_string()),
        }
    }

    /// The emitter's output file could not be opened or written.
    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Io(msg.to_string()),
        }
    }

    /// A name collides with one already bound in the same scope.
    pub fn already_bound(name: Id, what: &'static str) -> Self {
        Self {
            kind: ErrorKind::AlreadyBound(name, what),
        }
    }
}

#[derive(Clone, Debug)]
enum ErrorKind {
    MalformedStructure(String),
    WidthMismatch(String),
    Context(String),
    Lowering(String),
    Io(String),
    AlreadyBound(Id, &'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::MalformedStructure(msg) => {
                write!(f, "malformed structure: {msg}")
            }
            ErrorKind::WidthMismatch(msg) => write!(f, "width mismatch: {msg}"),
            ErrorKind::Context(msg) => write!(f, "elaboration context error: {msg}"),
            ErrorKind::Lowering(msg) => write!(f, "lowering error: {msg}"),
            ErrorKind::Io(msg) => write!(f, "I/O error: {msg}"),
            ErrorKind::AlreadyBound(name, what) => {
                write!(f, "`{name}` is already bound as a {what}")
            }
        }
    }
}

impl std::error::Error for Error {}
