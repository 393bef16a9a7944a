//! Embedded hardware-description DSL ergonomics layered over `hdl-ir`'s
//! structural elaboration engine: named io access, `Wire`/`Reg`
//! declaration, `with`/`otherwise` predicate scoping, the bits operator
//! algebra, `Enum`, and `Mem`.
//!
//! `hdl-ir` threads an explicit `&mut Elaborator` through every mutating
//! call rather than hiding it behind a thread-local or an `Rc<RefCell<_>>`
//! handle baked into every signal; this crate keeps that convention instead
//! of overloading Rust operator traits for it, since building a structural
//! operator or recording a connection is an eager write into the current
//! module's arena, not a pure expression.

pub mod circuit;
#[path = "../demos/mod.rs"]
pub mod demos;
pub mod enumeration;
pub mod io;
pub mod mem;
pub mod sig;

pub use circuit::{instance, HdlCircuit};
pub use enumeration::Enum;
pub use io::{io_spec, Io};
pub use mem::Mem;
pub use sig::{cat, connect, literal, mux2, mux_list, reg, when, when_otherwise, wire, Rhs, Sig};

pub use hdl_ir::{Elaborator, Module, TypeSpec};
pub use hdl_utils::{Error, Result};
