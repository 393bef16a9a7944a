//! Emission targets for the `hdl-ir` intermediate representation: a
//! synthesizable Verilog backend and a FIRRTL-like textual sibling,
//! behind a shared [`Backend`] trait so the CLI can pick one by name.

mod firrtl;
mod traits;
mod verilog;

pub use firrtl::FirrtlBackend;
pub use traits::{Backend, EmitConfig};
pub use verilog::VerilogBackend;
