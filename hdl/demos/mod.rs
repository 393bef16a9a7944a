//! Built-in demo circuits: the CLI's positional `demo` argument selects one
//! of these by name, and they double as fixtures for the crate's
//! integration tests.

mod adder;
mod enum_fsm;
mod gcd;
mod instance_demo;
mod memory_demo;
mod mux;

use hdl_ir::{Module, RRC};
use hdl_utils::{Error, Result};

/// Elaborate the named demo circuit, returning its top module.
pub fn build(name: &str) -> Result<RRC<Module>> {
    match name {
        "mux" => mux::build(),
        "adder" => adder::build(),
        "gcd" => gcd::build(),
        "enum" => enum_fsm::build(),
        "memory" => memory_demo::build(),
        "instance" => instance_demo::build(),
        other => Err(Error::context(format!(
            "unknown demo `{other}`; expected one of: mux, adder, gcd, enum, memory, instance"
        ))),
    }
}

pub const NAMES: &[&str] = &["mux", "adder", "gcd", "enum", "memory", "instance"];
