//! Interface implemented by every emission target.

use hdl_ir::Module;
use hdl_utils::{OutputFile, Result};

/// Flags threaded through to an emitter, set by the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitConfig {
    /// Strip simulation-only constructs (initial/final blocks) so the
    /// output is synthesizable.
    pub synthesis_mode: bool,
    /// Emit combinational drivers as a flat sequence of named intermediate
    /// wires (ANF) instead of nested ternary expressions.
    pub flat_assign: bool,
}

pub trait Backend {
    /// The name of this backend, used by the CLI's `--emit` flag.
    fn name(&self) -> &'static str;

    /// Reject constructs this backend cannot represent.
    fn validate(module: &Module) -> Result<()>;

    /// Write `module`'s emission to `out`.
    fn emit(module: &Module, conf: &EmitConfig, out: &mut dyn std::io::Write) -> Result<()>;

    /// Validate, then emit, writing to `file`.
    fn run(&self, module: &Module, conf: &EmitConfig, file: &OutputFile) -> Result<()> {
        Self::validate(module)?;
        let mut writer = file.get_write()?;
        Self::emit(module, conf, &mut *writer)
    }
}
