//! CLI entry point: elaborate one of the built-in demo circuits and emit
//! it through a chosen backend.

use std::fmt::Display;
use std::io::Write;
use std::process::ExitCode;
use std::str::FromStr;

use argh::FromArgs;
use hdl_backend::{Backend, EmitConfig, FirrtlBackend, VerilogBackend};
use hdl_utils::OutputFile;

enum Emit {
    Verilog,
    Firrtl,
}

impl FromStr for Emit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verilog" | "v" => Ok(Emit::Verilog),
            "firrtl" => Ok(Emit::Firrtl),
            other => Err(format!("unknown --emit target `{other}` (expected verilog or firrtl)")),
        }
    }
}

impl Display for Emit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Emit::Verilog => write!(f, "verilog"),
            Emit::Firrtl => write!(f, "firrtl"),
        }
    }
}

/// Elaborate one of the built-in demo circuits and emit it as Verilog or
/// FIRRTL. Run with no arguments to list the available demos.
#[derive(FromArgs)]
struct Opts {
    /// which demo circuit to elaborate (mux, adder, gcd, enum, memory, instance)
    #[argh(positional)]
    demo: Option<String>,

    /// emission target: verilog (default) or firrtl
    #[argh(option, long = "emit", default = "Emit::Verilog")]
    emit: Emit,

    /// output file, `-` for stdout (default), `<null>` to discard
    #[argh(option, short = 'o', default = "OutputFile::Stdout")]
    output: OutputFile,

    /// strip simulation-only constructs from the emitted output
    #[argh(switch, long = "synthesis-mode")]
    synthesis_mode: bool,

    /// emit combinational drivers as a flat sequence of named wires
    #[argh(switch, long = "flat-assign")]
    flat_assign: bool,

    /// print a structural dump of the elaborated IR instead of emitting a backend
    #[argh(switch, long = "dump-ir")]
    dump_ir: bool,

    /// log level (off, error, warn, info, debug, trace)
    #[argh(option, long = "log", default = "log::LevelFilter::Warn")]
    log_level: log::LevelFilter,
}

fn main() -> ExitCode {
    let opts: Opts = argh::from_env();

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let Some(demo) = opts.demo.as_deref() else {
        eprintln!("usage: hdl <demo> [--emit verilog|firrtl] [-o <path>]");
        eprintln!("available demos: {}", hdl::demos::NAMES.join(", "));
        return ExitCode::FAILURE;
    };

    let module = match hdl::demos::build(demo) {
        Ok(module) => module,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if opts.dump_ir {
        let result = hdl_ir::Printer::format_module(&module.borrow()).and_then(|dump| {
            opts.output
                .get_write()
                .and_then(|mut w| w.write_all(dump.as_bytes()).map_err(|e| hdl_utils::Error::write_error(e.to_string())))
        });
        return match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                log::error!("{err}");
                ExitCode::FAILURE
            }
        };
    }

    let conf = EmitConfig {
        synthesis_mode: opts.synthesis_mode,
        flat_assign: opts.flat_assign,
    };

    let result = match opts.emit {
        Emit::Verilog => VerilogBackend.run(&module.borrow(), &conf, &opts.output),
        Emit::Firrtl => FirrtlBackend.run(&module.borrow(), &conf, &opts.output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
