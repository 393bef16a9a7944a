//! The elaborated intermediate representation: TypeSpecs, the Signal IR
//! tree, the predicated Connection AST and its lowering to a binary
//! decision tree, the structural operator algebra, and the Module/Instance
//! system that ties them together under a single-threaded [`Elaborator`].

pub mod circuit;
pub mod common;
pub mod connection;
pub mod direction;
pub mod elaborator;
pub mod memory;
pub mod module;
pub mod operator;
pub mod printer;
pub mod signal;
pub mod typespec;

pub use circuit::Circuit;
pub use common::{rrc, RRC, WRC};
pub use connection::{ConnectionBlock, ConnectionEntry, ConnectionTree, RhsValue};
pub use direction::{DirTag, Direction};
pub use elaborator::Elaborator;
pub use memory::{addr_width, CombReadPort, Memory, ReadPort, WritePort};
pub use module::{Instance, Module, ModuleCache};
pub use operator::{BinOpKind, Operator, OperatorArena};
pub use printer::Printer;
pub use signal::{
    collect_leaves, create_signal, resolve_direction, typespec_of, verilog_name, BitsSignal,
    BundleSignal, ListSignal, SignalNode, SignalParent,
};
pub use typespec::TypeSpec;
