//! The single-threaded, cooperative elaboration context: circuit/module
//! stacks, the predicate stack, and `with`/`otherwise` scoping.
//!
//! There is exactly one [`Elaborator`] alive per [`crate::circuit::Circuit`]
//! build. It tracks which module is currently being built and the nested
//! stack of `with`/`otherwise` predicates in scope, so that a connection
//! written deep inside nested conditionals can be routed to the right spot
//! in its target leaf's connection list without the caller threading any of
//! that bookkeeping by hand.

use crate::common::{rrc, RRC};
use crate::connection::{insert_connection, RhsValue};
use crate::memory::Memory;
use crate::module::{Instance, Module};
use crate::operator::OperatorArena;
use crate::signal::{create_signal, typespec_of, SignalNode, SignalParent};
use hdl_utils::{Error, Id, Result};

/// One entry in the nested `with`/`otherwise` stack: the condition signal
/// and which branch (`true` for the `with` arm, `false` for `otherwise`) is
/// currently active.
type PredicateFrame = (RRC<SignalNode>, bool);

/// Bookkeeping for a single module body under construction.
pub struct ModuleFrame {
    pub name: Id,
    pub predicate_stack: Vec<PredicateFrame>,
    pub operators: OperatorArena,
    pub op_counter: usize,
    pub internal_signals: Vec<RRC<SignalNode>>,
    pub instances: Vec<Instance>,
    pub memories: Vec<RRC<Memory>>,
}

impl ModuleFrame {
    fn new(name: Id) -> Self {
        Self {
            name,
            predicate_stack: Vec::new(),
            operators: OperatorArena::new(),
            op_counter: 0,
            internal_signals: Vec::new(),
            instances: Vec::new(),
            memories: Vec::new(),
        }
    }
}

/// The elaboration context threaded through a circuit build. Holds a stack
/// of module frames (nested only through instantiation, never concurrently)
/// and forbids circuit re-entry.
pub struct Elaborator {
    module_stack: Vec<ModuleFrame>,
    building_circuit: bool,
}

impl Default for Elaborator {
    fn default() -> Self {
        Self::new()
    }
}

impl Elaborator {
    pub fn new() -> Self {
        Self {
            module_stack: Vec::new(),
            building_circuit: false,
        }
    }

    /// Mark the start of a circuit build. Errors if one is already underway
    ///.
    pub fn enter_circuit(&mut self) -> Result<()> {
        if self.building_circuit {
            return Err(Error::context("circuit elaboration is not re-entrant"));
        }
        self.building_circuit = true;
        Ok(())
    }

    pub fn exit_circuit(&mut self) {
        self.building_circuit = false;
    }

    pub fn enter_module(&mut self, name: Id) {
        self.module_stack.push(ModuleFrame::new(name));
    }

    /// Pop the current module frame, erroring if its predicate stack is
    /// unbalanced (every `with` must be closed before the module body
    /// returns).
    pub fn exit_module(&mut self) -> Result<ModuleFrame> {
        let frame = self
            .module_stack
            .pop()
            .ok_or_else(|| Error::context("exit_module called with no module on the stack"))?;
        if !frame.predicate_stack.is_empty() {
            return Err(Error::context(format!(
                "module `{}` left {} unclosed `with` scope(s)",
                frame.name,
                frame.predicate_stack.len()
            )));
        }
        Ok(frame)
    }

    fn current_mut(&mut self) -> Result<&mut ModuleFrame> {
        self.module_stack
            .last_mut()
            .ok_or_else(|| Error::context("no module is currently being elaborated"))
    }

    /// Push a `with(cond)` scope. The predicate must be a single bit; a
    /// wider signal is a width error.
    pub fn push_with(&mut self, cond: RRC<SignalNode>) -> Result<()> {
        check_predicate_width(&cond)?;
        self.current_mut()?.predicate_stack.push((cond, true));
        Ok(())
    }

    /// Flip the top-of-stack frame from its `with` arm to its `otherwise`
    /// arm. Errors if there is no open `with` in the current frame.
    pub fn enter_otherwise(&mut self) -> Result<()> {
        let frame = self.current_mut()?;
        let top = frame
            .predicate_stack
            .last_mut()
            .ok_or_else(|| Error::context("`otherwise` with no matching `with` in scope"))?;
        if !top.1 {
            return Err(Error::context("`otherwise` used twice for the same `with`"));
        }
        top.1 = false;
        Ok(())
    }

    /// Pop the innermost `with`/`otherwise` scope.
    pub fn pop_predicate(&mut self) -> Result<()> {
        let frame = self.current_mut()?;
        frame
            .predicate_stack
            .pop()
            .map(|_| ())
            .ok_or_else(|| Error::context("popped a predicate scope with none open"))
    }

    /// Record `lhs <<= rhs`, nested under whatever `with`/`otherwise` scopes
    /// are currently open.
    pub fn connect(&mut self, lhs: &RRC<SignalNode>, rhs: RhsValue) -> Result<()> {
        {
            let expected = lhs
                .borrow()
                .as_bits()
                .ok_or_else(|| Error::malformed_structure("connect target must be a Bits leaf"))?
                .width;
            let got = rhs.width()?;
            if expected != got {
                return Err(Error::width_mismatch(format!(
                    "connection target is {expected} bits wide, rhs is {got} bits wide"
                )));
            }
        }
        let path = self.current_mut()?.predicate_stack.clone();
        let mut leaf = lhs.borrow_mut();
        let SignalNode::Bits(bits) = &mut *leaf else {
            return Err(Error::malformed_structure("connect target must be a Bits leaf"));
        };
        insert_connection(&mut bits.connections, &path, rhs);
        Ok(())
    }

    pub fn operators(&mut self) -> Result<&mut OperatorArena> {
        Ok(&mut self.current_mut()?.operators)
    }

    /// Register a free-standing `Wire`/`Reg` declared in the current
    /// module's body, so the backend can later find it without walking the
    /// whole IO tree.
    pub fn declare_internal(&mut self, signal: RRC<SignalNode>) -> Result<()> {
        self.current_mut()?.internal_signals.push(signal);
        Ok(())
    }

    /// Instantiate `module` under `name` in the current module body. Returns
    /// a fresh io signal tree, name-scoped under the instance, that the
    /// caller wires into exactly like any other signal: drive its
    /// input-direction leaves, read its output-direction leaves.
    pub fn instantiate(&mut self, name: Id, module: RRC<Module>) -> Result<RRC<SignalNode>> {
        let spec = typespec_of(&module.borrow().io).flip_directions();
        let io = create_signal(&spec, name, SignalParent::None);
        self.current_mut()?.instances.push(Instance {
            name,
            module,
            io: io.clone(),
        });
        Ok(io)
    }

    /// Declare a memory in the current module body, returning a shared
    /// handle its `read`/`read_comb`/`write` methods mutate in place.
    pub fn declare_memory(&mut self, width: u32, depth: u32, clock: RRC<SignalNode>) -> Result<RRC<Memory>> {
        let idx = self.current_mut()?.memories.len();
        let mem = rrc(Memory::new(Id::new(format!("mem_{idx}")), width, depth, clock));
        self.current_mut()?.memories.push(mem.clone());
        Ok(mem)
    }

    /// The predicate path currently in scope, used by backends or tests
    /// that need to observe elaboration context without mutating it.
    pub fn current_predicate_path(&mut self) -> Result<Vec<PredicateFrame>> {
        Ok(self.current_mut()?.predicate_stack.clone())
    }

    /// Allocate the next synthetic `_NODE_k` index for the current module.
    pub fn next_node_index(&mut self) -> Result<usize> {
        let frame = self.current_mut()?;
        let idx = frame.op_counter;
        frame.op_counter += 1;
        Ok(idx)
    }
}

fn check_predicate_width(cond: &RRC<SignalNode>) -> Result<()> {
    let width = cond
        .borrow()
        .as_bits()
        .ok_or_else(|| Error::malformed_structure("a predicate must be a Bits leaf"))?
        .width;
    if width != 1 {
        return Err(Error::width_mismatch(format!(
            "predicate must be exactly 1 bit wide, got {width}"
        )));
    }
    Ok(())
}
