//! Arena-backed IL function bodies.
//!
//! An [`ILFunction`] owns every instruction node of one method in a flat
//! arena. Tree structure is expressed through [`InstrId`] handles: a node
//! lists its children inside its [`Instruction`], and stores a back link to
//! its parent. Detached nodes stay in the arena but are unreachable from the
//! body and therefore invisible to analysis.
//!
//! # Tree editing
//!
//! All structural edits go through the methods of [`ILFunction`] so parent
//! links always agree with child lists:
//!
//! - [`ILFunction::replace`] swaps a node for a detached node in the same slot
//! - [`ILFunction::insert`] / [`ILFunction::push`] add statements to a block
//! - [`ILFunction::remove_range`] detaches a run of statements
//! - [`ILFunction::set_final_instruction`] sets a block's tail value
//!
//! # Examples
//!
//! ```rust
//! use dotlift::il::{ILFunction, VariableKind};
//! use dotlift::typesystem::TypeSig;
//!
//! let mut function = ILFunction::new("Main");
//! let x = function.add_variable("x", TypeSig::Int32, VariableKind::Local);
//! let value = function.ldc_i4(42);
//! let store = function.stloc(x, value);
//! let body = function.body();
//! function.push(body, store)?;
//! function.recount_variables();
//! assert_eq!(function.variable(x).store_count(), 1);
//! # Ok::<(), dotlift::Error>(())
//! ```

use crate::{
    il::{
        Block, BlockKind, CallInstruction, CallOpCode, ILVariable, InstrId, Instruction,
        InstructionFlags, VariableId, VariableKind,
    },
    typesystem::{MethodId, TypeSig},
    Error, Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    instruction: Instruction,
    parent: Option<InstrId>,
}

/// The IL body of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ILFunction {
    name: String,
    nodes: Vec<Node>,
    variables: Vec<ILVariable>,
    body: InstrId,
}

impl ILFunction {
    /// Creates a function with an empty `ControlFlow` body block.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut function = Self {
            name: name.into(),
            nodes: Vec::new(),
            variables: Vec::new(),
            body: InstrId(0),
        };
        function.body = function.block(BlockKind::ControlFlow, Vec::new(), None);
        function
    }

    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The root block.
    #[must_use]
    pub fn body(&self) -> InstrId {
        self.body
    }

    /// Number of nodes in the arena, including detached ones.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Declares a new variable.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        ty: TypeSig,
        kind: VariableKind,
    ) -> VariableId {
        let id = VariableId(self.variables.len());
        self.variables.push(ILVariable::new(name, ty, kind));
        id
    }

    /// Returns a variable.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this function.
    #[must_use]
    pub fn variable(&self, id: VariableId) -> &ILVariable {
        &self.variables[id.0]
    }

    /// Returns a variable mutably.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this function.
    pub fn variable_mut(&mut self, id: VariableId) -> &mut ILVariable {
        &mut self.variables[id.0]
    }

    /// All variables with their ids.
    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &ILVariable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| (VariableId(i), v))
    }

    /// Recomputes store, load and address counters of every variable from
    /// the tree reachable from the body.
    pub fn recount_variables(&mut self) {
        for variable in &mut self.variables {
            variable.reset_counts();
        }
        for id in self.descendants(self.body) {
            match self.nodes[id.0].instruction {
                Instruction::LdLoc(v) => self.variables[v.0].add_load(),
                Instruction::LdLoca(v) => self.variables[v.0].add_address(),
                Instruction::StLoc { variable, .. } => self.variables[variable.0].add_store(),
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------
    // Node construction
    // ------------------------------------------------------------------

    /// Allocates a detached node and adopts its children.
    ///
    /// Children must be detached; a child that already has a parent is
    /// re-linked to the new node.
    pub fn alloc(&mut self, instruction: Instruction) -> InstrId {
        let id = InstrId(self.nodes.len());
        for child in instruction.children() {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes.push(Node {
            instruction,
            parent: None,
        });
        id
    }

    /// `nop`
    pub fn nop(&mut self) -> InstrId {
        self.alloc(Instruction::Nop)
    }

    /// `ldc.i4 value`
    pub fn ldc_i4(&mut self, value: i32) -> InstrId {
        self.alloc(Instruction::LdcI4(value))
    }

    /// `ldstr value`
    pub fn ldstr(&mut self, value: impl Into<String>) -> InstrId {
        self.alloc(Instruction::LdStr(value.into()))
    }

    /// `ldnull`
    pub fn ldnull(&mut self) -> InstrId {
        self.alloc(Instruction::LdNull)
    }

    /// `ldloc variable`
    pub fn ldloc(&mut self, variable: VariableId) -> InstrId {
        self.alloc(Instruction::LdLoc(variable))
    }

    /// `ldloca variable`
    pub fn ldloca(&mut self, variable: VariableId) -> InstrId {
        self.alloc(Instruction::LdLoca(variable))
    }

    /// `stloc variable(value)`
    pub fn stloc(&mut self, variable: VariableId, value: InstrId) -> InstrId {
        self.alloc(Instruction::StLoc { variable, value })
    }

    /// `call method(arguments)`
    pub fn call(&mut self, method: MethodId, arguments: Vec<InstrId>) -> InstrId {
        self.call_with(CallOpCode::Call, method, arguments)
    }

    /// `callvirt method(arguments)`
    pub fn callvirt(&mut self, method: MethodId, arguments: Vec<InstrId>) -> InstrId {
        self.call_with(CallOpCode::CallVirt, method, arguments)
    }

    /// `newobj method(arguments)`
    pub fn newobj(&mut self, constructor: MethodId, arguments: Vec<InstrId>) -> InstrId {
        self.call_with(CallOpCode::NewObj, constructor, arguments)
    }

    /// Any call form.
    pub fn call_with(
        &mut self,
        opcode: CallOpCode,
        method: MethodId,
        arguments: Vec<InstrId>,
    ) -> InstrId {
        self.alloc(Instruction::Call(CallInstruction {
            opcode,
            method,
            arguments,
        }))
    }

    /// `ret` / `ret value`
    pub fn ret(&mut self, value: Option<InstrId>) -> InstrId {
        self.alloc(Instruction::Return { value })
    }

    /// A nested block.
    pub fn block(
        &mut self,
        kind: BlockKind,
        instructions: Vec<InstrId>,
        final_instruction: Option<InstrId>,
    ) -> InstrId {
        self.alloc(Instruction::Block(Block {
            kind,
            instructions,
            final_instruction,
        }))
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Returns the instruction for `id`.
    #[must_use]
    pub fn get(&self, id: InstrId) -> Option<&Instruction> {
        self.nodes.get(id.0).map(|n| &n.instruction)
    }

    /// Returns the instruction for `id`, or [`Error::InvalidInstruction`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInstruction`] if `id` is not in the arena.
    pub fn instruction(&self, id: InstrId) -> Result<&Instruction> {
        self.get(id).ok_or(Error::InvalidInstruction(id))
    }

    /// Returns the parent of `id`, `None` for the body and detached nodes.
    #[must_use]
    pub fn parent(&self, id: InstrId) -> Option<InstrId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Child instructions of `id` in evaluation order.
    #[must_use]
    pub fn children(&self, id: InstrId) -> Vec<InstrId> {
        self.get(id).map(Instruction::children).unwrap_or_default()
    }

    /// Statements of a block.
    #[must_use]
    pub fn block_instructions(&self, block: InstrId) -> Option<&[InstrId]> {
        self.get(block)
            .and_then(Instruction::as_block)
            .map(|b| b.instructions.as_slice())
    }

    /// `id` and everything below it, in pre-order.
    #[must_use]
    pub fn descendants(&self, id: InstrId) -> Vec<InstrId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            result.push(current);
            let children = self.children(current);
            stack.extend(children.into_iter().rev());
        }
        result
    }

    /// All `ControlFlow` blocks reachable from the body, innermost first.
    #[must_use]
    pub fn control_flow_blocks(&self) -> Vec<InstrId> {
        let mut blocks: Vec<InstrId> = self
            .descendants(self.body)
            .into_iter()
            .filter(|&id| {
                matches!(
                    self.get(id),
                    Some(Instruction::Block(Block {
                        kind: BlockKind::ControlFlow,
                        ..
                    }))
                )
            })
            .collect();
        blocks.reverse();
        blocks
    }

    /// Effects of `id` including its whole subtree.
    #[must_use]
    pub fn flags(&self, id: InstrId) -> InstructionFlags {
        self.descendants(id)
            .into_iter()
            .filter_map(|i| self.get(i))
            .fold(InstructionFlags::empty(), |acc, instr| {
                acc | instr.direct_flags()
            })
    }

    /// Returns true if `ancestor` is `id` or one of its parents.
    #[must_use]
    pub fn is_descendant_of(&self, id: InstrId, ancestor: InstrId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    fn expect_detached(&self, id: InstrId) -> Result<()> {
        match self.nodes.get(id.0) {
            None => Err(Error::InvalidInstruction(id)),
            Some(node) if node.parent.is_some() || id == self.body => Err(malformed_error!(
                "instruction {} is already attached to the tree",
                id
            )),
            Some(_) => Ok(()),
        }
    }

    fn block_mut(&mut self, block: InstrId) -> Result<&mut Block> {
        match self.nodes.get_mut(block.0).map(|n| &mut n.instruction) {
            Some(Instruction::Block(b)) => Ok(b),
            Some(_) => Err(malformed_error!("instruction {} is not a block", block)),
            None => Err(Error::InvalidInstruction(block)),
        }
    }

    /// Puts the detached node `new` into the slot currently held by `old`.
    /// `old` becomes detached.
    ///
    /// # Errors
    ///
    /// Returns an error if `old` has no parent or `new` is already attached.
    pub fn replace(&mut self, old: InstrId, new: InstrId) -> Result<()> {
        self.expect_detached(new)?;
        let parent = self
            .parent(old)
            .ok_or_else(|| malformed_error!("instruction {} has no parent", old))?;
        if !self.nodes[parent.0].instruction.replace_child(old, new) {
            return Err(malformed_error!(
                "instruction {} is not a child of its parent {}",
                old,
                parent
            ));
        }
        self.nodes[new.0].parent = Some(parent);
        self.nodes[old.0].parent = None;
        Ok(())
    }

    /// Inserts the detached statement `instr` at `index` of `block`.
    ///
    /// # Errors
    ///
    /// Returns an error if `block` is not a block, `index` is out of range or
    /// `instr` is already attached.
    pub fn insert(&mut self, block: InstrId, index: usize, instr: InstrId) -> Result<()> {
        self.expect_detached(instr)?;
        let b = self.block_mut(block)?;
        if index > b.instructions.len() {
            return Err(malformed_error!(
                "insert index {} out of range for block {}",
                index,
                block
            ));
        }
        b.instructions.insert(index, instr);
        self.nodes[instr.0].parent = Some(block);
        Ok(())
    }

    /// Appends the detached statement `instr` to `block`.
    ///
    /// # Errors
    ///
    /// Returns an error if `block` is not a block or `instr` is already attached.
    pub fn push(&mut self, block: InstrId, instr: InstrId) -> Result<()> {
        let len = self.block_instructions(block).map_or(0, <[InstrId]>::len);
        self.insert(block, len, instr)
    }

    /// Detaches `count` statements of `block` starting at `start` and
    /// returns them in order.
    ///
    /// # Errors
    ///
    /// Returns an error if `block` is not a block or the range is out of bounds.
    pub fn remove_range(
        &mut self,
        block: InstrId,
        start: usize,
        count: usize,
    ) -> Result<Vec<InstrId>> {
        let b = self.block_mut(block)?;
        let end = start
            .checked_add(count)
            .filter(|&end| end <= b.instructions.len())
            .ok_or_else(|| {
                malformed_error!("range {}+{} out of bounds for block {}", start, count, block)
            })?;
        let removed: Vec<InstrId> = b.instructions.drain(start..end).collect();
        for id in &removed {
            self.nodes[id.0].parent = None;
        }
        Ok(removed)
    }

    /// Sets (or clears) the tail value of `block`. A previous tail becomes detached.
    ///
    /// # Errors
    ///
    /// Returns an error if `block` is not a block or `value` is already attached.
    pub fn set_final_instruction(&mut self, block: InstrId, value: Option<InstrId>) -> Result<()> {
        if let Some(v) = value {
            self.expect_detached(v)?;
        }
        let b = self.block_mut(block)?;
        let previous = std::mem::replace(&mut b.final_instruction, value);
        if let Some(p) = previous {
            self.nodes[p.0].parent = None;
        }
        if let Some(v) = value {
            self.nodes[v.0].parent = Some(block);
        }
        Ok(())
    }

    /// Detaches and returns the argument list of a call, leaving it empty.
    ///
    /// # Errors
    ///
    /// Returns an error if `call` is not a call instruction.
    pub fn take_arguments(&mut self, call: InstrId) -> Result<Vec<InstrId>> {
        let arguments = match self.nodes.get_mut(call.0).map(|n| &mut n.instruction) {
            Some(Instruction::Call(c)) => std::mem::take(&mut c.arguments),
            Some(_) => return Err(malformed_error!("instruction {} is not a call", call)),
            None => return Err(Error::InvalidInstruction(call)),
        };
        for id in &arguments {
            self.nodes[id.0].parent = None;
        }
        Ok(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typesystem::MethodId;

    fn sample() -> (ILFunction, VariableId, InstrId, InstrId) {
        let mut function = ILFunction::new("Sample");
        let v = function.add_variable("v", TypeSig::Int32, VariableKind::Local);
        let value = function.ldc_i4(1);
        let store = function.stloc(v, value);
        let addr = function.ldloca(v);
        let load = function.ldloc(v);
        let call = function.call(MethodId(0), vec![addr, load]);
        let body = function.body();
        function.push(body, store).unwrap();
        function.push(body, call).unwrap();
        (function, v, store, call)
    }

    #[test]
    fn test_parent_links() {
        let (function, _, store, call) = sample();
        let body = function.body();
        assert_eq!(function.parent(store), Some(body));
        assert_eq!(function.parent(call), Some(body));
        let args = function.children(call);
        assert_eq!(function.parent(args[0]), Some(call));
        assert!(function.is_descendant_of(args[1], body));
        assert_eq!(function.parent(body), None);
    }

    #[test]
    fn test_recount_variables() {
        let (mut function, v, _, _) = sample();
        function.recount_variables();
        let var = function.variable(v);
        assert_eq!(var.store_count(), 1);
        assert_eq!(var.load_count(), 1);
        assert_eq!(var.address_count(), 1);
    }

    #[test]
    fn test_recount_ignores_detached_nodes() {
        let (mut function, v, _, _) = sample();
        let body = function.body();
        function.remove_range(body, 1, 1).unwrap();
        function.recount_variables();
        assert_eq!(function.variable(v).load_count(), 0);
        assert_eq!(function.variable(v).address_count(), 0);
        assert_eq!(function.variable(v).store_count(), 1);
    }

    #[test]
    fn test_replace() {
        let (mut function, _, _, call) = sample();
        let args = function.children(call);
        let replacement = function.ldc_i4(5);
        function.replace(args[1], replacement).unwrap();

        assert_eq!(function.children(call), vec![args[0], replacement]);
        assert_eq!(function.parent(replacement), Some(call));
        assert_eq!(function.parent(args[1]), None);
    }

    #[test]
    fn test_replace_rejects_attached_node() {
        let (mut function, _, store, call) = sample();
        let args = function.children(call);
        assert!(function.replace(args[0], store).is_err());
        let detached = function.nop();
        assert!(function.replace(detached, args[0]).is_err());
    }

    #[test]
    fn test_remove_range_bounds() {
        let (mut function, _, _, _) = sample();
        let body = function.body();
        assert!(function.remove_range(body, 1, 5).is_err());
        let removed = function.remove_range(body, 0, 2).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(function.block_instructions(body).unwrap().is_empty());
    }

    #[test]
    fn test_set_final_instruction() {
        let mut function = ILFunction::new("F");
        let block = function.block(BlockKind::InterpolatedString, Vec::new(), None);
        let first = function.nop();
        let second = function.ldc_i4(0);
        function.set_final_instruction(block, Some(first)).unwrap();
        function.set_final_instruction(block, Some(second)).unwrap();
        assert_eq!(function.parent(first), None);
        assert_eq!(function.parent(second), Some(block));
    }

    #[test]
    fn test_take_arguments() {
        let (mut function, _, store, call) = sample();
        let args = function.take_arguments(call).unwrap();
        assert_eq!(args.len(), 2);
        assert!(function.children(call).is_empty());
        assert!(args.iter().all(|a| function.parent(*a).is_none()));
        assert!(function.take_arguments(store).is_err());
    }

    #[test]
    fn test_flags_cover_subtree() {
        let (function, _, store, call) = sample();
        assert!(function
            .flags(call)
            .contains(InstructionFlags::SIDE_EFFECT | InstructionFlags::MAY_READ_LOCALS));
        assert_eq!(function.flags(store), InstructionFlags::MAY_WRITE_LOCALS);
    }

    #[test]
    fn test_control_flow_blocks_innermost_first() {
        let mut function = ILFunction::new("Nested");
        let inner = function.block(BlockKind::ControlFlow, Vec::new(), None);
        let expr = function.block(BlockKind::InterpolatedString, Vec::new(), None);
        let body = function.body();
        function.push(body, inner).unwrap();
        function.push(body, expr).unwrap();
        assert_eq!(function.control_flow_blocks(), vec![inner, body]);
    }
}
