//! Textual rendering of IL trees.
//!
//! The output mirrors the usual ILAst notation: expressions are written
//! inline as `opcode operand(args)`, nested blocks are written on their own
//! lines with two-space indentation.
//!
//! ```text
//! Block IL_0000 (ControlFlow) {
//!   stloc handler(newobj DefaultInterpolatedStringHandler..ctor(ldc.i4 10, ldc.i4 1))
//!   call DefaultInterpolatedStringHandler.AppendLiteral(ldloca handler, ldstr "x=")
//! }
//! ```

use std::fmt::{self, Write};

use crate::{
    il::{ILFunction, InstrId, Instruction},
    typesystem::TypeSystem,
};

/// Display adapter for an instruction subtree.
pub struct InstructionDisplay<'a> {
    function: &'a ILFunction,
    types: &'a TypeSystem,
    root: InstrId,
}

impl ILFunction {
    /// Renders the whole body.
    #[must_use]
    pub fn display<'a>(&'a self, types: &'a TypeSystem) -> InstructionDisplay<'a> {
        self.display_instruction(self.body(), types)
    }

    /// Renders one instruction and its subtree.
    #[must_use]
    pub fn display_instruction<'a>(
        &'a self,
        id: InstrId,
        types: &'a TypeSystem,
    ) -> InstructionDisplay<'a> {
        InstructionDisplay {
            function: self,
            types,
            root: id,
        }
    }
}

impl InstructionDisplay<'_> {
    fn write_instr<W: Write>(&self, out: &mut W, id: InstrId, indent: usize) -> fmt::Result {
        let Some(instr) = self.function.get(id) else {
            return write!(out, "<invalid {id}>");
        };

        match instr {
            Instruction::Nop | Instruction::LdNull => out.write_str(instr.mnemonic()),
            Instruction::LdcI4(value) => write!(out, "ldc.i4 {value}"),
            Instruction::LdStr(value) => write!(out, "ldstr {value:?}"),
            Instruction::LdLoc(v) | Instruction::LdLoca(v) => {
                write!(out, "{} {}", instr.mnemonic(), self.function.variable(*v))
            }
            Instruction::StLoc { variable, value } => {
                write!(out, "stloc {}(", self.function.variable(*variable))?;
                self.write_instr(out, *value, indent)?;
                out.write_char(')')
            }
            Instruction::Call(call) => {
                let method = self.types.method(call.method);
                let declaring = self.types.type_def(method.declaring_type);
                write!(
                    out,
                    "{} {}.{}(",
                    call.opcode.mnemonic(),
                    declaring.name,
                    method.name
                )?;
                for (i, arg) in call.arguments.iter().enumerate() {
                    if i > 0 {
                        out.write_str(", ")?;
                    }
                    self.write_instr(out, *arg, indent)?;
                }
                out.write_char(')')
            }
            Instruction::Block(block) => {
                writeln!(out, "Block {id} ({:?}) {{", block.kind)?;
                for stmt in &block.instructions {
                    write_indent(out, indent + 1)?;
                    self.write_instr(out, *stmt, indent + 1)?;
                    out.write_char('\n')?;
                }
                if let Some(final_instruction) = block.final_instruction {
                    write_indent(out, indent + 1)?;
                    out.write_str("final: ")?;
                    self.write_instr(out, final_instruction, indent + 1)?;
                    out.write_char('\n')?;
                }
                write_indent(out, indent)?;
                out.write_char('}')
            }
            Instruction::Return { value } => match value {
                Some(v) => {
                    out.write_str("ret(")?;
                    self.write_instr(out, *v, indent)?;
                    out.write_char(')')
                }
                None => out.write_str("ret"),
            },
        }
    }
}

fn write_indent<W: Write>(out: &mut W, indent: usize) -> fmt::Result {
    for _ in 0..indent {
        out.write_str("  ")?;
    }
    Ok(())
}

impl fmt::Display for InstructionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_instr(f, self.root, 0)
    }
}
