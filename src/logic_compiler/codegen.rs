// Logic Bytecode Generator
//
// Emits lowered statements depth-first into a single byte buffer. Jumps are
// 2-byte little-endian signed offsets counted from the byte after the offset
// field; forward targets are patched in place once known.

use crate::logic_compiler::ast::{Expr, Stmt};
use crate::logic_compiler::codegen_references::{
    patch_offset, relative_offset, ReferenceContext, PLACEHOLDER_OFFSET,
};
use crate::logic_compiler::commands::{CommandDescriptor, CommandSet, ParamKind};
use crate::logic_compiler::error::{CompilerError, SourceLocation};

/// Opens and closes the condition of an `if` and any nested `&&` group
pub const CONDITION_DELIMITER: u8 = 0xFF;
/// Opens and closes a nested `||` group
pub const OR_DELIMITER: u8 = 0xFC;
/// Negates the test that follows
pub const NOT_PREFIX: u8 = 0xFD;
/// Unconditional relative jump
pub const JUMP_OPCODE: u8 = 0xFE;
/// Offset following the condition of a `do` loop: skip the backward jump
/// when the condition fails
pub const DO_LOOP_SKIP: [u8; 2] = [0x03, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    And,
    Or,
}

pub struct LogicCodeGen<'a> {
    commands: &'a CommandSet,
    code: Vec<u8>,
    references: ReferenceContext,
}

impl<'a> LogicCodeGen<'a> {
    pub fn new(commands: &'a CommandSet) -> Self {
        LogicCodeGen {
            commands,
            code: Vec::new(),
            references: ReferenceContext::new(),
        }
    }

    /// Generate the code for a lowered program. Each call starts from an
    /// empty buffer and label table.
    pub fn generate(&mut self, program: &[Stmt]) -> Result<Vec<u8>, CompilerError> {
        self.code.clear();
        self.references = ReferenceContext::new();

        for stmt in program {
            self.emit_statement(stmt)?;
        }

        self.references.resolve_references(&mut self.code)?;
        log::info!("generated {} byte(s) of logic code", self.code.len());
        Ok(std::mem::take(&mut self.code))
    }

    fn emit_statement(&mut self, stmt: &Stmt) -> Result<(), CompilerError> {
        match stmt {
            Stmt::Call {
                name,
                args,
                location,
            } => {
                let commands = self.commands;
                let descriptor = commands
                    .actions
                    .get(name)
                    .ok_or_else(|| CompilerError::UnknownCommand(name.clone(), location.clone()))?;
                log::trace!("0x{:04x}: {}", self.code.len(), name);
                self.code.push(descriptor.opcode);
                self.emit_operands(descriptor, args, location)
            }
            Stmt::Label { name, location } => self.references.define_label(name, self.code.len(), location),
            Stmt::Goto { label, location } => {
                self.code.push(JUMP_OPCODE);
                let field = self.code.len();
                match self.references.address_of(label) {
                    Some(target) => {
                        let offset = relative_offset(field, target, label)?;
                        self.code.extend_from_slice(&offset.to_le_bytes());
                    }
                    None => {
                        self.code.extend_from_slice(&PLACEHOLDER_OFFSET);
                        self.references.add_unresolved_reference(label, field, location);
                    }
                }
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let skip_then = self.emit_condition(cond)?;
                self.emit_statement(then_branch)?;

                match else_branch {
                    Some(else_branch) => {
                        self.code.push(JUMP_OPCODE);
                        let skip_else = self.emit_placeholder();
                        self.patch_to_here(skip_then)?;
                        self.emit_statement(else_branch)?;
                        self.patch_to_here(skip_else)
                    }
                    None => self.patch_to_here(skip_then),
                }
            }
            Stmt::While { cond, body, .. } => {
                let top = self.code.len();
                if cond.as_constant().is_some_and(|value| value != 0) {
                    self.emit_statement(body)?;
                    return self.emit_jump_to(top, "loop start");
                }

                let exit = self.emit_condition(cond)?;
                self.emit_statement(body)?;
                self.emit_jump_to(top, "loop start")?;
                self.patch_to_here(exit)
            }
            Stmt::Do { body, cond, .. } => {
                let top = self.code.len();
                self.emit_statement(body)?;
                if !cond.as_constant().is_some_and(|value| value != 0) {
                    self.emit_condition_bytes(cond)?;
                    self.code.extend_from_slice(&DO_LOOP_SKIP);
                }
                self.emit_jump_to(top, "loop start")
            }
            Stmt::Block(statements) => {
                for stmt in statements {
                    self.emit_statement(stmt)?;
                }
                Ok(())
            }
            Stmt::Empty => Ok(()),
            Stmt::Assign { location, .. } => Err(CompilerError::CodeGenError(format!(
                "{}: assignment was not lowered to a command",
                location
            ))),
        }
    }

    /// Emit `FF <condition> FF` followed by a placeholder offset taken when
    /// the condition is false. Returns the position of the placeholder.
    fn emit_condition(&mut self, cond: &Expr) -> Result<usize, CompilerError> {
        self.emit_condition_bytes(cond)?;
        Ok(self.emit_placeholder())
    }

    fn emit_condition_bytes(&mut self, cond: &Expr) -> Result<(), CompilerError> {
        self.code.push(CONDITION_DELIMITER);
        self.emit_group(cond, GroupKind::And)?;
        self.code.push(CONDITION_DELIMITER);
        Ok(())
    }

    // A group of the same kind as its context is emitted without delimiters
    fn emit_group(&mut self, expr: &Expr, context: GroupKind) -> Result<(), CompilerError> {
        match expr {
            Expr::And(operands) => self.emit_delimited(operands, GroupKind::And, context, CONDITION_DELIMITER),
            Expr::Or(operands) => self.emit_delimited(operands, GroupKind::Or, context, OR_DELIMITER),
            Expr::Not(inner) => {
                self.code.push(NOT_PREFIX);
                self.emit_test(inner)
            }
            Expr::Call { .. } => self.emit_test(expr),
            other => Err(CompilerError::CodeGenError(format!(
                "{} cannot appear in a condition",
                other.describe()
            ))),
        }
    }

    fn emit_delimited(
        &mut self,
        operands: &[Expr],
        kind: GroupKind,
        context: GroupKind,
        delimiter: u8,
    ) -> Result<(), CompilerError> {
        let wrap = kind != context;
        if wrap {
            self.code.push(delimiter);
        }
        for operand in operands {
            self.emit_group(operand, kind)?;
        }
        if wrap {
            self.code.push(delimiter);
        }
        Ok(())
    }

    fn emit_test(&mut self, expr: &Expr) -> Result<(), CompilerError> {
        let Expr::Call {
            name,
            args,
            location,
        } = expr
        else {
            return Err(CompilerError::CodeGenError(format!(
                "expected a test command, found {}",
                expr.describe()
            )));
        };

        let commands = self.commands;
        let descriptor = commands
            .tests
            .get(name)
            .ok_or_else(|| CompilerError::UnknownCommand(name.clone(), location.clone()))?;
        self.code.push(descriptor.opcode);
        if descriptor.is_variable_arity() {
            let count = u8::try_from(args.len()).map_err(|_| {
                CompilerError::ValueOutOfRange(args.len() as i64, "argument count".to_string(), location.clone())
            })?;
            self.code.push(count);
        }
        self.emit_operands(descriptor, args, location)
    }

    fn emit_operands(
        &mut self,
        descriptor: &CommandDescriptor,
        args: &[Expr],
        location: &SourceLocation,
    ) -> Result<(), CompilerError> {
        descriptor.check_arity(args.len(), location)?;

        for (index, arg) in args.iter().enumerate() {
            let kind = descriptor.param_kind(index).ok_or_else(|| {
                CompilerError::CodeGenError(format!("'{}' has no parameter {}", descriptor.name, index))
            })?;
            let value = operand_value(kind, arg)
                .ok_or_else(|| CompilerError::TypeMismatch(kind.name().to_string(), arg.describe(), location.clone()))?;
            if !(0..=kind.max_value()).contains(&value) {
                return Err(CompilerError::ValueOutOfRange(value, kind.name().to_string(), location.clone()));
            }

            match kind.size() {
                2 => self.code.extend_from_slice(&(value as u16).to_le_bytes()),
                _ => self.code.push(value as u8),
            }
        }
        Ok(())
    }

    fn emit_placeholder(&mut self) -> usize {
        let field = self.code.len();
        self.code.extend_from_slice(&PLACEHOLDER_OFFSET);
        field
    }

    fn emit_jump_to(&mut self, target: usize, what: &str) -> Result<(), CompilerError> {
        self.code.push(JUMP_OPCODE);
        let field = self.code.len();
        let offset = relative_offset(field, target, what)?;
        self.code.extend_from_slice(&offset.to_le_bytes());
        Ok(())
    }

    fn patch_to_here(&mut self, field: usize) -> Result<(), CompilerError> {
        let offset = relative_offset(field, self.code.len(), "end of block")?;
        patch_offset(&mut self.code, field, offset)
    }
}

// Encoded value of an operand of the given kind
fn operand_value(kind: ParamKind, arg: &Expr) -> Option<i64> {
    let value = match (kind, arg) {
        (ParamKind::Number, Expr::Number(n)) => *n,
        (ParamKind::Word, Expr::Word(n)) => i64::from(*n),
        (ParamKind::Variable, Expr::Variable(n))
        | (ParamKind::Flag, Expr::Flag(n))
        | (ParamKind::Message, Expr::Message(n))
        | (ParamKind::Object, Expr::RoomObject(n))
        | (ParamKind::Item, Expr::Item(n))
        | (ParamKind::String, Expr::String(n))
        | (ParamKind::Controller, Expr::Controller(n)) => i64::from(*n),
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
#[path = "codegen_tests.rs"]
mod tests;
