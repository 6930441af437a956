// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode container owned by a compiled unit.
//!
//! The emitter fills it from a normalized IR tree; this crate only stores it
//! and reads the line markers back out.

use crate::token::Token;

/// An emitted instruction stream with its constant tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
    /// String constants (names, property keys, literals)
    pub strings: Vec<String>,
    /// Number constants
    pub numbers: Vec<f64>,
}

impl Bytecode {
    /// Creates an empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    /// Records the source line of the following instructions.
    pub fn mark_line(&mut self, line: u32) -> usize {
        self.emit(Instruction::with_operand(OpCode::Line, Operand::Line(line)))
    }

    /// Interns a string constant.
    pub fn add_string(&mut self, value: &str) -> u16 {
        if let Some(index) = self.strings.iter().position(|s| s == value) {
            return index as u16;
        }
        self.strings.push(value.to_string());
        (self.strings.len() - 1) as u16
    }

    /// Adds a number constant.
    pub fn add_number(&mut self, value: f64) -> u16 {
        self.numbers.push(value);
        (self.numbers.len() - 1) as u16
    }

    /// Lines named by LINE markers, in instruction order.
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.instructions.iter().filter_map(|i| match i.operand {
            Some(Operand::Line(line)) if i.opcode == OpCode::Line => Some(line),
            _ => None,
        })
    }
}

/// A single instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Instruction without an operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }
}

/// Instruction operands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// String table index
    String(u16),
    /// Number table index
    Number(u16),
    /// Parameter/variable slot
    Slot(u16),
    /// Relative jump offset
    Jump(i32),
    /// Number of arguments
    ArgCount(u8),
    /// Nested function index
    Function(u16),
    /// Source line
    Line(u32),
}

/// Operation codes.
///
/// Most IR primitives run as-is, so they are carried as their token; the
/// remaining codes cover stack and subroutine control that has no token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// Execute an IR primitive
    Op(Token),
    /// Source line marker
    Line,
    /// Discard the top value
    Pop,
    /// Duplicate the top value
    Dup,
    /// Unconditional jump
    Jump,
    /// Jump if the popped value is truthy
    JumpIfTrue,
    /// Jump if the popped value is falsy
    JumpIfFalse,
    /// Call a finally subroutine
    Jsr,
    /// Return from a finally subroutine
    RetSub,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_constants_are_interned() {
        let mut bytecode = Bytecode::new();
        assert_eq!(bytecode.add_string("x"), 0);
        assert_eq!(bytecode.add_string("y"), 1);
        assert_eq!(bytecode.add_string("x"), 0);
        assert_eq!(bytecode.add_number(1.5), 0);
    }

    #[test]
    fn test_lines_only_from_markers() {
        let mut bytecode = Bytecode::new();
        bytecode.mark_line(3);
        bytecode.emit(Instruction::with_operand(OpCode::Jump, Operand::Jump(-2)));
        bytecode.emit(Instruction::simple(OpCode::Op(Token::Return)));
        bytecode.mark_line(1);
        assert_eq!(bytecode.lines().collect::<Vec<_>>(), vec![3, 1]);
    }
}
