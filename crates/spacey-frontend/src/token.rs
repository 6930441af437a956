// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Token vocabulary shared by IR nodes and the encoded source stream.
//!
//! The numeric value of each token is its encoding in the source stream, so
//! the order of this enum is part of the encoded format.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A token tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum Token {
    // Stream markers
    /// End of input
    Eof = 0,
    /// Line break in the encoded source
    Eol,

    // Operations with a direct interpreter counterpart
    /// Push a scope object
    EnterWith,
    /// Pop a scope object
    LeaveWith,
    /// Return, optionally with a value
    Return,
    /// Unconditional jump
    Goto,
    /// Jump if true
    IfEq,
    /// Jump if false
    IfNe,
    /// Assign to a name
    SetName,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<<`
    Lsh,
    /// `>>`
    Rsh,
    /// `>>>`
    Ursh,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// unary `+`
    Pos,
    /// unary `-`
    Neg,
    /// `new`
    New,
    /// `delete`
    DelProp,
    /// `typeof`
    TypeOf,
    /// `a.b`
    GetProp,
    /// `a.b = c`
    SetProp,
    /// `a[b]`
    GetElem,
    /// `a[b] = c`
    SetElem,
    /// Function call
    Call,
    /// Identifier
    Name,
    /// Numeric literal
    Number,
    /// String literal
    String,
    /// `null`
    Null,
    /// `this`
    This,
    /// `false`
    False,
    /// `true`
    True,
    /// `===`
    ShEq,
    /// `!==`
    ShNe,
    /// Regular expression literal
    RegExp,
    /// Resolve the object holding a name
    BindName,
    /// `throw`
    Throw,
    /// Rethrow the pending exception
    Rethrow,
    /// `in`
    In,
    /// `instanceof`
    InstanceOf,
    /// Read a local-block slot
    LocalLoad,
    /// Read a variable slot
    GetVar,
    /// Write a variable slot
    SetVar,
    /// Create a catch scope object
    CatchScope,
    /// Start enumerating property names
    EnumInitKeys,
    /// Start enumerating property values
    EnumInitValues,
    /// Advance an enumeration
    EnumNext,
    /// Current enumeration id
    EnumId,
    /// The running function object
    ThisFn,
    /// Return the stored result
    ReturnResult,
    /// Array literal
    ArrayLit,
    /// Object literal; in the encoded source, the colon of a property
    ObjectLit,
    /// Read through a reference
    GetRef,
    /// Write through a reference
    SetRef,
    /// Delete through a reference
    DelRef,
    /// Call producing a reference
    RefCall,
    /// Special property reference (`__proto__`, `__parent__`)
    RefSpecial,

    // Syntax and lowering-only tokens
    /// `try`
    Try,
    /// `;`
    Semi,
    /// `[`
    Lb,
    /// `]`
    Rb,
    /// `{`
    Lc,
    /// `}`
    Rc,
    /// `(`
    Lp,
    /// `)`
    Rp,
    /// `,`
    Comma,
    /// `=`
    Assign,
    /// `|=`
    AssignBitOr,
    /// `^=`
    AssignBitXor,
    /// `&=`
    AssignBitAnd,
    /// `<<=`
    AssignLsh,
    /// `>>=`
    AssignRsh,
    /// `>>>=`
    AssignUrsh,
    /// `+=`
    AssignAdd,
    /// `-=`
    AssignSub,
    /// `*=`
    AssignMul,
    /// `/=`
    AssignDiv,
    /// `%=`
    AssignMod,
    /// `?`
    Hook,
    /// `:`
    Colon,
    /// `||`
    Or,
    /// `&&`
    And,
    /// `++`
    Inc,
    /// `--`
    Dec,
    /// `.`
    Dot,
    /// `function`
    Function,
    /// `if`
    If,
    /// `else`
    Else,
    /// `switch`
    Switch,
    /// `case`
    Case,
    /// `default`
    Default,
    /// `while`
    While,
    /// `do`
    Do,
    /// `for`
    For,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `var`
    Var,
    /// `with`
    With,
    /// `catch`
    Catch,
    /// `finally`
    Finally,
    /// `void`
    Void,
    /// `debugger`
    Debugger,
    /// Empty statement or missing expression
    Empty,
    /// Statement list
    Block,
    /// Labeled statement marker
    Label,
    /// Jump destination
    Target,
    /// Loop
    Loop,
    /// Expression evaluated for effect
    ExprVoid,
    /// Expression whose value is the script result
    ExprResult,
    /// Subroutine jump into a finally block
    Jsr,
    /// Script root
    Script,
    /// `typeof name` without a reference error
    TypeOfName,
    /// Operand taken from the stack
    UseStack,
    /// Compound property assignment
    SetPropOp,
    /// Compound element assignment
    SetElemOp,
    /// Scoped storage for transient values
    LocalBlock,
    /// Compound reference assignment
    SetRefOp,
    /// Closing brace of a function body in the encoded source
    FunctionEnd,
}

impl Token {
    /// Maps a compound assignment token to its binary operator.
    pub fn compound_operator(self) -> Option<Token> {
        Some(match self {
            Token::AssignBitOr => Token::BitOr,
            Token::AssignBitXor => Token::BitXor,
            Token::AssignBitAnd => Token::BitAnd,
            Token::AssignLsh => Token::Lsh,
            Token::AssignRsh => Token::Rsh,
            Token::AssignUrsh => Token::Ursh,
            Token::AssignAdd => Token::Add,
            Token::AssignSub => Token::Sub,
            Token::AssignMul => Token::Mul,
            Token::AssignDiv => Token::Div,
            Token::AssignMod => Token::Mod,
            _ => return None,
        })
    }

    /// Raw code unit of this token.
    pub fn code(self) -> u16 {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_codes_round_trip() {
        for token in [Token::Eol, Token::Name, Token::Rc, Token::FunctionEnd] {
            assert_eq!(Token::try_from(token.code()).unwrap(), token);
        }
    }

    #[test]
    fn test_unknown_code_rejected() {
        let past_end = Token::FunctionEnd.code() + 1;
        assert!(Token::try_from(past_end).is_err());
    }

    #[test]
    fn test_compound_operator() {
        assert_eq!(Token::AssignAdd.compound_operator(), Some(Token::Add));
        assert_eq!(Token::Assign.compound_operator(), None);
    }
}
