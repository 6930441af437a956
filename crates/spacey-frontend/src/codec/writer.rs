// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Encodes a syntax tree into the token stream.
//!
//! The stream mirrors what a parser would record while reading the source:
//! keywords, punctuation and line ends in source order. Parentheses are
//! re-derived from operator precedence.

use std::ops::Range;

use crate::ast::*;
use crate::error::InternalError;
use crate::ir::FunctionType;
use crate::token::Token;

use super::{EncodedSource, SourceEncoder};

type WriteResult = Result<(), InternalError>;

/// Encoded program plus the range of each function, in pre-order.
#[derive(Debug, Clone)]
pub struct WrittenSource {
    /// The whole program, starting with a SCRIPT token
    pub source: EncodedSource,
    /// `FUNCTION..FUNCTION_END` range of every function, outer before inner
    pub function_ranges: Vec<Range<usize>>,
}

/// Encodes `program`.
pub fn write_program(program: &Program) -> Result<WrittenSource, InternalError> {
    let mut writer = SourceWriter::default();
    writer.out.add_token(Token::Script);
    writer.statements(&program.body, true)?;
    Ok(WrittenSource {
        source: writer.out.finish(),
        function_ranges: writer.ranges,
    })
}

// Binding strength; an operand weaker than its slot gets parentheses.
const COMMA: u8 = 1;
const ASSIGN: u8 = 2;
const CONDITIONAL: u8 = 3;
const LOGICAL_OR: u8 = 4;
const UNARY: u8 = 14;
const POSTFIX: u8 = 15;
const MEMBER: u8 = 16;
const PRIMARY: u8 = 17;

fn binary_precedence(operator: BinaryOperator) -> u8 {
    use BinaryOperator::*;
    match operator {
        LogicalOr => 4,
        LogicalAnd => 5,
        BitwiseOr => 6,
        BitwiseXor => 7,
        BitwiseAnd => 8,
        Equal | NotEqual | StrictEqual | StrictNotEqual => 9,
        LessThan | LessThanEqual | GreaterThan | GreaterThanEqual | In | InstanceOf => 10,
        LeftShift | RightShift | UnsignedRightShift => 11,
        Add | Subtract => 12,
        Multiply | Divide | Modulo => 13,
    }
}

fn precedence(expression: &Expression) -> u8 {
    match expression {
        Expression::Sequence(_) => COMMA,
        Expression::Assignment(_) => ASSIGN,
        Expression::Conditional(_) => CONDITIONAL,
        Expression::Binary(b) => binary_precedence(b.operator),
        Expression::Unary(_) => UNARY,
        Expression::Update(u) if u.prefix => UNARY,
        Expression::Update(_) => POSTFIX,
        Expression::Literal(Literal::Number(n)) if *n < 0.0 => UNARY,
        Expression::Call(_) | Expression::New(_) | Expression::Member(_) => MEMBER,
        _ => PRIMARY,
    }
}

/// Would the statement's first token read as a declaration or a block?
fn starts_ambiguously(expression: &Expression) -> bool {
    match expression {
        Expression::Function(_) | Expression::Object(_) => true,
        Expression::Binary(b) => starts_ambiguously(&b.left),
        Expression::Assignment(a) => starts_ambiguously(&a.left),
        Expression::Conditional(c) => starts_ambiguously(&c.test),
        Expression::Call(c) => starts_ambiguously(&c.callee),
        Expression::Member(m) => starts_ambiguously(&m.object),
        Expression::Update(u) if !u.prefix => starts_ambiguously(&u.argument),
        Expression::Sequence(items) => items.first().is_some_and(starts_ambiguously),
        _ => false,
    }
}

/// `- -x` must not collapse into `--x`.
fn needs_sign_guard(operator: UnaryOperator, operand: &Expression) -> bool {
    let minus = match operator {
        UnaryOperator::Minus => true,
        UnaryOperator::Plus => false,
        _ => return false,
    };
    match operand {
        Expression::Unary(u) => {
            (minus && u.operator == UnaryOperator::Minus)
                || (!minus && u.operator == UnaryOperator::Plus)
        }
        Expression::Update(u) if u.prefix => {
            (minus && u.operator == UpdateOperator::Decrement)
                || (!minus && u.operator == UpdateOperator::Increment)
        }
        Expression::Literal(Literal::Number(n)) => minus && *n < 0.0,
        _ => false,
    }
}

#[derive(Default)]
struct SourceWriter {
    out: SourceEncoder,
    ranges: Vec<Range<usize>>,
}

impl SourceWriter {
    // ==================== Statements ====================

    /// `top_level` is true for the direct children of a script or function body.
    fn statements(&mut self, body: &[Statement], top_level: bool) -> WriteResult {
        for statement in body {
            self.statement(statement, top_level)?;
        }
        Ok(())
    }

    /// Writes `LC EOL body RC`, flattening a block body into the braces.
    fn braced(&mut self, body: &Statement) -> WriteResult {
        self.out.add_eol(Token::Lc);
        match &body.kind {
            StatementKind::Block(block) => self.statements(&block.body, false)?,
            _ => self.statement(body, false)?,
        }
        self.out.add_token(Token::Rc);
        Ok(())
    }

    fn braced_block(&mut self, block: &BlockStatement) -> WriteResult {
        self.out.add_eol(Token::Lc);
        self.statements(&block.body, false)?;
        self.out.add_eol(Token::Rc);
        Ok(())
    }

    fn parenthesized(&mut self, expression: &Expression) -> WriteResult {
        self.out.add_token(Token::Lp);
        self.expression(expression, COMMA)?;
        self.out.add_token(Token::Rp);
        Ok(())
    }

    fn statement(&mut self, statement: &Statement, top_level: bool) -> WriteResult {
        match &statement.kind {
            StatementKind::VariableDeclaration(declaration) => {
                self.var_list(declaration)?;
                self.out.add_eol(Token::Semi);
            }
            StatementKind::FunctionDeclaration(function) => {
                let function_type = if top_level {
                    FunctionType::Statement
                } else {
                    FunctionType::ExpressionStatement
                };
                self.function(function, function_type)?;
            }
            StatementKind::Expression(expression) => {
                if starts_ambiguously(expression) {
                    self.parenthesized(expression)?;
                } else {
                    self.expression(expression, COMMA)?;
                }
                self.out.add_eol(Token::Semi);
            }
            StatementKind::Block(block) => self.braced_block(block)?,
            StatementKind::If(s) => {
                self.out.add_token(Token::If);
                self.parenthesized(&s.test)?;
                self.braced(&s.consequent)?;
                if let Some(alternate) = &s.alternate {
                    self.out.add_token(Token::Else);
                    self.braced(alternate)?;
                }
                self.out.add_token(Token::Eol);
            }
            StatementKind::Switch(s) => {
                self.out.add_token(Token::Switch);
                self.parenthesized(&s.discriminant)?;
                self.out.add_eol(Token::Lc);
                for case in &s.cases {
                    match &case.test {
                        Some(test) => {
                            self.out.add_token(Token::Case);
                            self.expression(test, COMMA)?;
                        }
                        None => self.out.add_token(Token::Default),
                    }
                    self.out.add_eol(Token::Colon);
                    self.statements(&case.consequent, false)?;
                }
                self.out.add_eol(Token::Rc);
            }
            StatementKind::While(s) => {
                self.out.add_token(Token::While);
                self.parenthesized(&s.test)?;
                self.braced(&s.body)?;
                self.out.add_token(Token::Eol);
            }
            StatementKind::DoWhile(s) => {
                self.out.add_token(Token::Do);
                self.braced(&s.body)?;
                self.out.add_token(Token::While);
                self.parenthesized(&s.test)?;
                self.out.add_eol(Token::Semi);
            }
            StatementKind::For(s) => {
                self.out.add_token(Token::For);
                self.out.add_token(Token::Lp);
                match &s.init {
                    Some(ForInit::Declaration(declaration)) => self.var_list(declaration)?,
                    Some(ForInit::Expression(init)) => self.expression(init, COMMA)?,
                    None => {}
                }
                self.out.add_token(Token::Semi);
                if let Some(test) = &s.test {
                    self.expression(test, COMMA)?;
                }
                self.out.add_token(Token::Semi);
                if let Some(update) = &s.update {
                    self.expression(update, COMMA)?;
                }
                self.out.add_token(Token::Rp);
                self.braced(&s.body)?;
                self.out.add_token(Token::Eol);
            }
            StatementKind::ForIn(s) => {
                self.out.add_token(Token::For);
                if s.each {
                    self.out.add_name("each");
                }
                self.out.add_token(Token::Lp);
                match &s.left {
                    ForInLeft::Declaration(declaration) => self.var_list(declaration)?,
                    ForInLeft::Expression(target) => self.expression(target, MEMBER)?,
                }
                self.out.add_token(Token::In);
                self.expression(&s.right, COMMA)?;
                self.out.add_token(Token::Rp);
                self.braced(&s.body)?;
                self.out.add_token(Token::Eol);
            }
            StatementKind::Return(argument) => {
                self.out.add_token(Token::Return);
                if let Some(argument) = argument {
                    self.expression(argument, COMMA)?;
                }
                self.out.add_eol(Token::Semi);
            }
            StatementKind::Break(label) | StatementKind::Continue(label) => {
                let token = if matches!(statement.kind, StatementKind::Break(_)) {
                    Token::Break
                } else {
                    Token::Continue
                };
                self.out.add_token(token);
                if let Some(label) = label {
                    self.out.add_name(&label.name);
                }
                self.out.add_eol(Token::Semi);
            }
            StatementKind::Throw(argument) => {
                self.out.add_token(Token::Throw);
                self.expression(argument, COMMA)?;
                self.out.add_eol(Token::Semi);
            }
            StatementKind::Try(s) => {
                self.out.add_token(Token::Try);
                self.braced_block(&s.block)?;
                for handler in &s.handlers {
                    self.out.add_token(Token::Catch);
                    self.out.add_token(Token::Lp);
                    self.out.add_name(&handler.param.name);
                    if let Some(guard) = &handler.guard {
                        self.out.add_token(Token::If);
                        self.expression(guard, COMMA)?;
                    }
                    self.out.add_token(Token::Rp);
                    self.braced_block(&handler.body)?;
                }
                if let Some(finalizer) = &s.finalizer {
                    self.out.add_token(Token::Finally);
                    self.braced_block(finalizer)?;
                }
            }
            StatementKind::With(s) => {
                self.out.add_token(Token::With);
                self.parenthesized(&s.object)?;
                self.braced(&s.body)?;
                self.out.add_token(Token::Eol);
            }
            StatementKind::Labeled(s) => {
                self.out.add_name(&s.label.name);
                self.out.add_eol(Token::Colon);
                self.statement(&s.body, false)?;
            }
            StatementKind::Debugger => {
                self.out.add_token(Token::Debugger);
                self.out.add_eol(Token::Semi);
            }
            StatementKind::Empty => self.out.add_eol(Token::Semi),
        }
        Ok(())
    }

    fn var_list(&mut self, declaration: &VariableDeclaration) -> WriteResult {
        self.out.add_token(Token::Var);
        for (i, declarator) in declaration.declarations.iter().enumerate() {
            if i > 0 {
                self.out.add_token(Token::Comma);
            }
            self.out.add_name(&declarator.id.name);
            if let Some(init) = &declarator.init {
                self.out.add_token(Token::Assign);
                self.expression(init, ASSIGN)?;
            }
        }
        Ok(())
    }

    fn function(&mut self, function: &Function, function_type: FunctionType) -> WriteResult {
        let index = self.ranges.len();
        let start = self.out.mark_function_start(function_type);
        self.ranges.push(start..start);
        if let Some(id) = &function.id {
            self.out.add_name(&id.name);
        }
        self.out.add_token(Token::Lp);
        for (i, param) in function.params.iter().enumerate() {
            if i > 0 {
                self.out.add_token(Token::Comma);
            }
            self.out.add_name(&param.name);
        }
        self.out.add_token(Token::Rp);
        self.out.add_eol(Token::Lc);
        self.statements(&function.body, true)?;
        self.out.add_token(Token::Rc);
        self.ranges[index].end = self.out.mark_function_end();
        if function_type != FunctionType::Expression {
            self.out.add_token(Token::Eol);
        }
        Ok(())
    }

    // ==================== Expressions ====================

    fn expression(&mut self, expression: &Expression, slot: u8) -> WriteResult {
        let wrap = precedence(expression) < slot;
        if wrap {
            self.out.add_token(Token::Lp);
        }
        self.expression_unwrapped(expression)?;
        if wrap {
            self.out.add_token(Token::Rp);
        }
        Ok(())
    }

    fn arguments(&mut self, arguments: &[Expression]) -> WriteResult {
        self.out.add_token(Token::Lp);
        for (i, argument) in arguments.iter().enumerate() {
            if i > 0 {
                self.out.add_token(Token::Comma);
            }
            self.expression(argument, ASSIGN)?;
        }
        self.out.add_token(Token::Rp);
        Ok(())
    }

    fn expression_unwrapped(&mut self, expression: &Expression) -> WriteResult {
        match expression {
            Expression::Literal(literal) => self.literal(literal)?,
            Expression::Identifier(id) => self.out.add_name(&id.name),
            Expression::This => self.out.add_token(Token::This),
            Expression::Array(elements) => {
                self.out.add_token(Token::Lb);
                let last = elements.len().saturating_sub(1);
                for (i, element) in elements.iter().enumerate() {
                    if let Some(element) = element {
                        self.expression(element, ASSIGN)?;
                    }
                    // a trailing hole needs its own comma
                    if i < last || element.is_none() {
                        self.out.add_token(Token::Comma);
                    }
                }
                self.out.add_token(Token::Rb);
            }
            Expression::Object(properties) => {
                self.out.add_token(Token::Lc);
                for (i, property) in properties.iter().enumerate() {
                    if i > 0 {
                        self.out.add_token(Token::Comma);
                    }
                    match &property.key {
                        PropertyKey::Identifier(id) => self.out.add_name(&id.name),
                        PropertyKey::String(s) => self.out.add_string(s),
                        PropertyKey::Number(n) => self.out.add_number(*n)?,
                    }
                    self.out.add_token(Token::ObjectLit);
                    self.expression(&property.value, ASSIGN)?;
                }
                self.out.add_token(Token::Rc);
            }
            Expression::Binary(b) => {
                let level = binary_precedence(b.operator);
                self.expression(&b.left, level)?;
                self.out.add_token(b.operator.token());
                self.expression(&b.right, level + 1)?;
            }
            Expression::Unary(u) => {
                self.out.add_token(u.operator.token());
                if needs_sign_guard(u.operator, &u.argument) {
                    self.expression(&u.argument, PRIMARY + 1)?;
                } else {
                    self.expression(&u.argument, UNARY)?;
                }
            }
            Expression::Update(u) => {
                let token = u.operator.token();
                if u.prefix {
                    self.out.add_token(token);
                    self.expression(&u.argument, MEMBER)?;
                } else {
                    self.expression(&u.argument, MEMBER)?;
                    self.out.add_token(token);
                }
            }
            Expression::Assignment(a) => {
                self.expression(&a.left, MEMBER)?;
                self.out.add_token(a.operator.token());
                self.expression(&a.right, ASSIGN)?;
            }
            Expression::Conditional(c) => {
                self.expression(&c.test, LOGICAL_OR)?;
                self.out.add_token(Token::Hook);
                self.expression(&c.consequent, ASSIGN)?;
                self.out.add_token(Token::Colon);
                self.expression(&c.alternate, ASSIGN)?;
            }
            Expression::Call(call) => {
                self.expression(&call.callee, MEMBER)?;
                self.arguments(&call.arguments)?;
            }
            Expression::New(call) => {
                self.out.add_token(Token::New);
                // `new (f())()` differs from `new f()()`
                let slot = if matches!(*call.callee, Expression::Call(_)) {
                    PRIMARY
                } else {
                    MEMBER
                };
                self.expression(&call.callee, slot)?;
                self.arguments(&call.arguments)?;
            }
            Expression::Member(m) => {
                let slot = if matches!(*m.object, Expression::Literal(Literal::Number(_))) {
                    PRIMARY + 1
                } else {
                    MEMBER
                };
                self.expression(&m.object, slot)?;
                match &m.property {
                    MemberProperty::Identifier(id) => {
                        self.out.add_token(Token::Dot);
                        self.out.add_name(&id.name);
                    }
                    MemberProperty::Computed(index) => {
                        self.out.add_token(Token::Lb);
                        self.expression(index, COMMA)?;
                        self.out.add_token(Token::Rb);
                    }
                }
            }
            Expression::Function(function) => self.function(function, FunctionType::Expression)?,
            Expression::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.add_token(Token::Comma);
                    }
                    self.expression(item, ASSIGN)?;
                }
            }
        }
        Ok(())
    }

    fn literal(&mut self, literal: &Literal) -> WriteResult {
        match literal {
            Literal::Number(n) if *n < 0.0 => {
                self.out.add_token(Token::Neg);
                self.out.add_number(-*n)?;
            }
            Literal::Number(n) => self.out.add_number(*n)?,
            Literal::String(s) => self.out.add_string(s),
            Literal::Boolean(true) => self.out.add_token(Token::True),
            Literal::Boolean(false) => self.out.add_token(Token::False),
            Literal::Null => self.out.add_token(Token::Null),
            Literal::RegExp { pattern, flags } => self.out.add_regexp(pattern, flags),
        }
        Ok(())
    }
}
