// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Syntax tree to IR.
//!
//! Walks a [`Program`] and drives one [`IrBuilder`] per script or function.
//! Label and loop bookkeeping lives here: the builder only sees resolved
//! LOOP, LABEL and switch owners. Problems in the script are reported and
//! replaced with an EMPTY node so the walk finds every error in one pass.
//!
//! Sub-expressions are visited in source order, so nested functions are
//! numbered the same way the codec's writer ranges them.


use tracing::{debug, trace};

use crate::ast::*;
use crate::builder::{CatchHandler, IrBuilder};
use crate::diagnostics::{Diagnostic, ErrorReporter, MessageId};
use crate::env::CompilerEnv;
use crate::error::InternalError;
use crate::ir::{FunctionType, NodeId, PropertyId, UnitIr};
use crate::token::Token;

type LowerResult<T> = Result<T, InternalError>;

/// Lowers a whole program into its script unit.
pub fn lower_program(
    env: &CompilerEnv,
    program: &Program,
    reporter: &mut dyn ErrorReporter,
) -> LowerResult<UnitIr> {
    let mut lowerer = Lowerer {
        env,
        reporter,
        depth: 0,
    };
    let mut scope = UnitScope::new(env, false);
    let statements = lowerer.statement_list(&mut scope, &program.body, true)?;
    let unit = scope.builder.finish_script(&statements);
    debug!(
        statements = statements.len(),
        nodes = unit.tree.len(),
        functions = unit.functions.len(),
        "lowered script"
    );
    Ok(unit)
}

fn line_of(line: u32) -> Option<u32> {
    (line != 0).then_some(line)
}

/// `"7"` names index 7; `"07"` and `"-1"` are ordinary names.
fn index_of_string(key: &str) -> Option<u32> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<u32>().ok().filter(|&index| index != u32::MAX)
}

fn property_id(key: &PropertyKey) -> PropertyId {
    match key {
        PropertyKey::Identifier(id) => PropertyId::Name(id.name.clone()),
        PropertyKey::String(s) => match index_of_string(s) {
            Some(index) => PropertyId::Index(index),
            None => PropertyId::Name(s.clone()),
        },
        PropertyKey::Number(n) => {
            let integral = n.fract() == 0.0 && *n >= 0.0 && *n < f64::from(u32::MAX);
            if integral {
                PropertyId::Index(*n as u32)
            } else {
                PropertyId::Name(crate::codec::number_to_string(*n))
            }
        }
    }
}

/// Statement that `break` without a label leaves.
#[derive(Debug, Clone, Copy)]
enum Breakable {
    Loop(NodeId),
    Switch(NodeId),
}

#[derive(Debug)]
struct ActiveLabel {
    name: String,
    node: NodeId,
    loop_node: Option<NodeId>,
}

/// Per-unit lowering state.
struct UnitScope<'env> {
    builder: IrBuilder<'env>,
    breakable: Vec<Breakable>,
    labels: Vec<ActiveLabel>,
}

impl<'env> UnitScope<'env> {
    fn new(env: &'env CompilerEnv, inside_function: bool) -> Self {
        Self {
            builder: IrBuilder::new(env, inside_function),
            breakable: Vec::new(),
            labels: Vec::new(),
        }
    }

    fn label(&self, name: &str) -> Option<&ActiveLabel> {
        self.labels.iter().rev().find(|label| label.name == name)
    }

    fn placeholder(&mut self, line: Option<u32>) -> NodeId {
        let node = self.builder.create_leaf(Token::Empty);
        self.builder.tree_mut().set_line(node, line);
        node
    }
}

struct Lowerer<'env, 'r> {
    env: &'env CompilerEnv,
    reporter: &'r mut dyn ErrorReporter,
    depth: usize,
}

impl<'env> Lowerer<'env, '_> {
    fn report(&mut self, message: MessageId, line: Option<u32>, detail: Option<String>) {
        self.reporter.error(Diagnostic {
            message,
            source_name: self.env.source_name().clone(),
            line,
            detail,
        });
    }

    /// Enters one nesting level; false (after reporting) when too deep.
    fn enter(&mut self, line: Option<u32>) -> bool {
        if self.depth >= self.env.max_syntax_depth() {
            self.report(MessageId::TooDeepRecursion, line, None);
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ==================== Statements ====================

    /// `top_level` is true for the direct children of a script or function body.
    fn statement_list(
        &mut self,
        scope: &mut UnitScope<'env>,
        body: &[Statement],
        top_level: bool,
    ) -> LowerResult<Vec<NodeId>> {
        body.iter()
            .map(|statement| self.statement(scope, statement, top_level, Vec::new()))
            .collect()
    }

    fn block(&mut self, scope: &mut UnitScope<'env>, body: &[Statement], line: Option<u32>) -> LowerResult<NodeId> {
        let statements = self.statement_list(scope, body, false)?;
        Ok(scope.builder.create_block(&statements, line))
    }

    /// `labels` are LABEL nodes directly in front of this statement; a loop claims them.
    fn statement(
        &mut self,
        scope: &mut UnitScope<'env>,
        statement: &Statement,
        top_level: bool,
        labels: Vec<NodeId>,
    ) -> LowerResult<NodeId> {
        let line = line_of(statement.line);
        if !self.enter(line) {
            return Ok(scope.placeholder(line));
        }
        let result = self.statement_kind(scope, statement, top_level, labels, line);
        self.leave();
        result
    }

    fn statement_kind(
        &mut self,
        scope: &mut UnitScope<'env>,
        statement: &Statement,
        top_level: bool,
        labels: Vec<NodeId>,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        match &statement.kind {
            StatementKind::VariableDeclaration(declaration) => self.var(scope, declaration, line),
            StatementKind::FunctionDeclaration(function) => {
                if let Some(id) = &function.id {
                    scope.builder.declare_var(&id.name);
                }
                if top_level {
                    self.function(scope, function, FunctionType::Statement)
                } else {
                    let node = self.function(scope, function, FunctionType::ExpressionStatement)?;
                    Ok(scope.builder.create_expr_statement_no_return(node, line))
                }
            }
            StatementKind::Expression(expression) => {
                let expr = self.expression(scope, expression, line)?;
                Ok(scope.builder.create_expr_statement(expr, line))
            }
            StatementKind::Block(block) => self.block(scope, &block.body, line),
            StatementKind::If(s) => {
                let cond = self.expression(scope, &s.test, line)?;
                let if_true = self.statement(scope, &s.consequent, false, Vec::new())?;
                let if_false = match &s.alternate {
                    Some(alternate) => Some(self.statement(scope, alternate, false, Vec::new())?),
                    None => None,
                };
                Ok(scope.builder.create_if(cond, if_true, if_false, line))
            }
            StatementKind::Switch(s) => self.switch(scope, s, line),
            StatementKind::While(s) => {
                let lp = self.open_loop(scope, &labels, line)?;
                let cond = self.expression(scope, &s.test, line)?;
                let body = self.loop_body(scope, lp, &s.body)?;
                scope.builder.create_while(lp, cond, body)
            }
            StatementKind::DoWhile(s) => {
                let lp = self.open_loop(scope, &labels, line)?;
                let body = self.loop_body(scope, lp, &s.body)?;
                let cond = self.expression(scope, &s.test, line)?;
                scope.builder.create_do_while(lp, body, cond)
            }
            StatementKind::For(s) => {
                let lp = self.open_loop(scope, &labels, line)?;
                let init = match &s.init {
                    Some(ForInit::Declaration(declaration)) => Some(self.var(scope, declaration, line)?),
                    Some(ForInit::Expression(init)) => Some(self.expression(scope, init, line)?),
                    None => None,
                };
                let cond = self.optional_expression(scope, s.test.as_ref(), line)?;
                let incr = self.optional_expression(scope, s.update.as_ref(), line)?;
                let body = self.loop_body(scope, lp, &s.body)?;
                scope.builder.create_for(lp, init, cond, incr, body)
            }
            StatementKind::ForIn(s) => {
                let lp = self.open_loop(scope, &labels, line)?;
                let lhs = match &s.left {
                    ForInLeft::Declaration(declaration) => self.var(scope, declaration, line)?,
                    ForInLeft::Expression(target) => self.expression(scope, target, line)?,
                };
                let obj = self.expression(scope, &s.right, line)?;
                let body = self.loop_body(scope, lp, &s.body)?;
                scope
                    .builder
                    .create_for_in(lp, lhs, obj, body, s.each, line, &mut *self.reporter)
            }
            StatementKind::Return(argument) => {
                if !scope.builder.inside_function() {
                    self.report(MessageId::BadReturn, line, None);
                    return Ok(scope.placeholder(line));
                }
                let value = self.optional_expression(scope, argument.as_ref(), line)?;
                Ok(scope.builder.create_return(value, line))
            }
            StatementKind::Break(label) => self.break_statement(scope, label.as_ref(), line),
            StatementKind::Continue(label) => self.continue_statement(scope, label.as_ref(), line),
            StatementKind::Throw(argument) => {
                let value = self.expression(scope, argument, line)?;
                Ok(scope.builder.create_throw(value, line))
            }
            StatementKind::Try(s) => self.try_statement(scope, s, line),
            StatementKind::With(s) => {
                let obj = self.expression(scope, &s.object, line)?;
                let body = self.statement(scope, &s.body, false, Vec::new())?;
                Ok(scope.builder.create_with(obj, body, line))
            }
            StatementKind::Labeled(s) => self.labeled(scope, s, labels, line),
            StatementKind::Debugger => {
                let node = scope.builder.create_leaf(Token::Debugger);
                scope.builder.tree_mut().set_line(node, line);
                Ok(node)
            }
            StatementKind::Empty => Ok(scope.placeholder(line)),
        }
    }

    fn var(
        &mut self,
        scope: &mut UnitScope<'env>,
        declaration: &VariableDeclaration,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        let mut declarators = Vec::with_capacity(declaration.declarations.len());
        for declarator in &declaration.declarations {
            scope.builder.declare_var(&declarator.id.name);
            let init = self.optional_expression(scope, declarator.init.as_ref(), line)?;
            declarators.push((declarator.id.name.clone(), init));
        }
        Ok(scope.builder.create_var(&declarators, line))
    }

    fn switch(
        &mut self,
        scope: &mut UnitScope<'env>,
        s: &SwitchStatement,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        let discriminant = self.expression(scope, &s.discriminant, line)?;
        let block = scope.builder.create_switch(discriminant, line);
        scope.breakable.push(Breakable::Switch(block));
        let mut has_default = false;
        for case in &s.cases {
            let test = match &case.test {
                Some(test) => Some(self.expression(scope, test, line)?),
                None => {
                    if has_default {
                        self.report(MessageId::DoubleSwitchDefault, line, None);
                    }
                    has_default = true;
                    None
                }
            };
            let body = self.block(scope, &case.consequent, None)?;
            scope.builder.add_switch_case(block, test, body)?;
        }
        scope.breakable.pop();
        scope.builder.close_switch(block)?;
        Ok(block)
    }

    /// Creates a LOOP and hands it the labels written directly in front of it.
    fn open_loop(
        &mut self,
        scope: &mut UnitScope<'env>,
        labels: &[NodeId],
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        let lp = scope.builder.create_loop_node(line);
        for &label in labels {
            scope.builder.set_label_loop(label, lp)?;
            if let Some(active) = scope.labels.iter_mut().find(|active| active.node == label) {
                active.loop_node = Some(lp);
            }
        }
        Ok(lp)
    }

    fn loop_body(&mut self, scope: &mut UnitScope<'env>, lp: NodeId, body: &Statement) -> LowerResult<NodeId> {
        scope.breakable.push(Breakable::Loop(lp));
        let body = self.statement(scope, body, false, Vec::new());
        scope.breakable.pop();
        body
    }

    fn labeled(
        &mut self,
        scope: &mut UnitScope<'env>,
        s: &LabeledStatement,
        mut labels: Vec<NodeId>,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        let name = s.label.name.as_str();
        if scope.label(name).is_some() {
            self.report(MessageId::DuplicateLabel, line, Some(name.to_string()));
            return self.statement(scope, &s.body, false, labels);
        }
        let label = scope.builder.create_label(name, line);
        scope.labels.push(ActiveLabel {
            name: name.to_string(),
            node: label,
            loop_node: None,
        });
        labels.push(label);
        let body = self.statement(scope, &s.body, false, labels);
        scope.labels.pop();
        scope.builder.create_labeled_statement(label, body?)
    }

    fn break_statement(
        &mut self,
        scope: &mut UnitScope<'env>,
        label: Option<&Identifier>,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        let owner = match label {
            Some(label) => match scope.label(&label.name) {
                Some(active) => active.node,
                None => {
                    self.report(MessageId::UndefinedLabel, line, Some(label.name.clone()));
                    return Ok(scope.placeholder(line));
                }
            },
            None => match scope.breakable.last() {
                Some(Breakable::Loop(node) | Breakable::Switch(node)) => *node,
                None => {
                    self.report(MessageId::BadBreak, line, None);
                    return Ok(scope.placeholder(line));
                }
            },
        };
        scope.builder.create_break(owner, line)
    }

    fn continue_statement(
        &mut self,
        scope: &mut UnitScope<'env>,
        label: Option<&Identifier>,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        let lp = match label {
            Some(label) => match scope.label(&label.name) {
                Some(ActiveLabel {
                    loop_node: Some(lp), ..
                }) => *lp,
                Some(_) => {
                    self.report(MessageId::ContinueNonLoop, line, Some(label.name.clone()));
                    return Ok(scope.placeholder(line));
                }
                None => {
                    self.report(MessageId::UndefinedLabel, line, Some(label.name.clone()));
                    return Ok(scope.placeholder(line));
                }
            },
            None => {
                let innermost = scope.breakable.iter().rev().find_map(|b| match b {
                    Breakable::Loop(lp) => Some(*lp),
                    Breakable::Switch(_) => None,
                });
                match innermost {
                    Some(lp) => lp,
                    None => {
                        self.report(MessageId::ContinueOutside, line, None);
                        return Ok(scope.placeholder(line));
                    }
                }
            }
        };
        scope.builder.create_continue(lp, line)
    }

    fn try_statement(
        &mut self,
        scope: &mut UnitScope<'env>,
        s: &TryStatement,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        let try_block = self.block(scope, &s.block.body, line)?;
        let mut handlers = Vec::with_capacity(s.handlers.len());
        for handler in &s.handlers {
            let handler_line = line_of(handler.line).or(line);
            let guard = self.optional_expression(scope, handler.guard.as_ref(), handler_line)?;
            let body = self.block(scope, &handler.body.body, handler_line)?;
            handlers.push(CatchHandler {
                name: handler.param.name.clone(),
                guard,
                body,
                line: handler_line,
            });
        }
        let finally_block = match &s.finalizer {
            Some(finalizer) => Some(self.block(scope, &finalizer.body, None)?),
            None => None,
        };
        scope.builder.create_try_catch_finally(
            try_block,
            handlers,
            finally_block,
            line,
            &mut *self.reporter,
        )
    }

    fn function(
        &mut self,
        scope: &mut UnitScope<'env>,
        function: &Function,
        function_type: FunctionType,
    ) -> LowerResult<NodeId> {
        let line = line_of(function.line);
        let mut inner = UnitScope::new(self.env, true);
        for param in &function.params {
            inner.builder.declare_param(&param.name);
        }
        let statements = self.statement_list(&mut inner, &function.body, true)?;
        let body = inner.builder.create_block(&statements, line);
        let name = function.id.as_ref().map(|id| id.name.clone());
        trace!(name = ?name, ?function_type, "lowered function");
        let unit = inner.builder.finish_function(name, function_type, body, line)?;
        Ok(scope.builder.add_function(unit))
    }

    // ==================== Expressions ====================

    fn optional_expression(
        &mut self,
        scope: &mut UnitScope<'env>,
        expression: Option<&Expression>,
        line: Option<u32>,
    ) -> LowerResult<Option<NodeId>> {
        expression
            .map(|expression| self.expression(scope, expression, line))
            .transpose()
    }

    fn expression(
        &mut self,
        scope: &mut UnitScope<'env>,
        expression: &Expression,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        if !self.enter(line) {
            return Ok(scope.placeholder(line));
        }
        let result = self.expression_kind(scope, expression, line);
        self.leave();
        result
    }

    fn expression_kind(
        &mut self,
        scope: &mut UnitScope<'env>,
        expression: &Expression,
        line: Option<u32>,
    ) -> LowerResult<NodeId> {
        let node = match expression {
            Expression::Literal(literal) => match literal {
                Literal::Number(n) => scope.builder.create_number(*n),
                Literal::String(s) => scope.builder.create_string(s),
                Literal::Boolean(true) => scope.builder.create_leaf(Token::True),
                Literal::Boolean(false) => scope.builder.create_leaf(Token::False),
                Literal::Null => scope.builder.create_leaf(Token::Null),
                Literal::RegExp { pattern, flags } => scope.builder.create_regexp(pattern, flags),
            },
            Expression::Identifier(id) => scope.builder.create_name(&id.name),
            Expression::This => scope.builder.create_leaf(Token::This),
            Expression::Array(elements) => {
                let mut lowered = Vec::with_capacity(elements.len());
                for element in elements {
                    lowered.push(self.optional_expression(scope, element.as_ref(), line)?);
                }
                scope.builder.create_array_literal(&lowered)
            }
            Expression::Object(properties) => {
                let mut lowered = Vec::with_capacity(properties.len());
                for property in properties {
                    let value = self.expression(scope, &property.value, line)?;
                    lowered.push((property_id(&property.key), value));
                }
                scope.builder.create_object_literal(lowered)
            }
            Expression::Binary(b) => {
                let left = self.expression(scope, &b.left, line)?;
                let right = self.expression(scope, &b.right, line)?;
                scope.builder.create_binary(b.operator.token(), left, right)
            }
            Expression::Unary(u) => {
                let operand = self.expression(scope, &u.argument, line)?;
                scope.builder.create_unary(u.operator.token(), operand)?
            }
            Expression::Assignment(a) => {
                let left = self.expression(scope, &a.left, line)?;
                let right = self.expression(scope, &a.right, line)?;
                scope
                    .builder
                    .create_assignment(a.operator.token(), left, right, line, &mut *self.reporter)?
            }
            Expression::Call(call) | Expression::New(call) => {
                let token = if matches!(expression, Expression::New(_)) {
                    Token::New
                } else {
                    Token::Call
                };
                let callee = self.expression(scope, &call.callee, line)?;
                let mut arguments = Vec::with_capacity(call.arguments.len());
                for argument in &call.arguments {
                    arguments.push(self.expression(scope, argument, line)?);
                }
                scope.builder.create_call_or_new(token, callee, &arguments)
            }
            Expression::Member(m) => {
                let object = self.expression(scope, &m.object, line)?;
                match &m.property {
                    MemberProperty::Identifier(id) => scope.builder.create_property_get(object, &id.name),
                    MemberProperty::Computed(index) => {
                        let element = self.expression(scope, index, line)?;
                        scope.builder.create_element_get(object, element)
                    }
                }
            }
            Expression::Conditional(c) => {
                let cond = self.expression(scope, &c.test, line)?;
                let if_true = self.expression(scope, &c.consequent, line)?;
                let if_false = self.expression(scope, &c.alternate, line)?;
                scope.builder.create_cond_expr(cond, if_true, if_false)
            }
            Expression::Function(function) => self.function(scope, function, FunctionType::Expression)?,
            Expression::Update(u) => {
                let operand = self.expression(scope, &u.argument, line)?;
                scope.builder.create_inc_dec(
                    u.operator.token(),
                    !u.prefix,
                    operand,
                    line,
                    &mut *self.reporter,
                )?
            }
            Expression::Sequence(items) => {
                let mut result: Option<NodeId> = None;
                for item in items {
                    let next = self.expression(scope, item, line)?;
                    result = Some(match result {
                        Some(left) => scope.builder.create_binary(Token::Comma, left, next),
                        None => next,
                    });
                }
                match result {
                    Some(node) => node,
                    None => scope.placeholder(line),
                }
            }
        };
        Ok(node)
    }
}
