// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! IR construction.
//!
//! [`IrBuilder`] turns syntactic constructs into IR made from a small closed
//! set of primitives: blocks, jumps with targets, local blocks and named
//! references. One builder owns the IR of one script or function.
//!
//! ## Statement shapes
//!
//! | Construct | Lowered form |
//! |-----------|--------------|
//! | `while (c) B` | `GOTO cond; body: B; EMPTY; cond: IFEQ(c) -> body; break:` |
//! | `do B while (c)` | `body: B; cond: IFEQ(c) -> body; break:` |
//! | `for (I; C; U) B` | `I; GOTO cond; body: B; incr: U; EMPTY; cond: IFEQ(C) -> body; break:` |
//! | `switch` | `BLOCK[SWITCH(e, CASE..), GOTO default, case targets + bodies, break:]` |
//! | `with (o) B` | `BLOCK[ENTERWITH(o), WITH(B), LEAVEWITH]` |
//! | `if (c) A else B` | `IFNE(c) -> else; A; GOTO end; else: B; end:` |
//!
//! ## Try/catch/finally
//!
//! ```text
//! LOCAL_BLOCK handler
//!   TRY -> catch  [finally -> fin]
//!     try block
//!     GOTO end_catch
//!   catch:
//!     LOCAL_BLOCK scopes
//!       CATCH_SCOPE(e, LOCAL_LOAD handler)
//!       BLOCK[ENTERWITH(LOCAL_LOAD scopes), WITH(if guard { body; LEAVEWITH; GOTO end_catch }), LEAVEWITH]
//!       ...
//!     RETHROW                 (when no clause is unconditional)
//!   end_catch:
//!     JSR fin
//!     GOTO fin_end
//!   fin:
//!     FINALLY(block)
//!   fin_end:
//! ```

mod expressions;

#[cfg(test)]
mod tests;

pub use expressions::is_always_defined_boolean;

use crate::diagnostics::{Diagnostic, ErrorReporter, MessageId};
use crate::env::CompilerEnv;
use crate::error::InternalError;
use crate::ir::{
    FunctionType, IrTree, NodeId, ParamOrVarTable, RegExpLiteral, UnitIr, UnitKind,
};
use crate::token::Token;

/// One catch clause handed to [`IrBuilder::create_try_catch_finally`].
#[derive(Debug, Clone)]
pub struct CatchHandler {
    /// Exception variable name
    pub name: String,
    /// `catch (e if guard)` condition
    pub guard: Option<NodeId>,
    /// Clause body, a BLOCK
    pub body: NodeId,
    /// Line of the `catch` keyword
    pub line: Option<u32>,
}

/// Builds the IR of one script or function.
#[derive(Debug)]
pub struct IrBuilder<'env> {
    env: &'env CompilerEnv,
    tree: IrTree,
    vars: ParamOrVarTable,
    functions: Vec<UnitIr>,
    regexps: Vec<RegExpLiteral>,
    inside_function: bool,
    requires_activation: bool,
}

impl<'env> IrBuilder<'env> {
    /// Creates a builder for a script (`inside_function == false`) or a function.
    pub fn new(env: &'env CompilerEnv, inside_function: bool) -> Self {
        Self {
            env,
            tree: IrTree::new(),
            vars: ParamOrVarTable::new(),
            functions: Vec::new(),
            regexps: Vec::new(),
            inside_function,
            requires_activation: false,
        }
    }

    /// Compilation environment.
    pub fn env(&self) -> &'env CompilerEnv {
        self.env
    }

    /// The tree under construction.
    pub fn tree(&self) -> &IrTree {
        &self.tree
    }

    /// Mutable access to the tree under construction.
    pub fn tree_mut(&mut self) -> &mut IrTree {
        &mut self.tree
    }

    /// Returns true when building a function body.
    pub fn inside_function(&self) -> bool {
        self.inside_function
    }

    /// Returns true once something forced an activation record.
    pub fn requires_activation(&self) -> bool {
        self.requires_activation
    }

    /// Marks the function as needing an activation record. No effect on scripts.
    pub fn set_requires_activation(&mut self) {
        if self.inside_function {
            self.requires_activation = true;
        }
    }

    /// Parameters and variables declared so far.
    pub fn vars(&self) -> &ParamOrVarTable {
        &self.vars
    }

    /// Declares a parameter.
    pub fn declare_param(&mut self, name: &str) {
        self.vars.add_param(name);
    }

    /// Declares a variable.
    pub fn declare_var(&mut self, name: &str) {
        self.vars.add_var(name);
    }

    pub(crate) fn report(
        &self,
        reporter: &mut dyn ErrorReporter,
        message: MessageId,
        line: Option<u32>,
        detail: Option<String>,
    ) {
        reporter.error(Diagnostic {
            message,
            source_name: self.env.source_name().clone(),
            line,
            detail,
        });
    }

    fn expect(&self, id: NodeId, token: Token) -> Result<(), InternalError> {
        let found = self.tree.token(id);
        if found == token {
            Ok(())
        } else {
            Err(InternalError::UnexpectedNode {
                expected: token,
                found,
            })
        }
    }

    // ========================================================================
    // Simple statements
    // ========================================================================

    /// Statement list.
    pub fn create_block(&mut self, statements: &[NodeId], line: Option<u32>) -> NodeId {
        self.tree.node_at(Token::Block, statements, line)
    }

    /// Expression statement; in scripts its value becomes the script result.
    pub fn create_expr_statement(&mut self, expr: NodeId, line: Option<u32>) -> NodeId {
        let token = if self.inside_function {
            Token::ExprVoid
        } else {
            Token::ExprResult
        };
        self.tree.node_at(token, &[expr], line)
    }

    /// Expression statement whose value is always discarded.
    pub fn create_expr_statement_no_return(&mut self, expr: NodeId, line: Option<u32>) -> NodeId {
        self.tree.node_at(Token::ExprVoid, &[expr], line)
    }

    /// `return` with an optional value.
    pub fn create_return(&mut self, expr: Option<NodeId>, line: Option<u32>) -> NodeId {
        match expr {
            Some(expr) => self.tree.node_at(Token::Return, &[expr], line),
            None => self.tree.node_at(Token::Return, &[], line),
        }
    }

    /// `throw expr`.
    pub fn create_throw(&mut self, expr: NodeId, line: Option<u32>) -> NodeId {
        self.tree.node_at(Token::Throw, &[expr], line)
    }

    /// `var a = 1, b` as a VAR node with one NAME child per declarator.
    pub fn create_var(&mut self, declarators: &[(String, Option<NodeId>)], line: Option<u32>) -> NodeId {
        let var = self.tree.node_at(Token::Var, &[], line);
        for (name, init) in declarators {
            let name = self.create_name(name);
            if let Some(init) = *init {
                self.tree.add_child_to_back(name, init);
            }
            self.tree.add_child_to_back(var, name);
        }
        var
    }

    // ========================================================================
    // Switch
    // ========================================================================

    /// Opens a switch: a BLOCK whose first child is the SWITCH jump.
    pub fn create_switch(&mut self, expr: NodeId, line: Option<u32>) -> NodeId {
        let switch = self.tree.jump(Token::Switch, None);
        self.tree.set_line(switch, line);
        self.tree.add_child_to_back(switch, expr);
        self.tree.node_at(Token::Block, &[switch], line)
    }

    /// SWITCH jump of a switch block.
    pub fn switch_node(&self, switch_block: NodeId) -> Result<NodeId, InternalError> {
        self.expect(switch_block, Token::Block)?;
        let switch = self
            .tree
            .first_child(switch_block)
            .ok_or(InternalError::UnexpectedNode {
                expected: Token::Switch,
                found: Token::Eof,
            })?;
        self.expect(switch, Token::Switch)?;
        Ok(switch)
    }

    /// Adds `case expr:` (or `default:` when `expr` is `None`) and its statements.
    pub fn add_switch_case(
        &mut self,
        switch_block: NodeId,
        case_expr: Option<NodeId>,
        statements: NodeId,
    ) -> Result<(), InternalError> {
        let switch = self.switch_node(switch_block)?;
        let goto_target = self.tree.new_target();
        match case_expr {
            Some(expr) => {
                let case = self.tree.jump(Token::Case, Some(goto_target));
                self.tree.add_child_to_back(case, expr);
                self.tree.add_child_to_back(switch, case);
            }
            None => self.tree.jump_of_mut(switch)?.default_target = Some(goto_target),
        }
        self.tree.add_child_to_back(switch_block, goto_target);
        self.tree.add_child_to_back(switch_block, statements);
        Ok(())
    }

    /// Finishes a switch: jump to default (or past the switch), then the break target.
    pub fn close_switch(&mut self, switch_block: NodeId) -> Result<(), InternalError> {
        let switch = self.switch_node(switch_block)?;
        let break_target = self.tree.new_target();
        let jump = self.tree.jump_of_mut(switch)?;
        jump.target = Some(break_target);
        let default_target = jump.default_target.unwrap_or(break_target);

        let goto = self.tree.jump(Token::Goto, Some(default_target));
        self.tree.add_child_after(switch_block, goto, switch)?;
        self.tree.add_child_to_back(switch_block, break_target);
        Ok(())
    }

    // ========================================================================
    // Loops
    // ========================================================================

    /// Allocates the LOOP node that break/continue refer to while the body is built.
    pub fn create_loop_node(&mut self, line: Option<u32>) -> NodeId {
        let lp = self.tree.jump(Token::Loop, None);
        self.tree.set_line(lp, line);
        lp
    }

    /// `while (cond) body`.
    pub fn create_while(&mut self, lp: NodeId, cond: NodeId, body: NodeId) -> Result<NodeId, InternalError> {
        self.create_loop(lp, LoopKind::While, body, Some(cond), None, None)
    }

    /// `do body while (cond)`.
    pub fn create_do_while(&mut self, lp: NodeId, body: NodeId, cond: NodeId) -> Result<NodeId, InternalError> {
        self.create_loop(lp, LoopKind::DoWhile, body, Some(cond), None, None)
    }

    /// `for (init; cond; incr) body`; a missing condition loops forever.
    pub fn create_for(
        &mut self,
        lp: NodeId,
        init: Option<NodeId>,
        cond: Option<NodeId>,
        incr: Option<NodeId>,
        body: NodeId,
    ) -> Result<NodeId, InternalError> {
        self.create_loop(lp, LoopKind::For, body, cond, init, incr)
    }

    fn create_loop(
        &mut self,
        lp: NodeId,
        kind: LoopKind,
        body: NodeId,
        cond: Option<NodeId>,
        init: Option<NodeId>,
        incr: Option<NodeId>,
    ) -> Result<NodeId, InternalError> {
        self.expect(lp, Token::Loop)?;
        let line = self.tree.get(lp).line();
        let body_target = self.tree.new_target();
        let cond_target = self.tree.new_target();
        let cond = match cond {
            Some(cond) => cond,
            None => self.tree.leaf(Token::True),
        };
        let ifeq = self.tree.jump(Token::IfEq, Some(body_target));
        self.tree.add_child_to_back(ifeq, cond);
        let break_target = self.tree.new_target();

        self.tree.add_child_to_back(lp, body_target);
        self.tree.add_child_to_back(lp, body);
        if kind != LoopKind::DoWhile {
            // carries the loop line to the condition
            let empty = self.tree.node_at(Token::Empty, &[], line);
            self.tree.add_child_to_back(lp, empty);
        }
        self.tree.add_child_to_back(lp, cond_target);
        self.tree.add_child_to_back(lp, ifeq);
        self.tree.add_child_to_back(lp, break_target);

        let mut continue_target = cond_target;
        if kind != LoopKind::DoWhile {
            let goto = self.tree.jump(Token::Goto, Some(cond_target));
            self.tree.add_child_to_front(lp, goto);

            if kind == LoopKind::For {
                if let Some(init) = init {
                    let init = if self.tree.token(init) == Token::Var {
                        init
                    } else {
                        self.tree.node(Token::ExprVoid, &[init])
                    };
                    self.tree.add_child_to_front(lp, init);
                }
                let incr_target = self.tree.new_target();
                self.tree.add_child_after(lp, incr_target, body)?;
                if let Some(incr) = incr {
                    let incr = self.tree.node(Token::ExprVoid, &[incr]);
                    self.tree.add_child_after(lp, incr, incr_target)?;
                }
                continue_target = incr_target;
            }
        }

        let jump = self.tree.jump_of_mut(lp)?;
        jump.target = Some(break_target);
        jump.continue_target = Some(continue_target);
        Ok(lp)
    }

    /// `for (lhs in obj) body` and `for each (lhs in obj) body`.
    ///
    /// The loop runs over ENUM_NEXT with ENUM_INIT_* before it and assigns
    /// ENUM_ID at the top of each iteration; all three share a LOCAL_BLOCK.
    #[allow(clippy::too_many_arguments)]
    pub fn create_for_in(
        &mut self,
        lp: NodeId,
        lhs: NodeId,
        obj: NodeId,
        body: NodeId,
        is_for_each: bool,
        line: Option<u32>,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<NodeId, InternalError> {
        let lhs_is_var = self.tree.token(lhs) == Token::Var;
        let lvalue = if lhs_is_var {
            let declarators = self.tree.children(lhs);
            if declarators.len() > 1 {
                self.report(reporter, MessageId::MultipleForInIndex, line, None);
            }
            let last = self
                .tree
                .last_child(lhs)
                .ok_or(InternalError::UnexpectedNode {
                    expected: Token::Name,
                    found: Token::Var,
                })?;
            let name = self.tree.get(last).string().unwrap_or_default().to_string();
            self.tree.string(Token::Name, name)
        } else {
            match self.make_reference(lhs)? {
                Some(reference) => reference,
                None => {
                    self.report(reporter, MessageId::BadForInLhs, line, None);
                    return Ok(obj);
                }
            }
        };

        let local_block = self.tree.leaf(Token::LocalBlock);
        let init_token = if is_for_each {
            Token::EnumInitValues
        } else {
            Token::EnumInitKeys
        };
        let init = self.tree.node(init_token, &[obj]);
        let cond = self.tree.leaf(Token::EnumNext);
        let id = self.tree.leaf(Token::EnumId);
        for node in [init, cond, id] {
            self.tree.get_mut(node).props_mut().local_block = Some(local_block);
        }

        let assign = self.simple_assignment(lvalue, id)?;
        let assign = self.tree.node(Token::ExprVoid, &[assign]);
        let new_body = self.tree.node(Token::Block, &[assign, body]);

        let lp = self.create_while(lp, cond, new_body)?;
        self.tree.add_child_to_front(lp, init);
        if lhs_is_var {
            self.tree.add_child_to_front(lp, lhs);
        }
        self.tree.add_child_to_back(local_block, lp);
        Ok(local_block)
    }

    // ========================================================================
    // Try/catch/finally
    // ========================================================================

    /// Lowers `try`; see the module docs for the produced shape.
    pub fn create_try_catch_finally(
        &mut self,
        try_block: NodeId,
        handlers: Vec<CatchHandler>,
        finally_block: Option<NodeId>,
        line: Option<u32>,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<NodeId, InternalError> {
        let has_finally = finally_block.is_some_and(|block| {
            self.tree.token(block) != Token::Block || self.tree.has_children(block)
        });
        let try_is_empty =
            self.tree.token(try_block) == Token::Block && !self.tree.has_children(try_block);
        if try_is_empty && !has_finally {
            return Ok(try_block);
        }
        let has_catch = !handlers.is_empty();
        if !has_finally && !has_catch {
            return Ok(try_block);
        }

        let handler_block = self.tree.leaf(Token::LocalBlock);
        let try_node = self.tree.jump(Token::Try, None);
        self.tree.set_line(try_node, line);
        self.tree.add_child_to_back(try_node, try_block);
        self.tree.get_mut(try_node).props_mut().local_block = Some(handler_block);

        if has_catch {
            let end_catch = self.tree.new_target();
            let goto = self.tree.jump(Token::Goto, Some(end_catch));
            self.tree.add_child_to_back(try_node, goto);

            let catch_target = self.tree.new_target();
            self.tree.jump_of_mut(try_node)?.target = Some(catch_target);
            self.tree.add_child_to_back(try_node, catch_target);

            let scope_block = self.tree.leaf(Token::LocalBlock);
            let last = handlers.len() - 1;
            if let Some(first) = handlers[..last].iter().find(|h| h.guard.is_none()) {
                self.report(reporter, MessageId::CatchUnreachable, first.line, None);
            }

            let mut has_default = false;
            for (scope_index, handler) in handlers.into_iter().enumerate() {
                let leave = self.tree.leaf(Token::LeaveWith);
                let exit = self.tree.jump(Token::Goto, Some(end_catch));
                self.tree.add_child_to_back(handler.body, leave);
                self.tree.add_child_to_back(handler.body, exit);

                let guarded = match handler.guard {
                    None => {
                        has_default = true;
                        handler.body
                    }
                    Some(guard) => self.create_if(guard, handler.body, None, handler.line),
                };

                let name = self.tree.string(Token::Name, handler.name);
                let exception = self.create_use_local(handler_block);
                let catch_scope = self.tree.node(Token::CatchScope, &[name, exception]);
                let props = self.tree.get_mut(catch_scope).props_mut();
                props.local_block = Some(scope_block);
                props.catch_scope_index = Some(scope_index);
                self.tree.add_child_to_back(scope_block, catch_scope);

                let scope = self.create_use_local(scope_block);
                let with = self.create_with(scope, guarded, handler.line);
                self.tree.add_child_to_back(scope_block, with);
            }
            self.tree.add_child_to_back(try_node, scope_block);

            if !has_default {
                let rethrow = self.tree.leaf(Token::Rethrow);
                self.tree.get_mut(rethrow).props_mut().local_block = Some(handler_block);
                self.tree.add_child_to_back(try_node, rethrow);
            }
            self.tree.add_child_to_back(try_node, end_catch);
        }

        if let (true, Some(finally_block)) = (has_finally, finally_block) {
            let finally_target = self.tree.new_target();
            self.tree.jump_of_mut(try_node)?.finally_target = Some(finally_target);
            let jsr = self.tree.jump(Token::Jsr, Some(finally_target));
            self.tree.add_child_to_back(try_node, jsr);

            let finally_end = self.tree.new_target();
            let skip = self.tree.jump(Token::Goto, Some(finally_end));
            self.tree.add_child_to_back(try_node, skip);
            self.tree.add_child_to_back(try_node, finally_target);

            let finally = self.tree.node(Token::Finally, &[finally_block]);
            self.tree.get_mut(finally).props_mut().local_block = Some(handler_block);
            self.tree.add_child_to_back(try_node, finally);
            self.tree.add_child_to_back(try_node, finally_end);
        }

        self.tree.add_child_to_back(handler_block, try_node);
        Ok(handler_block)
    }

    /// LOCAL_LOAD of the value stored in `local_block`.
    pub fn create_use_local(&mut self, local_block: NodeId) -> NodeId {
        let load = self.tree.leaf(Token::LocalLoad);
        self.tree.get_mut(load).props_mut().local_block = Some(local_block);
        load
    }

    // ========================================================================
    // With, if, labels, break/continue
    // ========================================================================

    /// `with (obj) body`; forces an activation record.
    pub fn create_with(&mut self, obj: NodeId, body: NodeId, line: Option<u32>) -> NodeId {
        self.set_requires_activation();
        let enter = self.tree.node(Token::EnterWith, &[obj]);
        let with = self.tree.node_at(Token::With, &[body], line);
        let leave = self.tree.leaf(Token::LeaveWith);
        self.tree.node_at(Token::Block, &[enter, with, leave], line)
    }

    /// `if (cond) if_true else if_false`, dropping a branch a literal condition rules out.
    pub fn create_if(
        &mut self,
        cond: NodeId,
        if_true: NodeId,
        if_false: Option<NodeId>,
        line: Option<u32>,
    ) -> NodeId {
        match is_always_defined_boolean(&self.tree, cond) {
            Some(true) => return if_true,
            Some(false) => {
                return match if_false {
                    Some(if_false) => if_false,
                    None => self.tree.node_at(Token::Block, &[], line),
                };
            }
            None => {}
        }

        let result = self.tree.node_at(Token::Block, &[], line);
        let not_target = self.tree.new_target();
        let ifne = self.tree.jump(Token::IfNe, Some(not_target));
        self.tree.add_child_to_back(ifne, cond);
        self.tree.add_child_to_back(result, ifne);
        self.tree.add_child_to_back(result, if_true);

        match if_false {
            Some(if_false) => {
                let end_target = self.tree.new_target();
                let goto = self.tree.jump(Token::Goto, Some(end_target));
                self.tree.add_child_to_back(result, goto);
                self.tree.add_child_to_back(result, not_target);
                self.tree.add_child_to_back(result, if_false);
                self.tree.add_child_to_back(result, end_target);
            }
            None => self.tree.add_child_to_back(result, not_target),
        }
        result
    }

    /// LABEL jump for `name:`; its target is set by [`Self::create_labeled_statement`].
    pub fn create_label(&mut self, name: &str, line: Option<u32>) -> NodeId {
        let label = self.tree.jump(Token::Label, None);
        self.tree.set_line(label, line);
        self.tree.get_mut(label).props_mut().label = Some(name.to_string());
        label
    }

    /// Records that `label` names the loop `lp`.
    pub fn set_label_loop(&mut self, label: NodeId, lp: NodeId) -> Result<(), InternalError> {
        self.tree.jump_of_mut(label)?.label_loop = Some(lp);
        Ok(())
    }

    /// `BLOCK[label, statement, break]` with the label aimed at `break`.
    pub fn create_labeled_statement(
        &mut self,
        label: NodeId,
        statement: NodeId,
    ) -> Result<NodeId, InternalError> {
        let break_target = self.tree.new_target();
        self.tree.jump_of_mut(label)?.target = Some(break_target);
        Ok(self.tree.node(Token::Block, &[label, statement, break_target]))
    }

    /// `break` out of a LOOP, a LABEL or a switch block.
    pub fn create_break(&mut self, owner: NodeId, line: Option<u32>) -> Result<NodeId, InternalError> {
        let jump_statement = match self.tree.token(owner) {
            Token::Loop | Token::Label => owner,
            Token::Block => self.switch_node(owner)?,
            found => {
                return Err(InternalError::UnexpectedNode {
                    expected: Token::Loop,
                    found,
                });
            }
        };
        let node = self.tree.jump(Token::Break, None);
        self.tree.set_line(node, line);
        self.tree.jump_of_mut(node)?.jump_statement = Some(jump_statement);
        Ok(node)
    }

    /// `continue` to a LOOP.
    pub fn create_continue(&mut self, lp: NodeId, line: Option<u32>) -> Result<NodeId, InternalError> {
        self.expect(lp, Token::Loop)?;
        let node = self.tree.jump(Token::Continue, None);
        self.tree.set_line(node, line);
        self.tree.jump_of_mut(node)?.jump_statement = Some(lp);
        Ok(node)
    }

    // ========================================================================
    // Units
    // ========================================================================

    /// Registers a finished nested function and returns its FUNCTION node.
    pub fn add_function(&mut self, function: UnitIr) -> NodeId {
        let index = self.functions.len();
        let name = function.function_name().unwrap_or_default().to_string();
        let node = self.tree.string(Token::Function, name);
        self.tree.get_mut(node).props_mut().function_index = Some(index);
        self.functions.push(function);
        node
    }

    /// Registers a regular expression literal and returns its index.
    pub fn add_regexp(&mut self, pattern: &str, flags: &str) -> usize {
        self.regexps.push(RegExpLiteral {
            pattern: pattern.to_string(),
            flags: flags.to_string(),
        });
        self.regexps.len() - 1
    }

    /// Finishes a script unit rooted at SCRIPT.
    pub fn finish_script(mut self, statements: &[NodeId]) -> UnitIr {
        let root = self.tree.node(Token::Script, statements);
        UnitIr {
            kind: UnitKind::Script,
            tree: self.tree,
            root,
            vars: self.vars,
            functions: self.functions,
            regexps: self.regexps,
            needs_activation: false,
            encoded_range: 0..0,
            line: None,
        }
    }

    /// Finishes a function unit whose root is the body BLOCK.
    ///
    /// Functions containing functions need an activation record, a named
    /// function expression binds its own name to THISFN on entry, and every
    /// body ends in RETURN.
    pub fn finish_function(
        mut self,
        name: Option<String>,
        function_type: FunctionType,
        body: NodeId,
        line: Option<u32>,
    ) -> Result<UnitIr, InternalError> {
        self.expect(body, Token::Block)?;
        if !self.functions.is_empty() {
            self.requires_activation = true;
            for function in &self.functions {
                if function.function_type() == Some(FunctionType::ExpressionStatement) {
                    if let Some(name) = function.function_name().filter(|n| !n.is_empty()) {
                        self.vars.remove(name);
                    }
                }
            }
        }

        if function_type == FunctionType::Expression {
            if let Some(name) = name.as_deref().filter(|n| !n.is_empty()) {
                if !self.vars.has(name) {
                    self.vars.add_var(name);
                    let bind = self.tree.string(Token::BindName, name);
                    let this_fn = self.tree.leaf(Token::ThisFn);
                    let set = self.tree.node(Token::SetName, &[bind, this_fn]);
                    let statement = self.tree.node(Token::ExprVoid, &[set]);
                    self.tree.add_child_to_front(body, statement);
                }
            }
        }

        let ends_in_return = self
            .tree
            .last_child(body)
            .is_some_and(|last| self.tree.token(last) == Token::Return);
        if !ends_in_return {
            let ret = self.tree.leaf(Token::Return);
            self.tree.add_child_to_back(body, ret);
        }

        Ok(UnitIr {
            kind: UnitKind::Function {
                name,
                function_type,
            },
            tree: self.tree,
            root: body,
            vars: self.vars,
            functions: self.functions,
            regexps: self.regexps,
            needs_activation: self.requires_activation,
            encoded_range: 0..0,
            line,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKind {
    While,
    DoWhile,
    For,
}
