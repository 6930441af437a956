// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Control-flow normalization.
//!
//! One pre-order pass over each unit that leaves only primitives an
//! interpreter or code generator can run directly:
//!
//! | Before | After |
//! |--------|-------|
//! | `BREAK` / `CONTINUE` | `LEAVEWITH`/`JSR` per construct left, then `GOTO` |
//! | `RETURN` inside `try..finally` | `BLOCK[EXPR_RESULT(e), JSR.., LEAVEWITH.., RETURN_RESULT]` |
//! | `VAR` | `BLOCK[EXPR_VOID(SETNAME(BINDNAME, init))..]` |
//! | `NAME` / `SETNAME` of a local | `GETVAR` / `SETVAR` (functions without activation) |
//! | `TYPEOFNAME` of a local | `TYPEOF(GETVAR)` |
//! | `DELPROP` of a local | `FALSE` |
//!
//! The pass keeps a stack of the constructs it is inside (labels, switches,
//! loops, `with` bodies and `try` blocks with a finally) together with the
//! node that ends each one. Reaching that node pops the entry.


use tracing::{debug, trace};

use crate::diagnostics::{Diagnostic, ErrorReporter, MessageId};
use crate::env::CompilerEnv;
use crate::error::{Error, InternalError, Result};
use crate::ir::{IrTree, Node, NodeId, ParamOrVarTable, UnitIr};
use crate::token::Token;

/// Normalizes `unit` and every function nested in it.
///
/// Nesting deeper than the environment's IR depth limit is reported as
/// [`MessageId::TooDeepRecursion`] and ends the pass with
/// [`Error::Compilation`].
pub fn normalize(unit: &mut UnitIr, env: &CompilerEnv, reporter: &mut dyn ErrorReporter) -> Result<()> {
    let rewrite_slots = unit.is_function() && !unit.needs_activation;
    let mut normalizer = Normalizer {
        tree: &mut unit.tree,
        vars: &unit.vars,
        env,
        reporter: &mut *reporter,
        rewrite_slots,
        unwind: Vec::new(),
        has_finally: false,
    };
    normalizer.visit(unit.root, 1)?;
    debug!(
        function = unit.function_name().unwrap_or("<script>"),
        rewrite_slots,
        "normalized unit"
    );

    for function in &mut unit.functions {
        normalize(function, env, reporter)?;
    }
    Ok(())
}

/// A construct being visited and the node that ends it.
#[derive(Debug, Clone, Copy)]
struct Unwind {
    node: NodeId,
    end: NodeId,
}

struct Normalizer<'a> {
    tree: &'a mut IrTree,
    vars: &'a ParamOrVarTable,
    env: &'a CompilerEnv,
    reporter: &'a mut dyn ErrorReporter,
    rewrite_slots: bool,
    unwind: Vec<Unwind>,
    has_finally: bool,
}

impl Normalizer<'_> {
    fn visit(&mut self, parent: NodeId, depth: usize) -> Result<()> {
        if depth > self.env.max_ir_depth() {
            self.reporter.error(Diagnostic {
                message: MessageId::TooDeepRecursion,
                source_name: self.env.source_name().clone(),
                line: self.tree.get(parent).line(),
                detail: None,
            });
            return Err(Error::Compilation {
                count: self.reporter.error_count(),
            });
        }

        let mut index = 0;
        while let Some(&child) = self.tree.children(parent).get(index) {
            let mut node = child;
            match self.tree.token(node) {
                Token::Label | Token::Switch | Token::Loop => {
                    let end = self
                        .tree
                        .jump_of(node)?
                        .target
                        .ok_or(InternalError::DanglingTarget { jump: node })?;
                    self.unwind.push(Unwind { node, end });
                }
                Token::With => {
                    let end = self
                        .tree
                        .children(parent)
                        .get(index + 1)
                        .copied()
                        .filter(|&next| self.tree.token(next) == Token::LeaveWith)
                        .ok_or(InternalError::MissingLeaveWith(node))?;
                    self.unwind.push(Unwind { node, end });
                }
                Token::Try => {
                    if let Some(end) = self.tree.jump_of(node)?.finally_target {
                        self.has_finally = true;
                        self.unwind.push(Unwind { node, end });
                    }
                }
                Token::Target | Token::LeaveWith => {
                    if self.unwind.last().is_some_and(|top| top.end == node) {
                        self.unwind.pop();
                    }
                }
                Token::Return if self.has_finally => {
                    if let Some((block, store)) = self.unwind_return(node)? {
                        self.tree.replace_child_at(parent, index, block);
                        if let Some(store) = store {
                            self.visit(store, depth + 1)?;
                        }
                        index += 1;
                        continue;
                    }
                }
                Token::Break | Token::Continue => {
                    index += self.lower_jump(parent, index, node)?;
                }
                Token::Var => {
                    node = self.expand_var(node)?;
                    self.tree.replace_child_at(parent, index, node);
                }
                Token::Name | Token::TypeOfName | Token::SetName | Token::DelProp
                    if self.rewrite_slots =>
                {
                    if let Some(replacement) = self.rewrite_slot(node)? {
                        self.tree.replace_child_at(parent, index, replacement);
                        node = replacement;
                    }
                }
                _ => {}
            }
            self.visit(node, depth + 1)?;
            index += 1;
        }
        Ok(())
    }

    /// Replaces `ret` with a block that runs every enclosing finally and
    /// leaves every enclosing `with` first. Returns the block and the
    /// EXPR_RESULT holding the return value, if any.
    fn unwind_return(&mut self, ret: NodeId) -> Result<Option<(NodeId, Option<NodeId>)>> {
        let mut steps = Vec::new();
        for entry in self.unwind.iter().rev() {
            match self.tree.token(entry.node) {
                Token::Try => steps.push(self.tree.jump(Token::Jsr, Some(entry.end))),
                Token::With => steps.push(self.tree.leaf(Token::LeaveWith)),
                _ => {}
            }
        }
        if steps.is_empty() {
            return Ok(None);
        }

        let line = self.tree.get(ret).line();
        let block = self.tree.node_at(Token::Block, &steps, line);
        let store = match self.tree.first_child(ret) {
            None => {
                self.tree.add_child_to_back(block, ret);
                None
            }
            Some(value) => {
                self.tree.remove_child(ret, value)?;
                let store = self.tree.node_at(Token::ExprResult, &[value], line);
                self.tree.add_child_to_front(block, store);
                let result = self.tree.node_at(Token::ReturnResult, &[], line);
                self.tree.add_child_to_back(block, result);
                Some(store)
            }
        };
        trace!(steps = steps.len(), "unwound return");
        Ok(Some((block, store)))
    }

    /// Turns BREAK/CONTINUE at `parent[index]` into GOTO, inserting the
    /// unwinding steps in front of it. Returns how many nodes were inserted.
    fn lower_jump(&mut self, parent: NodeId, index: usize, node: NodeId) -> Result<usize> {
        let owner = self
            .tree
            .jump_of(node)?
            .jump_statement
            .ok_or(InternalError::UnmatchedJump(node))?;

        let mut inserted = 0;
        let mut found = false;
        for entry in self.unwind.iter().rev() {
            if entry.node == owner {
                found = true;
                break;
            }
            let step = match self.tree.token(entry.node) {
                Token::With => self.tree.leaf(Token::LeaveWith),
                Token::Try => self.tree.jump(Token::Jsr, Some(entry.end)),
                _ => continue,
            };
            self.tree.insert_child(parent, index + inserted, step);
            inserted += 1;
        }
        if !found {
            return Err(InternalError::UnmatchedJump(node).into());
        }

        let owner_jump = self.tree.jump_of(owner)?;
        let target = if self.tree.token(node) == Token::Break {
            owner_jump.target
        } else {
            owner_jump.continue_target
        }
        .ok_or(InternalError::DanglingTarget { jump: owner })?;
        self.tree.transition(node, |n| n.into_goto(target))?;
        if inserted > 0 {
            trace!(inserted, "unwound jump");
        }
        Ok(inserted)
    }

    /// `VAR` to a block of initializing assignments; declarators without
    /// an initializer disappear.
    fn expand_var(&mut self, var: NodeId) -> Result<NodeId> {
        let line = self.tree.get(var).line();
        let block = self.tree.node_at(Token::Block, &[], line);
        for name in self.tree.take_children(var) {
            let Some(init) = self.tree.first_child(name) else {
                continue;
            };
            self.tree.remove_child(name, init)?;
            self.tree.transition(name, Node::into_bind_name)?;
            let set = self.tree.node(Token::SetName, &[name, init]);
            let statement = self.tree.node_at(Token::ExprVoid, &[set], line);
            self.tree.add_child_to_back(block, statement);
        }
        Ok(block)
    }

    /// Local variable access by slot. Returns a replacement node when the
    /// node itself has to go.
    fn rewrite_slot(&mut self, node: NodeId) -> Result<Option<NodeId>> {
        let token = self.tree.token(node);
        let name_source = if matches!(token, Token::Name | Token::TypeOfName) {
            node
        } else {
            match self.tree.first_child(node) {
                Some(first) if self.tree.token(first) == Token::BindName => first,
                _ if token == Token::DelProp => return Ok(None),
                first => {
                    return Err(InternalError::UnexpectedNode {
                        expected: Token::BindName,
                        found: first.map_or(Token::Eof, |f| self.tree.token(f)),
                    }
                    .into());
                }
            }
        };
        let Some(slot) = self
            .tree
            .get(name_source)
            .string()
            .and_then(|name| self.vars.index_of(name))
        else {
            return Ok(None);
        };

        match token {
            Token::Name => self.tree.transition(node, |n| n.into_slot_get(slot))?,
            Token::TypeOfName => {
                self.tree.transition(node, |n| n.into_slot_get(slot))?;
                let line = self.tree.get(node).line();
                let typeof_node = self.tree.node_at(Token::TypeOf, &[node], line);
                trace!(slot, "rewrote local typeof");
                return Ok(Some(typeof_node));
            }
            Token::SetName => {
                self.tree.transition(node, |n| n.into_slot_set(slot))?;
                self.tree.transition(name_source, Node::into_string_literal)?;
            }
            _ => return Ok(Some(self.tree.leaf(Token::False))),
        }
        trace!(slot, ?token, "rewrote local access");
        Ok(None)
    }
}
