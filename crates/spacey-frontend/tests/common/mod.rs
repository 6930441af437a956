// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared helpers for integration tests.
//!
//! [`trace`] walks the linearized form of a normalized unit the way an
//! interpreter would and records which functions get called. Only the
//! primitives the control-flow tests need are modelled: GOTO, IFEQ/IFNE on
//! literal conditions, SWITCH with a chosen case, JSR/finally subroutines,
//! RETURN and THROW. A call to `boom()` throws.

#![allow(dead_code)]

use std::collections::HashMap;

use spacey_frontend::ast::*;
use spacey_frontend::ir::{LinearOp, NodeId, UnitIr, linearize};
use spacey_frontend::{Compiler, CompilerEnv, DiagnosticCollector, ScriptIr, Token};

/// Installs a test subscriber once; `RUST_LOG=spacey_frontend=trace` shows the passes.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Compiles `body` with the default environment, panicking on diagnostics.
pub fn compile(body: Vec<Statement>) -> ScriptIr {
    init_tracing();
    let mut reporter = DiagnosticCollector::new();
    let result = Compiler::new(CompilerEnv::default()).compile(&Program { body }, &mut reporter);
    assert!(reporter.errors().is_empty(), "{:?}", reporter.errors());
    result.unwrap()
}

pub fn call(name: &str) -> Statement {
    Statement::expression(Expression::call(Expression::ident(name), vec![]))
}

pub fn function(name: &str, params: &[&str], body: Vec<Statement>) -> Statement {
    Statement::new(StatementKind::FunctionDeclaration(Function::new(Some(name), params, body)))
}

pub fn try_finally(block: Vec<Statement>, finalizer: Vec<Statement>) -> Statement {
    Statement::new(StatementKind::Try(TryStatement {
        block: BlockStatement { body: block },
        handlers: vec![],
        finalizer: Some(BlockStatement { body: finalizer }),
    }))
}

pub fn forever(body: Vec<Statement>) -> Statement {
    Statement::new(StatementKind::For(ForStatement {
        init: None,
        test: None,
        update: None,
        body: Box::new(Statement::block(body)),
    }))
}

/// Every node reachable from the unit root with `token`.
pub fn nodes_with(unit: &UnitIr, token: Token) -> Vec<NodeId> {
    unit.tree
        .reachable(unit.root)
        .into_iter()
        .filter(|&id| unit.tree.token(id) == token)
        .collect()
}

enum Frame {
    Return(usize),
    Unwind,
}

/// Runs `unit` and returns the names of the called functions, followed by
/// `"return"`, `"throw"` or `"end"`.
///
/// `case` selects which CASE of a SWITCH matches; `None` matches none.
pub fn trace(unit: &UnitIr, case: Option<usize>) -> Vec<String> {
    let tree = &unit.tree;
    let ops = linearize(tree, unit.root);
    let position: HashMap<NodeId, usize> = ops
        .iter()
        .enumerate()
        .filter_map(|(i, op)| match op {
            LinearOp::Node(id) => Some((*id, i)),
            LinearOp::EndFinally(_) => None,
        })
        .collect();
    let mut parents = HashMap::new();
    for id in tree.reachable(unit.root) {
        for &child in tree.children(id) {
            parents.insert(child, id);
        }
    }
    let jump_to = |id: NodeId| -> usize {
        let target = tree.jump_of(id).unwrap().target.unwrap();
        position[&target]
    };

    let mut events = Vec::new();
    let mut frames = Vec::new();
    let mut pending: Vec<NodeId> = Vec::new();
    let mut pc = 0;
    for _ in 0..10_000 {
        let Some(&op) = ops.get(pc) else {
            events.push("end".to_string());
            return events;
        };
        pc += 1;
        let id = match op {
            LinearOp::EndFinally(_) => {
                match frames.pop() {
                    Some(Frame::Return(back)) => pc = back,
                    Some(Frame::Unwind) => match pending.pop() {
                        Some(target) => {
                            frames.push(Frame::Unwind);
                            pc = position[&target];
                        }
                        None => {
                            events.push("throw".to_string());
                            return events;
                        }
                    },
                    None => panic!("finally reached without JSR"),
                }
                continue;
            }
            LinearOp::Node(id) => id,
        };

        match tree.token(id) {
            Token::Goto => pc = jump_to(id),
            Token::IfEq | Token::IfNe => {
                let literal = tree.first_child(id).map(|c| tree.token(c));
                let taken = match literal {
                    Some(Token::True) => tree.token(id) == Token::IfEq,
                    Some(Token::False) => tree.token(id) == Token::IfNe,
                    _ => false,
                };
                if taken {
                    pc = jump_to(id);
                }
            }
            Token::Switch => {
                if let Some(index) = case {
                    let cases = &tree.children(id)[1..];
                    pc = jump_to(cases[index]);
                }
            }
            Token::Jsr => {
                frames.push(Frame::Return(pc));
                pc = jump_to(id);
            }
            Token::Return | Token::ReturnResult => {
                events.push("return".to_string());
                return events;
            }
            Token::Throw => {
                events.push("throw".to_string());
                return events;
            }
            Token::ExprVoid | Token::ExprResult => {
                for name in called(unit, id) {
                    let throws = name == "boom";
                    events.push(name);
                    if throws {
                        // innermost finally runs first
                        let mut node = id;
                        let mut finallies = Vec::new();
                        while let Some(&parent) = parents.get(&node) {
                            if tree.token(parent) == Token::Try {
                                if let Some(target) = tree.jump_of(parent).unwrap().finally_target {
                                    finallies.push(target);
                                }
                            }
                            node = parent;
                        }
                        finallies.reverse();
                        match finallies.pop() {
                            Some(target) => {
                                pending = finallies;
                                frames.push(Frame::Unwind);
                                pc = position[&target];
                            }
                            None => {
                                events.push("throw".to_string());
                                return events;
                            }
                        }
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    panic!("trace did not terminate: {events:?}");
}

/// Names of the functions called by a statement, in evaluation order.
fn called(unit: &UnitIr, statement: NodeId) -> Vec<String> {
    fn walk(unit: &UnitIr, id: NodeId, out: &mut Vec<String>) {
        for &child in unit.tree.children(id) {
            walk(unit, child, out);
        }
        if unit.tree.token(id) == Token::Call {
            if let Some(name) = unit
                .tree
                .first_child(id)
                .and_then(|callee| unit.tree.get(callee).string())
            {
                out.push(name.to_string());
            }
        }
    }
    let mut out = Vec::new();
    walk(unit, statement, &mut out);
    out
}
