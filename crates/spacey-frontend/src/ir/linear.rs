// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Flattening of a normalized tree into emitter steps.
//!
//! Statement containers disappear; every other statement-level node becomes
//! one [`LinearOp::Node`] whose expression children the emitter walks itself.

use crate::token::Token;

use super::{IrTree, NodeId};

/// One step handed to a bytecode emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearOp {
    /// Emit this node
    Node(NodeId),
    /// Return from the finally subroutine that started at this FINALLY node
    EndFinally(NodeId),
}

enum Work {
    Visit(NodeId),
    EndFinally(NodeId),
}

fn is_container(token: Token) -> bool {
    matches!(
        token,
        Token::Script
            | Token::Block
            | Token::Loop
            | Token::Label
            | Token::Empty
            | Token::With
            | Token::LocalBlock
    )
}

/// Flattens the statements under `root` in execution layout order.
pub fn linearize(tree: &IrTree, root: NodeId) -> Vec<LinearOp> {
    let mut ops = Vec::new();
    let mut stack = vec![Work::Visit(root)];
    while let Some(work) = stack.pop() {
        let id = match work {
            Work::EndFinally(id) => {
                ops.push(LinearOp::EndFinally(id));
                continue;
            }
            Work::Visit(id) => id,
        };
        let token = tree.token(id);
        match token {
            t if is_container(t) => {}
            Token::Try => {
                // the protected block and handlers are statements too
                ops.push(LinearOp::Node(id));
            }
            Token::Finally => {
                ops.push(LinearOp::Node(id));
                stack.push(Work::EndFinally(id));
            }
            _ => {
                ops.push(LinearOp::Node(id));
                continue;
            }
        }
        for &child in tree.children(id).iter().rev() {
            stack.push(Work::Visit(child));
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_containers_are_flattened() {
        let mut tree = IrTree::new();
        let a = tree.leaf(Token::ExprVoid);
        let b = tree.leaf(Token::ExprVoid);
        let inner = tree.node(Token::Block, &[b]);
        let root = tree.node(Token::Script, &[a, inner]);
        assert_eq!(
            linearize(&tree, root),
            vec![LinearOp::Node(a), LinearOp::Node(b)]
        );
    }

    #[test]
    fn test_finally_is_bracketed() {
        let mut tree = IrTree::new();
        let body = tree.leaf(Token::ExprVoid);
        let finally = tree.node(Token::Finally, &[body]);
        let after = tree.leaf(Token::ExprVoid);
        let root = tree.node(Token::Block, &[finally, after]);
        assert_eq!(
            linearize(&tree, root),
            vec![
                LinearOp::Node(finally),
                LinearOp::Node(body),
                LinearOp::EndFinally(finally),
                LinearOp::Node(after),
            ]
        );
    }

    #[test]
    fn test_expression_children_not_expanded() {
        let mut tree = IrTree::new();
        let name = tree.string(Token::Name, "x");
        let stmt = tree.node(Token::ExprVoid, &[name]);
        let root = tree.node(Token::Script, &[stmt]);
        assert_eq!(linearize(&tree, root), vec![LinearOp::Node(stmt)]);
    }
}
