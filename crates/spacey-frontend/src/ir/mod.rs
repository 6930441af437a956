// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Intermediate representation.
//!
//! Nodes live in an [`IrTree`] arena and are addressed by [`NodeId`].
//! Ownership is strictly tree-shaped: a parent lists its children and no node
//! appears under two parents. Jumps reference their destinations by id, which
//! is a lookup relation, not ownership; a target does not know its referrers.
//!
//! # Node shapes
//!
//! ```text
//! Jump   (GOTO, IFEQ, IFNE, JSR, CASE, SWITCH, LOOP, LABEL, TRY, BREAK, CONTINUE)
//!        target / continue / finally / default / owning statement
//! Target (TARGET)  zero-width destination marker
//! Number (NUMBER)  f64 payload
//! Str    (NAME, BINDNAME, STRING, FUNCTION, GETVAR, SETVAR, TYPEOFNAME)
//! ```
//!
//! Tags change only through the consuming transitions on [`Node`], for
//! example [`Node::into_bind_name`]. Each checks the source shape.

pub mod linear;
pub mod unit;

use std::fmt::Write as _;

use bitflags::bitflags;
use rustc_hash::FxHashSet;

use crate::error::InternalError;
use crate::token::Token;

pub use linear::{LinearOp, linearize};
pub use unit::{FunctionType, ParamOrVarTable, RegExpLiteral, UnitIr, UnitKind};

/// Identity of a node in its [`IrTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Arena index of this node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Jump-specific fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Jump {
    /// Destination; for loops, labels and switches the break target
    pub target: Option<NodeId>,
    /// Loop continue target
    pub continue_target: Option<NodeId>,
    /// TRY finally target
    pub finally_target: Option<NodeId>,
    /// SWITCH default target
    pub default_target: Option<NodeId>,
    /// BREAK/CONTINUE: the LOOP, LABEL or SWITCH being exited
    pub jump_statement: Option<NodeId>,
    /// LABEL: the loop it labels
    pub label_loop: Option<NodeId>,
}

/// Node payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No payload
    #[default]
    None,
    /// Numeric literal value
    Number(f64),
    /// Name or string value
    Str(String),
    /// Jump fields
    Jump(Jump),
    /// Jump destination marker
    Target,
}

bitflags! {
    /// Increment/decrement variant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IncDecFlags: u8 {
        /// `--` instead of `++`
        const DECREMENT = 1 << 0;
        /// Postfix form
        const POST = 1 << 1;
    }
}

/// Calls that need the caller's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCall {
    /// `eval(...)`
    Eval,
    /// `With(...)`
    With,
}

/// Object literal property id.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyId {
    /// Named property
    Name(String),
    /// Array-index property
    Index(u32),
}

/// Typed side table attached to every node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeProps {
    /// LOCAL_BLOCK that stores this node's transient value
    pub local_block: Option<NodeId>,
    /// Special call kind
    pub special_call: Option<SpecialCall>,
    /// Array literal hole positions
    pub skip_indexes: Option<Vec<usize>>,
    /// Object literal property ids, one per child
    pub object_ids: Option<Vec<PropertyId>>,
    /// INC/DEC flavour
    pub incr_decr: Option<IncDecFlags>,
    /// FUNCTION: index into the enclosing unit's function table
    pub function_index: Option<usize>,
    /// REGEXP: index into the unit's regexp table
    pub regexp_index: Option<usize>,
    /// CATCH_SCOPE: clause index
    pub catch_scope_index: Option<usize>,
    /// LABEL: label name
    pub label: Option<String>,
    /// GETVAR/SETVAR: slot index
    pub slot: Option<usize>,
    /// REF_SPECIAL: property name
    pub special_name: Option<String>,
}

/// An IR node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    token: Token,
    payload: Payload,
    children: Vec<NodeId>,
    line: Option<u32>,
    props: NodeProps,
}

impl Default for Node {
    fn default() -> Self {
        Node::new(Token::Empty)
    }
}

impl Node {
    /// Creates a node with no payload.
    pub fn new(token: Token) -> Self {
        Self {
            token,
            payload: Payload::None,
            children: Vec::new(),
            line: None,
            props: NodeProps::default(),
        }
    }

    /// Creates a jump node.
    pub fn new_jump(token: Token) -> Self {
        Self {
            payload: Payload::Jump(Jump::default()),
            ..Self::new(token)
        }
    }

    /// The node's tag.
    pub fn token(&self) -> Token {
        self.token
    }

    /// Source line, if recorded.
    pub fn line(&self) -> Option<u32> {
        self.line
    }

    /// Children in order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Payload.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Numeric value for NUMBER nodes.
    pub fn number(&self) -> Option<f64> {
        match self.payload {
            Payload::Number(n) => Some(n),
            _ => None,
        }
    }

    /// String value for name-like nodes.
    pub fn string(&self) -> Option<&str> {
        match &self.payload {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Jump fields.
    pub fn jump(&self) -> Option<&Jump> {
        match &self.payload {
            Payload::Jump(j) => Some(j),
            _ => None,
        }
    }

    /// Mutable jump fields.
    pub fn jump_mut(&mut self) -> Option<&mut Jump> {
        match &mut self.payload {
            Payload::Jump(j) => Some(j),
            _ => None,
        }
    }

    /// Side table.
    pub fn props(&self) -> &NodeProps {
        &self.props
    }

    /// Mutable side table.
    pub fn props_mut(&mut self) -> &mut NodeProps {
        &mut self.props
    }

    fn expect(&self, token: Token) -> Result<(), InternalError> {
        if self.token == token {
            Ok(())
        } else {
            Err(InternalError::UnexpectedNode {
                expected: token,
                found: self.token,
            })
        }
    }

    /// NAME becomes BINDNAME, the lvalue side of an assignment.
    pub fn into_bind_name(self) -> Result<Node, InternalError> {
        self.expect(Token::Name)?;
        Ok(Node {
            token: Token::BindName,
            ..self
        })
    }

    /// NAME becomes TYPEOFNAME.
    pub fn into_typeof_name(self) -> Result<Node, InternalError> {
        self.expect(Token::Name)?;
        Ok(Node {
            token: Token::TypeOfName,
            ..self
        })
    }

    /// CALL becomes REF_CALL when used as a reference.
    pub fn into_ref_call(self) -> Result<Node, InternalError> {
        self.expect(Token::Call)?;
        Ok(Node {
            token: Token::RefCall,
            ..self
        })
    }

    /// BINDNAME becomes a plain STRING carrying the same name.
    pub fn into_string_literal(self) -> Result<Node, InternalError> {
        self.expect(Token::BindName)?;
        Ok(Node {
            token: Token::String,
            ..self
        })
    }

    /// NAME or TYPEOFNAME becomes a direct slot read.
    pub fn into_slot_get(mut self, slot: usize) -> Result<Node, InternalError> {
        if self.token != Token::TypeOfName {
            self.expect(Token::Name)?;
        }
        self.props.slot = Some(slot);
        Ok(Node {
            token: Token::GetVar,
            ..self
        })
    }

    /// SETNAME becomes a direct slot write.
    pub fn into_slot_set(mut self, slot: usize) -> Result<Node, InternalError> {
        self.expect(Token::SetName)?;
        self.props.slot = Some(slot);
        Ok(Node {
            token: Token::SetVar,
            ..self
        })
    }

    /// BREAK or CONTINUE becomes an unconditional jump to `target`.
    pub fn into_goto(mut self, target: NodeId) -> Result<Node, InternalError> {
        if !matches!(self.token, Token::Break | Token::Continue) {
            return Err(InternalError::UnexpectedNode {
                expected: Token::Break,
                found: self.token,
            });
        }
        let found = self.token;
        let jump = self.jump_mut().ok_or(InternalError::UnexpectedNode {
            expected: Token::Goto,
            found,
        })?;
        jump.target = Some(target);
        Ok(Node {
            token: Token::Goto,
            ..self
        })
    }
}

/// Arena owning every node of one compiled unit.
#[derive(Debug, Clone, Default)]
pub struct IrTree {
    nodes: Vec<Node>,
}

impl IrTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated nodes, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if nothing was allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stores a node and returns its id.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocates a childless node.
    pub fn leaf(&mut self, token: Token) -> NodeId {
        self.alloc(Node::new(token))
    }

    /// Allocates a node with the given children.
    pub fn node(&mut self, token: Token, children: &[NodeId]) -> NodeId {
        let mut node = Node::new(token);
        node.children.extend_from_slice(children);
        self.alloc(node)
    }

    /// Allocates a node with a line number.
    pub fn node_at(&mut self, token: Token, children: &[NodeId], line: Option<u32>) -> NodeId {
        let id = self.node(token, children);
        self.nodes[id.index()].line = line;
        id
    }

    /// Allocates a NUMBER node.
    pub fn number(&mut self, value: f64) -> NodeId {
        self.alloc(Node {
            payload: Payload::Number(value),
            ..Node::new(Token::Number)
        })
    }

    /// Allocates a string-carrying node (NAME, STRING, BINDNAME, ...).
    pub fn string(&mut self, token: Token, value: impl Into<String>) -> NodeId {
        self.alloc(Node {
            payload: Payload::Str(value.into()),
            ..Node::new(token)
        })
    }

    /// Allocates a TARGET marker.
    pub fn new_target(&mut self) -> NodeId {
        self.alloc(Node {
            payload: Payload::Target,
            ..Node::new(Token::Target)
        })
    }

    /// Allocates a jump node aimed at `target`.
    pub fn jump(&mut self, token: Token, target: Option<NodeId>) -> NodeId {
        let mut node = Node::new_jump(token);
        if let Some(jump) = node.jump_mut() {
            jump.target = target;
        }
        self.alloc(node)
    }

    /// Borrows a node.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Mutably borrows a node.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Tag of a node.
    pub fn token(&self, id: NodeId) -> Token {
        self.nodes[id.index()].token
    }

    /// Children of a node.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// First child.
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// Last child.
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// Returns true if the node has children.
    pub fn has_children(&self, id: NodeId) -> bool {
        !self.children(id).is_empty()
    }

    /// Jump fields of a jump node.
    pub fn jump_of(&self, id: NodeId) -> Result<&Jump, InternalError> {
        self.get(id).jump().ok_or(InternalError::NotAJump(id))
    }

    /// Mutable jump fields of a jump node.
    pub fn jump_of_mut(&mut self, id: NodeId) -> Result<&mut Jump, InternalError> {
        self.get_mut(id).jump_mut().ok_or(InternalError::NotAJump(id))
    }

    /// Sets the line number.
    pub fn set_line(&mut self, id: NodeId, line: Option<u32>) {
        self.nodes[id.index()].line = line;
    }

    /// Appends a child.
    pub fn add_child_to_back(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
    }

    /// Prepends a child.
    pub fn add_child_to_front(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.insert(0, child);
    }

    /// Inserts `child` at `index`.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[parent.index()].children.insert(index, child);
    }

    /// Inserts `child` right after the existing child `after`.
    pub fn add_child_after(
        &mut self,
        parent: NodeId,
        child: NodeId,
        after: NodeId,
    ) -> Result<(), InternalError> {
        let position = self.position_of(parent, after)?;
        self.insert_child(parent, position + 1, child);
        Ok(())
    }

    /// Detaches a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), InternalError> {
        let position = self.position_of(parent, child)?;
        self.nodes[parent.index()].children.remove(position);
        Ok(())
    }

    /// Replaces the child at `index`.
    pub fn replace_child_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[parent.index()].children[index] = child;
    }

    /// Detaches and returns all children.
    pub fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        std::mem::take(&mut self.nodes[parent.index()].children)
    }

    fn position_of(&self, parent: NodeId, child: NodeId) -> Result<usize, InternalError> {
        self.children(parent)
            .iter()
            .position(|&c| c == child)
            .ok_or(InternalError::NotAChild { parent, child })
    }

    /// Rewrites a node through a consuming transition.
    pub fn transition(
        &mut self,
        id: NodeId,
        rewrite: impl FnOnce(Node) -> Result<Node, InternalError>,
    ) -> Result<(), InternalError> {
        let node = std::mem::take(&mut self.nodes[id.index()]);
        self.nodes[id.index()] = rewrite(node)?;
        Ok(())
    }

    /// Ids reachable from `root` through child edges.
    pub fn reachable(&self, root: NodeId) -> FxHashSet<NodeId> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if seen.insert(id) {
                stack.extend_from_slice(self.children(id));
            }
        }
        seen
    }

    /// Checks that every jump under `root` lands on a TARGET in the same tree.
    pub fn validate_jump_targets(&self, root: NodeId) -> Result<(), InternalError> {
        let reachable = self.reachable(root);
        for &id in &reachable {
            let node = self.get(id);
            let Some(jump) = node.jump() else {
                continue;
            };
            let requires_target = matches!(
                node.token,
                Token::Goto
                    | Token::IfEq
                    | Token::IfNe
                    | Token::Jsr
                    | Token::Case
                    | Token::Switch
                    | Token::Loop
                    | Token::Label
                    | Token::Break
                    | Token::Continue
            );
            if requires_target && jump.target.is_none() {
                return Err(InternalError::DanglingTarget { jump: id });
            }
            let references = [
                jump.target,
                jump.continue_target,
                jump.finally_target,
                jump.default_target,
            ];
            for target in references.into_iter().flatten() {
                let lands = reachable.contains(&target) && self.token(target) == Token::Target;
                if !lands {
                    return Err(InternalError::DanglingTarget { jump: id });
                }
            }
        }
        Ok(())
    }

    /// Renders the subtree as indented text, one node per line.
    pub fn dump(&self, root: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.get(id);
            let _ = write!(out, "{:width$}{:?}", "", node.token, width = depth * 4);
            match &node.payload {
                Payload::Number(n) => {
                    let _ = write!(out, " {}", n);
                }
                Payload::Str(s) => {
                    let _ = write!(out, " {}", s);
                }
                Payload::Target => {
                    let _ = write!(out, " #{}", id.0);
                }
                Payload::Jump(jump) => {
                    if let Some(target) = jump.target {
                        let _ = write!(out, " -> #{}", target.0);
                    }
                }
                Payload::None => {}
            }
            if let Some(slot) = node.props.slot {
                let _ = write!(out, " [slot {}]", slot);
            }
            out.push('\n');
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }
}
