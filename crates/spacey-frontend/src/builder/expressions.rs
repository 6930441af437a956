// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression lowering, references and constant folding.

use crate::codec::number_to_string;
use crate::diagnostics::{ErrorReporter, MessageId};
use crate::env::LanguageVersion;
use crate::error::InternalError;
use crate::ir::{IncDecFlags, IrTree, Node, NodeId, PropertyId, SpecialCall};
use crate::token::Token;

use super::IrBuilder;

/// Statically known truthiness of a literal: `false`, `null`, `0` and NaN
/// are always false, `true` and other numbers always true.
pub fn is_always_defined_boolean(tree: &IrTree, id: NodeId) -> Option<bool> {
    let node = tree.get(id);
    match node.token() {
        Token::False | Token::Null => Some(false),
        Token::True => Some(true),
        Token::Number => node.number().map(|n| !n.is_nan() && n != 0.0),
        _ => None,
    }
}

/// ECMAScript ToInt32.
pub(crate) fn to_int32(value: f64) -> i32 {
    if !value.is_finite() {
        return 0;
    }
    let modulo = value.trunc().rem_euclid(4_294_967_296.0);
    modulo as u32 as i32
}

fn is_special_property(name: &str) -> bool {
    name == "__proto__" || name == "__parent__"
}

fn has_no_side_effects(token: Token) -> bool {
    matches!(
        token,
        Token::Number
            | Token::String
            | Token::Null
            | Token::This
            | Token::True
            | Token::False
            | Token::RegExp
    )
}

impl IrBuilder<'_> {
    // ========================================================================
    // Leaves
    // ========================================================================

    /// Identifier reference.
    pub fn create_name(&mut self, name: &str) -> NodeId {
        self.check_activation_name(name, Token::Name);
        self.tree.string(Token::Name, name)
    }

    /// String literal.
    pub fn create_string(&mut self, value: &str) -> NodeId {
        self.tree.string(Token::String, value)
    }

    /// Numeric literal.
    pub fn create_number(&mut self, value: f64) -> NodeId {
        self.tree.number(value)
    }

    /// Payload-free leaf such as THIS, NULL, TRUE or FALSE.
    pub fn create_leaf(&mut self, token: Token) -> NodeId {
        self.tree.leaf(token)
    }

    /// Regular expression literal.
    pub fn create_regexp(&mut self, pattern: &str, flags: &str) -> NodeId {
        let index = self.add_regexp(pattern, flags);
        let node = self.tree.leaf(Token::RegExp);
        self.tree.get_mut(node).props_mut().regexp_index = Some(index);
        node
    }

    /// Array literal; `None` elements are holes recorded as skip indexes.
    pub fn create_array_literal(&mut self, elements: &[Option<NodeId>]) -> NodeId {
        let array = self.tree.leaf(Token::ArrayLit);
        let mut skip = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            match element {
                Some(element) => self.tree.add_child_to_back(array, *element),
                None => skip.push(index),
            }
        }
        if !skip.is_empty() {
            self.tree.get_mut(array).props_mut().skip_indexes = Some(skip);
        }
        array
    }

    /// Object literal with one child per property value.
    pub fn create_object_literal(&mut self, properties: Vec<(PropertyId, NodeId)>) -> NodeId {
        let object = self.tree.leaf(Token::ObjectLit);
        let mut ids = Vec::with_capacity(properties.len());
        for (id, value) in properties {
            ids.push(id);
            self.tree.add_child_to_back(object, value);
        }
        self.tree.get_mut(object).props_mut().object_ids = Some(ids);
        object
    }

    // ========================================================================
    // Property access and calls
    // ========================================================================

    /// `target.name`; `__proto__` and `__parent__` become special references.
    pub fn create_property_get(&mut self, target: NodeId, name: &str) -> NodeId {
        self.check_activation_name(name, Token::GetProp);
        if is_special_property(name) {
            let reference = self.tree.node(Token::RefSpecial, &[target]);
            self.tree.get_mut(reference).props_mut().special_name = Some(name.to_string());
            return self.tree.node(Token::GetRef, &[reference]);
        }
        let name = self.create_string(name);
        self.tree.node(Token::GetProp, &[target, name])
    }

    /// `target[element]`.
    pub fn create_element_get(&mut self, target: NodeId, element: NodeId) -> NodeId {
        self.tree.node(Token::GetElem, &[target, element])
    }

    /// CALL or NEW; calls to `eval` and `With` are tagged and force activation.
    pub fn create_call_or_new(&mut self, token: Token, callee: NodeId, arguments: &[NodeId]) -> NodeId {
        let special = match self.tree.token(callee) {
            Token::Name => match self.tree.get(callee).string() {
                Some("eval") => Some(SpecialCall::Eval),
                Some("With") => Some(SpecialCall::With),
                _ => None,
            },
            Token::GetProp => {
                let property = self.tree.last_child(callee);
                match property.and_then(|p| self.tree.get(p).string()) {
                    Some("eval") => Some(SpecialCall::Eval),
                    _ => None,
                }
            }
            _ => None,
        };
        let node = self.tree.node(token, &[callee]);
        for &argument in arguments {
            self.tree.add_child_to_back(node, argument);
        }
        if let Some(special) = special {
            self.set_requires_activation();
            self.tree.get_mut(node).props_mut().special_call = Some(special);
        }
        node
    }

    pub(crate) fn check_activation_name(&mut self, name: &str, token: Token) {
        if !self.inside_function {
            return;
        }
        let activation = if name == "arguments" || self.env.is_activation_name(name) {
            true
        } else {
            name == "length"
                && token == Token::GetProp
                && self.env.language_version() == LanguageVersion::V1_2
        };
        if activation {
            self.set_requires_activation();
        }
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// `?:`, folded when the condition is a literal.
    pub fn create_cond_expr(&mut self, cond: NodeId, if_true: NodeId, if_false: NodeId) -> NodeId {
        match is_always_defined_boolean(&self.tree, cond) {
            Some(true) => if_true,
            Some(false) => if_false,
            None => self.tree.node(Token::Hook, &[cond, if_true, if_false]),
        }
    }

    /// Unary operator with `delete`, `typeof name` and literal rewrites.
    pub fn create_unary(&mut self, token: Token, child: NodeId) -> Result<NodeId, InternalError> {
        let child_token = self.tree.token(child);
        match token {
            Token::DelProp => return self.create_delete(child),
            Token::TypeOf if child_token == Token::Name => {
                self.tree.transition(child, Node::into_typeof_name)?;
                return Ok(child);
            }
            Token::BitNot => {
                if let Some(value) = self.tree.get(child).number() {
                    return Ok(self.tree.number(f64::from(!to_int32(value))));
                }
            }
            Token::Neg => {
                if let Some(value) = self.tree.get(child).number() {
                    return Ok(self.tree.number(-value));
                }
            }
            Token::Not => {
                if let Some(truthy) = is_always_defined_boolean(&self.tree, child) {
                    let folded = if truthy { Token::False } else { Token::True };
                    return Ok(self.tree.leaf(folded));
                }
            }
            _ => {}
        }
        Ok(self.tree.node(token, &[child]))
    }

    fn create_delete(&mut self, child: NodeId) -> Result<NodeId, InternalError> {
        match self.tree.token(child) {
            Token::Name => {
                let name = self.tree.get(child).string().unwrap_or_default().to_string();
                self.tree.transition(child, Node::into_bind_name)?;
                let property = self.tree.string(Token::String, name);
                Ok(self.tree.node(Token::DelProp, &[child, property]))
            }
            Token::GetProp | Token::GetElem => {
                let parts = self.tree.take_children(child);
                Ok(self.tree.node(Token::DelProp, &parts))
            }
            Token::GetRef => {
                let parts = self.tree.take_children(child);
                Ok(self.tree.node(Token::DelRef, &parts))
            }
            token if has_no_side_effects(token) => Ok(self.tree.leaf(Token::True)),
            _ => {
                // the operand still runs
                let result = self.tree.leaf(Token::True);
                Ok(self.tree.node(Token::Comma, &[child, result]))
            }
        }
    }

    /// Binary operator, folding literal arithmetic and literal `&&`/`||` operands.
    pub fn create_binary(&mut self, token: Token, left: NodeId, right: NodeId) -> NodeId {
        if let Some(folded) = self.fold_binary(token, left, right) {
            return folded;
        }
        self.tree.node(token, &[left, right])
    }

    fn fold_binary(&mut self, token: Token, left: NodeId, right: NodeId) -> Option<NodeId> {
        let (l, r) = (self.tree.get(left), self.tree.get(right));
        let (l_num, r_num) = (l.number(), r.number());
        let l_str = (l.token() == Token::String).then(|| l.string().unwrap_or_default());
        let r_str = (r.token() == Token::String).then(|| r.string().unwrap_or_default());

        match token {
            Token::Add => {
                // string + anything known concatenates
                let text = match (l_str, r_str, l_num, r_num) {
                    (Some(a), Some(b), _, _) => format!("{a}{b}"),
                    (Some(a), None, _, Some(b)) => format!("{a}{}", number_to_string(b)),
                    (None, Some(b), Some(a), _) => format!("{}{b}", number_to_string(a)),
                    (None, None, Some(a), Some(b)) => return Some(self.tree.number(a + b)),
                    _ => return None,
                };
                Some(self.tree.string(Token::String, text))
            }
            Token::Sub => match (l_num, r_num) {
                (Some(a), Some(b)) => Some(self.tree.number(a - b)),
                (Some(a), None) if a == 0.0 => Some(self.tree.node(Token::Neg, &[right])),
                (None, Some(b)) if b == 0.0 => Some(self.tree.node(Token::Pos, &[left])),
                _ => None,
            },
            Token::Mul => match (l_num, r_num) {
                (Some(a), Some(b)) => Some(self.tree.number(a * b)),
                (Some(a), None) if a == 1.0 => Some(self.tree.node(Token::Pos, &[right])),
                (None, Some(b)) if b == 1.0 => Some(self.tree.node(Token::Pos, &[left])),
                // x * 0 stays: Infinity * 0 is NaN
                _ => None,
            },
            Token::Div => match (l_num, r_num) {
                (Some(a), Some(b)) => Some(self.tree.number(a / b)),
                (None, Some(b)) if b == 1.0 => Some(self.tree.node(Token::Pos, &[left])),
                _ => None,
            },
            Token::And => match is_always_defined_boolean(&self.tree, left)? {
                false => Some(left),
                true => Some(right),
            },
            Token::Or => match is_always_defined_boolean(&self.tree, left)? {
                true => Some(left),
                false => Some(right),
            },
            _ => None,
        }
    }

    // ========================================================================
    // References and assignment
    // ========================================================================

    /// Returns the node usable as an assignment target, or `None`.
    ///
    /// A call used as a target becomes `GET_REF(REF_CALL ...)`.
    pub(crate) fn make_reference(&mut self, node: NodeId) -> Result<Option<NodeId>, InternalError> {
        match self.tree.token(node) {
            Token::Name | Token::GetProp | Token::GetElem | Token::GetRef => Ok(Some(node)),
            Token::Call => {
                self.tree.transition(node, Node::into_ref_call)?;
                Ok(Some(self.tree.node(Token::GetRef, &[node])))
            }
            _ => Ok(None),
        }
    }

    pub(crate) fn simple_assignment(&mut self, left: NodeId, right: NodeId) -> Result<NodeId, InternalError> {
        match self.tree.token(left) {
            Token::Name => {
                self.tree.transition(left, Node::into_bind_name)?;
                Ok(self.tree.node(Token::SetName, &[left, right]))
            }
            token @ (Token::GetProp | Token::GetElem) => {
                let mut parts = self.tree.take_children(left);
                parts.push(right);
                let set = if token == Token::GetProp {
                    Token::SetProp
                } else {
                    Token::SetElem
                };
                Ok(self.tree.node(set, &parts))
            }
            Token::GetRef => {
                let mut parts = self.tree.take_children(left);
                parts.push(right);
                Ok(self.tree.node(Token::SetRef, &parts))
            }
            found => Err(InternalError::UnexpectedNode {
                expected: Token::Name,
                found,
            }),
        }
    }

    /// `left op= right`. A left side that is not a reference is reported and
    /// the right side stands in for the whole assignment.
    pub fn create_assignment(
        &mut self,
        assign: Token,
        left: NodeId,
        right: NodeId,
        line: Option<u32>,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<NodeId, InternalError> {
        let Some(left) = self.make_reference(left)? else {
            self.report(reporter, MessageId::BadAssignLeft, line, None);
            return Ok(right);
        };
        if assign == Token::Assign {
            return self.simple_assignment(left, right);
        }
        let op = assign.compound_operator().ok_or(InternalError::UnexpectedNode {
            expected: Token::Assign,
            found: assign,
        })?;

        match self.tree.token(left) {
            Token::Name => {
                let name = self.tree.get(left).string().unwrap_or_default().to_string();
                let current = self.tree.string(Token::Name, name.as_str());
                let value = self.tree.node(op, &[current, right]);
                let bind = self.tree.string(Token::BindName, name);
                Ok(self.tree.node(Token::SetName, &[bind, value]))
            }
            token @ (Token::GetProp | Token::GetElem) => {
                let mut parts = self.tree.take_children(left);
                let stack = self.tree.leaf(Token::UseStack);
                parts.push(self.tree.node(op, &[stack, right]));
                let set = if token == Token::GetProp {
                    Token::SetPropOp
                } else {
                    Token::SetElemOp
                };
                Ok(self.tree.node(set, &parts))
            }
            Token::GetRef => {
                let mut parts = self.tree.take_children(left);
                let stack = self.tree.leaf(Token::UseStack);
                parts.push(self.tree.node(op, &[stack, right]));
                Ok(self.tree.node(Token::SetRefOp, &parts))
            }
            found => Err(InternalError::UnexpectedNode {
                expected: Token::Name,
                found,
            }),
        }
    }

    /// `++`/`--` in prefix or postfix form. An invalid operand is reported and
    /// returned unchanged.
    pub fn create_inc_dec(
        &mut self,
        token: Token,
        post: bool,
        child: NodeId,
        line: Option<u32>,
        reporter: &mut dyn ErrorReporter,
    ) -> Result<NodeId, InternalError> {
        let Some(reference) = self.make_reference(child)? else {
            let message = if token == Token::Dec {
                MessageId::BadDecrement
            } else {
                MessageId::BadIncrement
            };
            self.report(reporter, message, line, None);
            return Ok(child);
        };
        let mut flags = IncDecFlags::empty();
        if token == Token::Dec {
            flags |= IncDecFlags::DECREMENT;
        }
        if post {
            flags |= IncDecFlags::POST;
        }
        let node = self.tree.node(token, &[reference]);
        self.tree.get_mut(node).props_mut().incr_decr = Some(flags);
        Ok(node)
    }
}
