// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-script and per-function IR records.

use std::ops::Range;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;

use super::{IrTree, NodeId};

/// How a function appears in its enclosing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
pub enum FunctionType {
    /// Top-level `function f() {}`
    Statement = 1,
    /// Function used as a value
    Expression = 2,
    /// `function f() {}` nested inside a block
    ExpressionStatement = 3,
}

/// Whether a unit is the script itself or a function inside it.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    /// Top-level script
    Script,
    /// Function literal
    Function {
        /// Declared name, if any
        name: Option<String>,
        /// Syntactic position
        function_type: FunctionType,
    },
}

/// A regular expression literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegExpLiteral {
    /// Pattern source
    pub pattern: String,
    /// Flag letters
    pub flags: String,
}

/// Parameters followed by variables, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParamOrVarTable {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
    param_count: usize,
}

impl ParamOrVarTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter. A repeated parameter name shadows the earlier one.
    pub fn add_param(&mut self, name: &str) {
        let slot = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), slot);
        self.param_count += 1;
    }

    /// Registers a variable; returns false if the name was already known.
    pub fn add_var(&mut self, name: &str) -> bool {
        if self.index.contains_key(name) {
            return false;
        }
        self.index.insert(name.to_string(), self.names.len());
        self.names.push(name.to_string());
        true
    }

    /// Removes a name and renumbers the slots after it.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(slot) = self.index.remove(name) else {
            return false;
        };
        self.names.remove(slot);
        if slot < self.param_count {
            self.param_count -= 1;
        }
        for value in self.index.values_mut() {
            if *value > slot {
                *value -= 1;
            }
        }
        true
    }

    /// Returns true if the name is a parameter or variable.
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Slot of a name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Number of parameters.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Total number of names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name stored in a slot.
    pub fn name(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    /// All names in slot order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// IR of one script or function, with the functions it contains.
#[derive(Debug, Clone)]
pub struct UnitIr {
    /// Script or function
    pub kind: UnitKind,
    /// Node arena
    pub tree: IrTree,
    /// Root node: SCRIPT for scripts, BLOCK body for functions
    pub root: NodeId,
    /// Parameters and variables
    pub vars: ParamOrVarTable,
    /// Nested functions, indexed by the FUNCTION nodes' `function_index`
    pub functions: Vec<UnitIr>,
    /// Regular expression literals, indexed by `regexp_index`
    pub regexps: Vec<RegExpLiteral>,
    /// Variables must live in a heap-allocated activation record
    pub needs_activation: bool,
    /// Range of this unit inside the script's encoded source
    pub encoded_range: Range<usize>,
    /// Line the unit starts on
    pub line: Option<u32>,
}

impl UnitIr {
    /// Returns true for function units.
    pub fn is_function(&self) -> bool {
        matches!(self.kind, UnitKind::Function { .. })
    }

    /// Declared function name.
    pub fn function_name(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::Function { name, .. } => name.as_deref(),
            UnitKind::Script => None,
        }
    }

    /// Syntactic position of a function unit.
    pub fn function_type(&self) -> Option<FunctionType> {
        match self.kind {
            UnitKind::Function { function_type, .. } => Some(function_type),
            UnitKind::Script => None,
        }
    }

    /// Nested function by index.
    pub fn function(&self, index: usize) -> Option<&UnitIr> {
        self.functions.get(index)
    }

    /// Visits this unit and every nested unit in pre-order.
    pub fn for_each_unit_mut(&mut self, visit: &mut impl FnMut(&mut UnitIr)) {
        visit(self);
        for function in &mut self.functions {
            function.for_each_unit_mut(visit);
        }
    }

    /// Visits this unit and every nested unit in pre-order.
    pub fn for_each_unit(&self, visit: &mut impl FnMut(&UnitIr)) {
        visit(self);
        for function in &self.functions {
            function.for_each_unit(visit);
        }
    }
}
