// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiled-unit descriptors.
//!
//! A [`CompiledUnit`] is the published, immutable record of one script or
//! function: bytecode, names, nested units and the encoded source it can be
//! decompiled from. Descriptors are assembled with a [`UnitBuilder`] and
//! published once as `Arc<CompiledUnit>`; nested units keep a weak link to
//! the unit that contains them.

pub mod bytecode;

pub use bytecode::{Bytecode, Instruction, OpCode, Operand};

use std::ops::Range;
use std::sync::{Arc, OnceLock, Weak};

use tracing::debug;

use crate::ScriptIr;
use crate::codec::{DecompileFlags, DecompileProperties, decompile};
use crate::env::LanguageVersion;
use crate::error::Result;
use crate::ir::{FunctionType, ParamOrVarTable, RegExpLiteral, UnitIr};

/// Published descriptor of a compiled script or function.
#[derive(Debug)]
pub struct CompiledUnit {
    name: Option<String>,
    source_name: Arc<str>,
    language_version: LanguageVersion,
    function_type: Option<FunctionType>,
    needs_activation: bool,
    param_count: usize,
    names: Vec<String>,
    bytecode: Bytecode,
    functions: Vec<Arc<CompiledUnit>>,
    regexps: Vec<RegExpLiteral>,
    encoded_source: Arc<[u16]>,
    encoded_range: Range<usize>,
    parent: Weak<CompiledUnit>,
    line_numbers: OnceLock<Vec<u32>>,
}

impl CompiledUnit {
    /// Builds descriptors for a compiled script and all of its functions.
    ///
    /// `emit` produces the bytecode of each unit from its normalized IR.
    pub fn from_script_ir(ir: &ScriptIr, mut emit: impl FnMut(&UnitIr) -> Bytecode) -> Arc<Self> {
        let root = UnitBuilder::top_level(
            ir.language_version,
            ir.source_name.clone(),
            ir.encoded_source.clone(),
        );
        let builder = Self::builder_for(root, &ir.unit, &mut emit);
        builder.publish()
    }

    fn builder_for(
        mut builder: UnitBuilder,
        unit: &UnitIr,
        emit: &mut impl FnMut(&UnitIr) -> Bytecode,
    ) -> UnitBuilder {
        builder = builder
            .params_and_vars(&unit.vars)
            .needs_activation(unit.needs_activation)
            .regexps(unit.regexps.clone())
            .bytecode(emit(unit));
        if unit.is_function() {
            builder = builder.encoded_range(unit.encoded_range.clone());
        }
        for function in &unit.functions {
            let function_type = function.function_type().unwrap_or(FunctionType::Statement);
            let nested = builder
                .nested(function_type)
                .name(function.function_name().map(str::to_string));
            let nested = Self::builder_for(nested, function, emit);
            builder.add_function(nested);
        }
        builder
    }

    /// Function name; `None` for scripts and anonymous functions.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Source file identity shared by every unit of the script.
    pub fn source_name(&self) -> &Arc<str> {
        &self.source_name
    }

    /// Language version the unit was compiled for.
    pub fn language_version(&self) -> LanguageVersion {
        self.language_version
    }

    /// How the function was declared; `None` for a script.
    pub fn function_type(&self) -> Option<FunctionType> {
        self.function_type
    }

    /// Returns true for functions, false for top-level scripts.
    pub fn is_function(&self) -> bool {
        self.function_type.is_some()
    }

    /// Returns true if the unit needs a full activation record.
    pub fn needs_activation(&self) -> bool {
        self.needs_activation
    }

    /// Returns true if the source was produced at runtime by `eval` or `Function`.
    pub fn is_generated_script(&self) -> bool {
        self.source_name.contains("(eval)") || self.source_name.contains("(Function)")
    }

    /// Number of declared parameters.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Number of parameters and variables.
    pub fn param_and_var_count(&self) -> usize {
        self.names.len()
    }

    /// Parameter or variable at `index`; parameters come first.
    pub fn param_or_var_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Number of nested functions.
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Nested function at `index`.
    pub fn function(&self, index: usize) -> Option<&Arc<CompiledUnit>> {
        self.functions.get(index)
    }

    /// Regular expression literals, indexed by the IR's regexp index.
    pub fn regexps(&self) -> &[RegExpLiteral] {
        &self.regexps
    }

    /// Emitted bytecode.
    pub fn bytecode(&self) -> &Bytecode {
        &self.bytecode
    }

    /// Enclosing unit, while it is alive.
    pub fn parent(&self) -> Option<Arc<CompiledUnit>> {
        self.parent.upgrade()
    }

    /// Range of this unit inside the shared encoded source.
    pub fn encoded_range(&self) -> Range<usize> {
        self.encoded_range.clone()
    }

    /// This unit's part of the encoded source.
    pub fn encoded_source(&self) -> &[u16] {
        self.encoded_source
            .get(self.encoded_range.clone())
            .unwrap_or_default()
    }

    /// Distinct source lines with code, ascending; computed on first use.
    pub fn line_numbers(&self) -> &[u32] {
        self.line_numbers.get_or_init(|| {
            let mut lines: Vec<u32> = self.bytecode.lines().collect();
            lines.sort_unstable();
            lines.dedup();
            lines
        })
    }

    /// Regenerates this unit's source text.
    pub fn decompile(&self, flags: DecompileFlags, properties: &DecompileProperties) -> Result<String> {
        decompile(self.encoded_source(), flags, properties)
    }
}

/// Mutable descriptor under construction.
#[derive(Debug, Clone)]
pub struct UnitBuilder {
    name: Option<String>,
    source_name: Arc<str>,
    language_version: LanguageVersion,
    function_type: Option<FunctionType>,
    needs_activation: bool,
    param_count: usize,
    names: Vec<String>,
    bytecode: Bytecode,
    functions: Vec<UnitBuilder>,
    regexps: Vec<RegExpLiteral>,
    encoded_source: Arc<[u16]>,
    encoded_range: Range<usize>,
}

impl UnitBuilder {
    /// Descriptor of a top-level script covering the whole encoded source.
    pub fn top_level(
        language_version: LanguageVersion,
        source_name: Arc<str>,
        encoded_source: Arc<[u16]>,
    ) -> Self {
        let encoded_range = 0..encoded_source.len();
        Self {
            name: None,
            source_name,
            language_version,
            function_type: None,
            needs_activation: false,
            param_count: 0,
            names: Vec::new(),
            bytecode: Bytecode::new(),
            functions: Vec::new(),
            regexps: Vec::new(),
            encoded_source,
            encoded_range,
        }
    }

    /// Descriptor of a function nested in `self`, sharing its source and version.
    pub fn nested(&self, function_type: FunctionType) -> Self {
        Self {
            function_type: Some(function_type),
            encoded_range: 0..0,
            ..Self::top_level(
                self.language_version,
                self.source_name.clone(),
                self.encoded_source.clone(),
            )
        }
    }

    /// Sets the function name.
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Copies parameter and variable names.
    pub fn params_and_vars(mut self, vars: &ParamOrVarTable) -> Self {
        self.param_count = vars.param_count();
        self.names = vars.names().to_vec();
        self
    }

    /// Sets the activation requirement.
    pub fn needs_activation(mut self, needs_activation: bool) -> Self {
        self.needs_activation = needs_activation;
        self
    }

    /// Sets the bytecode.
    pub fn bytecode(mut self, bytecode: Bytecode) -> Self {
        self.bytecode = bytecode;
        self
    }

    /// Sets the regular expression literals.
    pub fn regexps(mut self, regexps: Vec<RegExpLiteral>) -> Self {
        self.regexps = regexps;
        self
    }

    /// Sets the unit's range in the encoded source.
    pub fn encoded_range(mut self, range: Range<usize>) -> Self {
        self.encoded_range = range;
        self
    }

    /// Appends a nested function and returns its index.
    pub fn add_function(&mut self, function: UnitBuilder) -> usize {
        self.functions.push(function);
        self.functions.len() - 1
    }

    /// Freezes the descriptor tree.
    pub fn publish(self) -> Arc<CompiledUnit> {
        let unit = self.publish_in(Weak::new());
        debug!(
            source = %unit.source_name,
            functions = unit.function_count(),
            "published compiled unit"
        );
        unit
    }

    fn publish_in(self, parent: Weak<CompiledUnit>) -> Arc<CompiledUnit> {
        Arc::new_cyclic(|me| {
            let functions = self
                .functions
                .into_iter()
                .map(|function| function.publish_in(me.clone()))
                .collect();
            CompiledUnit {
                name: self.name,
                source_name: self.source_name,
                language_version: self.language_version,
                function_type: self.function_type,
                needs_activation: self.needs_activation,
                param_count: self.param_count,
                names: self.names,
                bytecode: self.bytecode,
                functions,
                regexps: self.regexps,
                encoded_source: self.encoded_source,
                encoded_range: self.encoded_range,
                parent,
                line_numbers: OnceLock::new(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    fn script(source_name: &str) -> UnitBuilder {
        let encoded: Arc<[u16]> = Arc::from(vec![Token::Script.code()]);
        UnitBuilder::top_level(LanguageVersion::V1_5, Arc::from(source_name), encoded)
    }

    #[test]
    fn test_nested_units_link_to_parent() {
        let mut root = script("a.js");
        let inner = root.nested(FunctionType::Statement).name(Some("f".to_string()));
        root.add_function(inner);
        let root = root.publish();

        let f = root.function(0).unwrap();
        assert_eq!(f.name(), Some("f"));
        assert!(f.is_function());
        assert!(!root.is_function());
        assert!(Arc::ptr_eq(&f.parent().unwrap(), &root));
        assert!(root.parent().is_none());
        assert_eq!(&**f.source_name(), "a.js");
        assert_eq!(f.language_version(), LanguageVersion::V1_5);
    }

    #[test]
    fn test_param_and_var_names() {
        let mut vars = ParamOrVarTable::new();
        vars.add_param("a");
        vars.add_param("b");
        vars.add_var("tmp");
        let unit = script("a.js").params_and_vars(&vars).publish();

        assert_eq!(unit.param_count(), 2);
        assert_eq!(unit.param_and_var_count(), 3);
        assert_eq!(unit.param_or_var_name(2), Some("tmp"));
        assert_eq!(unit.param_or_var_name(3), None);
    }

    #[test]
    fn test_line_numbers_sorted_and_distinct() {
        let mut bytecode = Bytecode::new();
        for line in [4, 2, 4, 9, 2] {
            bytecode.mark_line(line);
        }
        let unit = script("a.js").bytecode(bytecode).publish();
        assert_eq!(unit.line_numbers(), &[2, 4, 9]);
    }

    #[test]
    fn test_generated_script_detection() {
        assert!(script("x.js#3(eval)").publish().is_generated_script());
        assert!(script("x.js#7(Function)").publish().is_generated_script());
        assert!(!script("x.js").publish().is_generated_script());
    }

    #[test]
    fn test_descriptor_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledUnit>();
    }
}
