// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-frontend
//!
//! The middle of the Spacey JavaScript compiler: everything between the
//! parser's syntax tree and the bytecode emitter.
//!
//! ## Overview
//!
//! ```text
//! Program ──lower──▶ UnitIr ──normalize──▶ UnitIr ──emit──▶ CompiledUnit
//!    │                                                           ▲
//!    └────────────write_program──▶ encoded source ──decompile────┘
//! ```
//!
//! - [`builder`] creates IR subtrees for every source construct
//! - [`normalize`] rewrites structured jumps into primitive ones
//! - [`codec`] stores source as a token stream and regenerates text from it
//! - [`unit`] holds the published descriptor of a script or function
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use spacey_frontend::{Compiler, CompilerEnv, DiagnosticCollector};
//!
//! let compiler = Compiler::new(CompilerEnv::default());
//! let mut reporter = DiagnosticCollector::new();
//! let script = compiler.compile(&program, &mut reporter)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builder;
pub mod codec;
pub mod diagnostics;
pub mod env;
pub mod error;
pub mod ir;
pub mod lower;
pub mod normalize;
pub mod token;
pub mod unit;

use std::sync::Arc;

use tracing::debug;

pub use codec::{DecompileFlags, DecompileProperties, DecompileProperty, decompile};
pub use diagnostics::{Diagnostic, DiagnosticCollector, ErrorReporter, MessageId};
pub use env::{CompilerEnv, LanguageVersion};
pub use error::{Error, InternalError, Result};
pub use ir::UnitIr;
pub use token::Token;
pub use unit::{CompiledUnit, UnitBuilder};

use ast::Program;

/// A compiled script: normalized IR for the script and its functions, plus
/// the encoded source they all share.
#[derive(Debug, Clone)]
pub struct ScriptIr {
    /// The script unit; functions hang off it
    pub unit: UnitIr,
    /// Encoded source of the whole program
    pub encoded_source: Arc<[u16]>,
    /// Language version the script was compiled for
    pub language_version: LanguageVersion,
    /// Source file identity
    pub source_name: Arc<str>,
}

/// Front-end compiler for one environment.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    env: CompilerEnv,
}

impl Compiler {
    /// Creates a compiler.
    pub fn new(env: CompilerEnv) -> Self {
        Self { env }
    }

    /// The environment programs are compiled in.
    pub fn env(&self) -> &CompilerEnv {
        &self.env
    }

    /// Compiles a program into normalized IR and encoded source.
    ///
    /// User-script problems go to `reporter`; if any are reported the
    /// result is [`Error::Compilation`] and nothing is normalized.
    pub fn compile(&self, program: &Program, reporter: &mut dyn ErrorReporter) -> Result<ScriptIr> {
        let errors_before = reporter.error_count();
        let mut unit = lower::lower_program(&self.env, program, reporter)?;
        let count = reporter.error_count() - errors_before;
        if count > 0 {
            debug!(source = %self.env.source_name(), count, "compilation failed");
            return Err(Error::Compilation { count });
        }

        normalize::normalize(&mut unit, &self.env, reporter)?;
        let mut validated = Ok(());
        unit.for_each_unit(&mut |u| {
            if validated.is_ok() {
                validated = u.tree.validate_jump_targets(u.root);
            }
        });
        validated?;

        let written = codec::write_program(program)?;
        let encoded_source = written.source.into_shared();
        assign_ranges(&mut unit, &written.function_ranges, encoded_source.len())?;
        debug!(
            source = %self.env.source_name(),
            encoded = encoded_source.len(),
            functions = written.function_ranges.len(),
            "compiled script"
        );

        Ok(ScriptIr {
            unit,
            encoded_source,
            language_version: self.env.language_version(),
            source_name: self.env.source_name().clone(),
        })
    }

    /// Compiles independent programs on the rayon pool.
    ///
    /// Each program gets its own collector, returned next to its result in
    /// input order.
    #[cfg(feature = "parallel")]
    pub fn compile_batch(&self, programs: &[Program]) -> Vec<(Result<ScriptIr>, DiagnosticCollector)> {
        use rayon::prelude::*;

        debug!(programs = programs.len(), "compiling batch");
        programs
            .par_iter()
            .map(|program| {
                let mut reporter = DiagnosticCollector::new();
                let result = self.compile(program, &mut reporter);
                (result, reporter)
            })
            .collect()
    }
}

/// Gives the script the whole source and each function its recorded range.
fn assign_ranges(unit: &mut UnitIr, ranges: &[std::ops::Range<usize>], len: usize) -> Result<()> {
    let mut functions = 0;
    unit.for_each_unit(&mut |u| functions += usize::from(u.is_function()));
    if functions != ranges.len() {
        return Err(InternalError::FunctionRangeMismatch {
            functions,
            ranges: ranges.len(),
        }
        .into());
    }

    let mut next = ranges.iter();
    unit.for_each_unit_mut(&mut |u| {
        if !u.is_function() {
            u.encoded_range = 0..len;
        } else if let Some(range) = next.next() {
            u.encoded_range = range.clone();
        }
    });
    Ok(())
}
