// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script diagnostics.
//!
//! Lowering reports user-script errors through an [`ErrorReporter`] and keeps
//! going with a placeholder node, so one pass collects every error in a unit.

use std::fmt;
use std::sync::Arc;

/// Identifier of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Invalid assignment target
    BadAssignLeft,
    /// Invalid `++` operand
    BadIncrement,
    /// Invalid `--` operand
    BadDecrement,
    /// Invalid for-in left-hand side
    BadForInLhs,
    /// More than one declarator in a for-in head
    MultipleForInIndex,
    /// Nesting exceeds the configured depth
    TooDeepRecursion,
    /// Catch clause after an unconditional catch clause
    CatchUnreachable,
    /// Second `default` in a switch
    DoubleSwitchDefault,
    /// break/continue to a label that does not exist
    UndefinedLabel,
    /// Label reused while still active
    DuplicateLabel,
    /// Unlabelled break outside loop or switch
    BadBreak,
    /// continue outside any loop
    ContinueOutside,
    /// continue to a label that does not name a loop
    ContinueNonLoop,
    /// return outside a function
    BadReturn,
}

impl MessageId {
    /// Stable message key.
    pub fn key(self) -> &'static str {
        match self {
            MessageId::BadAssignLeft => "msg.bad.assign.left",
            MessageId::BadIncrement => "msg.bad.incr",
            MessageId::BadDecrement => "msg.bad.decr",
            MessageId::BadForInLhs => "msg.bad.for.in.lhs",
            MessageId::MultipleForInIndex => "msg.mult.index",
            MessageId::TooDeepRecursion => "msg.too.deep.parser.recursion",
            MessageId::CatchUnreachable => "msg.catch.unreachable",
            MessageId::DoubleSwitchDefault => "msg.double.switch.default",
            MessageId::UndefinedLabel => "msg.undef.label",
            MessageId::DuplicateLabel => "msg.dup.label",
            MessageId::BadBreak => "msg.bad.break",
            MessageId::ContinueOutside => "msg.continue.outside",
            MessageId::ContinueNonLoop => "msg.continue.nonloop",
            MessageId::BadReturn => "msg.bad.return",
        }
    }

    /// Human readable text.
    pub fn text(self) -> &'static str {
        match self {
            MessageId::BadAssignLeft => "Invalid assignment left-hand side.",
            MessageId::BadIncrement => "Invalid increment operand.",
            MessageId::BadDecrement => "Invalid decrement operand.",
            MessageId::BadForInLhs => "Invalid left-hand side of for..in loop.",
            MessageId::MultipleForInIndex => "Only one variable allowed in for..in loop.",
            MessageId::TooDeepRecursion => "Too deep recursion while compiling.",
            MessageId::CatchUnreachable => {
                "any catch clauses following an unqualified catch are unreachable"
            }
            MessageId::DoubleSwitchDefault => "duplicate \"default\" label in switch statement",
            MessageId::UndefinedLabel => "undefined label",
            MessageId::DuplicateLabel => "duplicate label",
            MessageId::BadBreak => "unlabelled break must be inside loop or switch",
            MessageId::ContinueOutside => "continue must be inside loop",
            MessageId::ContinueNonLoop => "can only continue to labeled iteration statement",
            MessageId::BadReturn => "invalid return",
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// A reported script problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// What went wrong
    pub message: MessageId,
    /// Source file the unit came from
    pub source_name: Arc<str>,
    /// Line of the offending statement, if known
    pub line: Option<u32>,
    /// Extra context such as a label name
    pub detail: Option<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_name)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Receives diagnostics during compilation.
pub trait ErrorReporter {
    /// Reports an error; the unit will not be executable.
    fn error(&mut self, diagnostic: Diagnostic);

    /// Number of errors reported so far.
    fn error_count(&self) -> usize;
}

/// Reporter that keeps every diagnostic.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    errors: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors in report order.
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Returns true if an error with the given id was reported.
    pub fn has_error(&self, message: MessageId) -> bool {
        self.errors.iter().any(|d| d.message == message)
    }
}

impl ErrorReporter for DiagnosticCollector {
    fn error(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(key = diagnostic.message.key(), "{}", diagnostic);
        self.errors.push(diagnostic);
    }

    fn error_count(&self) -> usize {
        self.errors.len()
    }
}
