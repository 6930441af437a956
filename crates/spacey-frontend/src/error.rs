// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the compiler front-end.

use thiserror::Error;

use crate::codec::{DecompileFlags, DecompileProperty};
use crate::ir::NodeId;
use crate::token::Token;

/// Result type for front-end operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by lowering, normalization and decompilation.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// User-script errors were reported; the unit cannot be executed
    #[error("script has {count} compilation error(s)")]
    Compilation {
        /// Number of errors reported for the unit
        count: usize,
    },

    /// A defect in the lowering or encoding logic itself
    #[error("internal compiler error: {0}")]
    Internal(#[from] InternalError),

    /// A decompiler property was given a negative value
    #[error("invalid decompile property {property:?}: {value} (must be non-negative)")]
    InvalidDecompileProperty {
        /// The offending property
        property: DecompileProperty,
        /// The rejected value
        value: i32,
    },

    /// Decompile flags select more than one output mode
    #[error("decompile flags {0:?} select conflicting output modes")]
    ConflictingDecompileFlags(DecompileFlags),

    /// Compiler environment rejected at construction
    #[error("invalid compiler environment: {0}")]
    InvalidEnv(&'static str),
}

/// Invariant failures. These never describe a problem with the script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InternalError {
    /// A node had a different shape than the operation requires
    #[error("expected {expected:?} node, found {found:?}")]
    UnexpectedNode {
        /// Token the operation requires
        expected: Token,
        /// Token actually present
        found: Token,
    },

    /// A node was asked to be placed after a sibling it does not have
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// The parent searched
        parent: NodeId,
        /// The missing child
        child: NodeId,
    },

    /// A jump node has no target or its target is outside the unit tree
    #[error("jump {jump:?} references a target outside its tree")]
    DanglingTarget {
        /// The offending jump
        jump: NodeId,
    },

    /// A jump-only accessor was used on a non-jump node
    #[error("node {0:?} is not a jump")]
    NotAJump(NodeId),

    /// break/continue whose owning construct is not on the unwind stack
    #[error("break/continue {0:?} has no enclosing owner")]
    UnmatchedJump(NodeId),

    /// WITH node not followed by its LEAVEWITH marker
    #[error("with-block {0:?} is not followed by LEAVEWITH")]
    MissingLeaveWith(NodeId),

    /// Encoded source contains an unknown token value
    #[error("unknown token {value} at offset {offset} in encoded source")]
    UnknownToken {
        /// Raw code unit
        value: u16,
        /// Offset of the code unit
        offset: usize,
    },

    /// Encoded source ends in the middle of a token payload
    #[error("encoded source truncated at offset {0}")]
    TruncatedSource(usize),

    /// Number payload with a type code other than S, J or D
    #[error("bad number type code {code} at offset {offset}")]
    BadNumberCode {
        /// Raw type code
        code: u16,
        /// Offset of the code
        offset: usize,
    },

    /// Negative integral values must be encoded as NEG + positive number
    #[error("cannot encode negative integral number {0}")]
    NegativeNumber(f64),

    /// Encoded function ranges do not line up with the function units
    #[error("{ranges} encoded function ranges for {functions} function units")]
    FunctionRangeMismatch {
        /// Function units in the IR
        functions: usize,
        /// Ranges recorded while encoding
        ranges: usize,
    },
}
