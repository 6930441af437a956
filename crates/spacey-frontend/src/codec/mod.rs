// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Encoded source: a compact token stream that regenerates formatted source.
//!
//! ## Encoding
//!
//! | Item | Code units |
//! |------|------------|
//! | operator / keyword / brace | `token` |
//! | name, string, regexp | `token len text..` (`len` takes two units, high bit set, from 32768 on) |
//! | number | `NUMBER 'S' n` or `NUMBER 'J' b3 b2 b1 b0` or `NUMBER 'D' b3 b2 b1 b0` |
//! | function | `FUNCTION type .. FUNCTION_END` |
//!
//! `J` stores an integral value and `D` the IEEE-754 bits, big-endian in
//! 16-bit units. Negative integral values never appear: the parser emits a
//! preceding `-` token instead.

mod decompile;
mod numfmt;
pub mod writer;

pub use decompile::{DecompileFlags, DecompileProperties, DecompileProperty, decompile};
pub use numfmt::{escape_string, number_to_string};
pub use writer::{WrittenSource, write_program};

use std::ops::Range;
use std::sync::Arc;

use crate::error::InternalError;
use crate::ir::FunctionType;
use crate::token::Token;

const INITIAL_CAPACITY: usize = 128;

/// Type code of a small non-negative integer.
pub(crate) const NUMBER_SHORT: u16 = b'S' as u16;
/// Type code of a larger integral value.
pub(crate) const NUMBER_LONG: u16 = b'J' as u16;
/// Type code of an arbitrary double.
pub(crate) const NUMBER_DOUBLE: u16 = b'D' as u16;

/// Append-only buffer of encoded source code units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSource {
    units: Vec<u16>,
}

impl Default for EncodedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodedSource {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            units: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// All code units written so far.
    pub fn as_slice(&self) -> &[u16] {
        &self.units
    }

    /// Number of code units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Current allocation size.
    pub fn capacity(&self) -> usize {
        self.units.capacity()
    }

    /// Sub-range, if in bounds.
    pub fn slice(&self, range: Range<usize>) -> Option<&[u16]> {
        self.units.get(range)
    }

    /// Freezes the buffer for sharing between compiled units.
    pub fn into_shared(self) -> Arc<[u16]> {
        Arc::from(self.units)
    }

    fn reserve(&mut self, additional: usize) {
        let needed = self.units.len() + additional;
        if needed > self.units.capacity() {
            let target = (self.units.capacity() * 2).max(needed);
            self.units.reserve_exact(target - self.units.len());
        }
    }

    fn push(&mut self, unit: u16) {
        self.reserve(1);
        self.units.push(unit);
    }

    fn extend(&mut self, units: &[u16]) {
        self.reserve(units.len());
        self.units.extend_from_slice(units);
    }
}

/// Writes tokens into an [`EncodedSource`].
#[derive(Debug, Default)]
pub struct SourceEncoder {
    source: EncodedSource,
}

impl SourceEncoder {
    /// Creates an encoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset the next token will be written at.
    pub fn current_offset(&self) -> usize {
        self.source.len()
    }

    /// Appends a payload-free token.
    pub fn add_token(&mut self, token: Token) {
        self.source.push(token.code());
    }

    /// Appends `token` followed by a line end.
    pub fn add_eol(&mut self, token: Token) {
        self.add_token(token);
        self.add_token(Token::Eol);
    }

    /// Appends an identifier.
    pub fn add_name(&mut self, name: &str) {
        self.add_token(Token::Name);
        self.append_string(name);
    }

    /// Appends a string literal's raw value.
    pub fn add_string(&mut self, value: &str) {
        self.add_token(Token::String);
        self.append_string(value);
    }

    /// Appends a regular expression literal as `/pattern/flags`.
    pub fn add_regexp(&mut self, pattern: &str, flags: &str) {
        self.add_token(Token::RegExp);
        self.append_string(&format!("/{pattern}/{flags}"));
    }

    /// Appends a numeric literal.
    pub fn add_number(&mut self, value: f64) -> Result<(), InternalError> {
        self.add_token(Token::Number);
        // saturating cast: only values that survive it exactly are integral
        let integral = value as i64;
        if integral as f64 != value {
            self.source.push(NUMBER_DOUBLE);
            self.append_u64(value.to_bits());
        } else if integral < 0 {
            return Err(InternalError::NegativeNumber(value));
        } else if integral <= i64::from(u16::MAX) {
            self.source.push(NUMBER_SHORT);
            self.source.push(integral as u16);
        } else {
            self.source.push(NUMBER_LONG);
            self.append_u64(integral as u64);
        }
        Ok(())
    }

    /// Starts a function; returns the offset of its FUNCTION token.
    pub fn mark_function_start(&mut self, function_type: FunctionType) -> usize {
        let start = self.current_offset();
        self.add_token(Token::Function);
        self.source.push(function_type.into());
        start
    }

    /// Ends a function; returns the offset of the FUNCTION_END marker, which
    /// is the exclusive end of the function's range.
    pub fn mark_function_end(&mut self) -> usize {
        let end = self.current_offset();
        self.add_token(Token::FunctionEnd);
        end
    }

    /// Returns the finished buffer.
    pub fn finish(self) -> EncodedSource {
        self.source
    }

    fn append_string(&mut self, value: &str) {
        let units: Vec<u16> = value.encode_utf16().collect();
        let len = units.len();
        if len >= 0x8000 {
            self.source.push(0x8000 | (len >> 16) as u16);
        }
        self.source.push(len as u16);
        self.source.extend(&units);
    }

    fn append_u64(&mut self, bits: u64) {
        self.source.extend(&[
            (bits >> 48) as u16,
            (bits >> 32) as u16,
            (bits >> 16) as u16,
            bits as u16,
        ]);
    }
}
