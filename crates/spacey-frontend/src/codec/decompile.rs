// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Encoded source back to formatted text.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::error::{Error, InternalError, Result};
use crate::ir::FunctionType;
use crate::token::Token;

use super::numfmt::{escape_string, number_to_string};
use super::{NUMBER_DOUBLE, NUMBER_LONG, NUMBER_SHORT};

bitflags! {
    /// Output mode of [`decompile`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DecompileFlags: u32 {
        /// Print only the body of the outermost function
        const ONLY_BODY = 1 << 0;
        /// Single-line text that evaluates back to the same value
        const TO_SOURCE = 1 << 1;
        /// Indented text (the default when neither mode bit is set)
        const TO_STRING = 1 << 2;
    }
}

/// Layout settings recognized by [`decompile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecompileProperty {
    /// Indentation of the first line (default 0)
    InitialIndent,
    /// Spaces per nesting level (default 4)
    IndentGap,
    /// Indentation of `case`/`default` labels relative to the switch body (default 2)
    CaseGap,
}

impl DecompileProperty {
    /// Value used when the property is not set.
    pub fn default_value(self) -> i32 {
        match self {
            DecompileProperty::InitialIndent => 0,
            DecompileProperty::IndentGap => 4,
            DecompileProperty::CaseGap => 2,
        }
    }
}

/// Property mapping passed to [`decompile`]; absent keys take their defaults.
#[derive(Debug, Clone, Default)]
pub struct DecompileProperties {
    values: FxHashMap<DecompileProperty, i32>,
}

impl DecompileProperties {
    /// Creates a mapping with every property at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a property, builder style.
    pub fn with(mut self, property: DecompileProperty, value: i32) -> Self {
        self.set(property, value);
        self
    }

    /// Sets a property.
    pub fn set(&mut self, property: DecompileProperty, value: i32) {
        self.values.insert(property, value);
    }

    /// Value of a property.
    pub fn get(&self, property: DecompileProperty) -> i32 {
        self.values
            .get(&property)
            .copied()
            .unwrap_or_else(|| property.default_value())
    }

    fn checked(&self, property: DecompileProperty) -> Result<i64> {
        let value = self.get(property);
        if value < 0 {
            return Err(Error::InvalidDecompileProperty { property, value });
        }
        Ok(i64::from(value))
    }
}

fn is(code: u16, token: Token) -> bool {
    code == token.code()
}

fn read_string(source: &[u16], offset: usize) -> std::result::Result<(String, usize), InternalError> {
    let mut offset = offset;
    let mut len = usize::from(*source.get(offset).ok_or(InternalError::TruncatedSource(offset))?);
    offset += 1;
    if len & 0x8000 != 0 {
        let low = *source.get(offset).ok_or(InternalError::TruncatedSource(offset))?;
        len = ((len & 0x7FFF) << 16) | usize::from(low);
        offset += 1;
    }
    let text = source
        .get(offset..offset + len)
        .ok_or(InternalError::TruncatedSource(source.len()))?;
    Ok((String::from_utf16_lossy(text), offset + len))
}

fn read_number(source: &[u16], offset: usize) -> std::result::Result<(f64, usize), InternalError> {
    let code = *source.get(offset).ok_or(InternalError::TruncatedSource(offset))?;
    let payload = offset + 1;
    match code {
        NUMBER_SHORT => {
            let value = *source.get(payload).ok_or(InternalError::TruncatedSource(payload))?;
            Ok((f64::from(value), payload + 1))
        }
        NUMBER_LONG | NUMBER_DOUBLE => {
            let units = source
                .get(payload..payload + 4)
                .ok_or(InternalError::TruncatedSource(source.len()))?;
            let bits = units.iter().fold(0u64, |acc, &u| (acc << 16) | u64::from(u));
            let value = if code == NUMBER_LONG {
                bits as i64 as f64
            } else {
                f64::from_bits(bits)
            };
            Ok((value, payload + 4))
        }
        _ => Err(InternalError::BadNumberCode { code, offset }),
    }
}

fn pad(out: &mut String, count: i64) {
    if count > 0 {
        out.extend(std::iter::repeat_n(' ', count as usize));
    }
}

/// Fixed spelling of a token, with its surrounding spaces.
fn spelling(token: Token) -> Option<&'static str> {
    Some(match token {
        Token::True => "true",
        Token::False => "false",
        Token::Null => "null",
        Token::This => "this",
        Token::Comma => ", ",
        Token::Lp => "(",
        Token::Lb => "[",
        Token::Rb => "]",
        Token::Dot => ".",
        Token::New => "new ",
        Token::DelProp => "delete ",
        Token::Else => "else ",
        Token::For => "for ",
        Token::In => " in ",
        Token::With => "with ",
        Token::While => "while ",
        Token::Do => "do ",
        Token::Try => "try ",
        Token::Catch => "catch ",
        Token::Finally => "finally ",
        Token::Throw => "throw ",
        Token::Switch => "switch ",
        Token::Case => "case ",
        Token::Default => "default",
        Token::Var => "var ",
        Token::Debugger => "debugger",
        Token::Assign => " = ",
        Token::AssignAdd => " += ",
        Token::AssignSub => " -= ",
        Token::AssignMul => " *= ",
        Token::AssignDiv => " /= ",
        Token::AssignMod => " %= ",
        Token::AssignBitOr => " |= ",
        Token::AssignBitXor => " ^= ",
        Token::AssignBitAnd => " &= ",
        Token::AssignLsh => " <<= ",
        Token::AssignRsh => " >>= ",
        Token::AssignUrsh => " >>>= ",
        Token::Hook => " ? ",
        // colon of an object literal property
        Token::ObjectLit => ":",
        Token::Or => " || ",
        Token::And => " && ",
        Token::BitOr => " | ",
        Token::BitXor => " ^ ",
        Token::BitAnd => " & ",
        Token::ShEq => " === ",
        Token::ShNe => " !== ",
        Token::Eq => " == ",
        Token::Ne => " != ",
        Token::Le => " <= ",
        Token::Lt => " < ",
        Token::Ge => " >= ",
        Token::Gt => " > ",
        Token::InstanceOf => " instanceof ",
        Token::Lsh => " << ",
        Token::Rsh => " >> ",
        Token::Ursh => " >>> ",
        Token::TypeOf => "typeof ",
        Token::Void => "void ",
        Token::Not => "!",
        Token::BitNot => "~",
        Token::Pos => "+",
        Token::Neg => "-",
        Token::Inc => "++",
        Token::Dec => "--",
        Token::Add => " + ",
        Token::Sub => " - ",
        Token::Mul => " * ",
        Token::Div => " / ",
        Token::Mod => " % ",
        _ => return None,
    })
}

/// Regenerates source text from an encoded token stream.
///
/// `source` is either a whole script (starting with SCRIPT) or one
/// function's range (starting with FUNCTION). Any code unit that is not a
/// source token is an [`InternalError::UnknownToken`].
pub fn decompile(
    source: &[u16],
    flags: DecompileFlags,
    properties: &DecompileProperties,
) -> Result<String> {
    if flags.contains(DecompileFlags::TO_SOURCE | DecompileFlags::TO_STRING) {
        return Err(Error::ConflictingDecompileFlags(flags));
    }
    let mut indent = properties.checked(DecompileProperty::InitialIndent)?;
    let indent_gap = properties.checked(DecompileProperty::IndentGap)?;
    let case_gap = properties.checked(DecompileProperty::CaseGap)?;

    let length = source.len();
    if length == 0 {
        return Ok(String::new());
    }
    let only_body = flags.contains(DecompileFlags::ONLY_BODY);
    let to_source = flags.contains(DecompileFlags::TO_SOURCE);

    let mut i = 0;
    let top_function_type = if is(source[0], Token::Script) {
        i = 1;
        None
    } else if is(source[0], Token::Function) {
        source.get(1).copied()
    } else {
        None
    };
    let wrap_in_parens =
        to_source && top_function_type == Some(u16::from(FunctionType::Expression));

    let mut out = String::new();
    if !to_source {
        out.push('\n');
        pad(&mut out, indent);
    } else if wrap_in_parens {
        out.push('(');
    }

    let mut brace_nesting = 0i32;
    let mut after_first_eol = false;
    let mut prev: Option<Token> = None;
    while i < length {
        let code = source[i];
        let token = Token::try_from(code)
            .map_err(|_| InternalError::UnknownToken { value: code, offset: i })?;
        let next = source.get(i + 1).copied().unwrap_or(Token::Eof.code());

        match token {
            Token::Name | Token::RegExp => {
                let (text, end) = read_string(source, i + 1)?;
                out.push_str(&text);
                i = end;
                prev = Some(token);
                continue;
            }
            Token::String => {
                let (text, end) = read_string(source, i + 1)?;
                out.push('"');
                out.push_str(&escape_string(&text, '"'));
                out.push('"');
                i = end;
                prev = Some(token);
                continue;
            }
            Token::Number => {
                let (value, end) = read_number(source, i + 1)?;
                out.push_str(&number_to_string(value));
                i = end;
                prev = Some(token);
                continue;
            }
            Token::Function => {
                // skip the function type
                i += 1;
                out.push_str("function ");
            }
            Token::FunctionEnd => {}
            Token::Lc => {
                brace_nesting += 1;
                if is(next, Token::Eol) {
                    indent += indent_gap;
                }
                out.push('{');
            }
            Token::Rc => {
                brace_nesting -= 1;
                // the outermost function's closing brace is not part of its body
                if !(only_body && brace_nesting == 0) {
                    out.push('}');
                    if is(next, Token::Eol) || is(next, Token::FunctionEnd) {
                        indent -= indent_gap;
                    } else if is(next, Token::While) || is(next, Token::Else) {
                        indent -= indent_gap;
                        out.push(' ');
                    }
                }
            }
            Token::Rp => {
                out.push(')');
                if is(next, Token::Lc) {
                    out.push(' ');
                }
            }
            Token::Eol => {
                if !to_source {
                    let mut new_line = true;
                    if !after_first_eol {
                        after_first_eol = true;
                        if only_body {
                            // drop the header up to the opening brace
                            out.clear();
                            indent -= indent_gap;
                            new_line = false;
                        }
                    }
                    if new_line {
                        out.push('\n');
                    }
                    if i + 1 < length {
                        let less = if is(next, Token::Case) || is(next, Token::Default) {
                            indent_gap - case_gap
                        } else if is(next, Token::Rc) {
                            indent_gap
                        } else if is(next, Token::Name) {
                            let (_, after_name) = read_string(source, i + 2)?;
                            match source.get(after_name) {
                                Some(&c) if is(c, Token::Colon) => indent_gap,
                                _ => 0,
                            }
                        } else {
                            0
                        };
                        pad(&mut out, indent - less);
                    }
                }
            }
            Token::If => {
                if prev == Some(Token::Name) {
                    // catch guard: `catch (e if cond)`
                    out.push(' ');
                }
                out.push_str("if ");
            }
            Token::Break | Token::Continue => {
                out.push_str(if token == Token::Break { "break" } else { "continue" });
                if is(next, Token::Name) {
                    out.push(' ');
                }
            }
            Token::Return => {
                out.push_str("return");
                if !is(next, Token::Semi) {
                    out.push(' ');
                }
            }
            Token::Semi => {
                out.push(';');
                if !is(next, Token::Eol) {
                    // separators in for (;;)
                    out.push(' ');
                }
            }
            Token::Colon => {
                if is(next, Token::Eol) {
                    // end of a label or case
                    out.push(':');
                } else {
                    out.push_str(" : ");
                }
            }
            other => match spelling(other) {
                Some(text) => out.push_str(text),
                None => {
                    return Err(InternalError::UnknownToken { value: code, offset: i }.into());
                }
            },
        }
        prev = Some(token);
        i += 1;
    }

    if !to_source {
        if !only_body {
            out.push('\n');
        }
    } else if wrap_in_parens {
        out.push(')');
    }
    Ok(out)
}
