// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! JavaScript number-to-string conversion and string literal escaping.

/// Formats a number the way `Number.prototype.toString()` does in radix 10.
pub fn number_to_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // shortest round-trip digits, e.g. "1.2345e6"
    let scientific = format!("{:e}", value.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let k = digits.len() as i32;
    let n = exponent + 1;

    let mut out = String::new();
    if value < 0.0 {
        out.push('-');
    }
    if k <= n && n <= 21 {
        out.push_str(&digits);
        out.extend(std::iter::repeat_n('0', (n - k) as usize));
    } else if 0 < n && n <= 21 {
        let (int, frac) = digits.split_at(n as usize);
        out.push_str(int);
        out.push('.');
        out.push_str(frac);
    } else if -6 < n && n <= 0 {
        out.push_str("0.");
        out.extend(std::iter::repeat_n('0', (-n) as usize));
        out.push_str(&digits);
    } else {
        let (first, rest) = digits.split_at(1);
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        out.push('e');
        out.push(if n - 1 >= 0 { '+' } else { '-' });
        out.push_str(&(n - 1).abs().to_string());
    }
    out
}

/// Escapes a string for output between `quote` characters.
///
/// Printable ASCII passes through; control characters use their short
/// escapes where JavaScript has one and `\xHH`/`\uHHHH` otherwise.
pub fn escape_string(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for unit in value.encode_utf16() {
        let c = char::from_u32(u32::from(unit));
        match c {
            Some(c) if (' '..='~').contains(&c) && c != quote && c != '\\' => out.push(c),
            _ => {
                let short = match unit {
                    0x08 => Some('b'),
                    0x0C => Some('f'),
                    0x0A => Some('n'),
                    0x0D => Some('r'),
                    0x09 => Some('t'),
                    0x0B => Some('v'),
                    0x5C => Some('\\'),
                    _ => None,
                };
                match short {
                    Some(escape) => {
                        out.push('\\');
                        out.push(escape);
                    }
                    None if c == Some(quote) => {
                        out.push('\\');
                        out.push(quote);
                    }
                    None if unit < 0x100 => out.push_str(&format!("\\x{:02x}", unit)),
                    None => out.push_str(&format!("\\u{:04x}", unit)),
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(number_to_string(0.0), "0");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(65535.0), "65535");
        assert_eq!(number_to_string(1e21), "1e+21");
        assert_eq!(number_to_string(1e20), "100000000000000000000");
        assert_eq!(number_to_string(-42.0), "-42");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(3.25), "3.25");
        assert_eq!(number_to_string(0.000001), "0.000001");
        assert_eq!(number_to_string(1e-7), "1e-7");
        assert_eq!(number_to_string(1.5e-10), "1.5e-10");
        assert_eq!(number_to_string(0.1 + 0.2), "0.30000000000000004");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b", '"'), "a\\\"b");
        assert_eq!(escape_string("it's", '"'), "it's");
        assert_eq!(escape_string("tab\there\n", '"'), "tab\\there\\n");
        assert_eq!(escape_string("back\\slash", '"'), "back\\\\slash");
        assert_eq!(escape_string("\u{1}", '"'), "\\x01");
        assert_eq!(escape_string("\u{e9}", '"'), "\\xe9");
        assert_eq!(escape_string("\u{263a}", '"'), "\\u263a");
    }
}
