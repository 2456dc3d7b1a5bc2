//! Text memory images: `$readmemh` `.mem` files and Vivado `.coe` files.
//!
//! `.mem` holds one hex value per token; `//` starts a comment. Weight
//! images store one two's-complement byte per line, spike files one 32-bit
//! word per line.
//!
//! `.coe` is `key=value;` statements with `;`-prefixed comment lines:
//!
//! ```text
//! memory_initialization_radix=16;
//! memory_initialization_vector=
//! 1A,
//! F3;
//! ```

#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use crate::error::{ModelError, Result};
use std::fmt::Write as _;

/// Tokens of a `.mem` text with their 1-based line numbers.
fn mem_tokens(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().flat_map(|(n, line)| {
        let code = line.split("//").next().unwrap_or("");
        code.split_whitespace().map(move |tok| (n + 1, tok))
    })
}

fn strip_hex_prefix(tok: &str) -> &str {
    tok.strip_prefix("0x")
        .or_else(|| tok.strip_prefix("0X"))
        .unwrap_or(tok)
}

/// Parse a byte image: each token is a two's-complement byte in hex.
///
/// # Errors
///
/// `Parse` on a token that is not a hex byte or on `@address` directives.
pub fn parse_mem_bytes(text: &str) -> Result<Vec<i8>> {
    mem_tokens(text)
        .map(|(line, tok)| {
            if tok.starts_with('@') {
                return Err(ModelError::parse_at(line, "address directives are not supported"));
            }
            u8::from_str_radix(strip_hex_prefix(tok), 16)
                .map(|b| b as i8)
                .map_err(|e| ModelError::parse_at(line, format!("bad byte {tok:?}: {e}")))
        })
        .collect()
}

/// Parse a word image: each token is a 32-bit hex word.
///
/// # Errors
///
/// `Parse` on a token that is not a hex word.
pub fn parse_mem_words(text: &str) -> Result<Vec<u32>> {
    mem_tokens(text)
        .map(|(line, tok)| {
            u32::from_str_radix(strip_hex_prefix(tok), 16)
                .map_err(|e| ModelError::parse_at(line, format!("bad word {tok:?}: {e}")))
        })
        .collect()
}

/// Parse a `.coe` byte image. Radix 16, 10 and 2 are accepted; radix 10
/// values may be signed.
///
/// # Errors
///
/// `Parse` when the radix or vector statement is missing or a value does
/// not fit a byte.
pub fn parse_coe(text: &str) -> Result<Vec<i8>> {
    let body: String = text
        .lines()
        .filter(|l| !l.trim_start().starts_with(';'))
        .collect::<Vec<_>>()
        .join("\n");

    let mut radix = None;
    let mut vector = None;
    for stmt in body.split(';') {
        let Some((key, value)) = stmt.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "memory_initialization_radix" => {
                let r: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| ModelError::parse_error(format!("bad radix {:?}", value.trim())))?;
                if !matches!(r, 2 | 10 | 16) {
                    return Err(ModelError::parse_error(format!("unsupported radix {r}")));
                }
                radix = Some(r);
            }
            "memory_initialization_vector" => vector = Some(value),
            _ => {}
        }
    }

    let radix = radix.ok_or_else(|| ModelError::parse_error("missing memory_initialization_radix"))?;
    let vector = vector.ok_or_else(|| ModelError::parse_error("missing memory_initialization_vector"))?;

    vector
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .enumerate()
        .map(|(i, tok)| {
            let value = i16::from_str_radix(tok, radix)
                .map_err(|e| ModelError::parse_error(format!("entry {i}: bad value {tok:?}: {e}")))?;
            match value {
                -128..=127 => Ok(value as i8),
                128..=255 => Ok(value as u8 as i8),
                _ => Err(ModelError::parse_error(format!("entry {i}: {value} does not fit a byte"))),
            }
        })
        .collect()
}

/// Render a byte image in `.mem` form, optionally under a `//` header.
pub fn format_mem_bytes(values: &[i8], header: Option<&str>) -> String {
    let mut out = String::with_capacity(values.len() * 3 + 64);
    if let Some(h) = header {
        let _ = writeln!(out, "// {h}");
    }
    for &v in values {
        let _ = writeln!(out, "{:02X}", v as u8);
    }
    out
}

/// Render a word image in `.mem` form, optionally under a `//` header.
pub fn format_mem_words(values: &[u32], header: Option<&str>) -> String {
    let mut out = String::with_capacity(values.len() * 9 + 64);
    if let Some(h) = header {
        let _ = writeln!(out, "// {h}");
    }
    for &v in values {
        let _ = writeln!(out, "{v:08X}");
    }
    out
}
