//! Golden test vectors.
//!
//! ```text
//! # comment
//! TEST 0 LABEL 1 EXPECTED_CLASS 1 COUNTS 0 4 1
//! MASK 0A3
//! MASK 000
//! END
//! ```

use crate::error::{ModelError, Result};
use crate::memfile;
use enose_chip::stream;
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

/// One golden case: an input window and the expected classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestVector {
    /// Case number (or name index)
    pub id: u32,
    /// Ground-truth label of the recording, if known
    pub label: Option<u32>,
    /// Class the reference model predicts
    pub expected_class: u32,
    /// Output spike counts the reference model produces
    pub expected_counts: [u32; 3],
    /// One mask per timestep
    pub masks: Vec<u32>,
}

fn field<'a>(tokens: &mut impl Iterator<Item = &'a str>, key: &str, line: usize) -> Result<&'a str> {
    match tokens.next() {
        Some(k) if k.eq_ignore_ascii_case(key) => tokens
            .next()
            .ok_or_else(|| ModelError::parse_at(line, format!("{key} without a value"))),
        Some(other) => Err(ModelError::parse_at(line, format!("expected {key}, found {other:?}"))),
        None => Err(ModelError::parse_at(line, format!("missing {key}"))),
    }
}

fn number(tok: &str, line: usize) -> Result<u32> {
    tok.parse()
        .map_err(|_| ModelError::parse_at(line, format!("bad number {tok:?}")))
}

fn parse_header(rest: &str, line: usize) -> Result<TestVector> {
    let mut tokens = rest.split_whitespace();
    let id = number(tokens.next().ok_or_else(|| ModelError::parse_at(line, "TEST without id"))?, line)?;
    let label = field(&mut tokens, "LABEL", line)?;
    // Synthetic cases carry a negative or missing label
    let label = label.parse::<u32>().ok();
    let expected_class = number(field(&mut tokens, "EXPECTED_CLASS", line)?, line)?;
    match tokens.next() {
        Some(k) if k.eq_ignore_ascii_case("COUNTS") => {}
        _ => return Err(ModelError::parse_at(line, "missing COUNTS")),
    }
    let mut expected_counts = [0u32; 3];
    let mut n = 0;
    for tok in tokens {
        if n == 3 {
            return Err(ModelError::parse_at(line, "more than three counts"));
        }
        expected_counts[n] = number(tok, line)?;
        n += 1;
    }
    if n == 0 {
        return Err(ModelError::parse_at(line, "COUNTS without values"));
    }
    Ok(TestVector {
        id,
        label,
        expected_class,
        expected_counts,
        masks: Vec::new(),
    })
}

/// Parse a `test_vectors.txt` document.
///
/// # Errors
///
/// `Parse` with the offending line number for malformed headers, masks
/// outside a `TEST` block, or a block without `END`.
pub fn parse_test_vectors(text: &str) -> Result<Vec<TestVector>> {
    let mut out = Vec::new();
    let mut current: Option<(usize, TestVector)> = None;

    for (n, raw) in text.lines().enumerate() {
        let line = n + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let (keyword, rest) = trimmed.split_once(char::is_whitespace).unwrap_or((trimmed, ""));
        match keyword.to_ascii_uppercase().as_str() {
            "TEST" => {
                if let Some((start, _)) = current {
                    return Err(ModelError::parse_at(line, format!("TEST opened on line {start} has no END")));
                }
                current = Some((line, parse_header(rest, line)?));
            }
            "MASK" => {
                let Some((_, tv)) = current.as_mut() else {
                    return Err(ModelError::parse_at(line, "MASK outside a TEST block"));
                };
                let hex = rest.trim();
                let hex = hex.strip_prefix("0x").unwrap_or(hex);
                let mask = u32::from_str_radix(hex, 16)
                    .map_err(|_| ModelError::parse_at(line, format!("bad mask {:?}", rest.trim())))?;
                tv.masks.push(mask);
            }
            "END" => {
                let Some((_, tv)) = current.take() else {
                    return Err(ModelError::parse_at(line, "END without TEST"));
                };
                out.push(tv);
            }
            other => return Err(ModelError::parse_at(line, format!("unknown keyword {other:?}"))),
        }
    }
    if let Some((start, _)) = current {
        return Err(ModelError::parse_at(start, "TEST block has no END"));
    }
    Ok(out)
}

/// Read and parse a vector file.
///
/// # Errors
///
/// `FileNotFound`, `Io` or `Parse`.
pub fn load_test_vectors(path: impl AsRef<Path>) -> Result<Vec<TestVector>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ModelError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let vectors = parse_test_vectors(&std::fs::read_to_string(path)?)?;
    debug!("{} test vectors from {}", vectors.len(), path.display());
    Ok(vectors)
}

/// Read a spike mask file (`spikes.mem`: one 32-bit hex word per line).
///
/// # Errors
///
/// `FileNotFound`, `Io` or `Parse`.
pub fn load_masks(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ModelError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    memfile::parse_mem_words(&std::fs::read_to_string(path)?)
        .map_err(|e| ModelError::parse_error(format!("{}: {e}", path.display())))
}

/// Render vectors in the `test_vectors.txt` format, masks as 3-digit hex
/// (wider when a mask needs it). `label: None` is written as `-1`.
pub fn format_test_vectors(vectors: &[TestVector], comments: &[&str]) -> String {
    let mut out = String::new();
    for c in comments {
        let _ = writeln!(out, "# {c}");
    }
    for v in vectors {
        let label = v.label.map_or_else(|| "-1".to_string(), |l| l.to_string());
        let [c0, c1, c2] = v.expected_counts;
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "TEST {} LABEL {label} EXPECTED_CLASS {} COUNTS {c0} {c1} {c2}",
            v.id, v.expected_class
        );
        for m in &v.masks {
            let _ = writeln!(out, "MASK {m:03X}");
        }
        let _ = writeln!(out, "END");
    }
    out
}

/// Named stimulus patterns for smoke testing a core of `n_in` channels.
///
/// Zeros, all channels, channel 0 only, alternating halves, a ramp, a
/// single burst followed by silence, and two pseudo-random patterns.
pub fn standard_patterns(n_in: usize, window_len: usize) -> Vec<(&'static str, Vec<u32>)> {
    let all = stream::channel_mask(n_in);
    let even = 0x5555_5555 & all;
    let odd = 0xAAAA_AAAA & all;
    let ramp = (0..window_len).map(|t| stream::channel_mask((t + 1).min(n_in))).collect();
    let burst = (0..window_len).map(|t| if t == 0 { all } else { 0 }).collect();
    let alternating = (0..window_len).map(|t| if t % 2 == 0 { even } else { odd }).collect();

    vec![
        ("zeros", vec![0; window_len]),
        ("all_ones", vec![all; window_len]),
        ("ch0_only", vec![1 & all; window_len]),
        ("alternating", alternating),
        ("ramp", ramp),
        ("burst_then_silence", burst),
        ("random_seed42", pseudo_random(42, n_in, window_len)),
        ("random_seed123", pseudo_random(123, n_in, window_len)),
    ]
}

fn pseudo_random(seed: u32, n_in: usize, len: usize) -> Vec<u32> {
    let mut s = seed;
    (0..len)
        .map(|_| {
            // xorshift32
            s ^= s << 13;
            s ^= s >> 17;
            s ^= s << 5;
            s & stream::channel_mask(n_in)
        })
        .collect()
}
