//! Window classification and the latched result block.

use crate::diagnostics::DebugCounters;
use crate::params::ConfidenceMode;

/// Index of the largest count; the lowest index wins ties.
///
/// Returns 0 for an empty slice.
pub fn classify(counts: &[u32]) -> usize {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate().skip(1) {
        if c > counts[best] {
            best = i;
        }
    }
    best
}

/// `max / sum` in Q1.15, saturated at `0x7FFF`; zero when nothing fired.
pub fn confidence_q15(counts: &[u32]) -> u32 {
    let sum: u64 = counts.iter().map(|&c| u64::from(c)).sum();
    if sum == 0 {
        return 0;
    }
    let max = counts.iter().copied().max().map_or(0, u64::from);
    u32::try_from(((max << 15) / sum).min(0x7FFF)).unwrap_or(0x7FFF)
}

/// CONFIDENCE register value under a mode
pub fn confidence(mode: ConfidenceMode, counts: &[u32]) -> u32 {
    match mode {
        ConfidenceMode::Zero => 0,
        ConfidenceMode::Q15 => confidence_q15(counts),
    }
}

/// Result block latched at DONE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowResult {
    /// RESULT_CLASS
    pub class: u32,
    /// COUNT0..2 (unused classes read 0)
    pub counts: [u32; 3],
    /// CONFIDENCE
    pub confidence: u32,
    /// LATENCY_CYCLES
    pub latency_cycles: u32,
    /// DEBUG0 / DEBUG1
    pub debug: DebugCounters,
}

impl WindowResult {
    /// Assemble a result from per-class counts.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_counts(out_count: &[u32], mode: ConfidenceMode) -> Self {
        let mut counts = [0u32; 3];
        for (slot, &c) in counts.iter_mut().zip(out_count) {
            *slot = c;
        }
        Self {
            // At most three classes
            class: classify(out_count) as u32,
            counts,
            confidence: confidence(mode, out_count),
            ..Self::default()
        }
    }
}
