//! Functional reference model.
//!
//! Computes the same window as the cycle-level core without any timing:
//! one [`NeuronState::step`] per mask. The cycle-level controller must agree
//! with it bit for bit on classes, counts and debug counters.

use crate::diagnostics::DebugCounters;
use crate::neuron::{NeuronState, TimestepSpikes};
use crate::params::CoreParams;
use crate::result::{self, WindowResult};
use crate::weights::WeightStore;
use enose_chip::stream;

/// Outcome of a reference window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inference {
    /// Argmax class
    pub class: usize,
    /// Output spikes per class
    pub counts: Vec<u32>,
    /// Hidden spikes across the window
    pub hidden_spikes: u32,
    /// Per-timestep spikes
    pub trace: Vec<TimestepSpikes>,
}

/// Run one window over `masks`, one mask per timestep.
///
/// Bits above `n_in` are ignored, matching the stream buffer.
pub fn infer(params: &CoreParams, weights: &WeightStore, masks: &[u32]) -> Inference {
    let channels = stream::channel_mask(params.n_in);
    let mut state = NeuronState::new(params.n_hidden, params.n_out);
    let trace: Vec<_> = masks
        .iter()
        .map(|&m| state.step(weights, params, m & channels))
        .collect();
    Inference {
        class: result::classify(&state.out_count),
        counts: state.out_count,
        hidden_spikes: state.hidden_spike_total,
        trace,
    }
}

/// Register-level result for a frame of `masks` delivered back to back.
///
/// LATENCY_CYCLES comes from the closed form, which is exact for a frame
/// whose words arrive on consecutive cycles.
pub fn window_result(params: &CoreParams, weights: &WeightStore, masks: &[u32]) -> WindowResult {
    let inference = infer(params, weights, masks);
    let words = masks.len();
    let reg = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
    WindowResult {
        latency_cycles: reg(params.latency_cycles(words, words)),
        debug: DebugCounters {
            words_received: reg(words as u64),
            hidden_spikes: inference.hidden_spikes,
        },
        ..WindowResult::from_counts(&inference.counts, params.confidence)
    }
}

/// Words the core would accept for a window: the first `window_length`
/// masks, or all of them if the frame is shorter.
pub fn frame(masks: &[u32], window_length: usize) -> &[u32] {
    &masks[..masks.len().min(window_length)]
}
