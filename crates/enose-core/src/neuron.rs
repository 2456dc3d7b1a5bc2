//! Fixed-point leaky integrate-and-fire dynamics.
//!
//! Per neuron and timestep:
//!
//! ```text
//! acc      = Σ W[i][j]  over active inputs i
//! v_leaked = v - (v >>> LEAK)          arithmetic shift
//! v_new    = v_leaked + acc            16-bit wrapping
//! fire     = v_new >= THRESHOLD  →  v = 0, else v = v_new
//! ```
//!
//! Membrane potentials are `i16` and wrap exactly like the 16-bit datapath;
//! accumulators are `i32`. No floating point anywhere.

use crate::params::{CoreParams, LifParams};
use crate::weights::WeightStore;
use enose_chip::stream;

/// Membrane potential width of the datapath.
pub type Potential = i16;

/// Accumulator width for the weighted input sum.
pub type Accumulator = i32;

/// Leak step: `v - (v >> shift)` with sign-preserving shift.
pub const fn leak(v: Potential, shift: u8) -> Potential {
    v.wrapping_sub(v >> shift)
}

/// One LIF update. Returns the new potential and whether the neuron fired.
#[allow(clippy::cast_possible_truncation)]
pub const fn integrate(v: Potential, acc: Accumulator, lif: LifParams) -> (Potential, bool) {
    // Truncating the accumulator then wrapping equals a 16-bit adder.
    let v_new = leak(v, lif.leak_shift).wrapping_add(acc as Potential);
    if v_new >= lif.threshold {
        (0, true)
    } else {
        (v_new, false)
    }
}

/// Neuron state of one inference, rebuilt on every start and reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeuronState {
    /// Hidden membrane potentials
    pub vh: Vec<Potential>,
    /// Output membrane potentials
    pub vo: Vec<Potential>,
    /// Hidden spikes of the current timestep
    pub h_spikes: Vec<bool>,
    /// Output spikes per class over the window
    pub out_count: Vec<u32>,
    /// Hidden spikes over the window
    pub hidden_spike_total: u32,
}

/// Spikes produced by one full timestep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestepSpikes {
    /// Hidden layer spikes
    pub hidden: Vec<bool>,
    /// Output layer spikes
    pub output: Vec<bool>,
}

impl NeuronState {
    /// Zeroed state for a geometry
    pub fn new(n_hidden: usize, n_out: usize) -> Self {
        Self {
            vh: vec![0; n_hidden],
            vo: vec![0; n_out],
            h_spikes: vec![false; n_hidden],
            out_count: vec![0; n_out],
            hidden_spike_total: 0,
        }
    }

    /// True if every potential, spike and counter is zero
    pub fn is_zero(&self) -> bool {
        self.vh.iter().all(|&v| v == 0)
            && self.vo.iter().all(|&v| v == 0)
            && self.h_spikes.iter().all(|&s| !s)
            && self.out_count.iter().all(|&c| c == 0)
            && self.hidden_spike_total == 0
    }

    /// Weighted input of hidden neuron `j` for an input mask
    pub fn hidden_input(weights: &WeightStore, n_in: usize, mask: u32, j: usize) -> Accumulator {
        (0..n_in)
            .filter(|&i| stream::is_active(mask, i))
            .map(|i| Accumulator::from(weights.w1(i, j)))
            .sum()
    }

    /// Weighted input of output neuron `o` for the current hidden spikes
    pub fn output_input(&self, weights: &WeightStore, o: usize) -> Accumulator {
        self.h_spikes
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s)
            .map(|(h, _)| Accumulator::from(weights.w2(h, o)))
            .sum()
    }

    /// Fire-or-leak hidden neuron `j` with a precomputed input
    pub fn update_hidden(&mut self, j: usize, acc: Accumulator, lif: LifParams) -> bool {
        let (v, fired) = integrate(self.vh[j], acc, lif);
        self.vh[j] = v;
        self.h_spikes[j] = fired;
        if fired {
            self.hidden_spike_total = self.hidden_spike_total.saturating_add(1);
        }
        fired
    }

    /// Fire-or-leak output neuron `o` with a precomputed input
    pub fn update_output(&mut self, o: usize, acc: Accumulator, lif: LifParams) -> bool {
        let (v, fired) = integrate(self.vo[o], acc, lif);
        self.vo[o] = v;
        if fired {
            self.out_count[o] = self.out_count[o].saturating_add(1);
        }
        fired
    }

    /// Clear the transient hidden spike vector
    pub fn clear_hidden_spikes(&mut self) {
        self.h_spikes.fill(false);
    }

    /// Run one whole timestep: hidden layer settles, then the output layer
    /// consumes the same timestep's hidden spikes.
    pub fn step(&mut self, weights: &WeightStore, params: &CoreParams, mask: u32) -> TimestepSpikes {
        for j in 0..params.n_hidden {
            let acc = Self::hidden_input(weights, params.n_in, mask, j);
            self.update_hidden(j, acc, params.hidden);
        }
        let hidden = self.h_spikes.clone();
        let output = (0..params.n_out)
            .map(|o| {
                let acc = self.output_input(weights, o);
                self.update_output(o, acc, params.output)
            })
            .collect();
        self.clear_hidden_spikes();
        TimestepSpikes { hidden, output }
    }
}
