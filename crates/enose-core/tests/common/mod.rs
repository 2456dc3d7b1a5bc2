//! Minimal AXI host used by the integration tests.

#![allow(dead_code)]

use enose_chip::regs::{self, control, status};
use enose_core::prelude::*;
use std::sync::Arc;

/// Cycles before a handshake is considered hung
pub const LIMIT: usize = 1_000_000;

/// Deterministic pseudo-random i8 stream
pub fn lcg(seed: u32) -> impl FnMut() -> i8 {
    let mut s = seed;
    move || {
        s = s.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (s >> 24) as u8 as i8
    }
}

/// Weights drawn from [`lcg`], biased positive so the network is not silent
pub fn random_weights(params: &CoreParams, seed: u32) -> WeightStore {
    let mut next = lcg(seed);
    let w1: Vec<i8> = (0..params.n_in * params.n_hidden).map(|_| next() / 2 + 20).collect();
    let w2: Vec<i8> = (0..params.n_hidden * params.n_out).map(|_| next() / 2 + 8).collect();
    WeightStore::new(params.n_in, params.n_hidden, params.n_out, w1, w2).expect("shape")
}

/// Masks drawn from a seed, limited to `n_in` channels
pub fn random_masks(n: usize, n_in: usize, seed: u32) -> Vec<u32> {
    let mut next = lcg(seed);
    (0..n)
        .map(|_| {
            let hi = u32::from(next() as u8);
            let lo = u32::from(next() as u8);
            ((hi << 8) | lo) & enose_chip::stream::channel_mask(n_in)
        })
        .collect()
}

pub struct Host {
    pub core: SnnCore,
}

impl Host {
    pub fn new(params: CoreParams, weights: WeightStore) -> Self {
        Self {
            core: SnnCore::new(params, Arc::new(weights)).expect("core"),
        }
    }

    pub fn tick(&mut self, signals: BusSignals, beat: Option<Beat>) -> CycleOutputs {
        self.core.tick(&signals, beat)
    }

    /// Full write transaction: address and data together, then BREADY.
    pub fn write(&mut self, offset: u32, value: u32) {
        let request = BusSignals {
            aw: Some(offset),
            w: Some(value),
            ..BusSignals::IDLE
        };
        for _ in 0..LIMIT {
            let out = self.tick(request, None);
            if out.bus.aw_ready && out.bus.w_ready {
                break;
            }
        }
        let retire = BusSignals {
            b_ready: true,
            ..BusSignals::IDLE
        };
        for _ in 0..LIMIT {
            if self.tick(retire, None).bus.b_valid {
                return;
            }
        }
        panic!("write response never arrived");
    }

    /// Full read transaction.
    pub fn read(&mut self, offset: u32) -> u32 {
        let request = BusSignals {
            ar: Some(offset),
            ..BusSignals::IDLE
        };
        for _ in 0..LIMIT {
            if self.tick(request, None).bus.ar_ready {
                break;
            }
        }
        let accept = BusSignals {
            r_ready: true,
            ..BusSignals::IDLE
        };
        for _ in 0..LIMIT {
            let out = self.tick(accept, None);
            if out.bus.r_valid {
                return out.bus.r_data;
            }
        }
        panic!("read data never arrived");
    }

    /// Stream words back to back, TLAST on the final one if `last`.
    pub fn stream(&mut self, words: &[u32], last: bool) {
        for (i, &w) in words.iter().enumerate() {
            let beat = Beat {
                data: w,
                last: last && i + 1 == words.len(),
            };
            let mut sent = false;
            for _ in 0..LIMIT {
                if self.tick(BusSignals::IDLE, Some(beat)).beat_accepted {
                    sent = true;
                    break;
                }
            }
            assert!(sent, "beat {i} never accepted");
        }
    }

    /// Poll STATUS until done; returns the final STATUS value.
    pub fn wait_done(&mut self) -> u32 {
        for _ in 0..LIMIT {
            let s = self.read(regs::STATUS);
            if s & status::DONE != 0 {
                return s;
            }
        }
        panic!("core never finished");
    }

    pub fn start(&mut self) {
        self.write(regs::CONTROL, control::START);
    }

    pub fn reset(&mut self) {
        self.write(regs::CONTROL, control::RESET);
    }

    /// Configure, start, stream and wait for one full window.
    pub fn run_window(&mut self, masks: &[u32]) -> Snapshot {
        self.write(regs::WINDOW_LENGTH, masks.len() as u32);
        self.start();
        self.stream(masks, false);
        self.wait_done();
        self.snapshot()
    }

    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot {
            status: self.read(regs::STATUS),
            class: self.read(regs::RESULT_CLASS),
            counts: [
                self.read(regs::COUNT0),
                self.read(regs::COUNT1),
                self.read(regs::COUNT2),
            ],
            confidence: self.read(regs::CONFIDENCE),
            latency: self.read(regs::LATENCY_CYCLES),
            debug0: self.read(regs::DEBUG0),
            debug1: self.read(regs::DEBUG1),
        }
    }
}

/// Result registers as read over the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub status: u32,
    pub class: u32,
    pub counts: [u32; 3],
    pub confidence: u32,
    pub latency: u32,
    pub debug0: u32,
    pub debug1: u32,
}

impl Snapshot {
    /// Every result register equal, LATENCY_CYCLES included
    pub fn matches(&self, r: &WindowResult) -> bool {
        self.same_outcome(r) && self.latency == r.latency_cycles
    }

    /// Result registers equal, ignoring LATENCY_CYCLES (host stalls mid-frame)
    pub fn same_outcome(&self, r: &WindowResult) -> bool {
        self.class == r.class
            && self.counts == r.counts
            && self.confidence == r.confidence
            && self.debug0 == r.debug.words_received
            && self.debug1 == r.debug.hidden_spikes
    }
}
