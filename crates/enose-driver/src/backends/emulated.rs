// SPDX-License-Identifier: AGPL-3.0-only

//! Emulated backend: the cycle-level core behind real handshakes.
//!
//! The host side is an AXI-Lite master and a stream DMA. Every clock cycle
//! the DMA offers the head of its queue (TVALID held until TREADY) while
//! the master drives whatever transaction is in flight, so stream delivery
//! overlaps register traffic exactly as it would with a hardware DMA.

use crate::backend::{BackendType, CoreBackend, Geometry};
use crate::error::{DriverError, Result};
use enose_core::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, trace};

/// Cycles a single bus handshake may take before the backend gives up
pub const DEFAULT_HANDSHAKE_LIMIT: u64 = 1024;

/// Cycle-level backend.
#[derive(Debug)]
pub struct EmulatedBackend {
    core: SnnCore,
    dma: VecDeque<Beat>,
    handshake_limit: u64,
}

impl EmulatedBackend {
    /// Instantiate a core over the weights.
    ///
    /// # Errors
    ///
    /// Returns `Core` if the parameters or weight shapes are rejected.
    pub fn new(params: CoreParams, weights: Arc<WeightStore>) -> Result<Self> {
        let core = SnnCore::new(params, weights)?;
        info!("Emulated backend ready");
        Ok(Self {
            core,
            dma: VecDeque::new(),
            handshake_limit: DEFAULT_HANDSHAKE_LIMIT,
        })
    }

    /// Override the per-handshake cycle bound
    #[must_use]
    pub fn with_handshake_limit(mut self, cycles: u64) -> Self {
        self.handshake_limit = cycles;
        self
    }

    /// The emulated core
    pub fn core(&self) -> &SnnCore {
        &self.core
    }

    /// Cycles elapsed
    pub fn cycles(&self) -> u64 {
        self.core.cycle()
    }

    fn cycle(&mut self, signals: BusSignals) -> CycleOutputs {
        let beat = self.dma.front().copied();
        let out = self.core.tick(&signals, beat);
        if out.beat_accepted {
            if let Some(b) = self.dma.pop_front() {
                trace!("DMA beat {:#x}{}", b.data, if b.last { " (TLAST)" } else { "" });
            }
        }
        out
    }

    fn bounded(&self, waited: u64) -> Result<()> {
        if waited >= self.handshake_limit {
            Err(DriverError::Timeout { cycles: waited })
        } else {
            Ok(())
        }
    }
}

impl CoreBackend for EmulatedBackend {
    fn write_reg(&mut self, offset: u32, value: u32) -> Result<()> {
        let (mut aw_pending, mut w_pending) = (true, true);
        let mut waited = 0;
        while aw_pending || w_pending {
            self.bounded(waited)?;
            let out = self.cycle(BusSignals {
                aw: aw_pending.then_some(offset),
                w: w_pending.then_some(value),
                ..BusSignals::IDLE
            });
            aw_pending &= !out.bus.aw_ready;
            w_pending &= !out.bus.w_ready;
            waited += 1;
        }
        loop {
            self.bounded(waited)?;
            let out = self.cycle(BusSignals {
                b_ready: true,
                ..BusSignals::IDLE
            });
            waited += 1;
            if out.bus.b_valid {
                return Ok(());
            }
        }
    }

    fn read_reg(&mut self, offset: u32) -> Result<u32> {
        let mut waited = 0;
        loop {
            self.bounded(waited)?;
            let out = self.cycle(BusSignals {
                ar: Some(offset),
                ..BusSignals::IDLE
            });
            waited += 1;
            if out.bus.ar_ready {
                break;
            }
        }
        loop {
            self.bounded(waited)?;
            let out = self.cycle(BusSignals {
                r_ready: true,
                ..BusSignals::IDLE
            });
            waited += 1;
            if out.bus.r_valid {
                return Ok(out.bus.r_data);
            }
        }
    }

    fn stream_send(&mut self, words: &[u32], last: bool) -> Result<()> {
        let n = words.len();
        self.dma.extend(words.iter().enumerate().map(|(i, &data)| Beat {
            data,
            last: last && i + 1 == n,
        }));
        Ok(())
    }

    fn advance(&mut self, cycles: u64) -> Result<()> {
        for _ in 0..cycles {
            self.cycle(BusSignals::IDLE);
        }
        Ok(())
    }

    fn pending_words(&self) -> usize {
        self.dma.len()
    }

    fn geometry(&self) -> Geometry {
        Geometry::from(self.core.params())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Emulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enose_chip::regs;

    fn backend() -> EmulatedBackend {
        let p = CoreParams::default();
        let w = WeightStore::zeros(p.n_in, p.n_hidden, p.n_out);
        EmulatedBackend::new(p, Arc::new(w)).unwrap()
    }

    #[test]
    fn register_round_trip() {
        let mut b = backend();
        b.write_reg(regs::WINDOW_LENGTH, 17).unwrap();
        assert_eq!(b.read_reg(regs::WINDOW_LENGTH).unwrap(), 17);
        assert_eq!(b.read_reg(regs::N_HIDDEN).unwrap(), 32);
    }

    #[test]
    fn write_costs_two_cycles_read_three() {
        let mut b = backend();
        b.write_reg(regs::WINDOW_LENGTH, 3).unwrap();
        assert_eq!(b.cycles(), 2);
        b.read_reg(regs::STATUS).unwrap();
        assert_eq!(b.cycles(), 5);
    }

    #[test]
    fn words_wait_in_dma_until_recv() {
        let mut b = backend();
        b.stream_send(&[1, 2, 3], true).unwrap();
        b.advance(10).unwrap();
        assert_eq!(b.pending_words(), 3);
        b.write_reg(regs::WINDOW_LENGTH, 3).unwrap();
        b.write_reg(regs::CONTROL, regs::control::START).unwrap();
        b.advance(3).unwrap();
        assert_eq!(b.pending_words(), 0);
    }

    #[test]
    fn zero_limit_times_out() {
        let mut b = backend().with_handshake_limit(0);
        assert!(matches!(b.read_reg(regs::STATUS), Err(DriverError::Timeout { .. })));
    }
}
