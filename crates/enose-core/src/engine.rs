// SPDX-License-Identifier: AGPL-3.0-only

//! The accelerator core: bus slave, register file, window controller and
//! weight store advanced together, one call to [`SnnCore::tick`] per clock.
//!
//! Within a cycle the order is fixed:
//!
//! 1. outputs (bus ready/valid, TREADY) are decoded from the state at the
//!    clock edge
//! 2. the bus channels step; a completed write takes effect immediately
//! 3. the controller steps with any START pulse and the offered beat
//!
//! A RESET write therefore lands before the controller sees the cycle, and
//! a beat offered on the same cycle as a RESET is not accepted.

use crate::bus::{BusInterface, BusOutputs, BusSignals, RegisterWrite};
use crate::controller::{Event, Phase, WindowController};
use crate::error::Result;
use crate::params::CoreParams;
use crate::registers::RegisterFile;
use crate::result::WindowResult;
use crate::weights::WeightStore;
use enose_chip::regs::{self, control};
use enose_chip::stream::Beat;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Slave outputs seen by the host for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleOutputs {
    /// AXI-Lite ready/valid/data
    pub bus: BusOutputs,
    /// TREADY
    pub stream_ready: bool,
    /// The offered beat completed its handshake
    pub beat_accepted: bool,
}

/// Cycle-level model of one accelerator instance.
#[derive(Debug, Clone)]
pub struct SnnCore {
    params: CoreParams,
    weights: Arc<WeightStore>,
    bus: BusInterface,
    registers: RegisterFile,
    controller: WindowController,
    cycle: u64,
}

impl SnnCore {
    /// Instantiate a core. Weights are fixed for its lifetime.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the parameters do not validate, `WeightShape` if
    /// the weight store geometry differs from the parameters.
    pub fn new(params: CoreParams, weights: Arc<WeightStore>) -> Result<Self> {
        params.validate()?;
        weights.check_geometry(&params)?;

        info!(
            "SNN core {}→{}→{}, W_LEN_MAX {}, {} weight access",
            params.n_in, params.n_hidden, params.n_out, params.w_len_max, params.access_mode
        );
        Ok(Self {
            bus: BusInterface::new(),
            registers: RegisterFile::new(&params),
            controller: WindowController::new(&params),
            params,
            weights,
            cycle: 0,
        })
    }

    /// Advance one clock cycle.
    pub fn tick(&mut self, signals: &BusSignals, beat: Option<Beat>) -> CycleOutputs {
        let stream_ready = self.controller.stream_ready();
        let bus = self.bus.outputs();
        let lookup = self.bus.pending_lookup().map(|offset| self.register_value(offset));

        let mut start = None;
        let mut reset = false;
        if let Some(write) = self.bus.step(signals, lookup) {
            let effect = self.apply_write(write);
            start = effect.start;
            reset = effect.reset;
        }

        let offered = if stream_ready && !reset { beat } else { None };
        let report = self.controller.tick(&self.weights, start, offered);
        if let Some(event) = report.event {
            self.handle_event(event);
        }

        self.cycle += 1;
        CycleOutputs {
            bus,
            stream_ready,
            beat_accepted: report.accepted,
        }
    }

    /// Advance `cycles` cycles with nothing driven by the host.
    pub fn tick_idle(&mut self, cycles: u64) {
        for _ in 0..cycles {
            self.tick(&BusSignals::IDLE, None);
        }
    }

    /// Asynchronous power-on reset: everything, including the bus channels
    /// and WINDOW_LENGTH, returns to its initial value.
    pub fn power_on_reset(&mut self) {
        self.bus.reset();
        self.registers.power_on();
        self.controller.reset();
        debug!("power-on reset at cycle {}", self.cycle);
    }

    /// Register value as the read channel would sample it now.
    pub fn register_value(&self, offset: u32) -> u32 {
        self.registers.read(offset, self.is_busy())
    }

    /// STATUS.busy
    pub fn is_busy(&self) -> bool {
        self.controller.phase() != Phase::Idle
    }

    /// Controller state
    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    /// Last latched result, if STATUS.done is set
    pub fn result(&self) -> Option<&WindowResult> {
        self.registers.done().then(|| self.registers.result())
    }

    /// Cycles elapsed since construction
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Parameters the core was built with
    pub const fn params(&self) -> &CoreParams {
        &self.params
    }

    /// Weight store
    pub fn weights(&self) -> &WeightStore {
        &self.weights
    }

    /// Bus slave
    pub const fn bus(&self) -> &BusInterface {
        &self.bus
    }

    /// Window controller
    pub const fn controller(&self) -> &WindowController {
        &self.controller
    }

    /// Register file
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    fn apply_write(&mut self, write: RegisterWrite) -> WriteEffect {
        let mut effect = WriteEffect::default();
        match write.offset {
            regs::CONTROL => {
                if write.value & control::RESET != 0 {
                    self.controller.reset();
                    self.registers.clear();
                    effect.reset = true;
                    debug!("soft reset at cycle {}", self.cycle);
                }
                if write.value & control::START != 0 {
                    if self.controller.phase() == Phase::Idle {
                        self.registers.begin();
                        effect.start = Some(self.registers.window_length());
                    } else {
                        warn!("START ignored: controller busy in {}", self.controller.phase());
                    }
                }
            }
            regs::WINDOW_LENGTH => {
                if !self.registers.set_window_length(write.value) {
                    warn!(
                        "WINDOW_LENGTH {} outside 1..={}, ignored",
                        write.value, self.params.w_len_max
                    );
                } else if self.is_busy() {
                    debug!(
                        "WINDOW_LENGTH {} applies from the next window (running with {})",
                        write.value,
                        self.controller.window_length()
                    );
                }
            }
            offset => debug!(
                "write {:#x} to {} ignored",
                write.value,
                regs::name(offset).unwrap_or("unmapped offset")
            ),
        }
        effect
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Started { window_length } => {
                debug!("window started, length {window_length}");
            }
            Event::FrameComplete {
                words,
                truncated,
                reserved_bits,
            } => {
                if reserved_bits != 0 {
                    debug!("reserved input bits {reserved_bits:#x} masked off");
                }
                if truncated {
                    debug!("frame ended early by TLAST after {words} words");
                    if self.params.flag_truncation {
                        self.registers.raise_error();
                    }
                }
            }
            Event::Finished(result) => {
                self.registers.publish(result);
                info!(
                    "window done: class {} counts {:?} in {} cycles",
                    result.class, result.counts, result.latency_cycles
                );
            }
        }
    }
}

#[derive(Debug, Default)]
struct WriteEffect {
    start: Option<usize>,
    reset: bool,
}
