// SPDX-License-Identifier: AGPL-3.0-only

//! Overlay driver: the host sequence for one inference.
//!
//! ```text
//!   WINDOW_LENGTH ← T          (only when it changes)
//!   stream words, TLAST on the last
//!   CONTROL ← START
//!   poll STATUS until DONE
//!   read RESULT_CLASS, COUNT0..2, CONFIDENCE, LATENCY_CYCLES, DEBUG0..1
//! ```

use crate::backend::{select_backend, BackendSelection, CoreBackend, Geometry};
use crate::error::{DriverError, Result};
use enose_chip::regs::{self, control, status};
use enose_chip::stream;
use enose_models::encoding::spikes_to_masks;
use enose_models::Artifacts;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Polling behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverConfig {
    /// STATUS reads before giving up
    pub poll_limit: u32,
    /// Cycles to let pass between reads
    pub cycles_per_poll: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            poll_limit: 10_000,
            cycles_per_poll: 64,
        }
    }
}

/// Result registers of one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferenceResult {
    /// RESULT_CLASS
    pub class: u32,
    /// COUNT0..2
    pub counts: [u32; 3],
    /// CONFIDENCE (Q1.15)
    pub confidence: u32,
    /// LATENCY_CYCLES
    pub latency_cycles: u32,
    /// DEBUG0: words received
    pub words_received: u32,
    /// DEBUG1: hidden spikes
    pub hidden_spikes: u32,
    /// STATUS at completion
    pub status: u32,
}

impl InferenceResult {
    /// CONFIDENCE as a fraction in `[0, 1)`
    #[allow(clippy::cast_precision_loss)]
    pub fn confidence_f32(&self) -> f32 {
        self.confidence as f32 / 32768.0
    }
}

/// Host driver over any backend.
#[derive(Debug)]
pub struct OverlayDriver<B: CoreBackend> {
    backend: B,
    config: DriverConfig,
    geometry: Geometry,
    window_length: usize,
}

impl<B: CoreBackend> OverlayDriver<B> {
    /// Attach to a backend: reset it and read back the configured window.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn new(backend: B, config: DriverConfig) -> Result<Self> {
        let geometry = backend.geometry();
        let mut driver = Self {
            backend,
            config,
            geometry,
            window_length: 0,
        };
        driver.reset()?;
        driver.window_length = driver.backend.read_reg(regs::WINDOW_LENGTH)? as usize;
        info!(
            "Overlay driver on {}: {}→{}→{}, window {}",
            driver.backend.backend_type(),
            geometry.n_in,
            geometry.n_hidden,
            geometry.n_out,
            driver.window_length
        );
        Ok(driver)
    }

    /// Backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Backend, mutably
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Core geometry
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// WINDOW_LENGTH as last written
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Soft reset of the core
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn reset(&mut self) -> Result<()> {
        self.backend.write_reg(regs::CONTROL, control::RESET)
    }

    /// Program WINDOW_LENGTH.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `n` is outside `1..=w_len_max`.
    pub fn set_window_length(&mut self, n: usize) -> Result<()> {
        if n == 0 || n > self.geometry.w_len_max {
            return Err(DriverError::invalid_input(format!(
                "window length {n} outside 1..={}",
                self.geometry.w_len_max
            )));
        }
        let value = u32::try_from(n).map_err(|_| DriverError::invalid_input("window length overflows u32"))?;
        self.backend.write_reg(regs::WINDOW_LENGTH, value)?;
        self.window_length = n;
        debug!("WINDOW_LENGTH = {n}");
        Ok(())
    }

    /// Run one window of masks, reprogramming WINDOW_LENGTH to fit.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for an empty or oversized window or bits outside the
    /// input channels, `Timeout`, or `DeviceError` if STATUS.error is set.
    pub fn infer_from_masks(&mut self, masks: &[u32]) -> Result<InferenceResult> {
        self.check_masks(masks)?;
        if masks.len() != self.window_length {
            self.set_window_length(masks.len())?;
        }
        self.infer_frame(masks)
    }

    /// Run one window of spike vectors (`[T][n_in]`).
    ///
    /// # Errors
    ///
    /// As [`Self::infer_from_masks`].
    pub fn infer_from_spikes<S: AsRef<[bool]>>(&mut self, spikes: &[S]) -> Result<InferenceResult> {
        for (t, s) in spikes.iter().enumerate() {
            let channels: &[bool] = s.as_ref();
            if channels.len() > self.geometry.n_in {
                return Err(DriverError::invalid_input(format!(
                    "timestep {t} has {} channels, core has {}",
                    channels.len(),
                    self.geometry.n_in
                )));
            }
        }
        self.infer_from_masks(&spikes_to_masks(spikes))
    }

    /// Stream a frame under the current WINDOW_LENGTH and run it. A frame
    /// shorter than the window is ended by TLAST.
    ///
    /// # Errors
    ///
    /// As [`Self::infer_from_masks`].
    pub fn infer_frame(&mut self, words: &[u32]) -> Result<InferenceResult> {
        self.check_masks(words)?;
        let started = Instant::now();

        self.backend.stream_send(words, true)?;
        self.backend.write_reg(regs::CONTROL, control::START)?;
        let status = self.poll_done()?;
        let result = self.read_result(status)?;

        let leftover = self.backend.pending_words();
        if leftover > 0 {
            warn!("{leftover} stream words left queued after the window");
        }
        if status & status::ERROR != 0 {
            return Err(DriverError::DeviceError { status });
        }
        info!(
            "class {} counts {:?} latency {} cycles ({:?} host)",
            result.class,
            result.counts,
            result.latency_cycles,
            started.elapsed()
        );
        Ok(result)
    }

    /// Poll STATUS until DONE.
    ///
    /// # Errors
    ///
    /// `Timeout` after `poll_limit` reads without DONE.
    pub fn poll_done(&mut self) -> Result<u32> {
        for _ in 0..self.config.poll_limit {
            let s = self.backend.read_reg(regs::STATUS)?;
            if s & status::DONE != 0 {
                return Ok(s);
            }
            self.backend.advance(self.config.cycles_per_poll)?;
        }
        Err(DriverError::Timeout {
            cycles: u64::from(self.config.poll_limit) * self.config.cycles_per_poll,
        })
    }

    /// Read the result block.
    ///
    /// # Errors
    ///
    /// Propagates backend errors.
    pub fn read_result(&mut self, status: u32) -> Result<InferenceResult> {
        let mut counts = [0; 3];
        for (slot, &offset) in counts.iter_mut().zip(regs::COUNTS.iter()) {
            *slot = self.backend.read_reg(offset)?;
        }
        Ok(InferenceResult {
            class: self.backend.read_reg(regs::RESULT_CLASS)?,
            counts,
            confidence: self.backend.read_reg(regs::CONFIDENCE)?,
            latency_cycles: self.backend.read_reg(regs::LATENCY_CYCLES)?,
            words_received: self.backend.read_reg(regs::DEBUG0)?,
            hidden_spikes: self.backend.read_reg(regs::DEBUG1)?,
            status,
        })
    }

    fn check_masks(&self, masks: &[u32]) -> Result<()> {
        if masks.is_empty() {
            return Err(DriverError::invalid_input("empty window"));
        }
        if masks.len() > self.geometry.w_len_max {
            return Err(DriverError::invalid_input(format!(
                "{} words exceed W_LEN_MAX {}",
                masks.len(),
                self.geometry.w_len_max
            )));
        }
        if let Some((t, m)) = masks
            .iter()
            .enumerate()
            .find(|&(_, &m)| stream::reserved_bits(m, self.geometry.n_in) != 0)
        {
            return Err(DriverError::invalid_input(format!(
                "mask {m:#x} at timestep {t} uses channels beyond {}",
                self.geometry.n_in
            )));
        }
        Ok(())
    }
}

impl OverlayDriver<Box<dyn CoreBackend>> {
    /// Build the selected backend from an artifact directory and attach.
    ///
    /// # Errors
    ///
    /// Artifact, core or backend errors.
    pub fn open(
        artifacts: &Artifacts,
        selection: BackendSelection,
        config: DriverConfig,
    ) -> Result<Self> {
        let weights = Arc::new(artifacts.weight_store()?);
        let backend = select_backend(selection, artifacts.core_params(), weights)?;
        Self::new(backend, config)
    }
}
