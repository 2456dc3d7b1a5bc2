//! Backend abstraction for accelerator access
//!
//! The driver speaks only the outer contract: 32-bit register reads and
//! writes plus a stream of spike words. Backends decide what sits behind it.

use crate::backends::{EmulatedBackend, GoldenBackend};
use crate::error::Result;
use enose_core::{CoreParams, WeightStore};
use std::fmt::Debug;
use std::sync::Arc;

/// Register/stream access to one accelerator instance.
pub trait CoreBackend: Debug + Send {
    /// Write a register
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the write handshake does not complete.
    fn write_reg(&mut self, offset: u32, value: u32) -> Result<()>;

    /// Read a register
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the read handshake does not complete.
    fn read_reg(&mut self, offset: u32) -> Result<u32>;

    /// Queue spike words on the stream, TLAST on the final word if `last`.
    ///
    /// Words are delivered as the core becomes ready; queuing before START
    /// is the normal host sequence.
    ///
    /// # Errors
    ///
    /// Backend specific.
    fn stream_send(&mut self, words: &[u32], last: bool) -> Result<()>;

    /// Let `cycles` clock cycles pass (no-op on untimed backends)
    ///
    /// # Errors
    ///
    /// Backend specific.
    fn advance(&mut self, cycles: u64) -> Result<()>;

    /// Words queued but not yet taken by the core
    fn pending_words(&self) -> usize;

    /// Geometry the backend was built with
    fn geometry(&self) -> Geometry;

    /// Get backend type for debugging
    fn backend_type(&self) -> BackendType;
}

/// Layer widths and window bound of a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Input channels
    pub n_in: usize,
    /// Hidden neurons
    pub n_hidden: usize,
    /// Output classes
    pub n_out: usize,
    /// Largest accepted window length
    pub w_len_max: usize,
}

impl From<&CoreParams> for Geometry {
    fn from(p: &CoreParams) -> Self {
        Self {
            n_in: p.n_in,
            n_hidden: p.n_hidden,
            n_out: p.n_out,
            w_len_max: p.w_len_max,
        }
    }
}

/// Backend type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Cycle-level core behind bus and stream handshakes
    Emulated,
    /// Register-level functional model, no timing
    Golden,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emulated => write!(f, "Emulated (cycle-level)"),
            Self::Golden => write!(f, "Golden (functional)"),
        }
    }
}

/// Backend selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendSelection {
    /// Cycle-level emulation
    #[default]
    Emulated,
    /// Functional model
    Golden,
}

/// Build the selected backend over a weight store.
///
/// # Errors
///
/// Returns `Core` if the parameters or weights are rejected.
pub fn select_backend(
    selection: BackendSelection,
    params: CoreParams,
    weights: Arc<WeightStore>,
) -> Result<Box<dyn CoreBackend>> {
    match selection {
        BackendSelection::Emulated => {
            EmulatedBackend::new(params, weights).map(|b| Box::new(b) as Box<dyn CoreBackend>)
        }
        BackendSelection::Golden => {
            GoldenBackend::new(params, weights).map(|b| Box::new(b) as Box<dyn CoreBackend>)
        }
    }
}

impl<B: CoreBackend + ?Sized> CoreBackend for Box<B> {
    fn write_reg(&mut self, offset: u32, value: u32) -> Result<()> {
        (**self).write_reg(offset, value)
    }

    fn read_reg(&mut self, offset: u32) -> Result<u32> {
        (**self).read_reg(offset)
    }

    fn stream_send(&mut self, words: &[u32], last: bool) -> Result<()> {
        (**self).stream_send(words, last)
    }

    fn advance(&mut self, cycles: u64) -> Result<()> {
        (**self).advance(cycles)
    }

    fn pending_words(&self) -> usize {
        (**self).pending_words()
    }

    fn geometry(&self) -> Geometry {
        (**self).geometry()
    }

    fn backend_type(&self) -> BackendType {
        (**self).backend_type()
    }
}
