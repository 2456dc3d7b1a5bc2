//! Cycle-level model of the e-nose SNN accelerator core.
//!
//! The core classifies a window of binary spike masks with a two-layer
//! fixed-point LIF network (12 → 32 → 3 on the reference bitstream). It is
//! modelled clock by clock: a host drives AXI-Lite and AXI-Stream signals
//! into [`SnnCore::tick`] and observes ready/valid outputs, exactly as it
//! would on the fabric.
//!
//! ```text
//!   AXI-Lite ──▶ BusInterface ──▶ RegisterFile ◀── results ──┐
//!                                     │ START/RESET          │
//!                                     ▼                      │
//!   AXI-Stream ──▶ StreamBuffer ──▶ WindowController ──▶ NeuronState
//!                                     │
//!                                     ▼
//!                           WeightPort ──▶ WeightStore (W1, W2)
//! ```
//!
//! [`reference`] computes the same window without timing and serves as the
//! golden model for conformance.
//!
//! # Example
//!
//! ```
//! use enose_core::prelude::*;
//! use std::sync::Arc;
//!
//! let params = CoreParams::default();
//! let weights = WeightStore::zeros(params.n_in, params.n_hidden, params.n_out);
//! let core = SnnCore::new(params, Arc::new(weights)).unwrap();
//! assert_eq!(core.register_value(enose_chip::regs::N_IN), 12);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod bus;
pub mod controller;
pub mod diagnostics;
mod engine;
mod error;
pub mod neuron;
pub mod params;
pub mod reference;
pub mod registers;
pub mod result;
pub mod stream_buffer;
pub mod weights;

pub use engine::{CycleOutputs, SnnCore};
pub use error::{CoreError, Result};
pub use params::{AccessMode, ConfidenceMode, CoreParams, LifParams};
pub use result::WindowResult;
pub use weights::{Matrix, WeightStore};

/// Common imports for hosts driving a core.
pub mod prelude {
    pub use crate::bus::{BusOutputs, BusSignals};
    pub use crate::controller::Phase;
    pub use crate::{
        AccessMode, ConfidenceMode, CoreError, CoreParams, CycleOutputs, LifParams, SnnCore,
        WeightStore, WindowResult,
    };
    pub use enose_chip::stream::Beat;
}
