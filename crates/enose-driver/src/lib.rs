//! Host driver for the e-nose SNN accelerator.
//!
//! The driver talks to the core only through its outer contract, the
//! AXI-Lite register map and the AXI-Stream spike port, so the same
//! inference sequence runs against either backend.
//!
//! # Backend hierarchy
//!
//! ```text
//! Emulated  cycle-level core, bus handshakes, measured latency
//! Golden    functional reference, closed-form latency
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use enose_driver::prelude::*;
//! use enose_models::Artifacts;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let artifacts = Artifacts::load("exports/fpga")?;
//! let mut driver = OverlayDriver::open(
//!     &artifacts,
//!     BackendSelection::Emulated,
//!     DriverConfig::default(),
//! )?;
//! let result = driver.infer_from_masks(&[0x1F; 16])?;
//! println!("class {} counts {:?}", result.class, result.counts);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod backend;
pub mod backends;
mod driver;
mod error;

pub use backend::{select_backend, BackendSelection, BackendType, CoreBackend, Geometry};
pub use driver::{DriverConfig, InferenceResult, OverlayDriver};
pub use enose_models::{events_to_masks, spikes_to_masks};
pub use error::{DriverError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::backends::{EmulatedBackend, GoldenBackend};
    pub use crate::{
        BackendSelection, BackendType, CoreBackend, DriverConfig, DriverError, InferenceResult,
        OverlayDriver, Result,
    };
}
