#![deny(unsafe_code)]

//! Weight artifacts and stimulus tooling for the e-nose SNN accelerator
//!
//! This crate sits on the file side of the weight artifact boundary: it
//! reads what the training flow exports and turns it into
//! [`enose_core::CoreParams`] and [`enose_core::WeightStore`].
//!
//! # Artifacts
//!
//! - **Parameters**: `params_rtl.json` (integer) or `params.json` (training export)
//! - **Weights**: `w1.mem`/`w2.mem` (`$readmemh`), `w1.coe`/`w2.coe` (Vivado)
//! - **Golden vectors**: `test_vectors.txt`
//! - **Spike files**: `spikes.mem`, one 32-bit mask per line
//!
//! # Example
//!
//! ```no_run
//! use enose_models::Artifacts;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let artifacts = Artifacts::load("exports/fpga")?;
//! let params = artifacts.core_params();
//! let weights = artifacts.weight_store()?;
//! println!("{}→{}→{}", params.n_in, params.n_hidden, params.n_out);
//! # let _ = weights;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

mod artifacts;
pub mod encoding;
mod error;
pub mod memfile;
pub mod vectors;
mod weights;

pub use artifacts::{
    quantize_threshold, Artifacts, MatrixShapes, QuantScales, RtlParams, SnnConfig, TrainingExport,
};
pub use encoding::{events_to_masks, spikes_to_masks, DeltaEncoder};
pub use error::{ModelError, Result};
pub use vectors::{format_test_vectors, load_masks, load_test_vectors, parse_test_vectors, standard_patterns, TestVector};
pub use weights::{build_store, WeightImage};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{Artifacts, DeltaEncoder, ModelError, Result, RtlParams, TestVector};
}
