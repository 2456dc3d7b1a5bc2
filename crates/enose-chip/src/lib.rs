//! Silicon model for the e-nose spiking-neural-network accelerator.
//!
//! This crate has **no dependencies** and **no hardware access**. It is a
//! pure model of the accelerator's outer contract: register offsets and bit
//! definitions, the stream word format, and the default core geometry the
//! reference bitstream is built with.
//!
//! # Crate organisation
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`regs`] | AXI-Lite register map: offsets, CONTROL/STATUS bits, sentinel |
//! | [`stream`] | AXI-Stream spike word: channel mask, reserved bits, TLAST |
//! | [`geometry`] | Default layer widths, window bounds, LIF constants |

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod geometry;
pub mod regs;
pub mod stream;
