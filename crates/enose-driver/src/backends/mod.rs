//! Backend implementations
//!
//! Two backends available:
//! - **Emulated**: cycle-level core driven through AXI-Lite and AXI-Stream
//!   handshakes; LATENCY_CYCLES is measured
//! - **Golden**: functional model behind the same register contract;
//!   LATENCY_CYCLES is the closed-form count

pub mod emulated;
pub mod golden;

pub use emulated::EmulatedBackend;
pub use golden::GoldenBackend;
