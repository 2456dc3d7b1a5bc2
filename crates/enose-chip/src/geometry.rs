//! Default geometry and LIF constants of the reference bitstream.
//!
//! These are the synthesis parameters the reference core was built with
//! (`12 → 32 → 3`, window of 10, shift-4 leak, threshold 64). The
//! emulator accepts other values; these are only defaults.

/// Input channels (6 sensor features, rising and falling).
pub const N_IN: usize = 12;
/// Hidden LIF neurons.
pub const N_HIDDEN: usize = 32;
/// Output classes.
pub const N_OUT: usize = 3;

/// Largest window the stream buffer can hold.
pub const W_LEN_MAX: usize = 64;
/// Reset value of WINDOW_LENGTH.
pub const DEFAULT_WINDOW_LENGTH: usize = 10;

/// Hidden layer leak shift: `v -= v >> LEAK_H`.
pub const LEAK_H: u8 = 4;
/// Output layer leak shift.
pub const LEAK_O: u8 = 4;
/// Hidden layer firing threshold.
pub const TH_H: i16 = 64;
/// Output layer firing threshold.
pub const TH_O: i16 = 64;

/// Depth of the W1 weight memory.
pub const W1_DEPTH: usize = N_IN * N_HIDDEN;
/// Depth of the W2 weight memory.
pub const W2_DEPTH: usize = N_HIDDEN * N_OUT;
