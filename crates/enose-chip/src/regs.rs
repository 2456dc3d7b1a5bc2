//! AXI-Lite register map of the accelerator core.
//!
//! Every register is a 32-bit word at a word-aligned byte offset. The low
//! two address bits select byte lanes and are ignored by the decoder.
//!
//! ```text
//! 0x00  CONTROL         W   bit0 start, bit1 reset (self-clearing, reads 0)
//! 0x04  STATUS          R   bit0 done, bit1 busy, bit2 error
//! 0x08  WINDOW_LENGTH   RW  timesteps per window (1..=W_LEN_MAX)
//! 0x0C  N_IN            R   input channel count
//! 0x10  N_HIDDEN        R   hidden neuron count
//! 0x14  N_OUT           R   output class count
//! 0x18  RESULT_CLASS    R   argmax of COUNT0..2, low index wins ties
//! 0x1C  COUNT0          R   output spikes of class 0
//! 0x20  COUNT1          R   output spikes of class 1
//! 0x24  COUNT2          R   output spikes of class 2
//! 0x28  CONFIDENCE      R   Q1.15, zero on the reference bitstream
//! 0x2C  LATENCY_CYCLES  R   active processing cycles of the last window
//! 0x30  DEBUG0          R   stream words received
//! 0x34  DEBUG1          R   total hidden spikes
//! ```

// ── Control and configuration ────────────────────────────────────────────────

/// Control register (start / reset pulses).
pub const CONTROL: u32 = 0x00;
/// Status register (done / busy / error).
pub const STATUS: u32 = 0x04;
/// Configured window length in timesteps.
pub const WINDOW_LENGTH: u32 = 0x08;

// ── Geometry (read-only constants) ───────────────────────────────────────────

/// Input channel count.
pub const N_IN: u32 = 0x0C;
/// Hidden neuron count.
pub const N_HIDDEN: u32 = 0x10;
/// Output class count.
pub const N_OUT: u32 = 0x14;

// ── Results ──────────────────────────────────────────────────────────────────

/// Classification index of the last completed window.
pub const RESULT_CLASS: u32 = 0x18;
/// Output spike count of class 0.
pub const COUNT0: u32 = 0x1C;
/// Output spike count of class 1.
pub const COUNT1: u32 = 0x20;
/// Output spike count of class 2.
pub const COUNT2: u32 = 0x24;
/// Confidence in Q1.15.
pub const CONFIDENCE: u32 = 0x28;
/// Latency of the last window in controller cycles.
pub const LATENCY_CYCLES: u32 = 0x2C;

// ── Diagnostics ──────────────────────────────────────────────────────────────

/// Stream words received in the last window.
pub const DEBUG0: u32 = 0x30;
/// Hidden spikes emitted across the last window.
pub const DEBUG1: u32 = 0x34;

/// Per-class count registers, indexed by class.
pub const COUNTS: [u32; 3] = [COUNT0, COUNT1, COUNT2];

/// Value returned for reads of unmapped offsets.
pub const UNMAPPED_SENTINEL: u32 = 0xDEAD_BEEF;

/// Every mapped offset, in address order.
pub const ALL: [u32; 14] = [
    CONTROL,
    STATUS,
    WINDOW_LENGTH,
    N_IN,
    N_HIDDEN,
    N_OUT,
    RESULT_CLASS,
    COUNT0,
    COUNT1,
    COUNT2,
    CONFIDENCE,
    LATENCY_CYCLES,
    DEBUG0,
    DEBUG1,
];

/// Strip the byte-lane bits from a bus address.
#[must_use]
pub const fn word_offset(addr: u32) -> u32 {
    addr & !0b11
}

/// Human-readable register name, `None` for unmapped offsets.
#[must_use]
pub const fn name(offset: u32) -> Option<&'static str> {
    match word_offset(offset) {
        CONTROL => Some("CONTROL"),
        STATUS => Some("STATUS"),
        WINDOW_LENGTH => Some("WINDOW_LENGTH"),
        N_IN => Some("N_IN"),
        N_HIDDEN => Some("N_HIDDEN"),
        N_OUT => Some("N_OUT"),
        RESULT_CLASS => Some("RESULT_CLASS"),
        COUNT0 => Some("COUNT0"),
        COUNT1 => Some("COUNT1"),
        COUNT2 => Some("COUNT2"),
        CONFIDENCE => Some("CONFIDENCE"),
        LATENCY_CYCLES => Some("LATENCY_CYCLES"),
        DEBUG0 => Some("DEBUG0"),
        DEBUG1 => Some("DEBUG1"),
        _ => None,
    }
}

/// True if the host may write the register.
#[must_use]
pub const fn is_writable(offset: u32) -> bool {
    matches!(word_offset(offset), CONTROL | WINDOW_LENGTH)
}

// ── CONTROL register bit definitions ─────────────────────────────────────────

pub mod control {
    //! CONTROL bits. Both are pulses: they act on the write and read back 0.

    /// Begin an inference (only honoured while the controller is idle).
    pub const START: u32 = 1 << 0;
    /// Unconditional reset of the controller and neuron state.
    pub const RESET: u32 = 1 << 1;
}

// ── STATUS register bit definitions ──────────────────────────────────────────

pub mod status {
    //! STATUS bits.

    /// Results of the last window are valid.
    pub const DONE: u32 = 1 << 0;
    /// An inference is in flight.
    pub const BUSY: u32 = 1 << 1;
    /// Sticky error (invalid configuration, or truncation when flagged).
    pub const ERROR: u32 = 1 << 2;
}
