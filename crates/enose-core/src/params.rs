//! Per-instantiation core parameters.
//!
//! Everything here is fixed when the core is built: layer widths, window
//! bounds, LIF constants and the named implementation modes. Only the
//! window length is run-time configurable, through the WINDOW_LENGTH
//! register.

use crate::error::{CoreError, Result};
use enose_chip::{geometry, stream};

/// Leak shift and threshold of one LIF layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifParams {
    /// Arithmetic right shift applied for the leak: `v -= v >> leak_shift`
    pub leak_shift: u8,
    /// Firing threshold, compared with `>=`
    pub threshold: i16,
}

impl LifParams {
    /// Create layer constants
    pub const fn new(leak_shift: u8, threshold: i16) -> Self {
        Self {
            leak_shift,
            threshold,
        }
    }
}

/// How the compute engine reaches the weight store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Issue / wait / consume: three controller cycles per weight read,
    /// two of them covering the block-RAM read latency. Matches the
    /// reference bitstream cycle for cycle.
    #[default]
    Pipelined,
    /// One synchronous lookup per controller cycle. Functionally identical,
    /// not cycle-compatible.
    Synchronous,
}

impl AccessMode {
    /// Controller cycles spent on one weight access
    pub const fn cycles_per_access(self) -> u32 {
        match self {
            Self::Pipelined => 3,
            Self::Synchronous => 1,
        }
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pipelined => write!(f, "pipelined"),
            Self::Synchronous => write!(f, "synchronous"),
        }
    }
}

/// What the CONFIDENCE register reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfidenceMode {
    /// Always zero, as on the reference bitstream.
    #[default]
    Zero,
    /// `max(count) / sum(count)` in Q1.15, saturated at `0x7FFF`.
    Q15,
}

impl std::fmt::Display for ConfidenceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Zero => write!(f, "zero"),
            Self::Q15 => write!(f, "q15"),
        }
    }
}

/// Core instantiation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreParams {
    /// Input channels (bits used from each stream word)
    pub n_in: usize,
    /// Hidden neurons
    pub n_hidden: usize,
    /// Output classes
    pub n_out: usize,
    /// Stream buffer depth, the largest accepted window length
    pub w_len_max: usize,
    /// Reset value of WINDOW_LENGTH
    pub default_window_length: usize,
    /// Hidden layer LIF constants
    pub hidden: LifParams,
    /// Output layer LIF constants
    pub output: LifParams,
    /// Weight access timing
    pub access_mode: AccessMode,
    /// CONFIDENCE register behaviour
    pub confidence: ConfidenceMode,
    /// Raise STATUS.error when TLAST ends a frame early
    pub flag_truncation: bool,
}

impl Default for CoreParams {
    fn default() -> Self {
        Self {
            n_in: geometry::N_IN,
            n_hidden: geometry::N_HIDDEN,
            n_out: geometry::N_OUT,
            w_len_max: geometry::W_LEN_MAX,
            default_window_length: geometry::DEFAULT_WINDOW_LENGTH,
            hidden: LifParams::new(geometry::LEAK_H, geometry::TH_H),
            output: LifParams::new(geometry::LEAK_O, geometry::TH_O),
            access_mode: AccessMode::default(),
            confidence: ConfidenceMode::default(),
            flag_truncation: false,
        }
    }
}

impl CoreParams {
    /// Set layer widths
    #[must_use]
    pub fn with_geometry(mut self, n_in: usize, n_hidden: usize, n_out: usize) -> Self {
        self.n_in = n_in;
        self.n_hidden = n_hidden;
        self.n_out = n_out;
        self
    }

    /// Set the stream buffer depth
    #[must_use]
    pub fn with_w_len_max(mut self, w_len_max: usize) -> Self {
        self.w_len_max = w_len_max;
        self
    }

    /// Set the reset value of WINDOW_LENGTH
    #[must_use]
    pub fn with_default_window_length(mut self, window_length: usize) -> Self {
        self.default_window_length = window_length;
        self
    }

    /// Set hidden layer constants
    #[must_use]
    pub fn with_hidden(mut self, hidden: LifParams) -> Self {
        self.hidden = hidden;
        self
    }

    /// Set output layer constants
    #[must_use]
    pub fn with_output(mut self, output: LifParams) -> Self {
        self.output = output;
        self
    }

    /// Select weight access timing
    #[must_use]
    pub fn with_access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = mode;
        self
    }

    /// Select CONFIDENCE behaviour
    #[must_use]
    pub fn with_confidence(mut self, mode: ConfidenceMode) -> Self {
        self.confidence = mode;
        self
    }

    /// Raise STATUS.error on early TLAST
    #[must_use]
    pub fn with_flag_truncation(mut self, flag: bool) -> Self {
        self.flag_truncation = flag;
        self
    }

    /// True if `window_length` is accepted by WINDOW_LENGTH
    pub const fn window_length_valid(&self, window_length: usize) -> bool {
        window_length >= 1 && window_length <= self.w_len_max
    }

    /// Check the parameters against the datapath widths.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a size is zero, a layer is wider than the
    /// stream word or the COUNT registers, a leak shift would clear the
    /// 16-bit potential, a threshold is not positive, or the worst-case
    /// accumulation overflows the 16-bit membrane potential.
    pub fn validate(&self) -> Result<()> {
        if self.n_in == 0 || self.n_hidden == 0 || self.n_out == 0 {
            return Err(CoreError::invalid_config(format!(
                "layer widths must be non-zero: {}→{}→{}",
                self.n_in, self.n_hidden, self.n_out
            )));
        }
        if self.n_in > stream::MAX_CHANNELS {
            return Err(CoreError::invalid_config(format!(
                "n_in={} exceeds the {}-bit stream word",
                self.n_in,
                stream::WORD_BITS
            )));
        }
        if self.n_out > enose_chip::regs::COUNTS.len() {
            return Err(CoreError::invalid_config(format!(
                "n_out={} exceeds the {} COUNT registers",
                self.n_out,
                enose_chip::regs::COUNTS.len()
            )));
        }
        if self.w_len_max == 0 || u32::try_from(self.w_len_max).is_err() {
            return Err(CoreError::invalid_config(format!(
                "w_len_max={} out of range",
                self.w_len_max
            )));
        }
        if !self.window_length_valid(self.default_window_length) {
            return Err(CoreError::invalid_config(format!(
                "default window length {} outside 1..={}",
                self.default_window_length, self.w_len_max
            )));
        }
        for (layer, lif) in [("hidden", self.hidden), ("output", self.output)] {
            if lif.leak_shift >= 16 {
                return Err(CoreError::invalid_config(format!(
                    "{layer} leak shift {} must be below 16",
                    lif.leak_shift
                )));
            }
            if lif.threshold <= 0 {
                return Err(CoreError::invalid_config(format!(
                    "{layer} threshold {} must be positive",
                    lif.threshold
                )));
            }
        }
        // One i8 weight per fan-in term, magnitude at most 128.
        let fan_in = self.n_in.max(self.n_hidden);
        if fan_in * 128 > usize::from(i16::MAX.unsigned_abs()) {
            return Err(CoreError::invalid_config(format!(
                "fan-in {fan_in} can overflow the 16-bit membrane potential"
            )));
        }
        Ok(())
    }

    /// Controller cycles for one timestep (hidden sweep, output sweep, NEXT_T).
    pub fn cycles_per_timestep(&self) -> u64 {
        let access = u64::from(self.access_mode.cycles_per_access());
        let (n_in, n_hidden, n_out) = (self.n_in as u64, self.n_hidden as u64, self.n_out as u64);
        n_hidden * (n_in * access + 1) + n_out * (n_hidden * access + 1) + 1
    }

    /// Closed-form LATENCY_CYCLES for a window whose words arrive back to back.
    pub fn latency_cycles(&self, words_received: usize, timesteps: usize) -> u64 {
        words_received as u64 + timesteps as u64 * self.cycles_per_timestep()
    }
}
