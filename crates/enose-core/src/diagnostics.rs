//! Latency cycle counter and debug counters.

/// Counts controller cycles spent on active processing.
///
/// Runs in RECV, HIDDEN, OUTPUT and NEXT_T. It is held in RECV until the
/// first word is either received or on offer, so host-side delay before the
/// stream starts is not billed to the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyCounter {
    cycles: u64,
}

impl LatencyCounter {
    /// Zeroed counter
    pub const fn new() -> Self {
        Self { cycles: 0 }
    }

    /// Account one cycle.
    ///
    /// `active` is false in IDLE and DONE; `waiting_for_first_word` is true
    /// in RECV while nothing has arrived and no beat is offered.
    pub fn observe(&mut self, active: bool, waiting_for_first_word: bool) {
        if active && !waiting_for_first_word {
            self.cycles += 1;
        }
    }

    /// Cycles counted so far
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Value as published in LATENCY_CYCLES
    pub fn register_value(&self) -> u32 {
        u32::try_from(self.cycles).unwrap_or(u32::MAX)
    }

    /// Zero the counter
    pub fn clear(&mut self) {
        self.cycles = 0;
    }
}

/// Debug counters latched with the result and read back as DEBUG0 / DEBUG1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugCounters {
    /// Stream words received in the window
    pub words_received: u32,
    /// Hidden spikes across the window
    pub hidden_spikes: u32,
}
