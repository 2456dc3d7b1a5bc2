//! Register file behind the AXI-Lite slave.

use crate::params::CoreParams;
use crate::result::WindowResult;
use enose_chip::regs::{self, status};

fn to_reg(v: usize) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// Host-visible register state that is not owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    n_in: u32,
    n_hidden: u32,
    n_out: u32,
    w_len_max: u32,
    default_window_length: u32,
    window_length: u32,
    done: bool,
    error: bool,
    result: WindowResult,
}

impl RegisterFile {
    /// Power-on register contents
    pub fn new(params: &CoreParams) -> Self {
        Self {
            n_in: to_reg(params.n_in),
            n_hidden: to_reg(params.n_hidden),
            n_out: to_reg(params.n_out),
            w_len_max: to_reg(params.w_len_max),
            default_window_length: to_reg(params.default_window_length),
            window_length: to_reg(params.default_window_length),
            done: false,
            error: false,
            result: WindowResult::default(),
        }
    }

    /// Configured window length
    pub fn window_length(&self) -> usize {
        self.window_length as usize
    }

    /// Store a WINDOW_LENGTH write. Out-of-range values leave the register
    /// unchanged, set the sticky error bit and return false.
    pub fn set_window_length(&mut self, value: u32) -> bool {
        if (1..=self.w_len_max).contains(&value) {
            self.window_length = value;
            true
        } else {
            self.error = true;
            false
        }
    }

    /// STATUS value given the controller's busy flag
    pub fn status(&self, busy: bool) -> u32 {
        let mut s = 0;
        if self.done {
            s |= status::DONE;
        }
        if busy {
            s |= status::BUSY;
        }
        if self.error {
            s |= status::ERROR;
        }
        s
    }

    /// Decode a register read. Unmapped offsets return the sentinel.
    pub fn read(&self, offset: u32, busy: bool) -> u32 {
        let r = &self.result;
        match regs::word_offset(offset) {
            regs::CONTROL => 0,
            regs::STATUS => self.status(busy),
            regs::WINDOW_LENGTH => self.window_length,
            regs::N_IN => self.n_in,
            regs::N_HIDDEN => self.n_hidden,
            regs::N_OUT => self.n_out,
            regs::RESULT_CLASS => r.class,
            regs::COUNT0 => r.counts[0],
            regs::COUNT1 => r.counts[1],
            regs::COUNT2 => r.counts[2],
            regs::CONFIDENCE => r.confidence,
            regs::LATENCY_CYCLES => r.latency_cycles,
            regs::DEBUG0 => r.debug.words_received,
            regs::DEBUG1 => r.debug.hidden_spikes,
            _ => regs::UNMAPPED_SENTINEL,
        }
    }

    /// A START was accepted: clear done and error.
    pub fn begin(&mut self) {
        self.done = false;
        self.error = false;
    }

    /// Latch a finished window and raise done.
    pub fn publish(&mut self, result: WindowResult) {
        self.result = result;
        self.done = true;
    }

    /// Set the sticky error bit.
    pub fn raise_error(&mut self) {
        self.error = true;
    }

    /// Soft reset: clear flags and results, keep WINDOW_LENGTH.
    pub fn clear(&mut self) {
        self.done = false;
        self.error = false;
        self.result = WindowResult::default();
    }

    /// Power-on reset: soft reset plus WINDOW_LENGTH back to its default.
    pub fn power_on(&mut self) {
        self.clear();
        self.window_length = self.default_window_length;
    }

    /// done flag
    pub const fn done(&self) -> bool {
        self.done
    }

    /// error flag
    pub const fn error(&self) -> bool {
        self.error
    }

    /// Latched result block
    pub const fn result(&self) -> &WindowResult {
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DebugCounters;

    #[test]
    fn power_on_values() {
        let rf = RegisterFile::new(&CoreParams::default());
        assert_eq!(rf.read(regs::N_IN, false), 12);
        assert_eq!(rf.read(regs::N_HIDDEN, false), 32);
        assert_eq!(rf.read(regs::N_OUT, false), 3);
        assert_eq!(rf.read(regs::WINDOW_LENGTH, false), 10);
        assert_eq!(rf.read(regs::STATUS, false), 0);
        assert_eq!(rf.read(regs::CONTROL, false), 0);
        assert_eq!(rf.read(regs::CONFIDENCE, false), 0);
    }

    #[test]
    fn unmapped_reads_return_sentinel() {
        let rf = RegisterFile::new(&CoreParams::default());
        assert_eq!(rf.read(0x38, false), regs::UNMAPPED_SENTINEL);
        assert_eq!(rf.read(0xFFC, false), regs::UNMAPPED_SENTINEL);
        // Byte lanes are ignored
        assert_eq!(rf.read(regs::N_IN + 2, false), 12);
    }

    #[test]
    fn window_length_range() {
        let mut rf = RegisterFile::new(&CoreParams::default());
        assert!(rf.set_window_length(1));
        assert!(rf.set_window_length(64));
        assert!(!rf.error());
        assert!(!rf.set_window_length(0));
        assert!(!rf.set_window_length(65));
        assert_eq!(rf.window_length(), 64);
        assert!(rf.error());
        assert_eq!(rf.status(false), status::ERROR);
        rf.begin();
        assert!(!rf.error());
    }

    #[test]
    fn debug_registers_follow_counters() {
        let mut rf = RegisterFile::new(&CoreParams::default());
        rf.publish(WindowResult {
            debug: DebugCounters {
                words_received: 9,
                hidden_spikes: 41,
            },
            ..WindowResult::default()
        });
        assert_eq!(rf.read(regs::DEBUG0, false), 9);
        assert_eq!(rf.read(regs::DEBUG1, false), 41);
        rf.clear();
        assert_eq!(rf.read(regs::DEBUG0, false), 0);
        assert_eq!(rf.read(regs::DEBUG1, false), 0);
    }

    #[test]
    fn clear_keeps_window_length() {
        let mut rf = RegisterFile::new(&CoreParams::default());
        rf.set_window_length(7);
        rf.publish(WindowResult {
            class: 2,
            counts: [1, 2, 3],
            ..WindowResult::default()
        });
        assert_eq!(rf.status(true), status::DONE | status::BUSY);
        assert_eq!(rf.read(regs::COUNT2, false), 3);
        rf.clear();
        assert_eq!(rf.read(regs::COUNT2, false), 0);
        assert_eq!(rf.window_length(), 7);
        rf.power_on();
        assert_eq!(rf.window_length(), 10);
    }
}
