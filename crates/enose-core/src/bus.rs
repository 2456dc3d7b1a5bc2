//! AXI-Lite slave: write and read channels as explicit state machines.
//!
//! Write channel
//!
//! ```text
//!             AW only                     W
//!   Idle ──────────────▶ AddressAccepted ──────┐
//!    │ ╲      W only                            ▼
//!    │  ╲───────────────▶ DataAccepted ──AW──▶ Response ──BREADY──▶ Idle
//!    │                                          ▲
//!    └────────────── AW and W together ─────────┘
//! ```
//!
//! The register write commits on the cycle the second half of the
//! transaction is accepted. While in `Response` neither AWREADY nor WREADY
//! is asserted, so a new write cannot start before BREADY retires the
//! current one.
//!
//! Read channel: `Idle ─AR─▶ Lookup ─▶ Response ─RREADY─▶ Idle`. The
//! register is sampled during `Lookup`, one cycle after the address.
//!
//! Every response is OKAY; no access can fail.

use enose_chip::regs;

/// Master-driven signals for one cycle. `Some` means VALID with payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusSignals {
    /// AWVALID / AWADDR
    pub aw: Option<u32>,
    /// WVALID / WDATA (full-word writes)
    pub w: Option<u32>,
    /// BREADY
    pub b_ready: bool,
    /// ARVALID / ARADDR
    pub ar: Option<u32>,
    /// RREADY
    pub r_ready: bool,
}

impl BusSignals {
    /// Nothing driven
    pub const IDLE: Self = Self {
        aw: None,
        w: None,
        b_ready: false,
        ar: None,
        r_ready: false,
    };
}

/// Slave-driven signals for one cycle, decoded from state at the clock edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusOutputs {
    /// AWREADY
    pub aw_ready: bool,
    /// WREADY
    pub w_ready: bool,
    /// BVALID (BRESP is always OKAY)
    pub b_valid: bool,
    /// ARREADY
    pub ar_ready: bool,
    /// RVALID (RRESP is always OKAY)
    pub r_valid: bool,
    /// RDATA, meaningful while `r_valid`
    pub r_data: u32,
}

/// Write channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteState {
    /// Ready for address and data
    #[default]
    Idle,
    /// Address taken, waiting for data
    AddressAccepted {
        /// Word offset
        offset: u32,
    },
    /// Data taken, waiting for the address
    DataAccepted {
        /// Write data
        data: u32,
    },
    /// Write committed, BVALID until BREADY
    Response,
}

/// Read channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadState {
    /// Ready for an address
    #[default]
    Idle,
    /// Register lookup cycle
    Lookup {
        /// Word offset
        offset: u32,
    },
    /// RVALID until RREADY
    Response {
        /// Sampled register value
        data: u32,
    },
}

/// A write that committed this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Word offset
    pub offset: u32,
    /// Data
    pub value: u32,
}

/// Both channels of the slave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusInterface {
    write: WriteState,
    read: ReadState,
}

impl BusInterface {
    /// Both channels idle
    pub const fn new() -> Self {
        Self {
            write: WriteState::Idle,
            read: ReadState::Idle,
        }
    }

    /// Write channel state
    pub const fn write_state(&self) -> WriteState {
        self.write
    }

    /// Read channel state
    pub const fn read_state(&self) -> ReadState {
        self.read
    }

    /// Ready/valid outputs for the current cycle
    pub const fn outputs(&self) -> BusOutputs {
        let (r_valid, r_data) = match self.read {
            ReadState::Response { data } => (true, data),
            _ => (false, 0),
        };
        BusOutputs {
            aw_ready: matches!(self.write, WriteState::Idle | WriteState::DataAccepted { .. }),
            w_ready: matches!(self.write, WriteState::Idle | WriteState::AddressAccepted { .. }),
            b_valid: matches!(self.write, WriteState::Response),
            ar_ready: matches!(self.read, ReadState::Idle),
            r_valid,
            r_data,
        }
    }

    /// Offset the read channel will sample this cycle, if any
    pub const fn pending_lookup(&self) -> Option<u32> {
        match self.read {
            ReadState::Lookup { offset } => Some(offset),
            _ => None,
        }
    }

    /// Clock edge. `lookup` is the register value for [`Self::pending_lookup`].
    /// Returns the write that committed on this edge.
    pub fn step(&mut self, signals: &BusSignals, lookup: Option<u32>) -> Option<RegisterWrite> {
        let commit = self.step_write(signals);
        self.step_read(signals, lookup);
        commit
    }

    /// Return both channels to idle.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn step_write(&mut self, s: &BusSignals) -> Option<RegisterWrite> {
        let (next, commit) = match (self.write, s.aw, s.w) {
            (WriteState::Idle, Some(addr), Some(value)) => (
                WriteState::Response,
                Some(RegisterWrite {
                    offset: regs::word_offset(addr),
                    value,
                }),
            ),
            (WriteState::Idle, Some(addr), None) => (
                WriteState::AddressAccepted {
                    offset: regs::word_offset(addr),
                },
                None,
            ),
            (WriteState::Idle, None, Some(data)) => (WriteState::DataAccepted { data }, None),
            (WriteState::AddressAccepted { offset }, _, Some(value)) => {
                (WriteState::Response, Some(RegisterWrite { offset, value }))
            }
            (WriteState::DataAccepted { data }, Some(addr), _) => (
                WriteState::Response,
                Some(RegisterWrite {
                    offset: regs::word_offset(addr),
                    value: data,
                }),
            ),
            (WriteState::Response, _, _) if s.b_ready => (WriteState::Idle, None),
            (state, _, _) => (state, None),
        };
        self.write = next;
        commit
    }

    fn step_read(&mut self, s: &BusSignals, lookup: Option<u32>) {
        self.read = match self.read {
            ReadState::Idle => match s.ar {
                Some(addr) => ReadState::Lookup {
                    offset: regs::word_offset(addr),
                },
                None => ReadState::Idle,
            },
            ReadState::Lookup { .. } => ReadState::Response {
                data: lookup.unwrap_or(regs::UNMAPPED_SENTINEL),
            },
            ReadState::Response { .. } if s.r_ready => ReadState::Idle,
            state @ ReadState::Response { .. } => state,
        };
    }
}
