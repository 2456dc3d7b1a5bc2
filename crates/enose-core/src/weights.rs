//! Weight store: two immutable signed 8-bit matrices behind a latency-bearing
//! read port.
//!
//! W1 is row-major `[n_in][n_hidden]`, W2 row-major `[n_hidden][n_out]`.
//! Both are addressed by a single composite `row * cols + col` index, the
//! same layout the `.mem`/`.coe` block-RAM images use.
//!
//! The block RAM has one cycle of read latency, so a pipelined access goes
//! through three tagged states on [`WeightPort`]:
//!
//! ```text
//!   Idle ──issue(idx)──▶ Issued ──settle()──▶ Settled(w) ──consume()──▶ Idle
//! ```
//!
//! A synchronous access collapses the three into [`WeightPort::lookup`].

use crate::error::{CoreError, Result};
use crate::params::CoreParams;

/// Selects one of the two weight memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Matrix {
    /// Input → hidden, `[n_in][n_hidden]`
    W1,
    /// Hidden → output, `[n_hidden][n_out]`
    W2,
}

impl std::fmt::Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::W1 => write!(f, "W1"),
            Self::W2 => write!(f, "W2"),
        }
    }
}

/// Immutable quantized weights, loaded once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightStore {
    n_in: usize,
    n_hidden: usize,
    n_out: usize,
    w1: Box<[i8]>,
    w2: Box<[i8]>,
}

impl WeightStore {
    /// Build the store from flattened row-major matrices.
    ///
    /// # Errors
    ///
    /// Returns `WeightShape` if either matrix length disagrees with the
    /// geometry.
    pub fn new(n_in: usize, n_hidden: usize, n_out: usize, w1: Vec<i8>, w2: Vec<i8>) -> Result<Self> {
        let expected_w1 = n_in * n_hidden;
        let expected_w2 = n_hidden * n_out;
        if w1.len() != expected_w1 {
            return Err(CoreError::WeightShape {
                matrix: Matrix::W1,
                expected: expected_w1,
                got: w1.len(),
            });
        }
        if w2.len() != expected_w2 {
            return Err(CoreError::WeightShape {
                matrix: Matrix::W2,
                expected: expected_w2,
                got: w2.len(),
            });
        }
        Ok(Self {
            n_in,
            n_hidden,
            n_out,
            w1: w1.into_boxed_slice(),
            w2: w2.into_boxed_slice(),
        })
    }

    /// Build the store from per-element generators.
    ///
    /// `w1(i, j)` gives the weight from input `i` to hidden `j`,
    /// `w2(h, o)` from hidden `h` to output `o`.
    pub fn from_fn(
        n_in: usize,
        n_hidden: usize,
        n_out: usize,
        w1: impl Fn(usize, usize) -> i8,
        w2: impl Fn(usize, usize) -> i8,
    ) -> Self {
        let w1: Box<[i8]> = (0..n_in)
            .flat_map(|i| (0..n_hidden).map(move |j| (i, j)))
            .map(|(i, j)| w1(i, j))
            .collect();
        let w2: Box<[i8]> = (0..n_hidden)
            .flat_map(|h| (0..n_out).map(move |o| (h, o)))
            .map(|(h, o)| w2(h, o))
            .collect();
        Self {
            n_in,
            n_hidden,
            n_out,
            w1,
            w2,
        }
    }

    /// Fail unless the store matches the layer widths of `params`
    ///
    /// # Errors
    ///
    /// Returns `WeightShape` naming the first matrix that disagrees.
    pub fn check_geometry(&self, params: &CoreParams) -> Result<()> {
        if (self.n_in, self.n_hidden) != (params.n_in, params.n_hidden) {
            return Err(CoreError::WeightShape {
                matrix: Matrix::W1,
                expected: params.n_in * params.n_hidden,
                got: self.w1.len(),
            });
        }
        if self.n_out != params.n_out {
            return Err(CoreError::WeightShape {
                matrix: Matrix::W2,
                expected: params.n_hidden * params.n_out,
                got: self.w2.len(),
            });
        }
        Ok(())
    }

    /// All-zero weights for a geometry
    pub fn zeros(n_in: usize, n_hidden: usize, n_out: usize) -> Self {
        Self::from_fn(n_in, n_hidden, n_out, |_, _| 0, |_, _| 0)
    }

    /// `(n_in, n_hidden, n_out)`
    pub const fn shape(&self) -> (usize, usize, usize) {
        (self.n_in, self.n_hidden, self.n_out)
    }

    /// Number of entries in a matrix
    pub fn depth(&self, matrix: Matrix) -> usize {
        self.matrix(matrix).len()
    }

    /// Flattened contents of a matrix
    pub fn matrix(&self, matrix: Matrix) -> &[i8] {
        match matrix {
            Matrix::W1 => &self.w1,
            Matrix::W2 => &self.w2,
        }
    }

    /// Composite address of `W1[input][hidden]`
    pub const fn w1_index(&self, input: usize, hidden: usize) -> usize {
        input * self.n_hidden + hidden
    }

    /// Composite address of `W2[hidden][output]`
    pub const fn w2_index(&self, hidden: usize, output: usize) -> usize {
        hidden * self.n_out + output
    }

    /// Read one entry by composite address.
    ///
    /// Addresses past the end read as zero, like an unused block-RAM word.
    pub fn read(&self, matrix: Matrix, index: usize) -> i8 {
        self.matrix(matrix).get(index).copied().unwrap_or_default()
    }

    /// `W1[input][hidden]`
    pub fn w1(&self, input: usize, hidden: usize) -> i8 {
        self.read(Matrix::W1, self.w1_index(input, hidden))
    }

    /// `W2[hidden][output]`
    pub fn w2(&self, hidden: usize, output: usize) -> i8 {
        self.read(Matrix::W2, self.w2_index(hidden, output))
    }
}

/// State of the block-RAM read port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortState {
    /// No access in flight
    #[default]
    Idle,
    /// Address presented, data not yet valid
    Issued {
        /// Memory being read
        matrix: Matrix,
        /// Composite address
        index: usize,
    },
    /// Data valid on the output register
    Settled {
        /// Word read
        value: i8,
    },
}

/// Read port of the weight store with one cycle of latency.
#[derive(Debug, Clone, Default)]
pub struct WeightPort {
    state: PortState,
}

impl WeightPort {
    /// Idle port
    pub const fn new() -> Self {
        Self {
            state: PortState::Idle,
        }
    }

    /// Current port state
    pub const fn state(&self) -> PortState {
        self.state
    }

    /// Phase 1: present an address. Any access in flight is abandoned.
    pub fn issue(&mut self, matrix: Matrix, index: usize) {
        self.state = PortState::Issued { matrix, index };
    }

    /// Phase 2: the memory output register captures the addressed word.
    pub fn settle(&mut self, store: &WeightStore) {
        if let PortState::Issued { matrix, index } = self.state {
            self.state = PortState::Settled {
                value: store.read(matrix, index),
            };
        }
    }

    /// Phase 3: take the settled word. `None` if nothing has settled.
    pub fn consume(&mut self) -> Option<i8> {
        match self.state {
            PortState::Settled { value } => {
                self.state = PortState::Idle;
                Some(value)
            }
            _ => None,
        }
    }

    /// Collapsed single-cycle access
    pub fn lookup(&mut self, store: &WeightStore, matrix: Matrix, index: usize) -> i8 {
        self.state = PortState::Idle;
        store.read(matrix, index)
    }

    /// Drop any access in flight
    pub fn reset(&mut self) {
        self.state = PortState::Idle;
    }
}
