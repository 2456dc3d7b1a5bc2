//! Golden backend: the register contract over the functional model.
//!
//! No clock. START takes a frame from the queued words using the core's
//! ingestion rules (up to WINDOW_LENGTH words, cut short by TLAST) and the
//! result block is published as soon as the frame is complete. If the
//! queue runs dry first the backend stays busy until more words arrive,
//! as the core would wait in RECV.

use crate::backend::{BackendType, CoreBackend, Geometry};
use crate::error::Result;
use enose_chip::regs::{self, control};
use enose_chip::stream::{self, Beat};
use enose_core::registers::RegisterFile;
use enose_core::{reference, CoreParams, WeightStore};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Frame {
    window_length: usize,
    words: Vec<u32>,
    ended_by_last: bool,
}

/// Functional backend.
#[derive(Debug)]
pub struct GoldenBackend {
    params: CoreParams,
    weights: Arc<WeightStore>,
    registers: RegisterFile,
    queue: VecDeque<Beat>,
    frame: Option<Frame>,
}

impl GoldenBackend {
    /// Functional model over the weights.
    ///
    /// # Errors
    ///
    /// Returns `Core` if the parameters are invalid or the weight shape
    /// differs from them.
    pub fn new(params: CoreParams, weights: Arc<WeightStore>) -> Result<Self> {
        params.validate()?;
        weights.check_geometry(&params)?;
        info!("Golden backend ready");
        Ok(Self {
            registers: RegisterFile::new(&params),
            params,
            weights,
            queue: VecDeque::new(),
            frame: None,
        })
    }

    fn busy(&self) -> bool {
        self.frame.is_some()
    }

    fn fill(&mut self) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let channels = stream::channel_mask(self.params.n_in);
        while frame.words.len() < frame.window_length && !frame.ended_by_last {
            let Some(beat) = self.queue.pop_front() else {
                return;
            };
            frame.words.push(beat.data & channels);
            frame.ended_by_last = beat.last;
        }
        self.finish();
    }

    fn finish(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        let truncated = frame.words.len() < frame.window_length;
        if truncated {
            debug!("frame ended early by TLAST after {} words", frame.words.len());
            if self.params.flag_truncation {
                self.registers.raise_error();
            }
        }
        let result = reference::window_result(&self.params, &self.weights, &frame.words);
        debug!("golden window: class {} counts {:?}", result.class, result.counts);
        self.registers.publish(result);
    }
}

impl CoreBackend for GoldenBackend {
    fn write_reg(&mut self, offset: u32, value: u32) -> Result<()> {
        match regs::word_offset(offset) {
            regs::CONTROL => {
                if value & control::RESET != 0 {
                    self.frame = None;
                    self.registers.clear();
                }
                if value & control::START != 0 {
                    if self.busy() {
                        warn!("START ignored: window in progress");
                    } else {
                        self.registers.begin();
                        self.frame = Some(Frame {
                            window_length: self.registers.window_length(),
                            words: Vec::new(),
                            ended_by_last: false,
                        });
                        self.fill();
                    }
                }
            }
            regs::WINDOW_LENGTH => {
                if !self.registers.set_window_length(value) {
                    warn!("WINDOW_LENGTH {value} outside 1..={}, ignored", self.params.w_len_max);
                }
            }
            other => debug!("write to {:#x} ignored", other),
        }
        Ok(())
    }

    fn read_reg(&mut self, offset: u32) -> Result<u32> {
        Ok(self.registers.read(offset, self.busy()))
    }

    fn stream_send(&mut self, words: &[u32], last: bool) -> Result<()> {
        let n = words.len();
        self.queue.extend(words.iter().enumerate().map(|(i, &data)| Beat {
            data,
            last: last && i + 1 == n,
        }));
        self.fill();
        Ok(())
    }

    fn advance(&mut self, _cycles: u64) -> Result<()> {
        Ok(())
    }

    fn pending_words(&self) -> usize {
        self.queue.len()
    }

    fn geometry(&self) -> Geometry {
        Geometry::from(&self.params)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Golden
    }
}
