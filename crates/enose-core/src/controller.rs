//! Window controller: the state machine that sequences one inference.
//!
//! ```text
//!            start
//!   IDLE ───────────▶ RECV ──(window full | TLAST)──▶ HIDDEN ──▶ OUTPUT ──▶ NEXT_T
//!    ▲                                                  ▲                      │
//!    │                                                  └──── more timesteps ──┤
//!    └──────────────────────────── DONE ◀──────────────── window finished ─────┘
//! ```
//!
//! HIDDEN and OUTPUT walk every neuron of their layer and, for each neuron,
//! every fan-in weight through the weight port, whether or not the input
//! spiked. Per neuron the controller spends `fan_in × access_cycles`
//! cycles on weights and one cycle on the fire-or-leak update, so the cycle
//! count of a window never depends on weights or spike content.
//!
//! Reset is not a state: [`WindowController::reset`] forces IDLE from
//! anywhere and rebuilds the neuron state.

use crate::diagnostics::{DebugCounters, LatencyCounter};
use crate::neuron::{Accumulator, NeuronState};
use crate::params::{AccessMode, CoreParams};
use crate::result::WindowResult;
use crate::stream_buffer::{Ingest, StreamBuffer};
use crate::weights::{Matrix, WeightPort, WeightStore};
use enose_chip::stream::{self, Beat};
use tracing::{debug, trace, warn};

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for START
    #[default]
    Idle,
    /// Ingesting spike words
    Recv,
    /// Hidden layer sweep of the current timestep
    Hidden,
    /// Output layer sweep of the current timestep
    Output,
    /// Timestep bookkeeping
    NextT,
    /// Latching results
    Done,
}

impl Phase {
    /// True in the states billed to LATENCY_CYCLES
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle | Self::Done)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "IDLE",
            Self::Recv => "RECV",
            Self::Hidden => "HIDDEN",
            Self::Output => "OUTPUT",
            Self::NextT => "NEXT_T",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Sub-step of a layer sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    /// Present the weight address (or look it up, synchronous mode)
    #[default]
    Issue,
    /// Block RAM latency
    Wait,
    /// Take the weight and accumulate it if the input spiked
    Consume,
    /// Leak, integrate and threshold the neuron
    Fire,
}

/// Position within a layer sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerCursor {
    /// Neuron being computed
    pub neuron: usize,
    /// Fan-in index being read
    pub input: usize,
    /// Sub-step
    pub step: Step,
    /// Weighted input gathered so far
    pub acc: Accumulator,
}

/// Notable transitions reported to the register interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// IDLE → RECV
    Started {
        /// Window length snapshotted for this inference
        window_length: usize,
    },
    /// RECV → HIDDEN
    FrameComplete {
        /// Words received
        words: usize,
        /// TLAST ended the frame before the window filled
        truncated: bool,
        /// Reserved bits seen on the accepted words
        reserved_bits: u32,
    },
    /// DONE → IDLE with the latched result
    Finished(WindowResult),
}

/// What happened during one controller cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    /// The offered stream beat was stored
    pub accepted: bool,
    /// Transition worth reporting
    pub event: Option<Event>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Hidden,
    Output,
}

/// Sequencer owning the neuron state, the stream buffer and the weight port.
#[derive(Debug, Clone)]
pub struct WindowController {
    params: CoreParams,
    phase: Phase,
    cursor: LayerCursor,
    timestep: usize,
    window_length: usize,
    buffer: StreamBuffer,
    neurons: NeuronState,
    port: WeightPort,
    latency: LatencyCounter,
}

impl WindowController {
    /// Idle controller for validated parameters
    pub fn new(params: &CoreParams) -> Self {
        Self {
            params: params.clone(),
            phase: Phase::Idle,
            cursor: LayerCursor::default(),
            timestep: 0,
            window_length: 0,
            buffer: StreamBuffer::new(params.w_len_max, params.n_in),
            neurons: NeuronState::new(params.n_hidden, params.n_out),
            port: WeightPort::new(),
            latency: LatencyCounter::new(),
        }
    }

    /// Current state
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Position within the current layer sweep
    pub const fn cursor(&self) -> LayerCursor {
        self.cursor
    }

    /// Timestep index within the window
    pub const fn timestep(&self) -> usize {
        self.timestep
    }

    /// Window length snapshotted at START
    pub const fn window_length(&self) -> usize {
        self.window_length
    }

    /// Neuron state of the inference in flight
    pub const fn neurons(&self) -> &NeuronState {
        &self.neurons
    }

    /// Stream buffer
    pub const fn buffer(&self) -> &StreamBuffer {
        &self.buffer
    }

    /// Weight read port
    pub const fn port(&self) -> &WeightPort {
        &self.port
    }

    /// Latency counter of the inference in flight
    pub const fn latency(&self) -> LatencyCounter {
        self.latency
    }

    /// TREADY: asserted only in RECV while the frame has room
    pub fn stream_ready(&self) -> bool {
        self.phase == Phase::Recv && self.buffer.is_ready()
    }

    /// Force IDLE and rebuild all transient state. Weights and the
    /// configured window length live elsewhere and are untouched.
    pub fn reset(&mut self) {
        if self.phase != Phase::Idle {
            debug!("controller reset from {}", self.phase);
        }
        self.phase = Phase::Idle;
        self.cursor = LayerCursor::default();
        self.timestep = 0;
        self.window_length = 0;
        self.buffer.close();
        self.neurons = NeuronState::new(self.params.n_hidden, self.params.n_out);
        self.port.reset();
        self.latency.clear();
    }

    /// Advance one clock cycle.
    ///
    /// `start` carries the window length when a START pulse reached the
    /// controller this cycle; `beat` is the stream beat on offer.
    pub fn tick(&mut self, weights: &WeightStore, start: Option<usize>, beat: Option<Beat>) -> TickReport {
        let waiting = self.phase == Phase::Recv && self.buffer.received() == 0 && beat.is_none();
        self.latency.observe(self.phase.is_active(), waiting);

        match self.phase {
            Phase::Idle => match start {
                Some(window_length) if self.params.window_length_valid(window_length) => {
                    self.begin(window_length);
                    TickReport {
                        accepted: false,
                        event: Some(Event::Started { window_length }),
                    }
                }
                _ => TickReport::default(),
            },
            Phase::Recv => self.receive(beat),
            Phase::Hidden => {
                self.layer_cycle(weights, Layer::Hidden);
                TickReport::default()
            }
            Phase::Output => {
                self.layer_cycle(weights, Layer::Output);
                TickReport::default()
            }
            Phase::NextT => {
                self.next_timestep();
                TickReport::default()
            }
            Phase::Done => TickReport {
                accepted: false,
                event: Some(Event::Finished(self.finish())),
            },
        }
    }

    fn begin(&mut self, window_length: usize) {
        self.neurons = NeuronState::new(self.params.n_hidden, self.params.n_out);
        self.buffer.open(window_length);
        self.port.reset();
        self.latency.clear();
        self.cursor = LayerCursor::default();
        self.timestep = 0;
        self.window_length = window_length;
        self.phase = Phase::Recv;
        debug!("IDLE → RECV, window {window_length}");
    }

    fn receive(&mut self, beat: Option<Beat>) -> TickReport {
        let Some(beat) = beat else {
            return TickReport::default();
        };
        match self.buffer.accept(beat) {
            None => TickReport::default(),
            Some(Ingest::Continue) => {
                trace!("rx[{}] = {:#x}", self.buffer.received() - 1, beat.data);
                TickReport {
                    accepted: true,
                    event: None,
                }
            }
            Some(Ingest::Complete { truncated }) => {
                let words = self.buffer.received();
                self.cursor = LayerCursor::default();
                self.timestep = 0;
                self.phase = Phase::Hidden;
                debug!("RECV → HIDDEN after {words} words (truncated: {truncated})");
                TickReport {
                    accepted: true,
                    event: Some(Event::FrameComplete {
                        words,
                        truncated,
                        reserved_bits: self.buffer.reserved_seen(),
                    }),
                }
            }
        }
    }

    fn layer_cycle(&mut self, weights: &WeightStore, layer: Layer) {
        let (matrix, fan_in, width) = match layer {
            Layer::Hidden => (Matrix::W1, self.params.n_in, self.params.n_hidden),
            Layer::Output => (Matrix::W2, self.params.n_hidden, self.params.n_out),
        };
        let mut c = self.cursor;

        match c.step {
            Step::Issue => {
                let index = match layer {
                    Layer::Hidden => weights.w1_index(c.input, c.neuron),
                    Layer::Output => weights.w2_index(c.input, c.neuron),
                };
                match self.params.access_mode {
                    AccessMode::Pipelined => {
                        self.port.issue(matrix, index);
                        c.step = Step::Wait;
                    }
                    AccessMode::Synchronous => {
                        let w = self.port.lookup(weights, matrix, index);
                        self.accumulate(&mut c, layer, w, fan_in);
                    }
                }
            }
            Step::Wait => {
                self.port.settle(weights);
                c.step = Step::Consume;
            }
            Step::Consume => match self.port.consume() {
                Some(w) => self.accumulate(&mut c, layer, w, fan_in),
                None => {
                    warn!(
                        "weight port empty at consume ({layer:?} neuron {} input {}), reissuing",
                        c.neuron, c.input
                    );
                    c.step = Step::Issue;
                }
            },
            Step::Fire => {
                match layer {
                    Layer::Hidden => {
                        self.neurons.update_hidden(c.neuron, c.acc, self.params.hidden);
                    }
                    Layer::Output => {
                        self.neurons.update_output(c.neuron, c.acc, self.params.output);
                    }
                }
                c = LayerCursor {
                    neuron: c.neuron + 1,
                    ..LayerCursor::default()
                };
                if c.neuron == width {
                    c = LayerCursor::default();
                    self.phase = match layer {
                        Layer::Hidden => Phase::Output,
                        Layer::Output => Phase::NextT,
                    };
                }
            }
        }
        self.cursor = c;
    }

    fn accumulate(&self, c: &mut LayerCursor, layer: Layer, w: i8, fan_in: usize) {
        let active = match layer {
            Layer::Hidden => stream::is_active(self.buffer.word(self.timestep), c.input),
            Layer::Output => self.neurons.h_spikes.get(c.input).copied().unwrap_or(false),
        };
        if active {
            c.acc = c.acc.wrapping_add(Accumulator::from(w));
        }
        c.input += 1;
        c.step = if c.input == fan_in { Step::Fire } else { Step::Issue };
    }

    fn next_timestep(&mut self) {
        trace!(
            "t={} done, out_count={:?}",
            self.timestep,
            self.neurons.out_count
        );
        self.neurons.clear_hidden_spikes();
        if self.timestep + 1 < self.buffer.received() {
            self.timestep += 1;
            self.phase = Phase::Hidden;
        } else {
            self.phase = Phase::Done;
        }
    }

    fn finish(&mut self) -> WindowResult {
        let result = WindowResult {
            latency_cycles: self.latency.register_value(),
            debug: DebugCounters {
                words_received: u32::try_from(self.buffer.received()).unwrap_or(u32::MAX),
                hidden_spikes: self.neurons.hidden_spike_total,
            },
            ..WindowResult::from_counts(&self.neurons.out_count, self.params.confidence)
        };
        self.phase = Phase::Idle;
        debug!(
            "DONE → IDLE: class {} counts {:?} latency {}",
            result.class, result.counts, result.latency_cycles
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> (CoreParams, WeightStore) {
        let params = CoreParams::default().with_geometry(2, 2, 2);
        let weights = WeightStore::from_fn(2, 2, 2, |_, _| 40, |h, o| if o == 0 { 64 } else { h as i8 });
        (params, weights)
    }

    fn run(ctrl: &mut WindowController, w: &WeightStore, words: &[Beat]) -> WindowResult {
        ctrl.tick(w, Some(words.len()), None);
        let mut feed = words.iter().copied();
        let mut next = feed.next();
        for _ in 0..10_000 {
            let offer = if ctrl.stream_ready() { next } else { None };
            let report = ctrl.tick(w, None, offer);
            if report.accepted {
                next = feed.next();
            }
            if let Some(Event::Finished(r)) = report.event {
                return r;
            }
        }
        panic!("window never finished");
    }

    #[test]
    fn start_moves_to_recv_only_from_idle() {
        let (p, w) = small();
        let mut ctrl = WindowController::new(&p);
        assert!(!ctrl.stream_ready());
        let report = ctrl.tick(&w, Some(3), None);
        assert_eq!(report.event, Some(Event::Started { window_length: 3 }));
        assert_eq!(ctrl.phase(), Phase::Recv);
        assert!(ctrl.stream_ready());
    }

    #[test]
    fn invalid_window_length_does_not_start() {
        let (p, w) = small();
        let mut ctrl = WindowController::new(&p);
        ctrl.tick(&w, Some(0), None);
        assert_eq!(ctrl.phase(), Phase::Idle);
        ctrl.tick(&w, Some(p.w_len_max + 1), None);
        assert_eq!(ctrl.phase(), Phase::Idle);
    }

    #[test]
    fn pipelined_access_walks_issue_wait_consume_fire() {
        let (p, w) = small();
        let mut ctrl = WindowController::new(&p);
        ctrl.tick(&w, Some(1), None);
        ctrl.tick(&w, None, Some(Beat::word(0b11)));
        assert_eq!(ctrl.phase(), Phase::Hidden);

        let mut steps = Vec::new();
        for _ in 0..7 {
            steps.push(ctrl.cursor().step);
            ctrl.tick(&w, None, None);
        }
        use Step::*;
        assert_eq!(steps, vec![Issue, Wait, Consume, Issue, Wait, Consume, Fire]);
        assert_eq!(ctrl.cursor().neuron, 1);
        assert_eq!(ctrl.neurons().vh[0], 0, "80 >= 64 fired and reset");
        assert!(ctrl.neurons().h_spikes[0]);
    }

    #[test]
    fn empty_port_at_consume_reissues() {
        let (p, w) = small();
        let mut ctrl = WindowController::new(&p);
        ctrl.tick(&w, Some(1), None);
        ctrl.tick(&w, None, Some(Beat::word(0b11)));
        assert_eq!(ctrl.phase(), Phase::Hidden);

        ctrl.cursor.step = Step::Consume;
        ctrl.tick(&w, None, None);
        assert_eq!(ctrl.cursor().step, Step::Issue);
        assert_eq!(ctrl.cursor().input, 0, "no weight was accumulated");
        assert_eq!(ctrl.cursor().acc, 0);

        // the reissued access completes normally
        for _ in 0..3 {
            ctrl.tick(&w, None, None);
        }
        assert_eq!(ctrl.cursor().input, 1);
        assert_eq!(ctrl.cursor().acc, 40);
    }

    #[test]
    fn full_window_result() {
        let (p, w) = small();
        let mut ctrl = WindowController::new(&p);
        let r = run(&mut ctrl, &w, &[Beat::word(0b11), Beat::word(0b11)]);
        // Both hidden fire every step; output 0 gets 128, output 1 gets 0+1
        assert_eq!(r.counts, [2, 0, 0]);
        assert_eq!(r.class, 0);
        assert_eq!(
            r.debug,
            DebugCounters {
                words_received: 2,
                hidden_spikes: 4
            }
        );
        assert_eq!(u64::from(r.latency_cycles), p.latency_cycles(2, 2));
        assert_eq!(ctrl.phase(), Phase::Idle);
    }

    #[test]
    fn reset_clears_everything() {
        let (p, w) = small();
        let mut ctrl = WindowController::new(&p);
        ctrl.tick(&w, Some(2), None);
        ctrl.tick(&w, None, Some(Beat::last(0b01)));
        for _ in 0..5 {
            ctrl.tick(&w, None, None);
        }
        ctrl.reset();
        assert_eq!(ctrl.phase(), Phase::Idle);
        assert!(ctrl.neurons().is_zero());
        assert_eq!(ctrl.buffer().received(), 0);
        assert_eq!(ctrl.latency().cycles(), 0);
        assert_eq!(ctrl.cursor(), LayerCursor::default());
    }
}
