//! Overlay driver against both backends.

use enose_chip::regs::{self, status};
use enose_core::{reference, AccessMode, CoreParams, WeightStore};
use enose_driver::prelude::*;
use enose_driver::select_backend;
use enose_models::memfile::format_mem_bytes;
use enose_models::Artifacts;
use std::fs;
use std::sync::Arc;

fn lcg(seed: u32) -> impl FnMut() -> u32 {
    let mut s = seed;
    move || {
        s = s.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        s >> 16
    }
}

fn weights(params: &CoreParams, seed: u32) -> Arc<WeightStore> {
    let mut next = lcg(seed);
    let w1: Vec<i8> = (0..params.n_in * params.n_hidden)
        .map(|_| (next() % 96) as i8 - 20)
        .collect();
    let w2: Vec<i8> = (0..params.n_hidden * params.n_out)
        .map(|_| (next() % 64) as i8 - 16)
        .collect();
    Arc::new(WeightStore::new(params.n_in, params.n_hidden, params.n_out, w1, w2).expect("weights"))
}

fn masks(n: usize, seed: u32) -> Vec<u32> {
    let mut next = lcg(seed);
    (0..n).map(|_| next() & 0x0FFF).collect()
}

fn emulated(params: &CoreParams, seed: u32) -> OverlayDriver<EmulatedBackend> {
    let backend = EmulatedBackend::new(params.clone(), weights(params, seed)).expect("emulated");
    OverlayDriver::new(backend, DriverConfig::default()).expect("driver")
}

fn golden(params: &CoreParams, seed: u32) -> OverlayDriver<GoldenBackend> {
    let backend = GoldenBackend::new(params.clone(), weights(params, seed)).expect("golden");
    OverlayDriver::new(backend, DriverConfig::default()).expect("driver")
}

#[test]
fn test_backends_agree() {
    let params = CoreParams::default();
    let mut emu = emulated(&params, 7);
    let mut gold = golden(&params, 7);

    for (i, n) in [10usize, 1, 32, 64, 10].into_iter().enumerate() {
        let frame = masks(n, 100 + i as u32);
        let a = emu.infer_from_masks(&frame).expect("emulated inference");
        let b = gold.infer_from_masks(&frame).expect("golden inference");
        assert_eq!(a, b, "window {i} ({n} words)");
        assert_eq!(a.words_received, n as u32);
        assert_eq!(
            u64::from(a.latency_cycles),
            params.latency_cycles(n, n),
            "latency of a back-to-back frame is the closed form"
        );
    }
}

#[test]
fn test_backends_agree_synchronous() {
    let params = CoreParams::default().with_access_mode(AccessMode::Synchronous);
    let mut emu = emulated(&params, 11);
    let mut gold = golden(&params, 11);
    let frame = masks(12, 5);
    let a = emu.infer_from_masks(&frame).expect("emulated");
    let b = gold.infer_from_masks(&frame).expect("golden");
    assert_eq!(a, b);
}

#[test]
fn test_result_matches_reference() {
    let params = CoreParams::default();
    let store = weights(&params, 3);
    let frame = masks(20, 9);
    let mut emu = OverlayDriver::new(
        EmulatedBackend::new(params.clone(), Arc::clone(&store)).expect("emulated"),
        DriverConfig::default(),
    )
    .expect("driver");

    let got = emu.infer_from_masks(&frame).expect("inference");
    let want = reference::window_result(&params, &store, &frame);
    assert_eq!(got.class, want.class);
    assert_eq!(got.counts, want.counts);
    assert_eq!(got.confidence, want.confidence);
    assert_eq!(got.hidden_spikes, want.debug.hidden_spikes);
    assert_eq!(got.status & status::DONE, status::DONE);
    assert_eq!(got.status & status::ERROR, 0);
}

#[test]
fn test_zero_input_is_silent() {
    let params = CoreParams::default();
    let mut emu = emulated(&params, 1);
    let r = emu.infer_from_masks(&[0; 10]).expect("inference");
    assert_eq!(r.counts, [0, 0, 0]);
    assert_eq!(r.class, 0);
    assert_eq!(r.hidden_spikes, 0);
    assert_eq!(r.confidence, 0);
}

#[test]
fn test_spike_vectors() {
    let params = CoreParams::default();
    let mut gold = golden(&params, 4);
    let spikes = vec![[true, false, true, false, false, false, false, false, false, false, false, true]; 6];
    let by_spikes = gold.infer_from_spikes(&spikes).expect("spikes");
    let by_masks = gold.infer_from_masks(&[0b1000_0000_0101; 6]).expect("masks");
    assert_eq!(by_spikes, by_masks);
}

#[test]
fn test_short_frame_without_flag_completes() {
    let params = CoreParams::default();
    let mut emu = emulated(&params, 2);
    emu.set_window_length(16).expect("window");
    let frame = masks(5, 1);
    let r = emu.infer_frame(&frame).expect("inference");
    assert_eq!(r.words_received, 5);
    assert_eq!(emu.window_length(), 16);
}

#[test]
fn test_short_frame_with_flag_is_device_error() {
    let params = CoreParams::default().with_flag_truncation(true);
    for mut driver in [
        Box::new(emulated(&params, 2)) as Box<dyn Overlay>,
        Box::new(golden(&params, 2)) as Box<dyn Overlay>,
    ] {
        driver.window(16);
        match driver.frame(&masks(5, 1)) {
            Err(DriverError::DeviceError { status: s }) => {
                assert_ne!(s & status::ERROR, 0);
                assert_ne!(s & status::DONE, 0);
            }
            other => panic!("expected device error, got {other:?}"),
        }
        // the next full window clears the error
        let r = driver.frame(&masks(16, 1)).expect("full window");
        assert_eq!(r.status & status::ERROR, 0);
    }
}

trait Overlay {
    fn window(&mut self, n: usize);
    fn frame(&mut self, words: &[u32]) -> Result<InferenceResult>;
}

impl<B: CoreBackend> Overlay for OverlayDriver<B> {
    fn window(&mut self, n: usize) {
        self.set_window_length(n).expect("window");
    }

    fn frame(&mut self, words: &[u32]) -> Result<InferenceResult> {
        self.infer_frame(words)
    }
}

#[test]
fn test_invalid_input_rejected() {
    let params = CoreParams::default();
    let mut gold = golden(&params, 1);
    assert!(matches!(gold.infer_from_masks(&[]), Err(DriverError::InvalidInput { .. })));
    assert!(matches!(
        gold.infer_from_masks(&[0; 65]),
        Err(DriverError::InvalidInput { .. })
    ));
    assert!(matches!(
        gold.infer_from_masks(&[1 << 12]),
        Err(DriverError::InvalidInput { .. })
    ));
    assert!(matches!(gold.set_window_length(0), Err(DriverError::InvalidInput { .. })));
    assert!(matches!(gold.set_window_length(65), Err(DriverError::InvalidInput { .. })));
    let spikes = vec![vec![false; 13]; 4];
    assert!(matches!(
        gold.infer_from_spikes(&spikes),
        Err(DriverError::InvalidInput { .. })
    ));
    assert_eq!(gold.backend().pending_words(), 0, "rejected input never reaches the stream");
}

#[test]
fn test_poll_timeout() {
    let params = CoreParams::default();
    let backend = EmulatedBackend::new(params.clone(), weights(&params, 1)).expect("emulated");
    let config = DriverConfig {
        poll_limit: 2,
        cycles_per_poll: 1,
    };
    let mut driver = OverlayDriver::new(backend, config).expect("driver");
    match driver.infer_from_masks(&masks(10, 3)) {
        Err(DriverError::Timeout { cycles }) => assert_eq!(cycles, 2),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn test_geometry_registers() {
    let params = CoreParams::default();
    for mut backend in [
        select_backend(BackendSelection::Emulated, params.clone(), weights(&params, 1)).expect("emulated"),
        select_backend(BackendSelection::Golden, params.clone(), weights(&params, 1)).expect("golden"),
    ] {
        assert_eq!(backend.read_reg(regs::N_IN).expect("read"), 12);
        assert_eq!(backend.read_reg(regs::N_HIDDEN).expect("read"), 32);
        assert_eq!(backend.read_reg(regs::N_OUT).expect("read"), 3);
        assert_eq!(backend.read_reg(regs::WINDOW_LENGTH).expect("read"), 10);
        assert_eq!(backend.read_reg(0x40).expect("read"), regs::UNMAPPED_SENTINEL);
    }
}

#[test]
fn test_open_from_artifacts() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("params_rtl.json"),
        r#"{"n_in": 12, "n_hidden": 32, "n_out": 3, "window_len": 10,
            "leak_h_shift": 4, "leak_o_shift": 4, "th_h": 64, "th_o": 64}"#,
    )
    .expect("params");
    let w1: Vec<i8> = (0..12 * 32).map(|i| (i % 50) as i8).collect();
    let w2: Vec<i8> = (0..32 * 3).map(|i| (i % 40) as i8 - 10).collect();
    fs::write(dir.path().join("w1.mem"), format_mem_bytes(&w1, None)).expect("w1");
    fs::write(dir.path().join("w2.mem"), format_mem_bytes(&w2, None)).expect("w2");

    let artifacts = Artifacts::load(dir.path()).expect("artifacts");
    let mut emu = OverlayDriver::open(&artifacts, BackendSelection::Emulated, DriverConfig::default())
        .expect("emulated");
    let mut gold = OverlayDriver::open(&artifacts, BackendSelection::Golden, DriverConfig::default())
        .expect("golden");
    assert_eq!(emu.backend().backend_type(), BackendType::Emulated);
    assert_eq!(gold.backend().backend_type(), BackendType::Golden);

    let frame = [0x0FFF; 10];
    let a = emu.infer_from_masks(&frame).expect("emulated");
    let b = gold.infer_from_masks(&frame).expect("golden");
    assert_eq!(a, b);
    assert!(a.counts.iter().any(|&c| c > 0));
}
