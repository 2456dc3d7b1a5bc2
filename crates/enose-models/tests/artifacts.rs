//! Artifact directories on disk.

use enose_core::{reference, CoreParams, Matrix};
use enose_models::memfile::{format_mem_bytes, format_mem_words};
use enose_models::{load_masks, load_test_vectors, Artifacts, ModelError};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

fn ramp(n: usize, offset: i32) -> Vec<i8> {
    (0..n).map(|i| ((i as i32 * 7 + offset) % 90 - 30) as i8).collect()
}

fn write_rtl_dir(dir: &Path) {
    fs::write(
        dir.join("params_rtl.json"),
        r#"{"n_in": 12, "n_hidden": 32, "n_out": 3, "window_len": 10,
            "leak_h_shift": 4, "leak_o_shift": 4, "th_h": 64, "th_o": 64}"#,
    )
    .expect("write params");
    fs::write(dir.join("w1.mem"), format_mem_bytes(&ramp(12 * 32, 5), Some("W1[12,32]"))).expect("write w1");
    fs::write(dir.join("w2.mem"), format_mem_bytes(&ramp(32 * 3, 40), Some("W2[32,3]"))).expect("write w2");
}

fn coe(values: &[i8]) -> String {
    let mut s = String::from("; generated\nmemory_initialization_radix=16;\nmemory_initialization_vector=\n");
    for (i, v) in values.iter().enumerate() {
        let sep = if i + 1 == values.len() { ';' } else { ',' };
        writeln!(s, "{:02X}{sep}", *v as u8).expect("fmt");
    }
    s
}

#[test]
fn test_load_rtl_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_rtl_dir(dir.path());

    let art = Artifacts::load(dir.path()).expect("load");
    assert_eq!(art.rtl.n_hidden, 32);
    assert_eq!(art.w1.matrix, Matrix::W1);
    assert_eq!(art.w1.depth(), 384);

    let params = art.core_params();
    assert_eq!(params, CoreParams::default());
    let store = art.weight_store().expect("store");
    assert_eq!(store.w1(0, 0), ramp(1, 5)[0]);
    assert_eq!(store.w2(31, 2), ramp(96, 40)[95]);
    assert_eq!(art.class_name(1), "class 1");
}

#[test]
fn test_load_training_export_with_coe() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("params.json"),
        r#"{
            "snn_config": {"window_len": 16, "leak_h_shift": 3, "leak_o_shift": 4, "th_h": 0.64, "th_o": 0.32},
            "classes": ["air", "coffee", "vinegar"],
            "features": ["gas", "temp", "hum", "pres", "xadc0", "xadc1"],
            "quant": {"w1_scale": 0.01, "w2_scale": 0.01, "format": "int8"},
            "shapes": {"W1": [12, 32], "W2": [32, 3]}
        }"#,
    )
    .expect("write params");
    fs::write(dir.path().join("w1.coe"), coe(&ramp(384, 0))).expect("w1");
    fs::write(dir.path().join("w2.coe"), coe(&ramp(96, 1))).expect("w2");

    let art = Artifacts::load(dir.path()).expect("load");
    assert_eq!((art.rtl.th_h, art.rtl.th_o), (64, 32));
    assert_eq!(art.rtl.leak_h_shift, 3);
    assert_eq!(art.class_name(2), "vinegar");
    let params = art.core_params();
    assert_eq!(params.default_window_length, 16);
    assert!(params.validate().is_ok());
    assert_eq!(art.weight_store().expect("store").w1(11, 31), ramp(384, 0)[383]);
}

#[test]
fn test_rtl_params_preferred() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_rtl_dir(dir.path());
    fs::write(dir.path().join("params.json"), "not json").expect("write");
    assert!(Artifacts::load(dir.path()).is_ok());
}

#[test]
fn test_missing_weights() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_rtl_dir(dir.path());
    fs::remove_file(dir.path().join("w2.mem")).expect("rm");
    match Artifacts::load(dir.path()) {
        Err(ModelError::FileNotFound { path }) => assert!(path.ends_with("w2.mem")),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}

#[test]
fn test_short_weight_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_rtl_dir(dir.path());
    fs::write(dir.path().join("w1.mem"), format_mem_bytes(&[0; 100], None)).expect("write");
    assert!(matches!(Artifacts::load(dir.path()), Err(ModelError::Shape { .. })));
}

#[test]
fn test_bad_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_rtl_dir(dir.path());
    fs::write(dir.path().join("params_rtl.json"), "{\"n_in\": 12}").expect("write");
    assert!(matches!(Artifacts::load(dir.path()), Err(ModelError::Json { .. })));
}

#[test]
fn test_vectors_from_reference() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_rtl_dir(dir.path());
    let art = Artifacts::load(dir.path()).expect("load");
    let params = art.core_params();
    let store = art.weight_store().expect("store");

    let mut text = String::from("# generated\n");
    let cases = enose_models::vectors::standard_patterns(params.n_in, 10);
    for (id, (_, masks)) in cases.iter().enumerate() {
        let inf = reference::infer(&params, &store, masks);
        writeln!(
            text,
            "TEST {id} LABEL -1 EXPECTED_CLASS {} COUNTS {} {} {}",
            inf.class, inf.counts[0], inf.counts[1], inf.counts[2]
        )
        .expect("fmt");
        for m in masks {
            writeln!(text, "MASK {m:03X}").expect("fmt");
        }
        text.push_str("END\n\n");
    }
    let path = dir.path().join("test_vectors.txt");
    fs::write(&path, text).expect("write");

    let vectors = load_test_vectors(&path).expect("vectors");
    assert_eq!(vectors.len(), cases.len());
    for v in &vectors {
        let inf = reference::infer(&params, &store, &v.masks);
        assert_eq!(inf.class as u32, v.expected_class, "vector {}", v.id);
        assert_eq!(inf.counts, v.expected_counts.to_vec(), "vector {}", v.id);
    }
}

#[test]
fn test_spike_mem_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("spikes.mem");
    fs::write(&path, format_mem_words(&[0xFFF, 0, 0x555], Some("tc: 3 words"))).expect("write");
    assert_eq!(load_masks(&path).expect("masks"), vec![0xFFF, 0, 0x555]);
    assert!(matches!(
        load_masks(dir.path().join("absent.mem")),
        Err(ModelError::FileNotFound { .. })
    ));
}
