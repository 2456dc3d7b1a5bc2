// SPDX-License-Identifier: AGPL-3.0-only

//! Artifact directories: parameters plus the two weight memories.
//!
//! A directory is recognised in either of two layouts:
//!
//! | File | Layout |
//! |------|--------|
//! | `params_rtl.json` | integer LIF parameters, used as is |
//! | `params.json` | training export; thresholds quantised with the weight scales |
//! | `w1.mem` / `w1.coe` / `weights_w1.hex` | W1, `[n_in][n_hidden]` row-major |
//! | `w2.mem` / `w2.coe` / `weights_w2.hex` | W2, `[n_hidden][n_out]` row-major |
//!
//! `params_rtl.json` wins when both parameter files are present.

use crate::error::{ModelError, Result};
use crate::weights::{build_store, WeightImage};
use enose_core::{CoreParams, LifParams, Matrix, WeightStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Integer parameters the bitstream is synthesised with (`params_rtl.json`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtlParams {
    /// Input channels
    pub n_in: usize,
    /// Hidden neurons
    pub n_hidden: usize,
    /// Output classes
    pub n_out: usize,
    /// Default window length
    pub window_len: usize,
    /// Hidden leak shift
    pub leak_h_shift: u8,
    /// Output leak shift
    pub leak_o_shift: u8,
    /// Hidden threshold
    pub th_h: i16,
    /// Output threshold
    pub th_o: i16,
}

impl Default for RtlParams {
    fn default() -> Self {
        Self::from(&CoreParams::default())
    }
}

impl From<&CoreParams> for RtlParams {
    fn from(p: &CoreParams) -> Self {
        Self {
            n_in: p.n_in,
            n_hidden: p.n_hidden,
            n_out: p.n_out,
            window_len: p.default_window_length,
            leak_h_shift: p.hidden.leak_shift,
            leak_o_shift: p.output.leak_shift,
            th_h: p.hidden.threshold,
            th_o: p.output.threshold,
        }
    }
}

impl RtlParams {
    /// Core parameters for these values. `w_len_max` grows to cover
    /// `window_len` if needed; everything else keeps its default.
    pub fn to_core_params(&self) -> CoreParams {
        let base = CoreParams::default();
        let w_len_max = base.w_len_max.max(self.window_len);
        base.with_geometry(self.n_in, self.n_hidden, self.n_out)
            .with_w_len_max(w_len_max)
            .with_default_window_length(self.window_len)
            .with_hidden(LifParams::new(self.leak_h_shift, self.th_h))
            .with_output(LifParams::new(self.leak_o_shift, self.th_o))
    }
}

/// `snn_config` block of a training export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnnConfig {
    /// Timesteps per window
    pub window_len: usize,
    /// Hidden leak shift
    pub leak_h_shift: u8,
    /// Output leak shift
    pub leak_o_shift: u8,
    /// Hidden threshold in float weight units
    pub th_h: f64,
    /// Output threshold in float weight units
    pub th_o: f64,
}

/// `quant` block: `float ≈ int8 × scale`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantScales {
    /// W1 scale
    pub w1_scale: f64,
    /// W2 scale
    pub w2_scale: f64,
}

/// `shapes` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixShapes {
    /// `[n_in, n_hidden]`
    #[serde(rename = "W1")]
    pub w1: [usize; 2],
    /// `[n_hidden, n_out]`
    #[serde(rename = "W2")]
    pub w2: [usize; 2],
}

/// Training export (`params.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExport {
    /// Float LIF configuration
    pub snn_config: SnnConfig,
    /// Weight scales
    pub quant: QuantScales,
    /// Matrix shapes
    pub shapes: MatrixShapes,
    /// Class names, if exported
    #[serde(default)]
    pub classes: Vec<String>,
    /// Feature names, if exported
    #[serde(default)]
    pub features: Vec<String>,
}

/// Integer threshold for a float threshold under a weight scale:
/// `max(1, round(th / scale))`, saturated to `i16`.
#[allow(clippy::cast_possible_truncation)]
pub fn quantize_threshold(th: f64, scale: f64) -> i16 {
    let q = (th / scale).round();
    if q.is_nan() {
        return 1;
    }
    // `as` saturates float to int conversions
    (q as i16).max(1)
}

impl TrainingExport {
    /// Integer parameters, thresholds quantised with W1's scale (hidden)
    /// and W2's scale (output).
    ///
    /// # Errors
    ///
    /// `Shape` if the two shapes do not chain through the hidden layer.
    pub fn to_rtl(&self) -> Result<RtlParams> {
        let [n_in, n_hidden] = self.shapes.w1;
        let [w2_rows, n_out] = self.shapes.w2;
        if w2_rows != n_hidden {
            return Err(ModelError::shape(format!(
                "W1 is {n_in}×{n_hidden} but W2 has {w2_rows} rows"
            )));
        }
        let c = &self.snn_config;
        Ok(RtlParams {
            n_in,
            n_hidden,
            n_out,
            window_len: c.window_len,
            leak_h_shift: c.leak_h_shift,
            leak_o_shift: c.leak_o_shift,
            th_h: quantize_threshold(c.th_h, self.quant.w1_scale),
            th_o: quantize_threshold(c.th_o, self.quant.w2_scale),
        })
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn find_first(dir: &Path, names: &[&str]) -> Result<PathBuf> {
    names
        .iter()
        .map(|n| dir.join(n))
        .find(|p| p.exists())
        .ok_or_else(|| ModelError::FileNotFound {
            path: dir.join(names[0]),
        })
}

/// Everything needed to instantiate a core.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// Directory the artifacts came from
    pub dir: PathBuf,
    /// Integer parameters
    pub rtl: RtlParams,
    /// Class names (empty when only `params_rtl.json` was present)
    pub classes: Vec<String>,
    /// W1 image
    pub w1: WeightImage,
    /// W2 image
    pub w2: WeightImage,
}

impl Artifacts {
    /// Load an artifact directory.
    ///
    /// # Errors
    ///
    /// `FileNotFound` if no parameter file or weight file is present,
    /// `Json`/`Parse` on malformed contents, `Shape` if the weights do not
    /// match the declared geometry.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let params_path = find_first(dir, &["params_rtl.json", "params.json"])?;
        let (rtl, classes) = if params_path.ends_with("params_rtl.json") {
            (read_json::<RtlParams>(&params_path)?, Vec::new())
        } else {
            let export: TrainingExport = read_json(&params_path)?;
            (export.to_rtl()?, export.classes)
        };

        let w1_path = find_first(dir, &["w1.mem", "w1.coe", "weights_w1.hex"])?;
        let w2_path = find_first(dir, &["w2.mem", "w2.coe", "weights_w2.hex"])?;
        let w1 = WeightImage::from_file(Matrix::W1, &w1_path)?;
        let w2 = WeightImage::from_file(Matrix::W2, &w2_path)?;
        w1.check_shape(rtl.n_in, rtl.n_hidden)?;
        w2.check_shape(rtl.n_hidden, rtl.n_out)?;

        info!(
            "Loaded artifacts from {}: {}→{}→{}, th_h={} th_o={}, leak {}/{}",
            dir.display(),
            rtl.n_in,
            rtl.n_hidden,
            rtl.n_out,
            rtl.th_h,
            rtl.th_o,
            rtl.leak_h_shift,
            rtl.leak_o_shift
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            rtl,
            classes,
            w1,
            w2,
        })
    }

    /// Core parameters with defaults for everything the files do not carry
    pub fn core_params(&self) -> CoreParams {
        self.rtl.to_core_params()
    }

    /// Weight store bound to the artifact geometry
    ///
    /// # Errors
    ///
    /// `Shape` if the images do not match (already checked by `load`).
    pub fn weight_store(&self) -> Result<WeightStore> {
        build_store(self.rtl.n_in, self.rtl.n_hidden, self.rtl.n_out, &self.w1, &self.w2)
    }

    /// Name of a class, falling back to its index
    pub fn class_name(&self, class: usize) -> String {
        self.classes
            .get(class)
            .cloned()
            .unwrap_or_else(|| format!("class {class}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_quantisation() {
        assert_eq!(quantize_threshold(1.0, 0.015_625), 64);
        assert_eq!(quantize_threshold(0.001, 1.0), 1, "clamped to at least 1");
        assert_eq!(quantize_threshold(-3.0, 1.0), 1);
        assert_eq!(quantize_threshold(1e9, 1.0), i16::MAX);
    }

    #[test]
    fn rtl_params_json() {
        let json = r#"{"n_in": 12, "n_hidden": 32, "n_out": 3, "window_len": 10,
                       "leak_h_shift": 4, "leak_o_shift": 3, "th_h": 64, "th_o": 50}"#;
        let rtl: RtlParams = serde_json::from_str(json).unwrap();
        let p = rtl.to_core_params();
        assert_eq!(p.output, LifParams::new(3, 50));
        assert_eq!(p.default_window_length, 10);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn long_window_raises_max() {
        let rtl = RtlParams {
            window_len: 100,
            ..RtlParams::default()
        };
        let p = rtl.to_core_params();
        assert_eq!(p.w_len_max, 100);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn training_export_thresholds() {
        let json = r#"{
            "snn_config": {"window_len": 10, "leak_h_shift": 4, "leak_o_shift": 4,
                           "th_h": 0.5, "th_o": 0.25, "hidden": 32},
            "classes": ["air", "ethanol", "acetone"],
            "quant": {"w1_scale": 0.01, "w2_scale": 0.005, "format": "int8"},
            "shapes": {"W1": [12, 32], "W2": [32, 3]}
        }"#;
        let export: TrainingExport = serde_json::from_str(json).unwrap();
        let rtl = export.to_rtl().unwrap();
        assert_eq!((rtl.th_h, rtl.th_o), (50, 50));
        assert_eq!((rtl.n_in, rtl.n_hidden, rtl.n_out), (12, 32, 3));
        assert_eq!(export.classes.len(), 3);
    }

    #[test]
    fn shapes_must_chain() {
        let json = r#"{
            "snn_config": {"window_len": 10, "leak_h_shift": 4, "leak_o_shift": 4, "th_h": 1.0, "th_o": 1.0},
            "quant": {"w1_scale": 0.01, "w2_scale": 0.01},
            "shapes": {"W1": [12, 32], "W2": [16, 3]}
        }"#;
        let export: TrainingExport = serde_json::from_str(json).unwrap();
        assert!(matches!(export.to_rtl(), Err(ModelError::Shape { .. })));
    }
}
