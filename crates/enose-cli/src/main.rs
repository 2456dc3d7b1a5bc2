//! `enose`: command-line interface for the e-nose SNN accelerator.
//!
//! ```text
//! USAGE:
//!   enose regs                               Register map and bit fields
//!   enose info [--artifacts DIR]             Core geometry and LIF parameters
//!   enose infer --artifacts DIR --masks F    Classify spike windows
//!   enose verify --artifacts DIR --vectors F Check golden test vectors
//!   enose gen-vectors --artifacts DIR -o F   Write golden vectors for the standard patterns
//!   enose selftest --artifacts DIR           Overlay smoke patterns
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use enose_chip::regs::{self, status};
use enose_chip::stream;
use enose_core::{reference, AccessMode, ConfidenceMode, CoreParams};
use enose_driver::{
    select_backend, BackendSelection, CoreBackend, DriverConfig, InferenceResult, OverlayDriver,
};
use enose_models::{Artifacts, TestVector};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "enose", about = "E-nose SNN accelerator CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    /// Cycle-level core behind AXI handshakes
    Emulated,
    /// Functional reference behind the register map
    Golden,
}

impl From<Backend> for BackendSelection {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Emulated => Self::Emulated,
            Backend::Golden => Self::Golden,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Access {
    /// Issue, wait, consume: three cycles per weight
    Pipelined,
    /// One cycle per weight
    Synchronous,
}

#[derive(Clone, Copy, ValueEnum)]
enum Confidence {
    /// CONFIDENCE reads 0
    Zero,
    /// max / sum in Q1.15
    Q15,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print the register map and bit definitions.
    Regs,
    /// Print core geometry and neuron parameters.
    Info {
        /// Artifact directory (defaults are shown without one).
        #[arg(long)]
        artifacts: Option<PathBuf>,
    },
    /// Run spike windows through a backend.
    Infer {
        /// Artifact directory with parameters and weights.
        #[arg(long)]
        artifacts: PathBuf,
        /// Spike mask file, one hex word per line.
        #[arg(long, conflicts_with = "mask")]
        masks: Option<PathBuf>,
        /// Spike masks given inline (hex).
        #[arg(long, num_args = 1.., value_parser = parse_hex)]
        mask: Vec<u32>,
        /// Window length; the masks are split into windows of this size.
        #[arg(long)]
        window: Option<usize>,
        #[arg(long, value_enum, default_value = "emulated")]
        backend: Backend,
        #[arg(long, value_enum, default_value = "pipelined")]
        access: Access,
        #[arg(long, value_enum, default_value = "zero")]
        confidence: Confidence,
        /// Send only the first K words of each window, ended by TLAST.
        #[arg(long, value_name = "K")]
        truncate_frame: Option<usize>,
        /// Report truncated frames through STATUS.error.
        #[arg(long)]
        flag_truncation: bool,
    },
    /// Check golden test vectors against a backend.
    Verify {
        #[arg(long)]
        artifacts: PathBuf,
        /// test_vectors.txt
        #[arg(long)]
        vectors: PathBuf,
        #[arg(long, value_enum, default_value = "emulated")]
        backend: Backend,
    },
    /// Write golden vectors for the standard stimulus patterns.
    GenVectors {
        #[arg(long)]
        artifacts: PathBuf,
        /// Output file.
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Run the overlay smoke patterns on the emulated core.
    Selftest {
        #[arg(long)]
        artifacts: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Regs => cmd_regs(),
        Cmd::Info { artifacts } => cmd_info(artifacts.as_deref())?,
        Cmd::Infer {
            artifacts,
            masks,
            mask,
            window,
            backend,
            access,
            confidence,
            truncate_frame,
            flag_truncation,
        } => {
            let art = Artifacts::load(&artifacts)?;
            let mut params = art.core_params();
            params.access_mode = match access {
                Access::Pipelined => AccessMode::Pipelined,
                Access::Synchronous => AccessMode::Synchronous,
            };
            params.confidence = match confidence {
                Confidence::Zero => ConfidenceMode::Zero,
                Confidence::Q15 => ConfidenceMode::Q15,
            };
            params.flag_truncation = flag_truncation;
            let words = match masks {
                Some(path) => enose_models::load_masks(&path)?,
                None => mask,
            };
            let window = window.unwrap_or(art.rtl.window_len);
            cmd_infer(&art, params, backend, &words, window, truncate_frame)?;
        }
        Cmd::Verify {
            artifacts,
            vectors,
            backend,
        } => cmd_verify(&artifacts, &vectors, backend)?,
        Cmd::GenVectors { artifacts, out } => cmd_gen_vectors(&artifacts, &out)?,
        Cmd::Selftest { artifacts } => cmd_selftest(&artifacts)?,
    }

    Ok(())
}

fn parse_hex(s: &str) -> std::result::Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("{s:?}: {e}"))
}

fn open(
    art: &Artifacts,
    params: CoreParams,
    backend: Backend,
) -> Result<OverlayDriver<Box<dyn CoreBackend>>> {
    let weights = Arc::new(art.weight_store()?);
    let backend = select_backend(backend.into(), params, weights)?;
    Ok(OverlayDriver::new(backend, DriverConfig::default())?)
}

fn cmd_regs() {
    println!("Offset  Name            Access");
    for offset in regs::ALL {
        let access = if regs::is_writable(offset) { "RW" } else { "RO" };
        println!("0x{offset:02X}    {:<15} {access}", regs::name(offset).unwrap_or("?"));
    }
    println!();
    println!("CONTROL  bit0 START (pulse)  bit1 RESET (pulse), reads 0");
    println!(
        "STATUS   bit0 DONE ({:#x})  bit1 BUSY ({:#x})  bit2 ERROR ({:#x})",
        status::DONE,
        status::BUSY,
        status::ERROR
    );
    println!("Unmapped reads return {:#010X}", regs::UNMAPPED_SENTINEL);
    println!(
        "Stream word: bit i = input channel i, {} bits, TLAST ends the frame",
        stream::WORD_BITS
    );
}

fn cmd_info(artifacts: Option<&Path>) -> Result<()> {
    let params = match artifacts {
        Some(dir) => {
            let art = Artifacts::load(dir)?;
            println!("Artifacts    : {}", art.dir.display());
            if !art.classes.is_empty() {
                println!("Classes      : {}", art.classes.join(", "));
            }
            art.core_params()
        }
        None => CoreParams::default(),
    };
    params.validate()?;

    println!("Geometry     : {} → {} → {}", params.n_in, params.n_hidden, params.n_out);
    println!(
        "Window       : default {}, max {}",
        params.default_window_length, params.w_len_max
    );
    println!(
        "Hidden LIF   : leak >> {}, threshold {}",
        params.hidden.leak_shift, params.hidden.threshold
    );
    println!(
        "Output LIF   : leak >> {}, threshold {}",
        params.output.leak_shift, params.output.threshold
    );
    println!("Weight memory: W1 {} B, W2 {} B", params.n_in * params.n_hidden, params.n_hidden * params.n_out);
    println!("Access mode  : {}", params.access_mode);
    println!(
        "Cycles       : {} per timestep, {} for a default window",
        params.cycles_per_timestep(),
        params.latency_cycles(params.default_window_length, params.default_window_length)
    );
    Ok(())
}

fn print_result(art: &Artifacts, label: &str, r: &InferenceResult) {
    println!(
        "{label:<8} class {} ({})  counts {:?}  conf {:.3}  latency {} cycles  words {}  hidden spikes {}",
        r.class,
        art.class_name(r.class as usize),
        r.counts,
        r.confidence_f32(),
        r.latency_cycles,
        r.words_received,
        r.hidden_spikes
    );
}

fn cmd_infer(
    art: &Artifacts,
    params: CoreParams,
    backend: Backend,
    words: &[u32],
    window: usize,
    truncate: Option<usize>,
) -> Result<()> {
    if words.is_empty() {
        bail!("no spike masks given (use --masks FILE or --mask HEX...)");
    }
    if window == 0 {
        bail!("window length must be at least 1");
    }
    let mut driver = open(art, params, backend)?;
    driver.set_window_length(window)?;

    for (i, frame) in words.chunks(window).enumerate() {
        let frame = match truncate {
            Some(k) if k < frame.len() => &frame[..k.max(1)],
            _ => frame,
        };
        // a short frame is sent as-is so TLAST cuts the window
        let r = driver
            .infer_frame(frame)
            .with_context(|| format!("window {i}"))?;
        print_result(art, &format!("[{i}]"), &r);
    }
    Ok(())
}

fn check_vector(driver: &mut OverlayDriver<Box<dyn CoreBackend>>, v: &TestVector) -> Result<bool> {
    let r = driver.infer_from_masks(&v.masks)?;
    let ok = r.class == v.expected_class && r.counts == v.expected_counts;
    if ok {
        println!("PASS  test {:>3}  class {}  counts {:?}", v.id, r.class, r.counts);
    } else {
        println!(
            "FAIL  test {:>3}  class {} (expected {})  counts {:?} (expected {:?})",
            v.id, r.class, v.expected_class, r.counts, v.expected_counts
        );
    }
    Ok(ok)
}

fn cmd_verify(artifacts: &Path, vectors: &Path, backend: Backend) -> Result<()> {
    let art = Artifacts::load(artifacts)?;
    let vectors = enose_models::load_test_vectors(vectors)?;
    let mut driver = open(&art, art.core_params(), backend)?;

    let mut failed = 0usize;
    for v in &vectors {
        if !check_vector(&mut driver, v).with_context(|| format!("test {}", v.id))? {
            failed += 1;
        }
    }
    println!();
    println!("{} / {} passed", vectors.len() - failed, vectors.len());
    if failed > 0 {
        bail!("{failed} test vector(s) failed");
    }
    Ok(())
}

fn cmd_gen_vectors(artifacts: &Path, out: &Path) -> Result<()> {
    let art = Artifacts::load(artifacts)?;
    let params = art.core_params();
    let weights = art.weight_store()?;

    let patterns = enose_models::standard_patterns(params.n_in, params.default_window_length);
    let vectors: Vec<TestVector> = patterns
        .iter()
        .zip(0u32..)
        .map(|((_, masks), id)| {
            let r = reference::window_result(&params, &weights, masks);
            TestVector {
                id,
                label: None,
                expected_class: r.class,
                expected_counts: r.counts,
                masks: masks.clone(),
            }
        })
        .collect();

    let names: Vec<String> = patterns
        .iter()
        .zip(0..)
        .map(|((name, _), id)| format!("test {id}: {name}"))
        .collect();
    let mut comments = vec![format!(
        "WINDOW_LEN={}, N_IN={}",
        params.default_window_length, params.n_in
    )];
    comments.extend(names);
    let comments: Vec<&str> = comments.iter().map(String::as_str).collect();

    std::fs::write(out, enose_models::format_test_vectors(&vectors, &comments))
        .with_context(|| format!("writing {}", out.display()))?;
    info!("{} vectors written to {}", vectors.len(), out.display());
    println!("Wrote {} vectors to {}", vectors.len(), out.display());
    Ok(())
}

fn cmd_selftest(artifacts: &Path) -> Result<()> {
    let art = Artifacts::load(artifacts)?;
    let params = art.core_params();
    let window = params.default_window_length;
    let all = stream::channel_mask(params.n_in);
    let patterns = [
        ("zeros", 0),
        ("all ones", all),
        ("5 ch", 0x1F & all),
    ];

    let mut driver = open(&art, params, Backend::Emulated)?;
    for (name, word) in patterns {
        driver.reset()?;
        let r = driver.infer_from_masks(&vec![word; window])?;
        println!(
            "{name:<9} STATUS={:#x} class={} DEBUG0={} DEBUG1={}",
            r.status, r.class, r.words_received, r.hidden_spikes
        );
    }
    Ok(())
}
