use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use ricc_repro::dataset::{generate_dataset, Corner};
use ricc_repro::hat::{quantization_steps, stochastic_forward, HatConfig, Linear};
use ricc_repro::jitter::{rms_period_jitter_fs, Histogram, JitterSummary};
use ricc_repro::logging::{init_logging, LogFormat};
use ricc_repro::output::{
    create_analysis_dir, read_waveform_csv, write_dataset, write_histogram_csv,
    write_json, write_run_jitter_csv, RunJitterRow,
};
use ricc_repro::specs::{render_report, sar_adc_specs_v2, SpecVersion};
use ricc_repro::waveform::WaveformModel;
use ricc_repro::GeneratorConfig;

/// Relative gap between published and recomputed FoM that is worth a warning
const FOM_TOLERANCE: f64 = 0.05;

#[derive(Debug, Parser)]
#[command(name = "ricc-repro")]
#[command(about = "Reproducibility tooling for the RICC-HAT SAR ADC, PLL jitter and HAT noise models")]
struct Cli {
    #[arg(long, global = true, default_value = "compact")]
    log_format: LogFormat,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a SAR ADC design specification sheet
    Specs {
        #[arg(long, default_value = "v2")]
        version: SpecVersion,
    },
    /// Generate a stress-test waveform dataset for one process corner
    Generate {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        corner: Option<Corner>,
        #[arg(long)]
        model: Option<WaveformModel>,
        #[arg(long)]
        runs: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        outdir: Option<PathBuf>,
    },
    /// Measure RMS period jitter of every run in a waveform CSV
    Analyze {
        csv: PathBuf,
        #[arg(long, default_value_t = 30)]
        bins: usize,
        #[arg(long, default_value = "output-ricc-repro")]
        outdir: PathBuf,
    },
    /// Run one seeded hardware-aware forward pass on a random layer
    Hat {
        #[arg(long, default_value_t = 64)]
        inputs: usize,
        #[arg(long, default_value_t = 16)]
        outputs: usize,
        #[arg(long, default_value_t = 8)]
        batch: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = false)]
        aged: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level)?;

    match cli.command {
        Command::Specs { version } => run_specs(version),
        Command::Generate {
            config,
            corner,
            model,
            runs,
            seed,
            outdir,
        } => {
            let mut cfg = match config {
                Some(path) => GeneratorConfig::from_toml_file(&path)
                    .with_context(|| format!("failed to load config: {}", path.display()))?,
                None => GeneratorConfig::default(),
            };
            if let Some(corner) = corner {
                cfg.corner = corner;
            }
            if let Some(model) = model {
                cfg.model = model;
            }
            if let Some(runs) = runs {
                cfg.num_runs = runs;
            }
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            if let Some(outdir) = outdir {
                cfg.output_dir = outdir;
            }
            run_generate(&cfg)
        }
        Command::Analyze { csv, bins, outdir } => run_analyze(&csv, bins, &outdir),
        Command::Hat {
            inputs,
            outputs,
            batch,
            seed,
            aged,
        } => run_hat(inputs, outputs, batch, seed, aged),
    }
}

fn run_specs(version: SpecVersion) -> Result<()> {
    if version == SpecVersion::V2 {
        let targets = sar_adc_specs_v2().performance_targets;
        let computed = targets.computed_fom_fj();
        let published = targets.figure_of_merit_fj_conv_step;
        if ((published - computed) / computed).abs() > FOM_TOLERANCE {
            warn!(
                published_fj = published,
                computed_fj = computed,
                "published Walden FoM differs from P / (2^ENOB * Fs)"
            );
        }
    }

    println!("{}", render_report(version)?);
    Ok(())
}

fn run_generate(config: &GeneratorConfig) -> Result<()> {
    config.validate()?;

    let dataset = generate_dataset(config)?;
    let path = write_dataset(&config.output_dir, config, &dataset).with_context(|| {
        format!(
            "failed to write dataset under {}",
            config.output_dir.display()
        )
    })?;

    let summary = dataset.summary();
    println!("Saved data to '{}'", path.display());
    println!(
        "{} rows x {} columns, measured jitter {:.2} fs mean, {:.2} fs 3-sigma",
        dataset.time_us.len(),
        dataset.runs.len() + 1,
        summary.mean_fs,
        summary.three_sigma_fs
    );
    Ok(())
}

fn run_analyze(csv: &Path, bins: usize, outdir: &Path) -> Result<()> {
    let table = read_waveform_csv(csv)
        .with_context(|| format!("failed to read waveform table: {}", csv.display()))?;
    if table.runs.is_empty() {
        bail!("{} has no run columns", csv.display());
    }

    let time_s: Vec<f64> = table.time_us.iter().map(|t| t * 1e-6).collect();
    let mut rows = Vec::with_capacity(table.runs.len());
    for (name, freq_ghz) in &table.runs {
        let freq_hz: Vec<f64> = freq_ghz.iter().map(|f| f * 1e9).collect();
        let jitter_fs = rms_period_jitter_fs(&time_s, &freq_hz)
            .with_context(|| format!("jitter of column {name}"))?;
        rows.push(RunJitterRow {
            run: name.clone(),
            jitter_fs,
        });
    }

    let values: Vec<f64> = rows.iter().map(|row| row.jitter_fs).collect();
    let summary = JitterSummary::from_values(&values);
    let histogram = Histogram::from_values(&values, bins)?;

    let output_dir = create_analysis_dir(outdir)?;
    write_run_jitter_csv(&output_dir.join("jitter_per_run.csv"), &rows)?;
    write_histogram_csv(&output_dir.join("jitter_histogram.csv"), &histogram)?;
    write_json(&output_dir.join("jitter_summary.json"), &summary)?;

    info!(runs = summary.count, mean_fs = summary.mean_fs, "analysis complete");
    println!(
        "Mean RMS period jitter: {:.2} fs (3-sigma {:.2} fs) over {} runs",
        summary.mean_fs, summary.three_sigma_fs, summary.count
    );
    println!("Output directory: {}", output_dir.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct HatReport {
    inputs: usize,
    outputs: usize,
    batch: usize,
    seed: u64,
    aged: bool,
    mean_abs_deviation: f64,
    max_abs_deviation: f64,
    distinct_levels: usize,
}

fn run_hat(inputs: usize, outputs: usize, batch: usize, seed: u64, aged: bool) -> Result<()> {
    if inputs == 0 || outputs == 0 || batch == 0 {
        bail!("inputs, outputs and batch must all be greater than zero");
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let layer = Linear::random(inputs, outputs, &mut rng);
    let x = Array2::from_shape_fn((batch, inputs), |_| rng.gen_range(-1.0..1.0));

    let config = if aged {
        HatConfig::default().aged()
    } else {
        HatConfig::default()
    };
    let ideal = layer.forward(&x)?;
    let physical = stochastic_forward(&layer, &x, &config, &mut rng)?;

    let deviations: Vec<f64> = physical
        .iter()
        .zip(ideal.iter())
        .map(|(p, i)| (p - i).abs())
        .collect();
    let steps = quantization_steps(config.adc_bits.unwrap_or(8));
    let mut levels: Vec<i64> = physical.iter().map(|v| (v * steps).round() as i64).collect();
    levels.sort_unstable();
    levels.dedup();

    let report = HatReport {
        inputs,
        outputs,
        batch,
        seed,
        aged,
        mean_abs_deviation: deviations.iter().sum::<f64>() / deviations.len() as f64,
        max_abs_deviation: deviations.iter().copied().fold(0.0, f64::max),
        distinct_levels: levels.len(),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
