//! Stress-test dataset generation
//!
//! Simulates repeated measurements of the PLL output at a process corner. Each
//! run draws its own target jitter from the corner's distribution and gets one
//! synthesized frequency waveform.

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::GeneratorConfig;
use crate::jitter::{rms_period_jitter_fs, JitterSummary};
use crate::waveform::{generate_waveform, time_grid_us};
use crate::ReproError;

/// Process corner of the jitter characterisation
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Corner {
    #[default]
    TT,
    SS,
    FF,
}

/// Jitter statistics reported for a corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CornerStats {
    pub mean_fs: f64,
    pub three_sigma_fs: f64,
}

impl CornerStats {
    pub fn std_fs(&self) -> f64 {
        self.three_sigma_fs / 3.0
    }
}

impl Corner {
    pub const ALL: [Corner; 3] = [Corner::TT, Corner::SS, Corner::FF];

    pub fn stats(&self) -> CornerStats {
        match self {
            Corner::TT => CornerStats {
                mean_fs: 19.8,
                three_sigma_fs: 6.2,
            },
            Corner::SS => CornerStats {
                mean_fs: 25.3,
                three_sigma_fs: 7.8,
            },
            Corner::FF => CornerStats {
                mean_fs: 17.1,
                three_sigma_fs: 5.8,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Corner::TT => "TT",
            Corner::SS => "SS",
            Corner::FF => "FF",
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Corner {
    type Err = ReproError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Corner::ALL
            .into_iter()
            .find(|corner| corner.as_str() == upper)
            .ok_or_else(|| ReproError::UnknownCorner(s.to_string()))
    }
}

impl TryFrom<String> for Corner {
    type Error = ReproError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One simulated measurement
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// 1-based, matches the `Run_{id}` column
    pub run_id: usize,
    pub target_jitter_fs: f64,
    pub measured_jitter_fs: f64,
    pub freq_ghz: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub corner: Corner,
    pub time_us: Vec<f64>,
    pub runs: Vec<RunRecord>,
}

impl Dataset {
    pub fn time_s(&self) -> Vec<f64> {
        self.time_us.iter().map(|t| t * 1e-6).collect()
    }

    pub fn measured_jitter(&self) -> Vec<f64> {
        self.runs.iter().map(|run| run.measured_jitter_fs).collect()
    }

    pub fn target_jitter(&self) -> Vec<f64> {
        self.runs.iter().map(|run| run.target_jitter_fs).collect()
    }

    pub fn summary(&self) -> JitterSummary {
        JitterSummary::from_values(&self.measured_jitter())
    }
}

/// Simulate every run of the configured stress test.
///
/// Per-run targets come from `Normal(mean, 3sigma / 3)`; a negative draw is
/// clamped to zero. The measured jitter is taken on the full-precision Hz
/// waveform, before any CSV rounding.
pub fn generate_dataset(config: &GeneratorConfig) -> Result<Dataset, ReproError> {
    config.validate()?;

    let stats = config.corner.stats();
    let target_dist = Normal::new(stats.mean_fs, stats.std_fs())
        .map_err(|e| ReproError::InvalidConfig(format!("corner jitter distribution: {e}")))?;
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let time_us = time_grid_us(config.time_start_us, config.time_end_us, config.time_step_us)?;
    let time_s: Vec<f64> = time_us.iter().map(|t| t * 1e-6).collect();
    let target_freq_hz = config.target_freq_hz();

    info!(
        corner = %config.corner,
        model = %config.model,
        runs = config.num_runs,
        points = time_s.len(),
        seed = config.seed,
        "generating stress-test waveforms"
    );

    let mut runs = Vec::with_capacity(config.num_runs);
    for run_id in 1..=config.num_runs {
        let drawn = target_dist.sample(&mut rng);
        let target_jitter_fs = if drawn < 0.0 {
            warn!(run_id, drawn, "negative jitter draw clamped to zero");
            0.0
        } else {
            drawn
        };

        let freq_hz = generate_waveform(
            config.model,
            &time_s,
            target_freq_hz,
            target_jitter_fs,
            &config.noise,
            &mut rng,
        )?;
        let measured_jitter_fs = rms_period_jitter_fs(&time_s, &freq_hz)?;

        debug!(run_id, target_jitter_fs, measured_jitter_fs, "run complete");

        runs.push(RunRecord {
            run_id,
            target_jitter_fs,
            measured_jitter_fs,
            freq_ghz: freq_hz.into_iter().map(|f| f / 1e9).collect(),
        });
    }

    let dataset = Dataset {
        corner: config.corner,
        time_us,
        runs,
    };
    let summary = dataset.summary();
    info!(
        mean_fs = summary.mean_fs,
        three_sigma_fs = summary.three_sigma_fs,
        "generation complete"
    );

    Ok(dataset)
}
