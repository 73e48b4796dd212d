use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dataset::Corner;
use crate::jitter::MIN_JITTER_SAMPLES;
use crate::waveform::{time_grid_us, NoiseProfile, WaveformModel};
use crate::ReproError;

/// Stress-test dataset generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub corner: Corner,
    pub model: WaveformModel,
    pub num_runs: usize,
    pub time_start_us: f64,
    pub time_end_us: f64,
    pub time_step_us: f64,
    pub target_freq_ghz: f64,
    pub seed: u64,
    /// Decimal places of the GHz columns in the waveform CSV
    pub float_precision: usize,
    pub output_dir: PathBuf,
    pub noise: NoiseProfile,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            corner: Corner::TT,
            model: WaveformModel::Calibrated,
            num_runs: 1000,
            time_start_us: 80.0,
            time_end_us: 120.0,
            time_step_us: 0.1,
            target_freq_ghz: 0.2,
            seed: 0x41CC_2025_u64,
            float_precision: 7,
            output_dir: PathBuf::from("raw_data"),
            noise: NoiseProfile::default(),
        }
    }
}

impl GeneratorConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ReproError> {
        let raw = fs::read_to_string(path)?;
        let config: GeneratorConfig = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReproError> {
        if self.num_runs == 0 {
            return Err(ReproError::InvalidConfig(
                "num_runs must be greater than zero".to_string(),
            ));
        }

        if !(self.time_start_us.is_finite()
            && self.time_end_us.is_finite()
            && self.time_step_us.is_finite())
        {
            return Err(ReproError::InvalidConfig(
                "time window and step must be finite".to_string(),
            ));
        }

        if self.time_step_us <= 0.0 {
            return Err(ReproError::InvalidConfig(
                "time_step_us must be greater than zero".to_string(),
            ));
        }

        if self.time_end_us < self.time_start_us {
            return Err(ReproError::InvalidConfig(
                "time_end_us must be greater than or equal to time_start_us".to_string(),
            ));
        }

        let points = time_grid_us(self.time_start_us, self.time_end_us, self.time_step_us)?.len();
        if points < MIN_JITTER_SAMPLES {
            return Err(ReproError::InvalidConfig(format!(
                "time window yields {points} samples, jitter needs at least {MIN_JITTER_SAMPLES}"
            )));
        }

        if !self.target_freq_ghz.is_finite() || self.target_freq_ghz <= 0.0 {
            return Err(ReproError::InvalidConfig(
                "target_freq_ghz must be finite and positive".to_string(),
            ));
        }

        if self.float_precision > 17 {
            return Err(ReproError::InvalidConfig(
                "float_precision must be at most 17".to_string(),
            ));
        }

        self.noise.validate()
    }

    pub fn target_freq_hz(&self) -> f64 {
        self.target_freq_ghz * 1e9
    }

    /// `stress_test_{CORNER}_corner_{N}_runs.csv`
    pub fn waveform_filename(&self) -> String {
        format!(
            "stress_test_{}_corner_{}_runs.csv",
            self.corner, self.num_runs
        )
    }
}
