//! RICC-HAT reproducibility package
//!
//! Design dictionaries for the 8-bit SAR ADC, synthetic PLL frequency
//! waveforms with calibrated period jitter, the RMS period-jitter calculator
//! used to analyse them, and the hardware-aware training noise layer.

pub mod config;
pub mod dataset;
pub mod hat;
pub mod jitter;
pub mod logging;
pub mod output;
pub mod specs;
pub mod waveform;

use thiserror::Error;

// Re-export main types
pub use config::GeneratorConfig;
pub use dataset::{generate_dataset, Corner, CornerStats, Dataset, RunRecord};
pub use hat::{stochastic_forward, HatConfig, Linear};
pub use jitter::{rms_period_jitter_fs, Histogram, JitterSummary};
pub use output::create_analysis_dir;
pub use specs::{sar_adc_specs, sar_adc_specs_v2, SpecVersion};
pub use waveform::{generate_waveform, time_grid_us, NoiseProfile, WaveformModel};

#[derive(Debug, Error)]
pub enum ReproError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("series of {len} samples is too short for a reliable jitter estimate (need at least {min})")]
    SeriesTooShort { len: usize, min: usize },
    #[error("invalid waveform input: {0}")]
    InvalidWaveform(String),
    #[error("cannot calibrate waveform: {0}")]
    Calibration(String),
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("unknown process corner '{0}', expected one of TT, SS, FF")]
    UnknownCorner(String),
}
