//! RMS period jitter
//!
//! Converts an instantaneous-frequency record into periods and reports the
//! RMS deviation of those periods from their mean, in femtoseconds.

use serde::Serialize;

use crate::ReproError;

/// Minimum record length for a stable jitter statistic
pub const MIN_JITTER_SAMPLES: usize = 10;

/// Guard added to every frequency sample before inversion
pub const FREQUENCY_EPSILON_HZ: f64 = 1e-12;

const SECONDS_TO_FS: f64 = 1e15;

/// Instantaneous period of a single frequency sample.
///
/// The waveform calibration pass inverts exactly this mapping, so both sides
/// must go through here.
#[inline]
pub fn period_s(frequency_hz: f64) -> f64 {
    1.0 / (frequency_hz + FREQUENCY_EPSILON_HZ)
}

/// Inverse of [`period_s`].
#[inline]
pub fn frequency_hz(period_s: f64) -> f64 {
    1.0 / period_s - FREQUENCY_EPSILON_HZ
}

pub fn period_series(frequency_series_hz: &[f64]) -> Vec<f64> {
    frequency_series_hz.iter().copied().map(period_s).collect()
}

/// Mean and RMS deviation of a series (population statistics).
pub fn mean_and_rms_deviation(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mean_sq = values
        .iter()
        .map(|v| {
            let delta = v - mean;
            delta * delta
        })
        .sum::<f64>()
        / n;

    (mean, mean_sq.sqrt())
}

/// RMS period jitter of an instantaneous-frequency waveform, in femtoseconds.
///
/// The time axis is only used to check that both series describe the same
/// record; the statistic itself assumes a stationary, locked PLL.
///
/// # Errors
/// * [`ReproError::LengthMismatch`] when the series lengths differ
/// * [`ReproError::SeriesTooShort`] for fewer than [`MIN_JITTER_SAMPLES`] points
pub fn rms_period_jitter_fs(
    time_series_s: &[f64],
    frequency_series_hz: &[f64],
) -> Result<f64, ReproError> {
    if time_series_s.len() != frequency_series_hz.len() {
        return Err(ReproError::LengthMismatch {
            context: "time/frequency series",
            expected: time_series_s.len(),
            got: frequency_series_hz.len(),
        });
    }
    if time_series_s.len() < MIN_JITTER_SAMPLES {
        return Err(ReproError::SeriesTooShort {
            len: time_series_s.len(),
            min: MIN_JITTER_SAMPLES,
        });
    }

    let periods = period_series(frequency_series_hz);
    let (_, rms_s) = mean_and_rms_deviation(&periods);
    Ok(rms_s * SECONDS_TO_FS)
}

/// Distribution of per-run jitter values across a stress test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JitterSummary {
    pub count: usize,
    pub mean_fs: f64,
    pub std_fs: f64,
    pub min_fs: f64,
    pub max_fs: f64,
    pub three_sigma_fs: f64,
}

impl JitterSummary {
    /// Summary over per-run jitter values. `std_fs` is the sample standard
    /// deviation (n - 1); it is zero for fewer than two runs.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                count: 0,
                mean_fs: 0.0,
                std_fs: 0.0,
                min_fs: 0.0,
                max_fs: 0.0,
                three_sigma_fs: 0.0,
            };
        }

        let count = values.len();
        let mean_fs = values.iter().sum::<f64>() / count as f64;
        let std_fs = if count > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean_fs) * (v - mean_fs)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Self {
            count,
            mean_fs,
            std_fs,
            min_fs: values.iter().copied().fold(f64::INFINITY, f64::min),
            max_fs: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            three_sigma_fs: 3.0 * std_fs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower_fs: f64,
    pub upper_fs: f64,
    pub count: usize,
}

/// Equal-width histogram over `[min, max]`; the last bin is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn from_values(values: &[f64], bins: usize) -> Result<Self, ReproError> {
        if bins == 0 {
            return Err(ReproError::InvalidConfig(
                "histogram bin count must be greater than zero".to_string(),
            ));
        }
        if values.is_empty() {
            return Ok(Self { bins: Vec::new() });
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // A degenerate span still gets a unit-width bin so every value lands somewhere.
        let span = if max > min { max - min } else { 1.0 };
        let width = span / bins as f64;

        let mut counts = vec![0_usize; bins];
        for &value in values {
            let idx = (((value - min) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(idx, count)| HistogramBin {
                lower_fs: min + width * idx as f64,
                upper_fs: min + width * (idx + 1) as f64,
                count,
            })
            .collect();

        Ok(Self { bins })
    }

    pub fn total(&self) -> usize {
        self.bins.iter().map(|bin| bin.count).sum()
    }
}
