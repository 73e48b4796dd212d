//! Synthetic PLL frequency waveforms
//!
//! Builds the instantaneous frequency of a locked PLL as `f0` plus the
//! derivative of an injected phase-noise process. The calibrated model rescales
//! the result so the measured RMS period jitter equals the requested value.

use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::jitter::{frequency_hz, mean_and_rms_deviation, period_series};
use crate::ReproError;

const FS_TO_SECONDS: f64 = 1e-15;

/// Relative tolerance when checking that the time axis is uniformly sampled
const UNIFORM_STEP_TOLERANCE: f64 = 1e-6;

/// Period spread, in ulps of the mean period, below which a raw waveform is flat
const FLAT_SPREAD_ULPS: f64 = 8.0;

/// Phase-noise composition used to synthesize a waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum WaveformModel {
    /// Random-walk phase noise only, scaled from the target jitter
    Basic,
    /// Random walk times the empirical calibration factor, plus thermal drift
    /// and supply ripple
    Composite,
    /// `Composite`, then rescaled to hit the target jitter exactly
    #[default]
    Calibrated,
}

impl WaveformModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaveformModel::Basic => "basic",
            WaveformModel::Composite => "composite",
            WaveformModel::Calibrated => "calibrated",
        }
    }
}

impl fmt::Display for WaveformModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaveformModel {
    type Err = ReproError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(WaveformModel::Basic),
            "composite" => Ok(WaveformModel::Composite),
            "calibrated" | "final" => Ok(WaveformModel::Calibrated),
            other => Err(ReproError::InvalidConfig(format!(
                "unknown waveform model '{other}', expected basic, composite or calibrated"
            ))),
        }
    }
}

impl TryFrom<String> for WaveformModel {
    type Error = ReproError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Non-ideality parameters of the composite phase model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseProfile {
    /// Empirical multiplier on the random-walk innovations
    pub calibration_factor: f64,
    /// Full span of the uniformly drawn thermal drift rate, centred on zero (Hz/s)
    pub drift_span_hz_per_s: f64,
    /// Supply ripple frequency (Hz)
    pub ripple_freq_hz: f64,
    /// Ripple frequency deviation relative to the carrier
    pub ripple_relative_amplitude: f64,
}

impl Default for NoiseProfile {
    fn default() -> Self {
        Self {
            calibration_factor: 4.5,
            drift_span_hz_per_s: 5e7,
            ripple_freq_hz: 50e6,
            ripple_relative_amplitude: 1e-6,
        }
    }
}

impl NoiseProfile {
    pub fn validate(&self) -> Result<(), ReproError> {
        let fields = [
            ("calibration_factor", self.calibration_factor),
            ("drift_span_hz_per_s", self.drift_span_hz_per_s),
            ("ripple_freq_hz", self.ripple_freq_hz),
            ("ripple_relative_amplitude", self.ripple_relative_amplitude),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(ReproError::InvalidConfig(format!(
                    "{name} must be finite and non-negative"
                )));
            }
        }
        if self.ripple_freq_hz == 0.0 {
            return Err(ReproError::InvalidConfig(
                "ripple_freq_hz must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Uniform time grid in microseconds from `start` to `end` inclusive.
///
/// The last sample may overshoot `end` by less than half a step, matching a
/// half-open range whose stop is `end + step`.
pub fn time_grid_us(start_us: f64, end_us: f64, step_us: f64) -> Result<Vec<f64>, ReproError> {
    if !(start_us.is_finite() && end_us.is_finite() && step_us.is_finite()) {
        return Err(ReproError::InvalidConfig(
            "time window bounds and step must be finite".to_string(),
        ));
    }
    if step_us <= 0.0 {
        return Err(ReproError::InvalidConfig(
            "time step must be greater than zero".to_string(),
        ));
    }
    if end_us < start_us {
        return Err(ReproError::InvalidConfig(
            "time window end must not precede its start".to_string(),
        ));
    }

    let intervals = ((end_us - start_us) / step_us + 0.5).floor() as usize;
    Ok((0..=intervals)
        .map(|idx| start_us + idx as f64 * step_us)
        .collect())
}

/// Second-order central differences inside, first-order one-sided at the ends.
pub fn gradient(values: &[f64], dt: f64) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push((values[1] - values[0]) / dt);
    for idx in 1..n - 1 {
        out.push((values[idx + 1] - values[idx - 1]) / (2.0 * dt));
    }
    out.push((values[n - 1] - values[n - 2]) / dt);
    out
}

fn sample_step(time_s: &[f64]) -> Result<f64, ReproError> {
    if time_s.len() < 2 {
        return Err(ReproError::InvalidWaveform(format!(
            "time vector needs at least 2 samples, got {}",
            time_s.len()
        )));
    }

    let dt = time_s[1] - time_s[0];
    if !dt.is_finite() || dt <= 0.0 {
        return Err(ReproError::InvalidWaveform(
            "time vector must be strictly increasing".to_string(),
        ));
    }

    let tolerance = dt * UNIFORM_STEP_TOLERANCE;
    if let Some(idx) = time_s
        .windows(2)
        .position(|pair| ((pair[1] - pair[0]) - dt).abs() > tolerance)
    {
        return Err(ReproError::InvalidWaveform(format!(
            "time vector is not uniformly spaced at sample {}",
            idx + 1
        )));
    }

    Ok(dt)
}

fn check_targets(target_freq_hz: f64, target_jitter_fs: f64) -> Result<(), ReproError> {
    if !target_freq_hz.is_finite() || target_freq_hz <= 0.0 {
        return Err(ReproError::InvalidWaveform(format!(
            "target frequency must be finite and positive, got {target_freq_hz}"
        )));
    }
    if !target_jitter_fs.is_finite() || target_jitter_fs < 0.0 {
        return Err(ReproError::InvalidWaveform(format!(
            "target jitter must be finite and non-negative, got {target_jitter_fs}"
        )));
    }
    Ok(())
}

/// Random-walk phase noise whose per-step spread follows the target jitter:
/// `sigma_phi = J * 2*pi*f0`, innovations `z * sigma_phi * sqrt(dt) * scale`.
fn random_walk_phase<R: Rng + ?Sized>(
    num_points: usize,
    dt: f64,
    target_freq_hz: f64,
    target_jitter_fs: f64,
    scale: f64,
    rng: &mut R,
) -> Vec<f64> {
    let phase_noise_std = target_jitter_fs * FS_TO_SECONDS * TAU * target_freq_hz;
    let step_std = phase_noise_std * dt.sqrt() * scale;

    let mut phase = Vec::with_capacity(num_points);
    let mut acc = 0.0;
    for _ in 0..num_points {
        let z: f64 = StandardNormal.sample(rng);
        acc += z * step_std;
        phase.push(acc);
    }
    phase
}

fn phase_to_frequency(phase: &[f64], dt: f64, target_freq_hz: f64) -> Vec<f64> {
    gradient(phase, dt)
        .into_iter()
        .map(|dphi| target_freq_hz + dphi / TAU)
        .collect()
}

/// Frequency waveform driven by random-walk phase noise alone.
pub fn basic_waveform<R: Rng + ?Sized>(
    time_s: &[f64],
    target_freq_hz: f64,
    target_jitter_fs: f64,
    rng: &mut R,
) -> Result<Vec<f64>, ReproError> {
    let dt = sample_step(time_s)?;
    check_targets(target_freq_hz, target_jitter_fs)?;

    let phase = random_walk_phase(time_s.len(), dt, target_freq_hz, target_jitter_fs, 1.0, rng);
    Ok(phase_to_frequency(&phase, dt, target_freq_hz))
}

/// Scaled random walk plus quadratic thermal-drift phase and sinusoidal
/// supply-ripple phase. Draw order: innovations, drift rate, ripple phase.
pub fn composite_waveform<R: Rng + ?Sized>(
    time_s: &[f64],
    target_freq_hz: f64,
    target_jitter_fs: f64,
    profile: &NoiseProfile,
    rng: &mut R,
) -> Result<Vec<f64>, ReproError> {
    let dt = sample_step(time_s)?;
    check_targets(target_freq_hz, target_jitter_fs)?;
    profile.validate()?;

    let mut phase = random_walk_phase(
        time_s.len(),
        dt,
        target_freq_hz,
        target_jitter_fs,
        profile.calibration_factor,
        rng,
    );

    let drift_rate = (rng.gen::<f64>() - 0.5) * profile.drift_span_hz_per_s;
    let ripple_amplitude_hz = target_freq_hz * profile.ripple_relative_amplitude;
    let ripple_phase0 = rng.gen::<f64>() * TAU;

    for (value, &t) in phase.iter_mut().zip(time_s) {
        let thermal_drift = TAU * drift_rate * (t * t / 2.0);
        let psu_ripple = (ripple_amplitude_hz / profile.ripple_freq_hz)
            * (TAU * profile.ripple_freq_hz * t + ripple_phase0).sin();
        *value += thermal_drift + psu_ripple;
    }

    Ok(phase_to_frequency(&phase, dt, target_freq_hz))
}

/// Rescale period deviations about their mean so the RMS period jitter of the
/// returned waveform equals `target_jitter_fs`.
///
/// A zero target collapses the waveform to `target_freq_hz`.
pub fn calibrate_to_jitter(
    frequency_hz_series: &[f64],
    target_freq_hz: f64,
    target_jitter_fs: f64,
) -> Result<Vec<f64>, ReproError> {
    check_targets(target_freq_hz, target_jitter_fs)?;
    if target_jitter_fs == 0.0 {
        return Ok(vec![target_freq_hz; frequency_hz_series.len()]);
    }

    let periods = period_series(frequency_hz_series);
    let (mean_period, rms_deviation) = mean_and_rms_deviation(&periods);
    // A spread of a few ulps is rounding residue, not a deviation to rescale.
    let spread = periods.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        - periods.iter().copied().fold(f64::INFINITY, f64::min);
    let resolution_floor = mean_period.abs() * f64::EPSILON * FLAT_SPREAD_ULPS;
    if !(rms_deviation.is_finite() && rms_deviation > 0.0 && spread > resolution_floor) {
        return Err(ReproError::Calibration(
            "raw waveform has no period deviation to rescale".to_string(),
        ));
    }

    let scale = target_jitter_fs * FS_TO_SECONDS / rms_deviation;
    periods
        .into_iter()
        .map(|period| {
            let rescaled = mean_period + (period - mean_period) * scale;
            if rescaled.is_finite() && rescaled > 0.0 {
                Ok(frequency_hz(rescaled))
            } else {
                Err(ReproError::Calibration(format!(
                    "requested jitter of {target_jitter_fs} fs drives a period non-positive"
                )))
            }
        })
        .collect()
}

/// Generate one instantaneous-frequency waveform (Hz) on `time_s`.
pub fn generate_waveform<R: Rng + ?Sized>(
    model: WaveformModel,
    time_s: &[f64],
    target_freq_hz: f64,
    target_jitter_fs: f64,
    profile: &NoiseProfile,
    rng: &mut R,
) -> Result<Vec<f64>, ReproError> {
    match model {
        WaveformModel::Basic => basic_waveform(time_s, target_freq_hz, target_jitter_fs, rng),
        WaveformModel::Composite => {
            composite_waveform(time_s, target_freq_hz, target_jitter_fs, profile, rng)
        }
        WaveformModel::Calibrated => {
            let raw = composite_waveform(time_s, target_freq_hz, target_jitter_fs, profile, rng)?;
            calibrate_to_jitter(&raw, target_freq_hz, target_jitter_fs)
        }
    }
}
