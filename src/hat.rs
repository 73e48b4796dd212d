//! Hardware-aware training noise layer
//!
//! Physical forward pass of a dense layer mapped onto a ReRAM crossbar:
//! device-to-device conductance spread, word-line IR drop, optional ageing,
//! and the TIA/ADC readout chain (thermal noise plus uniform quantization).

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal};
use serde::{Deserialize, Serialize};

use crate::ReproError;

/// Guard in the IR-drop denominator so a zero line effect stays finite
const LINE_EFFECT_EPSILON: f64 = 1e-9;

/// Dense layer, `y = x W^T + b`
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    /// Shape `(out_features, in_features)`
    pub weight: Array2<f64>,
    /// Length `out_features`
    pub bias: Option<Array1<f64>>,
}

impl Linear {
    pub fn new(weight: Array2<f64>, bias: Option<Array1<f64>>) -> Result<Self, ReproError> {
        if let Some(b) = &bias {
            if b.len() != weight.nrows() {
                return Err(ReproError::Shape(format!(
                    "bias has {} entries but weight has {} output rows",
                    b.len(),
                    weight.nrows()
                )));
            }
        }
        Ok(Self { weight, bias })
    }

    /// Weights and bias drawn uniformly from `[-1/sqrt(in), 1/sqrt(in)]`.
    pub fn random<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features.max(1) as f64).sqrt();
        let weight = Array2::from_shape_fn((out_features, in_features), |_| {
            rng.gen_range(-bound..=bound)
        });
        let bias = Array1::from_shape_fn(out_features, |_| rng.gen_range(-bound..=bound));
        Self {
            weight,
            bias: Some(bias),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_features(&self) -> usize {
        self.weight.nrows()
    }

    /// Noise-free forward pass with this layer's own weights.
    pub fn forward(&self, x: &Array2<f64>) -> Result<Array2<f64>, ReproError> {
        linear(x, &self.weight, self.bias.as_ref())
    }
}

/// `x W^T + b` for a batch `x` of shape `(batch, in_features)`.
pub fn linear(
    x: &Array2<f64>,
    weight: &Array2<f64>,
    bias: Option<&Array1<f64>>,
) -> Result<Array2<f64>, ReproError> {
    if x.ncols() != weight.ncols() {
        return Err(ReproError::Shape(format!(
            "input has {} features but weight expects {}",
            x.ncols(),
            weight.ncols()
        )));
    }

    let mut out = x.dot(&weight.t());
    if let Some(b) = bias {
        out += &b.view().insert_axis(Axis(0));
    }
    Ok(out)
}

/// Systematic degradation of an aged array
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgingConfig {
    /// Multiplicative conductance drift
    pub drift_factor: f64,
    /// Inputs are divided by this (SNR loss)
    pub noise_increase_factor: f64,
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            drift_factor: 1.05,
            noise_increase_factor: 1.5,
        }
    }
}

/// Non-ideality model of the physical forward pass.
///
/// Every stage can be switched off: `conductance_sigma = 0`,
/// `line_effect = 0`, `thermal_noise_std = 0`, `adc_bits = None`, `aging = None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HatConfig {
    /// Log-normal sigma of cell-to-cell conductance (measured LRS spread)
    pub conductance_sigma: f64,
    /// Effective word-line non-linearity after Kelvin-sense mitigation
    pub line_effect: f64,
    /// Readout thermal noise, in activation units
    pub thermal_noise_std: f64,
    /// ADC resolution; `None` skips clamping and quantization
    pub adc_bits: Option<u32>,
    pub aging: Option<AgingConfig>,
}

impl Default for HatConfig {
    fn default() -> Self {
        Self {
            conductance_sigma: 0.185,
            line_effect: 0.05,
            thermal_noise_std: 0.001,
            adc_bits: Some(8),
            aging: None,
        }
    }
}

impl HatConfig {
    /// All perturbations disabled: the forward pass is the plain linear map.
    pub fn ideal() -> Self {
        Self {
            conductance_sigma: 0.0,
            line_effect: 0.0,
            thermal_noise_std: 0.0,
            adc_bits: None,
            aging: None,
        }
    }

    pub fn aged(mut self) -> Self {
        self.aging = Some(AgingConfig::default());
        self
    }

    pub fn validate(&self) -> Result<(), ReproError> {
        if !self.conductance_sigma.is_finite() || self.conductance_sigma < 0.0 {
            return Err(ReproError::InvalidConfig(
                "conductance_sigma must be finite and non-negative".to_string(),
            ));
        }
        if !self.line_effect.is_finite() || self.line_effect < 0.0 {
            return Err(ReproError::InvalidConfig(
                "line_effect must be finite and non-negative".to_string(),
            ));
        }
        if !self.thermal_noise_std.is_finite() || self.thermal_noise_std < 0.0 {
            return Err(ReproError::InvalidConfig(
                "thermal_noise_std must be finite and non-negative".to_string(),
            ));
        }
        if let Some(bits) = self.adc_bits {
            if !(2..=24).contains(&bits) {
                return Err(ReproError::InvalidConfig(format!(
                    "adc_bits must be between 2 and 24, got {bits}"
                )));
            }
        }
        if let Some(aging) = &self.aging {
            if !aging.drift_factor.is_finite()
                || !aging.noise_increase_factor.is_finite()
                || aging.noise_increase_factor <= 0.0
            {
                return Err(ReproError::InvalidConfig(
                    "aging factors must be finite and noise_increase_factor positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Positive levels of the symmetric ADC grid, `2^bits / 2 - 1`
pub fn quantization_steps(bits: u32) -> f64 {
    2_f64.powi(bits as i32) / 2.0 - 1.0
}

/// Multiply every weight by an independent `LogNormal(0, sigma)` draw.
pub fn apply_conductance_variation<R: Rng + ?Sized>(
    weights: &Array2<f64>,
    sigma: f64,
    rng: &mut R,
) -> Result<Array2<f64>, ReproError> {
    if sigma == 0.0 {
        return Ok(weights.clone());
    }
    let spread = LogNormal::new(0.0, sigma)
        .map_err(|e| ReproError::InvalidConfig(format!("conductance spread: {e}")))?;
    Ok(weights.mapv(|w| w * spread.sample(rng)))
}

/// Word-line IR drop: `x * (1 - tanh(x * r) / (r + eps))`.
pub fn apply_interconnect_parasitics(x: &Array2<f64>, line_effect: f64) -> Array2<f64> {
    if line_effect == 0.0 {
        return x.clone();
    }
    x.mapv(|v| {
        let drop = (v * line_effect).tanh() / (line_effect + LINE_EFFECT_EPSILON);
        v * (1.0 - drop)
    })
}

/// Additive readout noise, then clamp to [-1, 1] and round to the ADC grid
/// (ties to even).
pub fn apply_readout_noise_and_quantization<R: Rng + ?Sized>(
    output: Array2<f64>,
    thermal_noise_std: f64,
    adc_bits: Option<u32>,
    rng: &mut R,
) -> Result<Array2<f64>, ReproError> {
    let mut noisy = output;
    if thermal_noise_std > 0.0 {
        let noise = Normal::new(0.0, thermal_noise_std)
            .map_err(|e| ReproError::InvalidConfig(format!("thermal noise: {e}")))?;
        noisy.mapv_inplace(|v| v + noise.sample(rng));
    }

    let Some(bits) = adc_bits else {
        return Ok(noisy);
    };

    let steps = quantization_steps(bits);
    noisy.mapv_inplace(|v| (v.clamp(-1.0, 1.0) * steps).round_ties_even() / steps);
    Ok(noisy)
}

/// Hardware-aware forward pass of `layer` on a batch `x`.
///
/// Draw order is fixed (conductance spread, then readout noise), so a seeded
/// RNG reproduces the output exactly.
pub fn stochastic_forward<R: Rng + ?Sized>(
    layer: &Linear,
    x: &Array2<f64>,
    config: &HatConfig,
    rng: &mut R,
) -> Result<Array2<f64>, ReproError> {
    config.validate()?;

    let mut weights = apply_conductance_variation(&layer.weight, config.conductance_sigma, rng)?;
    let mut inputs = apply_interconnect_parasitics(x, config.line_effect);

    if let Some(aging) = &config.aging {
        weights.mapv_inplace(|w| w * aging.drift_factor);
        inputs.mapv_inplace(|v| v * (1.0 / aging.noise_increase_factor));
    }

    let output = linear(&inputs, &weights, layer.bias.as_ref())?;
    apply_readout_noise_and_quantization(output, config.thermal_noise_std, config.adc_bits, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sample_layer() -> Linear {
        Linear::new(
            array![[0.2, -0.1, 0.05], [0.0, 0.3, -0.2]],
            Some(array![0.01, -0.02]),
        )
        .unwrap()
    }

    #[test]
    fn linear_matches_hand_computation() {
        let layer = sample_layer();
        let x = array![[1.0, 2.0, 3.0]];
        let y = layer.forward(&x).unwrap();
        // 0.2 - 0.2 + 0.15 + 0.01, 0.6 - 0.6 - 0.02
        assert_abs_diff_eq!(y[[0, 0]], 0.16, epsilon = 1e-12);
        assert_abs_diff_eq!(y[[0, 1]], -0.02, epsilon = 1e-12);
    }

    #[test]
    fn ideal_config_is_plain_linear() {
        let layer = sample_layer();
        let x = array![[0.3, -0.7, 1.9], [2.0, 0.1, -0.4]];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let physical = stochastic_forward(&layer, &x, &HatConfig::ideal(), &mut rng).unwrap();
        assert_eq!(physical, layer.forward(&x).unwrap());
    }

    #[test]
    fn same_seed_same_output() {
        let layer = sample_layer();
        let x = array![[0.3, -0.7, 0.9]];
        let config = HatConfig::default();
        let a = stochastic_forward(&layer, &x, &config, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        let b = stochastic_forward(&layer, &x, &config, &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn quantized_output_lies_on_adc_grid() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let layer = Linear::random(16, 8, &mut rng);
        let x = Array2::from_shape_fn((4, 16), |(i, j)| ((i * 16 + j) as f64 * 0.37).sin() * 3.0);
        let y = stochastic_forward(&layer, &x, &HatConfig::default(), &mut rng).unwrap();

        for &v in y.iter() {
            assert!((-1.0..=1.0).contains(&v));
            let k = v * 127.0;
            assert_abs_diff_eq!(k, k.round(), epsilon = 1e-9);
        }
    }

    #[test]
    fn ir_drop_matches_formula() {
        let x = array![[0.5, -2.0]];
        let out = apply_interconnect_parasitics(&x, 0.05);
        let expected = 0.5 * (1.0 - (0.025_f64).tanh() / (0.05 + 1e-9));
        assert_abs_diff_eq!(out[[0, 0]], expected, epsilon = 1e-15);
    }

    #[test]
    fn aging_scales_weights_and_inputs() {
        let layer = Linear::new(array![[1.0]], None).unwrap();
        let x = array![[0.3]];
        let config = HatConfig::ideal().aged();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let y = stochastic_forward(&layer, &x, &config, &mut rng).unwrap();
        assert_abs_diff_eq!(y[[0, 0]], 0.3 * 1.05 / 1.5, epsilon = 1e-12);
    }

    fn mean_and_std(values: impl Iterator<Item = f64>) -> (f64, f64) {
        let values: Vec<f64> = values.collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        (mean, var.sqrt())
    }

    #[test]
    fn conductance_spread_is_drawn_per_cell() {
        let weights = Array2::from_elem((200, 200), 1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let varied = apply_conductance_variation(&weights, 0.185, &mut rng).unwrap();

        let (mean, std) = mean_and_std(varied.iter().map(|factor| factor.ln()));
        assert_abs_diff_eq!(mean, 0.0, epsilon = 0.01);
        assert_abs_diff_eq!(std, 0.185, epsilon = 0.005);

        // neighbouring cells must not share a draw
        let row = varied.row(0);
        assert!(row.iter().zip(row.iter().skip(1)).all(|(a, b)| a != b));
    }

    #[test]
    fn readout_noise_has_configured_spread() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let out = apply_readout_noise_and_quantization(
            Array2::zeros((100, 100)),
            0.001,
            None,
            &mut rng,
        )
        .unwrap();

        let (mean, std) = mean_and_std(out.iter().copied());
        assert_abs_diff_eq!(mean, 0.0, epsilon = 5e-5);
        assert_abs_diff_eq!(std, 0.001, epsilon = 3e-5);
    }

    #[test]
    fn rounding_is_ties_to_even() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        // 2 bits -> one positive step; 0.5 sits exactly between 0 and 1
        let out = apply_readout_noise_and_quantization(array![[0.5, -0.5, 0.75]], 0.0, Some(2), &mut rng)
            .unwrap();
        assert_eq!(out, array![[0.0, -0.0, 1.0]]);
    }

    #[test]
    fn rejects_shape_mismatch() {
        let layer = sample_layer();
        let x = array![[1.0, 2.0]];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = stochastic_forward(&layer, &x, &HatConfig::default(), &mut rng).unwrap_err();
        assert!(matches!(err, ReproError::Shape(_)));
        assert!(Linear::new(array![[1.0, 2.0]], Some(array![1.0, 2.0])).is_err());
    }

    #[test]
    fn rejects_negative_sigma() {
        let config = HatConfig {
            conductance_sigma: -0.1,
            ..HatConfig::default()
        };
        assert!(config.validate().is_err());
    }

    proptest! {
        #[test]
        fn grid_has_at_most_two_to_the_bits_levels(seed in any::<u64>(), bits in 2_u32..10) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let layer = Linear::random(6, 5, &mut rng);
            let x = Array2::from_shape_fn((3, 6), |_| rng.gen_range(-4.0..4.0));
            let config = HatConfig { adc_bits: Some(bits), ..HatConfig::default() };
            let y = stochastic_forward(&layer, &x, &config, &mut rng).unwrap();

            let steps = quantization_steps(bits);
            for &v in y.iter() {
                let k = (v * steps).round();
                prop_assert!((v * steps - k).abs() < 1e-9);
                prop_assert!(k.abs() <= steps);
            }
            prop_assert!(2.0 * steps + 1.0 <= 2_f64.powi(bits as i32));
        }
    }
}
