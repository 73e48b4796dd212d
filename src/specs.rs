//! SAR ADC design specifications
//!
//! Static description of the 8-bit SAR ADC core in two revisions: the baseline
//! architectural sheet and the full design specification with derived noise
//! figures. Field order is the serialized key order.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::ReproError;

/// Boltzmann constant used for the kT/C estimate (J/K)
pub const BOLTZMANN_K: f64 = 1.38e-23;

pub const TECH_NODE: &str = "TSMC 28nm HPC+";
pub const VDD_V: f64 = 0.9;
pub const RESOLUTION_BITS: u32 = 8;
pub const TEMP_K: f64 = 300.0;
pub const UNIT_CAPACITANCE_FF: f64 = 1.0;

/// Effective sampling capacitance per side for the noise estimate, 2^(N/2) * C_unit
pub const TOTAL_CAPACITANCE_PER_SIDE_FF: f64 = 16.0 * UNIT_CAPACITANCE_FF;

const BANNER: &str = "=====================================================================";

/// RMS kT/C sampling noise in microvolts
pub fn ktc_noise_rms_uv(capacitance_ff: f64, temp_k: f64) -> f64 {
    ((BOLTZMANN_K * temp_k) / (capacitance_ff * 1e-15)).sqrt() * 1e6
}

/// LSB voltage in millivolts
pub fn lsb_mv(vdd_v: f64, bits: u32) -> f64 {
    vdd_v / 2_f64.powi(bits as i32) * 1000.0
}

/// Walden figure of merit, `P / (2^ENOB * Fs)`, in fJ per conversion step
pub fn walden_fom_fj(power_uw: f64, enob_bits: f64, sampling_rate_msps: f64) -> f64 {
    (power_uw * 1e-6) / (2_f64.powf(enob_bits) * sampling_rate_msps * 1e6) * 1e15
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecVersion {
    V1,
    #[default]
    V2,
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecVersion::V1 => f.write_str("v1"),
            SpecVersion::V2 => f.write_str("v2"),
        }
    }
}

impl FromStr for SpecVersion {
    type Err = ReproError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(SpecVersion::V1),
            "v2" | "2" => Ok(SpecVersion::V2),
            other => Err(ReproError::InvalidConfig(format!(
                "unknown spec version '{other}', expected v1 or v2"
            ))),
        }
    }
}

/// Baseline architectural sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SarAdcSpecs {
    pub technology_node: &'static str,
    pub supply_voltage_v: f64,
    pub resolution_bits: u32,
    pub architecture: &'static str,
    pub cdac: Cdac,
    pub comparator: Comparator,
    pub sar_logic: SarLogic,
    pub performance_targets: PerformanceTargets,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cdac {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "unit_capacitance_fF")]
    pub unit_capacitance_ff: f64,
    pub bridge_capacitor: &'static str,
    pub lsb_array_weights: Vec<&'static str>,
    pub msb_array_weights: Vec<&'static str>,
    /// (1+2+4+8)*2 + bridge, ignoring that the bridge sits in series
    #[serde(rename = "total_capacitance_per_side_fF")]
    pub total_capacitance_per_side_ff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparator {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub pre_amplifier: PreAmplifier,
    pub latch: Latch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreAmplifier {
    pub description: &'static str,
    #[serde(rename = "input_nmos_W_um")]
    pub input_nmos_w_um: f64,
    #[serde(rename = "input_nmos_L_nm")]
    pub input_nmos_l_nm: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Latch {
    pub description: &'static str,
    #[serde(rename = "input_pair_nmos_W_um")]
    pub input_pair_nmos_w_um: f64,
    #[serde(rename = "input_pair_nmos_L_nm")]
    pub input_pair_nmos_l_nm: u32,
    #[serde(rename = "cross_coupled_nmos_W_um")]
    pub cross_coupled_nmos_w_um: f64,
    #[serde(rename = "cross_coupled_nmos_L_nm")]
    pub cross_coupled_nmos_l_nm: u32,
    #[serde(rename = "cross_coupled_pmos_W_um")]
    pub cross_coupled_pmos_w_um: f64,
    #[serde(rename = "cross_coupled_pmos_L_nm")]
    pub cross_coupled_pmos_l_nm: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SarLogic {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
    pub synthesis_target: &'static str,
}

/// Target ranges, kept as the quoted strings of the original sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceTargets {
    #[serde(rename = "sampling_rate_MSps")]
    pub sampling_rate_msps: &'static str,
    #[serde(rename = "power_consumption_uW")]
    pub power_consumption_uw: &'static str,
    pub enob_bits: &'static str,
    #[serde(rename = "figure_of_merit_fJ_conv-step")]
    pub figure_of_merit_fj_conv_step: &'static str,
}

fn binary_weights() -> Vec<&'static str> {
    vec!["1C", "2C", "4C", "8C"]
}

/// Baseline architectural specification of the SAR ADC.
pub fn sar_adc_specs() -> SarAdcSpecs {
    SarAdcSpecs {
        technology_node: TECH_NODE,
        supply_voltage_v: VDD_V,
        resolution_bits: RESOLUTION_BITS,
        architecture: "Fully Differential Charge-Redistribution SAR",
        cdac: Cdac {
            kind: "Differential Split-Capacitor Array",
            unit_capacitance_ff: UNIT_CAPACITANCE_FF,
            bridge_capacitor: "1 * unit_capacitance",
            lsb_array_weights: binary_weights(),
            msb_array_weights: binary_weights(),
            total_capacitance_per_side_ff: 31.0,
        },
        comparator: Comparator {
            kind: "Dynamic StrongARM Latch with Low-Noise Pre-amplifier",
            pre_amplifier: PreAmplifier {
                description: "Differential pair with diode-connected PMOS loads for good common-mode rejection.",
                input_nmos_w_um: 1.2,
                input_nmos_l_nm: 30,
            },
            latch: Latch {
                description: "Standard StrongARM latch for high-speed, zero static power operation.",
                input_pair_nmos_w_um: 1.0,
                input_pair_nmos_l_nm: 30,
                cross_coupled_nmos_w_um: 0.5,
                cross_coupled_nmos_l_nm: 30,
                cross_coupled_pmos_w_um: 1.0,
                cross_coupled_pmos_l_nm: 30,
            },
        },
        sar_logic: SarLogic {
            kind: "Asynchronous Control FSM",
            description: "Self-timed logic that triggers the comparator only after the DAC has settled, maximizing speed and efficiency.",
            synthesis_target: "Standard Cell Library for TSMC 28nm",
        },
        performance_targets: PerformanceTargets {
            sampling_rate_msps: "100-200",
            power_consumption_uw: "< 100",
            enob_bits: "> 7.5",
            figure_of_merit_fj_conv_step: "< 10",
        },
    }
}

/// Full design sheet with the noise-derived CDAC rationale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SarAdcSpecsV2 {
    pub project_context: &'static str,
    pub module: &'static str,
    pub technology: Technology,
    pub architecture: &'static str,
    pub resolution_bits: u32,
    pub cdac: CdacV2,
    pub comparator: ComparatorV2,
    pub sar_logic: SarLogicV2,
    pub performance_targets: PerformanceTargetsV2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Technology {
    pub node: &'static str,
    #[serde(rename = "supply_voltage_V")]
    pub supply_voltage_v: f64,
    pub min_channel_length_nm: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdacV2 {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub design_rationale: CdacRationale,
    pub parameters: CdacParameters,
    pub switches: Switches,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdacRationale {
    pub unit_capacitance_selection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CdacParameters {
    #[serde(rename = "unit_capacitance_fF")]
    pub unit_capacitance_ff: f64,
    #[serde(rename = "bridge_capacitor_fF")]
    pub bridge_capacitor_ff: f64,
    pub lsb_array_weights: Vec<&'static str>,
    pub msb_array_weights: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Switches {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "sampling_switch_nmos_W_nm")]
    pub sampling_switch_nmos_w_nm: u32,
    #[serde(rename = "sampling_switch_pmos_W_nm")]
    pub sampling_switch_pmos_w_nm: u32,
    #[serde(rename = "dac_switch_nmos_W_nm")]
    pub dac_switch_nmos_w_nm: u32,
    #[serde(rename = "dac_switch_pmos_W_nm")]
    pub dac_switch_pmos_w_nm: u32,
    #[serde(rename = "all_switches_L_nm")]
    pub all_switches_l_nm: u32,
}

/// Transistor sizing; width is given either in um or in nm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceSize {
    #[serde(rename = "W_um", skip_serializing_if = "Option::is_none")]
    pub w_um: Option<f64>,
    #[serde(rename = "W_nm", skip_serializing_if = "Option::is_none")]
    pub w_nm: Option<u32>,
    #[serde(rename = "L_nm")]
    pub l_nm: u32,
    #[serde(rename = "target_current_uA", skip_serializing_if = "Option::is_none")]
    pub target_current_ua: Option<u32>,
}

impl DeviceSize {
    pub fn um(w_um: f64, l_nm: u32) -> Self {
        Self {
            w_um: Some(w_um),
            w_nm: None,
            l_nm,
            target_current_ua: None,
        }
    }

    pub fn nm(w_nm: u32, l_nm: u32) -> Self {
        Self {
            w_um: None,
            w_nm: Some(w_nm),
            l_nm,
            target_current_ua: None,
        }
    }

    pub fn with_current_ua(mut self, current_ua: u32) -> Self {
        self.target_current_ua = Some(current_ua);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparatorV2 {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub design_rationale: ArchitectureRationale,
    pub pre_amplifier: PreAmplifierV2,
    pub latch: LatchV2,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchitectureRationale {
    pub architecture_selection: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreAmplifierV2 {
    pub input_pair_nmos: DeviceSize,
    pub cascode_load_pmos: DeviceSize,
    pub tail_current_nmos: DeviceSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatchV2 {
    pub input_pair_nmos: DeviceSize,
    pub cross_coupled_nmos: DeviceSize,
    pub cross_coupled_pmos: DeviceSize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SarLogicV2 {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub design_rationale: ArchitectureRationale,
    pub synthesis_target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceTargetsV2 {
    #[serde(rename = "sampling_rate_MSps")]
    pub sampling_rate_msps: u32,
    #[serde(rename = "power_consumption_uW")]
    pub power_consumption_uw: u32,
    pub enob_bits: f64,
    #[serde(rename = "signal_to_noise_and_distortion_dB")]
    pub sndr_db: f64,
    /// Published Walden FoM, P / (2^ENOB * Fs)
    #[serde(rename = "figure_of_merit_fJ_conv-step")]
    pub figure_of_merit_fj_conv_step: f64,
}

impl PerformanceTargetsV2 {
    /// Walden FoM recomputed from the power, ENOB and sampling-rate targets.
    pub fn computed_fom_fj(&self) -> f64 {
        walden_fom_fj(
            f64::from(self.power_consumption_uw),
            self.enob_bits,
            f64::from(self.sampling_rate_msps),
        )
    }
}

fn unit_capacitance_rationale() -> String {
    let noise_uv = ktc_noise_rms_uv(TOTAL_CAPACITANCE_PER_SIDE_FF, TEMP_K);
    let lsb = lsb_mv(VDD_V, RESOLUTION_BITS);
    format!(
        "C_unit={UNIT_CAPACITANCE_FF:.1}fF selected to keep kT/C noise ({noise_uv:.2} uV_rms) significantly below LSB ({lsb:.2} mV)."
    )
}

/// Full design specification, with the CDAC rationale derived from kT/C noise.
pub fn sar_adc_specs_v2() -> SarAdcSpecsV2 {
    SarAdcSpecsV2 {
        project_context: "Cognitive Co-Processor (RICC) for Nature Electronics",
        module: "8-bit Successive Approximation Register (SAR) ADC",
        technology: Technology {
            node: TECH_NODE,
            supply_voltage_v: VDD_V,
            min_channel_length_nm: 30,
        },
        architecture: "Fully Differential, Asynchronous, Charge-Redistribution SAR",
        resolution_bits: RESOLUTION_BITS,
        cdac: CdacV2 {
            kind: "Differential Split-Capacitor Array (Saves >85% area)",
            design_rationale: CdacRationale {
                unit_capacitance_selection: unit_capacitance_rationale(),
            },
            parameters: CdacParameters {
                unit_capacitance_ff: UNIT_CAPACITANCE_FF,
                bridge_capacitor_ff: UNIT_CAPACITANCE_FF,
                lsb_array_weights: binary_weights(),
                msb_array_weights: binary_weights(),
            },
            switches: Switches {
                kind: "CMOS Transmission Gates (T-Gates) for rail-to-rail operation",
                sampling_switch_nmos_w_nm: 600,
                sampling_switch_pmos_w_nm: 1200,
                dac_switch_nmos_w_nm: 300,
                dac_switch_pmos_w_nm: 600,
                all_switches_l_nm: 30,
            },
        },
        comparator: ComparatorV2 {
            kind: "StrongARM Latch with a low-noise, cascode-load Pre-amplifier",
            design_rationale: ArchitectureRationale {
                architecture_selection: "Pre-amplifier isolates the sensitive CDAC from latch kickback noise. StrongARM latch provides zero static power and high-speed operation.",
            },
            pre_amplifier: PreAmplifierV2 {
                input_pair_nmos: DeviceSize::um(1.2, 30),
                cascode_load_pmos: DeviceSize::nm(240, 30),
                tail_current_nmos: DeviceSize::um(2.5, 60).with_current_ua(50),
            },
            latch: LatchV2 {
                input_pair_nmos: DeviceSize::um(1.0, 30),
                cross_coupled_nmos: DeviceSize::nm(500, 30),
                cross_coupled_pmos: DeviceSize::um(1.0, 30),
            },
        },
        sar_logic: SarLogicV2 {
            kind: "Asynchronous, Self-Timed Control FSM",
            design_rationale: ArchitectureRationale {
                architecture_selection: "Eliminates need for high-speed external clock. Initiates comparison only after DAC settles, maximizing conversion speed for a given power budget.",
            },
            synthesis_target: format!("Standard Cell Library for {TECH_NODE}"),
        },
        performance_targets: PerformanceTargetsV2 {
            sampling_rate_msps: 150,
            power_consumption_uw: 85,
            enob_bits: 7.6,
            sndr_db: 47.5,
            figure_of_merit_fj_conv_step: 8.1,
        },
    }
}

/// Pretty-print a value as JSON with a 4-space indent.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, ReproError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Printable specification sheet: banner, JSON body, closing note.
pub fn render_report(version: SpecVersion) -> Result<String, ReproError> {
    let mut lines = Vec::new();
    match version {
        SpecVersion::V1 => {
            let specs = sar_adc_specs();
            lines.push(BANNER.to_string());
            lines.push(" RICC Project: 8-bit SAR ADC Design Specifications (TSMC 28nm)".to_string());
            lines.push(BANNER.to_string());
            lines.push(to_json_pretty(&specs)?);
            lines.push(String::new());
            lines.push("This specification is intended for the supplementary materials of".to_string());
            lines.push("the Nature Electronics submission to ensure full reproducibility.".to_string());
        }
        SpecVersion::V2 => {
            let specs = sar_adc_specs_v2();
            lines.push(BANNER.to_string());
            lines.push(" RICC Project: Definitive 8-bit SAR ADC Design Specifications".to_string());
            lines.push(format!(" Target Technology: {}", specs.technology.node));
            lines.push(BANNER.to_string());
            lines.push(to_json_pretty(&specs)?);
            lines.push(String::new());
            lines.push("[This script serves as a formal, reproducible design document for".to_string());
            lines.push("the Nature Electronics submission's supplementary materials.]".to_string());
        }
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn ktc_noise_for_16ff_at_300k() {
        assert_relative_eq!(ktc_noise_rms_uv(16.0, 300.0), 508.674_748_7, max_relative = 1e-9);
    }

    #[test]
    fn lsb_for_8_bits_at_0v9() {
        assert_relative_eq!(lsb_mv(0.9, 8), 3.515625);
    }

    #[test]
    fn walden_fom_matches_hand_computation() {
        // 85 uW / (2^7.6 * 150 MS/s)
        assert_relative_eq!(walden_fom_fj(85.0, 7.6, 150.0), 2.920_785_74, max_relative = 1e-8);
        // 1 mW, 10 bits, 1 MS/s -> 1e-3 / (1024 * 1e6) = 976.5625 fJ
        assert_relative_eq!(walden_fom_fj(1000.0, 10.0, 1.0), 976.5625, max_relative = 1e-12);
    }

    #[test]
    fn baseline_sheet_matches_literal() {
        let expected = json!({
            "technology_node": "TSMC 28nm HPC+",
            "supply_voltage_v": 0.9,
            "resolution_bits": 8,
            "architecture": "Fully Differential Charge-Redistribution SAR",
            "cdac": {
                "type": "Differential Split-Capacitor Array",
                "unit_capacitance_fF": 1.0,
                "bridge_capacitor": "1 * unit_capacitance",
                "lsb_array_weights": ["1C", "2C", "4C", "8C"],
                "msb_array_weights": ["1C", "2C", "4C", "8C"],
                "total_capacitance_per_side_fF": 31.0
            },
            "comparator": {
                "type": "Dynamic StrongARM Latch with Low-Noise Pre-amplifier",
                "pre_amplifier": {
                    "description": "Differential pair with diode-connected PMOS loads for good common-mode rejection.",
                    "input_nmos_W_um": 1.2,
                    "input_nmos_L_nm": 30
                },
                "latch": {
                    "description": "Standard StrongARM latch for high-speed, zero static power operation.",
                    "input_pair_nmos_W_um": 1.0,
                    "input_pair_nmos_L_nm": 30,
                    "cross_coupled_nmos_W_um": 0.5,
                    "cross_coupled_nmos_L_nm": 30,
                    "cross_coupled_pmos_W_um": 1.0,
                    "cross_coupled_pmos_L_nm": 30
                }
            },
            "sar_logic": {
                "type": "Asynchronous Control FSM",
                "description": "Self-timed logic that triggers the comparator only after the DAC has settled, maximizing speed and efficiency.",
                "synthesis_target": "Standard Cell Library for TSMC 28nm"
            },
            "performance_targets": {
                "sampling_rate_MSps": "100-200",
                "power_consumption_uW": "< 100",
                "enob_bits": "> 7.5",
                "figure_of_merit_fJ_conv-step": "< 10"
            }
        });

        assert_eq!(serde_json::to_value(sar_adc_specs()).unwrap(), expected);
    }

    #[test]
    fn full_sheet_matches_literal() {
        let expected = json!({
            "project_context": "Cognitive Co-Processor (RICC) for Nature Electronics",
            "module": "8-bit Successive Approximation Register (SAR) ADC",
            "technology": {
                "node": "TSMC 28nm HPC+",
                "supply_voltage_V": 0.9,
                "min_channel_length_nm": 30
            },
            "architecture": "Fully Differential, Asynchronous, Charge-Redistribution SAR",
            "resolution_bits": 8,
            "cdac": {
                "type": "Differential Split-Capacitor Array (Saves >85% area)",
                "design_rationale": {
                    "unit_capacitance_selection": "C_unit=1.0fF selected to keep kT/C noise (508.67 uV_rms) significantly below LSB (3.52 mV)."
                },
                "parameters": {
                    "unit_capacitance_fF": 1.0,
                    "bridge_capacitor_fF": 1.0,
                    "lsb_array_weights": ["1C", "2C", "4C", "8C"],
                    "msb_array_weights": ["1C", "2C", "4C", "8C"]
                },
                "switches": {
                    "type": "CMOS Transmission Gates (T-Gates) for rail-to-rail operation",
                    "sampling_switch_nmos_W_nm": 600,
                    "sampling_switch_pmos_W_nm": 1200,
                    "dac_switch_nmos_W_nm": 300,
                    "dac_switch_pmos_W_nm": 600,
                    "all_switches_L_nm": 30
                }
            },
            "comparator": {
                "type": "StrongARM Latch with a low-noise, cascode-load Pre-amplifier",
                "design_rationale": {
                    "architecture_selection": "Pre-amplifier isolates the sensitive CDAC from latch kickback noise. StrongARM latch provides zero static power and high-speed operation."
                },
                "pre_amplifier": {
                    "input_pair_nmos": {"W_um": 1.2, "L_nm": 30},
                    "cascode_load_pmos": {"W_nm": 240, "L_nm": 30},
                    "tail_current_nmos": {"W_um": 2.5, "L_nm": 60, "target_current_uA": 50}
                },
                "latch": {
                    "input_pair_nmos": {"W_um": 1.0, "L_nm": 30},
                    "cross_coupled_nmos": {"W_nm": 500, "L_nm": 30},
                    "cross_coupled_pmos": {"W_um": 1.0, "L_nm": 30}
                }
            },
            "sar_logic": {
                "type": "Asynchronous, Self-Timed Control FSM",
                "design_rationale": {
                    "architecture_selection": "Eliminates need for high-speed external clock. Initiates comparison only after DAC settles, maximizing conversion speed for a given power budget."
                },
                "synthesis_target": "Standard Cell Library for TSMC 28nm HPC+"
            },
            "performance_targets": {
                "sampling_rate_MSps": 150,
                "power_consumption_uW": 85,
                "enob_bits": 7.6,
                "signal_to_noise_and_distortion_dB": 47.5,
                "figure_of_merit_fJ_conv-step": 8.1
            }
        });

        assert_eq!(serde_json::to_value(sar_adc_specs_v2()).unwrap(), expected);
    }

    #[test]
    fn report_keeps_declared_key_order() {
        let report = render_report(SpecVersion::V2).unwrap();
        let context = report.find("\"project_context\"").unwrap();
        let targets = report.find("\"performance_targets\"").unwrap();
        assert!(context < targets);
        assert!(report.contains(" Target Technology: TSMC 28nm HPC+"));
        assert!(report.contains("\n    \"module\": "));
    }

    #[test]
    fn v1_report_has_banner_and_note() {
        let report = render_report(SpecVersion::V1).unwrap();
        assert!(report.starts_with(BANNER));
        assert!(report.ends_with("to ensure full reproducibility."));
    }

    #[test]
    fn version_parses() {
        assert_eq!("V1".parse::<SpecVersion>().unwrap(), SpecVersion::V1);
        assert_eq!("2".parse::<SpecVersion>().unwrap(), SpecVersion::V2);
        assert!("v3".parse::<SpecVersion>().is_err());
    }
}
