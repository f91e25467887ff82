//! Shader configuration and parameter translation
//!
//! The core selects a built-in shader program by numeric id and accepts a map
//! of named string parameters for the parameterized upscalers. This module
//! holds the typed configuration the host works with and the deterministic
//! translation into the (program id, parameter map) pair the core consumes.
//! Equal configurations always translate to equal parameter sets, which lets
//! the session skip redundant core updates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Program id for the pass-through shader.
pub const SHADER_DEFAULT: u32 = 0;
/// Program id for the CRT shader.
pub const SHADER_CRT: u32 = 1;
/// Program id for the LCD shader.
pub const SHADER_LCD: u32 = 2;
/// Program id for the sharp bilinear shader.
pub const SHADER_SHARP: u32 = 3;
/// Program id for the first-generation upscaler.
pub const SHADER_CUT: u32 = 4;
/// Program id for the second-generation upscaler.
pub const SHADER_CUT2: u32 = 5;
/// Program id for the third-generation upscaler.
pub const SHADER_CUT3: u32 = 6;

/// Typed shader selection owned by the host.
///
/// Replacing the configuration re-translates and pushes the parameters to the
/// core; it never requires a core reset.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum ShaderConfig {
    /// Plain bilinear output.
    #[default]
    Default,
    /// Scanline CRT emulation.
    Crt,
    /// Grid LCD emulation.
    Lcd,
    /// Sharp bilinear (pixel-art friendly).
    Sharp,
    /// First-generation content-aware upscaler.
    Cut(CutConfig),
    /// Second-generation content-aware upscaler.
    Cut2(Cut2Config),
    /// Third-generation content-aware upscaler.
    Cut3(Cut3Config),
}

/// Parameters for [`ShaderConfig::Cut`].
///
/// `None` fields are omitted from the translated map and the core falls back
/// to its built-in default for that parameter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CutConfig {
    /// Minimum sharpness, in [0, 1]. Core default: 0.1.
    pub sharpness_min: Option<f32>,
    /// Maximum sharpness, in [0, 1]. Core default: 0.3.
    pub sharpness_max: Option<f32>,
}

/// Parameters for [`ShaderConfig::Cut2`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cut2Config {
    /// Sharpness bias multiplier, >= 0. Core default: 1.0.
    pub sharpness_bias: Option<f32>,
    /// Maximum sharpness, in [0, 1]. Core default: 1.0.
    pub sharpness_max: Option<f32>,
}

/// Parameters for [`ShaderConfig::Cut3`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cut3Config {
    /// Blend sharpness dynamically from local contrast. Core default: true.
    pub use_dynamic_blend: Option<bool>,
    /// Contrast edge below which blending is minimal, in [0, 1]. Core default: 0.0.
    pub blend_min_contrast_edge: Option<f32>,
    /// Contrast edge above which blending is maximal, in [0, 1]. Core default: 1.0.
    pub blend_max_contrast_edge: Option<f32>,
    /// Sharpness applied at the minimum contrast edge, in [0, 1]. Core default: 0.0.
    pub blend_min_sharpness: Option<f32>,
    /// Sharpness applied at the maximum contrast edge, in [0, 1]. Core default: 1.0.
    pub blend_max_sharpness: Option<f32>,
    /// Sharpness used when dynamic blending is off, in [0, 1]. Core default: 0.5.
    pub static_sharpness: Option<f32>,
    /// Use the fast luma approximation for edge detection. Core default: false.
    pub edge_use_fast_luma: Option<bool>,
    /// Minimum luma delta considered an edge, in [0, 1]. Core default: 0.03.
    pub edge_min_value: Option<f32>,
    /// Minimum contrast ratio considered an edge, >= 1. Core default: 1.20.
    pub edge_min_contrast: Option<f32>,
    /// Apply gamma correction to luma estimates. Core default: false.
    pub luma_adjust_gamma: Option<bool>,
    /// Render a split view with the raw image for comparison. Core default: false.
    pub split_demo_view: Option<bool>,
}

/// Translated shader selection: program id plus the ordered parameter map the
/// core consumes. Equality on this type is the change-detection primitive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderParams {
    pub program: u32,
    pub entries: BTreeMap<String, String>,
}

impl ShaderConfig {
    /// Numeric id of the core shader program this configuration selects.
    pub fn program_id(&self) -> u32 {
        match self {
            Self::Default => SHADER_DEFAULT,
            Self::Crt => SHADER_CRT,
            Self::Lcd => SHADER_LCD,
            Self::Sharp => SHADER_SHARP,
            Self::Cut(_) => SHADER_CUT,
            Self::Cut2(_) => SHADER_CUT2,
            Self::Cut3(_) => SHADER_CUT3,
        }
    }

    /// Translate into the parameter form the core consumes.
    ///
    /// Pure and deterministic: identical configurations yield identical
    /// output. Booleans encode as "0"/"1", floats via their shortest decimal
    /// display. Absent (`None`) fields are omitted entirely; range-limited
    /// fields are clamped to their documented range.
    pub fn to_params(&self) -> ShaderParams {
        let mut entries = BTreeMap::new();

        match self {
            Self::Default | Self::Crt | Self::Lcd | Self::Sharp => {}
            Self::Cut(cut) => {
                put_unit(&mut entries, "SHARPNESS_MIN", cut.sharpness_min);
                put_unit(&mut entries, "SHARPNESS_MAX", cut.sharpness_max);
            }
            Self::Cut2(cut2) => {
                put_min(&mut entries, "SHARPNESS_BIAS", cut2.sharpness_bias, 0.0);
                put_unit(&mut entries, "SHARPNESS_MAX", cut2.sharpness_max);
            }
            Self::Cut3(cut3) => {
                put_bool(&mut entries, "USE_DYNAMIC_BLEND", cut3.use_dynamic_blend);
                put_unit(
                    &mut entries,
                    "BLEND_MIN_CONTRAST_EDGE",
                    cut3.blend_min_contrast_edge,
                );
                put_unit(
                    &mut entries,
                    "BLEND_MAX_CONTRAST_EDGE",
                    cut3.blend_max_contrast_edge,
                );
                put_unit(&mut entries, "BLEND_MIN_SHARPNESS", cut3.blend_min_sharpness);
                put_unit(&mut entries, "BLEND_MAX_SHARPNESS", cut3.blend_max_sharpness);
                put_unit(&mut entries, "STATIC_SHARPNESS", cut3.static_sharpness);
                put_bool(&mut entries, "EDGE_USE_FAST_LUMA", cut3.edge_use_fast_luma);
                put_unit(&mut entries, "EDGE_MIN_VALUE", cut3.edge_min_value);
                put_min(&mut entries, "EDGE_MIN_CONTRAST", cut3.edge_min_contrast, 1.0);
                put_bool(&mut entries, "LUMA_ADJUST_GAMMA", cut3.luma_adjust_gamma);
                put_bool(&mut entries, "SPLIT_DEMO_VIEW", cut3.split_demo_view);
            }
        }

        ShaderParams {
            program: self.program_id(),
            entries,
        }
    }
}

fn put_bool(map: &mut BTreeMap<String, String>, key: &str, value: Option<bool>) {
    if let Some(v) = value {
        map.insert(key.to_string(), if v { "1" } else { "0" }.to_string());
    }
}

fn put_unit(map: &mut BTreeMap<String, String>, key: &str, value: Option<f32>) {
    if let Some(v) = value {
        map.insert(key.to_string(), v.clamp(0.0, 1.0).to_string());
    }
}

fn put_min(map: &mut BTreeMap<String, String>, key: &str, value: Option<f32>, min: f32) {
    if let Some(v) = value {
        map.insert(key.to_string(), v.max(min).to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_programs_have_no_parameters() {
        for config in [
            ShaderConfig::Default,
            ShaderConfig::Crt,
            ShaderConfig::Lcd,
            ShaderConfig::Sharp,
        ] {
            assert!(config.to_params().entries.is_empty());
        }
        assert_eq!(ShaderConfig::Crt.to_params().program, SHADER_CRT);
    }

    #[test]
    fn test_cut3_encodes_set_fields_and_omits_absent_ones() {
        let config = ShaderConfig::Cut3(Cut3Config {
            use_dynamic_blend: Some(false),
            blend_min_sharpness: Some(0.2),
            ..Default::default()
        });

        let params = config.to_params();
        assert_eq!(params.program, SHADER_CUT3);
        assert_eq!(params.entries.get("USE_DYNAMIC_BLEND").unwrap(), "0");
        assert_eq!(params.entries.get("BLEND_MIN_SHARPNESS").unwrap(), "0.2");
        // Absent fields contribute no key at all.
        assert_eq!(params.entries.len(), 2);
        assert!(!params.entries.contains_key("STATIC_SHARPNESS"));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let make = || {
            ShaderConfig::Cut3(Cut3Config {
                use_dynamic_blend: Some(true),
                edge_min_contrast: Some(1.5),
                split_demo_view: Some(false),
                ..Default::default()
            })
        };
        assert_eq!(make().to_params(), make().to_params());
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = ShaderConfig::Cut(CutConfig {
            sharpness_min: Some(-0.5),
            sharpness_max: Some(2.0),
        });
        let params = config.to_params();
        assert_eq!(params.entries.get("SHARPNESS_MIN").unwrap(), "0");
        assert_eq!(params.entries.get("SHARPNESS_MAX").unwrap(), "1");

        let config = ShaderConfig::Cut3(Cut3Config {
            edge_min_contrast: Some(0.2),
            ..Default::default()
        });
        assert_eq!(
            config.to_params().entries.get("EDGE_MIN_CONTRAST").unwrap(),
            "1"
        );
    }

    #[test]
    fn test_boolean_encoding() {
        let config = ShaderConfig::Cut3(Cut3Config {
            edge_use_fast_luma: Some(true),
            luma_adjust_gamma: Some(false),
            ..Default::default()
        });
        let params = config.to_params();
        assert_eq!(params.entries.get("EDGE_USE_FAST_LUMA").unwrap(), "1");
        assert_eq!(params.entries.get("LUMA_ADJUST_GAMMA").unwrap(), "0");
    }
}
