//! Declarative per-effect configuration blocks
//!
//! Plain value holders with defaults matching the engine's stock camera
//! frame. Values are externally mutable (typically from UI); none of the
//! blocks contain logic. The option translator in [`crate::options`]
//! turns a snapshot of these values into frame options each frame.

use std::sync::Arc;

use ember_core::Color;
use serde::{Deserialize, Serialize};

use crate::chain::LutTexture;

/// Scene fog mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FogKind {
    #[default]
    None,
    Linear,
    Exp,
    Exp2,
}

impl FogKind {
    /// Map a numeric id to a fog mode. Unknown ids fall back to `None`,
    /// tolerating values written by older or newer tooling.
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => FogKind::Linear,
            2 => FogKind::Exp,
            3 => FogKind::Exp2,
            _ => FogKind::None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            FogKind::None => 0,
            FogKind::Linear => 1,
            FogKind::Exp => 2,
            FogKind::Exp2 => 3,
        }
    }
}

/// Tone mapping operator applied by the compose pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TonemapKind {
    #[default]
    Linear,
    Filmic,
    Hejl,
    Aces,
    Aces2,
    Neutral,
}

impl TonemapKind {
    /// Map a numeric id to a tone mapping operator, defaulting to `Linear`
    /// for unknown ids.
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => TonemapKind::Filmic,
            2 => TonemapKind::Hejl,
            3 => TonemapKind::Aces,
            4 => TonemapKind::Aces2,
            5 => TonemapKind::Neutral,
            _ => TonemapKind::Linear,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            TonemapKind::Linear => 0,
            TonemapKind::Filmic => 1,
            TonemapKind::Hejl => 2,
            TonemapKind::Aces => 3,
            TonemapKind::Aces2 => 4,
            TonemapKind::Neutral => 5,
        }
    }
}

/// How SSAO is applied in the rendering process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SsaoKind {
    /// SSAO disabled, no pass is created
    #[default]
    None,
    /// Occlusion is applied during lighting
    Lighting,
    /// Occlusion is combined with the lit scene in the compose stage
    Combine,
}

impl SsaoKind {
    /// Map a numeric id to an SSAO type, defaulting to `None` for unknown
    /// ids.
    pub fn from_id(id: u32) -> Self {
        match id {
            1 => SsaoKind::Lighting,
            2 => SsaoKind::Combine,
            _ => SsaoKind::None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            SsaoKind::None => 0,
            SsaoKind::Lighting => 1,
            SsaoKind::Combine => 2,
        }
    }
}

/// Pixel formats usable for the scene render target, in HDR precision order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Packed 11/11/10 float, fastest HDR format
    R11g11b10Float,
    Rgba16Float,
    Rgba32Float,
    /// LDR fallback; using it disables HDR-dependent effects like bloom
    Rgba8,
}

/// Settings that control scene rendering: resolution, pixel format,
/// multi-sampling, tone mapping and scene-level fog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Preferred render formats in order of preference. The first format
    /// supported by the hardware is used; when none are supported, RGBA8
    /// is used, which disables bloom.
    pub render_formats: Vec<PixelFormat>,
    /// Whether the render buffer has a stencil buffer
    pub stencil: bool,
    /// Scale of the render target, 0.1-1 range
    pub render_target_scale: f32,
    /// MSAA sample count of the scene render target, 1-4 range
    pub samples: u32,
    /// Whether rendering generates a scene color map
    pub scene_color_map: bool,
    /// Whether rendering generates a scene depth map
    pub scene_depth_map: bool,
    pub tone_mapping: TonemapKind,
    /// Sharpening intensity, 0-1 range. Counteracts TAA or low-resolution
    /// render target blurriness.
    pub sharpness: f32,
    /// Scene fog mode. Fog is scene state pushed every frame, not a pass.
    pub fog: FogKind,
    pub fog_color: Color,
    pub fog_start: f32,
    pub fog_end: f32,
    pub fog_density: f32,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            render_formats: vec![
                PixelFormat::R11g11b10Float,
                PixelFormat::Rgba16Float,
                PixelFormat::Rgba32Float,
            ],
            stencil: false,
            render_target_scale: 1.0,
            samples: 1,
            scene_color_map: false,
            scene_depth_map: false,
            tone_mapping: TonemapKind::Linear,
            sharpness: 0.0,
            fog: FogKind::None,
            fog_color: Color::BLACK,
            fog_start: 1.0,
            fog_end: 1000.0,
            fog_density: 0.0,
        }
    }
}

/// Screen-space ambient occlusion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SsaoConfig {
    pub kind: SsaoKind,
    /// Whether the occlusion texture is blurred
    pub blur_enabled: bool,
    /// Randomize sampling per frame. Useful instead of blur when TAA is on.
    pub randomize: bool,
    /// Intensity, 0-1 range
    pub intensity: f32,
    /// World-space radius, 0-100 range
    pub radius: f32,
    /// Number of occlusion samples, 1-64 range
    pub samples: u32,
    /// Falloff power, 0.1-10 range
    pub power: f32,
    /// Minimum horizon angle in degrees, 1-90 range. Reduces fake
    /// occlusion on low-tessellation geometry.
    pub min_angle: f32,
    /// Occlusion texture scale relative to the scene target, 0.5-1 range
    pub scale: f32,
}

impl Default for SsaoConfig {
    fn default() -> Self {
        Self {
            kind: SsaoKind::None,
            blur_enabled: true,
            randomize: false,
            intensity: 0.5,
            radius: 30.0,
            samples: 12,
            power: 6.0,
            min_angle: 10.0,
            scale: 1.0,
        }
    }
}

/// HDR bloom settings. A zero intensity disables the effect; there is no
/// separate enabled flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Intensity, 0-0.1 range. Zero disables bloom entirely.
    pub intensity: f32,
    /// Number of blur iterations, each doubling the blur size. Capped by
    /// the render target mip count.
    pub blur_level: u32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            blur_level: 16,
        }
    }
}

/// Color grading settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub enabled: bool,
    /// Brightness, 0-3 range
    pub brightness: f32,
    /// Contrast, 0.5-1.5 range
    pub contrast: f32,
    /// Saturation, 0-2 range
    pub saturation: f32,
    pub tint: Color,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            brightness: 1.0,
            contrast: 1.0,
            saturation: 1.0,
            tint: Color::WHITE,
        }
    }
}

/// Color lookup table settings. The LUT is disabled while no texture is
/// assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorLutConfig {
    /// LUT texture resolved from the asset system; consumed read-only
    #[serde(skip)]
    pub texture: Option<Arc<dyn LutTexture>>,
    pub intensity: f32,
}

impl Default for ColorLutConfig {
    fn default() -> Self {
        Self {
            texture: None,
            intensity: 1.0,
        }
    }
}

/// Vignette settings. A zero intensity disables the effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VignetteConfig {
    /// Intensity, 0-1 range. Zero disables the vignette.
    pub intensity: f32,
    /// Inner distance from screen center where the falloff starts, 0-3 range
    pub inner: f32,
    /// Outer distance where the vignette reaches full intensity, 0-3 range
    pub outer: f32,
    /// Corner curvature of the vignette rectangle, 0.01-10 range; 1 is a circle
    pub curvature: f32,
}

impl Default for VignetteConfig {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            inner: 0.5,
            outer: 1.0,
            curvature: 0.5,
        }
    }
}

/// Chromatic aberration settings. A zero intensity disables the effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FringingConfig {
    /// Intensity, 0-100 range. Zero disables fringing.
    pub intensity: f32,
}

impl Default for FringingConfig {
    fn default() -> Self {
        Self { intensity: 0.0 }
    }
}

/// Temporal anti-aliasing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaaConfig {
    pub enabled: bool,
    /// Camera jitter amplitude, 0-1 range
    pub jitter: f32,
}

impl Default for TaaConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            jitter: 1.0,
        }
    }
}

/// Depth of field settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DofConfig {
    pub enabled: bool,
    /// Whether objects closer than the focus range are blurred as well
    pub near_blur: bool,
    pub focus_distance: f32,
    /// Range around the focus distance that stays sharp
    pub focus_range: f32,
    /// Blur radius, typically 2-10 range
    pub blur_radius: f32,
    /// Number of blur rings, typically 3-8 range
    pub blur_rings: u32,
    /// Number of points per blur ring, typically 3-8 range
    pub blur_ring_points: u32,
    /// Use the higher-quality, higher-cost implementation
    pub high_quality: bool,
}

impl Default for DofConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            near_blur: false,
            focus_distance: 100.0,
            focus_range: 10.0,
            blur_radius: 3.0,
            blur_rings: 4,
            blur_ring_points: 5,
            high_quality: true,
        }
    }
}

/// All configuration blocks for one camera frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraFrameConfig {
    pub rendering: RenderingConfig,
    pub ssao: SsaoConfig,
    pub bloom: BloomConfig,
    pub grading: GradingConfig,
    pub color_lut: ColorLutConfig,
    pub vignette: VignetteConfig,
    pub fringing: FringingConfig,
    pub taa: TaaConfig,
    pub dof: DofConfig,
}

impl CameraFrameConfig {
    /// Parse a configuration from TOML. Missing blocks and fields take
    /// their defaults.
    pub fn from_toml(text: &str) -> ember_core::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> ember_core::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_stock_frame() {
        let config = CameraFrameConfig::default();
        assert_eq!(config.rendering.render_formats.len(), 3);
        assert_eq!(config.rendering.samples, 1);
        assert_eq!(config.ssao.kind, SsaoKind::None);
        assert_eq!(config.bloom.intensity, 0.0);
        assert_eq!(config.bloom.blur_level, 16);
        assert!(!config.grading.enabled);
        assert!(config.color_lut.texture.is_none());
        assert_eq!(config.vignette.inner, 0.5);
        assert!(!config.taa.enabled);
        assert_eq!(config.taa.jitter, 1.0);
        assert_eq!(config.dof.blur_ring_points, 5);
        assert_eq!(config.rendering.fog, FogKind::None);
        assert_eq!(config.rendering.fog_end, 1000.0);
    }

    #[test]
    fn test_enum_from_id_tolerates_unknown_values() {
        assert_eq!(SsaoKind::from_id(1), SsaoKind::Lighting);
        assert_eq!(SsaoKind::from_id(99), SsaoKind::None);
        assert_eq!(TonemapKind::from_id(3), TonemapKind::Aces);
        assert_eq!(TonemapKind::from_id(1000), TonemapKind::Linear);
        assert_eq!(FogKind::from_id(2), FogKind::Exp);
        assert_eq!(FogKind::from_id(42), FogKind::None);
    }

    #[test]
    fn test_enum_id_round_trip() {
        for id in 0..3 {
            assert_eq!(SsaoKind::from_id(id).id(), id);
        }
        for id in 0..6 {
            assert_eq!(TonemapKind::from_id(id).id(), id);
        }
        for id in 0..4 {
            assert_eq!(FogKind::from_id(id).id(), id);
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = CameraFrameConfig::default();
        config.bloom.intensity = 0.05;
        config.ssao.kind = SsaoKind::Lighting;
        config.rendering.fog = FogKind::Linear;

        let text = config.to_toml().unwrap();
        let parsed = CameraFrameConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.bloom.intensity, 0.05);
        assert_eq!(parsed.ssao.kind, SsaoKind::Lighting);
        assert_eq!(parsed.rendering.fog, FogKind::Linear);
    }

    #[test]
    fn test_toml_partial_config_uses_defaults() {
        let config = CameraFrameConfig::from_toml(
            r#"
            [bloom]
            intensity = 0.02

            [taa]
            enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.bloom.intensity, 0.02);
        assert_eq!(config.bloom.blur_level, 16);
        assert!(config.taa.enabled);
        assert_eq!(config.ssao.kind, SsaoKind::None);
    }
}
