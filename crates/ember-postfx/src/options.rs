//! Option translator
//!
//! Pure mapping from the configuration blocks to the derived frame
//! record: structural [`FrameOptions`] that determine which passes exist,
//! and parametric [`FrameParams`] pushed into live passes every frame.
//! The translation is total; out-of-range values are clamped or
//! defaulted, never rejected. A fresh immutable [`FrameSpec`] is computed
//! each frame and diffed against the snapshot that built the current
//! chain, so disabled effects carry no stale fields.

use std::sync::Arc;

use ember_core::Color;

use crate::chain::LutTexture;
use crate::config::{CameraFrameConfig, FogKind, PixelFormat, SsaoKind, TonemapKind};

/// Maximum number of fallback pixel formats considered for the scene
/// render target.
pub const MAX_RENDER_FORMATS: usize = 3;

/// Structural frame configuration: the minimal set of values that
/// determine which passes exist and their fixed-cost configuration.
/// Equality against the last-used options decides chain rebuilds.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOptions {
    /// Preferred scene target formats, at most [`MAX_RENDER_FORMATS`]
    pub formats: Vec<PixelFormat>,
    pub stencil: bool,
    pub samples: u32,
    pub scene_color_map: bool,
    /// Whether a depth prepass is requested for a scene depth map
    pub prepass_enabled: bool,
    /// Derived from bloom intensity; zero intensity means no bloom chain
    pub bloom_enabled: bool,
    pub taa_enabled: bool,
    pub ssao: SsaoKind,
    pub ssao_blur_enabled: bool,
    pub dof: Option<DofOptions>,
}

/// Structural depth-of-field options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DofOptions {
    pub near_blur: bool,
    pub high_quality: bool,
}

/// Per-frame fog values pushed onto scene state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogParams {
    pub kind: FogKind,
    pub color: Color,
    pub start: f32,
    pub end: f32,
    pub density: f32,
}

/// Per-frame SSAO tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SsaoParams {
    pub intensity: f32,
    pub power: f32,
    pub radius: f32,
    pub sample_count: u32,
    pub min_angle: f32,
    pub scale: f32,
    pub randomize: bool,
}

/// Per-frame bloom tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BloomParams {
    pub intensity: f32,
    pub blur_level: u32,
}

/// Per-frame color grading tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradingParams {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub tint: Color,
}

/// Per-frame color LUT input; present only while a texture is assigned
#[derive(Debug, Clone)]
pub struct LutParams {
    pub texture: Arc<dyn LutTexture>,
    pub intensity: f32,
}

/// Per-frame vignette tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VignetteParams {
    pub intensity: f32,
    pub inner: f32,
    pub outer: f32,
    pub curvature: f32,
}

/// Per-frame depth-of-field tunables
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DofParams {
    pub focus_distance: f32,
    pub focus_range: f32,
    pub blur_radius: f32,
    pub blur_rings: u32,
    pub blur_ring_points: u32,
}

/// Parametric frame values: live pass parameters that never trigger a
/// rebuild. Each optional bundle is populated only while its effect is
/// enabled.
#[derive(Debug, Clone)]
pub struct FrameParams {
    /// Clamped to the 0.1-1 range
    pub render_target_scale: f32,
    pub tone_mapping: TonemapKind,
    pub sharpness: f32,
    /// Camera jitter amplitude; forced to zero while TAA is disabled
    pub jitter: f32,
    pub fog: Option<FogParams>,
    pub ssao: Option<SsaoParams>,
    pub bloom: Option<BloomParams>,
    pub grading: Option<GradingParams>,
    pub color_lut: Option<LutParams>,
    pub vignette: Option<VignetteParams>,
    pub fringing_intensity: Option<f32>,
    pub dof: Option<DofParams>,
}

/// The complete derived record for one frame: a pure function of the
/// configuration blocks.
#[derive(Debug, Clone)]
pub struct FrameSpec {
    pub options: FrameOptions,
    pub params: FrameParams,
}

impl FrameSpec {
    /// Derive the frame record from the current configuration values.
    /// Total over all inputs; never fails and performs no GPU work.
    pub fn derive(config: &CameraFrameConfig) -> Self {
        let rendering = &config.rendering;
        let ssao = &config.ssao;
        let bloom = &config.bloom;
        let dof = &config.dof;

        let bloom_enabled = bloom.intensity > 0.0;

        let mut formats = rendering.render_formats.clone();
        formats.truncate(MAX_RENDER_FORMATS);

        let options = FrameOptions {
            formats,
            stencil: rendering.stencil,
            samples: rendering.samples.clamp(1, 4),
            scene_color_map: rendering.scene_color_map,
            prepass_enabled: rendering.scene_depth_map,
            bloom_enabled,
            taa_enabled: config.taa.enabled,
            ssao: ssao.kind,
            ssao_blur_enabled: ssao.blur_enabled,
            dof: dof.enabled.then_some(DofOptions {
                near_blur: dof.near_blur,
                high_quality: dof.high_quality,
            }),
        };

        let params = FrameParams {
            render_target_scale: rendering.render_target_scale.clamp(0.1, 1.0),
            tone_mapping: rendering.tone_mapping,
            sharpness: rendering.sharpness.clamp(0.0, 1.0),
            jitter: if config.taa.enabled {
                config.taa.jitter.clamp(0.0, 1.0)
            } else {
                0.0
            },
            fog: (rendering.fog != FogKind::None).then_some(FogParams {
                kind: rendering.fog,
                color: rendering.fog_color,
                start: rendering.fog_start,
                end: rendering.fog_end,
                density: rendering.fog_density,
            }),
            ssao: (ssao.kind != SsaoKind::None).then_some(SsaoParams {
                intensity: ssao.intensity,
                power: ssao.power,
                radius: ssao.radius,
                sample_count: ssao.samples.clamp(1, 64),
                min_angle: ssao.min_angle,
                scale: ssao.scale,
                randomize: ssao.randomize,
            }),
            bloom: bloom_enabled.then_some(BloomParams {
                intensity: bloom.intensity,
                blur_level: bloom.blur_level,
            }),
            grading: config.grading.enabled.then_some(GradingParams {
                brightness: config.grading.brightness,
                contrast: config.grading.contrast,
                saturation: config.grading.saturation,
                tint: config.grading.tint,
            }),
            color_lut: config.color_lut.texture.as_ref().map(|texture| LutParams {
                texture: Arc::clone(texture),
                intensity: config.color_lut.intensity,
            }),
            vignette: (config.vignette.intensity > 0.0).then_some(VignetteParams {
                intensity: config.vignette.intensity,
                inner: config.vignette.inner,
                outer: config.vignette.outer,
                curvature: config.vignette.curvature,
            }),
            fringing_intensity: (config.fringing.intensity > 0.0)
                .then_some(config.fringing.intensity),
            dof: dof.enabled.then_some(DofParams {
                focus_distance: dof.focus_distance,
                focus_range: dof.focus_range,
                blur_radius: dof.blur_radius,
                blur_rings: dof.blur_rings,
                blur_ring_points: dof.blur_ring_points,
            }),
        };

        Self { options, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SsaoKind;

    #[test]
    fn test_translation_is_idempotent() {
        let mut config = CameraFrameConfig::default();
        config.ssao.kind = SsaoKind::Lighting;
        config.bloom.intensity = 0.03;
        config.taa.enabled = true;
        config.rendering.fog = FogKind::Exp2;

        let a = FrameSpec::derive(&config);
        let b = FrameSpec::derive(&config);
        assert_eq!(a.options, b.options);
        assert_eq!(a.params.render_target_scale, b.params.render_target_scale);
        assert_eq!(a.params.ssao, b.params.ssao);
        assert_eq!(a.params.bloom, b.params.bloom);
        assert_eq!(a.params.fog, b.params.fog);
    }

    #[test]
    fn test_render_target_scale_is_clamped() {
        let mut config = CameraFrameConfig::default();

        config.rendering.render_target_scale = -1.0;
        assert_eq!(FrameSpec::derive(&config).params.render_target_scale, 0.1);

        config.rendering.render_target_scale = 5.0;
        assert_eq!(FrameSpec::derive(&config).params.render_target_scale, 1.0);

        config.rendering.render_target_scale = 0.5;
        assert_eq!(FrameSpec::derive(&config).params.render_target_scale, 0.5);
    }

    #[test]
    fn test_samples_clamped_to_valid_range() {
        let mut config = CameraFrameConfig::default();
        config.rendering.samples = 0;
        assert_eq!(FrameSpec::derive(&config).options.samples, 1);
        config.rendering.samples = 16;
        assert_eq!(FrameSpec::derive(&config).options.samples, 4);
    }

    #[test]
    fn test_zero_bloom_intensity_disables_bloom() {
        let mut config = CameraFrameConfig::default();
        config.bloom.intensity = 0.0;
        let spec = FrameSpec::derive(&config);
        assert!(!spec.options.bloom_enabled);
        assert!(spec.params.bloom.is_none());

        config.bloom.intensity = 0.01;
        let spec = FrameSpec::derive(&config);
        assert!(spec.options.bloom_enabled);
        assert_eq!(spec.params.bloom.unwrap().intensity, 0.01);
    }

    #[test]
    fn test_disabled_effects_produce_no_bundles() {
        let config = CameraFrameConfig::default();
        let spec = FrameSpec::derive(&config);
        assert!(spec.params.ssao.is_none());
        assert!(spec.params.grading.is_none());
        assert!(spec.params.color_lut.is_none());
        assert!(spec.params.vignette.is_none());
        assert!(spec.params.fringing_intensity.is_none());
        assert!(spec.params.dof.is_none());
        assert!(spec.params.fog.is_none());
    }

    #[test]
    fn test_jitter_zero_while_taa_disabled() {
        let mut config = CameraFrameConfig::default();
        config.taa.enabled = false;
        config.taa.jitter = 0.8;
        assert_eq!(FrameSpec::derive(&config).params.jitter, 0.0);

        config.taa.enabled = true;
        assert_eq!(FrameSpec::derive(&config).params.jitter, 0.8);
    }

    #[test]
    fn test_format_list_is_limited() {
        let mut config = CameraFrameConfig::default();
        config.rendering.render_formats = vec![
            PixelFormat::Rgba16Float,
            PixelFormat::Rgba32Float,
            PixelFormat::R11g11b10Float,
            PixelFormat::Rgba8,
        ];
        let spec = FrameSpec::derive(&config);
        assert_eq!(spec.options.formats.len(), MAX_RENDER_FORMATS);
        assert_eq!(spec.options.formats[0], PixelFormat::Rgba16Float);
    }

    #[test]
    fn test_parametric_change_keeps_options_equal() {
        let mut config = CameraFrameConfig::default();
        config.ssao.kind = SsaoKind::Lighting;
        let before = FrameSpec::derive(&config).options;

        config.ssao.intensity = 0.9;
        config.rendering.sharpness = 0.5;
        config.vignette.intensity = 0.4;
        let after = FrameSpec::derive(&config).options;
        assert_eq!(before, after);
    }

    #[test]
    fn test_structural_change_alters_options() {
        let mut config = CameraFrameConfig::default();
        let before = FrameSpec::derive(&config).options;

        config.ssao.kind = SsaoKind::Lighting;
        assert_ne!(before, FrameSpec::derive(&config).options);

        config.ssao.kind = SsaoKind::None;
        config.rendering.samples = 4;
        assert_ne!(before, FrameSpec::derive(&config).options);
    }
}
