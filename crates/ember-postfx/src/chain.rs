//! Render pass chain boundary
//!
//! The composer treats render passes as opaque units behind these traits:
//! a [`PassFactory`] builds a [`FrameChain`] from structural frame
//! options, and the chain exposes settable parameter surfaces for the
//! passes it was built with. The wgpu implementation lives in
//! `ember-render`; tests use lightweight mocks.

use std::fmt;
use std::sync::Arc;

use ember_core::{Color, Result};

use crate::config::{FogKind, TonemapKind};
use crate::options::FrameOptions;

/// Identity of a pass within the chain, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Depth/normal prepass, present when SSAO or a scene depth map is needed
    Prepass,
    Ssao,
    /// The forward scene render; always present, rendered externally
    Scene,
    Taa,
    Bloom,
    Dof,
    /// Final compose to the output target; always present
    Compose,
}

/// Debug visualization selector forwarded to the compose pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugView {
    Scene,
    Ssao,
    Bloom,
    Vignette,
    DofCoc,
    DofBlur,
}

/// A texture usable as a color grading lookup table. Resolved from the
/// asset system and consumed read-only.
pub trait LutTexture: fmt::Debug + Send + Sync {
    fn dimensions(&self) -> (u32, u32);

    /// Backend downcast hook, used by chain implementations to recover
    /// their concrete texture type.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Settable parameters of the compose pass
#[derive(Debug, Clone, Default)]
pub struct ComposeSurface {
    pub tone_mapping: TonemapKind,
    pub sharpness: f32,
    /// Bloom contribution mixed in by the compose stage; zero when bloom
    /// is disabled
    pub bloom_intensity: f32,
    pub grading_enabled: bool,
    pub grading_brightness: f32,
    pub grading_contrast: f32,
    pub grading_saturation: f32,
    pub grading_tint: Color,
    pub color_lut: Option<Arc<dyn LutTexture>>,
    pub color_lut_intensity: f32,
    pub vignette_enabled: bool,
    pub vignette_intensity: f32,
    pub vignette_inner: f32,
    pub vignette_outer: f32,
    pub vignette_curvature: f32,
    pub fringing_enabled: bool,
    pub fringing_intensity: f32,
    pub debug: Option<DebugView>,
}

/// Settable parameters of the SSAO pass
#[derive(Debug, Clone, Default)]
pub struct SsaoSurface {
    pub intensity: f32,
    pub power: f32,
    pub radius: f32,
    pub sample_count: u32,
    pub min_angle: f32,
    pub scale: f32,
    pub randomize: bool,
}

/// Settable parameters of the bloom pass. Bloom intensity is applied at
/// the compose stage, not here.
#[derive(Debug, Clone, Default)]
pub struct BloomSurface {
    pub blur_level: u32,
}

/// Settable parameters of the depth-of-field pass
#[derive(Debug, Clone, Default)]
pub struct DofSurface {
    pub focus_distance: f32,
    pub focus_range: f32,
    pub blur_radius: f32,
    pub blur_rings: u32,
    pub blur_ring_points: u32,
}

/// An ordered chain of render passes built for one set of frame options.
///
/// Accessors for optional passes return `None` when the chain was built
/// without that pass; the composer never writes parameters for disabled
/// effects.
pub trait FrameChain {
    /// The passes this chain consists of, in execution order
    fn pass_kinds(&self) -> &[PassKind];

    /// Scale applied to the scene render target, already clamped by the
    /// option translator
    fn set_render_target_scale(&mut self, scale: f32);

    fn compose_mut(&mut self) -> &mut ComposeSurface;
    fn ssao_mut(&mut self) -> Option<&mut SsaoSurface>;
    fn bloom_mut(&mut self) -> Option<&mut BloomSurface>;
    fn dof_mut(&mut self) -> Option<&mut DofSurface>;

    /// Release all GPU resources owned by the chain. Idempotent.
    fn destroy(&mut self);
}

/// Builds pass chains from structural frame options.
///
/// Construction failure indicates a non-recoverable device or shader
/// problem and propagates to the caller; there is no retry.
pub trait PassFactory {
    fn create_chain(&mut self, options: &FrameOptions) -> Result<Box<dyn FrameChain>>;
}

/// The owning camera, as seen by the composer: a pass list attachment
/// point and a per-frame jitter amplitude hook.
pub trait CameraTarget {
    fn set_render_passes(&mut self, passes: &[PassKind]);
    fn clear_render_passes(&mut self);
    fn set_jitter(&mut self, amount: f32);
}

/// Scene-level fog state, written directly by the composer every frame
/// while fog is enabled. Fog is scene state, not a post-process pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FogState {
    pub kind: FogKind,
    pub color: Color,
    pub start: f32,
    pub end: f32,
    pub density: f32,
}

impl Default for FogState {
    fn default() -> Self {
        Self {
            kind: FogKind::None,
            color: Color::BLACK,
            start: 1.0,
            end: 1000.0,
            density: 0.0,
        }
    }
}
