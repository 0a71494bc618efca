//! Frame composer
//!
//! [`CameraFrame`] owns the configuration blocks and at most one render
//! pass chain for a camera. Every frame it derives a fresh [`FrameSpec`]
//! from the configuration; when the structural options differ from the
//! snapshot that built the current chain, the chain is destroyed and
//! rebuilt, otherwise the live passes receive updated parameters. Camera
//! jitter and scene fog are driven every frame independently of the
//! rebuild decision.

use std::sync::Arc;

use ember_core::Result;

use crate::chain::{CameraTarget, DebugView, FogState, FrameChain, PassFactory};
use crate::config::{CameraFrameConfig, SsaoKind};
use crate::options::{FrameOptions, FrameSpec};

/// External collaborators the composer acts on during one call. All
/// work is synchronous; the host render loop drives the per-frame tick.
pub struct FrameContext<'a> {
    pub factory: &'a mut dyn PassFactory,
    pub camera: &'a mut dyn CameraTarget,
    pub fog: &'a mut FogState,
}

/// The chain currently attached to the camera, together with the
/// structural options that produced it.
struct ActiveChain {
    chain: Box<dyn FrameChain>,
    built_with: FrameOptions,
}

/// Per-camera post-processing composer.
///
/// Holds the effect configuration and keeps the render pass chain
/// consistent with it. Exactly one chain is attached while enabled; none
/// while disabled.
pub struct CameraFrame {
    pub config: CameraFrameConfig,
    /// Debug visualization, forwarded to the compose pass. Coerced to
    /// `None` when it names a disabled effect.
    pub debug: Option<DebugView>,
    enabled: bool,
    chain: Option<ActiveChain>,
}

impl CameraFrame {
    /// Create a composer with default configuration and build its first
    /// chain.
    pub fn new(ctx: &mut FrameContext) -> Result<Self> {
        Self::with_config(CameraFrameConfig::default(), ctx)
    }

    /// Create a composer from an existing configuration and build its
    /// first chain.
    pub fn with_config(config: CameraFrameConfig, ctx: &mut FrameContext) -> Result<Self> {
        let mut frame = Self {
            config,
            debug: None,
            enabled: true,
            chain: None,
        };
        frame.attach(ctx)?;
        Ok(frame)
    }

    /// Whether a chain is currently attached to the camera
    pub fn is_attached(&self) -> bool {
        self.chain.is_some()
    }

    /// The live chain, if attached. Exposes only the settable parameter
    /// surface of each pass.
    pub fn chain_mut(&mut self) -> Option<&mut (dyn FrameChain + '_)> {
        match self.chain.as_mut() {
            Some(active) => Some(&mut *active.chain),
            None => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable the frame. Disabling releases the chain and its
    /// GPU resources; the composer and configuration persist.
    pub fn set_enabled(&mut self, value: bool, ctx: &mut FrameContext) -> Result<()> {
        if self.enabled != value {
            if value {
                self.enable(ctx)?;
            } else {
                self.disable(ctx);
            }
        }
        Ok(())
    }

    /// Build a chain from the current configuration and attach it.
    /// No-op while already attached.
    pub fn enable(&mut self, ctx: &mut FrameContext) -> Result<()> {
        self.enabled = true;
        self.attach(ctx)
    }

    /// Detach the chain from the camera and release its resources.
    /// Idempotent.
    pub fn disable(&mut self, ctx: &mut FrameContext) {
        self.enabled = false;
        self.detach(ctx);
    }

    /// Release everything. Destroying an already-detached composer is a
    /// no-op.
    pub fn destroy(&mut self, ctx: &mut FrameContext) {
        self.disable(ctx);
    }

    /// Per-frame tick: recompute options, rebuild or re-parameterize the
    /// chain, and drive the camera jitter and scene fog couplings.
    ///
    /// Chain construction errors propagate; a failed rebuild leaves the
    /// composer detached for this frame.
    pub fn update(&mut self, ctx: &mut FrameContext) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        // options are derived exactly once per frame, before any pass mutation
        let spec = FrameSpec::derive(&self.config);

        let needs_rebuild = match &self.chain {
            Some(active) => active.built_with != spec.options,
            None => true,
        };

        if needs_rebuild {
            // old resources are released before the new chain is created,
            // so two chains are never alive at once
            self.detach(ctx);
            let chain = ctx.factory.create_chain(&spec.options)?;
            ctx.camera.set_render_passes(chain.pass_kinds());
            self.chain = Some(ActiveChain {
                built_with: spec.options.clone(),
                chain,
            });
        }

        if let Some(active) = self.chain.as_mut() {
            push_params(active.chain.as_mut(), &spec, self.debug);
        }

        // couplings below run every frame regardless of the rebuild decision
        ctx.camera.set_jitter(spec.params.jitter);

        if let Some(fog) = &spec.params.fog {
            ctx.fog.kind = fog.kind;
            ctx.fog.color = fog.color;
            ctx.fog.start = fog.start;
            ctx.fog.end = fog.end;
            ctx.fog.density = fog.density;
        }

        Ok(())
    }

    fn attach(&mut self, ctx: &mut FrameContext) -> Result<()> {
        if self.chain.is_some() {
            return Ok(());
        }
        let spec = FrameSpec::derive(&self.config);
        let chain = ctx.factory.create_chain(&spec.options)?;
        ctx.camera.set_render_passes(chain.pass_kinds());
        self.chain = Some(ActiveChain {
            built_with: spec.options,
            chain,
        });
        Ok(())
    }

    fn detach(&mut self, ctx: &mut FrameContext) {
        if let Some(mut active) = self.chain.take() {
            active.chain.destroy();
            ctx.camera.clear_render_passes();
            ctx.camera.set_jitter(0.0);
        }
    }
}

/// Push parametric values into the live chain. Parameters of disabled
/// effects are never written; their passes may legitimately be absent.
fn push_params(chain: &mut dyn FrameChain, spec: &FrameSpec, debug: Option<DebugView>) {
    let params = &spec.params;

    chain.set_render_target_scale(params.render_target_scale);

    {
        let compose = chain.compose_mut();
        compose.tone_mapping = params.tone_mapping;
        compose.sharpness = params.sharpness;

        // a disabled bloom communicates "no bloom" to the compose stage
        // via zero intensity
        compose.bloom_intensity = params.bloom.map_or(0.0, |b| b.intensity);

        compose.grading_enabled = params.grading.is_some();
        if let Some(grading) = &params.grading {
            compose.grading_brightness = grading.brightness;
            compose.grading_contrast = grading.contrast;
            compose.grading_saturation = grading.saturation;
            compose.grading_tint = grading.tint;
        }

        compose.color_lut = params.color_lut.as_ref().map(|l| Arc::clone(&l.texture));
        compose.color_lut_intensity = params.color_lut.as_ref().map_or(1.0, |l| l.intensity);

        compose.vignette_enabled = params.vignette.is_some();
        if let Some(vignette) = &params.vignette {
            compose.vignette_intensity = vignette.intensity;
            compose.vignette_inner = vignette.inner;
            compose.vignette_outer = vignette.outer;
            compose.vignette_curvature = vignette.curvature;
        }

        compose.fringing_enabled = params.fringing_intensity.is_some();
        if let Some(intensity) = params.fringing_intensity {
            compose.fringing_intensity = intensity;
        }

        compose.debug = debug;
        if compose.debug == Some(DebugView::Ssao) && spec.options.ssao == SsaoKind::None {
            compose.debug = None;
        }
        if compose.debug == Some(DebugView::Vignette) && !compose.vignette_enabled {
            compose.debug = None;
        }
    }

    if let Some(ssao) = &params.ssao {
        if let Some(surface) = chain.ssao_mut() {
            surface.intensity = ssao.intensity;
            surface.power = ssao.power;
            surface.radius = ssao.radius;
            surface.sample_count = ssao.sample_count;
            surface.min_angle = ssao.min_angle;
            surface.scale = ssao.scale;
            surface.randomize = ssao.randomize;
        }
    }

    if let Some(bloom) = &params.bloom {
        if let Some(surface) = chain.bloom_mut() {
            surface.blur_level = bloom.blur_level;
        }
    }

    if let Some(dof) = &params.dof {
        if let Some(surface) = chain.dof_mut() {
            surface.focus_distance = dof.focus_distance;
            surface.focus_range = dof.focus_range;
            surface.blur_radius = dof.blur_radius;
            surface.blur_rings = dof.blur_rings;
            surface.blur_ring_points = dof.blur_ring_points;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{BloomSurface, ComposeSurface, DofSurface, PassKind, SsaoSurface};
    use crate::config::FogKind;
    use ember_core::{Color, EmberError};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Counts of factory/chain activity shared with the test body
    #[derive(Default)]
    struct FactoryStats {
        created: usize,
        destroyed: usize,
        last_scale: f32,
    }

    struct MockChain {
        kinds: Vec<PassKind>,
        stats: Rc<RefCell<FactoryStats>>,
        destroyed: bool,
        compose: ComposeSurface,
        ssao: Option<SsaoSurface>,
        bloom: Option<BloomSurface>,
        dof: Option<DofSurface>,
    }

    impl FrameChain for MockChain {
        fn pass_kinds(&self) -> &[PassKind] {
            &self.kinds
        }

        fn set_render_target_scale(&mut self, scale: f32) {
            self.stats.borrow_mut().last_scale = scale;
        }

        fn compose_mut(&mut self) -> &mut ComposeSurface {
            &mut self.compose
        }

        fn ssao_mut(&mut self) -> Option<&mut SsaoSurface> {
            self.ssao.as_mut()
        }

        fn bloom_mut(&mut self) -> Option<&mut BloomSurface> {
            self.bloom.as_mut()
        }

        fn dof_mut(&mut self) -> Option<&mut DofSurface> {
            self.dof.as_mut()
        }

        fn destroy(&mut self) {
            if !self.destroyed {
                self.destroyed = true;
                self.stats.borrow_mut().destroyed += 1;
            }
        }
    }

    struct MockFactory {
        stats: Rc<RefCell<FactoryStats>>,
        fail_next: bool,
    }

    impl MockFactory {
        fn new() -> (Self, Rc<RefCell<FactoryStats>>) {
            let stats = Rc::new(RefCell::new(FactoryStats::default()));
            (
                Self {
                    stats: Rc::clone(&stats),
                    fail_next: false,
                },
                stats,
            )
        }
    }

    impl PassFactory for MockFactory {
        fn create_chain(&mut self, options: &FrameOptions) -> Result<Box<dyn FrameChain>> {
            if self.fail_next {
                self.fail_next = false;
                return Err(EmberError::RenderError("shader compilation failed".into()));
            }

            let mut kinds = Vec::new();
            if options.prepass_enabled || options.ssao != SsaoKind::None || options.dof.is_some() {
                kinds.push(PassKind::Prepass);
            }
            if options.ssao != SsaoKind::None {
                kinds.push(PassKind::Ssao);
            }
            kinds.push(PassKind::Scene);
            if options.taa_enabled {
                kinds.push(PassKind::Taa);
            }
            if options.bloom_enabled {
                kinds.push(PassKind::Bloom);
            }
            if options.dof.is_some() {
                kinds.push(PassKind::Dof);
            }
            kinds.push(PassKind::Compose);

            self.stats.borrow_mut().created += 1;

            Ok(Box::new(MockChain {
                kinds,
                stats: Rc::clone(&self.stats),
                destroyed: false,
                compose: ComposeSurface::default(),
                ssao: (options.ssao != SsaoKind::None).then(SsaoSurface::default),
                bloom: options.bloom_enabled.then(BloomSurface::default),
                dof: options.dof.map(|_| DofSurface::default()),
            }))
        }
    }

    #[derive(Default)]
    struct MockCamera {
        passes: Option<Vec<PassKind>>,
        jitter: f32,
        jitter_history: Vec<f32>,
    }

    impl CameraTarget for MockCamera {
        fn set_render_passes(&mut self, passes: &[PassKind]) {
            self.passes = Some(passes.to_vec());
        }

        fn clear_render_passes(&mut self) {
            self.passes = None;
        }

        fn set_jitter(&mut self, amount: f32) {
            self.jitter = amount;
            self.jitter_history.push(amount);
        }
    }

    struct Harness {
        factory: MockFactory,
        camera: MockCamera,
        fog: FogState,
        stats: Rc<RefCell<FactoryStats>>,
    }

    impl Harness {
        fn new() -> Self {
            let (factory, stats) = MockFactory::new();
            Self {
                factory,
                camera: MockCamera::default(),
                fog: FogState::default(),
                stats,
            }
        }

        fn ctx(&mut self) -> FrameContext {
            FrameContext {
                factory: &mut self.factory,
                camera: &mut self.camera,
                fog: &mut self.fog,
            }
        }

        fn created(&self) -> usize {
            self.stats.borrow().created
        }

        fn destroyed(&self) -> usize {
            self.stats.borrow().destroyed
        }
    }

    #[test]
    fn test_initialize_builds_one_chain() {
        let mut h = Harness::new();
        let frame = CameraFrame::new(&mut h.ctx()).unwrap();
        assert!(frame.is_attached());
        assert_eq!(h.created(), 1);
        let passes = h.camera.passes.clone().unwrap();
        assert_eq!(passes, vec![PassKind::Scene, PassKind::Compose]);
    }

    #[test]
    fn test_parametric_change_avoids_rebuild() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();
        frame.config.ssao.kind = SsaoKind::Lighting;
        frame.config.ssao.intensity = 0.5;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.created(), 2); // ssao toggle rebuilt once

        let chain = frame.chain_mut().unwrap();
        assert_eq!(chain.ssao_mut().unwrap().intensity, 0.5);

        // only a scalar changes; chain identity must be preserved
        frame.config.ssao.intensity = 0.9;
        frame.update(&mut h.ctx()).unwrap();
        frame.config.rendering.sharpness = 0.3;
        frame.update(&mut h.ctx()).unwrap();

        assert_eq!(h.created(), 2);
        assert_eq!(h.destroyed(), 1);
        let chain = frame.chain_mut().unwrap();
        assert_eq!(chain.ssao_mut().unwrap().intensity, 0.9);
        assert_eq!(chain.compose_mut().sharpness, 0.3);
    }

    #[test]
    fn test_structural_change_rebuilds_exactly_once() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();
        assert_eq!(h.created(), 1);

        frame.config.rendering.samples = 4;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.created(), 2);
        assert_eq!(h.destroyed(), 1);

        // no further change, no further rebuild
        frame.update(&mut h.ctx()).unwrap();
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.created(), 2);
        assert_eq!(h.destroyed(), 1);
    }

    #[test]
    fn test_ssao_toggle_adds_and_removes_pass() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();

        frame.config.ssao.kind = SsaoKind::Lighting;
        frame.update(&mut h.ctx()).unwrap();
        assert!(h.camera.passes.clone().unwrap().contains(&PassKind::Ssao));

        frame.config.ssao.kind = SsaoKind::None;
        frame.update(&mut h.ctx()).unwrap();
        assert!(!h.camera.passes.clone().unwrap().contains(&PassKind::Ssao));
        assert_eq!(h.created(), 3);
    }

    #[test]
    fn test_disabled_bloom_writes_zero_compose_intensity() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();
        frame.update(&mut h.ctx()).unwrap();

        let chain = frame.chain_mut().unwrap();
        assert_eq!(chain.compose_mut().bloom_intensity, 0.0);
        assert!(chain.bloom_mut().is_none());

        frame.config.bloom.intensity = 0.04;
        frame.config.bloom.blur_level = 8;
        frame.update(&mut h.ctx()).unwrap();

        let chain = frame.chain_mut().unwrap();
        assert_eq!(chain.compose_mut().bloom_intensity, 0.04);
        assert_eq!(chain.bloom_mut().unwrap().blur_level, 8);
    }

    #[test]
    fn test_jitter_follows_taa_every_frame() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();

        frame.config.taa.jitter = 0.7;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.camera.jitter, 0.0); // taa disabled

        frame.config.taa.enabled = true;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.camera.jitter, 0.7);

        frame.config.taa.enabled = false;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.camera.jitter, 0.0);
    }

    #[test]
    fn test_fog_pushed_while_enabled_only() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();

        frame.config.rendering.fog = FogKind::Linear;
        frame.config.rendering.fog_start = 10.0;
        frame.config.rendering.fog_end = 200.0;
        frame.config.rendering.fog_color = Color::new(0.5, 0.5, 0.5, 1.0);
        frame.update(&mut h.ctx()).unwrap();

        assert_eq!(h.fog.kind, FogKind::Linear);
        assert_eq!(h.fog.start, 10.0);
        assert_eq!(h.fog.end, 200.0);

        // once fog is off, scene fog state is no longer written at all
        frame.config.rendering.fog = FogKind::None;
        frame.config.rendering.fog_start = 50.0;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.fog.kind, FogKind::Linear);
        assert_eq!(h.fog.start, 10.0);
    }

    #[test]
    fn test_disable_detaches_and_zeroes_jitter() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();
        frame.config.taa.enabled = true;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.camera.jitter, 1.0);

        frame.disable(&mut h.ctx());
        assert!(!frame.is_attached());
        assert!(h.camera.passes.is_none());
        assert_eq!(h.camera.jitter, 0.0);
        assert_eq!(h.destroyed(), 1);

        // updates while disabled do nothing
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.created(), 1);
    }

    #[test]
    fn test_destroy_is_idempotent() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();
        frame.destroy(&mut h.ctx());
        frame.destroy(&mut h.ctx());
        assert_eq!(h.destroyed(), 1);
        assert!(!frame.is_attached());
    }

    #[test]
    fn test_enable_after_disable_builds_fresh_chain() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();
        frame.set_enabled(false, &mut h.ctx()).unwrap();
        assert_eq!(h.created(), 1);

        frame.set_enabled(true, &mut h.ctx()).unwrap();
        assert_eq!(h.created(), 2);
        assert!(frame.is_attached());
        assert!(h.camera.passes.is_some());
    }

    #[test]
    fn test_failed_rebuild_propagates_and_leaves_detached() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();

        frame.config.rendering.samples = 2;
        h.factory.fail_next = true;
        assert!(frame.update(&mut h.ctx()).is_err());
        assert!(!frame.is_attached());
        assert_eq!(h.destroyed(), 1);

        // next frame recovers by building a fresh chain
        frame.update(&mut h.ctx()).unwrap();
        assert!(frame.is_attached());
        assert_eq!(h.created(), 2);
    }

    #[test]
    fn test_debug_view_coerced_for_disabled_effects() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();

        frame.debug = Some(DebugView::Ssao);
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(frame.chain_mut().unwrap().compose_mut().debug, None);

        frame.config.ssao.kind = SsaoKind::Lighting;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(
            frame.chain_mut().unwrap().compose_mut().debug,
            Some(DebugView::Ssao)
        );

        frame.debug = Some(DebugView::Vignette);
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(frame.chain_mut().unwrap().compose_mut().debug, None);

        frame.config.vignette.intensity = 0.3;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(
            frame.chain_mut().unwrap().compose_mut().debug,
            Some(DebugView::Vignette)
        );
    }

    #[derive(Debug)]
    struct MockLut;

    impl crate::chain::LutTexture for MockLut {
        fn dimensions(&self) -> (u32, u32) {
            (1024, 32)
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_missing_lut_texture_disables_lut_input() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();
        frame.config.color_lut.intensity = 0.5;
        frame.update(&mut h.ctx()).unwrap();
        assert!(frame.chain_mut().unwrap().compose_mut().color_lut.is_none());

        frame.config.color_lut.texture = Some(Arc::new(MockLut));
        frame.update(&mut h.ctx()).unwrap();
        let chain = frame.chain_mut().unwrap();
        let compose = chain.compose_mut();
        assert!(compose.color_lut.is_some());
        assert_eq!(compose.color_lut_intensity, 0.5);
        // assigning a texture is parametric, not structural
        assert_eq!(h.created(), 1);
    }

    #[test]
    fn test_render_target_scale_reaches_chain_clamped() {
        let mut h = Harness::new();
        let mut frame = CameraFrame::new(&mut h.ctx()).unwrap();

        frame.config.rendering.render_target_scale = 5.0;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.stats.borrow().last_scale, 1.0);

        frame.config.rendering.render_target_scale = -1.0;
        frame.update(&mut h.ctx()).unwrap();
        assert_eq!(h.stats.borrow().last_scale, 0.1);
    }
}
