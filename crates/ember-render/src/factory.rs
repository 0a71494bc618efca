//! wgpu pass chain factory
//!
//! [`WgpuPassFactory`] builds a [`WgpuFrameChain`] for a set of frame
//! options: render targets, the pass objects the options enable, and a
//! shared sampler. The chain records every enabled pass into a single
//! command encoder per frame.

use std::fmt;
use std::sync::Arc;

use ember_core::{EmberError, Result};
use ember_postfx::{
    BloomSurface, ComposeSurface, DofSurface, FrameChain, FrameOptions, LutTexture, PassFactory,
    PassKind, SsaoKind, SsaoSurface,
};

use crate::bloom_pass::BloomPass;
use crate::compose_pass::{ComposeInputs, ComposePass};
use crate::dof_pass::DofPass;
use crate::ssao_pass::SsaoPass;
use crate::taa_pass::TaaPass;
use crate::targets::{select_scene_format, FrameTargets};

/// A color grading LUT backed by a wgpu texture, laid out as a
/// horizontal 2D strip of slices.
pub struct WgpuLutTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for WgpuLutTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuLutTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl LutTexture for WgpuLutTexture {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Builds wgpu frame chains for one output target.
pub struct WgpuPassFactory {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    width: u32,
    height: u32,
    output_format: wgpu::TextureFormat,
}

impl WgpuPassFactory {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        width: u32,
        height: u32,
        output_format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            device,
            queue,
            width,
            height,
            output_format,
        }
    }

    /// Update the output dimensions used for subsequently built chains.
    pub fn set_output_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

impl PassFactory for WgpuPassFactory {
    fn create_chain(&mut self, options: &FrameOptions) -> Result<Box<dyn FrameChain>> {
        if self.width == 0 || self.height == 0 {
            return Err(EmberError::RenderError(
                "cannot build a frame chain for a zero-sized output".to_string(),
            ));
        }
        let chain = WgpuFrameChain::new(
            Arc::clone(&self.device),
            Arc::clone(&self.queue),
            self.width,
            self.height,
            self.output_format,
            options,
        );
        Ok(Box::new(chain))
    }
}

/// One built chain: targets, pass objects and their parameter surfaces.
pub struct WgpuFrameChain {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    kinds: Vec<PassKind>,
    targets: FrameTargets,
    sampler: wgpu::Sampler,
    compose_pass: ComposePass,
    compose: ComposeSurface,
    ssao_pass: Option<SsaoPass>,
    ssao: Option<SsaoSurface>,
    bloom_pass: Option<BloomPass>,
    bloom: Option<BloomSurface>,
    bloom_built_level: u32,
    taa_pass: Option<TaaPass>,
    dof_pass: Option<DofPass>,
    dof: Option<DofSurface>,
    scene_format: wgpu::TextureFormat,
    ssao_kind: SsaoKind,
    samples: u32,
    stencil: bool,
    scene_color_map: bool,
    output_width: u32,
    output_height: u32,
    scale: f32,
    /// Camera clip planes for depth linearization, set by the renderer
    pub camera_near: f32,
    pub camera_far: f32,
    destroyed: bool,
}

impl WgpuFrameChain {
    fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        width: u32,
        height: u32,
        output_format: wgpu::TextureFormat,
        options: &FrameOptions,
    ) -> Self {
        let scene_format = select_scene_format(device.features(), &options.formats);

        let ssao_enabled = options.ssao != SsaoKind::None;
        let depth_read = ssao_enabled || options.dof.is_some();
        // Depth-reading passes need a resolvable depth buffer; MSAA depth
        // cannot be sampled per-pixel, so those chains run single-sampled.
        let samples = if depth_read && options.samples > 1 {
            eprintln!("SSAO/DoF require single-sampled depth, disabling MSAA");
            1
        } else {
            options.samples
        };

        let mut kinds = Vec::new();
        if options.prepass_enabled || ssao_enabled {
            kinds.push(PassKind::Prepass);
        }
        if ssao_enabled {
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

        let targets = FrameTargets::new(
            &device,
            width,
            height,
            scene_format,
            samples,
            options.stencil,
            options.scene_color_map,
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Frame Chain Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            ..Default::default()
        });

        let compose_pass = ComposePass::new(&device, &queue, output_format);

        let ssao_pass = ssao_enabled
            .then(|| SsaoPass::new(&device, width, height, options.ssao_blur_enabled));
        let bloom_surface = BloomSurface::default();
        let bloom_pass = options.bloom_enabled.then(|| {
            BloomPass::new(
                &device,
                scene_format,
                width,
                height,
                bloom_surface.blur_level.max(1),
            )
        });
        let bloom_built_level = bloom_surface.blur_level.max(1);
        let taa_pass = options
            .taa_enabled
            .then(|| TaaPass::new(&device, scene_format, width, height));
        let dof_pass = options.dof.map(|dof| {
            DofPass::new(
                &device,
                scene_format,
                width,
                height,
                dof.near_blur,
                dof.high_quality,
            )
        });

        Self {
            device,
            queue,
            kinds,
            targets,
            sampler,
            compose_pass,
            compose: ComposeSurface::default(),
            ssao_pass,
            ssao: ssao_enabled.then(SsaoSurface::default),
            bloom_pass,
            bloom: options.bloom_enabled.then_some(bloom_surface),
            bloom_built_level,
            taa_pass,
            dof_pass,
            dof: options.dof.map(|_| DofSurface::default()),
            scene_format,
            ssao_kind: options.ssao,
            samples,
            stencil: options.stencil,
            scene_color_map: options.scene_color_map,
            output_width: width,
            output_height: height,
            scale: 1.0,
            camera_near: 0.1,
            camera_far: 1000.0,
            destroyed: false,
        }
    }

    /// Targets the external scene renderer draws into.
    pub fn targets(&self) -> &FrameTargets {
        &self.targets
    }

    fn scaled_size(&self) -> (u32, u32) {
        let w = ((self.output_width as f32 * self.scale) as u32).max(1);
        let h = ((self.output_height as f32 * self.scale) as u32).max(1);
        (w, h)
    }

    fn ensure_targets(&mut self) {
        let (w, h) = self.scaled_size();
        let bloom_level = self
            .bloom
            .as_ref()
            .map(|b| b.blur_level.max(1))
            .unwrap_or(self.bloom_built_level);

        let resized = w != self.targets.width || h != self.targets.height;
        if resized {
            self.targets.destroy();
            self.targets = FrameTargets::new(
                &self.device,
                w,
                h,
                self.scene_format,
                self.samples,
                self.stencil,
                self.scene_color_map,
            );
            if let Some(ssao) = &mut self.ssao_pass {
                ssao.resize(&self.device, w, h);
            }
            if let Some(taa) = &mut self.taa_pass {
                taa.resize(&self.device, self.scene_format, w, h);
            }
            if let Some(dof) = &mut self.dof_pass {
                dof.resize(&self.device, self.scene_format, w, h);
            }
        }

        // Bloom pyramid depth follows the blur level without a rebuild
        if let Some(bloom) = &mut self.bloom_pass {
            if resized || bloom_level != self.bloom_built_level {
                bloom.resize(&self.device, w, h, bloom_level);
                self.bloom_built_level = bloom_level;
            }
        }
    }

    /// Record and submit all post passes, reading the scene targets and
    /// writing the composed frame to `output_view`.
    pub fn execute(&mut self, output_view: &wgpu::TextureView) {
        if self.destroyed {
            return;
        }
        self.ensure_targets();

        let (w, h) = (self.targets.width, self.targets.height);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Chain Encoder"),
            });

        if let (Some(ssao_pass), Some(params)) = (&mut self.ssao_pass, &self.ssao) {
            ssao_pass.run(
                &self.device,
                &self.queue,
                &mut encoder,
                &self.targets.depth_view,
                &self.sampler,
                params,
                self.camera_near,
                self.camera_far,
            );
        }

        let mut scene_view = self.targets.resolved_view();

        if let Some(taa_pass) = &mut self.taa_pass {
            taa_pass.run(&self.device, &self.queue, &mut encoder, scene_view, &self.sampler);
            scene_view = taa_pass.output_view();
        }

        if let (Some(dof_pass), Some(params)) = (&self.dof_pass, &self.dof) {
            dof_pass.run(
                &self.device,
                &self.queue,
                &mut encoder,
                scene_view,
                &self.targets.depth_view,
                &self.sampler,
                params,
                self.camera_near,
                self.camera_far,
            );
            scene_view = dof_pass.output_view();
        }

        if let Some(bloom_pass) = &self.bloom_pass {
            bloom_pass.run(
                &self.device,
                &self.queue,
                &mut encoder,
                scene_view,
                (w, h),
                &self.sampler,
            );
        }

        let lut_view = self.compose.color_lut.as_ref().and_then(|lut| {
            lut.as_any()
                .downcast_ref::<WgpuLutTexture>()
                .map(|lut| &lut.view)
        });
        let inputs = ComposeInputs {
            scene_view,
            scene_size: (w, h),
            bloom_view: self.bloom_pass.as_ref().map(|b| b.output_view()),
            ssao_view: self.ssao_pass.as_ref().map(|s| s.output_view()),
            ssao_apply: self.ssao_kind == SsaoKind::Combine,
            coc_view: self.dof_pass.as_ref().map(|d| d.coc_view()),
            dof_view: self.dof_pass.as_ref().map(|d| d.output_view()),
            lut_view,
        };
        self.compose_pass.run(
            &self.device,
            &self.queue,
            &mut encoder,
            &inputs,
            &self.compose,
            &self.sampler,
            output_view,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl FrameChain for WgpuFrameChain {
    fn pass_kinds(&self) -> &[PassKind] {
        &self.kinds
    }

    fn set_render_target_scale(&mut self, scale: f32) {
        self.scale = scale;
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
        if self.destroyed {
            return;
        }
        self.targets.destroy();
        self.compose_pass.destroy();
        if let Some(ssao) = &mut self.ssao_pass {
            ssao.destroy();
        }
        if let Some(bloom) = &mut self.bloom_pass {
            bloom.destroy();
        }
        if let Some(taa) = &mut self.taa_pass {
            taa.destroy();
        }
        if let Some(dof) = &mut self.dof_pass {
            dof.destroy();
        }
        self.destroyed = true;
    }
}
