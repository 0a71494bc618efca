//! Final frame composition
//!
//! Single fullscreen pass over the post-chain scene color: ambient
//! occlusion multiply, bloom mix, color grading, LUT, tone mapping,
//! sharpening, vignette, chromatic fringing, and the debug views.

use bytemuck::{Pod, Zeroable};

use ember_postfx::{ComposeSurface, DebugView};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct ComposeUniforms {
    grading_tint: [f32; 4],
    tone_mapping: u32,
    grading_enabled: u32,
    vignette_enabled: u32,
    fringing_enabled: u32,
    lut_enabled: u32,
    ssao_enabled: u32,
    debug_mode: u32,
    _pad0: u32,
    sharpness: f32,
    bloom_intensity: f32,
    grading_brightness: f32,
    grading_contrast: f32,
    grading_saturation: f32,
    lut_intensity: f32,
    vignette_intensity: f32,
    vignette_inner: f32,
    vignette_outer: f32,
    vignette_curvature: f32,
    fringing_intensity: f32,
    _pad1: f32,
    texel_size: [f32; 2],
    _pad2: [f32; 2],
}

/// Input views for one compose invocation. Optional inputs fall back to
/// neutral 1x1 textures; the matching uniform flag keeps them unused.
pub struct ComposeInputs<'a> {
    pub scene_view: &'a wgpu::TextureView,
    pub scene_size: (u32, u32),
    pub bloom_view: Option<&'a wgpu::TextureView>,
    pub ssao_view: Option<&'a wgpu::TextureView>,
    /// Multiply the occlusion texture into the scene color. False when
    /// occlusion is consumed by the lighting stage instead; the texture
    /// stays bound for the debug view.
    pub ssao_apply: bool,
    pub coc_view: Option<&'a wgpu::TextureView>,
    pub dof_view: Option<&'a wgpu::TextureView>,
    pub lut_view: Option<&'a wgpu::TextureView>,
}

pub struct ComposePass {
    pipeline: wgpu::RenderPipeline,
    uniform_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    black_texture: wgpu::Texture,
    black_view: wgpu::TextureView,
    white_texture: wgpu::Texture,
    white_view: wgpu::TextureView,
}

impl ComposePass {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, output_format: wgpu::TextureFormat) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Compose Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("compose_shader.wgsl").into()),
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Compose Uniform BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Compose Texture BGL"),
            entries: &[
                texture_entry(0), // scene
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(2), // bloom
                texture_entry(3), // ssao
                texture_entry(4), // color lut
                texture_entry(5), // dof coc, debug only
                texture_entry(6), // dof blur, debug only
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Compose Pipeline Layout"),
            bind_group_layouts: &[&uniform_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Compose Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_compose"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Compose Uniforms"),
            size: std::mem::size_of::<ComposeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (black_texture, black_view) = solid_texture(device, queue, [0, 0, 0, 255], "Compose Black");
        let (white_texture, white_view) =
            solid_texture(device, queue, [255, 255, 255, 255], "Compose White");

        Self {
            pipeline,
            uniform_bgl,
            texture_bgl,
            uniform_buffer,
            black_texture,
            black_view,
            white_texture,
            white_view,
        }
    }

    pub fn run(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        inputs: &ComposeInputs<'_>,
        surface: &ComposeSurface,
        sampler: &wgpu::Sampler,
        output_view: &wgpu::TextureView,
    ) {
        let lut_enabled = surface.color_lut.is_some() && inputs.lut_view.is_some();
        let uniforms = ComposeUniforms {
            grading_tint: surface.grading_tint.to_array(),
            tone_mapping: surface.tone_mapping.id(),
            grading_enabled: surface.grading_enabled as u32,
            vignette_enabled: surface.vignette_enabled as u32,
            fringing_enabled: surface.fringing_enabled as u32,
            lut_enabled: lut_enabled as u32,
            ssao_enabled: (inputs.ssao_apply && inputs.ssao_view.is_some()) as u32,
            debug_mode: debug_mode(surface.debug),
            _pad0: 0,
            sharpness: surface.sharpness,
            bloom_intensity: surface.bloom_intensity,
            grading_brightness: surface.grading_brightness,
            grading_contrast: surface.grading_contrast,
            grading_saturation: surface.grading_saturation,
            lut_intensity: surface.color_lut_intensity,
            vignette_intensity: surface.vignette_intensity,
            vignette_inner: surface.vignette_inner,
            vignette_outer: surface.vignette_outer,
            vignette_curvature: surface.vignette_curvature,
            fringing_intensity: surface.fringing_intensity,
            _pad1: 0.0,
            texel_size: [
                1.0 / inputs.scene_size.0 as f32,
                1.0 / inputs.scene_size.1 as f32,
            ],
            _pad2: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Compose Uniform BG"),
            layout: &self.uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            }],
        });
        let texture_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Compose Texture BG"),
            layout: &self.texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(inputs.scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.bloom_view.unwrap_or(&self.black_view),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.ssao_view.unwrap_or(&self.white_view),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.lut_view.unwrap_or(&self.black_view),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.coc_view.unwrap_or(&self.black_view),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.dof_view.unwrap_or(&self.black_view),
                    ),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Compose Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &uniform_bg, &[]);
        pass.set_bind_group(1, &texture_bg, &[]);
        pass.draw(0..3, 0..1);
    }

    pub fn destroy(&mut self) {
        self.black_texture.destroy();
        self.white_texture.destroy();
    }
}

fn debug_mode(debug: Option<DebugView>) -> u32 {
    match debug {
        None => 0,
        Some(DebugView::Scene) => 1,
        Some(DebugView::Ssao) => 2,
        Some(DebugView::Bloom) => 3,
        Some(DebugView::Vignette) => 4,
        Some(DebugView::DofCoc) => 5,
        Some(DebugView::DofBlur) => 6,
    }
}

fn solid_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    rgba: [u8; 4],
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        texture.as_image_copy(),
        &rgba,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_views_map_to_distinct_modes() {
        let views = [
            DebugView::Scene,
            DebugView::Ssao,
            DebugView::Bloom,
            DebugView::Vignette,
            DebugView::DofCoc,
            DebugView::DofBlur,
        ];
        let mut modes: Vec<u32> = views.iter().map(|view| debug_mode(Some(*view))).collect();
        modes.sort_unstable();
        modes.dedup();
        assert_eq!(modes.len(), views.len());
        assert!(!modes.contains(&0), "0 means debug off");
        assert_eq!(debug_mode(None), 0);
    }
}
