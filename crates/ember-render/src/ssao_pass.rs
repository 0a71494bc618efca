//! Screen-space ambient occlusion
//!
//! Spiral-tap AO estimation from the scene depth buffer, written to a
//! single-channel texture, with an optional box blur. The compose pass
//! multiplies the result into the scene color.

use bytemuck::{Pod, Zeroable};

use ember_postfx::SsaoSurface;

const AO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// Depth discontinuity guard applied to each tap.
const DEPTH_BIAS: f32 = 0.001;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct SsaoUniforms {
    texel_size: [f32; 2],
    radius: f32,
    intensity: f32,
    power: f32,
    bias: f32,
    projection_scale: f32,
    min_angle_sin: f32,
    sample_count: u32,
    randomize: u32,
    camera_near: f32,
    camera_far: f32,
}

pub struct SsaoPass {
    ao_pipeline: wgpu::RenderPipeline,
    blur_pipeline: Option<wgpu::RenderPipeline>,
    uniform_bgl: wgpu::BindGroupLayout,
    depth_bgl: wgpu::BindGroupLayout,
    blur_bgl: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    ao_texture: wgpu::Texture,
    ao_view: wgpu::TextureView,
    blur_texture: Option<wgpu::Texture>,
    blur_view: Option<wgpu::TextureView>,
    width: u32,
    height: u32,
    frame_index: u32,
}

impl SsaoPass {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, blur_enabled: bool) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SSAO Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("ssao_shader.wgsl").into()),
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Uniform BGL"),
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

        let depth_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Depth BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let blur_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("SSAO Blur BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let ao_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SSAO Pipeline Layout"),
            bind_group_layouts: &[&uniform_bgl, &depth_bgl],
            push_constant_ranges: &[],
        });

        let ao_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("SSAO Pipeline"),
            layout: Some(&ao_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_ao"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: AO_FORMAT,
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

        let blur_pipeline = blur_enabled.then(|| {
            let blur_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("SSAO Blur Pipeline Layout"),
                bind_group_layouts: &[&uniform_bgl, &blur_bgl],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("SSAO Blur Pipeline"),
                layout: Some(&blur_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_blur"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: AO_FORMAT,
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
            })
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SSAO Uniforms"),
            size: std::mem::size_of::<SsaoUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (ao_texture, ao_view) = create_ao_texture(device, width, height, "SSAO Output");
        let (blur_texture, blur_view) = if blur_enabled {
            let (t, v) = create_ao_texture(device, width, height, "SSAO Blurred");
            (Some(t), Some(v))
        } else {
            (None, None)
        };

        Self {
            ao_pipeline,
            blur_pipeline,
            uniform_bgl,
            depth_bgl,
            blur_bgl,
            uniform_buffer,
            ao_texture,
            ao_view,
            blur_texture,
            blur_view,
            width,
            height,
            frame_index: 0,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.ao_texture.destroy();
        let (texture, view) = create_ao_texture(device, width, height, "SSAO Output");
        self.ao_texture = texture;
        self.ao_view = view;
        if let Some(old) = self.blur_texture.take() {
            old.destroy();
            let (texture, view) = create_ao_texture(device, width, height, "SSAO Blurred");
            self.blur_texture = Some(texture);
            self.blur_view = Some(view);
        }
        self.width = width;
        self.height = height;
    }

    /// The occlusion texture the compose pass multiplies in; blurred when
    /// the blur stage was built.
    pub fn output_view(&self) -> &wgpu::TextureView {
        self.blur_view.as_ref().unwrap_or(&self.ao_view)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        depth_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        params: &SsaoSurface,
        camera_near: f32,
        camera_far: f32,
    ) {
        // Tap pattern rotation advances each frame when randomize is on
        self.frame_index = if params.randomize {
            self.frame_index.wrapping_add(1)
        } else {
            0
        };

        let peak = 0.1 * params.radius;
        let intensity =
            2.0 * (peak * 2.0 * std::f32::consts::PI) * params.intensity
                / params.sample_count.max(1) as f32;
        let uniforms = SsaoUniforms {
            texel_size: [1.0 / self.width as f32, 1.0 / self.height as f32],
            radius: params.radius,
            intensity,
            power: params.power,
            bias: DEPTH_BIAS,
            projection_scale: 0.5 * self.height as f32 * params.scale,
            min_angle_sin: params.min_angle.to_radians().sin(),
            sample_count: params.sample_count.max(1),
            randomize: self.frame_index,
            camera_near,
            camera_far,
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Uniform BG"),
            layout: &self.uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            }],
        });
        let depth_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SSAO Depth BG"),
            layout: &self.depth_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(depth_view),
            }],
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("SSAO Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.ao_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.ao_pipeline);
            pass.set_bind_group(0, &uniform_bg, &[]);
            pass.set_bind_group(1, &depth_bg, &[]);
            pass.draw(0..3, 0..1);
        }

        if let (Some(blur_pipeline), Some(blur_view)) = (&self.blur_pipeline, &self.blur_view) {
            let blur_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("SSAO Blur BG"),
                layout: &self.blur_bgl,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&self.ao_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            });
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("SSAO Blur Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: blur_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::WHITE),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(blur_pipeline);
            pass.set_bind_group(0, &uniform_bg, &[]);
            pass.set_bind_group(1, &blur_bg, &[]);
            pass.draw(0..3, 0..1);
        }
    }

    pub fn destroy(&mut self) {
        self.ao_texture.destroy();
        if let Some(texture) = &self.blur_texture {
            texture.destroy();
        }
    }
}

fn create_ao_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: AO_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
