//! Depth of field
//!
//! Two stages: circle-of-confusion estimation from the depth buffer,
//! then a ring gather blur over the scene color. The blur runs at half
//! resolution unless the chain was built with the high quality option.

use bytemuck::{Pod, Zeroable};

use ember_postfx::DofSurface;

const COC_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct DofUniforms {
    focus_distance: f32,
    focus_range: f32,
    blur_radius: f32,
    near_blur: u32,
    blur_rings: u32,
    blur_ring_points: u32,
    camera_near: f32,
    camera_far: f32,
    texel_size: [f32; 2],
    _pad: [f32; 2],
}

pub struct DofPass {
    coc_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    uniform_bgl: wgpu::BindGroupLayout,
    depth_bgl: wgpu::BindGroupLayout,
    blur_bgl: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    coc_texture: wgpu::Texture,
    coc_view: wgpu::TextureView,
    output_texture: wgpu::Texture,
    output_view: wgpu::TextureView,
    near_blur: bool,
    high_quality: bool,
    width: u32,
    height: u32,
}

impl DofPass {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        near_blur: bool,
        high_quality: bool,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("DoF Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("dof_shader.wgsl").into()),
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("DoF Uniform BGL"),
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
            label: Some("DoF Depth BGL"),
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
            label: Some("DoF Blur BGL"),
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
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let coc_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("DoF CoC Pipeline Layout"),
            bind_group_layouts: &[&uniform_bgl, &depth_bgl],
            push_constant_ranges: &[],
        });
        let coc_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("DoF CoC Pipeline"),
            layout: Some(&coc_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_coc"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: COC_FORMAT,
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

        let blur_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("DoF Blur Pipeline Layout"),
            bind_group_layouts: &[&uniform_bgl, &blur_bgl],
            push_constant_ranges: &[],
        });
        let blur_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("DoF Blur Pipeline"),
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
                    format,
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
            label: Some("DoF Uniforms"),
            size: std::mem::size_of::<DofUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (coc_texture, coc_view, output_texture, output_view) =
            create_textures(device, format, width, height, high_quality);

        Self {
            coc_pipeline,
            blur_pipeline,
            uniform_bgl,
            depth_bgl,
            blur_bgl,
            uniform_buffer,
            coc_texture,
            coc_view,
            output_texture,
            output_view,
            near_blur,
            high_quality,
            width,
            height,
        }
    }

    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) {
        self.coc_texture.destroy();
        self.output_texture.destroy();
        let (coc_texture, coc_view, output_texture, output_view) =
            create_textures(device, format, width, height, self.high_quality);
        self.coc_texture = coc_texture;
        self.coc_view = coc_view;
        self.output_texture = output_texture;
        self.output_view = output_view;
        self.width = width;
        self.height = height;
    }

    pub fn output_view(&self) -> &wgpu::TextureView {
        &self.output_view
    }

    /// Signed circle-of-confusion texture, exposed for the debug view.
    pub fn coc_view(&self) -> &wgpu::TextureView {
        &self.coc_view
    }

    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        params: &DofSurface,
        camera_near: f32,
        camera_far: f32,
    ) {
        let uniforms = DofUniforms {
            focus_distance: params.focus_distance,
            focus_range: params.focus_range,
            blur_radius: params.blur_radius,
            near_blur: self.near_blur as u32,
            blur_rings: params.blur_rings.max(1),
            blur_ring_points: params.blur_ring_points.max(1),
            camera_near,
            camera_far,
            texel_size: [1.0 / self.width as f32, 1.0 / self.height as f32],
            _pad: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("DoF Uniform BG"),
            layout: &self.uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffer.as_entire_binding(),
            }],
        });
        let depth_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("DoF Depth BG"),
            layout: &self.depth_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(depth_view),
            }],
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("DoF CoC Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.coc_view,
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
            pass.set_pipeline(&self.coc_pipeline);
            pass.set_bind_group(0, &uniform_bg, &[]);
            pass.set_bind_group(1, &depth_bg, &[]);
            pass.draw(0..3, 0..1);
        }

        let blur_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("DoF Blur BG"),
            layout: &self.blur_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(scene_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&self.coc_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("DoF Blur Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.output_view,
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
        pass.set_pipeline(&self.blur_pipeline);
        pass.set_bind_group(0, &uniform_bg, &[]);
        pass.set_bind_group(1, &blur_bg, &[]);
        pass.draw(0..3, 0..1);
    }

    pub fn destroy(&mut self) {
        self.coc_texture.destroy();
        self.output_texture.destroy();
    }
}

fn create_textures(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    high_quality: bool,
) -> (wgpu::Texture, wgpu::TextureView, wgpu::Texture, wgpu::TextureView) {
    let coc_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("DoF CoC"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COC_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let coc_view = coc_texture.create_view(&wgpu::TextureViewDescriptor::default());

    let (out_w, out_h) = if high_quality {
        (width, height)
    } else {
        ((width / 2).max(1), (height / 2).max(1))
    };
    let output_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("DoF Output"),
        size: wgpu::Extent3d {
            width: out_w.max(1),
            height: out_h.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let output_view = output_texture.create_view(&wgpu::TextureViewDescriptor::default());

    (coc_texture, coc_view, output_texture, output_view)
}
