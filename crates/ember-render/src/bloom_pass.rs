//! Bloom pass: progressive downsample/upsample mip chain
//!
//! Downsamples the scene color into a half-resolution mip pyramid, then
//! upsamples back with additive blending. The result is mixed into the
//! final image by the compose pass; intensity is not applied here.

use bytemuck::{Pod, Zeroable};

/// Hard cap on the mip pyramid depth; the configured blur level and the
/// target size can only lower it.
pub const MAX_BLOOM_MIPS: u32 = 16;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct BloomUniforms {
    texel_size: [f32; 2],
    _pad: [f32; 2],
}

/// A single level in the bloom mip chain.
struct BloomMip {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

pub struct BloomPass {
    downsample_pipeline: wgpu::RenderPipeline,
    upsample_pipeline: wgpu::RenderPipeline,
    uniform_bgl: wgpu::BindGroupLayout,
    texture_bgl: wgpu::BindGroupLayout,
    // One buffer per chain step; all steps record into one encoder, so a
    // shared buffer would be overwritten before the passes execute.
    uniform_buffers: Vec<wgpu::Buffer>,
    mips: Vec<BloomMip>,
    format: wgpu::TextureFormat,
}

impl BloomPass {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        blur_level: u32,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Bloom Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("bloom_shader.wgsl").into()),
        });

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Uniform BGL"),
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

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Bloom Texture BGL"),
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

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom Pipeline Layout"),
            bind_group_layouts: &[&uniform_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });

        let downsample_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Bloom Downsample Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_downsample"),
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

        // Upsample accumulates into the larger mip: src + dst
        let upsample_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Bloom Upsample Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_upsample"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState {
                        color: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                        alpha: wgpu::BlendComponent {
                            src_factor: wgpu::BlendFactor::One,
                            dst_factor: wgpu::BlendFactor::One,
                            operation: wgpu::BlendOperation::Add,
                        },
                    }),
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

        let mut pass = Self {
            downsample_pipeline,
            upsample_pipeline,
            uniform_bgl,
            texture_bgl,
            uniform_buffers: Vec::new(),
            mips: Vec::new(),
            format,
        };
        pass.resize(device, width, height, blur_level);
        pass
    }

    /// Recreate the mip pyramid for new target dimensions or blur level.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32, blur_level: u32) {
        self.destroy();

        // Smallest mip stays at least 8x8
        let min_dim = width.min(height).max(1);
        let size_limit = (min_dim as f32).log2().floor() as u32;
        let mip_count = blur_level
            .clamp(1, MAX_BLOOM_MIPS)
            .min(size_limit.saturating_sub(3).max(1)) as usize;

        let mut mip_w = (width / 2).max(1);
        let mut mip_h = (height / 2).max(1);
        for i in 0..mip_count {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(&format!("Bloom Mip {}", i)),
                size: wgpu::Extent3d {
                    width: mip_w,
                    height: mip_h,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: self.format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.mips.push(BloomMip {
                texture,
                view,
                width: mip_w,
                height: mip_h,
            });
            mip_w = (mip_w / 2).max(1);
            mip_h = (mip_h / 2).max(1);
        }

        // mip_count downsample steps plus mip_count-1 upsample steps
        let step_count = 2 * mip_count - 1;
        self.uniform_buffers = (0..step_count)
            .map(|i| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("Bloom Uniforms {}", i)),
                    size: std::mem::size_of::<BloomUniforms>() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();
    }

    /// The accumulated bloom result sampled by the compose pass.
    pub fn output_view(&self) -> &wgpu::TextureView {
        &self.mips[0].view
    }

    /// Record the full downsample/upsample chain.
    pub fn run(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        scene_view: &wgpu::TextureView,
        scene_size: (u32, u32),
        sampler: &wgpu::Sampler,
    ) {
        let mut step = 0;

        // Downsample: scene -> mip[0] -> mip[1] -> ...
        for i in 0..self.mips.len() {
            let (src_view, src_w, src_h) = if i == 0 {
                (scene_view, scene_size.0, scene_size.1)
            } else {
                let src = &self.mips[i - 1];
                (&src.view, src.width, src.height)
            };
            self.blit(
                device,
                queue,
                encoder,
                &self.downsample_pipeline,
                step,
                src_view,
                (src_w, src_h),
                &self.mips[i].view,
                sampler,
                wgpu::LoadOp::Clear(wgpu::Color::BLACK),
            );
            step += 1;
        }

        // Upsample: mip[N-1] -> ... -> mip[0], accumulating
        for i in (0..self.mips.len() - 1).rev() {
            let src = &self.mips[i + 1];
            self.blit(
                device,
                queue,
                encoder,
                &self.upsample_pipeline,
                step,
                &src.view,
                (src.width, src.height),
                &self.mips[i].view,
                sampler,
                wgpu::LoadOp::Load,
            );
            step += 1;
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn blit(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        step: usize,
        src_view: &wgpu::TextureView,
        src_size: (u32, u32),
        dst_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        let uniforms = BloomUniforms {
            texel_size: [1.0 / src_size.0 as f32, 1.0 / src_size.1 as f32],
            _pad: [0.0; 2],
        };
        queue.write_buffer(
            &self.uniform_buffers[step],
            0,
            bytemuck::cast_slice(&[uniforms]),
        );

        let uniform_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Uniform BG"),
            layout: &self.uniform_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buffers[step].as_entire_binding(),
            }],
        });
        let texture_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Bloom Texture BG"),
            layout: &self.texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(src_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Bloom Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: dst_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &uniform_bg, &[]);
        pass.set_bind_group(1, &texture_bg, &[]);
        pass.draw(0..3, 0..1);
    }

    pub fn destroy(&mut self) {
        for mip in self.mips.drain(..) {
            mip.texture.destroy();
        }
        self.uniform_buffers.clear();
    }
}
