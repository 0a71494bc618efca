//! Scene render target allocation
//!
//! Picks the scene color format from the preference list against device
//! capabilities and owns the color/resolve/depth textures the external
//! scene renderer draws into. Targets are recreated when the render
//! target scale changes the effective size.

use ember_postfx::PixelFormat;

/// Depth format used without a stencil buffer
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Depth format used when a stencil buffer is requested
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

/// Select the scene color format: the first preferred format the device
/// supports, falling back to RGBA8 when none is usable. The RGBA8
/// fallback loses the HDR range bloom relies on.
pub fn select_scene_format(
    features: wgpu::Features,
    preferences: &[PixelFormat],
) -> wgpu::TextureFormat {
    for preference in preferences {
        match preference {
            PixelFormat::R11g11b10Float => {
                if features.contains(wgpu::Features::RG11B10UFLOAT_RENDERABLE) {
                    return wgpu::TextureFormat::Rg11b10Ufloat;
                }
            }
            // 16-bit float targets are renderable and filterable everywhere
            PixelFormat::Rgba16Float => return wgpu::TextureFormat::Rgba16Float,
            PixelFormat::Rgba32Float => {
                if features.contains(wgpu::Features::FLOAT32_FILTERABLE) {
                    return wgpu::TextureFormat::Rgba32Float;
                }
            }
            PixelFormat::Rgba8 => return wgpu::TextureFormat::Rgba8Unorm,
        }
    }
    eprintln!("No preferred scene format supported, falling back to RGBA8");
    wgpu::TextureFormat::Rgba8Unorm
}

/// Color, resolve and depth textures for the scene pass
pub struct FrameTargets {
    pub color_texture: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    /// Single-sampled resolve target, present when MSAA is on
    pub resolve_texture: Option<wgpu::Texture>,
    pub resolve_view: Option<wgpu::TextureView>,
    pub depth_texture: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    pub format: wgpu::TextureFormat,
    pub samples: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameTargets {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        samples: u32,
        stencil: bool,
        scene_color_map: bool,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let mut color_usage =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        if scene_color_map {
            color_usage |= wgpu::TextureUsages::COPY_SRC;
        }

        let color_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Color"),
            size,
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: color_usage,
            view_formats: &[],
        });
        let color_view = color_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let (resolve_texture, resolve_view) = if samples > 1 {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Scene Resolve"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: color_usage,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            (Some(texture), Some(view))
        } else {
            (None, None)
        };

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth"),
            size,
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format: if stencil {
                DEPTH_STENCIL_FORMAT
            } else {
                DEPTH_FORMAT
            },
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor {
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        });

        Self {
            color_texture,
            color_view,
            resolve_texture,
            resolve_view,
            depth_texture,
            depth_view,
            format,
            samples,
            width,
            height,
        }
    }

    /// The single-sampled view post passes read the scene from
    pub fn resolved_view(&self) -> &wgpu::TextureView {
        self.resolve_view.as_ref().unwrap_or(&self.color_view)
    }

    /// Release the GPU textures
    pub fn destroy(&self) {
        self.color_texture.destroy();
        if let Some(texture) = &self.resolve_texture {
            texture.destroy();
        }
        self.depth_texture.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_selection_prefers_first_supported() {
        let prefs = [
            PixelFormat::R11g11b10Float,
            PixelFormat::Rgba16Float,
            PixelFormat::Rgba32Float,
        ];

        let all = wgpu::Features::all();
        assert_eq!(
            select_scene_format(all, &prefs),
            wgpu::TextureFormat::Rg11b10Ufloat
        );

        // without the packed-float feature the next preference wins
        let none = wgpu::Features::empty();
        assert_eq!(
            select_scene_format(none, &prefs),
            wgpu::TextureFormat::Rgba16Float
        );
    }

    #[test]
    fn test_format_selection_falls_back_to_rgba8() {
        let prefs = [PixelFormat::R11g11b10Float, PixelFormat::Rgba32Float];
        assert_eq!(
            select_scene_format(wgpu::Features::empty(), &prefs),
            wgpu::TextureFormat::Rgba8Unorm
        );

        assert_eq!(
            select_scene_format(wgpu::Features::empty(), &[]),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    #[test]
    fn test_rgba32f_requires_filterable_feature() {
        let prefs = [PixelFormat::Rgba32Float, PixelFormat::Rgba8];
        assert_eq!(
            select_scene_format(wgpu::Features::FLOAT32_FILTERABLE, &prefs),
            wgpu::TextureFormat::Rgba32Float
        );
        assert_eq!(
            select_scene_format(wgpu::Features::empty(), &prefs),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }
}
