//! Ember Render - wgpu render passes for the camera frame chain
//!
//! Implements the pass factory boundary from `ember-postfx` on wgpu:
//! scene render targets, SSAO, TAA, bloom, depth of field, and the
//! final compose pass with tone mapping, grading, vignette and the
//! other screen-space effects.

pub mod bloom_pass;
pub mod compose_pass;
pub mod dof_pass;
mod factory;
pub mod ssao_pass;
pub mod taa_pass;
mod targets;

pub use bloom_pass::{BloomPass, MAX_BLOOM_MIPS};
pub use compose_pass::{ComposeInputs, ComposePass};
pub use dof_pass::DofPass;
pub use factory::{WgpuFrameChain, WgpuLutTexture, WgpuPassFactory};
pub use ssao_pass::SsaoPass;
pub use taa_pass::TaaPass;
pub use targets::{select_scene_format, FrameTargets, DEPTH_FORMAT, DEPTH_STENCIL_FORMAT};

#[cfg(test)]
mod tests {
    #[test]
    fn compose_shader_wgsl_parses() {
        let source = include_str!("compose_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("compose_shader.wgsl failed to parse");
    }

    #[test]
    fn bloom_shader_wgsl_parses() {
        let source = include_str!("bloom_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("bloom_shader.wgsl failed to parse");
    }

    #[test]
    fn ssao_shader_wgsl_parses() {
        let source = include_str!("ssao_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("ssao_shader.wgsl failed to parse");
    }

    #[test]
    fn taa_shader_wgsl_parses() {
        let source = include_str!("taa_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("taa_shader.wgsl failed to parse");
    }

    #[test]
    fn dof_shader_wgsl_parses() {
        let source = include_str!("dof_shader.wgsl");
        naga::front::wgsl::parse_str(source).expect("dof_shader.wgsl failed to parse");
    }
}
