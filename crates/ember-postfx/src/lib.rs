//! Ember PostFX - camera post-processing frame composition
//!
//! This crate owns the per-camera post-processing pipeline: declarative
//! effect configuration blocks (SSAO, bloom, grading, vignette, fringing,
//! TAA, depth of field, tone mapping, fog), a pure translator that derives
//! structural frame options from them, and a composer that keeps an
//! ordered chain of GPU render passes consistent with the configuration,
//! rebuilding the chain only when structural options change and pushing
//! parameter updates otherwise.
//!
//! Pass construction itself lives behind the [`PassFactory`] trait; a
//! wgpu implementation is provided by the `ember-render` crate.

pub mod chain;
pub mod composer;
pub mod config;
pub mod options;
pub mod schema;
pub mod script;

pub use chain::{
    BloomSurface, CameraTarget, ComposeSurface, DebugView, DofSurface, FogState, FrameChain,
    LutTexture, PassFactory, PassKind, SsaoSurface,
};
pub use composer::{CameraFrame, FrameContext};
pub use config::{
    BloomConfig, CameraFrameConfig, ColorLutConfig, DofConfig, FogKind, FringingConfig,
    GradingConfig, PixelFormat, RenderingConfig, SsaoConfig, SsaoKind, TaaConfig, TonemapKind,
    VignetteConfig,
};
pub use options::{
    BloomParams, DofOptions, DofParams, FogParams, FrameOptions, FrameParams, FrameSpec,
    GradingParams, LutParams, SsaoParams, VignetteParams,
};
pub use schema::{camera_frame_schema, BlockSchema, FieldMeta};
pub use script::CameraFrameScript;
