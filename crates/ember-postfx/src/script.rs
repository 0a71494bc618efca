//! Lifecycle glue
//!
//! Adapter between the hosting script/component framework and the
//! composer: the framework wires `initialize`, `post_update` and the
//! enable/disable/destroy events; this shim forwards them to
//! [`CameraFrame`]. The composer and its configuration survive
//! disable/enable cycles; only the chain is released and rebuilt.

use ember_core::Result;

use crate::composer::{CameraFrame, FrameContext};
use crate::config::CameraFrameConfig;

/// Script-component shim owning one composer per camera.
#[derive(Default)]
pub struct CameraFrameScript {
    frame: Option<CameraFrame>,
}

impl CameraFrameScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// `initialize` hook: create the composer and build the first chain.
    pub fn initialize(&mut self, config: CameraFrameConfig, ctx: &mut FrameContext) -> Result<()> {
        self.frame = Some(CameraFrame::with_config(config, ctx)?);
        Ok(())
    }

    /// `postUpdate` hook, called once per frame by the host render loop.
    pub fn post_update(&mut self, _dt: f32, ctx: &mut FrameContext) -> Result<()> {
        match &mut self.frame {
            Some(frame) => frame.update(ctx),
            None => Ok(()),
        }
    }

    /// `enable` event: rebuild the chain from current configuration.
    pub fn on_enable(&mut self, ctx: &mut FrameContext) -> Result<()> {
        match &mut self.frame {
            Some(frame) => frame.enable(ctx),
            None => Ok(()),
        }
    }

    /// `disable` event: detach and release the chain; configuration
    /// persists.
    pub fn on_disable(&mut self, ctx: &mut FrameContext) {
        if let Some(frame) = &mut self.frame {
            frame.disable(ctx);
        }
    }

    /// `destroy` event: release the composer entirely. Safe to call more
    /// than once.
    pub fn on_destroy(&mut self, ctx: &mut FrameContext) {
        if let Some(mut frame) = self.frame.take() {
            frame.destroy(ctx);
        }
    }

    /// Access to the composer for configuration changes from UI or game
    /// code. `None` before `initialize` or after `destroy`.
    pub fn frame_mut(&mut self) -> Option<&mut CameraFrame> {
        self.frame.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{
        CameraTarget, ComposeSurface, FogState, FrameChain, PassFactory, PassKind,
    };
    use crate::options::FrameOptions;

    struct NullChain {
        kinds: Vec<PassKind>,
        compose: ComposeSurface,
    }

    impl FrameChain for NullChain {
        fn pass_kinds(&self) -> &[PassKind] {
            &self.kinds
        }
        fn set_render_target_scale(&mut self, _scale: f32) {}
        fn compose_mut(&mut self) -> &mut ComposeSurface {
            &mut self.compose
        }
        fn ssao_mut(&mut self) -> Option<&mut crate::chain::SsaoSurface> {
            None
        }
        fn bloom_mut(&mut self) -> Option<&mut crate::chain::BloomSurface> {
            None
        }
        fn dof_mut(&mut self) -> Option<&mut crate::chain::DofSurface> {
            None
        }
        fn destroy(&mut self) {}
    }

    struct NullFactory {
        created: usize,
    }

    impl PassFactory for NullFactory {
        fn create_chain(&mut self, _options: &FrameOptions) -> Result<Box<dyn FrameChain>> {
            self.created += 1;
            Ok(Box::new(NullChain {
                kinds: vec![PassKind::Scene, PassKind::Compose],
                compose: ComposeSurface::default(),
            }))
        }
    }

    struct NullCamera {
        attached: bool,
        jitter: f32,
    }

    impl CameraTarget for NullCamera {
        fn set_render_passes(&mut self, _passes: &[PassKind]) {
            self.attached = true;
        }
        fn clear_render_passes(&mut self) {
            self.attached = false;
        }
        fn set_jitter(&mut self, amount: f32) {
            self.jitter = amount;
        }
    }

    fn harness() -> (NullFactory, NullCamera, FogState) {
        (
            NullFactory { created: 0 },
            NullCamera {
                attached: false,
                jitter: 0.0,
            },
            FogState::default(),
        )
    }

    #[test]
    fn test_lifecycle_initialize_update_destroy() {
        let (mut factory, mut camera, mut fog) = harness();
        let mut script = CameraFrameScript::new();

        // hooks before initialize are harmless
        script
            .post_update(
                0.016,
                &mut FrameContext {
                    factory: &mut factory,
                    camera: &mut camera,
                    fog: &mut fog,
                },
            )
            .unwrap();
        assert_eq!(factory.created, 0);

        script
            .initialize(
                CameraFrameConfig::default(),
                &mut FrameContext {
                    factory: &mut factory,
                    camera: &mut camera,
                    fog: &mut fog,
                },
            )
            .unwrap();
        assert_eq!(factory.created, 1);
        assert!(camera.attached);

        script.on_destroy(&mut FrameContext {
            factory: &mut factory,
            camera: &mut camera,
            fog: &mut fog,
        });
        assert!(!camera.attached);
        assert!(script.frame_mut().is_none());

        // double destroy is a no-op
        script.on_destroy(&mut FrameContext {
            factory: &mut factory,
            camera: &mut camera,
            fog: &mut fog,
        });
    }

    #[test]
    fn test_disable_enable_cycle_preserves_config() {
        let (mut factory, mut camera, mut fog) = harness();
        let mut script = CameraFrameScript::new();

        let mut config = CameraFrameConfig::default();
        config.bloom.intensity = 0.07;
        script
            .initialize(
                config,
                &mut FrameContext {
                    factory: &mut factory,
                    camera: &mut camera,
                    fog: &mut fog,
                },
            )
            .unwrap();

        script.on_disable(&mut FrameContext {
            factory: &mut factory,
            camera: &mut camera,
            fog: &mut fog,
        });
        assert!(!camera.attached);

        script
            .on_enable(&mut FrameContext {
                factory: &mut factory,
                camera: &mut camera,
                fog: &mut fog,
            })
            .unwrap();
        assert!(camera.attached);
        assert_eq!(factory.created, 2);
        let frame = script.frame_mut().unwrap();
        assert_eq!(frame.config.bloom.intensity, 0.07);
    }
}
