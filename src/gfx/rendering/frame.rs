//! Per-frame bookkeeping: the build, encode, render ordering and the
//! bind state carried through one render pass.

use std::sync::Arc;

use super::pipeline_manager::ShaderPipeline;
use crate::error::{StageError, StageResult};
use crate::gfx::resources::bind_group_layouts::LIGHTS_GROUP;
use crate::gfx::scene::prop::PropId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePhase {
    Idle,
    Built,
    Encoded,
    Rendered,
}

impl FramePhase {
    /// Name of the call that is legal from this phase.
    fn next_step_name(self) -> &'static str {
        match self {
            FramePhase::Idle => "build_all_buffers",
            FramePhase::Built => "encode_commands",
            FramePhase::Encoded => "render_pass",
            FramePhase::Rendered => "finish_frame",
        }
    }

    /// Name of the call that moves into this phase.
    fn step_name(self) -> &'static str {
        match self {
            FramePhase::Idle => "finish_frame",
            FramePhase::Built => "build_all_buffers",
            FramePhase::Encoded => "encode_commands",
            FramePhase::Rendered => "render_pass",
        }
    }
}

/// Enforces build -> encode -> render -> finish, once each per frame.
#[derive(Debug)]
pub struct FrameSequence {
    phase: FramePhase,
    frame: u64,
}

impl Default for FrameSequence {
    fn default() -> Self {
        Self {
            phase: FramePhase::Idle,
            frame: 0,
        }
    }
}

impl FrameSequence {
    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    /// Index of the frame currently being assembled.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    fn advance(&mut self, from: FramePhase, to: FramePhase) -> StageResult<u64> {
        if self.phase != from {
            return Err(StageError::FrameOrder {
                expected: self.phase.next_step_name(),
                found: to.step_name(),
            });
        }
        self.phase = to;
        Ok(self.frame)
    }

    pub fn begin_build(&mut self) -> StageResult<u64> {
        self.advance(FramePhase::Idle, FramePhase::Built)
    }

    pub fn begin_encode(&mut self) -> StageResult<u64> {
        self.advance(FramePhase::Built, FramePhase::Encoded)
    }

    pub fn begin_render(&mut self) -> StageResult<u64> {
        self.advance(FramePhase::Encoded, FramePhase::Rendered)
    }

    pub fn finish(&mut self) -> StageResult<u64> {
        let frame = self.advance(FramePhase::Rendered, FramePhase::Idle)?;
        self.frame += 1;
        Ok(frame)
    }

    /// Drops a half-built frame after an error.
    pub fn abandon(&mut self) {
        if self.phase != FramePhase::Idle {
            self.phase = FramePhase::Idle;
            self.frame += 1;
        }
    }
}

/// What is currently bound in the pass. Slot 2 is shared between the stage
/// lights and diffuse textures, so it is tracked to rebind the lights after
/// a textured draw.
pub struct PassState<'a> {
    lights: &'a wgpu::BindGroup,
    lights_bound: bool,
    pipeline: Option<Arc<ShaderPipeline>>,
    drawn: Vec<PropId>,
    draw_calls: usize,
}

impl<'a> PassState<'a> {
    /// Assumes the caller bound `lights` at slot 2 already.
    pub fn new(lights: &'a wgpu::BindGroup) -> Self {
        Self {
            lights,
            lights_bound: true,
            pipeline: None,
            drawn: Vec::new(),
            draw_calls: 0,
        }
    }

    pub fn slot_two_replaced(&mut self) {
        self.lights_bound = false;
    }

    pub fn ensure_lights(&mut self, pass: &mut wgpu::RenderPass<'_>) {
        if !self.lights_bound {
            pass.set_bind_group(LIGHTS_GROUP, self.lights, &[]);
            self.lights_bound = true;
        }
    }

    /// Sets `pipeline` unless it is already current.
    pub fn set_pipeline(&mut self, pass: &mut wgpu::RenderPass<'_>, pipeline: &Arc<ShaderPipeline>) {
        let current = self
            .pipeline
            .as_ref()
            .is_some_and(|bound| Arc::ptr_eq(bound, pipeline));
        if !current {
            pass.set_pipeline(&pipeline.pipeline);
            self.pipeline = Some(Arc::clone(pipeline));
        }
    }

    pub fn record_draw(&mut self, prop: PropId, meshes: usize) {
        self.drawn.push(prop);
        self.draw_calls += meshes;
    }

    pub fn into_report(self) -> PassReport {
        PassReport {
            drawn: self.drawn,
            draw_calls: self.draw_calls,
        }
    }
}

/// Props drawn by a pass, in draw order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub drawn: Vec<PropId>,
    pub draw_calls: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle_advances_frame() {
        let mut frames = FrameSequence::default();
        assert_eq!(frames.begin_build().unwrap(), 0);
        assert_eq!(frames.begin_encode().unwrap(), 0);
        assert_eq!(frames.begin_render().unwrap(), 0);
        assert_eq!(frames.finish().unwrap(), 0);
        assert_eq!(frames.frame(), 1);
        assert_eq!(frames.phase(), FramePhase::Idle);
    }

    #[test]
    fn render_before_encode_is_rejected() {
        let mut frames = FrameSequence::default();
        frames.begin_build().unwrap();
        let err = frames.begin_render().unwrap_err();
        assert!(matches!(
            err,
            StageError::FrameOrder {
                expected: "encode_commands",
                found: "render_pass"
            }
        ));
        // the failed call leaves the sequence where it was
        assert_eq!(frames.phase(), FramePhase::Built);
    }

    #[test]
    fn build_twice_is_rejected() {
        let mut frames = FrameSequence::default();
        frames.begin_build().unwrap();
        assert!(frames.begin_build().is_err());
    }

    #[test]
    fn abandon_resets_to_next_frame() {
        let mut frames = FrameSequence::default();
        frames.begin_build().unwrap();
        frames.abandon();
        assert_eq!(frames.phase(), FramePhase::Idle);
        assert_eq!(frames.frame(), 1);
        frames.abandon();
        assert_eq!(frames.frame(), 1);
        assert!(frames.begin_build().is_ok());
    }
}
