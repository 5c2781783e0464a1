//! Frame orchestration: clearing, depth, and scene traversal.
//!
//! The [`Renderer`] owns the depth buffer, the clear colour and the bind
//! state that deduplicates pipeline switches within a frame. A frame is
//! bracketed by [`begin_frame`](Renderer::begin_frame) and
//! [`end_frame`](Renderer::end_frame); in between, [`draw`](Renderer::draw)
//! walks scene trees into the open render pass.

use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::math::Colour;
use crate::scene::SceneNode;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Tracks the pipeline bound in the current pass so consecutive draws with
/// the same shader skip the rebind.
pub(crate) struct BindState {
    current: Option<u64>,
}

impl BindState {
    fn new() -> Self {
        Self { current: None }
    }

    fn reset(&mut self) {
        self.current = None;
    }

    /// Records `shader_id` as current; returns whether a pipeline switch is
    /// needed.
    pub(crate) fn switch_to(&mut self, shader_id: u64) -> bool {
        if self.current == Some(shader_id) {
            false
        } else {
            self.current = Some(shader_id);
            true
        }
    }
}

/// An in-flight frame: the surface texture being drawn to, the command
/// encoder, and the open render pass.
pub struct Frame {
    surface_texture: wgpu::SurfaceTexture,
    encoder: wgpu::CommandEncoder,
    pass: Option<wgpu::RenderPass<'static>>,
}

pub struct Renderer {
    clear_colour: wgpu::Color,
    bind_state: BindState,
    depth: Option<(wgpu::TextureView, (u32, u32))>,
}

impl Renderer {
    pub fn new(_gpu: &GpuContext) -> Self {
        Self {
            clear_colour: wgpu::Color::BLACK,
            bind_state: BindState::new(),
            depth: None,
        }
    }

    pub fn set_clear_colour(&mut self, colour: Colour) {
        self.clear_colour = wgpu::Color {
            r: colour.r as f64,
            g: colour.g as f64,
            b: colour.b as f64,
            a: colour.a as f64,
        };
    }

    /// Acquires the next surface texture and opens a render pass that
    /// clears colour and depth.
    ///
    /// Returns `Ok(None)` when the surface needs reconfiguring or timed
    /// out; skip the frame and try again on the next redraw.
    pub fn begin_frame(&mut self, gpu: &GpuContext) -> Result<Option<Frame>, RenderError> {
        let surface_texture = match gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                gpu.surface.configure(&gpu.device, &gpu.config);
                return Ok(None);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface acquire timed out, skipping frame");
                return Ok(None);
            }
            Err(error) => return Err(RenderError::Surface(error.to_string())),
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.ensure_depth(gpu);
        let Some((depth_view, _)) = &self.depth else {
            return Err(RenderError::Surface("no depth buffer".to_owned()));
        };

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();

        self.bind_state.reset();

        Ok(Some(Frame {
            surface_texture,
            encoder,
            pass: Some(pass),
        }))
    }

    /// Draws a scene tree into the frame's pass. Call as many times as
    /// there are root nodes.
    pub fn draw(&mut self, gpu: &GpuContext, frame: &mut Frame, scene: &mut SceneNode) {
        if let Some(pass) = &mut frame.pass {
            scene.draw(gpu, pass, &mut self.bind_state);
        }
    }

    /// Closes the pass, submits the commands and presents the frame.
    pub fn end_frame(&mut self, gpu: &GpuContext, mut frame: Frame) {
        drop(frame.pass.take());
        gpu.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    /// Recreates the depth buffer when the surface size has changed.
    fn ensure_depth(&mut self, gpu: &GpuContext) {
        let size = (gpu.config.width, gpu.config.height);
        if self.depth.as_ref().map(|(_, s)| *s) == Some(size) {
            return;
        }
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth buffer"),
            size: wgpu::Extent3d {
                width: size.0,
                height: size.1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some((view, size));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_state_skips_repeat_binds() {
        let mut state = BindState::new();
        assert!(state.switch_to(1));
        assert!(!state.switch_to(1));
        assert!(state.switch_to(2));
        assert!(state.switch_to(1));
    }

    #[test]
    fn bind_state_rebinds_after_reset() {
        let mut state = BindState::new();
        assert!(state.switch_to(7));
        state.reset();
        assert!(state.switch_to(7));
    }
}
