//! # Phalanx
//!
//! **A small scene-graph rendering engine on wgpu.**
//!
//! Phalanx pairs a hand-rolled column-major math kernel with a reflected
//! shader layer: WGSL sources are parsed and validated on the CPU, so
//! attribute and uniform names resolve to locations and byte offsets before
//! any GPU object exists, and a mistyped name fails fast instead of
//! rendering garbage. On top sit a transform-propagating scene graph, a
//! smoothed free-fly camera, and a frame loop that clears, walks the tree
//! and presents.
//!
//! ## Quick start
//!
//! ```no_run
//! use phalanx::*;
//! use std::sync::Arc;
//!
//! struct Demo {
//!     scene: Option<SceneNode>,
//! }
//!
//! impl Application for Demo {
//!     fn initialise(&mut self, gpu: &GpuContext, _: &mut Renderer) -> Result<(), RenderError> {
//!         let shader = Arc::new(Shader::compile_and_link(
//!             "flat",
//!             include_str!("shaders/flat.vert.wgsl"),
//!             include_str!("shaders/flat.frag.wgsl"),
//!         )?);
//!         let cube = Arc::new(mesh::flat_cube(gpu, shader)?);
//!         self.scene = Some(SceneNode::with_mesh(cube));
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, dt: f32, _: &Input) -> Result<(), RenderError> {
//!         let scene = self.scene.as_mut().ok_or(RenderError::NotInitialised)?;
//!         scene.pose.orientation.y += dt;
//!         scene.update(dt, &Matrix4::IDENTITY, &UniformBundles::new())
//!     }
//!
//!     fn draw(&mut self, gpu: &GpuContext, renderer: &mut Renderer) -> Result<(), RenderError> {
//!         let scene = self.scene.as_mut().ok_or(RenderError::NotInitialised)?;
//!         if let Some(mut frame) = renderer.begin_frame(gpu)? {
//!             renderer.draw(gpu, &mut frame, scene);
//!             renderer.end_frame(gpu, frame);
//!         }
//!         Ok(())
//!     }
//! }
//!
//! fn main() {
//!     run(AppConfig::new("demo"), Demo { scene: None });
//! }
//! ```

mod app;
pub mod buffer;
mod camera;
mod error;
mod gpu;
mod input;
pub mod math;
pub mod mesh;
mod renderer;
mod scene;
mod shader;
mod texture;
mod uniform;

pub use app::{AppConfig, Application, run};
pub use buffer::{AttributeKind, BufferAccess, IndexBuffer, VertexArray, VertexBuffer, VertexBufferLayout};
pub use camera::Camera;
pub use error::{RenderError, ShaderStage};
pub use gpu::GpuContext;
pub use input::Input;
pub use math::{Colour, Matrix4, Vector2, Vector3, Vector4};
pub use mesh::Mesh;
pub use renderer::{Frame, Renderer};
pub use scene::{Drawable, SceneNode, Transformable, UniformBundles};
pub use shader::{BlockLayout, Shader, TextureBinding, UniformKind, UniformMember};
pub use texture::{Texture, TextureWrap};
pub use uniform::{UniformSet, UniformStaging, UniformValue};

// Commonly used winit types, re-exported so applications need no direct
// winit dependency.
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
