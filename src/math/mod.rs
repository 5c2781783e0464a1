//! Linear algebra primitives for 3D rendering.
//!
//! This module provides the small fixed-size vector and matrix types the rest
//! of the engine is built on: [`Vector2`], [`Vector3`], [`Vector4`],
//! [`Matrix4`] and [`Colour`]. All types are plain `Copy` values backed by
//! `f32` components, so copying one always yields a fully independent value.
//!
//! [`Matrix4`] is column-major, matching the GPU-side `mat4x4<f32>` layout,
//! so a matrix can be uploaded to a uniform buffer without reshuffling.

mod colour;
mod matrix;
mod vector;

pub use colour::Colour;
pub use matrix::Matrix4;
pub use vector::{Vector2, Vector3, Vector4};

/// Linear interpolation between `a` and `b` by factor `t` in `[0, 1]`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}
