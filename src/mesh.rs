//! Meshes: geometry bound to a shader, with the pipeline that draws them.
//!
//! A [`Mesh`] owns its vertex array and index buffer, shares its shader and
//! optional texture, and bakes the render pipeline for that combination.
//! The factory functions build the common shapes with the standard
//! `aVertexPosition` / `aVertexNormal` / `aTextureCoords` interleaved layout.

use std::f32::consts::PI;
use std::sync::Arc;

use crate::buffer::{IndexBuffer, VertexArray, VertexBuffer, VertexBufferLayout};
use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::renderer::{self, BindState};
use crate::shader::{Shader, TEXTURE_GROUP};
use crate::texture::Texture;

/// Alpha blending over the destination, the fixed blend mode of the
/// renderer.
const ALPHA_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Geometry plus everything needed to draw it: shader, optional texture and
/// the baked pipeline.
///
/// Meshes are shared between scene nodes behind an `Arc`; per-node state
/// (uniform values and buffers) lives on the node's drawable, not here.
pub struct Mesh {
    shader: Arc<Shader>,
    vertex_array: VertexArray,
    index_buffer: IndexBuffer,
    texture: Option<Arc<Texture>>,
    pipeline: wgpu::RenderPipeline,
    texture_bind_group: Option<wgpu::BindGroup>,
}

impl Mesh {
    /// Builds the mesh and its pipeline.
    ///
    /// Fails with [`RenderError::Link`] if the shader samples a texture but
    /// none is supplied, or vice versa.
    pub fn new(
        gpu: &GpuContext,
        shader: Arc<Shader>,
        vertex_array: VertexArray,
        index_buffer: IndexBuffer,
        texture: Option<Arc<Texture>>,
    ) -> Result<Self, RenderError> {
        match (shader.texture_binding(), &texture) {
            (Some(_), None) => {
                return Err(RenderError::Link(format!(
                    "shader '{}' samples a texture but the mesh has none",
                    shader.name()
                )));
            }
            (None, Some(_)) => {
                return Err(RenderError::Link(format!(
                    "mesh carries a texture but shader '{}' never samples one",
                    shader.name()
                )));
            }
            _ => {}
        }

        let shader_gpu = shader.gpu(&gpu.device);

        let mut group_layouts = vec![&shader_gpu.uniform_layout];
        if let Some(texture_layout) = &shader_gpu.texture_layout {
            group_layouts.push(texture_layout);
        }
        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} pipeline layout", shader.name())),
                bind_group_layouts: &group_layouts,
                push_constant_ranges: &[],
            });

        let vertex_layouts = vertex_array.wgpu_layouts();
        let pipeline = gpu
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&format!("{} pipeline", shader.name())),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader_gpu.vertex,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &vertex_layouts,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader_gpu.fragment,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(ALPHA_BLEND),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: renderer::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let bindings = (
            &texture,
            shader.texture_binding(),
            shader_gpu.texture_layout.as_ref(),
        );
        let texture_bind_group = match bindings {
            (Some(texture), Some(binding), Some(layout)) => {
                Some(gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(&format!("{} texture", shader.name())),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: binding.texture,
                            resource: wgpu::BindingResource::TextureView(&texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: binding.sampler,
                            resource: wgpu::BindingResource::Sampler(&texture.sampler),
                        },
                    ],
                }))
            }
            _ => None,
        };

        Ok(Self {
            shader,
            vertex_array,
            index_buffer,
            texture,
            pipeline,
            texture_bind_group,
        })
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn texture(&self) -> Option<&Arc<Texture>> {
        self.texture.as_ref()
    }

    /// Binds pipeline, buffers and texture, skipping the pipeline switch
    /// when this mesh's shader is already current.
    pub(crate) fn bind(&self, pass: &mut wgpu::RenderPass<'_>, state: &mut BindState) {
        if state.switch_to(self.shader.id()) {
            pass.set_pipeline(&self.pipeline);
        }
        self.vertex_array.bind(pass);
        pass.set_index_buffer(self.index_buffer.raw().slice(..), IndexBuffer::FORMAT);
        if let Some(bind_group) = &self.texture_bind_group {
            pass.set_bind_group(TEXTURE_GROUP, bind_group, &[]);
        }
    }

    pub(crate) fn draw_indexed(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.draw_indexed(0..self.index_buffer.len(), 0, 0..1);
    }
}

/// The interleaved position/normal/uv layout the shape factories use.
pub fn standard_layout(shader: &Shader) -> Result<VertexBufferLayout, RenderError> {
    let mut layout = VertexBufferLayout::new();
    layout
        .attribute(shader, "aVertexPosition", 3)?
        .attribute(shader, "aVertexNormal", 3)?
        .attribute(shader, "aTextureCoords", 2)?;
    Ok(layout)
}

/// A textured unit cube centred at the origin, 24 vertices so each face
/// gets flat normals and its own uv corners.
pub fn textured_cube(
    gpu: &GpuContext,
    shader: Arc<Shader>,
    texture: Arc<Texture>,
) -> Result<Mesh, RenderError> {
    let (vertices, indices) = cube_data();
    build_standard(gpu, shader, &vertices, &indices, Some(texture))
}

/// A unit square in the xz-plane facing +y.
pub fn plane(
    gpu: &GpuContext,
    shader: Arc<Shader>,
    texture: Arc<Texture>,
) -> Result<Mesh, RenderError> {
    let (vertices, indices) = plane_data();
    build_standard(gpu, shader, &vertices, &indices, Some(texture))
}

/// A uv sphere of diameter one, textured with equirectangular coordinates.
pub fn sphere(
    gpu: &GpuContext,
    shader: Arc<Shader>,
    texture: Arc<Texture>,
    stacks: u32,
    sectors: u32,
) -> Result<Mesh, RenderError> {
    let (vertices, indices) = sphere_data(stacks, sectors);
    build_standard(gpu, shader, &vertices, &indices, Some(texture))
}

/// A unit cube of 8 shared vertices, positions only, for flat-colour
/// shaders that take their colour from a uniform.
pub fn flat_cube(gpu: &GpuContext, shader: Arc<Shader>) -> Result<Mesh, RenderError> {
    let (vertices, indices) = flat_cube_data();

    let mut layout = VertexBufferLayout::new();
    layout.attribute(&shader, "aVertexPosition", 3)?;

    let mut vertex_array = VertexArray::new();
    vertex_array.add_buffer(Arc::new(VertexBuffer::new(gpu, &vertices)), layout);
    let index_buffer = IndexBuffer::new(gpu, &indices);

    Mesh::new(gpu, shader, vertex_array, index_buffer, None)
}

fn build_standard(
    gpu: &GpuContext,
    shader: Arc<Shader>,
    vertices: &[f32],
    indices: &[u16],
    texture: Option<Arc<Texture>>,
) -> Result<Mesh, RenderError> {
    let layout = standard_layout(&shader)?;
    let mut vertex_array = VertexArray::new();
    vertex_array.add_buffer(Arc::new(VertexBuffer::new(gpu, vertices)), layout);
    let index_buffer = IndexBuffer::new(gpu, indices);
    Mesh::new(gpu, shader, vertex_array, index_buffer, texture)
}

/// Interleaved position/normal/uv data for the 24-vertex cube.
pub fn cube_data() -> (Vec<f32>, Vec<u16>) {
    #[rustfmt::skip]
    let vertices = vec![
        // +z
        -0.5, -0.5,  0.5,   0.0,  0.0,  1.0,   0.0, 0.0,
         0.5, -0.5,  0.5,   0.0,  0.0,  1.0,   1.0, 0.0,
         0.5,  0.5,  0.5,   0.0,  0.0,  1.0,   1.0, 1.0,
        -0.5,  0.5,  0.5,   0.0,  0.0,  1.0,   0.0, 1.0,
        // -z
         0.5, -0.5, -0.5,   0.0,  0.0, -1.0,   0.0, 0.0,
        -0.5, -0.5, -0.5,   0.0,  0.0, -1.0,   1.0, 0.0,
        -0.5,  0.5, -0.5,   0.0,  0.0, -1.0,   1.0, 1.0,
         0.5,  0.5, -0.5,   0.0,  0.0, -1.0,   0.0, 1.0,
        // +x
         0.5, -0.5,  0.5,   1.0,  0.0,  0.0,   0.0, 0.0,
         0.5, -0.5, -0.5,   1.0,  0.0,  0.0,   1.0, 0.0,
         0.5,  0.5, -0.5,   1.0,  0.0,  0.0,   1.0, 1.0,
         0.5,  0.5,  0.5,   1.0,  0.0,  0.0,   0.0, 1.0,
        // -x
        -0.5, -0.5, -0.5,  -1.0,  0.0,  0.0,   0.0, 0.0,
        -0.5, -0.5,  0.5,  -1.0,  0.0,  0.0,   1.0, 0.0,
        -0.5,  0.5,  0.5,  -1.0,  0.0,  0.0,   1.0, 1.0,
        -0.5,  0.5, -0.5,  -1.0,  0.0,  0.0,   0.0, 1.0,
        // +y
        -0.5,  0.5,  0.5,   0.0,  1.0,  0.0,   0.0, 0.0,
         0.5,  0.5,  0.5,   0.0,  1.0,  0.0,   1.0, 0.0,
         0.5,  0.5, -0.5,   0.0,  1.0,  0.0,   1.0, 1.0,
        -0.5,  0.5, -0.5,   0.0,  1.0,  0.0,   0.0, 1.0,
        // -y
        -0.5, -0.5, -0.5,   0.0, -1.0,  0.0,   0.0, 0.0,
         0.5, -0.5, -0.5,   0.0, -1.0,  0.0,   1.0, 0.0,
         0.5, -0.5,  0.5,   0.0, -1.0,  0.0,   1.0, 1.0,
        -0.5, -0.5,  0.5,   0.0, -1.0,  0.0,   0.0, 1.0,
    ];

    let mut indices = Vec::with_capacity(36);
    for face in 0..6u16 {
        let base = face * 4;
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    (vertices, indices)
}

/// Position-only data for the 8-vertex cube.
pub fn flat_cube_data() -> (Vec<f32>, Vec<u16>) {
    #[rustfmt::skip]
    let vertices = vec![
        -0.5, -0.5,  0.5,
         0.5, -0.5,  0.5,
         0.5,  0.5,  0.5,
        -0.5,  0.5,  0.5,
        -0.5, -0.5, -0.5,
         0.5, -0.5, -0.5,
         0.5,  0.5, -0.5,
        -0.5,  0.5, -0.5,
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 1, 2,  0, 2, 3, // front
        1, 5, 6,  1, 6, 2, // right
        5, 4, 7,  5, 7, 6, // back
        4, 0, 3,  4, 3, 7, // left
        3, 2, 6,  3, 6, 7, // top
        4, 5, 1,  4, 1, 0, // bottom
    ];
    (vertices, indices)
}

/// Interleaved position/normal/uv data for the unit plane.
pub fn plane_data() -> (Vec<f32>, Vec<u16>) {
    #[rustfmt::skip]
    let vertices = vec![
        -0.5, 0.0,  0.5,   0.0, 1.0, 0.0,   0.0, 0.0,
         0.5, 0.0,  0.5,   0.0, 1.0, 0.0,   1.0, 0.0,
         0.5, 0.0, -0.5,   0.0, 1.0, 0.0,   1.0, 1.0,
        -0.5, 0.0, -0.5,   0.0, 1.0, 0.0,   0.0, 1.0,
    ];
    let indices = vec![0, 1, 2, 0, 2, 3];
    (vertices, indices)
}

/// Interleaved position/normal/uv data for a uv sphere of radius 0.5.
///
/// Indices are u16, so `(stacks + 1) * (sectors + 1)` must not exceed
/// 65536 vertices; panics on finer tessellations.
pub fn sphere_data(stacks: u32, sectors: u32) -> (Vec<f32>, Vec<u16>) {
    let vertex_count = (stacks + 1) * (sectors + 1);
    assert!(
        vertex_count <= u32::from(u16::MAX) + 1,
        "sphere with {stacks}x{sectors} tessellation needs {vertex_count} vertices, \
         beyond the u16 index range"
    );

    let mut vertices = Vec::with_capacity((vertex_count * 8) as usize);
    let mut indices = Vec::new();

    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        let y = phi.cos();
        let radius = phi.sin();
        for sector in 0..=sectors {
            let theta = 2.0 * PI * sector as f32 / sectors as f32;
            let x = radius * theta.cos();
            let z = radius * theta.sin();
            // The unit normal doubles as the position at radius 0.5.
            vertices.extend_from_slice(&[
                0.5 * x,
                0.5 * y,
                0.5 * z,
                x,
                y,
                z,
                sector as f32 / sectors as f32,
                stack as f32 / stacks as f32,
            ]);
        }
    }

    for stack in 0..stacks {
        for sector in 0..sectors {
            let k1 = (stack * (sectors + 1) + sector) as u16;
            let k2 = k1 + sectors as u16 + 1;
            if stack != 0 {
                indices.extend_from_slice(&[k1, k2, k1 + 1]);
            }
            if stack != stacks - 1 {
                indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
            }
        }
    }

    (vertices, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_a_vertex_per_face_corner() {
        let (vertices, indices) = cube_data();
        assert_eq!(vertices.len(), 24 * 8);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < 24));
    }

    #[test]
    fn cube_normals_are_axis_aligned_unit_vectors() {
        let (vertices, _) = cube_data();
        for vertex in vertices.chunks(8) {
            let normal = &vertex[3..6];
            let len_sq: f32 = normal.iter().map(|n| n * n).sum();
            assert!((len_sq - 1.0).abs() < 1e-6);
            assert_eq!(normal.iter().filter(|n| **n != 0.0).count(), 1);
        }
    }

    #[test]
    fn flat_cube_shares_corners() {
        let (vertices, indices) = flat_cube_data();
        assert_eq!(vertices.len(), 8 * 3);
        assert_eq!(indices.len(), 36);
        assert!(indices.iter().all(|&i| (i as usize) < 8));
    }

    #[test]
    fn plane_faces_up() {
        let (vertices, indices) = plane_data();
        assert_eq!(vertices.len(), 4 * 8);
        assert_eq!(indices.len(), 6);
        for vertex in vertices.chunks(8) {
            assert_eq!(&vertex[3..6], &[0.0, 1.0, 0.0]);
            assert_eq!(vertex[1], 0.0);
        }
    }

    #[test]
    fn sphere_indices_stay_in_bounds() {
        let (vertices, indices) = sphere_data(8, 16);
        let vertex_count = vertices.len() / 8;
        assert_eq!(vertex_count, 9 * 17);
        assert!(indices.iter().all(|&i| (i as usize) < vertex_count));
        // Pole stacks contribute one triangle per sector, the rest two.
        assert_eq!(indices.len() as u32, 3 * (2 * 16 + 2 * 16 * (8 - 2)));
    }

    #[test]
    fn sphere_points_lie_on_the_surface() {
        let (vertices, _) = sphere_data(6, 12);
        for vertex in vertices.chunks(8) {
            let r_sq = vertex[0] * vertex[0] + vertex[1] * vertex[1] + vertex[2] * vertex[2];
            assert!((r_sq - 0.25).abs() < 1e-5);
        }
    }

    #[test]
    #[should_panic(expected = "u16 index range")]
    fn sphere_rejects_tessellation_beyond_u16_indices() {
        sphere_data(300, 300);
    }
}
