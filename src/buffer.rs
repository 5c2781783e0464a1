//! Vertex and index buffers, attribute layouts, and the vertex array that
//! groups them for a draw.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::shader::Shader;

/// Expected update frequency of a buffer's contents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BufferAccess {
    /// Written once at creation.
    #[default]
    Static,
    /// Rewritten from the CPU after creation.
    Dynamic,
}

impl BufferAccess {
    fn usage(self, base: wgpu::BufferUsages) -> wgpu::BufferUsages {
        match self {
            BufferAccess::Static => base,
            BufferAccess::Dynamic => base | wgpu::BufferUsages::COPY_DST,
        }
    }
}

/// An immutable-length GPU buffer of f32 vertex data.
#[derive(Debug)]
pub struct VertexBuffer {
    buffer: wgpu::Buffer,
    len: usize,
    access: BufferAccess,
}

impl VertexBuffer {
    /// Uploads `data` as a static vertex buffer.
    pub fn new(gpu: &GpuContext, data: &[f32]) -> Self {
        Self::with_access(gpu, data, BufferAccess::Static)
    }

    pub fn with_access(gpu: &GpuContext, data: &[f32], access: BufferAccess) -> Self {
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("vertex buffer"),
                contents: bytemuck::cast_slice(data),
                usage: access.usage(wgpu::BufferUsages::VERTEX),
            });
        Self {
            buffer,
            len: data.len(),
            access,
        }
    }

    /// Overwrites the buffer contents in place. The buffer must be
    /// [`Dynamic`](BufferAccess::Dynamic) and `data` must match the
    /// recorded length.
    pub fn update(&self, gpu: &GpuContext, data: &[f32]) {
        debug_assert_eq!(self.access, BufferAccess::Dynamic);
        debug_assert_eq!(data.len(), self.len);
        gpu.queue
            .write_buffer(&self.buffer, 0, bytemuck::cast_slice(data));
    }

    /// Number of f32 elements uploaded.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// A GPU buffer of u16 triangle indices.
#[derive(Debug)]
pub struct IndexBuffer {
    buffer: wgpu::Buffer,
    len: u32,
}

impl IndexBuffer {
    pub const FORMAT: wgpu::IndexFormat = wgpu::IndexFormat::Uint16;

    pub fn new(gpu: &GpuContext, indices: &[u16]) -> Self {
        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("index buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            buffer,
            len: indices.len() as u32,
        }
    }

    /// Number of indices, i.e. the draw count.
    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Component storage of a vertex attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttributeKind {
    #[default]
    Float32,
    /// Normalised u8, mapped to `[0, 1]` in the shader. Two or four
    /// components only.
    Unorm8,
}

/// Describes how one interleaved buffer feeds a shader's attributes.
///
/// Attributes are appended in buffer order; the stride accumulates their
/// sizes plus any explicit padding, so a fully described buffer needs no
/// hand-computed offsets.
#[derive(Debug, Default)]
pub struct VertexBufferLayout {
    attributes: Vec<wgpu::VertexAttribute>,
    stride: u64,
}

impl VertexBufferLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an f32 attribute bound to the named shader input.
    ///
    /// The name is resolved against the shader's reflected vertex inputs;
    /// an unknown name aborts layout construction with
    /// [`RenderError::UnknownLocation`].
    pub fn attribute(
        &mut self,
        shader: &Shader,
        name: &str,
        components: u32,
    ) -> Result<&mut Self, RenderError> {
        self.attribute_with(shader, name, components, AttributeKind::Float32, 0)
    }

    /// Appends an attribute with explicit storage kind and `padding` bytes
    /// inserted before it.
    pub fn attribute_with(
        &mut self,
        shader: &Shader,
        name: &str,
        components: u32,
        kind: AttributeKind,
        padding: u64,
    ) -> Result<&mut Self, RenderError> {
        let location = shader.attribute_location(name)?;
        let format = vertex_format(kind, components).ok_or_else(|| {
            RenderError::Link(format!(
                "attribute '{name}': no format for {components} {kind:?} components"
            ))
        })?;
        self.stride += padding;
        self.attributes.push(wgpu::VertexAttribute {
            format,
            offset: self.stride,
            shader_location: location,
        });
        self.stride += format.size();
        Ok(self)
    }

    /// Total bytes per vertex described so far.
    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub(crate) fn wgpu_layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }
}

fn vertex_format(kind: AttributeKind, components: u32) -> Option<wgpu::VertexFormat> {
    match (kind, components) {
        (AttributeKind::Float32, 1) => Some(wgpu::VertexFormat::Float32),
        (AttributeKind::Float32, 2) => Some(wgpu::VertexFormat::Float32x2),
        (AttributeKind::Float32, 3) => Some(wgpu::VertexFormat::Float32x3),
        (AttributeKind::Float32, 4) => Some(wgpu::VertexFormat::Float32x4),
        (AttributeKind::Unorm8, 2) => Some(wgpu::VertexFormat::Unorm8x2),
        (AttributeKind::Unorm8, 4) => Some(wgpu::VertexFormat::Unorm8x4),
        _ => None,
    }
}

/// An ordered set of vertex buffers and their layouts, bound as slots
/// `0..n` at draw time.
///
/// Holds shared handles to its buffers; a buffer can feed several arrays.
#[derive(Debug, Default)]
pub struct VertexArray {
    entries: Vec<(Arc<VertexBuffer>, VertexBufferLayout)>,
}

impl VertexArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_buffer(&mut self, buffer: Arc<VertexBuffer>, layout: VertexBufferLayout) -> &mut Self {
        self.entries.push((buffer, layout));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn wgpu_layouts(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.entries
            .iter()
            .map(|(_, layout)| layout.wgpu_layout())
            .collect()
    }

    pub(crate) fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (slot, (buffer, _)) in self.entries.iter().enumerate() {
            pass.set_vertex_buffer(slot as u32, buffer.raw().slice(..));
        }
    }
}
