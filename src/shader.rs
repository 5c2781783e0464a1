//! Shader programs: WGSL compilation, validation and reflection.
//!
//! A [`Shader`] is built from a vertex source and a fragment source. Both are
//! parsed and validated with naga on the CPU, then reflected so that
//! attribute and uniform names can be resolved to locations and byte offsets
//! before any GPU object exists. The wgpu modules and bind group layouts are
//! created lazily the first time a mesh is built against a device.
//!
//! Conventions the reflection enforces:
//! - entry points are named `vs_main` and `fs_main`
//! - uniform blocks live in `@group(0)`, one binding per stage
//! - an optional `texture_2d<f32>` plus `sampler` pair lives in `@group(1)`

use std::collections::HashMap;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{RenderError, ShaderStage};
use crate::uniform::UniformStaging;

/// Bind group index for per-stage uniform blocks.
pub const UNIFORM_GROUP: u32 = 0;
/// Bind group index for the texture/sampler pair.
pub const TEXTURE_GROUP: u32 = 1;

/// The type a shader declares for one uniform block member.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    /// Declared `u32` or `i32` in WGSL; assigned from a [`bool`] value since
    /// uniform blocks cannot hold booleans directly.
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

/// One member of a reflected uniform block.
#[derive(Clone, Copy, Debug)]
pub struct UniformMember {
    /// Byte offset within the block, per WGSL layout rules.
    pub offset: u32,
    pub kind: UniformKind,
}

/// A reflected `var<uniform>` struct in `@group(0)`.
#[derive(Debug)]
pub struct BlockLayout {
    pub stage: ShaderStage,
    pub binding: u32,
    /// Struct size in bytes, before rounding to the binding alignment.
    pub size: u32,
    pub members: HashMap<String, UniformMember>,
}

/// Reflected texture/sampler bindings in `@group(1)`.
#[derive(Clone, Copy, Debug)]
pub struct TextureBinding {
    pub texture: u32,
    pub sampler: u32,
}

pub(crate) struct ShaderGpu {
    pub vertex: wgpu::ShaderModule,
    pub fragment: wgpu::ShaderModule,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: Option<wgpu::BindGroupLayout>,
}

/// A compiled, linked and reflected shader program.
///
/// Cheap to share behind an `Arc`; identity comparisons in the renderer's
/// bind state use [`id`](Self::id).
pub struct Shader {
    name: String,
    id: u64,
    vertex_source: String,
    fragment_source: String,
    attributes: HashMap<String, u32>,
    blocks: Vec<BlockLayout>,
    texture_binding: Option<TextureBinding>,
    gpu: OnceLock<ShaderGpu>,
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("attributes", &self.attributes)
            .field("blocks", &self.blocks)
            .field("texture_binding", &self.texture_binding)
            .finish_non_exhaustive()
    }
}

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

impl Shader {
    /// Compiles both stages, validates them, and reflects the program's
    /// interface.
    ///
    /// A parse or validation failure in either stage yields
    /// [`RenderError::Compile`] carrying that stage's diagnostic; interface
    /// violations (missing entry point, unsupported uniform type, clashing
    /// bindings) yield [`RenderError::Link`]. Nothing of a failed shader is
    /// retained.
    pub fn compile_and_link(
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self, RenderError> {
        let vertex_module = compile_stage(ShaderStage::Vertex, vertex_source)?;
        let fragment_module = compile_stage(ShaderStage::Fragment, fragment_source)?;

        let vs_entry = vertex_module
            .entry_points
            .iter()
            .find(|ep| ep.stage == naga::ShaderStage::Vertex && ep.name == "vs_main")
            .ok_or_else(|| {
                RenderError::Link(format!("'{name}' has no vertex entry point named vs_main"))
            })?;
        fragment_module
            .entry_points
            .iter()
            .find(|ep| ep.stage == naga::ShaderStage::Fragment && ep.name == "fs_main")
            .ok_or_else(|| {
                RenderError::Link(format!("'{name}' has no fragment entry point named fs_main"))
            })?;

        let attributes = reflect_attributes(&vertex_module, vs_entry);

        let mut blocks = reflect_blocks(name, &vertex_module, ShaderStage::Vertex)?;
        blocks.extend(reflect_blocks(name, &fragment_module, ShaderStage::Fragment)?);
        check_block_consistency(name, &blocks)?;

        let texture_binding = reflect_texture(name, &fragment_module)?;

        log::debug!(
            "linked shader '{name}': {} attributes, {} uniform blocks, texture: {}",
            attributes.len(),
            blocks.len(),
            texture_binding.is_some(),
        );

        Ok(Self {
            name: name.to_owned(),
            id: NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed),
            vertex_source: vertex_source.to_owned(),
            fragment_source: fragment_source.to_owned(),
            attributes,
            blocks,
            texture_binding,
            gpu: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process-unique identity, used to skip redundant pipeline rebinds.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Resolves a vertex attribute name to its `@location`.
    ///
    /// Unknown names fail fast so a mistyped attribute aborts buffer layout
    /// construction instead of rendering garbage.
    pub fn attribute_location(&self, name: &str) -> Result<u32, RenderError> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| RenderError::UnknownLocation(name.to_owned()))
    }

    pub fn blocks(&self) -> &[BlockLayout] {
        &self.blocks
    }

    pub fn texture_binding(&self) -> Option<TextureBinding> {
        self.texture_binding
    }

    /// Byte offset of the named uniform within its block.
    ///
    /// When both stages declare the name, the first declaring block wins;
    /// use [`uniform_members`](Self::uniform_members) to see every
    /// declaration.
    pub fn uniform_offset(&self, name: &str) -> Result<u32, RenderError> {
        self.uniform_members(name)
            .next()
            .map(|(_, member)| member.offset)
            .ok_or_else(|| RenderError::UnknownLocation(name.to_owned()))
    }

    /// Every block member with the given name, as `(block index, member)`.
    /// A name declared by both stages is yielded once per stage.
    pub fn uniform_members<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (usize, &'a UniformMember)> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(move |(index, block)| block.members.get(name).map(|m| (index, m)))
    }

    /// One empty CPU staging block per reflected uniform block.
    pub fn create_staging(&self) -> Vec<UniformStaging> {
        self.blocks
            .iter()
            .map(|b| UniformStaging::new(b.size as usize))
            .collect()
    }

    pub(crate) fn gpu(&self, device: &wgpu::Device) -> &ShaderGpu {
        self.gpu.get_or_init(|| {
            let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{}-vertex", self.name)),
                source: wgpu::ShaderSource::Wgsl(self.vertex_source.as_str().into()),
            });
            let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{}-fragment", self.name)),
                source: wgpu::ShaderSource::Wgsl(self.fragment_source.as_str().into()),
            });

            let entries: Vec<wgpu::BindGroupLayoutEntry> = self
                .blocks
                .iter()
                .map(|block| wgpu::BindGroupLayoutEntry {
                    binding: block.binding,
                    visibility: match block.stage {
                        ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
                        ShaderStage::Fragment => wgpu::ShaderStages::FRAGMENT,
                    },
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                })
                .collect();
            let uniform_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{}-uniforms", self.name)),
                    entries: &entries,
                });

            let texture_layout = self.texture_binding.map(|binding| {
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&format!("{}-texture", self.name)),
                    entries: &[
                        wgpu::BindGroupLayoutEntry {
                            binding: binding.texture,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D2,
                                multisampled: false,
                            },
                            count: None,
                        },
                        wgpu::BindGroupLayoutEntry {
                            binding: binding.sampler,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                })
            });

            ShaderGpu {
                vertex,
                fragment,
                uniform_layout,
                texture_layout,
            }
        })
    }
}

fn compile_stage(stage: ShaderStage, source: &str) -> Result<naga::Module, RenderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RenderError::Compile {
        stage,
        diagnostic: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|e| RenderError::Compile {
        stage,
        diagnostic: e.emit_to_string(source),
    })?;

    Ok(module)
}

fn reflect_attributes(
    module: &naga::Module,
    entry: &naga::EntryPoint,
) -> HashMap<String, u32> {
    let mut attributes = HashMap::new();
    for argument in &entry.function.arguments {
        match &argument.binding {
            Some(naga::Binding::Location { location, .. }) => {
                if let Some(name) = &argument.name {
                    attributes.insert(name.clone(), *location);
                }
            }
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                // Inputs gathered into a struct carry bindings on the members.
                if let naga::TypeInner::Struct { members, .. } = &module.types[argument.ty].inner {
                    for member in members {
                        if let (Some(name), Some(naga::Binding::Location { location, .. })) =
                            (&member.name, &member.binding)
                        {
                            attributes.insert(name.clone(), *location);
                        }
                    }
                }
            }
        }
    }
    attributes
}

fn reflect_blocks(
    shader_name: &str,
    module: &naga::Module,
    stage: ShaderStage,
) -> Result<Vec<BlockLayout>, RenderError> {
    let mut blocks = Vec::new();
    for (_, variable) in module.global_variables.iter() {
        if !matches!(variable.space, naga::AddressSpace::Uniform) {
            continue;
        }
        let var_name = variable.name.as_deref().unwrap_or("<anonymous>");
        let binding = variable.binding.as_ref().ok_or_else(|| {
            RenderError::Link(format!(
                "'{shader_name}': uniform '{var_name}' has no @group/@binding"
            ))
        })?;
        if binding.group != UNIFORM_GROUP {
            return Err(RenderError::Link(format!(
                "'{shader_name}': uniform block '{var_name}' must live in @group({UNIFORM_GROUP})"
            )));
        }
        let naga::TypeInner::Struct { members, span } = &module.types[variable.ty].inner else {
            return Err(RenderError::Link(format!(
                "'{shader_name}': uniform '{var_name}' is not a struct block"
            )));
        };

        let mut member_map = HashMap::new();
        for member in members {
            let Some(member_name) = member.name.clone() else {
                continue;
            };
            let kind = uniform_kind(&module.types[member.ty].inner).ok_or_else(|| {
                RenderError::Link(format!(
                    "'{shader_name}': uniform '{member_name}' has an unsupported type"
                ))
            })?;
            member_map.insert(
                member_name,
                UniformMember {
                    offset: member.offset,
                    kind,
                },
            );
        }

        blocks.push(BlockLayout {
            stage,
            binding: binding.binding,
            size: *span,
            members: member_map,
        });
    }
    blocks.sort_by_key(|b| b.binding);
    Ok(blocks)
}

fn check_block_consistency(shader_name: &str, blocks: &[BlockLayout]) -> Result<(), RenderError> {
    for (i, a) in blocks.iter().enumerate() {
        for b in &blocks[i + 1..] {
            if a.binding == b.binding {
                return Err(RenderError::Link(format!(
                    "'{shader_name}': {} and {} uniform blocks share @binding({})",
                    a.stage, b.stage, a.binding
                )));
            }
            for (name, member) in &a.members {
                if let Some(other) = b.members.get(name) {
                    if other.kind != member.kind {
                        return Err(RenderError::Link(format!(
                            "'{shader_name}': uniform '{name}' declared as {:?} in one stage and {:?} in the other",
                            member.kind, other.kind
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

fn reflect_texture(
    shader_name: &str,
    module: &naga::Module,
) -> Result<Option<TextureBinding>, RenderError> {
    let mut texture = None;
    let mut sampler = None;
    for (_, variable) in module.global_variables.iter() {
        if !matches!(variable.space, naga::AddressSpace::Handle) {
            continue;
        }
        let var_name = variable.name.as_deref().unwrap_or("<anonymous>");
        let binding = variable.binding.as_ref().ok_or_else(|| {
            RenderError::Link(format!(
                "'{shader_name}': resource '{var_name}' has no @group/@binding"
            ))
        })?;
        match &module.types[variable.ty].inner {
            naga::TypeInner::Image { .. } => {
                if binding.group != TEXTURE_GROUP {
                    return Err(RenderError::Link(format!(
                        "'{shader_name}': texture '{var_name}' must live in @group({TEXTURE_GROUP})"
                    )));
                }
                texture = Some(binding.binding);
            }
            naga::TypeInner::Sampler { .. } => {
                if binding.group != TEXTURE_GROUP {
                    return Err(RenderError::Link(format!(
                        "'{shader_name}': sampler '{var_name}' must live in @group({TEXTURE_GROUP})"
                    )));
                }
                sampler = Some(binding.binding);
            }
            _ => {}
        }
    }
    match (texture, sampler) {
        (None, None) => Ok(None),
        (Some(texture), Some(sampler)) => Ok(Some(TextureBinding { texture, sampler })),
        _ => Err(RenderError::Link(format!(
            "'{shader_name}': a texture and its sampler must be declared together"
        ))),
    }
}

fn uniform_kind(inner: &naga::TypeInner) -> Option<UniformKind> {
    match inner {
        naga::TypeInner::Scalar(scalar) => match scalar.kind {
            naga::ScalarKind::Float => Some(UniformKind::Float),
            naga::ScalarKind::Uint | naga::ScalarKind::Sint => Some(UniformKind::Bool),
            _ => None,
        },
        naga::TypeInner::Vector { size, scalar } if scalar.kind == naga::ScalarKind::Float => {
            match size {
                naga::VectorSize::Bi => Some(UniformKind::Vec2),
                naga::VectorSize::Tri => Some(UniformKind::Vec3),
                naga::VectorSize::Quad => Some(UniformKind::Vec4),
            }
        }
        naga::TypeInner::Matrix {
            columns: naga::VectorSize::Quad,
            rows: naga::VectorSize::Quad,
            ..
        } => Some(UniformKind::Mat4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_VERTEX: &str = r#"
        struct VertexUniforms {
            uModelMatrix: mat4x4<f32>,
            uViewMatrix: mat4x4<f32>,
            uProjectionMatrix: mat4x4<f32>,
        }
        @group(0) @binding(0) var<uniform> vertex_uniforms: VertexUniforms;

        @vertex
        fn vs_main(
            @location(0) aVertexPosition: vec3<f32>,
            @location(1) aVertexNormal: vec3<f32>,
            @location(2) aTextureCoords: vec2<f32>,
        ) -> @builtin(position) vec4<f32> {
            let world = vertex_uniforms.uModelMatrix * vec4<f32>(aVertexPosition, 1.0);
            return vertex_uniforms.uProjectionMatrix * vertex_uniforms.uViewMatrix * world;
        }
    "#;

    const TEST_FRAGMENT: &str = r#"
        struct FragmentUniforms {
            uLightPosition: vec3<f32>,
            uShininess: f32,
            uColour: vec4<f32>,
        }
        @group(0) @binding(1) var<uniform> fragment_uniforms: FragmentUniforms;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return fragment_uniforms.uColour * fragment_uniforms.uShininess;
        }
    "#;

    fn test_shader() -> Shader {
        Shader::compile_and_link("test", TEST_VERTEX, TEST_FRAGMENT).unwrap()
    }

    #[test]
    fn attributes_resolve_to_declared_locations() {
        let shader = test_shader();
        assert_eq!(shader.attribute_location("aVertexPosition").unwrap(), 0);
        assert_eq!(shader.attribute_location("aVertexNormal").unwrap(), 1);
        assert_eq!(shader.attribute_location("aTextureCoords").unwrap(), 2);
    }

    #[test]
    fn unknown_attribute_fails_fast() {
        let shader = test_shader();
        let err = shader.attribute_location("aVertexPostion").unwrap_err();
        assert!(matches!(err, RenderError::UnknownLocation(name) if name == "aVertexPostion"));
    }

    #[test]
    fn uniform_blocks_reflect_offsets_and_kinds() {
        let shader = test_shader();
        assert_eq!(shader.blocks().len(), 2);

        let vertex_block = &shader.blocks()[0];
        assert_eq!(vertex_block.stage, ShaderStage::Vertex);
        assert_eq!(vertex_block.binding, 0);
        assert_eq!(vertex_block.members["uModelMatrix"].offset, 0);
        assert_eq!(vertex_block.members["uViewMatrix"].offset, 64);
        assert_eq!(vertex_block.members["uProjectionMatrix"].offset, 128);
        assert_eq!(vertex_block.members["uModelMatrix"].kind, UniformKind::Mat4);
        assert_eq!(vertex_block.size, 192);

        // vec3 aligns to 16 but occupies 12 bytes, so the f32 packs after it.
        let fragment_block = &shader.blocks()[1];
        assert_eq!(fragment_block.stage, ShaderStage::Fragment);
        assert_eq!(fragment_block.binding, 1);
        assert_eq!(fragment_block.members["uLightPosition"].offset, 0);
        assert_eq!(fragment_block.members["uShininess"].offset, 12);
        assert_eq!(fragment_block.members["uColour"].offset, 16);
        assert_eq!(fragment_block.members["uColour"].kind, UniformKind::Vec4);

        assert_eq!(shader.uniform_offset("uViewMatrix").unwrap(), 64);
        assert!(matches!(
            shader.uniform_offset("uMissing"),
            Err(RenderError::UnknownLocation(_))
        ));
    }

    #[test]
    fn bad_fragment_source_reports_compile_error() {
        let err =
            Shader::compile_and_link("broken", TEST_VERTEX, "@fragment fn fs_main( {").unwrap_err();
        match err {
            RenderError::Compile { stage, diagnostic } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[test]
    fn missing_entry_point_reports_link_error() {
        let fragment = r#"
            @fragment
            fn main_fs() -> @location(0) vec4<f32> {
                return vec4<f32>(1.0);
            }
        "#;
        let err = Shader::compile_and_link("misnamed", TEST_VERTEX, fragment).unwrap_err();
        assert!(matches!(err, RenderError::Link(_)));
    }

    #[test]
    fn clashing_block_bindings_report_link_error() {
        let fragment = r#"
            struct FragmentUniforms { uColour: vec4<f32> }
            @group(0) @binding(0) var<uniform> fragment_uniforms: FragmentUniforms;

            @fragment
            fn fs_main() -> @location(0) vec4<f32> {
                return fragment_uniforms.uColour;
            }
        "#;
        let err = Shader::compile_and_link("clash", TEST_VERTEX, fragment).unwrap_err();
        assert!(matches!(err, RenderError::Link(_)));
    }

    #[test]
    fn texture_reflection_finds_the_pair() {
        let fragment = r#"
            @group(1) @binding(0) var uTexture: texture_2d<f32>;
            @group(1) @binding(1) var uSampler: sampler;

            @fragment
            fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
                return textureSample(uTexture, uSampler, uv);
            }
        "#;
        let vertex = r#"
            @vertex
            fn vs_main(@location(0) aVertexPosition: vec3<f32>)
                -> @builtin(position) vec4<f32> {
                return vec4<f32>(aVertexPosition, 1.0);
            }
        "#;
        // The fragment entry point consumes a uv the vertex stage does not
        // produce; stage interface matching happens at pipeline creation,
        // not here, so reflection alone accepts it.
        let shader = Shader::compile_and_link("textured", vertex, fragment).unwrap();
        let binding = shader.texture_binding().unwrap();
        assert_eq!(binding.texture, 0);
        assert_eq!(binding.sampler, 1);

        let plain = test_shader();
        assert!(plain.texture_binding().is_none());
    }

    #[test]
    fn shader_ids_are_unique() {
        assert_ne!(test_shader().id(), test_shader().id());
    }
}
