//! Uniform values and the per-node staging blocks they are written through.
//!
//! Uniform dispatch is a closed switch over [`UniformValue`] rather than
//! open-ended type inspection: the caller names the semantic type at the
//! call site, and it is checked against the type the shader declares for
//! that member.

use std::collections::HashMap;

use crate::error::RenderError;
use crate::math::{Colour, Matrix4, Vector2, Vector3, Vector4};
use crate::shader::{Shader, UniformKind, UniformMember};

/// A value assignable to a named shader uniform.
///
/// [`Colour`] is accepted wherever the shader declares a `vec4<f32>`, since
/// the two share a representation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Float(f32),
    /// Uploaded as a `u32` of 0 or 1; WGSL uniform blocks cannot hold `bool`
    /// directly, so the shader declares `u32` for flags.
    Bool(bool),
    Vec2(Vector2),
    Vec3(Vector3),
    Vec4(Vector4),
    Mat4(Matrix4),
    Colour(Colour),
}

impl UniformValue {
    /// The shader-side type this value matches.
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Bool(_) => UniformKind::Bool,
            UniformValue::Vec2(_) => UniformKind::Vec2,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) | UniformValue::Colour(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    fn write_into(&self, out: &mut [u8]) {
        match self {
            UniformValue::Float(v) => out[..4].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Bool(v) => {
                out[..4].copy_from_slice(bytemuck::bytes_of(&(*v as u32)));
            }
            UniformValue::Vec2(v) => out[..8].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec3(v) => out[..12].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Vec4(v) => out[..16].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Colour(v) => out[..16].copy_from_slice(bytemuck::bytes_of(v)),
            UniformValue::Mat4(v) => out[..64].copy_from_slice(bytemuck::bytes_of(v)),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<bool> for UniformValue {
    fn from(v: bool) -> Self {
        UniformValue::Bool(v)
    }
}

impl From<Vector2> for UniformValue {
    fn from(v: Vector2) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<Vector3> for UniformValue {
    fn from(v: Vector3) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Vector4> for UniformValue {
    fn from(v: Vector4) -> Self {
        UniformValue::Vec4(v)
    }
}

impl From<Matrix4> for UniformValue {
    fn from(v: Matrix4) -> Self {
        UniformValue::Mat4(v)
    }
}

impl From<Colour> for UniformValue {
    fn from(v: Colour) -> Self {
        UniformValue::Colour(v)
    }
}

/// A CPU-side byte image of one reflected uniform block.
///
/// Writes land at the member offsets the shader reflection reported and mark
/// the block dirty; a flush hands the bytes out for upload exactly once per
/// dirty period. Re-flushing an unchanged block does nothing, which is what
/// keeps redundant GPU uploads out of the bind path.
#[derive(Debug)]
pub struct UniformStaging {
    data: Vec<u8>,
    dirty: bool,
    upload_count: usize,
}

impl UniformStaging {
    pub(crate) fn new(size: usize) -> Self {
        // Uniform buffer bindings round up to 16-byte multiples.
        let size = size.div_ceil(16) * 16;
        Self {
            data: vec![0; size],
            dirty: false,
            upload_count: 0,
        }
    }

    /// Writes `value` at `member`'s offset after checking its type.
    pub(crate) fn set(
        &mut self,
        name: &str,
        member: &UniformMember,
        value: &UniformValue,
    ) -> Result<(), RenderError> {
        if value.kind() != member.kind {
            return Err(RenderError::UnknownUniformType {
                name: name.to_owned(),
                detail: format!("shader declares {:?}, got {:?}", member.kind, value.kind()),
            });
        }
        let offset = member.offset as usize;
        value.write_into(&mut self.data[offset..]);
        self.dirty = true;
        Ok(())
    }

    /// Returns the block bytes if anything changed since the last flush,
    /// clearing the dirty flag and counting the upload.
    pub(crate) fn flush(&mut self) -> Option<&[u8]> {
        if self.dirty {
            self.dirty = false;
            self.upload_count += 1;
            Some(&self.data)
        } else {
            None
        }
    }

    /// Number of flushes that actually produced an upload.
    pub fn upload_count(&self) -> usize {
        self.upload_count
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.data
    }
}

/// A node's named uniform assignments plus the staging blocks they write
/// through, resolved against one shader's reflection.
#[derive(Debug)]
pub struct UniformSet {
    values: HashMap<String, UniformValue>,
    staging: Vec<UniformStaging>,
}

impl UniformSet {
    /// Creates an empty set with one staging block per reflected block of
    /// `shader`.
    pub fn new(shader: &Shader) -> Self {
        Self {
            values: HashMap::new(),
            staging: shader.create_staging(),
        }
    }

    /// Assigns `value` to the named uniform, writing it into every block
    /// that declares the name.
    ///
    /// Fails with [`RenderError::UnknownLocation`] if the shader declares no
    /// such uniform, or [`RenderError::UnknownUniformType`] on a type
    /// mismatch.
    pub fn set(
        &mut self,
        shader: &Shader,
        name: &str,
        value: UniformValue,
    ) -> Result<(), RenderError> {
        let mut found = false;
        for (index, member) in shader.uniform_members(name) {
            self.staging[index].set(name, member, &value)?;
            found = true;
        }
        if !found {
            return Err(RenderError::UnknownLocation(name.to_owned()));
        }
        self.values.insert(name.to_owned(), value);
        Ok(())
    }

    /// Shallow-merges incoming assignments; incoming values win on key
    /// collision.
    pub fn merge(
        &mut self,
        shader: &Shader,
        incoming: &[(String, UniformValue)],
    ) -> Result<(), RenderError> {
        for (name, value) in incoming {
            self.set(shader, name, *value)?;
        }
        Ok(())
    }

    /// The currently assigned value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    pub(crate) fn staging_mut(&mut self) -> &mut [UniformStaging] {
        &mut self.staging
    }

    pub(crate) fn staging(&self) -> &[UniformStaging] {
        &self.staging
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Matrix4;
    use crate::shader::Shader;

    const VERTEX: &str = r#"
        struct VertexUniforms {
            uModelMatrix: mat4x4<f32>,
        }
        @group(0) @binding(0) var<uniform> vertex_uniforms: VertexUniforms;

        @vertex
        fn vs_main(@location(0) aVertexPosition: vec3<f32>)
            -> @builtin(position) vec4<f32> {
            return vertex_uniforms.uModelMatrix * vec4<f32>(aVertexPosition, 1.0);
        }
    "#;

    const FRAGMENT: &str = r#"
        struct FragmentUniforms {
            uColour: vec4<f32>,
            uLightColour: vec3<f32>,
            uShininess: f32,
        }
        @group(0) @binding(1) var<uniform> fragment_uniforms: FragmentUniforms;

        @fragment
        fn fs_main() -> @location(0) vec4<f32> {
            return fragment_uniforms.uColour
                * vec4<f32>(fragment_uniforms.uLightColour, fragment_uniforms.uShininess);
        }
    "#;

    fn shader() -> Shader {
        Shader::compile_and_link("uniform-test", VERTEX, FRAGMENT).unwrap()
    }

    #[test]
    fn set_lands_at_reflected_offset() {
        let shader = shader();
        let mut set = UniformSet::new(&shader);
        set.set(&shader, "uShininess", UniformValue::Float(32.0))
            .unwrap();

        // uShininess packs after the vec3 at offset 28 in the fragment block.
        let bytes = set.staging()[1].bytes();
        let stored = f32::from_le_bytes(bytes[28..32].try_into().unwrap());
        assert_eq!(stored, 32.0);
    }

    #[test]
    fn unknown_name_is_rejected() {
        let shader = shader();
        let mut set = UniformSet::new(&shader);
        let err = set
            .set(&shader, "uColor", UniformValue::Colour(Colour::WHITE))
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownLocation(name) if name == "uColor"));
    }

    #[test]
    fn mismatched_type_is_rejected() {
        let shader = shader();
        let mut set = UniformSet::new(&shader);
        let err = set
            .set(&shader, "uColour", UniformValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, RenderError::UnknownUniformType { .. }));
    }

    #[test]
    fn colour_satisfies_a_vec4_member() {
        let shader = shader();
        let mut set = UniformSet::new(&shader);
        set.set(&shader, "uColour", UniformValue::Colour(Colour::rgb(1.0, 0.5, 0.0)))
            .unwrap();
        let bytes = set.staging()[1].bytes();
        let g = f32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(g, 0.5);
    }

    #[test]
    fn upload_happens_once_per_dirty_period() {
        let shader = shader();
        let mut set = UniformSet::new(&shader);
        set.set(&shader, "uModelMatrix", UniformValue::Mat4(Matrix4::IDENTITY))
            .unwrap();

        let block = &mut set.staging_mut()[0];
        assert!(block.flush().is_some());
        assert_eq!(block.upload_count(), 1);

        // Rebinding without a set uploads nothing.
        assert!(block.flush().is_none());
        assert_eq!(block.upload_count(), 1);

        set.set(&shader, "uModelMatrix", UniformValue::Mat4(Matrix4::IDENTITY))
            .unwrap();
        let block = &mut set.staging_mut()[0];
        assert!(block.flush().is_some());
        assert_eq!(block.upload_count(), 2);
    }

    #[test]
    fn untouched_blocks_stay_clean() {
        let shader = shader();
        let mut set = UniformSet::new(&shader);
        set.set(&shader, "uColour", UniformValue::Colour(Colour::BLACK))
            .unwrap();

        assert!(set.staging_mut()[0].flush().is_none());
        assert!(set.staging_mut()[1].flush().is_some());
    }

    #[test]
    fn merge_lets_incoming_values_win() {
        let shader = shader();
        let mut set = UniformSet::new(&shader);
        set.set(&shader, "uShininess", UniformValue::Float(8.0))
            .unwrap();
        set.merge(
            &shader,
            &[
                ("uShininess".to_owned(), UniformValue::Float(64.0)),
                ("uLightColour".to_owned(), UniformValue::Vec3(Vector3::ONE)),
            ],
        )
        .unwrap();

        assert_eq!(set.get("uShininess"), Some(&UniformValue::Float(64.0)));
        assert_eq!(
            set.get("uLightColour"),
            Some(&UniformValue::Vec3(Vector3::ONE))
        );
    }
}
