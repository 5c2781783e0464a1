//! The scene graph: transformable nodes, drawables and uniform broadcast.
//!
//! A [`SceneNode`] composes a [`Transformable`] pose with a cached world
//! transform, child nodes and an optional [`Drawable`]. Updating the root
//! once per frame rebuilds every local matrix, propagates world transforms
//! down the tree and merges broadcast uniforms into each drawable that
//! matches by shader name. There is no parent pointer; the recursion hands
//! each child its parent's world transform.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::RenderError;
use crate::gpu::GpuContext;
use crate::math::{Matrix4, Vector3};
use crate::mesh::Mesh;
use crate::renderer::BindState;
use crate::shader::UNIFORM_GROUP;
use crate::uniform::{UniformSet, UniformValue};

/// Position, Euler orientation (radians) and per-axis scale.
///
/// The local matrix applies scale first, then rotation about z, x and y in
/// that order, then translation.
#[derive(Clone, Copy, Debug)]
pub struct Transformable {
    pub position: Vector3,
    pub orientation: Vector3,
    pub scale: Vector3,
}

impl Default for Transformable {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            orientation: Vector3::ZERO,
            scale: Vector3::ONE,
        }
    }
}

impl Transformable {
    pub fn local_matrix(&self) -> Matrix4 {
        let mut m = Matrix4::translation(self.position);
        m.rotate(self.orientation.y, Vector3::new(0.0, 1.0, 0.0))
            .rotate(self.orientation.x, Vector3::new(1.0, 0.0, 0.0))
            .rotate(self.orientation.z, Vector3::new(0.0, 0.0, 1.0))
            .scale(self.scale);
        m
    }
}

/// Per-frame uniform assignments broadcast to drawables, keyed by shader
/// name.
///
/// The frame loop fills one of these with the camera matrices and lighting
/// for each shader in use, and the tree update routes each bundle to the
/// nodes whose mesh uses that shader.
#[derive(Debug, Default)]
pub struct UniformBundles {
    bundles: HashMap<String, Vec<(String, UniformValue)>>,
}

impl UniformBundles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, shader_name: &str, uniform: &str, value: impl Into<UniformValue>) {
        self.bundles
            .entry(shader_name.to_owned())
            .or_default()
            .push((uniform.to_owned(), value.into()));
    }

    pub fn get(&self, shader_name: &str) -> Option<&[(String, UniformValue)]> {
        self.bundles.get(shader_name).map(Vec::as_slice)
    }

    pub fn clear(&mut self) {
        self.bundles.clear();
    }
}

struct NodeGpu {
    buffers: Vec<wgpu::Buffer>,
    bind_group: wgpu::BindGroup,
}

impl NodeGpu {
    fn new(gpu: &GpuContext, mesh: &Mesh, uniforms: &UniformSet) -> Self {
        let shader = mesh.shader();
        let buffers: Vec<wgpu::Buffer> = shader
            .blocks()
            .iter()
            .zip(uniforms.staging())
            .map(|(block, staging)| {
                gpu.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(&format!("{} block {}", shader.name(), block.binding)),
                    size: staging.bytes().len() as u64,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                })
            })
            .collect();

        let entries: Vec<wgpu::BindGroupEntry> = shader
            .blocks()
            .iter()
            .zip(&buffers)
            .map(|(block, buffer)| wgpu::BindGroupEntry {
                binding: block.binding,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} node uniforms", shader.name())),
            layout: &shader.gpu(&gpu.device).uniform_layout,
            entries: &entries,
        });

        Self {
            buffers,
            bind_group,
        }
    }
}

/// A mesh instance with its own uniform values.
///
/// The mesh is shared; the uniform set and the GPU buffers backing it are
/// private to this drawable, so two nodes drawing the same mesh can carry
/// different transforms and colours.
pub struct Drawable {
    mesh: Arc<Mesh>,
    uniforms: UniformSet,
    gpu: Option<NodeGpu>,
}

impl Drawable {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        let uniforms = UniformSet::new(mesh.shader());
        Self {
            mesh,
            uniforms,
            gpu: None,
        }
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn uniforms(&self) -> &UniformSet {
        &self.uniforms
    }

    /// Assigns a uniform by name, failing fast on unknown names or
    /// mismatched types.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError> {
        let shader = self.mesh.shader().clone();
        self.uniforms.set(&shader, name, value)
    }

    fn merge_uniforms(&mut self, incoming: &[(String, UniformValue)]) -> Result<(), RenderError> {
        let shader = self.mesh.shader().clone();
        self.uniforms.merge(&shader, incoming)
    }

    fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        state: &mut BindState,
    ) {
        let node_gpu = self
            .gpu
            .get_or_insert_with(|| NodeGpu::new(gpu, &self.mesh, &self.uniforms));

        for (staging, buffer) in self.uniforms.staging_mut().iter_mut().zip(&node_gpu.buffers) {
            if let Some(bytes) = staging.flush() {
                gpu.queue.write_buffer(buffer, 0, bytes);
            }
        }

        self.mesh.bind(pass, state);
        pass.set_bind_group(UNIFORM_GROUP, &node_gpu.bind_group, &[]);
        self.mesh.draw_indexed(pass);
    }
}

/// One node of the scene graph.
pub struct SceneNode {
    /// Local pose, mutated freely between frames.
    pub pose: Transformable,
    /// World transform as of the last update.
    pub transform: Matrix4,
    pub children: Vec<SceneNode>,
    drawable: Option<Drawable>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self::group()
    }
}

impl SceneNode {
    /// An empty node that only groups children under a shared transform.
    pub fn group() -> Self {
        Self {
            pose: Transformable::default(),
            transform: Matrix4::IDENTITY,
            children: Vec::new(),
            drawable: None,
        }
    }

    /// A node that draws `mesh`.
    pub fn with_mesh(mesh: Arc<Mesh>) -> Self {
        Self {
            drawable: Some(Drawable::new(mesh)),
            ..Self::group()
        }
    }

    /// Appends a child and returns a handle to it for further setup.
    pub fn add_child(&mut self, child: SceneNode) -> &mut SceneNode {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn drawable(&self) -> Option<&Drawable> {
        self.drawable.as_ref()
    }

    pub fn drawable_mut(&mut self) -> Option<&mut Drawable> {
        self.drawable.as_mut()
    }

    /// Assigns a uniform on this node's drawable.
    ///
    /// Group nodes have no uniforms; calling this on one reports the name
    /// as unknown.
    pub fn set_uniform(
        &mut self,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), RenderError> {
        match &mut self.drawable {
            Some(drawable) => drawable.set_uniform(name, value.into()),
            None => Err(RenderError::UnknownLocation(name.to_owned())),
        }
    }

    /// Rebuilds this node's world transform from `parent` and recurses into
    /// the children.
    ///
    /// Drawables first merge any broadcast bundle whose key matches their
    /// shader's name (incoming values win), then receive their own world
    /// transform as `uModelMatrix`.
    pub fn update(
        &mut self,
        dt: f32,
        parent: &Matrix4,
        broadcast: &UniformBundles,
    ) -> Result<(), RenderError> {
        let local = self.pose.local_matrix();
        self.transform = *parent;
        self.transform.multiply(&local);

        if let Some(drawable) = &mut self.drawable {
            if let Some(bundle) = broadcast.get(drawable.mesh.shader().name()) {
                drawable.merge_uniforms(bundle)?;
            }
            drawable.set_uniform("uModelMatrix", UniformValue::Mat4(self.transform))?;
        }

        for child in &mut self.children {
            child.update(dt, &self.transform, broadcast)?;
        }
        Ok(())
    }

    /// Draws this node's drawable, then the children, depth first.
    pub(crate) fn draw(
        &mut self,
        gpu: &GpuContext,
        pass: &mut wgpu::RenderPass<'_>,
        state: &mut BindState,
    ) {
        if let Some(drawable) = &mut self.drawable {
            drawable.draw(gpu, pass, state);
        }
        for child in &mut self.children {
            child.draw(gpu, pass, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Vector3, b: Vector3) {
        assert!(
            (a - b).magnitude() < 1e-5,
            "expected {b:?}, got {a:?}"
        );
    }

    #[test]
    fn world_transform_is_parent_times_local() {
        let mut root = SceneNode::group();
        root.pose.position = Vector3::new(10.0, 0.0, 0.0);
        let child = root.add_child(SceneNode::group());
        child.pose.position = Vector3::new(0.0, 2.0, 0.0);

        root.update(0.016, &Matrix4::IDENTITY, &UniformBundles::new())
            .unwrap();

        let child_origin = root.children[0].transform.transform_point(Vector3::ZERO);
        assert_close(child_origin, Vector3::new(10.0, 2.0, 0.0));
    }

    #[test]
    fn moving_the_parent_carries_both_children() {
        let mut parent = SceneNode::group();
        parent.pose.position = Vector3::new(-5.0, 0.0, 0.0);
        parent.add_child(SceneNode::group()).pose.position = Vector3::new(1.5, 0.0, 0.0);
        parent.add_child(SceneNode::group()).pose.position = Vector3::new(-1.5, 0.0, 0.0);

        let bundles = UniformBundles::new();
        parent.update(0.016, &Matrix4::IDENTITY, &bundles).unwrap();
        let before: Vec<Vector3> = parent
            .children
            .iter()
            .map(|c| c.transform.transform_point(Vector3::ZERO))
            .collect();

        parent.pose.position.y += 3.0;
        parent.update(0.016, &Matrix4::IDENTITY, &bundles).unwrap();

        for (child, old) in parent.children.iter().zip(before) {
            let now = child.transform.transform_point(Vector3::ZERO);
            assert_close(now, old + Vector3::new(0.0, 3.0, 0.0));
        }
    }

    #[test]
    fn grandchildren_compose_the_whole_chain() {
        let mut root = SceneNode::group();
        root.pose.position = Vector3::new(1.0, 0.0, 0.0);
        let child = root.add_child(SceneNode::group());
        child.pose.position = Vector3::new(0.0, 1.0, 0.0);
        let grandchild = child.add_child(SceneNode::group());
        grandchild.pose.position = Vector3::new(0.0, 0.0, 1.0);

        root.update(0.016, &Matrix4::IDENTITY, &UniformBundles::new())
            .unwrap();

        let origin = root.children[0].children[0]
            .transform
            .transform_point(Vector3::ZERO);
        assert_close(origin, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn parent_rotation_orbits_the_child() {
        use std::f32::consts::FRAC_PI_2;

        let mut parent = SceneNode::group();
        let child = parent.add_child(SceneNode::group());
        child.pose.position = Vector3::new(2.0, 0.0, 0.0);

        parent.pose.orientation.y = FRAC_PI_2;
        parent
            .update(0.016, &Matrix4::IDENTITY, &UniformBundles::new())
            .unwrap();

        // A quarter turn about +y maps +x onto -z.
        let origin = parent.children[0].transform.transform_point(Vector3::ZERO);
        assert_close(origin, Vector3::new(0.0, 0.0, -2.0));
    }

    #[test]
    fn scale_applies_before_translation() {
        let mut node = SceneNode::group();
        node.pose.position = Vector3::new(0.0, 5.0, 0.0);
        node.pose.scale = Vector3::splat(10.0);
        node.update(0.016, &Matrix4::IDENTITY, &UniformBundles::new())
            .unwrap();

        let corner = node.transform.transform_point(Vector3::new(0.5, 0.0, 0.5));
        assert_close(corner, Vector3::new(5.0, 5.0, 5.0));
    }

    #[test]
    fn bundles_group_by_shader_name() {
        let mut bundles = UniformBundles::new();
        bundles.set("lighting", "uShininess", 32.0f32);
        bundles.set("lighting", "uLightColour", Vector3::ONE);
        bundles.set("flat", "uShininess", 8.0f32);

        assert_eq!(bundles.get("lighting").map(<[_]>::len), Some(2));
        assert_eq!(bundles.get("flat").map(<[_]>::len), Some(1));
        assert!(bundles.get("unused").is_none());

        bundles.clear();
        assert!(bundles.get("lighting").is_none());
    }

    #[test]
    fn group_nodes_reject_uniform_assignment() {
        let mut node = SceneNode::group();
        let err = node.set_uniform("uColour", 1.0f32).unwrap_err();
        assert!(matches!(err, RenderError::UnknownLocation(_)));
    }
}
