//! Demo scene: a spinning stack of crates on a checkered floor, lit by an
//! orbiting point light, with a free-fly camera.
//!
//! Controls: WASD to move, left shift to sprint, hold the right mouse
//! button and drag to look around.

use std::sync::Arc;

use phalanx::{
    AppConfig, Application, Camera, Colour, GpuContext, Input, KeyCode, Matrix4, MouseButton,
    RenderError, Renderer, SceneNode, Shader, Texture, UniformBundles, Vector3, mesh, run,
};

const MOVE_SPEED: f32 = 6.0;
const SPRINT_FACTOR: f32 = 2.5;
const TURN_SPEED: f32 = 0.004;

const LIGHT_COLOUR: Vector3 = Vector3 {
    x: 1.0,
    y: 0.96,
    z: 0.86,
};

struct SceneState {
    crates: SceneNode,
    ground: SceneNode,
    light: SceneNode,
}

struct CrateYard {
    camera: Camera,
    state: Option<SceneState>,
    light_angle: f32,
}

impl CrateYard {
    fn new() -> Self {
        Self {
            camera: Camera::new(60f32.to_radians(), 16.0 / 9.0),
            state: None,
            light_angle: 0.0,
        }
    }
}

fn light_position(angle: f32) -> Vector3 {
    Vector3::new(3.0 * angle.cos(), 2.5, 3.0 * angle.sin())
}

impl Application for CrateYard {
    fn initialise(&mut self, gpu: &GpuContext, renderer: &mut Renderer) -> Result<(), RenderError> {
        let lighting = Arc::new(Shader::compile_and_link(
            "lighting",
            include_str!("shaders/lighting.vert.wgsl"),
            include_str!("shaders/lighting.frag.wgsl"),
        )?);
        let flat = Arc::new(Shader::compile_and_link(
            "flat",
            include_str!("shaders/flat.vert.wgsl"),
            include_str!("shaders/flat.frag.wgsl"),
        )?);

        let crate_texture = Arc::new(Texture::wooden_crate(gpu, 64, 7));
        let floor_texture = Arc::new(Texture::checkerboard(
            gpu,
            64,
            8,
            [200, 200, 200],
            [90, 90, 90],
        ));

        let crate_mesh = Arc::new(mesh::textured_cube(gpu, lighting.clone(), crate_texture)?);
        let floor_mesh = Arc::new(mesh::plane(gpu, lighting.clone(), floor_texture)?);
        let light_mesh = Arc::new(mesh::flat_cube(gpu, flat)?);

        // A big crate with a small one on each side, spinning as a unit.
        let mut crates = SceneNode::with_mesh(crate_mesh.clone());
        crates.pose.position = Vector3::new(0.0, 0.5, 0.0);
        for side in [-1.5, 1.5] {
            let child = crates.add_child(SceneNode::with_mesh(crate_mesh.clone()));
            child.pose.position = Vector3::new(side, -0.25, 0.0);
            child.pose.scale = Vector3::splat(0.5);
        }

        let mut ground = SceneNode::with_mesh(floor_mesh);
        ground.pose.scale = Vector3::new(12.0, 1.0, 12.0);

        let mut light = SceneNode::with_mesh(light_mesh);
        light.pose.scale = Vector3::splat(0.25);
        light.set_uniform("uColour", Colour::rgb(LIGHT_COLOUR.x, LIGHT_COLOUR.y, LIGHT_COLOUR.z))?;

        self.camera.set_aspect(gpu.aspect());
        self.camera.teleport(Vector3::new(0.0, 1.5, 5.0));
        renderer.set_clear_colour(Colour::rgb(0.05, 0.07, 0.10));

        self.state = Some(SceneState {
            crates,
            ground,
            light,
        });
        Ok(())
    }

    fn update(&mut self, dt: f32, input: &Input) -> Result<(), RenderError> {
        let mut forward = 0.0;
        let mut strafe = 0.0;
        if input.key_down(KeyCode::KeyW) {
            forward += 1.0;
        }
        if input.key_down(KeyCode::KeyS) {
            forward -= 1.0;
        }
        if input.key_down(KeyCode::KeyD) {
            strafe += 1.0;
        }
        if input.key_down(KeyCode::KeyA) {
            strafe -= 1.0;
        }
        let mut speed = MOVE_SPEED;
        if input.key_down(KeyCode::ShiftLeft) {
            speed *= SPRINT_FACTOR;
        }
        self.camera
            .move_by(forward * speed * dt, strafe * speed * dt);

        if input.button_down(MouseButton::Right) {
            let delta = input.mouse_delta();
            self.camera.turn(delta.x * TURN_SPEED, delta.y * TURN_SPEED);
        }
        self.camera.update(dt);

        self.light_angle += 0.6 * dt;
        let light_position = light_position(self.light_angle);

        let mut bundles = UniformBundles::new();
        for shader in ["lighting", "flat"] {
            bundles.set(shader, "uViewMatrix", self.camera.view_matrix());
            bundles.set(shader, "uProjectionMatrix", self.camera.projection_matrix());
        }
        bundles.set("lighting", "uEyePosition", self.camera.position());
        bundles.set("lighting", "uLightPosition", light_position);
        bundles.set("lighting", "uLightColour", LIGHT_COLOUR);

        let state = self.state.as_mut().ok_or(RenderError::NotInitialised)?;
        state.light.pose.position = light_position;
        state.crates.pose.orientation.y += 0.4 * dt;

        let root = Matrix4::IDENTITY;
        state.crates.update(dt, &root, &bundles)?;
        state.ground.update(dt, &root, &bundles)?;
        state.light.update(dt, &root, &bundles)?;
        Ok(())
    }

    fn draw(&mut self, gpu: &GpuContext, renderer: &mut Renderer) -> Result<(), RenderError> {
        let state = self.state.as_mut().ok_or(RenderError::NotInitialised)?;

        let Some(mut frame) = renderer.begin_frame(gpu)? else {
            return Ok(());
        };
        renderer.draw(gpu, &mut frame, &mut state.crates);
        renderer.draw(gpu, &mut frame, &mut state.ground);
        renderer.draw(gpu, &mut frame, &mut state.light);
        renderer.end_frame(gpu, frame);
        Ok(())
    }

    fn resized(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width as f32 / height as f32);
    }
}

fn main() {
    env_logger::init();
    run(
        AppConfig::new("phalanx crate yard").size(1280, 720),
        CrateYard::new(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_orbit_keeps_radius_and_height() {
        for step in 0..32 {
            let p = light_position(step as f32 * 0.2);
            assert!((p.y - 2.5).abs() < 1e-6);
            let radius = (p.x * p.x + p.z * p.z).sqrt();
            assert!((radius - 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn update_before_initialise_reports_not_initialised() {
        let mut app = CrateYard::new();
        let err = app.update(0.016, &Input::new()).unwrap_err();
        assert!(matches!(err, RenderError::NotInitialised));
    }
}
