//! A free-fly camera with exponentially smoothed motion.
//!
//! The camera keeps two poses: the target pose that input mutates directly,
//! and the current pose that eases toward it every update. The easing factor
//! is `1 - e^(-rate * dt)`, so convergence speed is independent of frame
//! rate and the camera never overshoots.

use std::f32::consts::FRAC_PI_2;

use crate::math::{Matrix4, Vector3};

const ROTATION_RATE: f32 = 8.0;
const MOVEMENT_RATE: f32 = 10.0;

const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 100.0;

/// Smoothed first-person camera.
///
/// Orientation is stored as Euler angles with `x` the yaw about the world
/// up axis and `y` the pitch; pitch is clamped to straight up/down so the
/// view cannot flip over.
pub struct Camera {
    position: Vector3,
    orientation: Vector3,
    target_position: Vector3,
    target_orientation: Vector3,
    fov: f32,
    aspect: f32,
}

impl Camera {
    /// A camera at the origin looking down -z. `fov` is the vertical field
    /// of view in radians.
    pub fn new(fov: f32, aspect: f32) -> Self {
        Self {
            position: Vector3::ZERO,
            orientation: Vector3::ZERO,
            target_position: Vector3::ZERO,
            target_orientation: Vector3::ZERO,
            fov,
            aspect,
        }
    }

    /// Moves the camera without smoothing, e.g. when placing it at scene
    /// start.
    pub fn teleport(&mut self, position: Vector3) {
        self.position = position;
        self.target_position = position;
    }

    /// Sets yaw/pitch without smoothing.
    pub fn set_orientation(&mut self, orientation: Vector3) {
        self.orientation = orientation;
        self.target_orientation = orientation;
    }

    /// Shifts current and target position together, preserving any easing
    /// already in flight.
    pub fn translate(&mut self, delta: Vector3) {
        self.position += delta;
        self.target_position += delta;
    }

    /// Call when the surface resizes.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Turns the view by the given yaw and pitch deltas, in radians.
    /// Positive deltas follow mouse motion: right and down.
    pub fn turn(&mut self, yaw: f32, pitch: f32) {
        self.target_orientation.x -= yaw;
        self.target_orientation.y -= pitch;
    }

    /// Moves the target pose in view space: `forward` along the look
    /// direction, `strafe` to the right. Both may be negative.
    pub fn move_by(&mut self, forward: f32, strafe: f32) {
        let direction = direction_of(self.target_orientation);
        let right = Vector3::new(-direction.z, 0.0, direction.x);
        self.target_position += direction * forward + right * strafe;
    }

    /// Eases the current pose toward the target pose.
    pub fn update(&mut self, dt: f32) {
        self.target_orientation.y = self.target_orientation.y.clamp(-FRAC_PI_2, FRAC_PI_2);

        let rotation_t = 1.0 - (-ROTATION_RATE * dt).exp();
        let movement_t = 1.0 - (-MOVEMENT_RATE * dt).exp();
        self.orientation = self.orientation.lerp(self.target_orientation, rotation_t);
        self.position = self.position.lerp(self.target_position, movement_t);
    }

    pub fn position(&self) -> Vector3 {
        self.position
    }

    /// The smoothed unit look direction.
    pub fn direction(&self) -> Vector3 {
        direction_of(self.orientation)
    }

    pub fn view_matrix(&self) -> Matrix4 {
        Matrix4::look_at(
            self.position,
            self.position + self.direction(),
            Vector3::new(0.0, 1.0, 0.0),
        )
    }

    pub fn projection_matrix(&self) -> Matrix4 {
        Matrix4::perspective(self.fov, self.aspect, NEAR_PLANE, FAR_PLANE)
    }
}

fn direction_of(orientation: Vector3) -> Vector3 {
    let (yaw, pitch) = (orientation.x, orientation.y);
    Vector3::new(
        -yaw.sin() * pitch.cos(),
        pitch.sin(),
        -yaw.cos() * pitch.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn settled(camera: &mut Camera) {
        for _ in 0..600 {
            camera.update(1.0 / 60.0);
        }
    }

    #[test]
    fn rest_pose_looks_down_negative_z() {
        let camera = Camera::new(FRAC_PI_2, 16.0 / 9.0);
        let d = camera.direction();
        assert!((d - Vector3::new(0.0, 0.0, -1.0)).magnitude() < 1e-6);
    }

    #[test]
    fn direction_stays_unit_length() {
        let mut camera = Camera::new(FRAC_PI_2, 1.0);
        camera.turn(0.7, -0.3);
        for _ in 0..20 {
            camera.update(0.016);
            assert!((camera.direction().magnitude() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn pitch_clamps_at_straight_up_and_down() {
        let mut camera = Camera::new(FRAC_PI_2, 1.0);
        camera.turn(0.0, -10.0 * PI);
        settled(&mut camera);
        assert!(camera.direction().y <= 1.0);
        assert!((camera.direction().y - 1.0).abs() < 1e-3);

        camera.turn(0.0, 20.0 * PI);
        settled(&mut camera);
        assert!((camera.direction().y + 1.0).abs() < 1e-3);
    }

    #[test]
    fn smoothing_converges_monotonically() {
        let mut camera = Camera::new(FRAC_PI_2, 1.0);
        camera.move_by(0.0, 5.0);

        let target = Vector3::new(5.0, 0.0, 0.0);
        let mut last_distance = f32::INFINITY;
        for _ in 0..120 {
            camera.update(0.016);
            let distance = (camera.position() - target).magnitude();
            assert!(distance <= last_distance);
            last_distance = distance;
        }
        assert!(last_distance < 1e-3);
    }

    #[test]
    fn movement_follows_the_view_direction() {
        let mut camera = Camera::new(FRAC_PI_2, 1.0);
        camera.move_by(2.0, 0.0);
        settled(&mut camera);
        assert!((camera.position() - Vector3::new(0.0, 0.0, -2.0)).magnitude() < 1e-3);

        // Quarter turn left, then forward: now travelling along -x.
        let mut camera = Camera::new(FRAC_PI_2, 1.0);
        camera.turn(-FRAC_PI_2, 0.0);
        settled(&mut camera);
        camera.move_by(3.0, 0.0);
        settled(&mut camera);
        assert!((camera.position() - Vector3::new(-3.0, 0.0, 0.0)).magnitude() < 1e-2);
    }

    #[test]
    fn view_matrix_sends_the_eye_to_the_origin() {
        let mut camera = Camera::new(FRAC_PI_2, 1.0);
        camera.teleport(Vector3::new(1.0, 2.0, 3.0));
        camera.turn(0.4, 0.2);
        settled(&mut camera);

        let eye = camera.view_matrix().transform_point(camera.position());
        assert!(eye.magnitude() < 1e-4);
    }
}
