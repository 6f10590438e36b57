//! First-person camera

use glam::{Mat4, Vec3};

const CANONICAL_FORWARD: Vec3 = Vec3::new(0.0, 0.0, -1.0);
const CANONICAL_RIGHT: Vec3 = Vec3::X;
const CANONICAL_UP: Vec3 = Vec3::Y;

/// Bring an accumulated angle back by one turn if it left [-360, 360].
///
/// A single correction only: a jump of more than 720 degrees in one call is
/// left partially unwrapped.
#[inline]
fn wrap_degrees(mut degrees: f32) -> f32 {
    if degrees > 360.0 {
        degrees -= 360.0;
    }
    if degrees < -360.0 {
        degrees += 360.0;
    }
    degrees
}

/// Yaw/pitch camera that walks on the horizontal plane.
///
/// The basis vectors are always derived from `pitch_matrix * yaw_matrix`
/// applied to the canonical axes, never adjusted independently.
#[derive(Debug, Clone)]
pub struct Camera {
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    position: Vec3,
    yaw: f32,
    pitch: f32,
    yaw_matrix: Mat4,
    pitch_matrix: Mat4,
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        Self {
            forward: CANONICAL_FORWARD,
            right: CANONICAL_RIGHT,
            up: CANONICAL_UP,
            position,
            yaw: 0.0,
            pitch: 0.0,
            yaw_matrix: Mat4::IDENTITY,
            pitch_matrix: Mat4::IDENTITY,
        }
    }

    /// Rotate about the vertical axis.
    pub fn yaw(&mut self, degrees: f32) {
        self.yaw = wrap_degrees(self.yaw + degrees);
        self.yaw_matrix = Mat4::from_rotation_y(self.yaw.to_radians());

        let rotation = self.rotation();
        self.forward = rotation.transform_vector3(CANONICAL_FORWARD);
        self.right = rotation.transform_vector3(CANONICAL_RIGHT);
    }

    /// Rotate about the horizontal axis.
    pub fn pitch(&mut self, degrees: f32) {
        self.pitch = wrap_degrees(self.pitch + degrees);
        self.pitch_matrix = Mat4::from_rotation_x(self.pitch.to_radians());

        let rotation = self.rotation();
        self.forward = rotation.transform_vector3(CANONICAL_FORWARD);
        self.up = rotation.transform_vector3(CANONICAL_UP);
    }

    /// Move along the horizontal projection of the forward vector.
    pub fn walk(&mut self, amount: f32) {
        self.position.x += amount * self.forward.x;
        self.position.z += amount * self.forward.z;
    }

    /// Move along the horizontal projection of the right vector.
    pub fn strafe(&mut self, amount: f32) {
        self.position.x += amount * self.right.x;
        self.position.z += amount * self.right.z;
    }

    /// `pitch * yaw * translate(-position)`
    pub fn view_matrix(&self) -> Mat4 {
        self.rotation() * Mat4::from_translation(-self.position)
    }

    fn rotation(&self) -> Mat4 {
        self.pitch_matrix * self.yaw_matrix
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Accumulated yaw in degrees
    pub fn yaw_degrees(&self) -> f32 {
        self.yaw
    }

    /// Accumulated pitch in degrees
    pub fn pitch_degrees(&self) -> f32 {
        self.pitch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn assert_vec3_eq(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, EPS),
            "expected {expected:?}, got {actual:?}"
        );
    }

    #[test]
    fn test_initial_basis() {
        let camera = Camera::new(Vec3::new(0.0, 0.0, 20.0));
        assert_vec3_eq(camera.forward(), Vec3::new(0.0, 0.0, -1.0));
        assert_vec3_eq(camera.right(), Vec3::X);
        assert_vec3_eq(camera.up(), Vec3::Y);
        assert_eq!(
            camera.view_matrix(),
            Mat4::from_translation(Vec3::new(0.0, 0.0, -20.0))
        );
    }

    #[test]
    fn test_yaw_wraps_once() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.yaw(370.0);
        assert!((camera.yaw_degrees() - 10.0).abs() < EPS);

        let mut camera = Camera::new(Vec3::ZERO);
        camera.yaw(-370.0);
        assert!((camera.yaw_degrees() + 10.0).abs() < EPS);

        // Only one turn is removed per call.
        let mut camera = Camera::new(Vec3::ZERO);
        camera.yaw(800.0);
        assert!((camera.yaw_degrees() - 440.0).abs() < EPS);
    }

    #[test]
    fn test_pitch_wraps_once() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.pitch(200.0);
        camera.pitch(200.0);
        assert!((camera.pitch_degrees() - 40.0).abs() < EPS);
    }

    #[test]
    fn test_yaw_basis() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.yaw(90.0);
        assert_vec3_eq(camera.forward(), Vec3::new(-1.0, 0.0, 0.0));
        assert_vec3_eq(camera.right(), Vec3::new(0.0, 0.0, -1.0));
        assert_vec3_eq(camera.up(), Vec3::Y);
    }

    #[test]
    fn test_pitch_basis() {
        let mut camera = Camera::new(Vec3::ZERO);
        camera.pitch(90.0);
        assert_vec3_eq(camera.forward(), Vec3::new(0.0, 1.0, 0.0));
        assert_vec3_eq(camera.up(), Vec3::new(0.0, 0.0, 1.0));
        assert_vec3_eq(camera.right(), Vec3::X);
    }

    #[test]
    fn test_walk_and_strafe_stay_level() {
        for pitch in [-80.0, -30.0, 0.0, 45.0, 89.0, 300.0] {
            let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0));
            camera.yaw(33.0);
            camera.pitch(pitch);
            camera.walk(2.5);
            camera.strafe(-1.5);
            assert_eq!(camera.position().y, 2.0, "pitch {pitch}");
        }
    }

    #[test]
    fn test_walk_follows_forward() {
        let mut camera = Camera::new(Vec3::new(0.0, 0.0, 20.0));
        camera.walk(1.0);
        assert_vec3_eq(camera.position(), Vec3::new(0.0, 0.0, 19.0));
        camera.strafe(2.0);
        assert_vec3_eq(camera.position(), Vec3::new(2.0, 0.0, 19.0));
    }

    #[test]
    fn test_view_matrix_composition() {
        let mut camera = Camera::new(Vec3::new(1.0, 2.0, 3.0));
        camera.yaw(45.0);
        camera.pitch(30.0);
        let expected = Mat4::from_rotation_x(30f32.to_radians())
            * Mat4::from_rotation_y(45f32.to_radians())
            * Mat4::from_translation(Vec3::new(-1.0, -2.0, -3.0));
        assert!(camera.view_matrix().abs_diff_eq(expected, EPS));
    }
}
