use glam::{Mat4, Vec3};

use crate::math;

/// A camera on a sphere around `target`. Angles are in degrees: `theta` is
/// the elevation, `phi` the azimuth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub distance: f32,
    pub theta: f32,
    pub phi: f32,
    pub target: Vec3,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        OrbitCamera {
            distance: 3.0,
            theta: 0.0,
            phi: -90.0,
            target: Vec3::ZERO,
        }
    }
}

impl OrbitCamera {
    pub fn eye(&self) -> Vec3 {
        let offset = math::spherical_to_cartesian(
            self.distance,
            self.theta.to_radians(),
            self.phi.to_radians(),
        );
        self.target + offset
    }

    pub fn view_matrix(&self) -> Mat4 {
        camera_view_matrix(self.distance, self.theta, self.phi, self.target)
    }

    /// Advances the azimuth by `degrees_per_second * dt`, keeping it in
    /// `[-180, 180)` so long runs don't lose precision.
    pub fn orbit(&mut self, degrees_per_second: f32, dt: f32) {
        let phi = self.phi + degrees_per_second * dt;
        self.phi = (phi + 180.0).rem_euclid(360.0) - 180.0;
    }
}

/// View matrix of a camera at the given spherical coordinates (degrees)
/// around `target`, looking at it with +Y up.
pub fn camera_view_matrix(distance: f32, theta: f32, phi: f32, target: Vec3) -> Mat4 {
    let eye = target
        + math::spherical_to_cartesian(distance, theta.to_radians(), phi.to_radians());
    math::look_at(eye, target, Vec3::Y)
}
