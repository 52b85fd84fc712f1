//! The handful of matrix helpers glam doesn't provide in the exact shape the
//! renderer wants.

use glam::{Mat4, Vec3, Vec4};

/// Converts spherical coordinates to a cartesian offset. `theta` is the
/// elevation above the XZ plane and `phi` the azimuth, both in radians.
/// `phi = -90°` points down +Z.
pub fn spherical_to_cartesian(radius: f32, theta: f32, phi: f32) -> Vec3 {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vec3::new(
        radius * cos_theta * cos_phi,
        radius * sin_theta,
        -radius * cos_theta * sin_phi,
    )
}

/// Right-handed look-at view matrix.
pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(eye, target, up)
}

/// Right-handed perspective projection with reversed depth: the near plane
/// maps to 1 and the far plane to 0, so depth testing uses `GEQUAL` and the
/// depth buffer is cleared to 0.
pub fn perspective_reversed(fov_y: f32, aspect_ratio: f32, near: f32, far: f32) -> Mat4 {
    let y_scale = 1.0 / (fov_y * 0.5).tan();
    let x_scale = y_scale / aspect_ratio;
    let z_range = far - near;
    Mat4::from_cols(
        Vec4::new(x_scale, 0.0, 0.0, 0.0),
        Vec4::new(0.0, y_scale, 0.0, 0.0),
        Vec4::new(0.0, 0.0, near / z_range, -1.0),
        Vec4::new(0.0, 0.0, far * near / z_range, 0.0),
    )
}

/// The matrix normals are transformed with: the transpose of the inverse, so
/// that non-uniform scale doesn't skew them.
pub fn normal_matrix(model: Mat4) -> Mat4 {
    model.inverse().transpose()
}
