//! First-person camera and projections.
//!
//! The world is Z-up. A [`Player`] looks along the direction given by its yaw
//! (`theta`, around +Z) and pitch (`phi`, towards +Z). Its basis is rebuilt
//! every time either angle changes, so readers always see an orthonormal
//! frame.
//!
//! # Key types
//!
//! - [`Player`] holds the camera position, angles and basis
//! - [`Projection`] is the perspective used by the forward pass

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Vector3, perspective};

/// Converts OpenGL clip space (z in -1..1) to wgpu clip space (z in 0..1).
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub const PITCH_LIMIT: f32 = 89.0;
const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 0.0, 1.0);

#[derive(Clone, Debug)]
pub struct Player {
    pub position: Vector3<f32>,
    theta: f32,
    phi: f32,
    forwards: Vector3<f32>,
    right: Vector3<f32>,
    up: Vector3<f32>,
}

impl Player {
    pub fn new(position: impl Into<Vector3<f32>>) -> Self {
        let mut player = Self {
            position: position.into(),
            theta: 0.0,
            phi: 0.0,
            forwards: Vector3::unit_x(),
            right: -Vector3::unit_y(),
            up: WORLD_UP,
        };
        player.update_vectors();
        player
    }

    /// Yaw in degrees, always in `[0, 360)`.
    pub fn theta(&self) -> f32 {
        self.theta
    }

    /// Pitch in degrees, always in `[-89, 89]`.
    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn forwards(&self) -> Vector3<f32> {
        self.forwards
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn spin(&mut self, d_theta: f32, d_phi: f32) {
        self.theta = (self.theta + d_theta).rem_euclid(360.0);
        // rem_euclid can round up to exactly 360 for tiny negative inputs
        if self.theta >= 360.0 {
            self.theta = 0.0;
        }
        self.phi = (self.phi + d_phi).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.update_vectors();
    }

    pub fn move_by(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::new(self.position.x, self.position.y, self.position.z);
        Matrix4::look_at_rh(eye, eye + self.forwards, self.up)
    }

    fn update_vectors(&mut self) {
        let (sin_theta, cos_theta) = self.theta.to_radians().sin_cos();
        let (sin_phi, cos_phi) = self.phi.to_radians().sin_cos();
        self.forwards = Vector3::new(cos_theta * cos_phi, sin_theta * cos_phi, sin_phi);
        // pitch is clamped short of the poles, so this cross product never vanishes
        self.right = self.forwards.cross(WORLD_UP).normalize();
        self.up = self.right.cross(self.forwards).normalize();
    }
}

/// Perspective projection of the forward pass.
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Deg<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, fovy: Deg<f32>, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy,
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}
