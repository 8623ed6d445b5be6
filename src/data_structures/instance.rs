//! Placement of a scene object.
//!
//! A [`SceneObject`] is only a transform: the mesh and material it is drawn
//! with are chosen by the renderer from its [`Prop`](super::scene::Prop).

use cgmath::{Deg, Euler, Matrix4, Vector3};

/// Position and Euler angles (degrees) of one object in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneObject {
    pub position: Vector3<f32>,
    pub eulers: Vector3<f32>,
}

impl SceneObject {
    pub fn new(position: impl Into<Vector3<f32>>, eulers: impl Into<Vector3<f32>>) -> Self {
        Self {
            position: position.into(),
            eulers: eulers.into(),
        }
    }

    /// Rotation about the origin first, then translation.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        let rotation = Matrix4::from(Euler {
            x: Deg(self.eulers.x),
            y: Deg(self.eulers.y),
            z: Deg(self.eulers.z),
        });
        Matrix4::from_translation(self.position) * rotation
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }
}

impl From<Vector3<f32>> for SceneObject {
    fn from(position: Vector3<f32>) -> Self {
        Self {
            position,
            eulers: Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

impl Default for SceneObject {
    fn default() -> Self {
        Vector3::new(0.0, 0.0, 0.0).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::{Point3, SquareMatrix, Transform};

    #[test]
    fn unrotated_object_is_pure_translation() {
        let object = SceneObject::new([1.0, 2.0, 3.0], [0.0, 0.0, 0.0]);
        let model = object.to_matrix();
        assert_abs_diff_eq!(
            model,
            Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0)),
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            model.transform_point(Point3::new(0.0, 0.0, 0.0)),
            Point3::new(1.0, 2.0, 3.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn rotation_is_applied_before_translation() {
        let object = SceneObject::new([5.0, 0.0, 0.0], [0.0, 0.0, 90.0]);
        let moved = object.to_matrix().transform_point(Point3::new(1.0, 0.0, 0.0));
        // (1,0,0) turns to (0,1,0) about the origin, then moves by +5 in x
        assert_abs_diff_eq!(moved, Point3::new(5.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn default_is_identity() {
        assert_abs_diff_eq!(
            SceneObject::default().to_matrix(),
            Matrix4::identity(),
            epsilon = 1e-6
        );
    }
}
