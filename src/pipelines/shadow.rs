//! Omnidirectional shadow pass.
//!
//! The light's surroundings are rendered into the six faces of a colour
//! cubemap. Instead of hardware depth, every face stores
//! `length(fragment - light) / far_plane`, which the forward pass reads back
//! by sampling the cube with the light-to-fragment direction.
//!
//! # Key types
//!
//! - [`CubeFace`]: the six axis directions with their up vectors
//! - [`ShadowCamera`]: projection and per-face view-projections for one light

use cgmath::{Deg, Matrix4, Point3, Vector3, perspective};

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    data_structures::{
        model::{ModelVertex, Vertex},
        texture::{DepthTexture, ShadowCubemap},
    },
    error::RenderError,
    pipelines::{
        ShaderPair,
        basic::mk_render_pipeline,
        light::{FaceUniform, ShadowUniform, uniform_entry},
    },
};

/// Faces in cubemap layer order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Array layer of this face in the cubemap texture.
    pub fn layer(self) -> u32 {
        self as u32
    }

    pub fn direction(self) -> Vector3<f32> {
        match self {
            CubeFace::PositiveX => Vector3::new(1.0, 0.0, 0.0),
            CubeFace::NegativeX => Vector3::new(-1.0, 0.0, 0.0),
            CubeFace::PositiveY => Vector3::new(0.0, 1.0, 0.0),
            CubeFace::NegativeY => Vector3::new(0.0, -1.0, 0.0),
            CubeFace::PositiveZ => Vector3::new(0.0, 0.0, 1.0),
            CubeFace::NegativeZ => Vector3::new(0.0, 0.0, -1.0),
        }
    }

    /// Up vectors of the standard cubemap face orientation.
    pub fn up(self) -> Vector3<f32> {
        match self {
            CubeFace::PositiveX | CubeFace::NegativeX => Vector3::new(0.0, -1.0, 0.0),
            CubeFace::PositiveY => Vector3::new(0.0, 0.0, 1.0),
            CubeFace::NegativeY => Vector3::new(0.0, 0.0, -1.0),
            CubeFace::PositiveZ | CubeFace::NegativeZ => Vector3::new(0.0, -1.0, 0.0),
        }
    }

    pub fn target(self, light: Vector3<f32>) -> Point3<f32> {
        let target = light + self.direction();
        Point3::new(target.x, target.y, target.z)
    }

    pub fn view(self, light: Vector3<f32>) -> Matrix4<f32> {
        let eye = Point3::new(light.x, light.y, light.z);
        Matrix4::look_at_rh(eye, self.target(light), self.up())
    }
}

/// Square 90 degree projection for one cube face.
///
/// The Y axis is flipped so that texel rows of each rendered face line up
/// with how cube sampling addresses them.
pub fn shadow_projection(near: f32, far: f32) -> Matrix4<f32> {
    let flip_y = Matrix4::from_nonuniform_scale(1.0, -1.0, 1.0);
    flip_y * OPENGL_TO_WGPU_MATRIX * perspective(Deg(90.0), 1.0, near, far)
}

#[derive(Clone, Copy, Debug)]
pub struct ShadowCamera {
    pub light_position: Vector3<f32>,
    pub near: f32,
    pub far: f32,
}

impl ShadowCamera {
    pub fn new(light_position: Vector3<f32>, near: f32, far: f32) -> Self {
        Self {
            light_position,
            near,
            far,
        }
    }

    pub fn face_matrices(&self) -> [Matrix4<f32>; 6] {
        let projection = shadow_projection(self.near, self.far);
        CubeFace::ALL.map(|face| projection * face.view(self.light_position))
    }

    pub fn uniform(&self) -> ShadowUniform {
        ShadowUniform {
            face_matrices: self.face_matrices().map(Into::into),
            light_position: self.light_position.into(),
            far_plane: self.far,
        }
    }

    pub fn face_uniforms() -> [FaceUniform; 6] {
        CubeFace::ALL.map(|face| FaceUniform {
            index: face.layer(),
            _padding: [0; 3],
        })
    }
}

/// Checks that the adapter can render into and sample from the cubemap
/// format. This is the only way the shadow target can be incomplete.
pub fn check_target_complete(adapter: &wgpu::Adapter) -> Result<(), RenderError> {
    let features = adapter.get_texture_format_features(ShadowCubemap::FORMAT);
    let needed = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
    if !features.allowed_usages.contains(needed) {
        return Err(RenderError::IncompleteShadowTarget(format!(
            "{:?} supports only {:?}",
            ShadowCubemap::FORMAT,
            features.allowed_usages
        )));
    }
    let depth = adapter.get_texture_format_features(DepthTexture::FORMAT);
    if !depth
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT)
    {
        return Err(RenderError::IncompleteShadowTarget(format!(
            "{:?} cannot be a depth attachment",
            DepthTexture::FORMAT
        )));
    }
    Ok(())
}

/// Frame slot of the shadow program: all face matrices plus the face selector.
pub fn shadow_frame_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                None,
            ),
            uniform_entry(
                1,
                wgpu::ShaderStages::VERTEX,
                Some(std::mem::size_of::<FaceUniform>() as u64),
            ),
        ],
        label: Some("shadow_frame_bind_group_layout"),
    })
}

pub fn shadow_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniform: &wgpu::Buffer,
    faces: wgpu::BindingResource<'_>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: faces,
            },
        ],
        label: Some("shadow_frame_bind_group"),
    })
}

pub fn mk_shadow_pipeline(
    device: &wgpu::Device,
    frame_layout: &wgpu::BindGroupLayout,
    object_layout: &wgpu::BindGroupLayout,
    shaders: &ShaderPair,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Shadow Pipeline Layout"),
        bind_group_layouts: &[frame_layout, object_layout],
        immediate_size: 0,
    });
    mk_render_pipeline(
        device,
        "Shadow Pipeline",
        &layout,
        ShadowCubemap::FORMAT,
        None,
        Some(DepthTexture::FORMAT),
        &[ModelVertex::desc()],
        shaders,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::{InnerSpace, Transform, Vector4};

    const LIGHT: Vector3<f32> = Vector3::new(6.0, 0.0, 4.6);

    #[test]
    fn positive_x_looks_one_unit_along_x() {
        assert_abs_diff_eq!(
            CubeFace::PositiveX.target(LIGHT),
            Point3::new(7.0, 0.0, 4.6),
            epsilon = 1e-6
        );
    }

    #[test]
    fn faces_cover_every_axis_direction_once() {
        let directions: Vec<_> = CubeFace::ALL.iter().map(|f| f.direction()).collect();
        for (i, a) in directions.iter().enumerate() {
            assert_abs_diff_eq!(a.magnitude(), 1.0);
            for (j, b) in directions.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = a.dot(*b);
                // either perpendicular or the opposite face
                assert!(d == 0.0 || d == -1.0, "{:?} vs {:?}", a, b);
            }
        }
        let sum = directions
            .iter()
            .fold(Vector3::new(0.0, 0.0, 0.0), |acc, d| acc + d);
        assert_eq!(sum, Vector3::new(0.0, 0.0, 0.0));
        for axis in [Vector3::unit_x(), Vector3::unit_y(), Vector3::unit_z()] {
            assert!(directions.contains(&axis));
            assert!(directions.contains(&-axis));
        }
    }

    #[test]
    fn face_bases_are_never_degenerate() {
        for face in CubeFace::ALL {
            assert_eq!(face.direction().dot(face.up()), 0.0);
            let right = face.direction().cross(face.up());
            assert_abs_diff_eq!(right.magnitude(), 1.0);
        }
    }

    #[test]
    fn each_face_centres_its_own_direction() {
        let camera = ShadowCamera::new(LIGHT, 0.01, 50.0);
        for (face, matrix) in CubeFace::ALL.iter().zip(camera.face_matrices()) {
            let ahead = LIGHT + face.direction() * 10.0;
            let clip = matrix * Vector4::new(ahead.x, ahead.y, ahead.z, 1.0);
            assert!(clip.w > 0.0, "{:?} is behind its own camera", face);
            assert_abs_diff_eq!(clip.x / clip.w, 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(clip.y / clip.w, 0.0, epsilon = 1e-5);
            let depth = clip.z / clip.w;
            assert!((0.0..=1.0).contains(&depth));
        }
    }

    #[test]
    fn projection_flips_y() {
        let projection = shadow_projection(0.01, 50.0);
        let up = projection.transform_point(Point3::new(0.0, 1.0, -2.0));
        assert!(up.y < 0.0);
    }

    #[test]
    fn uniform_carries_light_and_far_plane() {
        let uniform = ShadowCamera::new(LIGHT, 0.01, 50.0).uniform();
        assert_eq!(uniform.light_position, [6.0, 0.0, 4.6]);
        assert_eq!(uniform.far_plane, 50.0);
        let faces = ShadowCamera::face_uniforms();
        assert_eq!(faces.map(|f| f.index), [0, 1, 2, 3, 4, 5]);
    }
}
