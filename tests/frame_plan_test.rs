use shade_ngin::{
    Light, Prop, SceneSnapshot,
    data_structures::instance::SceneObject,
    pipelines::{Program, shadow::CubeFace},
    render::{FramePlan, PassTarget, RenderCommand, RenderState},
    renderer::view_matrix,
};
use cgmath::{Matrix4, SquareMatrix, Vector3};

/// A snapshot that is not the demo scene: every prop at its own spot and
/// two lights, of which only the first may be used.
struct Fixture {
    lights: Vec<Light>,
    objects: Vec<SceneObject>,
}

impl Fixture {
    fn new() -> Self {
        let objects = Prop::ALL
            .iter()
            .map(|prop| SceneObject::new([prop.index() as f32, 0.0, 0.0], [0.0, 0.0, 0.0]))
            .collect();
        Self {
            lights: vec![
                Light::new([0.0, 0.0, 5.0], [1.0, 1.0, 1.0], 10.0),
                Light::new([9.0, 9.0, 9.0], [1.0, 0.0, 0.0], 1.0),
            ],
            objects,
        }
    }
}

impl SceneSnapshot for Fixture {
    fn camera_position(&self) -> Vector3<f32> {
        Vector3::new(-4.0, 0.0, 1.0)
    }

    fn camera_forwards(&self) -> Vector3<f32> {
        Vector3::unit_x()
    }

    fn camera_up(&self) -> Vector3<f32> {
        Vector3::unit_z()
    }

    fn lights(&self) -> &[Light] {
        &self.lights
    }

    fn object(&self, prop: Prop) -> &SceneObject {
        &self.objects[prop.index()]
    }
}

#[test]
fn plan_for_any_snapshot_is_valid() {
    let plan = FramePlan::record(&Fixture::new(), wgpu::Color::BLACK);
    plan.validate().unwrap();
    assert_eq!(plan.passes().len(), 7);
    assert!(plan.flushes());
}

#[test]
fn every_shadow_face_draws_each_opaque_prop_at_its_position() {
    let fixture = Fixture::new();
    let plan = FramePlan::record(&fixture, wgpu::Color::BLACK);
    for (pass, face) in plan.passes().iter().zip(CubeFace::ALL) {
        assert_eq!(pass.target, PassTarget::ShadowFace(face));
        for command in &pass.commands {
            if let RenderCommand::Draw { prop, slot } = command {
                assert_ne!(*prop, Prop::Bulb);
                let slot = &plan.slots()[*slot as usize];
                assert_eq!(slot.model, Matrix4::from_translation(fixture.object(*prop).position));
            }
        }
    }
}

#[test]
fn replaying_a_pass_skips_nothing_that_matters() {
    let plan = FramePlan::record(&Fixture::new(), wgpu::Color::BLACK);
    let screen = plan.passes().last().unwrap();
    let mut state = RenderState::begin(screen.target);
    let mut programs = Vec::new();
    for command in &screen.commands {
        if state.apply(command).unwrap() {
            if let RenderCommand::UseProgram(program) = command {
                programs.push(*program);
            }
        }
    }
    assert_eq!(programs, vec![Program::Forward, Program::Translucent]);
    assert_eq!(state.program(), Some(Program::Translucent));
}

#[test]
fn view_matrix_puts_the_camera_at_the_origin() {
    let fixture = Fixture::new();
    let view = view_matrix(&fixture);
    let eye = fixture.camera_position();
    let moved = view * eye.extend(1.0);
    assert!(moved.truncate().x.abs() < 1e-6);
    assert!(moved.truncate().y.abs() < 1e-6);
    assert!(moved.truncate().z.abs() < 1e-6);
    assert!(view.invert().is_some());
}
