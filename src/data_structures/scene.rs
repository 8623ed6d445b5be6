//! The fixed demo scene and the read-only view the renderer draws from.
//!
//! # Key types
//!
//! - [`Prop`] names the five objects the scene is made of
//! - [`Light`] is a point light
//! - [`SceneSnapshot`] is everything the renderer reads in one frame
//! - [`Scene`] is the mutable state the host updates between frames

use cgmath::Vector3;

use crate::{camera::Player, data_structures::instance::SceneObject};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prop {
    Shade,
    Base,
    Ground,
    Movable,
    Bulb,
}

impl Prop {
    pub const ALL: [Prop; 5] = [Prop::Shade, Prop::Base, Prop::Ground, Prop::Movable, Prop::Bulb];

    /// Props that block light, in shadow-pass draw order.
    pub const OPAQUE_SHADOW_ORDER: [Prop; 4] =
        [Prop::Base, Prop::Ground, Prop::Shade, Prop::Movable];

    /// Props drawn by the opaque forward sub-pass, in draw order.
    pub const OPAQUE_FORWARD_ORDER: [Prop; 4] =
        [Prop::Shade, Prop::Base, Prop::Ground, Prop::Movable];

    pub fn index(self) -> usize {
        match self {
            Prop::Shade => 0,
            Prop::Base => 1,
            Prop::Ground => 2,
            Prop::Movable => 3,
            Prop::Bulb => 4,
        }
    }

    /// Thin surfaces that must be lit from both sides.
    pub fn is_two_sided(self) -> bool {
        matches!(self, Prop::Shade)
    }

    pub fn name(self) -> &'static str {
        match self {
            Prop::Shade => "shade",
            Prop::Base => "base",
            Prop::Ground => "ground",
            Prop::Movable => "movable",
            Prop::Bulb => "bulb",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    pub position: Vector3<f32>,
    /// Linear colour, each channel in 0..1.
    pub color: Vector3<f32>,
    pub strength: f32,
}

impl Light {
    pub fn new(
        position: impl Into<Vector3<f32>>,
        color: impl Into<Vector3<f32>>,
        strength: f32,
    ) -> Self {
        Self {
            position: position.into(),
            color: color.into(),
            strength,
        }
    }
}

/// Read-only view of one frame's worth of scene state.
pub trait SceneSnapshot {
    fn camera_position(&self) -> Vector3<f32>;
    fn camera_forwards(&self) -> Vector3<f32>;
    fn camera_up(&self) -> Vector3<f32>;
    fn lights(&self) -> &[Light];
    fn object(&self, prop: Prop) -> &SceneObject;
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub player: Player,
    pub lights: Vec<Light>,
    objects: [SceneObject; 5],
}

impl Scene {
    pub fn new(player: Player, lights: Vec<Light>, objects: [SceneObject; 5]) -> Self {
        Self {
            player,
            lights,
            objects,
        }
    }

    /// The lamp on its base, a ground plane, a movable cube and one warm light.
    pub fn demo() -> Self {
        let lamp = SceneObject::new([6.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        let mut objects = [SceneObject::default(); 5];
        objects[Prop::Shade.index()] = lamp;
        objects[Prop::Base.index()] = lamp;
        objects[Prop::Bulb.index()] = lamp;
        objects[Prop::Ground.index()] = SceneObject::new([0.0, 0.0, -2.0], [0.0, 0.0, 0.0]);
        objects[Prop::Movable.index()] = SceneObject::new([2.0, 0.0, -1.0], [0.0, 0.0, 0.0]);

        let light = Light::new(
            [6.0, 0.0, 4.6],
            [247.0 / 256.0, 235.0 / 256.0, 176.0 / 256.0],
            20.0,
        );

        Self::new(Player::new([0.0, 0.0, 2.0]), vec![light], objects)
    }

    pub fn object_mut(&mut self, prop: Prop) -> &mut SceneObject {
        &mut self.objects[prop.index()]
    }

    pub fn move_player(&mut self, delta: Vector3<f32>) {
        self.player.move_by(delta);
    }

    pub fn move_object(&mut self, delta: Vector3<f32>) {
        self.objects[Prop::Movable.index()].translate(delta);
    }

    pub fn spin_player(&mut self, d_theta: f32, d_phi: f32) {
        self.player.spin(d_theta, d_phi);
    }
}

impl SceneSnapshot for Scene {
    fn camera_position(&self) -> Vector3<f32> {
        self.player.position
    }

    fn camera_forwards(&self) -> Vector3<f32> {
        self.player.forwards()
    }

    fn camera_up(&self) -> Vector3<f32> {
        self.player.up()
    }

    fn lights(&self) -> &[Light] {
        &self.lights
    }

    fn object(&self, prop: Prop) -> &SceneObject {
        &self.objects[prop.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prop_indices_are_dense() {
        for (i, prop) in Prop::ALL.into_iter().enumerate() {
            assert_eq!(prop.index(), i);
        }
    }

    #[test]
    fn only_the_shade_is_two_sided() {
        let two_sided: Vec<_> = Prop::ALL.into_iter().filter(|p| p.is_two_sided()).collect();
        assert_eq!(two_sided, vec![Prop::Shade]);
    }

    #[test]
    fn demo_layout() {
        let scene = Scene::demo();
        assert_eq!(scene.object(Prop::Bulb).position, Vector3::new(6.0, 0.0, 0.0));
        assert_eq!(scene.object(Prop::Ground).position, Vector3::new(0.0, 0.0, -2.0));
        assert_eq!(scene.lights().len(), 1);
        assert_eq!(scene.lights()[0].strength, 20.0);
        assert_eq!(scene.camera_position(), Vector3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn moving_touches_only_the_movable_object() {
        let mut scene = Scene::demo();
        let before = scene.object(Prop::Base).position;
        scene.move_object(Vector3::new(1.0, -1.0, 0.0));
        assert_eq!(scene.object(Prop::Movable).position, Vector3::new(3.0, -1.0, -1.0));
        assert_eq!(scene.object(Prop::Base).position, before);

        scene.move_player(Vector3::new(0.5, 0.0, 0.0));
        assert_eq!(scene.camera_position(), Vector3::new(0.5, 0.0, 2.0));
    }
}
