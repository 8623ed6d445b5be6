//! Frame recording and binding-state tracking.
//!
//! A frame is first recorded into a [`FramePlan`]: an ordered list of passes,
//! each naming its target and a list of [`RenderCommand`]s. Nothing here
//! touches the GPU, so ordering rules can be checked in isolation. The
//! renderer then replays the plan against one command encoder, using a
//! [`RenderState`] to skip bindings that are already in place.
//!
//! # Key types
//!
//! - [`FramePlan`] is the recorded frame
//! - [`PassTarget`] says where a pass draws to
//! - [`RenderCommand`] is one binding change or draw
//! - [`DrawSlot`] is the per-draw data a `Draw` command points at
//! - [`RenderState`] tracks the bindings of the pass being replayed

use cgmath::Matrix4;

use crate::{
    data_structures::scene::{Prop, SceneSnapshot},
    error::RenderError,
    pipelines::{Program, shadow::CubeFace},
};

/// Shadow faces are cleared to the far plane (encoded distance 1.0).
pub const SHADOW_CLEAR: wgpu::Color = wgpu::Color::WHITE;

/// Draws recorded every frame: four opaque props per cube face, four opaque
/// props on screen and the bulb.
pub const DRAWS_PER_FRAME: u32 = 6 * 4 + 4 + 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassTarget {
    ShadowFace(CubeFace),
    Screen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderCommand {
    UseProgram(Program),
    SetTwoSided(bool),
    BindMaterial(Prop),
    Draw { prop: Prop, slot: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PassPlan {
    pub target: PassTarget,
    pub clear: wgpu::Color,
    pub commands: Vec<RenderCommand>,
}

impl PassPlan {
    pub fn draws(&self) -> Vec<Prop> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                RenderCommand::Draw { prop, .. } => Some(*prop),
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawSlot {
    pub prop: Prop,
    pub model: Matrix4<f32>,
    pub two_sided: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FramePlan {
    passes: Vec<PassPlan>,
    slots: Vec<DrawSlot>,
    flush: bool,
    two_sided: bool,
}

impl FramePlan {
    /// Records the shadow pass (one pass per cube face) followed by the
    /// forward pass (opaque props, then the translucent bulb) and a flush.
    pub fn record<S: SceneSnapshot + ?Sized>(scene: &S, clear: wgpu::Color) -> Self {
        let mut plan = Self::default();

        for face in CubeFace::ALL {
            plan.begin_pass(PassTarget::ShadowFace(face), SHADOW_CLEAR);
            plan.push(RenderCommand::UseProgram(Program::Shadow));
            for prop in Prop::OPAQUE_SHADOW_ORDER {
                plan.draw(scene, prop);
            }
        }

        plan.begin_pass(PassTarget::Screen, clear);
        plan.push(RenderCommand::UseProgram(Program::Forward));
        for prop in Prop::OPAQUE_FORWARD_ORDER {
            plan.set_two_sided(prop.is_two_sided());
            plan.push(RenderCommand::BindMaterial(prop));
            plan.draw(scene, prop);
        }
        plan.set_two_sided(false);

        plan.push(RenderCommand::UseProgram(Program::Translucent));
        plan.push(RenderCommand::BindMaterial(Prop::Bulb));
        plan.draw(scene, Prop::Bulb);

        plan.flush = true;
        plan
    }

    pub fn passes(&self) -> &[PassPlan] {
        &self.passes
    }

    pub fn slots(&self) -> &[DrawSlot] {
        &self.slots
    }

    /// Whether the frame ends with a queue submission.
    pub fn flushes(&self) -> bool {
        self.flush
    }

    fn begin_pass(&mut self, target: PassTarget, clear: wgpu::Color) {
        self.passes.push(PassPlan {
            target,
            clear,
            commands: Vec::new(),
        });
        self.two_sided = false;
    }

    fn push(&mut self, command: RenderCommand) {
        if let Some(pass) = self.passes.last_mut() {
            pass.commands.push(command);
        }
    }

    fn set_two_sided(&mut self, on: bool) {
        if self.two_sided != on {
            self.two_sided = on;
            self.push(RenderCommand::SetTwoSided(on));
        }
    }

    fn draw<S: SceneSnapshot + ?Sized>(&mut self, scene: &S, prop: Prop) {
        let slot = self.slots.len() as u32;
        self.slots.push(DrawSlot {
            prop,
            model: scene.object(prop).to_matrix(),
            two_sided: self.two_sided,
        });
        self.push(RenderCommand::Draw { prop, slot });
    }

    /// Replays the plan through a [`RenderState`] without a GPU and checks
    /// that every draw is fully bound, every slot is drawn exactly once and
    /// the frame is flushed.
    pub fn validate(&self) -> Result<(), RenderError> {
        let mut used = vec![false; self.slots.len()];
        let mut seen_screen = false;
        for pass in &self.passes {
            match pass.target {
                PassTarget::Screen => seen_screen = true,
                PassTarget::ShadowFace(face) if seen_screen => {
                    return Err(RenderError::Plan(format!(
                        "shadow face {:?} is rendered after the screen pass",
                        face
                    )));
                }
                PassTarget::ShadowFace(_) => (),
            }
            let mut state = RenderState::begin(pass.target);
            for command in &pass.commands {
                state.apply(command)?;
                if let RenderCommand::Draw { slot, .. } = command {
                    let draw = self.slots.get(*slot as usize).ok_or_else(|| {
                        RenderError::Plan(format!("draw refers to missing slot {}", slot))
                    })?;
                    if draw.two_sided != state.two_sided() {
                        return Err(RenderError::Plan(format!(
                            "slot {} of {} disagrees with the two-sided state",
                            slot,
                            draw.prop.name()
                        )));
                    }
                    if std::mem::replace(&mut used[*slot as usize], true) {
                        return Err(RenderError::Plan(format!("slot {} drawn twice", slot)));
                    }
                }
            }
        }
        if let Some(unused) = used.iter().position(|u| !u) {
            return Err(RenderError::Plan(format!("slot {} is never drawn", unused)));
        }
        if !self.flush {
            return Err(RenderError::Plan("frame is never flushed".to_string()));
        }
        Ok(())
    }
}

/// Bindings of the pass being replayed. A fresh state starts every pass:
/// nothing bound in an earlier pass is assumed to persist.
#[derive(Clone, Debug)]
pub struct RenderState {
    target: PassTarget,
    program: Option<Program>,
    material: Option<Prop>,
    two_sided: bool,
}

impl RenderState {
    pub fn begin(target: PassTarget) -> Self {
        Self {
            target,
            program: None,
            material: None,
            two_sided: false,
        }
    }

    pub fn program(&self) -> Option<Program> {
        self.program
    }

    pub fn two_sided(&self) -> bool {
        self.two_sided
    }

    /// Applies `command` to the tracked state. Returns `false` when the
    /// command changes nothing and can be skipped.
    pub fn apply(&mut self, command: &RenderCommand) -> Result<bool, RenderError> {
        match *command {
            RenderCommand::UseProgram(program) => {
                let allowed = match self.target {
                    PassTarget::ShadowFace(_) => program == Program::Shadow,
                    PassTarget::Screen => program != Program::Shadow,
                };
                if !allowed {
                    return Err(RenderError::Plan(format!(
                        "{} program cannot draw to {:?}",
                        program.label(),
                        self.target
                    )));
                }
                if self.program == Some(program) {
                    return Ok(false);
                }
                self.program = Some(program);
                // a new pipeline layout invalidates the material slot
                self.material = None;
                Ok(true)
            }
            RenderCommand::SetTwoSided(on) => {
                let changed = self.two_sided != on;
                self.two_sided = on;
                Ok(changed)
            }
            RenderCommand::BindMaterial(prop) => {
                let program = self.require_program("bind a material")?;
                if program.material_group().is_none() {
                    return Err(RenderError::Plan(format!(
                        "{} program has no material slot",
                        program.label()
                    )));
                }
                if self.material == Some(prop) {
                    return Ok(false);
                }
                self.material = Some(prop);
                Ok(true)
            }
            RenderCommand::Draw { prop, .. } => {
                let program = self.require_program("draw")?;
                if program.material_group().is_some() && self.material != Some(prop) {
                    return Err(RenderError::Plan(format!(
                        "{} drawn with the material of {:?}",
                        prop.name(),
                        self.material.map(Prop::name)
                    )));
                }
                Ok(true)
            }
        }
    }

    fn require_program(&self, action: &str) -> Result<Program, RenderError> {
        self.program.ok_or_else(|| {
            RenderError::Plan(format!("cannot {} before a program is in use", action))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::scene::Scene;

    fn plan() -> FramePlan {
        FramePlan::record(&Scene::demo(), wgpu::Color::BLACK)
    }

    #[test]
    fn six_shadow_faces_then_the_screen() {
        let plan = plan();
        let targets: Vec<_> = plan.passes().iter().map(|p| p.target).collect();
        let mut expected: Vec<_> = CubeFace::ALL.map(PassTarget::ShadowFace).to_vec();
        expected.push(PassTarget::Screen);
        assert_eq!(targets, expected);
        assert_eq!(plan.slots().len() as u32, DRAWS_PER_FRAME);
    }

    #[test]
    fn shadow_faces_draw_opaque_props_in_order() {
        for pass in &plan().passes()[..6] {
            assert_eq!(pass.clear, SHADOW_CLEAR);
            assert_eq!(pass.commands[0], RenderCommand::UseProgram(Program::Shadow));
            assert_eq!(
                pass.draws(),
                vec![Prop::Base, Prop::Ground, Prop::Shade, Prop::Movable]
            );
        }
    }

    #[test]
    fn screen_draws_shade_first_and_bulb_last() {
        let plan = plan();
        let screen = &plan.passes()[6];
        assert_eq!(
            screen.draws(),
            vec![Prop::Shade, Prop::Base, Prop::Ground, Prop::Movable, Prop::Bulb]
        );
        let translucent = screen
            .commands
            .iter()
            .position(|c| *c == RenderCommand::UseProgram(Program::Translucent))
            .unwrap();
        let last_opaque = screen
            .commands
            .iter()
            .rposition(|c| matches!(c, RenderCommand::Draw { prop: Prop::Movable, .. }))
            .unwrap();
        assert!(translucent > last_opaque);
        assert!(plan.flushes());
    }

    #[test]
    fn only_the_shade_is_drawn_two_sided() {
        let plan = plan();
        let screen_slots: Vec<u32> = plan.passes()[6]
            .commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Draw { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        for (i, slot) in plan.slots().iter().enumerate() {
            let on_screen = screen_slots.contains(&(i as u32));
            assert_eq!(slot.two_sided, on_screen && slot.prop == Prop::Shade);
        }
        let toggles: Vec<_> = plan.passes()[6]
            .commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::SetTwoSided(_)))
            .collect();
        assert_eq!(
            toggles,
            vec![&RenderCommand::SetTwoSided(true), &RenderCommand::SetTwoSided(false)]
        );
    }

    #[test]
    fn recorded_plan_is_valid() {
        plan().validate().unwrap();
    }

    #[test]
    fn slots_carry_model_matrices() {
        let scene = Scene::demo();
        let plan = FramePlan::record(&scene, wgpu::Color::BLACK);
        let ground = plan.slots().iter().find(|s| s.prop == Prop::Ground).unwrap();
        assert_eq!(ground.model, scene.object(Prop::Ground).to_matrix());
    }

    #[test]
    fn tracker_skips_redundant_bindings() {
        let mut state = RenderState::begin(PassTarget::Screen);
        assert!(state.apply(&RenderCommand::UseProgram(Program::Forward)).unwrap());
        assert!(!state.apply(&RenderCommand::UseProgram(Program::Forward)).unwrap());
        assert!(state.apply(&RenderCommand::BindMaterial(Prop::Base)).unwrap());
        assert!(!state.apply(&RenderCommand::BindMaterial(Prop::Base)).unwrap());
        assert!(!state.apply(&RenderCommand::SetTwoSided(false)).unwrap());
    }

    #[test]
    fn tracker_rejects_unbound_draws() {
        let mut state = RenderState::begin(PassTarget::Screen);
        let draw = RenderCommand::Draw {
            prop: Prop::Base,
            slot: 0,
        };
        assert!(state.apply(&draw).is_err());
        state.apply(&RenderCommand::UseProgram(Program::Forward)).unwrap();
        assert!(state.apply(&draw).is_err());
        state.apply(&RenderCommand::BindMaterial(Prop::Ground)).unwrap();
        assert!(state.apply(&draw).is_err());
    }

    #[test]
    fn programs_are_tied_to_their_targets() {
        let mut face = RenderState::begin(PassTarget::ShadowFace(CubeFace::NegativeZ));
        assert!(face.apply(&RenderCommand::UseProgram(Program::Forward)).is_err());
        face.apply(&RenderCommand::UseProgram(Program::Shadow)).unwrap();
        assert!(face.apply(&RenderCommand::BindMaterial(Prop::Base)).is_err());

        let mut screen = RenderState::begin(PassTarget::Screen);
        assert!(screen.apply(&RenderCommand::UseProgram(Program::Shadow)).is_err());
    }

    #[test]
    fn switching_programs_forgets_the_material() {
        let mut state = RenderState::begin(PassTarget::Screen);
        state.apply(&RenderCommand::UseProgram(Program::Forward)).unwrap();
        state.apply(&RenderCommand::BindMaterial(Prop::Bulb)).unwrap();
        state.apply(&RenderCommand::UseProgram(Program::Translucent)).unwrap();
        assert!(state
            .apply(&RenderCommand::Draw {
                prop: Prop::Bulb,
                slot: 0
            })
            .is_err());
    }

    #[test]
    fn unflushed_plan_is_rejected() {
        let mut plan = plan();
        plan.flush = false;
        assert!(plan.validate().is_err());
    }
}
