//! The shadow-mapped forward renderer.
//!
//! [`Renderer`] owns every GPU resource the demo uses: the three programs,
//! the shadow cubemap and its depth attachment, the screen depth buffer,
//! uniform buffers, meshes and materials. Each call to [`Renderer::render`]
//! records a [`FramePlan`], writes the frame's uniforms, replays the plan
//! into one command encoder (six shadow faces, then the screen) and submits
//! it. [`Renderer::destroy`] releases everything exactly once.

use std::path::PathBuf;

use cgmath::{Deg, Matrix4, Point3};

use crate::{
    camera::Projection,
    config::RendererConfig,
    context::Context,
    data_structures::{
        ledger::{GpuResource, ResourceId, ResourceKind, ResourceLedger},
        model::{DrawMesh, Material, Mesh},
        scene::{Light, Prop, SceneSnapshot},
        texture::{DepthTexture, ShadowCubemap},
    },
    error::RenderError,
    pipelines::{
        Program, ShaderPair,
        basic::{forward_frame_bind_group, forward_frame_layout, mk_forward_pipeline},
        light::{
            FaceUniform, ForwardUniform, ObjectUniform, ShadowUniform, TranslucentUniform,
            UniformBuffer, UniformSlots, object_layout,
        },
        shadow::{
            ShadowCamera, check_target_complete, mk_shadow_pipeline, shadow_frame_bind_group,
            shadow_frame_layout,
        },
        transparent::{
            mk_translucent_pipeline, translucent_frame_bind_group, translucent_frame_layout,
        },
    },
    render::{DRAWS_PER_FRAME, FramePlan, PassTarget, RenderCommand, RenderState},
    resources::{self, texture::material_layout},
};

#[derive(Debug)]
struct Programs {
    shadow: wgpu::RenderPipeline,
    forward: wgpu::RenderPipeline,
    translucent: wgpu::RenderPipeline,
    ids: [ResourceId; 3],
}

impl Programs {
    fn get(&self, program: Program) -> &wgpu::RenderPipeline {
        match program {
            Program::Shadow => &self.shadow,
            Program::Forward => &self.forward,
            Program::Translucent => &self.translucent,
        }
    }
}

/// Picks the single light a frame is shaded with.
#[derive(Debug, Default)]
struct LightSelector {
    warned_extra: bool,
}

impl LightSelector {
    fn select(&mut self, lights: &[Light]) -> Light {
        if lights.len() > 1 && !self.warned_extra {
            log::warn!(
                "{} lights in the scene, only the first one is rendered",
                lights.len()
            );
            self.warned_extra = true;
        }
        // no light: everything falls back to the ambient term
        lights
            .first()
            .copied()
            .unwrap_or_else(|| Light::new([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], 0.0))
    }
}

#[derive(Debug)]
struct FrameBindings {
    shadow: wgpu::BindGroup,
    forward: wgpu::BindGroup,
    translucent: wgpu::BindGroup,
    objects: wgpu::BindGroup,
}

#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    color_format: wgpu::TextureFormat,
    projection: Projection,
    ledger: ResourceLedger,
    programs: Programs,
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    shadow_map: ShadowCubemap,
    depth: DepthTexture,
    shadow_uniform: UniformBuffer,
    forward_uniform: UniformBuffer,
    translucent_uniform: UniformBuffer,
    face_slots: UniformSlots,
    object_slots: UniformSlots,
    bindings: FrameBindings,
    frame_index: u64,
    errors_seen: u64,
    lights: LightSelector,
}

impl Renderer {
    /// Compiles the programs, allocates the shadow target and loads every
    /// prop's mesh and texture. Any failure here is fatal.
    pub async fn new(ctx: &Context, config: RendererConfig) -> Result<Self, RenderError> {
        check_target_complete(&ctx.adapter)?;
        let errors_before = ctx.errors.count();
        let device = &ctx.device;
        let mut ledger = ResourceLedger::new();
        let color_format = ctx.config.format;

        let shader_dir = config.asset_root.join("shaders");
        let shadow_shaders = ShaderPair::load(device, &shader_dir, Program::Shadow).await?;
        let forward_shaders = ShaderPair::load(device, &shader_dir, Program::Forward).await?;
        let translucent_shaders =
            ShaderPair::load(device, &shader_dir, Program::Translucent).await?;

        let material_layout = material_layout(device);
        let object_layout = object_layout(device);
        let shadow_layout = shadow_frame_layout(device);
        let forward_layout = forward_frame_layout(device);
        let translucent_layout = translucent_frame_layout(device);

        let programs = Programs {
            shadow: mk_shadow_pipeline(device, &shadow_layout, &object_layout, &shadow_shaders),
            forward: mk_forward_pipeline(
                device,
                color_format,
                &forward_layout,
                &material_layout,
                &object_layout,
                &forward_shaders,
            ),
            translucent: mk_translucent_pipeline(
                device,
                color_format,
                &translucent_layout,
                &material_layout,
                &object_layout,
                &translucent_shaders,
            ),
            ids: Program::ALL.map(|p| ledger.track(ResourceKind::Program, p.label())),
        };
        if ctx.errors.count() > errors_before {
            return Err(RenderError::Link {
                label: "startup",
                message: ctx.errors.last_message().unwrap_or_default(),
            });
        }

        let shadow_map = ShadowCubemap::new(device, config.shadow_resolution, &mut ledger);
        let depth = DepthTexture::new(
            device,
            [ctx.config.width, ctx.config.height],
            "screen depth",
            &mut ledger,
        );

        let shadow_uniform =
            UniformBuffer::new::<ShadowUniform>(device, "shadow uniform", &mut ledger);
        let forward_uniform =
            UniformBuffer::new::<ForwardUniform>(device, "forward uniform", &mut ledger);
        let translucent_uniform =
            UniformBuffer::new::<TranslucentUniform>(device, "translucent uniform", &mut ledger);
        let face_slots = UniformSlots::new::<FaceUniform>(device, "face slots", 6, &mut ledger);
        let object_slots = UniformSlots::new::<ObjectUniform>(
            device,
            "object slots",
            DRAWS_PER_FRAME,
            &mut ledger,
        );
        face_slots.write(&ctx.queue, ShadowCamera::face_uniforms().as_slice())?;

        let bindings = FrameBindings {
            shadow: shadow_frame_bind_group(
                device,
                &shadow_layout,
                &shadow_uniform.buffer,
                face_slots.binding(),
            ),
            forward: forward_frame_bind_group(
                device,
                &forward_layout,
                &forward_uniform.buffer,
                &shadow_map,
            ),
            translucent: translucent_frame_bind_group(
                device,
                &translucent_layout,
                &translucent_uniform.buffer,
            ),
            objects: device.create_bind_group(&wgpu::BindGroupDescriptor {
                layout: &object_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: object_slots.binding(),
                }],
                label: Some("object_bind_group"),
            }),
        };

        let mesh_paths: Vec<PathBuf> = Prop::ALL
            .iter()
            .map(|p| config.asset_path(config.assets.mesh(*p)))
            .collect();
        let texture_paths: Vec<PathBuf> = Prop::ALL
            .iter()
            .map(|p| config.asset_path(config.assets.texture(*p)))
            .collect();
        // reads and parses run concurrently, uploads happen in prop order
        let mesh_data = futures::future::try_join_all(
            mesh_paths.iter().map(|path| resources::load_mesh_floats(path)),
        )
        .await?;
        let meshes: Vec<Mesh> = mesh_paths
            .iter()
            .zip(mesh_data)
            .map(|(path, floats)| {
                Mesh::from_floats(device, &path.display().to_string(), &floats, &mut ledger)
            })
            .collect();
        let mut materials = Vec::with_capacity(texture_paths.len());
        for path in &texture_paths {
            materials.push(
                resources::load_material(path, device, &ctx.queue, &material_layout, &mut ledger)
                    .await?,
            );
        }

        let projection = Projection::new(
            ctx.config.width,
            ctx.config.height,
            Deg(config.fov_y),
            config.camera_near,
            config.far_plane,
        );
        log::info!(
            "renderer ready: {} resources, shadow map {}x{}",
            ledger.created(),
            config.shadow_resolution,
            config.shadow_resolution
        );

        Ok(Self {
            config,
            color_format,
            projection,
            ledger,
            programs,
            meshes,
            materials,
            shadow_map,
            depth,
            shadow_uniform,
            forward_uniform,
            translucent_uniform,
            face_slots,
            object_slots,
            bindings,
            frame_index: 0,
            errors_seen: ctx.errors.count(),
            lights: LightSelector::default(),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Recreates the screen depth buffer for a new viewport size.
    pub fn resize(&mut self, ctx: &Context, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        let depth =
            DepthTexture::new(&ctx.device, [width, height], "screen depth", &mut self.ledger);
        let old = std::mem::replace(&mut self.depth, depth);
        old.destroy(&mut self.ledger)?;
        self.projection.resize(width, height);
        Ok(())
    }

    /// Renders one frame of `scene` into `target` and submits it.
    pub fn render<S: SceneSnapshot + ?Sized>(
        &mut self,
        ctx: &Context,
        scene: &S,
        target: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        let light = self.lights.select(scene.lights());
        let plan = FramePlan::record(scene, self.config.clear_colour);
        if self.config.debug_validation {
            plan.validate()?;
        }
        self.write_uniforms(ctx, scene, &light, &plan)?;

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        for pass in plan.passes() {
            let (color_view, depth_view, label) = match pass.target {
                PassTarget::ShadowFace(face) => (
                    &self.shadow_map.face_views[face.layer() as usize],
                    &self.shadow_map.depth.view,
                    "Shadow Face Pass",
                ),
                PassTarget::Screen => (target, &self.depth.view, "Forward Pass"),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(pass.clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            let mut state = RenderState::begin(pass.target);
            for command in &pass.commands {
                if state.apply(command)? {
                    self.execute(&mut render_pass, &state, pass.target, command);
                }
            }
        }

        if plan.flushes() {
            ctx.queue.submit(std::iter::once(encoder.finish()));
        }
        self.report_gpu_errors(ctx);
        self.frame_index += 1;
        Ok(())
    }

    fn execute<'a>(
        &'a self,
        render_pass: &mut wgpu::RenderPass<'a>,
        state: &RenderState,
        target: PassTarget,
        command: &RenderCommand,
    ) {
        match *command {
            RenderCommand::UseProgram(program) => {
                render_pass.set_pipeline(self.programs.get(program));
                match (program, target) {
                    (Program::Shadow, PassTarget::ShadowFace(face)) => render_pass.set_bind_group(
                        0,
                        &self.bindings.shadow,
                        &[self.face_slots.offset(face.layer())],
                    ),
                    (Program::Forward, _) => {
                        render_pass.set_bind_group(0, &self.bindings.forward, &[])
                    }
                    (Program::Translucent, _) => {
                        render_pass.set_bind_group(0, &self.bindings.translucent, &[])
                    }
                    // the tracker only lets the shadow program run on faces
                    (Program::Shadow, PassTarget::Screen) => (),
                }
            }
            // the flag already travels in each object slot, see object_uniforms
            RenderCommand::SetTwoSided(_) => (),
            RenderCommand::BindMaterial(prop) => {
                if let Some(group) = state.program().and_then(Program::material_group) {
                    self.materials[prop.index()].bind(render_pass, group);
                }
            }
            RenderCommand::Draw { prop, slot } => {
                if let Some(program) = state.program() {
                    render_pass.set_bind_group(
                        program.object_group(),
                        &self.bindings.objects,
                        &[self.object_slots.offset(slot)],
                    );
                    render_pass.draw_mesh(&self.meshes[prop.index()]);
                }
            }
        }
    }

    fn write_uniforms<S: SceneSnapshot + ?Sized>(
        &self,
        ctx: &Context,
        scene: &S,
        light: &Light,
        plan: &FramePlan,
    ) -> Result<(), RenderError> {
        let shadow_camera =
            ShadowCamera::new(light.position, self.config.shadow_near, self.config.far_plane);
        self.shadow_uniform.write(&ctx.queue, &shadow_camera.uniform());

        let projection = self.projection.calc_matrix();
        let view = view_matrix(scene);
        self.forward_uniform.write(
            &ctx.queue,
            &ForwardUniform::new(
                projection,
                view,
                scene.camera_position(),
                light,
                self.config.far_plane,
            ),
        );
        self.translucent_uniform.write(
            &ctx.queue,
            &TranslucentUniform {
                projection: projection.into(),
                view: view.into(),
                tint: light.color.into(),
                _padding: 0,
            },
        );

        self.object_slots.write(&ctx.queue, &object_uniforms(plan))
    }

    fn report_gpu_errors(&mut self, ctx: &Context) {
        let count = ctx.errors.count();
        if count > self.errors_seen {
            let new = count - self.errors_seen;
            let last = ctx.errors.last_message().unwrap_or_default();
            if self.config.debug_validation {
                log::error!("frame {}: {} GPU error(s), last: {}", self.frame_index, new, last);
            } else {
                log::debug!("frame {}: {} GPU error(s), last: {}", self.frame_index, new, last);
            }
            self.errors_seen = count;
        }
    }

    /// Releases every GPU resource exactly once and returns the ledger that
    /// recorded it.
    pub fn destroy(self) -> Result<ResourceLedger, RenderError> {
        let Renderer {
            mut ledger,
            programs,
            meshes,
            materials,
            shadow_map,
            depth,
            shadow_uniform,
            forward_uniform,
            translucent_uniform,
            face_slots,
            object_slots,
            bindings,
            ..
        } = self;

        drop(bindings);
        for mesh in meshes {
            mesh.destroy(&mut ledger)?;
        }
        for material in materials {
            material.destroy(&mut ledger)?;
        }
        shadow_map.destroy(&mut ledger)?;
        depth.destroy(&mut ledger)?;
        shadow_uniform.destroy(&mut ledger)?;
        forward_uniform.destroy(&mut ledger)?;
        translucent_uniform.destroy(&mut ledger)?;
        face_slots.destroy(&mut ledger)?;
        object_slots.destroy(&mut ledger)?;
        let ids = programs.ids;
        drop(programs);
        for id in ids {
            ledger.release(id)?;
        }

        let outstanding = ledger.outstanding();
        if outstanding.is_empty() {
            log::info!("released {} GPU resources", ledger.released());
        } else {
            log::error!("GPU resources leaked at teardown: {:?}", outstanding);
        }
        Ok(ledger)
    }
}

/// One object uniform per draw slot, carrying the slot's two-sided flag.
fn object_uniforms(plan: &FramePlan) -> Vec<ObjectUniform> {
    plan.slots()
        .iter()
        .map(|slot| ObjectUniform::new(slot.model, slot.two_sided))
        .collect()
}

/// Camera view matrix: eye at the camera, looking along its forward vector.
pub fn view_matrix<S: SceneSnapshot + ?Sized>(scene: &S) -> Matrix4<f32> {
    let position = scene.camera_position();
    let eye = Point3::new(position.x, position.y, position.z);
    Matrix4::look_at_rh(eye, eye + scene.camera_forwards(), scene.camera_up())
}
