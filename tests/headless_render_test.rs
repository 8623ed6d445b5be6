#[cfg(feature = "integration-tests")]
use shade_ngin::{
    Deg, Light, Prop, Renderer, Scene, Vector3,
    camera::{Player, Projection},
    config::RendererConfig,
    context::Context,
    data_structures::{instance::SceneObject, ledger::ResourceKind},
    error::RenderError,
    renderer::view_matrix,
};

#[cfg(feature = "integration-tests")]
use crate::common::test_utils::{render_target, srgb_u8, test_config};
#[cfg(feature = "integration-tests")]
mod common;

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_render_the_lit_scene_over_the_clear_colour() {
    let config = test_config();
    let ctx = Context::headless(&config).await.unwrap();
    let mut renderer = Renderer::new(&ctx, config.clone()).await.unwrap();
    let target = render_target(&ctx);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let scene = Scene::demo();
    renderer.render(&ctx, &scene, &view).unwrap();
    renderer.render(&ctx, &scene, &view).unwrap();
    assert_eq!(renderer.frame_index(), 2);

    let image = ctx.read_texture(&target).await.unwrap();
    let clear = srgb_u8(config.clear_colour.r);
    // the top corners look over the lamp into empty space
    let corner = image.get_pixel(0, 0);
    for channel in &corner.0[..3] {
        assert!(channel.abs_diff(clear) <= 2, "{:?} is not the clear colour", corner);
    }
    // the bottom rows see the ground
    let ground = image.get_pixel(image.width() / 2, image.height() - 1);
    assert_ne!(ground, corner);
    assert_eq!(ctx.errors.count(), 0, "{:?}", ctx.errors.last_message());

    renderer.destroy().unwrap();
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_release_every_resource_once() {
    let config = test_config();
    let ctx = Context::headless(&config).await.unwrap();
    let mut renderer = Renderer::new(&ctx, config).await.unwrap();
    assert_eq!(renderer.ledger().count(ResourceKind::Program), 3);
    assert_eq!(renderer.ledger().count(ResourceKind::Mesh), 5);
    assert_eq!(renderer.ledger().count(ResourceKind::Texture), 5);
    assert_eq!(renderer.ledger().count(ResourceKind::Cubemap), 1);
    assert_eq!(renderer.ledger().count(ResourceKind::ShadowTarget), 1);

    renderer.resize(&ctx, 320, 240).unwrap();
    let created = renderer.ledger().created();
    let ledger = renderer.destroy().unwrap();
    assert_eq!(ledger.created(), created);
    assert_eq!(ledger.released(), created);
    assert!(ledger.outstanding().is_empty());
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_fail_startup_naming_the_missing_shader() {
    let config = test_config().with_asset_root("does/not/exist");
    let ctx = Context::headless(&config).await.unwrap();
    let err = Renderer::new(&ctx, config).await.unwrap_err();
    match err {
        RenderError::Asset(asset) => {
            assert!(asset.path().ends_with("shaders/shadow_vertex.wgsl"))
        }
        other => panic!("unexpected error {}", other),
    }
}

/// Light above the origin, camera looking straight down from high up, the
/// lamp pushed out of view and the cube wherever the test puts it.
#[cfg(feature = "integration-tests")]
fn shadow_scene(cube: [f32; 3]) -> Scene {
    let mut player = Player::new([0.0, 0.0, 20.0]);
    player.spin(0.0, -89.0);
    let lamp = SceneObject::new([15.0, 15.0, 0.0], [0.0, 0.0, 0.0]);
    let mut objects = [SceneObject::default(); 5];
    objects[Prop::Shade.index()] = lamp;
    objects[Prop::Base.index()] = lamp;
    objects[Prop::Bulb.index()] = lamp;
    objects[Prop::Ground.index()] = SceneObject::new([0.0, 0.0, -2.0], [0.0, 0.0, 0.0]);
    objects[Prop::Movable.index()] = SceneObject::new(cube, [0.0, 0.0, 0.0]);
    let light = Light::new([0.0, 0.0, 4.0], [1.0, 1.0, 1.0], 20.0);
    Scene::new(player, vec![light], objects)
}

#[cfg(feature = "integration-tests")]
fn pixel_of(config: &RendererConfig, scene: &Scene, world: Vector3<f32>) -> (u32, u32) {
    let projection = Projection::new(
        config.width,
        config.height,
        Deg(config.fov_y),
        config.camera_near,
        config.far_plane,
    );
    let clip = projection.calc_matrix() * view_matrix(scene) * world.extend(1.0);
    let x = (clip.x / clip.w + 1.0) * 0.5 * config.width as f32;
    let y = (1.0 - clip.y / clip.w) * 0.5 * config.height as f32;
    (x as u32, y as u32)
}

#[cfg(feature = "integration-tests")]
async fn ground_brightness(cube: [f32; 3], point: Vector3<f32>) -> u32 {
    let config = test_config();
    let ctx = Context::headless(&config).await.unwrap();
    let mut renderer = Renderer::new(&ctx, config.clone()).await.unwrap();
    let target = render_target(&ctx);
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let scene = shadow_scene(cube);
    renderer.render(&ctx, &scene, &view).unwrap();
    let image = ctx.read_texture(&target).await.unwrap();
    assert_eq!(ctx.errors.count(), 0, "{:?}", ctx.errors.last_message());
    renderer.destroy().unwrap();

    let (x, y) = pixel_of(&config, &scene, point);
    assert!(x < image.width() && y < image.height(), "({}, {}) is off screen", x, y);
    image.get_pixel(x, y).0[..3].iter().map(|&c| u32::from(c)).sum()
}

#[tokio::test]
#[cfg(feature = "integration-tests")]
async fn should_darken_ground_behind_an_occluder() {
    // the segment from this ground point to the light runs through the
    // cube, while the camera sees the point past the cube's side
    let ground = Vector3::new(4.0, 0.0, -2.0);
    let occluded = ground_brightness([1.5, 0.0, 1.0], ground).await;
    // same fragment, same light distance, cube moved out of the way
    let lit = ground_brightness([15.0, -15.0, -1.0], ground).await;

    // a wrong distance decode shadows everything, a broken compare nothing
    assert!(
        lit > occluded + 30,
        "lit ground {} is not brighter than shadowed ground {}",
        lit,
        occluded
    );
}
