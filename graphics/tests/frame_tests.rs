//! End-to-end frame tests.
//!
//! These tests drive the full path a game frame takes: shaders compiled from
//! sources, sprite geometry filled and synced, and a pass sequence compiled
//! and run against a recording device.

mod common;

use std::sync::Arc;

use archimedes_core::math::{Mat3, Vec2, affine_2d};
use archimedes_graphics::{
    ClearColor, DeviceCommand, Framebuffer, GraphicsError, PixelRect, PrimitiveMode, RenderPass,
    Severity, Variable, compile_renderer,
};
use rstest::rstest;

use common::{QUAD_CORNERS, sprite_device, sprite_geometry, sprite_shader};

const INSTANCE_GROUP: usize = 1;

fn draw_commands(commands: &[DeviceCommand]) -> Vec<&DeviceCommand> {
    commands.iter().filter(|c| c.is_draw()).collect()
}

// ============================================================================
// Full frame
// ============================================================================

#[test]
fn test_sprite_frame() {
    let mut device = sprite_device();
    let shader = sprite_shader(&mut device);
    let geometry = sprite_geometry(&mut device, &shader, 3);
    let atlas = Arc::new(Framebuffer::new(&mut device, 256, 256).unwrap());
    let camera = Variable::shared_float(&Mat3::identity());

    for i in 0..3 {
        let mut geometry = geometry.borrow_mut();
        let sprite = geometry.acquire_in(INSTANCE_GROUP).unwrap();
        geometry.write(&sprite, "offset", &Vec2::new(i as f32, 0.0)).unwrap();
        geometry.write(&sprite, "color", &[1.0f32, 1.0, 1.0, 1.0]).unwrap();
    }

    let drawn = geometry.clone();
    let renderer = compile_renderer(&[
        RenderPass::clear("clear", ClearColor::TRANSPARENT),
        RenderPass::draw_to_canvas("sprites")
            .with_shader(shader.clone())
            .with_uniform("camera", camera.clone())
            .with_sampler("atlas", atlas.clone())
            .with_draw(move |device| drawn.borrow().draw(device, PrimitiveMode::TriangleStrip)),
    ]);
    assert!(renderer.diagnostics.is_empty(), "{:?}", renderer.diagnostics);

    device.clear_commands();
    geometry.borrow_mut().sync(&mut device);
    renderer.run(&mut device);

    let commands = device.take_commands();
    let clear_at = commands
        .iter()
        .position(|c| matches!(c, DeviceCommand::Clear(_)))
        .expect("frame clears the canvas");
    let draw_at = commands
        .iter()
        .position(DeviceCommand::is_draw)
        .expect("frame draws sprites");
    assert!(clear_at < draw_at);
    assert_eq!(
        draw_commands(&commands),
        [&DeviceCommand::DrawInstanced {
            mode: PrimitiveMode::TriangleStrip,
            vertex_count: 4,
            instance_count: 3,
        }]
    );
    assert!(commands.contains(&DeviceCommand::SetViewport(PixelRect::from_dimensions(800, 600))));
}

#[test]
fn test_variable_updates_without_recompiling() {
    let mut device = sprite_device();
    let shader = sprite_shader(&mut device);
    let camera = Variable::shared_float(&Mat3::identity());
    let renderer = compile_renderer(&[RenderPass::draw_to_canvas("sprites")
        .with_shader(shader)
        .with_uniform("camera", camera.clone())
        .with_sampler_dont_care("atlas")
        .with_draw(|_| {})]);

    let uploaded_camera = |device: &mut archimedes_graphics::RecordingDevice| {
        device.clear_commands();
        renderer.run(device);
        device.commands().iter().find_map(|c| match c {
            DeviceCommand::SetUniform { value, .. } => Some(value.clone()),
            _ => None,
        })
    };

    let first = uploaded_camera(&mut device);
    let moved = affine_2d(Vec2::new(10.0, -4.0), 0.0, Vec2::new(2.0, 2.0));
    camera.set_float(&moved);
    let second = uploaded_camera(&mut device);

    assert_ne!(first, second);
    assert_eq!(second, Some(camera.get()));
}

#[test]
fn test_offscreen_then_compose() {
    let mut device = sprite_device();
    let shader = sprite_shader(&mut device);
    let scene = Arc::new(Framebuffer::new(&mut device, 320, 240).unwrap());
    let camera = Variable::shared_float(&Mat3::identity());
    let compose = |name: &str| {
        RenderPass::draw_to_canvas(name)
            .with_shader(shader.clone())
            .with_uniform("camera", camera.clone())
            .with_sampler("atlas", scene.clone())
            .with_draw(|_| {})
    };

    let renderer = compile_renderer(&[
        RenderPass::clear("scene", ClearColor::TRANSPARENT).with_target(scene.clone()),
        compose("compose"),
        // Reads and writes the same image, so it is dropped
        compose("feedback").with_target(scene.clone()),
    ]);

    let errors: Vec<_> = renderer
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].pass, "feedback");

    device.clear_commands();
    renderer.run(&mut device);
    let commands = device.take_commands();
    assert_eq!(commands[0], DeviceCommand::BindTargetSurface(Some(scene.handle())));
    assert!(commands.contains(&DeviceCommand::BindTargetSurface(None)));
    assert!(commands.contains(&DeviceCommand::BindTexture {
        unit: shader.sampler_unit("atlas").unwrap(),
        texture: scene.texture().handle(),
    }));
}

// ============================================================================
// Geometry multi-buffering
// ============================================================================

#[rstest]
#[case::single(1)]
#[case::double(2)]
#[case::triple(3)]
#[case::quad(4)]
fn test_static_group_reaches_every_array(#[case] ring_size: usize) {
    let mut device = sprite_device();
    let shader = sprite_shader(&mut device);
    let geometry = sprite_geometry(&mut device, &shader, ring_size);
    let mut geometry = geometry.borrow_mut();

    for _ in 0..ring_size {
        geometry.sync(&mut device);
    }

    let expected: Vec<f32> = QUAD_CORNERS.iter().flatten().copied().collect();
    for index in 0..ring_size {
        let buffer = geometry.buffer(index, 0).unwrap();
        assert_eq!(device.buffer_floats(buffer), Some(expected.clone()));
    }
    assert_eq!(geometry.pending_uploads(0), 0);

    // Nothing changed, so further syncs leave the static group alone
    device.clear_commands();
    geometry.sync(&mut device);
    let static_buffer = geometry.buffer(geometry.current_index(), 0).unwrap();
    assert!(!device.commands().iter().any(|c| matches!(
        c,
        DeviceCommand::UploadBuffer { buffer, .. } | DeviceCommand::AllocateBuffer { buffer, .. }
            if *buffer == static_buffer
    )));
}

#[test]
fn test_released_instances_compact() {
    let mut device = sprite_device();
    let shader = sprite_shader(&mut device);
    let geometry = sprite_geometry(&mut device, &shader, 2);
    let mut geometry = geometry.borrow_mut();

    let mut sprites: Vec<_> = (0..3)
        .map(|i| {
            let sprite = geometry.acquire_in(INSTANCE_GROUP).unwrap();
            geometry.write(&sprite, "offset", &[i as f32, 0.0]).unwrap();
            geometry.write(&sprite, "color", &[i as f32; 4]).unwrap();
            sprite
        })
        .collect();

    let middle = sprites.remove(1);
    geometry.release(middle).unwrap();
    assert_eq!(geometry.count_instances(), Some(2));

    let backing = geometry.backing(INSTANCE_GROUP).unwrap();
    let offsets: Vec<f32> = (0..backing.len()).map(|slot| backing.slot(slot)[0]).collect();
    assert_eq!(offsets, [0.0, 2.0]);
    for sprite in &sprites {
        let index = geometry.field(sprite, "color").unwrap()[0];
        assert_eq!(geometry.field(sprite, "offset").unwrap(), [index, 0.0]);
    }

    geometry.sync(&mut device);
    let buffer = geometry.buffer(geometry.current_index(), INSTANCE_GROUP).unwrap();
    let uploaded = device.buffer_floats(buffer).unwrap();
    assert_eq!(&uploaded[..6], &[0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    assert_eq!(&uploaded[6..12], &[2.0, 0.0, 2.0, 2.0, 2.0, 2.0]);
}

#[test]
fn test_foreign_record_rejected() {
    let mut device = sprite_device();
    let shader = sprite_shader(&mut device);
    let first = sprite_geometry(&mut device, &shader, 1);
    let second = sprite_geometry(&mut device, &shader, 1);

    let sprite = first.borrow_mut().acquire_in(INSTANCE_GROUP).unwrap();
    assert_eq!(
        second.borrow_mut().release(sprite),
        Err(GraphicsError::ForeignRecord)
    );
}

#[test]
fn test_no_instances_no_draw() {
    let mut device = sprite_device();
    let shader = sprite_shader(&mut device);
    let geometry = sprite_geometry(&mut device, &shader, 3);

    device.clear_commands();
    geometry.borrow_mut().sync(&mut device);
    geometry.borrow().draw(&mut device, PrimitiveMode::TriangleStrip);
    assert_eq!(device.draw_count(), 0);
}
