//! Common utilities for integration tests.
//!
//! Every test runs against a [`RecordingDevice`] preloaded with the reflection
//! of a small sprite program, so shaders can be compiled through the normal
//! [`ShaderLibrary`] path.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use archimedes_graphics::{
    AttributeConfig, AttributeType, Geometry, GeometryDescriptor, GeometryLayout,
    ProgramReflection, RecordingDevice, Shader, ShaderLibrary, ShaderSources,
};

pub const SPRITE_VS: &str = "\
attribute vec2 corner;
attribute vec2 offset;
attribute vec4 color;
uniform mat3 camera;
varying vec4 v_color;
void main() {
    v_color = color;
    gl_Position = vec4(camera * vec3(corner + offset, 1.0), 1.0);
}
";

pub const SPRITE_FS: &str = "\
varying vec4 v_color;
uniform sampler2D atlas;
void main() {
    gl_FragColor = v_color * texture2D(atlas, vec2(0.5));
}
";

/// Unit square corners, drawn as a triangle strip.
pub const QUAD_CORNERS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

/// Initialize logging once per test binary.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn sprite_reflection() -> ProgramReflection {
    ProgramReflection::new()
        .with_attribute("corner", AttributeType::FloatVec2, 0)
        .with_attribute("offset", AttributeType::FloatVec2, 1)
        .with_attribute("color", AttributeType::FloatVec4, 2)
        .with_uniform("camera", AttributeType::FloatMat3)
        .with_uniform("atlas", AttributeType::Sampler2d)
}

/// A device that knows how to reflect the sprite program.
pub fn sprite_device() -> RecordingDevice {
    init_logging();
    let mut device = RecordingDevice::new().with_drawing_buffer_size(800, 600);
    device.set_reflection(SPRITE_VS, sprite_reflection());
    device
}

/// Compile the sprite program through a shader library.
pub fn sprite_shader(device: &mut RecordingDevice) -> Arc<Shader> {
    let sources = ShaderSources::new()
        .with_vertex("sprite", SPRITE_VS)
        .with_fragment("sprite", SPRITE_FS)
        .with_program("sprites", "sprite", "sprite");
    let library = ShaderLibrary::compile(device, &sources);
    library.get("sprites").expect("sprite program links")
}

/// Corners are static per-vertex data; offsets and colors stream per instance.
pub fn sprite_layout() -> GeometryLayout {
    GeometryLayout::new().with_attribute("corner", AttributeConfig::per_vertex().with_stream(false))
}

/// Sprite geometry with the quad corners written in.
pub fn sprite_geometry(
    device: &mut RecordingDevice,
    shader: &Shader,
    ring_size: usize,
) -> Rc<RefCell<Geometry>> {
    let schema = Arc::new(shader.geometry_schema(&sprite_layout()).unwrap());
    let descriptor = GeometryDescriptor::new()
        .with_label("sprites")
        .with_vertices(4)
        .with_instances(16)
        .with_ring_size(ring_size);
    let mut geometry = Geometry::new(device, schema, &descriptor).unwrap();
    for corner in &QUAD_CORNERS {
        let record = geometry.acquire().unwrap();
        geometry.write(&record, "corner", corner).unwrap();
    }
    Rc::new(RefCell::new(geometry))
}
