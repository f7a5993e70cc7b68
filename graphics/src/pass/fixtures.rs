//! Shared objects for pass compiler unit tests.

use std::sync::Arc;

use archimedes_core::math::Mat3;

use crate::backend::RecordingDevice;
use crate::resources::{Framebuffer, Texture, Variable};
use crate::shader::{ProgramReflection, Shader};
use crate::types::AttributeType;

/// A shader with uniforms `camera` (mat3) and `tint` (vec4) and sampler `atlas`.
pub(crate) fn sprite_shader(device: &mut RecordingDevice) -> Arc<Shader> {
    shader(device, "sprites")
}

pub(crate) fn shader(device: &mut RecordingDevice, name: &str) -> Arc<Shader> {
    let reflection = ProgramReflection::new()
        .with_attribute("corner", AttributeType::FloatVec2, 0)
        .with_uniform("camera", AttributeType::FloatMat3)
        .with_uniform("tint", AttributeType::FloatVec4)
        .with_uniform("atlas", AttributeType::Sampler2d);
    let program = device.create_program(reflection);
    Arc::new(Shader::new(device, program, name).unwrap())
}

pub(crate) fn camera() -> Arc<Variable> {
    Variable::shared_float(&Mat3::identity())
}

pub(crate) fn tint() -> Arc<Variable> {
    Variable::shared_float(&[1.0f32, 1.0, 1.0, 1.0])
}

pub(crate) fn texture(device: &mut RecordingDevice) -> Arc<Texture> {
    Arc::new(Texture::new(device, 64, 64).unwrap())
}

pub(crate) fn framebuffer(device: &mut RecordingDevice) -> Arc<Framebuffer> {
    Arc::new(Framebuffer::new(device, 128, 96).unwrap())
}
