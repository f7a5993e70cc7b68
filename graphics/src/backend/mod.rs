//! Device abstraction layer.
//!
//! The device is the external collaborator that actually executes buffer
//! uploads, state changes and draw calls. This subsystem talks to it only
//! through the [`Device`] command vocabulary, so any immediate-mode graphics
//! API can sit behind it.
//!
//! # Available Devices
//!
//! - [`RecordingDevice`]: records every command and keeps CPU copies of buffer
//!   contents. Used by tests and for inspecting what a frame would issue.

mod recording;

pub use recording::{DeviceCommand, RecordingDevice};

use crate::error::GraphicsResult;
use crate::shader::{ProgramReflection, ShaderStage};
use crate::types::{
    BufferDescriptor, BufferHandle, BufferUsage, ClearColor, FramebufferHandle, PixelRect,
    PrimitiveMode, ProgramHandle, StageHandle, TextureHandle, UniformFunction, UniformLocation,
    VertexArrayHandle,
};
use crate::vertex::AttributeBinding;

/// Borrowed uniform data passed to [`Device::set_uniform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    /// Floating point data.
    Float(&'a [f32]),
    /// Integer data (ints, bools and sampler units).
    Int(&'a [i32]),
}

impl UniformValue<'_> {
    /// Number of elements in the value.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    /// Whether the value holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The command vocabulary consumed from the graphics device.
///
/// Creation calls may fail; state changes and draws cannot, matching an
/// immediate-mode API whose errors surface asynchronously.
pub trait Device {
    /// Get a human readable device name.
    fn name(&self) -> &str;

    // -- buffers ----------------------------------------------------------

    /// Create a buffer. A non-zero descriptor size reserves storage up front.
    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> GraphicsResult<BufferHandle>;

    /// Bind a buffer as the current vertex buffer.
    fn bind_buffer(&mut self, buffer: BufferHandle);

    /// Reallocate a buffer's storage and fill it with `contents`.
    fn allocate_buffer(&mut self, buffer: BufferHandle, contents: &[u8], usage: BufferUsage);

    /// Overwrite a buffer's full contents without reallocating.
    ///
    /// `contents` must be exactly as long as the last allocation.
    fn upload_buffer(&mut self, buffer: BufferHandle, contents: &[u8]);

    /// Destroy a buffer.
    fn delete_buffer(&mut self, buffer: BufferHandle);

    // -- vertex arrays ----------------------------------------------------

    /// Create a vertex array object.
    fn create_vertex_array(&mut self) -> GraphicsResult<VertexArrayHandle>;

    /// Bind a vertex array object.
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Destroy a vertex array object.
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Point one attribute slot of the bound vertex array at the bound buffer.
    fn set_attribute_binding(&mut self, binding: &AttributeBinding);

    // -- target surfaces --------------------------------------------------

    /// Bind an offscreen framebuffer, or the default canvas for `None`.
    fn bind_target_surface(&mut self, framebuffer: Option<FramebufferHandle>);

    /// Size of the default canvas in pixels.
    fn drawing_buffer_size(&self) -> (u32, u32);

    /// Set the viewport rectangle.
    fn set_viewport(&mut self, rect: PixelRect);

    /// Set the scissor rectangle.
    fn set_scissor(&mut self, rect: PixelRect);

    /// Clear the bound surface's color.
    fn clear(&mut self, color: ClearColor);

    // -- shaders ----------------------------------------------------------

    /// Compile one shader stage. Failure returns the device's info log.
    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<StageHandle, String>;

    /// Link a vertex and fragment stage. Failure returns the device's info log.
    fn link_program(
        &mut self,
        vertex: StageHandle,
        fragment: StageHandle,
    ) -> Result<ProgramHandle, String>;

    /// Destroy a compiled stage.
    fn delete_stage(&mut self, stage: StageHandle);

    /// Destroy a linked program.
    fn delete_program(&mut self, program: ProgramHandle);

    /// Enumerate a linked program's active attributes and uniforms.
    fn reflect_program(&self, program: ProgramHandle) -> ProgramReflection;

    /// Look up the location of a uniform (array elements use `name[i]`).
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Number of combined texture image units.
    fn max_texture_units(&self) -> u32;

    /// Make a program current.
    fn use_shader_program(&mut self, program: ProgramHandle);

    /// Upload a uniform value to the current program.
    fn set_uniform(
        &mut self,
        location: UniformLocation,
        function: UniformFunction,
        value: UniformValue<'_>,
        transpose: bool,
    );

    // -- textures ---------------------------------------------------------

    /// Create an RGBA texture.
    fn create_texture(&mut self, width: u32, height: u32) -> GraphicsResult<TextureHandle>;

    /// Create a framebuffer rendering into `color`.
    fn create_framebuffer(&mut self, color: TextureHandle) -> GraphicsResult<FramebufferHandle>;

    /// Bind a texture to a texture image unit.
    fn bind_texture_to_unit(&mut self, unit: u32, texture: TextureHandle);

    // -- draws ------------------------------------------------------------

    /// Draw `vertex_count` vertices from the bound vertex array.
    fn draw(&mut self, mode: PrimitiveMode, vertex_count: u32);

    /// Draw `instance_count` instances of `vertex_count` vertices.
    fn draw_instanced(&mut self, mode: PrimitiveMode, vertex_count: u32, instance_count: u32);
}
