//! Recording device for testing and development.
//!
//! This device performs no GPU work. It records every command it receives,
//! keeps CPU copies of buffer contents and answers introspection queries
//! from reflections registered up front, so geometry and render procedures
//! can be exercised without graphics hardware.

use std::collections::HashMap;

use crate::error::GraphicsResult;
use crate::resources::UniformData;
use crate::shader::{ProgramReflection, ShaderStage};
use crate::types::{
    BufferDescriptor, BufferHandle, BufferUsage, ClearColor, FramebufferHandle, PixelRect,
    PrimitiveMode, ProgramHandle, StageHandle, TextureHandle, UniformFunction, UniformLocation,
    VertexArrayHandle,
};
use crate::vertex::AttributeBinding;

use super::{Device, UniformValue};

/// One command received by a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateBuffer {
        buffer: BufferHandle,
        size: u64,
        usage: BufferUsage,
    },
    BindBuffer(BufferHandle),
    AllocateBuffer {
        buffer: BufferHandle,
        size: usize,
        usage: BufferUsage,
    },
    UploadBuffer {
        buffer: BufferHandle,
        size: usize,
    },
    DeleteBuffer(BufferHandle),
    CreateVertexArray(VertexArrayHandle),
    BindVertexArray(VertexArrayHandle),
    DeleteVertexArray(VertexArrayHandle),
    SetAttributeBinding(AttributeBinding),
    BindTargetSurface(Option<FramebufferHandle>),
    SetViewport(PixelRect),
    SetScissor(PixelRect),
    Clear(ClearColor),
    CompileStage {
        stage: ShaderStage,
        result: Option<StageHandle>,
    },
    LinkProgram {
        vertex: StageHandle,
        fragment: StageHandle,
        result: Option<ProgramHandle>,
    },
    DeleteStage(StageHandle),
    DeleteProgram(ProgramHandle),
    UseProgram(ProgramHandle),
    SetUniform {
        location: UniformLocation,
        function: UniformFunction,
        value: UniformData,
        transpose: bool,
    },
    CreateTexture {
        texture: TextureHandle,
        width: u32,
        height: u32,
    },
    CreateFramebuffer {
        framebuffer: FramebufferHandle,
        color: TextureHandle,
    },
    BindTexture {
        unit: u32,
        texture: TextureHandle,
    },
    Draw {
        mode: PrimitiveMode,
        vertex_count: u32,
    },
    DrawInstanced {
        mode: PrimitiveMode,
        vertex_count: u32,
        instance_count: u32,
    },
}

impl DeviceCommand {
    /// Whether this is a draw call.
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. } | Self::DrawInstanced { .. })
    }
}

#[derive(Debug, Default)]
struct BufferState {
    contents: Vec<u8>,
    allocations: usize,
}

#[derive(Debug)]
struct ProgramState {
    reflection: ProgramReflection,
    locations: HashMap<String, UniformLocation>,
}

/// A [`Device`] that records commands instead of executing them.
///
/// # Example
///
/// ```ignore
/// let mut device = RecordingDevice::new().with_drawing_buffer_size(800, 600);
/// geometry.sync(&mut device);
/// geometry.draw(&mut device, PrimitiveMode::Triangles);
/// assert!(device.commands().last().unwrap().is_draw());
/// ```
#[derive(Debug)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    next_id: u64,
    drawing_buffer_size: (u32, u32),
    max_texture_units: u32,
    buffers: HashMap<BufferHandle, BufferState>,
    stages: HashMap<StageHandle, String>,
    programs: HashMap<ProgramHandle, ProgramState>,
    reflections: Vec<(String, ProgramReflection)>,
    compile_failures: Vec<(String, String)>,
    link_failures: Vec<(String, String)>,
    current_program: Option<ProgramHandle>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    /// Default canvas size.
    pub const DEFAULT_DRAWING_BUFFER_SIZE: (u32, u32) = (640, 480);

    /// Default number of texture image units.
    pub const DEFAULT_TEXTURE_UNITS: u32 = 8;

    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            next_id: 1,
            drawing_buffer_size: Self::DEFAULT_DRAWING_BUFFER_SIZE,
            max_texture_units: Self::DEFAULT_TEXTURE_UNITS,
            buffers: HashMap::new(),
            stages: HashMap::new(),
            programs: HashMap::new(),
            reflections: Vec::new(),
            compile_failures: Vec::new(),
            link_failures: Vec::new(),
            current_program: None,
        }
    }

    pub fn with_drawing_buffer_size(mut self, width: u32, height: u32) -> Self {
        self.drawing_buffer_size = (width, height);
        self
    }

    pub fn with_max_texture_units(mut self, units: u32) -> Self {
        self.max_texture_units = units;
        self
    }

    /// Resize the canvas.
    pub fn set_drawing_buffer_size(&mut self, width: u32, height: u32) {
        self.drawing_buffer_size = (width, height);
    }

    /// Report `reflection` for programs linked from this exact vertex source.
    pub fn set_reflection(&mut self, vertex_source: impl Into<String>, reflection: ProgramReflection) {
        self.reflections.push((vertex_source.into(), reflection));
    }

    /// Fail compiling any stage whose source contains `pattern`.
    pub fn fail_compile(&mut self, pattern: impl Into<String>, info_log: impl Into<String>) {
        self.compile_failures.push((pattern.into(), info_log.into()));
    }

    /// Fail linking any program with a stage whose source contains `pattern`.
    pub fn fail_link(&mut self, pattern: impl Into<String>, info_log: impl Into<String>) {
        self.link_failures.push((pattern.into(), info_log.into()));
    }

    /// Register a linked program directly, skipping stage compilation.
    pub fn create_program(&mut self, reflection: ProgramReflection) -> ProgramHandle {
        let program = ProgramHandle::new(self.mint());
        let locations = reflection
            .uniform_elements()
            .into_iter()
            .map(|(name, _)| (name, UniformLocation::new(self.mint())))
            .collect();
        log::trace!("RecordingDevice: registered program {program:?}");
        self.programs.insert(
            program,
            ProgramState {
                reflection,
                locations,
            },
        );
        program
    }

    /// Every command received so far.
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drain the recorded commands.
    pub fn take_commands(&mut self) -> Vec<DeviceCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of recorded draw calls.
    pub fn draw_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_draw()).count()
    }

    /// Bytes last written to a buffer.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.contents.as_slice())
    }

    /// Buffer contents reinterpreted as `f32`.
    pub fn buffer_floats(&self, buffer: BufferHandle) -> Option<Vec<f32>> {
        self.buffer_contents(buffer)
            .map(bytemuck::pod_collect_to_vec)
    }

    /// How many times a buffer's storage was (re)allocated.
    pub fn allocation_count(&self, buffer: BufferHandle) -> usize {
        self.buffers.get(&buffer).map_or(0, |b| b.allocations)
    }

    /// Number of buffers created and not yet deleted.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of compiled stages not yet deleted.
    pub fn live_stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    fn mint(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn record(&mut self, command: DeviceCommand) {
        self.commands.push(command);
    }
}

impl Device for RecordingDevice {
    fn name(&self) -> &str {
        "Recording Device"
    }

    fn create_buffer(&mut self, descriptor: &BufferDescriptor) -> GraphicsResult<BufferHandle> {
        let buffer = BufferHandle::new(self.mint());
        log::trace!(
            "RecordingDevice: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        let mut state = BufferState::default();
        if descriptor.size > 0 {
            state.contents = vec![0; descriptor.size as usize];
            state.allocations = 1;
        }
        self.buffers.insert(buffer, state);
        self.record(DeviceCommand::CreateBuffer {
            buffer,
            size: descriptor.size,
            usage: descriptor.usage,
        });
        Ok(buffer)
    }

    fn bind_buffer(&mut self, buffer: BufferHandle) {
        self.record(DeviceCommand::BindBuffer(buffer));
    }

    fn allocate_buffer(&mut self, buffer: BufferHandle, contents: &[u8], usage: BufferUsage) {
        log::trace!("RecordingDevice: allocating {} bytes for {buffer:?}", contents.len());
        let state = self.buffers.entry(buffer).or_default();
        state.contents = contents.to_vec();
        state.allocations += 1;
        self.record(DeviceCommand::AllocateBuffer {
            buffer,
            size: contents.len(),
            usage,
        });
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, contents: &[u8]) {
        match self.buffers.get_mut(&buffer) {
            Some(state) if state.contents.len() == contents.len() => {
                state.contents.copy_from_slice(contents);
            }
            Some(state) => log::error!(
                "RecordingDevice: upload of {} bytes into {buffer:?} allocated with {} bytes",
                contents.len(),
                state.contents.len()
            ),
            None => log::error!("RecordingDevice: upload into unknown buffer {buffer:?}"),
        }
        self.record(DeviceCommand::UploadBuffer {
            buffer,
            size: contents.len(),
        });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.record(DeviceCommand::DeleteBuffer(buffer));
    }

    fn create_vertex_array(&mut self) -> GraphicsResult<VertexArrayHandle> {
        let vertex_array = VertexArrayHandle::new(self.mint());
        self.record(DeviceCommand::CreateVertexArray(vertex_array));
        Ok(vertex_array)
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.record(DeviceCommand::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.record(DeviceCommand::DeleteVertexArray(vertex_array));
    }

    fn set_attribute_binding(&mut self, binding: &AttributeBinding) {
        self.record(DeviceCommand::SetAttributeBinding(*binding));
    }

    fn bind_target_surface(&mut self, framebuffer: Option<FramebufferHandle>) {
        self.record(DeviceCommand::BindTargetSurface(framebuffer));
    }

    fn drawing_buffer_size(&self) -> (u32, u32) {
        self.drawing_buffer_size
    }

    fn set_viewport(&mut self, rect: PixelRect) {
        self.record(DeviceCommand::SetViewport(rect));
    }

    fn set_scissor(&mut self, rect: PixelRect) {
        self.record(DeviceCommand::SetScissor(rect));
    }

    fn clear(&mut self, color: ClearColor) {
        self.record(DeviceCommand::Clear(color));
    }

    fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<StageHandle, String> {
        let failure = self
            .compile_failures
            .iter()
            .find(|(pattern, _)| source.contains(pattern.as_str()))
            .map(|(_, info_log)| info_log.clone());
        let result = match failure {
            Some(info_log) => Err(info_log),
            None => {
                let handle = StageHandle::new(self.mint());
                self.stages.insert(handle, source.to_string());
                Ok(handle)
            }
        };
        log::trace!("RecordingDevice: compiled {stage} stage: {}", result.is_ok());
        self.record(DeviceCommand::CompileStage {
            stage,
            result: result.as_ref().ok().copied(),
        });
        result
    }

    fn link_program(
        &mut self,
        vertex: StageHandle,
        fragment: StageHandle,
    ) -> Result<ProgramHandle, String> {
        let vertex_source = self.stages.get(&vertex).cloned().unwrap_or_default();
        let fragment_source = self.stages.get(&fragment).cloned().unwrap_or_default();
        let failure = self
            .link_failures
            .iter()
            .find(|(pattern, _)| {
                vertex_source.contains(pattern.as_str()) || fragment_source.contains(pattern.as_str())
            })
            .map(|(_, info_log)| info_log.clone());

        let result = match failure {
            Some(info_log) => Err(info_log),
            None => {
                let reflection = self
                    .reflections
                    .iter()
                    .find(|(source, _)| *source == vertex_source)
                    .map(|(_, reflection)| reflection.clone())
                    .unwrap_or_default();
                Ok(self.create_program(reflection))
            }
        };
        self.record(DeviceCommand::LinkProgram {
            vertex,
            fragment,
            result: result.as_ref().ok().copied(),
        });
        result
    }

    fn delete_stage(&mut self, stage: StageHandle) {
        self.stages.remove(&stage);
        self.record(DeviceCommand::DeleteStage(stage));
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.record(DeviceCommand::DeleteProgram(program));
    }

    fn reflect_program(&self, program: ProgramHandle) -> ProgramReflection {
        self.programs
            .get(&program)
            .map(|p| p.reflection.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        self.programs.get(&program)?.locations.get(name).copied()
    }

    fn max_texture_units(&self) -> u32 {
        self.max_texture_units
    }

    fn use_shader_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
        self.record(DeviceCommand::UseProgram(program));
    }

    fn set_uniform(
        &mut self,
        location: UniformLocation,
        function: UniformFunction,
        value: UniformValue<'_>,
        transpose: bool,
    ) {
        let value = match value {
            UniformValue::Float(v) => UniformData::Float(v.to_vec()),
            UniformValue::Int(v) => UniformData::Int(v.to_vec()),
        };
        self.record(DeviceCommand::SetUniform {
            location,
            function,
            value,
            transpose,
        });
    }

    fn create_texture(&mut self, width: u32, height: u32) -> GraphicsResult<TextureHandle> {
        let texture = TextureHandle::new(self.mint());
        log::trace!("RecordingDevice: creating texture {texture:?} ({width}x{height})");
        self.record(DeviceCommand::CreateTexture {
            texture,
            width,
            height,
        });
        Ok(texture)
    }

    fn create_framebuffer(&mut self, color: TextureHandle) -> GraphicsResult<FramebufferHandle> {
        let framebuffer = FramebufferHandle::new(self.mint());
        self.record(DeviceCommand::CreateFramebuffer { framebuffer, color });
        Ok(framebuffer)
    }

    fn bind_texture_to_unit(&mut self, unit: u32, texture: TextureHandle) {
        self.record(DeviceCommand::BindTexture { unit, texture });
    }

    fn draw(&mut self, mode: PrimitiveMode, vertex_count: u32) {
        self.record(DeviceCommand::Draw { mode, vertex_count });
    }

    fn draw_instanced(&mut self, mode: PrimitiveMode, vertex_count: u32, instance_count: u32) {
        self.record(DeviceCommand::DrawInstanced {
            mode,
            vertex_count,
            instance_count,
        });
    }
}
