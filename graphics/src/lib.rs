//! # Archimedes Graphics
//!
//! Rendering core of the Archimedes 2D engine: interleaved, instanced vertex
//! storage kept in sync with a pipelined device, and a compiler that turns a
//! declarative list of render passes into a minimal sequence of state changes
//! and draw calls.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`Device`] - The command vocabulary consumed from the graphics device
//! - [`Geometry`] - Per-divisor record arenas mirrored into a ring of vertex arrays
//! - [`Shader`] and [`ShaderLibrary`] - Reflected programs with fixed sampler units
//! - [`RenderPass`] and [`compile_renderer`] - Declarative passes and their compiler
//! - [`RecordingDevice`] - A device that records commands, for tests and inspection
//!
//! ## Example
//!
//! ```ignore
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use archimedes_graphics::{
//!     Geometry, GeometryDescriptor, GeometryLayout, PrimitiveMode, RenderPass,
//!     compile_renderer,
//! };
//!
//! let schema = Arc::new(shader.geometry_schema(&GeometryLayout::new())?);
//! let descriptor = GeometryDescriptor::new().with_label("sprites").with_instances(64);
//! let sprites = Rc::new(RefCell::new(Geometry::new(&mut device, schema, &descriptor)?));
//!
//! let sprite = sprites.borrow_mut().acquire_in(1)?;
//! sprites.borrow_mut().write(&sprite, "offset", &[0.0f32, 0.0])?;
//!
//! let drawn = sprites.clone();
//! let renderer = compile_renderer(&[RenderPass::draw_to_canvas("sprites")
//!     .with_shader(shader)
//!     .with_draw(move |device| drawn.borrow().draw(device, PrimitiveMode::TriangleStrip))]);
//!
//! // Each frame
//! sprites.borrow_mut().sync(&mut device);
//! renderer.run(&mut device);
//! ```

pub mod backend;
pub mod error;
pub mod pass;
pub mod resources;
pub mod shader;
mod table;
pub mod types;
pub mod vertex;

// Re-export main types for convenience
pub use backend::{Device, DeviceCommand, RecordingDevice, UniformValue};
pub use error::{GraphicsError, GraphicsResult};
pub use pass::{
    CompiledRenderer, Diagnostic, DrawCallback, Environment, PassField, RenderPass, Severity,
    compile_renderer,
};
pub use resources::{Framebuffer, ImageRef, Texture, UniformData, Variable};
pub use shader::{ProgramReflection, Shader, ShaderLibrary, ShaderSources};
pub use types::{AttributeType, BufferUsage, ClearColor, PixelRect, PrimitiveMode};
pub use vertex::{
    AttributeConfig, AttributeSchema, Geometry, GeometryDescriptor, GeometryLayout, Record,
    RecordSchema, VertexArraySchema,
};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
pub fn init() {
    log::info!("Archimedes Graphics v{} initialized", VERSION);
}
