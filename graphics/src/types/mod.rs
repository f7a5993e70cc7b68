//! Common types for the device vocabulary.
//!
//! This module contains the attribute type table, device handles, usage flags
//! and the small value types passed to [`Device`](crate::backend::Device).

mod attribute;
mod buffer;
mod common;
mod handles;

pub use attribute::{AttributeType, ElementKind, TypeDescriptor, UniformFunction};
pub use buffer::{BufferDescriptor, BufferUsage};
pub use common::{ClearColor, PixelRect, PrimitiveMode};
pub use handles::{
    BufferHandle, FramebufferHandle, ProgramHandle, StageHandle, TextureHandle, UniformLocation,
    VertexArrayHandle,
};
