//! Device resources.
//!
//! This module contains the resource types owned by geometry and render
//! passes:
//! - [`VertexBuffer`] - device buffer that reallocates only on size change
//! - [`FrameRing`] - N-deep ring of per-frame copies of a resource
//! - [`Texture`], [`Framebuffer`] and [`ImageRef`] - images passes draw into or sample
//! - [`Variable`] - shared uniform value read by compiled passes
//!
//! Images and variables are shared with [`Arc`]; render pass compilation
//! tells them apart by pointer identity.
//!
//! [`Arc`]: std::sync::Arc

mod buffer;
mod image;
mod ring_buffer;
mod variable;

pub use buffer::VertexBuffer;
pub use image::{Framebuffer, ImageRef, Texture};
pub use ring_buffer::FrameRing;
pub use variable::{UniformData, Variable};
