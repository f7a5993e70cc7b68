//! Textures, framebuffers and the image references render passes use.

use std::fmt;
use std::sync::Arc;

use crate::backend::Device;
use crate::error::GraphicsResult;
use crate::types::{FramebufferHandle, TextureHandle};

/// A device texture that shaders can sample.
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    handle: TextureHandle,
    width: u32,
    height: u32,
}

impl Texture {
    /// Create an RGBA texture on the device.
    pub fn new(device: &mut dyn Device, width: u32, height: u32) -> GraphicsResult<Self> {
        let handle = device.create_texture(width, height)?;
        log::debug!("Created {width}x{height} texture {handle:?}");
        Ok(Self::from_handle(handle, width, height))
    }

    /// Wrap a texture created elsewhere.
    pub fn from_handle(handle: TextureHandle, width: u32, height: u32) -> Self {
        Self {
            handle,
            width,
            height,
        }
    }

    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// An offscreen render target backed by a color texture.
///
/// A framebuffer can be drawn into by one pass and sampled by a later one.
#[derive(Debug, PartialEq, Eq)]
pub struct Framebuffer {
    handle: FramebufferHandle,
    color: Texture,
}

impl Framebuffer {
    /// Create a color texture and a framebuffer rendering into it.
    pub fn new(device: &mut dyn Device, width: u32, height: u32) -> GraphicsResult<Self> {
        let color = Texture::new(device, width, height)?;
        let handle = device.create_framebuffer(color.handle())?;
        Ok(Self { handle, color })
    }

    pub fn handle(&self) -> FramebufferHandle {
        self.handle
    }

    /// The color attachment.
    pub fn texture(&self) -> &Texture {
        &self.color
    }

    pub fn width(&self) -> u32 {
        self.color.width
    }

    pub fn height(&self) -> u32 {
        self.color.height
    }
}

/// A reference to something a pass can draw into or sample from.
///
/// | Variant       | Drawable (surface) | Sampleable (texture) |
/// |---------------|--------------------|----------------------|
/// | `Canvas`      | yes                | no                   |
/// | `Framebuffer` | yes                | yes                  |
/// | `Texture`     | no                 | yes                  |
///
/// Two references are the same image when they are both the canvas or point
/// at the same allocation.
#[derive(Clone)]
pub enum ImageRef {
    /// The default drawing buffer.
    Canvas,
    Framebuffer(Arc<Framebuffer>),
    Texture(Arc<Texture>),
}

impl ImageRef {
    /// Whether a pass can draw into this image.
    pub fn is_surface(&self) -> bool {
        matches!(self, Self::Canvas | Self::Framebuffer(_))
    }

    /// Whether a shader can sample this image.
    pub fn is_texture(&self) -> bool {
        matches!(self, Self::Framebuffer(_) | Self::Texture(_))
    }

    /// Texture to bind when sampling, if sampleable.
    pub fn texture_handle(&self) -> Option<TextureHandle> {
        match self {
            Self::Canvas => None,
            Self::Framebuffer(fb) => Some(fb.texture().handle()),
            Self::Texture(texture) => Some(texture.handle()),
        }
    }

    /// Identity of the referenced allocation. The canvas is `0`.
    pub(crate) fn identity(&self) -> usize {
        match self {
            Self::Canvas => 0,
            Self::Framebuffer(fb) => Arc::as_ptr(fb) as usize,
            Self::Texture(texture) => Arc::as_ptr(texture) as usize,
        }
    }

    /// Whether both references name the same image.
    pub fn same_image(&self, other: &ImageRef) -> bool {
        self.identity() == other.identity()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::Framebuffer(_) => "framebuffer",
            Self::Texture(_) => "texture",
        }
    }
}

impl fmt::Debug for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canvas => f.write_str("Canvas"),
            Self::Framebuffer(fb) => f.debug_tuple("Framebuffer").field(&fb.handle).finish(),
            Self::Texture(texture) => f.debug_tuple("Texture").field(&texture.handle).finish(),
        }
    }
}

impl From<Arc<Framebuffer>> for ImageRef {
    fn from(framebuffer: Arc<Framebuffer>) -> Self {
        Self::Framebuffer(framebuffer)
    }
}

impl From<Arc<Texture>> for ImageRef {
    fn from(texture: Arc<Texture>) -> Self {
        Self::Texture(texture)
    }
}

static_assertions::assert_impl_all!(ImageRef: Send, Sync);
