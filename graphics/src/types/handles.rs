//! Opaque handles to device objects.
//!
//! Handles are plain integers minted by a [`Device`](crate::backend::Device)
//! implementation. The subsystem never interprets them beyond equality.

macro_rules! define_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(u64);

            impl $name {
                /// Wrap a raw device identifier.
                pub const fn new(raw: u64) -> Self {
                    Self(raw)
                }

                /// The raw device identifier.
                pub const fn raw(self) -> u64 {
                    self.0
                }
            }
        )*
    };
}

define_handle!(
    /// Handle to a device buffer.
    BufferHandle,
    /// Handle to a vertex array object.
    VertexArrayHandle,
    /// Handle to a linked shader program.
    ProgramHandle,
    /// Handle to a compiled (unlinked) shader stage.
    StageHandle,
    /// Handle to a texture.
    TextureHandle,
    /// Handle to an offscreen framebuffer.
    FramebufferHandle,
    /// Location of a uniform within a program.
    UniformLocation,
);
