//! Buffer usage flags and descriptors.

use bitflags::bitflags;

bitflags! {
    /// Usage flags for device buffers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Buffer holds vertex attribute data.
        const VERTEX = 1 << 0;
        /// Contents are respecified every frame.
        const STREAM = 1 << 1;
        /// Contents are respecified occasionally.
        const DYNAMIC = 1 << 2;
    }
}

impl Default for BufferUsage {
    fn default() -> Self {
        Self::VERTEX | Self::DYNAMIC
    }
}

/// Descriptor for creating a device buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Initial size in bytes. Zero leaves the buffer unallocated.
    pub size: u64,
    /// Usage flags.
    pub usage: BufferUsage,
}

impl BufferDescriptor {
    /// Create a new buffer descriptor.
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self {
            label: None,
            size,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
