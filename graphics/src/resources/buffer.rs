//! Device vertex buffer resource.

use crate::backend::Device;
use crate::error::GraphicsResult;
use crate::types::{BufferDescriptor, BufferHandle};

/// A device vertex buffer that tracks the size of its last allocation.
///
/// Uploading contents of a different length reallocates the buffer; same
/// length contents are written in place.
///
/// # Example
///
/// ```ignore
/// let mut buffer = VertexBuffer::new(device, BufferDescriptor::default())?;
/// buffer.upload(device, backing.as_bytes());
/// ```
pub struct VertexBuffer {
    handle: BufferHandle,
    descriptor: BufferDescriptor,
    allocated: Option<usize>,
}

impl VertexBuffer {
    /// Create the device buffer.
    pub fn new(device: &mut dyn Device, descriptor: BufferDescriptor) -> GraphicsResult<Self> {
        let handle = device.create_buffer(&descriptor)?;
        Ok(Self {
            handle,
            descriptor,
            allocated: None,
        })
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn descriptor(&self) -> &BufferDescriptor {
        &self.descriptor
    }

    /// Get the buffer label, if set.
    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }

    /// Size of the last allocation in bytes, if any.
    pub fn allocated_size(&self) -> Option<usize> {
        self.allocated
    }

    /// Replace the buffer's full contents.
    ///
    /// Returns `true` if the buffer had to be reallocated.
    pub fn upload(&mut self, device: &mut dyn Device, contents: &[u8]) -> bool {
        device.bind_buffer(self.handle);
        if self.allocated == Some(contents.len()) {
            device.upload_buffer(self.handle, contents);
            false
        } else {
            log::trace!(
                "Reallocating vertex buffer {:?} to {} bytes",
                self.descriptor.label,
                contents.len()
            );
            device.allocate_buffer(self.handle, contents, self.descriptor.usage);
            self.allocated = Some(contents.len());
            true
        }
    }

    /// Destroy the device buffer.
    pub fn destroy(self, device: &mut dyn Device) {
        device.delete_buffer(self.handle);
    }
}

impl std::fmt::Debug for VertexBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VertexBuffer")
            .field("handle", &self.handle)
            .field("allocated", &self.allocated)
            .field("usage", &self.descriptor.usage)
            .field("label", &self.descriptor.label)
            .finish()
    }
}

// Ensure VertexBuffer is Send + Sync
static_assertions::assert_impl_all!(VertexBuffer: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceCommand, RecordingDevice};
    use crate::types::BufferUsage;

    #[test]
    fn test_first_upload_allocates() {
        let mut device = RecordingDevice::new();
        let mut buffer = VertexBuffer::new(&mut device, BufferDescriptor::default()).unwrap();
        assert_eq!(buffer.allocated_size(), None);

        assert!(buffer.upload(&mut device, &[0u8; 16]));
        assert!(!buffer.upload(&mut device, &[1u8; 16]));
        assert!(buffer.upload(&mut device, &[2u8; 32]));

        assert_eq!(buffer.allocated_size(), Some(32));
        assert_eq!(device.allocation_count(buffer.handle()), 2);
        assert_eq!(device.buffer_contents(buffer.handle()), Some(&[2u8; 32][..]));
    }

    #[test]
    fn test_upload_uses_descriptor_usage() {
        let mut device = RecordingDevice::new();
        let usage = BufferUsage::VERTEX | BufferUsage::STREAM;
        let mut buffer = VertexBuffer::new(&mut device, BufferDescriptor::new(0, usage)).unwrap();
        buffer.upload(&mut device, &[0u8; 4]);
        assert!(device.commands().iter().any(|c| matches!(
            c,
            DeviceCommand::AllocateBuffer { usage: u, .. } if *u == usage
        )));
    }

    #[test]
    fn test_buffer_debug() {
        let mut device = RecordingDevice::new();
        let buffer = VertexBuffer::new(
            &mut device,
            BufferDescriptor::default().with_label("sprites"),
        )
        .unwrap();
        let debug = format!("{:?}", buffer);
        assert!(debug.contains("VertexBuffer"));
        assert!(debug.contains("sprites"));
    }
}
