//! Geometry: records per divisor group, mirrored into a ring of vertex arrays.
//!
//! A [`Geometry`] owns one [`RecordBacking`] per divisor group of its
//! [`VertexArraySchema`], plus a [`FrameRing`] of vertex arrays with one
//! buffer per group. Each [`sync`](Geometry::sync) moves to the next vertex
//! array and uploads whatever it has not seen yet:
//!
//! - a streaming group is uploaded on every sync;
//! - a group marked dirty is uploaded on the next `ring_size` syncs, so every
//!   vertex array in the ring eventually catches up;
//! - a clean, non-streaming group is not uploaded at all.
//!
//! # Example
//!
//! ```ignore
//! let schema = Arc::new(shader.geometry_schema(&layout)?);
//! let mut sprites = Geometry::new(device, schema, &GeometryDescriptor::new().with_instances(256))?;
//!
//! let sprite = sprites.acquire()?;
//! sprites.write(&sprite, "transform", &affine_2d(position, angle, scale))?;
//!
//! // Each frame
//! sprites.sync(device);
//! sprites.draw(device, PrimitiveMode::TriangleStrip);
//! ```

use std::sync::Arc;

use archimedes_core::math::PackedValue;
use archimedes_core::profiling::{profile_plot, profile_scope};

use crate::backend::Device;
use crate::error::{GraphicsError, GraphicsResult};
use crate::resources::{FrameRing, VertexBuffer};
use crate::types::{BufferDescriptor, BufferHandle, BufferUsage, PrimitiveMode, VertexArrayHandle};

use super::backing::{Record, RecordBacking};
use super::layout::{GroupSchema, VertexArraySchema};

/// Default number of vertex arrays a geometry cycles through.
pub const DEFAULT_RING_SIZE: usize = 3;

/// Descriptor for creating a [`Geometry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeometryDescriptor {
    /// Debug label, used for buffer labels.
    pub label: Option<String>,
    /// Records to reserve in the per-vertex group.
    pub vertices: usize,
    /// Instances to reserve room for in each instanced group.
    pub instances: usize,
    /// Number of vertex arrays to cycle through.
    pub ring_size: usize,
}

impl Default for GeometryDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            vertices: 0,
            instances: 0,
            ring_size: DEFAULT_RING_SIZE,
        }
    }
}

impl GeometryDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_vertices(mut self, vertices: usize) -> Self {
        self.vertices = vertices;
        self
    }

    pub fn with_instances(mut self, instances: usize) -> Self {
        self.instances = instances;
        self
    }

    pub fn with_ring_size(mut self, ring_size: usize) -> Self {
        self.ring_size = ring_size;
        self
    }
}

/// One vertex array object with a buffer per divisor group.
#[derive(Debug)]
struct VertexArray {
    handle: VertexArrayHandle,
    buffers: Vec<VertexBuffer>,
}

impl VertexArray {
    fn new(
        device: &mut dyn Device,
        schema: &VertexArraySchema,
        label: Option<&str>,
    ) -> GraphicsResult<Self> {
        let handle = device.create_vertex_array()?;
        device.bind_vertex_array(handle);

        let mut buffers = Vec::with_capacity(schema.len());
        for group in schema.groups() {
            let usage = if group.stream {
                BufferUsage::VERTEX | BufferUsage::STREAM
            } else {
                BufferUsage::VERTEX | BufferUsage::DYNAMIC
            };
            let mut descriptor = BufferDescriptor::new(0, usage);
            if let Some(label) = label {
                descriptor = descriptor.with_label(format!("{label}_{}", group.name()));
            }
            let buffer = VertexBuffer::new(device, descriptor)?;
            device.bind_buffer(buffer.handle());
            for binding in group.record.bindings(group.divisor) {
                device.set_attribute_binding(&binding);
            }
            buffers.push(buffer);
        }

        Ok(Self { handle, buffers })
    }

    fn destroy(self, device: &mut dyn Device) {
        for buffer in self.buffers {
            buffer.destroy(device);
        }
        device.delete_vertex_array(self.handle);
    }
}

#[derive(Debug)]
struct DivisorGroup {
    divisor: u32,
    stream: bool,
    backing: RecordBacking,
    dirty: bool,
    /// Syncs left before every vertex array has this group's contents.
    pending_uploads: usize,
}

/// Instanced, multi-buffered vertex storage for one shader's attributes.
#[derive(Debug)]
pub struct Geometry {
    label: Option<String>,
    schema: Arc<VertexArraySchema>,
    groups: Vec<DivisorGroup>,
    ring: FrameRing<VertexArray>,
}

impl Geometry {
    /// Create the record stores and `ring_size` vertex arrays.
    pub fn new(
        device: &mut dyn Device,
        schema: Arc<VertexArraySchema>,
        descriptor: &GeometryDescriptor,
    ) -> GraphicsResult<Self> {
        if descriptor.ring_size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "geometry ring size must be at least 1".to_string(),
            ));
        }

        let groups = schema
            .groups()
            .iter()
            .map(|group| {
                let reserve = match group.divisor {
                    0 => descriptor.vertices,
                    _ => group.records_for(descriptor.instances),
                };
                DivisorGroup {
                    divisor: group.divisor,
                    stream: group.stream,
                    backing: RecordBacking::new(group.record.clone(), reserve),
                    dirty: false,
                    pending_uploads: descriptor.ring_size,
                }
            })
            .collect();

        let mut arrays = Vec::with_capacity(descriptor.ring_size);
        for _ in 0..descriptor.ring_size {
            arrays.push(VertexArray::new(device, &schema, descriptor.label.as_deref())?);
        }

        log::debug!(
            "Created geometry {:?} with {} group(s) and {} vertex array(s)",
            descriptor.label,
            schema.len(),
            descriptor.ring_size
        );

        Ok(Self {
            label: descriptor.label.clone(),
            schema,
            groups,
            ring: FrameRing::new(arrays)?,
        })
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn schema(&self) -> &Arc<VertexArraySchema> {
        &self.schema
    }

    /// Number of vertex arrays in the ring.
    pub fn ring_size(&self) -> usize {
        self.ring.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Record store of a divisor group.
    pub fn backing(&self, group: usize) -> Option<&RecordBacking> {
        self.groups.get(group).map(|g| &g.backing)
    }

    /// Acquire a record in the first divisor group.
    pub fn acquire(&mut self) -> GraphicsResult<Record> {
        self.acquire_in(0)
    }

    /// Acquire a record in the given divisor group.
    pub fn acquire_in(&mut self, group: usize) -> GraphicsResult<Record> {
        let group = self
            .groups
            .get_mut(group)
            .ok_or(GraphicsError::InvalidGroup(group))?;
        group.dirty = true;
        Ok(group.backing.acquire())
    }

    /// Release a record back to its group.
    pub fn release(&mut self, record: Record) -> GraphicsResult<()> {
        let index = self.group_of(&record)?;
        let group = &mut self.groups[index];
        let live = group.backing.len();
        group.backing.release(record)?;
        if group.backing.len() != live {
            group.dirty = true;
        }
        Ok(())
    }

    /// Release every record of a group.
    pub fn clear(&mut self, group: usize) -> GraphicsResult<()> {
        let group = self
            .groups
            .get_mut(group)
            .ok_or(GraphicsError::InvalidGroup(group))?;
        group.backing.clear();
        group.dirty = true;
        Ok(())
    }

    /// Read a field of a record.
    pub fn field(&self, record: &Record, name: &str) -> Option<&[f32]> {
        let index = self.group_of(record).ok()?;
        let group = &self.groups[index];
        let field = group.backing.schema().field(name)?;
        group.backing.field(record, field)
    }

    /// Mutable access to a field of a record. Marks the record's group dirty.
    pub fn field_mut(&mut self, record: &Record, name: &str) -> Option<&mut [f32]> {
        let index = self.group_of(record).ok()?;
        let group = &mut self.groups[index];
        let field = group.backing.schema().field(name)?;
        let slice = group.backing.field_mut(record, field)?;
        group.dirty = true;
        Some(slice)
    }

    /// Write a packed value into a field of a record.
    pub fn write<V: PackedValue + ?Sized>(
        &mut self,
        record: &Record,
        name: &str,
        value: &V,
    ) -> GraphicsResult<()> {
        let expected = self
            .field(record, name)
            .ok_or_else(|| GraphicsError::UnknownAttribute(name.to_string()))?
            .len();
        let packed = value.packed();
        if packed.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "attribute {name} holds {expected} elements, got {}",
                packed.len()
            )));
        }
        if let Some(slice) = self.field_mut(record, name) {
            slice.copy_from_slice(packed);
        }
        Ok(())
    }

    /// Schedule a group for upload to every vertex array.
    pub fn mark_dirty(&mut self, group: usize) -> GraphicsResult<()> {
        let group = self
            .groups
            .get_mut(group)
            .ok_or(GraphicsError::InvalidGroup(group))?;
        group.dirty = true;
        Ok(())
    }

    /// Whether a group has changes not yet seen by a sync.
    pub fn is_dirty(&self, group: usize) -> bool {
        self.groups.get(group).is_some_and(|g| g.dirty)
    }

    /// Syncs left before every vertex array has a group's contents.
    pub fn pending_uploads(&self, group: usize) -> usize {
        self.groups.get(group).map_or(0, |g| g.pending_uploads)
    }

    /// Move to the next vertex array and upload the groups it is missing.
    pub fn sync(&mut self, device: &mut dyn Device) {
        profile_scope!("geometry_sync");

        self.ring.advance();
        let ring_size = self.ring.len();
        let array = self.ring.top_mut();

        let mut uploaded = 0;
        for (group, buffer) in self.groups.iter_mut().zip(array.buffers.iter_mut()) {
            if std::mem::take(&mut group.dirty) || group.stream {
                group.pending_uploads = ring_size;
            }
            if group.pending_uploads > 0 {
                let contents = group.backing.as_bytes();
                buffer.upload(device, contents);
                uploaded += contents.len();
                group.pending_uploads -= 1;
            }
        }

        profile_plot!("geometry_upload_bytes", uploaded);
        log::trace!(
            "Synced geometry {:?} into vertex array {} ({uploaded} bytes)",
            self.label,
            self.ring.current_index()
        );
    }

    /// Vertices per instance: the per-vertex record count, or 1 without a
    /// per-vertex group.
    pub fn count_vertices(&self) -> u32 {
        self.groups
            .iter()
            .find(|g| g.divisor == 0)
            .map_or(1, |g| clamp_count(g.backing.len()))
    }

    /// Instances covered by every instanced group, or `None` if there are no
    /// instanced groups.
    pub fn count_instances(&self) -> Option<u32> {
        self.groups
            .iter()
            .filter(|g| g.divisor > 0)
            .map(|g| g.divisor.saturating_mul(clamp_count(g.backing.len())))
            .min()
    }

    /// Draw from the current vertex array.
    ///
    /// Instanced geometry with zero instances issues no draw call.
    pub fn draw(&self, device: &mut dyn Device, mode: PrimitiveMode) {
        profile_scope!("geometry_draw");

        device.bind_vertex_array(self.ring.top().handle);
        let vertices = self.count_vertices();
        match self.count_instances() {
            None => device.draw(mode, vertices),
            Some(0) => {}
            Some(instances) => device.draw_instanced(mode, vertices, instances),
        }
    }

    /// Vertex array at ring position `index`.
    pub fn vertex_array(&self, index: usize) -> Option<VertexArrayHandle> {
        self.ring.get(index).map(|array| array.handle)
    }

    /// Buffer of `group` in the vertex array at ring position `index`.
    pub fn buffer(&self, index: usize, group: usize) -> Option<BufferHandle> {
        self.ring
            .get(index)?
            .buffers
            .get(group)
            .map(VertexBuffer::handle)
    }

    /// Ring position of the vertex array the next draw uses.
    pub fn current_index(&self) -> usize {
        self.ring.current_index()
    }

    /// Group schema of a divisor group.
    pub fn group_schema(&self, group: usize) -> Option<&GroupSchema> {
        self.schema.group(group)
    }

    /// Delete every vertex array and buffer.
    pub fn destroy(self, device: &mut dyn Device) {
        for array in self.ring.into_inner() {
            array.destroy(device);
        }
    }

    fn group_of(&self, record: &Record) -> GraphicsResult<usize> {
        self.groups
            .iter()
            .position(|g| g.backing.id() == record.backing())
            .ok_or(GraphicsError::ForeignRecord)
    }
}

/// Record count as a draw argument, saturating at `u32::MAX`.
fn clamp_count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
