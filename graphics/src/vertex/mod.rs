//! Interleaved, instanced vertex storage.
//!
//! The pieces stack bottom-up:
//! - [`AttributeSchema`] - a shader's attributes with types and locations
//! - [`RecordSchema`] - packed `f32` layout of one interleaved record
//! - [`VertexArraySchema`] - attributes split into groups by divisor
//! - [`RecordBacking`] - dense growable array of records with stable handles
//! - [`Geometry`] - one backing per group, mirrored into a ring of vertex arrays

mod backing;
mod geometry;
mod layout;
mod schema;

pub use backing::{BackingId, GROW_FACTOR, Record, RecordBacking};
pub use geometry::{DEFAULT_RING_SIZE, Geometry, GeometryDescriptor};
pub use layout::{
    AttributeBinding, AttributeConfig, GeometryLayout, GroupSchema, VertexArraySchema,
    attribute_bindings,
};
pub use schema::{
    AttributeInfo, AttributeSchema, ELEMENT_BYTES, FieldId, MAX_STRIDE_BYTES, RecordField,
    RecordSchema,
};
