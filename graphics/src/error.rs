//! Graphics error types.

use thiserror::Error;

use crate::types::AttributeType;

/// Errors that can occur while building schemas, storage or device resources.
///
/// Render pass problems are not errors: the pass compiler reports them as
/// [`Diagnostic`](crate::pass::Diagnostic)s and keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// An interleaved record is wider than the device allows.
    #[error("record stride of {stride_bytes} bytes exceeds the device limit of {max_bytes} bytes")]
    SchemaTooLarge { stride_bytes: usize, max_bytes: usize },
    /// An attribute name appears twice in one schema.
    #[error("duplicate attribute: {0}")]
    DuplicateAttribute(String),
    /// An attribute name is not part of the schema.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    /// An attribute type cannot be stored in a vertex record.
    #[error("attribute {name} has type {ty}, which cannot be stored in a vertex buffer")]
    InvalidAttributeType { name: String, ty: AttributeType },
    /// A divisor group index is out of range.
    #[error("no divisor group at index {0}")]
    InvalidGroup(usize),
    /// A record handle belongs to a different store.
    #[error("record handle belongs to a different store")]
    ForeignRecord,
    /// A shader declares more samplers than the device has texture units.
    #[error("{samplers} samplers cannot be assigned to {units} texture units")]
    TooManySamplers { samplers: usize, units: u32 },
    /// The device failed to create a resource.
    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),
    /// A shader stage failed to compile or a program failed to link.
    #[error("shader build failed: {0}")]
    ShaderBuildFailed(String),
    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result alias for graphics operations.
pub type GraphicsResult<T> = Result<T, GraphicsError>;
