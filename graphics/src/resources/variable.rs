//! Shared, mutable uniform values.

use std::sync::Arc;

use archimedes_core::math::PackedValue;
use parking_lot::{RwLock, RwLockReadGuard};

use crate::backend::UniformValue;

/// Owned uniform data.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformData {
    Float(Vec<f32>),
    Int(Vec<i32>),
}

impl UniformData {
    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Float(v) => v.len(),
            Self::Int(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    /// Borrow as a device uniform value.
    pub fn as_value(&self) -> UniformValue<'_> {
        match self {
            Self::Float(v) => UniformValue::Float(v),
            Self::Int(v) => UniformValue::Int(v),
        }
    }
}

/// A uniform value shared between application code and compiled render
/// passes.
///
/// Passes hold the variable, not its value: updating a variable changes what
/// every later run of the render procedure uploads, without recompiling.
///
/// # Example
///
/// ```ignore
/// let camera = Variable::shared_float(&Mat3::identity());
/// let pass = RenderPass::canvas("sprites").with_uniform("camera", camera.clone());
///
/// // Later, each frame
/// camera.set_float(&view_matrix);
/// ```
#[derive(Debug)]
pub struct Variable {
    data: RwLock<UniformData>,
}

impl Variable {
    pub fn new(data: UniformData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Float variable holding the packed elements of `value`.
    pub fn from_float<V: PackedValue + ?Sized>(value: &V) -> Self {
        Self::new(UniformData::Float(value.packed().to_vec()))
    }

    /// Integer variable (ints, bools, sampler units).
    pub fn from_ints(values: &[i32]) -> Self {
        Self::new(UniformData::Int(values.to_vec()))
    }

    pub fn shared_float<V: PackedValue + ?Sized>(value: &V) -> Arc<Self> {
        Arc::new(Self::from_float(value))
    }

    pub fn shared_ints(values: &[i32]) -> Arc<Self> {
        Arc::new(Self::from_ints(values))
    }

    /// Replace the value with float data.
    pub fn set_float<V: PackedValue + ?Sized>(&self, value: &V) {
        let mut data = self.data.write();
        match &mut *data {
            UniformData::Float(current) if current.len() == value.element_count() => {
                current.copy_from_slice(value.packed());
            }
            other => *other = UniformData::Float(value.packed().to_vec()),
        }
    }

    /// Replace the value with integer data.
    pub fn set_ints(&self, values: &[i32]) {
        *self.data.write() = UniformData::Int(values.to_vec());
    }

    /// Lock the value for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, UniformData> {
        self.data.read()
    }

    /// A copy of the current value.
    pub fn get(&self) -> UniformData {
        self.data.read().clone()
    }
}

static_assertions::assert_impl_all!(Variable: Send, Sync);
