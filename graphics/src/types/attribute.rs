//! Static descriptor table for attribute and uniform types.
//!
//! Every type a shader can expose as an attribute or uniform has exactly one
//! [`TypeDescriptor`]. Packing, binding and uniform upload all read from this
//! table and nothing else.

use std::fmt;

/// Primitive element type backing a shader type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    Bool,
    Sampler2d,
    SamplerCube,
}

impl ElementKind {
    /// Whether values of this kind are stored as `f32`.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float)
    }
}

/// Device-side setter used to upload a uniform of a given type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformFunction {
    Int1,
    Int2,
    Int3,
    Int4,
    Float1,
    Float2,
    Float3,
    Float4,
    Matrix2,
    Matrix3,
    Matrix4,
}

impl UniformFunction {
    /// Matrix setters take an extra transpose argument.
    pub fn is_matrix(&self) -> bool {
        matches!(self, Self::Matrix2 | Self::Matrix3 | Self::Matrix4)
    }
}

/// Immutable metadata for one shader type.
#[derive(Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Device enum code for the type.
    pub code: u32,
    /// Device name for the type.
    pub name: &'static str,
    /// Constituent element type.
    pub element_kind: ElementKind,
    /// Number of primitive elements in one value.
    pub element_count: usize,
    /// Bytes needed to store one value.
    pub byte_size: usize,
    /// Number of consecutive attribute binding slots one value occupies.
    pub slot_span: usize,
    /// Setter used to upload this type as a uniform.
    pub uniform_function: UniformFunction,
    /// Whether this is an opaque sampler type.
    pub is_sampler: bool,
}

impl TypeDescriptor {
    /// Elements covered by each binding slot. Matrices bind one column per slot.
    pub fn elements_per_slot(&self) -> usize {
        self.element_count / self.slot_span
    }
}

const fn descriptor(
    code: u32,
    name: &'static str,
    element_kind: ElementKind,
    element_count: usize,
    byte_size: usize,
    slot_span: usize,
    uniform_function: UniformFunction,
) -> TypeDescriptor {
    TypeDescriptor {
        code,
        name,
        element_kind,
        element_count,
        byte_size,
        slot_span,
        uniform_function,
        is_sampler: matches!(element_kind, ElementKind::Sampler2d | ElementKind::SamplerCube),
    }
}

use ElementKind as K;
use UniformFunction as U;

static BYTE: TypeDescriptor = descriptor(0x1400, "BYTE", K::Byte, 1, 1, 1, U::Int1);
static UNSIGNED_BYTE: TypeDescriptor =
    descriptor(0x1401, "UNSIGNED_BYTE", K::UnsignedByte, 1, 1, 1, U::Int1);
static SHORT: TypeDescriptor = descriptor(0x1402, "SHORT", K::Short, 1, 2, 1, U::Int1);
static UNSIGNED_SHORT: TypeDescriptor =
    descriptor(0x1403, "UNSIGNED_SHORT", K::UnsignedShort, 1, 2, 1, U::Int1);
static INT: TypeDescriptor = descriptor(0x1404, "INT", K::Int, 1, 4, 1, U::Int1);
static UNSIGNED_INT: TypeDescriptor =
    descriptor(0x1405, "UNSIGNED_INT", K::UnsignedInt, 1, 4, 1, U::Int1);
static FLOAT: TypeDescriptor = descriptor(0x1406, "FLOAT", K::Float, 1, 4, 1, U::Float1);
static FLOAT_VEC2: TypeDescriptor = descriptor(0x8B50, "FLOAT_VEC2", K::Float, 2, 8, 1, U::Float2);
static FLOAT_VEC3: TypeDescriptor =
    descriptor(0x8B51, "FLOAT_VEC3", K::Float, 3, 12, 1, U::Float3);
static FLOAT_VEC4: TypeDescriptor =
    descriptor(0x8B52, "FLOAT_VEC4", K::Float, 4, 16, 1, U::Float4);
static INT_VEC2: TypeDescriptor = descriptor(0x8B53, "INT_VEC2", K::Int, 2, 8, 1, U::Int2);
static INT_VEC3: TypeDescriptor = descriptor(0x8B54, "INT_VEC3", K::Int, 3, 12, 1, U::Int3);
static INT_VEC4: TypeDescriptor = descriptor(0x8B55, "INT_VEC4", K::Int, 4, 16, 1, U::Int4);
static BOOL: TypeDescriptor = descriptor(0x8B56, "BOOL", K::Bool, 1, 4, 1, U::Int1);
static BOOL_VEC2: TypeDescriptor = descriptor(0x8B57, "BOOL_VEC2", K::Bool, 2, 8, 1, U::Int2);
static BOOL_VEC3: TypeDescriptor = descriptor(0x8B58, "BOOL_VEC3", K::Bool, 3, 12, 1, U::Int3);
static BOOL_VEC4: TypeDescriptor = descriptor(0x8B59, "BOOL_VEC4", K::Bool, 4, 16, 1, U::Int4);
static FLOAT_MAT2: TypeDescriptor =
    descriptor(0x8B5A, "FLOAT_MAT2", K::Float, 4, 16, 2, U::Matrix2);
static FLOAT_MAT3: TypeDescriptor =
    descriptor(0x8B5B, "FLOAT_MAT3", K::Float, 9, 36, 3, U::Matrix3);
static FLOAT_MAT4: TypeDescriptor =
    descriptor(0x8B5C, "FLOAT_MAT4", K::Float, 16, 64, 4, U::Matrix4);
static SAMPLER_2D: TypeDescriptor =
    descriptor(0x8B5E, "SAMPLER_2D", K::Sampler2d, 1, 4, 1, U::Int1);
static SAMPLER_CUBE: TypeDescriptor =
    descriptor(0x8B60, "SAMPLER_CUBE", K::SamplerCube, 1, 4, 1, U::Int1);

/// A shader attribute or uniform type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Float,
    FloatVec2,
    FloatVec3,
    FloatVec4,
    IntVec2,
    IntVec3,
    IntVec4,
    Bool,
    BoolVec2,
    BoolVec3,
    BoolVec4,
    FloatMat2,
    FloatMat3,
    FloatMat4,
    Sampler2d,
    SamplerCube,
}

impl AttributeType {
    /// Every type in the table.
    pub const ALL: [AttributeType; 22] = [
        Self::Byte,
        Self::UnsignedByte,
        Self::Short,
        Self::UnsignedShort,
        Self::Int,
        Self::UnsignedInt,
        Self::Float,
        Self::FloatVec2,
        Self::FloatVec3,
        Self::FloatVec4,
        Self::IntVec2,
        Self::IntVec3,
        Self::IntVec4,
        Self::Bool,
        Self::BoolVec2,
        Self::BoolVec3,
        Self::BoolVec4,
        Self::FloatMat2,
        Self::FloatMat3,
        Self::FloatMat4,
        Self::Sampler2d,
        Self::SamplerCube,
    ];

    /// Get the static descriptor for this type.
    pub fn descriptor(self) -> &'static TypeDescriptor {
        match self {
            Self::Byte => &BYTE,
            Self::UnsignedByte => &UNSIGNED_BYTE,
            Self::Short => &SHORT,
            Self::UnsignedShort => &UNSIGNED_SHORT,
            Self::Int => &INT,
            Self::UnsignedInt => &UNSIGNED_INT,
            Self::Float => &FLOAT,
            Self::FloatVec2 => &FLOAT_VEC2,
            Self::FloatVec3 => &FLOAT_VEC3,
            Self::FloatVec4 => &FLOAT_VEC4,
            Self::IntVec2 => &INT_VEC2,
            Self::IntVec3 => &INT_VEC3,
            Self::IntVec4 => &INT_VEC4,
            Self::Bool => &BOOL,
            Self::BoolVec2 => &BOOL_VEC2,
            Self::BoolVec3 => &BOOL_VEC3,
            Self::BoolVec4 => &BOOL_VEC4,
            Self::FloatMat2 => &FLOAT_MAT2,
            Self::FloatMat3 => &FLOAT_MAT3,
            Self::FloatMat4 => &FLOAT_MAT4,
            Self::Sampler2d => &SAMPLER_2D,
            Self::SamplerCube => &SAMPLER_CUBE,
        }
    }

    /// Look up a type from its device enum code.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.descriptor().code == code)
    }

    /// Device enum code of this type.
    pub fn code(self) -> u32 {
        self.descriptor().code
    }

    /// Number of primitive elements in one value.
    pub fn element_count(self) -> usize {
        self.descriptor().element_count
    }

    /// Whether this is a sampler type.
    pub fn is_sampler(self) -> bool {
        self.descriptor().is_sampler
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.descriptor().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AttributeType::Float, 1, 4, 1)]
    #[case(AttributeType::FloatVec2, 2, 8, 1)]
    #[case(AttributeType::FloatVec4, 4, 16, 1)]
    #[case(AttributeType::IntVec3, 3, 12, 1)]
    #[case(AttributeType::FloatMat2, 4, 16, 2)]
    #[case(AttributeType::FloatMat3, 9, 36, 3)]
    #[case(AttributeType::FloatMat4, 16, 64, 4)]
    fn test_descriptor_sizes(
        #[case] ty: AttributeType,
        #[case] elements: usize,
        #[case] bytes: usize,
        #[case] slots: usize,
    ) {
        let info = ty.descriptor();
        assert_eq!(info.element_count, elements);
        assert_eq!(info.byte_size, bytes);
        assert_eq!(info.slot_span, slots);
    }

    #[test]
    fn test_codes_are_unique_and_round_trip() {
        for ty in AttributeType::ALL {
            assert_eq!(AttributeType::from_code(ty.code()), Some(ty), "{ty}");
        }
        assert_eq!(AttributeType::from_code(0xDEAD), None);
    }

    #[test]
    fn test_float_types_use_four_bytes_per_element() {
        for ty in AttributeType::ALL {
            let info = ty.descriptor();
            if info.element_kind.is_float() {
                assert_eq!(info.byte_size, info.element_count * 4, "{ty}");
            }
        }
    }

    #[test]
    fn test_samplers_flagged() {
        assert!(AttributeType::Sampler2d.is_sampler());
        assert!(AttributeType::SamplerCube.is_sampler());
        assert!(!AttributeType::FloatVec4.is_sampler());
    }

    #[test]
    fn test_matrix_uniform_functions() {
        assert!(AttributeType::FloatMat3.descriptor().uniform_function.is_matrix());
        assert!(!AttributeType::FloatVec3.descriptor().uniform_function.is_matrix());
        assert_eq!(AttributeType::FloatMat4.descriptor().elements_per_slot(), 4);
    }

    #[test]
    fn test_display_uses_device_name() {
        assert_eq!(AttributeType::FloatVec2.to_string(), "FLOAT_VEC2");
    }
}
