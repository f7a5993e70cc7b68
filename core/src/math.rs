//! Math type aliases and the packing bridge into flat `f32` storage.
//!
//! The engine treats vectors and matrices as opaque numeric containers. The
//! only thing vertex storage and uniform variables need from them is their
//! elements in device order, which [`PackedValue`] provides. Matrices are
//! packed column-major, matching an untransposed uniform upload.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 2x2 matrix (f32).
pub type Mat2 = nalgebra::Matrix2<f32>;

/// 3x3 matrix (f32), the usual 2D affine transform.
pub type Mat3 = nalgebra::Matrix3<f32>;

/// 4x4 matrix (f32).
pub type Mat4 = nalgebra::Matrix4<f32>;

/// A value that can be written into packed `f32` storage.
pub trait PackedValue {
    /// The elements of this value in device order.
    fn packed(&self) -> &[f32];

    /// Number of `f32` elements this value occupies.
    fn element_count(&self) -> usize {
        self.packed().len()
    }
}

impl PackedValue for f32 {
    fn packed(&self) -> &[f32] {
        std::slice::from_ref(self)
    }
}

impl<const N: usize> PackedValue for [f32; N] {
    fn packed(&self) -> &[f32] {
        self.as_slice()
    }
}

impl PackedValue for [f32] {
    fn packed(&self) -> &[f32] {
        self
    }
}

macro_rules! impl_packed_for_nalgebra {
    ($($ty:ty),* $(,)?) => {
        $(
            impl PackedValue for $ty {
                fn packed(&self) -> &[f32] {
                    self.as_slice()
                }
            }
        )*
    };
}

impl_packed_for_nalgebra!(Vec2, Vec3, Vec4, Mat2, Mat3, Mat4);

/// Build a 2D affine transform from a translation, rotation (radians) and scale.
pub fn affine_2d(translation: Vec2, rotation: f32, scale: Vec2) -> Mat3 {
    let (sin, cos) = rotation.sin_cos();
    #[rustfmt::skip]
    let result = Mat3::new(
        cos * scale.x, -sin * scale.y, translation.x,
        sin * scale.x,  cos * scale.y, translation.y,
        0.0,            0.0,           1.0,
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Vec2::new(1.0, 2.0).packed().to_vec(), vec![1.0, 2.0])]
    #[case(Vec4::new(1.0, 2.0, 3.0, 4.0).packed().to_vec(), vec![1.0, 2.0, 3.0, 4.0])]
    #[case(3.5f32.packed().to_vec(), vec![3.5])]
    #[case([0.25f32, 0.5, 0.75].packed().to_vec(), vec![0.25, 0.5, 0.75])]
    fn test_packed_elements(#[case] packed: Vec<f32>, #[case] expected: Vec<f32>) {
        assert_eq!(packed, expected);
    }

    #[test]
    fn test_matrix_packs_column_major() {
        let m = Mat2::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(m.packed(), &[1.0, 3.0, 2.0, 4.0]);
        assert_eq!(Mat4::identity().element_count(), 16);
    }

    #[test]
    fn test_affine_2d_translates_origin() {
        let m = affine_2d(Vec2::new(5.0, -3.0), 0.0, Vec2::new(2.0, 2.0));
        let p = m * Vec3::new(0.0, 0.0, 1.0);
        assert_eq!(p, Vec3::new(5.0, -3.0, 1.0));
        let q = m * Vec3::new(1.0, 1.0, 1.0);
        assert_eq!(q, Vec3::new(7.0, -1.0, 1.0));
    }
}
