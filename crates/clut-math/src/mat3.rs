//! 3x3 matrix type for color space conversions.
//!
//! Matrices are stored in **row-major** order and multiply **column vectors**:
//!
//! ```text
//! | m00 m01 m02 |   | r |
//! | m10 m11 m12 | * | g |
//! | m20 m21 m22 |   | b |
//! ```

use std::ops::Mul;

/// A 3x3 matrix for RGB/XYZ transforms.
///
/// # Example
///
/// ```rust
/// use clut_math::Mat3;
///
/// let m = Mat3::scale(2.0);
/// assert_eq!(m.transform([1.0, 2.0, 3.0]), [2.0, 4.0, 6.0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat3 {
    /// Matrix elements in row-major order: [row0, row1, row2]
    pub m: [[f32; 3]; 3],
}

impl Mat3 {
    /// Zero matrix.
    pub const ZERO: Self = Self { m: [[0.0; 3]; 3] };

    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Creates a matrix from row arrays.
    #[inline]
    pub const fn from_rows(rows: [[f32; 3]; 3]) -> Self {
        Self { m: rows }
    }

    /// Creates a matrix from column arrays.
    #[inline]
    pub const fn from_cols(cols: [[f32; 3]; 3]) -> Self {
        Self {
            m: [
                [cols[0][0], cols[1][0], cols[2][0]],
                [cols[0][1], cols[1][1], cols[2][1]],
                [cols[0][2], cols[1][2], cols[2][2]],
            ],
        }
    }

    /// Creates a diagonal matrix.
    #[inline]
    pub const fn diagonal(d0: f32, d1: f32, d2: f32) -> Self {
        Self::from_rows([[d0, 0.0, 0.0], [0.0, d1, 0.0], [0.0, 0.0, d2]])
    }

    /// Creates a uniform scale matrix.
    #[inline]
    pub const fn scale(s: f32) -> Self {
        Self::diagonal(s, s, s)
    }

    /// Returns the inverse, or `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Self> {
        let g = self.to_glam();
        if g.determinant().abs() < 1e-12 {
            return None;
        }
        let inv = Self::from_glam(g.inverse());
        inv.is_finite().then_some(inv)
    }

    /// Transforms an RGB/XYZ triple.
    #[inline]
    pub fn transform(&self, v: [f32; 3]) -> [f32; 3] {
        let m = &self.m;
        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }

    /// Multiplies two matrices (`self * other`).
    #[inline]
    pub fn mul_mat(&self, other: &Self) -> Self {
        let mut result = Self::ZERO;
        for i in 0..3 {
            for j in 0..3 {
                result.m[i][j] = self.m[i][0] * other.m[0][j]
                    + self.m[i][1] * other.m[1][j]
                    + self.m[i][2] * other.m[2][j];
            }
        }
        result
    }

    /// Returns true if all elements are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.m.iter().flatten().all(|x| x.is_finite())
    }

    /// Returns true if every element is within `eps` of `other`.
    pub fn approx_eq(&self, other: &Self, eps: f32) -> bool {
        self.m
            .iter()
            .flatten()
            .zip(other.m.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Converts to glam Mat3 (column-major).
    #[inline]
    pub fn to_glam(&self) -> glam::Mat3 {
        glam::Mat3::from_cols_array_2d(&[
            [self.m[0][0], self.m[1][0], self.m[2][0]],
            [self.m[0][1], self.m[1][1], self.m[2][1]],
            [self.m[0][2], self.m[1][2], self.m[2][2]],
        ])
    }

    /// Creates from glam Mat3.
    #[inline]
    pub fn from_glam(m: glam::Mat3) -> Self {
        Self::from_cols(m.to_cols_array_2d())
    }
}

impl Mul for Mat3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self.mul_mat(&rhs)
    }
}

impl Mul<f32> for Mat3 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        let mut out = self;
        out.m.iter_mut().flatten().for_each(|x| *x *= rhs);
        out
    }
}

impl Mul<[f32; 3]> for Mat3 {
    type Output = [f32; 3];

    #[inline]
    fn mul(self, rhs: [f32; 3]) -> [f32; 3] {
        self.transform(rhs)
    }
}
