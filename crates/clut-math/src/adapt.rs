//! Chromatic adaptation.
//!
//! Working-space matrices are expressed against a D50 connection space, so
//! every profile with a different white is Bradford-adapted to D50 first.
//!
//! ```rust
//! use clut_math::adapt::{adapt_matrix, D65, D50};
//!
//! let m = adapt_matrix(D65, D50);
//! let w = m.transform(D65);
//! assert!((w[2] - D50[2]).abs() < 1e-3);
//! ```

use crate::Mat3;

/// D65 white point in XYZ.
pub const D65: [f32; 3] = [0.95047, 1.0, 1.08883];

/// D50 white point in XYZ.
pub const D50: [f32; 3] = [0.96422, 1.0, 0.82521];

/// Bradford cone response matrix.
pub const BRADFORD: Mat3 = Mat3::from_rows([
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
]);

/// Computes the Bradford matrix adapting XYZ from `src_white` to `dst_white`.
pub fn adapt_matrix(src_white: [f32; 3], dst_white: [f32; 3]) -> Mat3 {
    let method_inv = BRADFORD.inverse().unwrap_or(Mat3::IDENTITY);

    let src = BRADFORD.transform(src_white);
    let dst = BRADFORD.transform(dst_white);

    let scale = Mat3::diagonal(dst[0] / src[0], dst[1] / src[1], dst[2] / src[2]);

    method_inv * scale * BRADFORD
}
