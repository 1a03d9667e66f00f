//! 4-wide SIMD helpers for planar scanlines.
//!
//! Built on [`wide`] for portable SIMD on stable Rust. Each batch function
//! processes groups of 4 with [`f32x4`] and finishes the remainder with the
//! same arithmetic in scalar form, so results do not depend on the
//! scanline length.
//!
//! ```rust
//! use clut_math::{Mat3, simd::transform_planar};
//!
//! let mut r = vec![1.0; 5];
//! let mut g = vec![2.0; 5];
//! let mut b = vec![3.0; 5];
//! transform_planar(&Mat3::scale(2.0), &mut r, &mut g, &mut b);
//! assert_eq!(b[4], 6.0);
//! ```

use wide::f32x4;

use crate::Mat3;

/// Interpolates `lo + t * (hi - lo)` lane-wise.
#[inline]
pub fn lerp_x4(t: f32x4, hi: f32x4, lo: f32x4) -> f32x4 {
    t * (hi - lo) + lo
}

/// Scalar counterpart of [`lerp_x4`].
#[inline]
pub fn lerp(t: f32, hi: f32, lo: f32) -> f32 {
    t * (hi - lo) + lo
}

/// Loads 4 consecutive values starting at `i`.
#[inline]
pub fn load4(s: &[f32], i: usize) -> f32x4 {
    f32x4::from([s[i], s[i + 1], s[i + 2], s[i + 3]])
}

/// Multiplies a matrix with 4 RGB triples held in planar lanes.
#[inline]
pub fn mat3_mul_x4(m: &Mat3, r: f32x4, g: f32x4, b: f32x4) -> [f32x4; 3] {
    let row = |i: usize| {
        f32x4::splat(m.m[i][0]) * r + f32x4::splat(m.m[i][1]) * g + f32x4::splat(m.m[i][2]) * b
    };
    [row(0), row(1), row(2)]
}

/// Transforms three planes in place with `m`.
///
/// # Panics
///
/// Panics if the planes differ in length.
pub fn transform_planar(m: &Mat3, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
    assert!(r.len() == g.len() && g.len() == b.len());

    let n = r.len();
    let body = n - n % 4;

    for i in (0..body).step_by(4) {
        let [or, og, ob] = mat3_mul_x4(m, load4(r, i), load4(g, i), load4(b, i));
        r[i..i + 4].copy_from_slice(&or.to_array());
        g[i..i + 4].copy_from_slice(&og.to_array());
        b[i..i + 4].copy_from_slice(&ob.to_array());
    }

    for i in body..n {
        let [or, og, ob] = m.transform([r[i], g[i], b[i]]);
        r[i] = or;
        g[i] = og;
        b[i] = ob;
    }
}

/// Blends `out` towards `orig` in place: `out = strength * (out - orig) + orig`.
///
/// # Panics
///
/// Panics if the slices differ in length.
pub fn blend_planar(strength: f32, out: &mut [f32], orig: &[f32]) {
    assert_eq!(out.len(), orig.len());

    let s = f32x4::splat(strength);
    let mut out_chunks = out.chunks_exact_mut(4);
    let mut orig_chunks = orig.chunks_exact(4);

    for (o, i) in (&mut out_chunks).zip(&mut orig_chunks) {
        let vo = f32x4::from([o[0], o[1], o[2], o[3]]);
        let vi = f32x4::from([i[0], i[1], i[2], i[3]]);
        o.copy_from_slice(&lerp_x4(s, vo, vi).to_array());
    }

    for (o, i) in out_chunks
        .into_remainder()
        .iter_mut()
        .zip(orig_chunks.remainder())
    {
        *o = lerp(strength, *o, *i);
    }
}
