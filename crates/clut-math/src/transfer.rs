//! Transfer curves used around LUT evaluation.
//!
//! - sRGB encode/decode on the 16-bit `[0, 65535]` scale used by Hald tables
//! - The PQ-style shaper used to pre-condition input of CTL fast-path LUTs

/// sRGB OETF on `[0, 1]`.
#[inline]
pub fn srgb_oetf(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// sRGB EOTF on `[0, 1]`.
#[inline]
pub fn srgb_eotf(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Encodes a linear `[0, 65535]` value with the sRGB curve, clipping to range.
///
/// ```rust
/// use clut_math::transfer::gamma_srgb_clipped;
///
/// assert_eq!(gamma_srgb_clipped(-5.0), 0.0);
/// assert_eq!(gamma_srgb_clipped(70000.0), 65535.0);
/// ```
#[inline]
pub fn gamma_srgb_clipped(x: f32) -> f32 {
    srgb_oetf((x / 65535.0).clamp(0.0, 1.0)) * 65535.0
}

/// Decodes an sRGB-encoded `[0, 65535]` value back to linear.
#[inline]
pub fn igamma_srgb(x: f32) -> f32 {
    srgb_eotf(x / 65535.0) * 65535.0
}

// ============================================================================
// PQ shaper
// ============================================================================

const PQ_M1: f64 = 2610.0 / 16384.0;
const PQ_M2: f64 = 2523.0 / 32.0;
const PQ_C1: f64 = 107.0 / 128.0;
const PQ_C2: f64 = 2413.0 / 128.0;
const PQ_C3: f64 = 2392.0 / 128.0;
const PQ_SCALE: f64 = 400.0;

/// PQ-style shaper mapping linear scene values to `[0, 1]`.
///
/// With `inverse` set, maps shaper values back to linear. Non-positive
/// input maps to 0 in both directions.
///
/// ```rust
/// use clut_math::transfer::pq_shaper;
///
/// let v = pq_shaper(0.18, false);
/// assert!((pq_shaper(v, true) - 0.18).abs() < 1e-5);
/// ```
pub fn pq_shaper(a: f32, inverse: bool) -> f32 {
    if a <= 0.0 {
        return 0.0;
    }
    let a = a as f64;
    let res = if !inverse {
        let p = (a / PQ_SCALE).powf(PQ_M1);
        ((PQ_C1 + PQ_C2 * p) / (1.0 + PQ_C3 * p)).powf(PQ_M2)
    } else {
        let p = a.powf(1.0 / PQ_M2);
        ((p - PQ_C1).max(0.0) / (PQ_C2 - PQ_C3 * p)).powf(1.0 / PQ_M1) * PQ_SCALE
    };
    res as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srgb_roundtrip() {
        for i in 0..=20 {
            let x = i as f32 * 65535.0 / 20.0;
            let y = igamma_srgb(gamma_srgb_clipped(x));
            assert!((x - y).abs() < 0.5, "{x} -> {y}");
        }
    }

    #[test]
    fn test_srgb_midpoint() {
        // linear 0.214 encodes to roughly 0.5
        let v = gamma_srgb_clipped(0.214 * 65535.0) / 65535.0;
        assert!((v - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_shaper_monotonic() {
        let mut prev = 0.0;
        for i in 1..100 {
            let v = pq_shaper(i as f32 * 0.5, false);
            assert!(v > prev);
            prev = v;
        }
        assert!(prev <= 1.0);
    }

    #[test]
    fn test_shaper_top_maps_to_scale() {
        assert!((pq_shaper(1.0, true) - 400.0).abs() < 0.5);
        assert_eq!(pq_shaper(0.0, false), 0.0);
        assert_eq!(pq_shaper(-1.0, true), 0.0);
    }
}
