//! RGB primaries and RGB to XYZ matrix generation.

use crate::Mat3;

/// Chromaticities of an RGB color space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Primaries {
    /// Red primary (x, y) chromaticity
    pub r: (f32, f32),
    /// Green primary (x, y) chromaticity
    pub g: (f32, f32),
    /// Blue primary (x, y) chromaticity
    pub b: (f32, f32),
    /// White point (x, y) chromaticity
    pub w: (f32, f32),
}

impl Primaries {
    /// White point as XYZ (Y=1).
    #[inline]
    pub fn white_xyz(&self) -> [f32; 3] {
        xy_to_xyz(self.w)
    }
}

// ============================================================================
// White points
// ============================================================================

/// D65 white point chromaticity.
pub const D65_XY: (f32, f32) = (0.31270, 0.32900);

/// D50 white point chromaticity, the ICC connection space white.
pub const D50_XY: (f32, f32) = (0.34567, 0.35850);

/// D60 white point chromaticity (ACES).
pub const D60_XY: (f32, f32) = (0.32168, 0.33767);

// ============================================================================
// Profiles handled by the engine
// ============================================================================

/// sRGB / Rec.709.
pub const SRGB: Primaries = Primaries {
    r: (0.6400, 0.3300),
    g: (0.3000, 0.6000),
    b: (0.1500, 0.0600),
    w: D65_XY,
};

/// Rec.2020.
pub const REC2020: Primaries = Primaries {
    r: (0.7080, 0.2920),
    g: (0.1700, 0.7970),
    b: (0.1310, 0.0460),
    w: D65_XY,
};

/// ACES AP0 (ACES2065-1).
pub const ACES_AP0: Primaries = Primaries {
    r: (0.7347, 0.2653),
    g: (0.0000, 1.0000),
    b: (0.0001, -0.0770),
    w: D60_XY,
};

/// ACES AP1 (ACEScg).
pub const ACES_AP1: Primaries = Primaries {
    r: (0.7130, 0.2930),
    g: (0.1650, 0.8300),
    b: (0.1280, 0.0440),
    w: D60_XY,
};

/// Adobe RGB (1998).
pub const ADOBE_RGB: Primaries = Primaries {
    r: (0.6400, 0.3300),
    g: (0.2100, 0.7100),
    b: (0.1500, 0.0600),
    w: D65_XY,
};

/// ProPhoto RGB.
pub const PROPHOTO_RGB: Primaries = Primaries {
    r: (0.7347, 0.2653),
    g: (0.1596, 0.8404),
    b: (0.0366, 0.0001),
    w: D50_XY,
};

/// Adobe Wide Gamut RGB.
pub const WIDE_GAMUT_RGB: Primaries = Primaries {
    r: (0.7347, 0.2653),
    g: (0.1152, 0.8264),
    b: (0.1566, 0.0177),
    w: D50_XY,
};

// ============================================================================
// Matrix generation
// ============================================================================

fn xy_to_xyz((x, y): (f32, f32)) -> [f32; 3] {
    if y.abs() < 1e-10 {
        [0.0; 3]
    } else {
        [x / y, 1.0, (1.0 - x - y) / y]
    }
}

/// Computes the RGB to XYZ matrix for a set of primaries, relative to
/// the primaries' own white point.
///
/// ```rust
/// use clut_math::{SRGB, rgb_to_xyz_matrix};
///
/// let white = rgb_to_xyz_matrix(&SRGB).transform([1.0, 1.0, 1.0]);
/// assert!((white[1] - 1.0).abs() < 1e-4);
/// ```
pub fn rgb_to_xyz_matrix(primaries: &Primaries) -> Mat3 {
    let r = xy_to_xyz(primaries.r);
    let g = xy_to_xyz(primaries.g);
    let b = xy_to_xyz(primaries.b);
    let w = primaries.white_xyz();

    let m = Mat3::from_cols([r, g, b]);
    let s = m.inverse().unwrap_or(Mat3::IDENTITY).transform(w);

    Mat3::from_cols([
        [r[0] * s[0], r[1] * s[0], r[2] * s[0]],
        [g[0] * s[1], g[1] * s[1], g[2] * s[1]],
        [b[0] * s[2], b[1] * s[2], b[2] * s[2]],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_srgb_matrix() {
        let m = rgb_to_xyz_matrix(&SRGB);
        // Well-known sRGB row
        assert_abs_diff_eq!(m.m[1][0], 0.2126729, epsilon = 1e-3);
        assert_abs_diff_eq!(m.m[1][1], 0.7151522, epsilon = 1e-3);
    }

    #[test]
    fn test_white_maps_to_white() {
        for p in [SRGB, REC2020, ACES_AP0, ACES_AP1, ADOBE_RGB, PROPHOTO_RGB] {
            let w = rgb_to_xyz_matrix(&p).transform([1.0; 3]);
            let expect = p.white_xyz();
            for c in 0..3 {
                assert_abs_diff_eq!(w[c], expect[c], epsilon = 1e-3);
            }
        }
    }
}
