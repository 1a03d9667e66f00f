//! 3-dimensional lookup table.
//!
//! Used for the CLF `LUT3D` node and for the resampled grid of CTL scripts.
//! Entries are stored with red varying fastest:
//!
//! ```text
//! index = b * size * size + g * size + r
//! ```

use crate::{LutError, LutResult};

/// Interpolation between the 8 grid points around a lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Trilinear.
    #[default]
    Linear,
    /// Tetrahedral: 4 points, better hue preservation on coarse grids.
    Tetrahedral,
}

/// A cube of RGB output values over the `[0, 1]^3` input domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    /// Output values, red fastest.
    pub data: Vec<[f32; 3]>,
    /// Grid points per axis.
    pub size: usize,
    /// Interpolation method.
    pub interpolation: Interpolation,
}

impl Lut3D {
    /// Identity cube of the given size, at least 2 per axis.
    pub fn identity(size: usize) -> Self {
        let size = size.max(2);
        let n = (size - 1) as f32;
        let mut data = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push([r as f32 / n, g as f32 / n, b as f32 / n]);
                }
            }
        }
        Self {
            data,
            size,
            interpolation: Interpolation::Linear,
        }
    }

    /// Creates a cube from red-fastest data.
    pub fn from_data(data: Vec<[f32; 3]>, size: usize) -> LutResult<Self> {
        if size < 2 {
            return Err(LutError::InvalidSize(format!("3D LUT size {size} is below 2")));
        }
        let expected = size * size * size;
        if data.len() != expected {
            return Err(LutError::InvalidSize(format!(
                "expected {} entries for size {}, got {}",
                expected,
                size,
                data.len()
            )));
        }
        Ok(Self {
            data,
            size,
            interpolation: Interpolation::Linear,
        })
    }

    /// Creates a cube from flat `r g b` values ordered blue fastest,
    /// the layout of CLF `Array` elements.
    pub fn from_blue_fastest(values: &[f32], size: usize) -> LutResult<Self> {
        if values.len() != size * size * size * 3 {
            return Err(LutError::InvalidSize(format!(
                "3D LUT of size {} needs {} values, got {}",
                size,
                size * size * size * 3,
                values.len()
            )));
        }
        let mut data = vec![[0.0f32; 3]; size * size * size];
        for (i, rgb) in values.chunks_exact(3).enumerate() {
            let b = i % size;
            let g = (i / size) % size;
            let r = i / (size * size);
            data[b * size * size + g * size + r] = [rgb[0], rgb[1], rgb[2]];
        }
        Self::from_data(data, size)
    }

    /// Sets the interpolation method.
    pub fn with_interpolation(mut self, interp: Interpolation) -> Self {
        self.interpolation = interp;
        self
    }

    #[inline]
    fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[b * self.size * self.size + g * self.size + r]
    }

    /// Looks up an RGB triple; input is clamped to `[0, 1]`.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let n = (self.size - 1) as f32;
        let cell = |v: f32| {
            let p = v.clamp(0.0, 1.0) * n;
            let i = (p.floor() as usize).min(self.size - 2);
            (i, p - i as f32)
        };
        let (ri, rf) = cell(rgb[0]);
        let (gi, gf) = cell(rgb[1]);
        let (bi, bf) = cell(rgb[2]);

        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        let mut out = [0.0f32; 3];
        match self.interpolation {
            Interpolation::Linear => {
                for i in 0..3 {
                    let c00 = c000[i] + rf * (c100[i] - c000[i]);
                    let c10 = c010[i] + rf * (c110[i] - c010[i]);
                    let c01 = c001[i] + rf * (c101[i] - c001[i]);
                    let c11 = c011[i] + rf * (c111[i] - c011[i]);
                    let c0 = c00 + gf * (c10 - c00);
                    let c1 = c01 + gf * (c11 - c01);
                    out[i] = c0 + bf * (c1 - c0);
                }
            }
            Interpolation::Tetrahedral => {
                for i in 0..3 {
                    out[i] = c000[i]
                        + if rf > gf {
                            if gf > bf {
                                rf * (c100[i] - c000[i]) + gf * (c110[i] - c100[i]) + bf * (c111[i] - c110[i])
                            } else if rf > bf {
                                rf * (c100[i] - c000[i]) + bf * (c101[i] - c100[i]) + gf * (c111[i] - c101[i])
                            } else {
                                bf * (c001[i] - c000[i]) + rf * (c101[i] - c001[i]) + gf * (c111[i] - c101[i])
                            }
                        } else if gf > bf {
                            if rf > bf {
                                gf * (c010[i] - c000[i]) + rf * (c110[i] - c010[i]) + bf * (c111[i] - c110[i])
                            } else {
                                gf * (c010[i] - c000[i]) + bf * (c011[i] - c010[i]) + rf * (c111[i] - c011[i])
                            }
                        } else {
                            bf * (c001[i] - c000[i]) + gf * (c011[i] - c001[i]) + rf * (c111[i] - c011[i])
                        };
                }
            }
        }
        out
    }
}
