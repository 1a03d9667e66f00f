//! Hald CLUT tables.
//!
//! A Hald CLUT of level `L` is a square image of side `L^3` whose pixels
//! enumerate a color cube. Lookups index the cube with `N = L^2` points per
//! axis:
//!
//! ```text
//! pixel = r + g * N + b * N^2
//! ```
//!
//! Samples are stored as RGBX `u16` quadruples with one trailing pad
//! quadruple, so the red neighbour of any corner can be loaded as a full
//! 4-lane vector.
//!
//! # Example
//!
//! ```rust
//! use clut_lut::{HaldClut, Kernel, Rgb16Image};
//!
//! let clut = HaldClut::from_image(Rgb16Image::identity_hald(2), "id.png", "sRGB").unwrap();
//! let mut out = [0.0f32; 4];
//! clut.get_rgb(Kernel::detect(), 1.0, &[1000.0], &[2000.0], &[3000.0], &mut out);
//! assert!((out[1] - 2000.0).abs() < 1.0);
//! ```

use std::path::Path;

use clut_math::simd::{lerp, lerp_x4};
use tracing::debug;
use wide::f32x4;

use crate::{ImageLoader, LutError, LutResult, Rgb16Image};

/// Evaluation path of [`HaldClut::get_rgb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    /// One channel at a time.
    Scalar,
    /// The RGBX corner quadruples as 4-wide vectors.
    Simd,
}

impl Kernel {
    /// Picks the vector path on targets with native 128-bit SIMD.
    pub fn detect() -> Self {
        if cfg!(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "wasm32")) {
            Kernel::Simd
        } else {
            Kernel::Scalar
        }
    }
}

/// A loaded Hald CLUT.
#[derive(Debug, Clone)]
pub struct HaldClut {
    filename: String,
    profile: String,
    level: u32,
    /// Lattice points per axis (`level^2`).
    n: usize,
    data: Vec<u16>,
    level_minus_one: f32,
    level_minus_two: f32,
}

impl HaldClut {
    /// Decodes `path` with `loader` and builds the table.
    pub fn load(loader: &dyn ImageLoader, path: &Path, profile: &str) -> LutResult<Self> {
        let image = loader.load(path)?;
        Self::from_image(image, &path.to_string_lossy(), profile).map_err(|e| match e {
            LutError::NotACube { width, height, .. } => LutError::NotACube {
                path: path.to_path_buf(),
                width,
                height,
            },
            other => other,
        })
    }

    /// Builds the table from decoded pixels.
    pub fn from_image(image: Rgb16Image, filename: &str, profile: &str) -> LutResult<Self> {
        let not_a_cube = || LutError::NotACube {
            path: filename.into(),
            width: image.width,
            height: image.height,
        };
        if image.width != image.height {
            return Err(not_a_cube());
        }
        let level = (image.width as f64).cbrt().round() as u32;
        if level < 2 || level.pow(3) != image.width {
            return Err(not_a_cube());
        }
        if image.data.len() != image.pixel_count() * 3 {
            return Err(LutError::InvalidSize(format!(
                "{}: {} samples for {} pixels",
                filename,
                image.data.len(),
                image.pixel_count()
            )));
        }

        let n = (level * level) as usize;
        let mut data = vec![0u16; n * n * n * 4 + 4];
        for (dst, src) in data.chunks_exact_mut(4).zip(image.data.chunks_exact(3)) {
            dst[..3].copy_from_slice(src);
        }

        debug!(filename, level, profile, "loaded Hald CLUT");
        Ok(Self {
            filename: filename.to_string(),
            profile: profile.to_string(),
            level,
            n,
            data,
            level_minus_one: (n - 1) as f32 / 65535.0,
            level_minus_two: (n - 2) as f32,
        })
    }

    /// Source file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Native color profile of the table.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Cube root of the image side.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Lattice points per axis.
    pub fn lattice_size(&self) -> usize {
        self.n
    }

    #[inline]
    fn cell(&self, v: f32) -> (usize, f32) {
        let f = v * self.level_minus_one;
        let i = self.level_minus_two.min(f) as usize;
        (i, f - i as f32)
    }

    #[inline]
    fn corner_base(&self, r: f32, g: f32, b: f32) -> (usize, [f32; 3]) {
        let (ri, rx) = self.cell(r);
        let (gi, gx) = self.cell(g);
        let (bi, bx) = self.cell(b);
        (ri + gi * self.n + bi * self.n * self.n, [rx, gx, bx])
    }

    #[inline]
    fn quad(&self, color: usize) -> f32x4 {
        let d = &self.data[color * 4..color * 4 + 4];
        f32x4::from([d[0] as f32, d[1] as f32, d[2] as f32, d[3] as f32])
    }

    /// Looks up `r.len()` samples on the 0..65535 scale.
    ///
    /// Writes RGBX quadruples into `out_rgbx`, blended with the input by
    /// `strength` (clamped to `[0, 1]`). The fourth slot of each quadruple
    /// is unspecified.
    ///
    /// # Panics
    ///
    /// Panics if the input slices differ in length or `out_rgbx` holds
    /// fewer than `4 * r.len()` values.
    pub fn get_rgb(&self, kernel: Kernel, strength: f32, r: &[f32], g: &[f32], b: &[f32], out_rgbx: &mut [f32]) {
        assert!(r.len() == g.len() && g.len() == b.len());
        assert!(out_rgbx.len() >= r.len() * 4);

        let strength = strength.clamp(0.0, 1.0);
        match kernel {
            Kernel::Scalar => self.get_rgb_scalar(strength, r, g, b, out_rgbx),
            Kernel::Simd => self.get_rgb_simd(strength, r, g, b, out_rgbx),
        }
    }

    fn get_rgb_scalar(&self, strength: f32, r: &[f32], g: &[f32], b: &[f32], out: &mut [f32]) {
        let n = self.n;
        let nn = n * n;
        for (i, px) in out.chunks_exact_mut(4).take(r.len()).enumerate() {
            let input = [r[i], g[i], b[i]];
            let (color, [rx, gx, bx]) = self.corner_base(r[i], g[i], b[i]);
            let at = |c: usize, ch: usize| self.data[c * 4 + ch] as f32;

            for ch in 0..3 {
                let c00 = lerp(rx, at(color + 1, ch), at(color, ch));
                let c10 = lerp(rx, at(color + n + 1, ch), at(color + n, ch));
                let c01 = lerp(rx, at(color + nn + 1, ch), at(color + nn, ch));
                let c11 = lerp(rx, at(color + n + nn + 1, ch), at(color + n + nn, ch));
                let c0 = lerp(gx, c10, c00);
                let c1 = lerp(gx, c11, c01);
                px[ch] = lerp(strength, lerp(bx, c1, c0), input[ch]);
            }
            px[3] = 0.0;
        }
    }

    fn get_rgb_simd(&self, strength: f32, r: &[f32], g: &[f32], b: &[f32], out: &mut [f32]) {
        let n = self.n;
        let nn = n * n;
        let s = f32x4::splat(strength);
        for (i, px) in out.chunks_exact_mut(4).take(r.len()).enumerate() {
            let (color, [rx, gx, bx]) = self.corner_base(r[i], g[i], b[i]);
            let (rx, gx, bx) = (f32x4::splat(rx), f32x4::splat(gx), f32x4::splat(bx));

            let c00 = lerp_x4(rx, self.quad(color + 1), self.quad(color));
            let c10 = lerp_x4(rx, self.quad(color + n + 1), self.quad(color + n));
            let c01 = lerp_x4(rx, self.quad(color + nn + 1), self.quad(color + nn));
            let c11 = lerp_x4(rx, self.quad(color + n + nn + 1), self.quad(color + n + nn));
            let c0 = lerp_x4(gx, c10, c00);
            let c1 = lerp_x4(gx, c11, c01);
            let input = f32x4::from([r[i], g[i], b[i], 0.0]);
            let v = lerp_x4(s, lerp_x4(bx, c1, c0), input).to_array();
            px.copy_from_slice(&[v[0], v[1], v[2], 0.0]);
        }
    }
}
