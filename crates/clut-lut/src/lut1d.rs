//! Per-channel 1D lookup table.

use crate::{LutError, LutResult};

/// A 1D LUT with either one curve shared by all channels or one per channel.
///
/// Input is expected in `[0, 1]` and clamped; entries are spaced evenly
/// over that range.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1D {
    /// Red (or shared) curve.
    pub r: Vec<f32>,
    /// Green curve, `None` when sharing `r`.
    pub g: Option<Vec<f32>>,
    /// Blue curve, `None` when sharing `r`.
    pub b: Option<Vec<f32>>,
}

impl Lut1D {
    /// Identity curve with `size` entries.
    pub fn identity(size: usize) -> Self {
        let n = (size.max(2) - 1) as f32;
        Self {
            r: (0..size.max(2)).map(|i| i as f32 / n).collect(),
            g: None,
            b: None,
        }
    }

    /// Creates a LUT sharing one curve across channels.
    pub fn from_data(data: Vec<f32>) -> LutResult<Self> {
        if data.len() < 2 {
            return Err(LutError::InvalidSize(format!(
                "1D LUT needs at least 2 entries, got {}",
                data.len()
            )));
        }
        Ok(Self { r: data, g: None, b: None })
    }

    /// Creates a LUT from interleaved `r g b` triples.
    pub fn from_interleaved(data: &[f32]) -> LutResult<Self> {
        if data.len() % 3 != 0 || data.len() < 6 {
            return Err(LutError::InvalidSize(format!(
                "interleaved 1D LUT has {} values",
                data.len()
            )));
        }
        let channel = |c: usize| data.iter().skip(c).step_by(3).copied().collect::<Vec<_>>();
        Ok(Self {
            r: channel(0),
            g: Some(channel(1)),
            b: Some(channel(2)),
        })
    }

    /// Number of entries per channel.
    pub fn size(&self) -> usize {
        self.r.len()
    }

    /// Scales every entry by `k`.
    pub fn scale(&mut self, k: f32) {
        for curve in [Some(&mut self.r), self.g.as_mut(), self.b.as_mut()].into_iter().flatten() {
            curve.iter_mut().for_each(|v| *v *= k);
        }
    }

    /// Applies the curves to an RGB triple.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let g = self.g.as_deref().unwrap_or(&self.r);
        let b = self.b.as_deref().unwrap_or(&self.r);
        [interp(&self.r, rgb[0]), interp(g, rgb[1]), interp(b, rgb[2])]
    }
}

#[inline]
fn interp(curve: &[f32], x: f32) -> f32 {
    let n = curve.len() - 1;
    let pos = x.clamp(0.0, 1.0) * n as f32;
    let i = (pos.floor() as usize).min(n - 1);
    let t = pos - i as f32;
    curve[i] + t * (curve[i + 1] - curve[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity() {
        let lut = Lut1D::identity(17);
        let out = lut.apply([0.25, 0.5, 0.8]);
        assert_relative_eq!(out[0], 0.25, epsilon = 1e-6);
        assert_relative_eq!(out[2], 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_interleaved_channels() {
        let lut = Lut1D::from_interleaved(&[0.0, 1.0, 0.0, 1.0, 0.0, 0.5]).unwrap();
        let out = lut.apply([0.5, 0.5, 1.0]);
        assert_relative_eq!(out[0], 0.5);
        assert_relative_eq!(out[1], 0.5);
        assert_relative_eq!(out[2], 0.5);
    }

    #[test]
    fn test_clamps_input() {
        let lut = Lut1D::from_data(vec![0.2, 0.4]).unwrap();
        assert_eq!(lut.apply([-1.0, 2.0, 0.0]), [0.2, 0.4, 0.2]);
    }

    #[test]
    fn test_too_small() {
        assert!(Lut1D::from_data(vec![1.0]).is_err());
        assert!(Lut1D::from_interleaved(&[1.0, 2.0]).is_err());
    }
}
