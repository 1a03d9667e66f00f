//! Tabulated PQ shaper for the CTL fast path.

use clut_math::transfer::pq_shaper;

const TABLE_SIZE: usize = 65536;

/// Forward and inverse [`pq_shaper`] sampled on `[0, 1]`.
///
/// Inputs inside `[0, 1]` are linearly interpolated from the tables;
/// anything else is evaluated directly.
#[derive(Clone)]
pub struct Shaper {
    forward: Vec<f32>,
    inverse: Vec<f32>,
}

impl std::fmt::Debug for Shaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shaper").field("size", &self.forward.len()).finish()
    }
}

fn tabulate(inverse: bool) -> Vec<f32> {
    let scale = (TABLE_SIZE - 1) as f32;
    (0..TABLE_SIZE)
        .map(|i| pq_shaper(i as f32 / scale, inverse))
        .collect()
}

fn lookup(table: &[f32], a: f32) -> f32 {
    let x = a * (table.len() - 1) as f32;
    let i = (x as usize).min(table.len() - 2);
    let t = x - i as f32;
    table[i] + t * (table[i + 1] - table[i])
}

impl Shaper {
    /// Builds both tables.
    pub fn new() -> Self {
        Self {
            forward: tabulate(false),
            inverse: tabulate(true),
        }
    }

    /// Maps `a` through the shaper, or its inverse.
    #[inline]
    pub fn eval(&self, a: f32, inverse: bool) -> f32 {
        if (0.0..=1.0).contains(&a) {
            lookup(if inverse { &self.inverse } else { &self.forward }, a)
        } else {
            pq_shaper(a, inverse)
        }
    }
}

impl Default for Shaper {
    fn default() -> Self {
        Self::new()
    }
}
