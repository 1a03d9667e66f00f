//! Packed-RGB color processors.

use std::fmt;
use std::sync::Arc;

use crate::clf::ProcessList;
use crate::{LutError, LutResult};

/// A color transform applied in place to packed `r g b` float triples.
///
/// Implemented by [`ProcessList`]; the engine only sees this trait, so a
/// different transform engine can be plugged in behind the same caches.
pub trait ColorProcessor: Send + Sync + fmt::Debug {
    /// Transforms `rgb.len() / 3` pixels in place.
    fn apply_packed(&self, rgb: &mut [f32]) -> LutResult<()>;
}

/// Shared handle to a processor, as handed out by the LUT caches.
pub type SharedProcessor = Arc<dyn ColorProcessor>;

impl ColorProcessor for ProcessList {
    fn apply_packed(&self, rgb: &mut [f32]) -> LutResult<()> {
        if rgb.len() % 3 != 0 {
            return Err(LutError::Processor(format!(
                "packed buffer length {} is not a multiple of 3",
                rgb.len()
            )));
        }
        for px in rgb.chunks_exact_mut(3) {
            let out = self.apply([px[0], px[1], px[2]]);
            px.copy_from_slice(&out);
        }
        Ok(())
    }
}
