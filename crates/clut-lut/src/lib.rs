//! # clut-lut
//!
//! Lookup tables evaluated by the CLUT engine.
//!
//! - [`HaldClut`] - Hald image tables with scalar and SIMD trilinear kernels
//! - [`Lut1D`] / [`Lut3D`] - per-channel curves and RGB cubes
//! - [`clf`] - Academy Common LUT Format reader (plain or gzipped)
//! - [`ColorProcessor`] - packed-RGB transform interface backed by CLF
//! - [`ImageLoader`] / [`PngLoader`] - 16-bit RGB decoding for Hald tables
//!
//! # Usage
//!
//! ```rust
//! use clut_lut::{Lut3D, Interpolation};
//!
//! let lut = Lut3D::identity(17).with_interpolation(Interpolation::Tetrahedral);
//! let rgb = lut.apply([0.5, 0.3, 0.2]);
//! assert!((rgb[0] - 0.5).abs() < 1e-5);
//! ```
//!
//! # Dependencies
//!
//! - [`clut-math`] - SIMD helpers, matrices
//! - [`quick_xml`] - CLF parsing
//! - [`flate2`] - `.clfz` decompression
//! - [`png`] - Hald image decoding
//! - [`thiserror`] - error handling
//!
//! # Used By
//!
//! - `clut-store` - LUT caches and the application pipeline

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod hald;
mod image;
mod lut1d;
mod lut3d;
mod processor;
pub mod clf;

pub use clf::{ProcessList, ProcessNode, decode_clf, read_clf};
pub use error::{LutError, LutResult};
pub use hald::{HaldClut, Kernel};
pub use image::{ImageLoader, PngLoader, Rgb16Image, write_png16};
pub use lut1d::Lut1D;
pub use lut3d::{Interpolation, Lut3D};
pub use processor::{ColorProcessor, SharedProcessor};
