//! # clut-math
//!
//! Math primitives used by the CLUT engine.
//!
//! - [`Mat3`] - 3x3 matrices for working-space/LUT-space conversions
//! - [`simd`] - 4-wide helpers built on [`wide`] for scanline processing
//! - [`adapt`] - Bradford chromatic adaptation
//! - [`Primaries`] and [`ColorManagement`] - RGB profile matrices
//! - [`transfer`] - sRGB gamma on the 16-bit scale and the PQ shaper
//!
//! # Design
//!
//! Matrices are **row-major** and act on **column vectors**. RGB triples are
//! plain `[f32; 3]` arrays so they can be copied in and out of image planes
//! without conversion.
//!
//! ```rust
//! use clut_math::{Mat3, ColorManagement, StandardProfiles};
//!
//! let cms = StandardProfiles::new();
//! let to_xyz = cms.working_space_matrix("sRGB").unwrap();
//! let from_xyz = cms.working_space_inverse_matrix("sRGB").unwrap();
//! let rgb = (from_xyz * to_xyz).transform([0.25, 0.5, 0.75]);
//! assert!((rgb[1] - 0.5).abs() < 1e-4);
//! ```
//!
//! # Dependencies
//!
//! - [`glam`] - matrix inversion
//! - [`wide`] - portable SIMD
//!
//! # Used By
//!
//! - `clut-lut` - Hald kernels
//! - `clut-store` - application pipeline

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod mat3;
mod primaries;
mod profiles;
pub mod adapt;
pub mod simd;
pub mod transfer;

pub use mat3::*;
pub use primaries::*;
pub use profiles::*;
