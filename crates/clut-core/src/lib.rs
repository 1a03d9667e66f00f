//! # clut-core
//!
//! Building blocks shared by every crate of the CLUT engine.
//!
//! - [`Grid2D`] - owned or borrowed 2D arrays with optional SIMD row padding
//! - [`BoundedCache`] - fixed-capacity LRU map used for in-memory LUT caches
//! - [`Fingerprint`] - content hash used to detect stale cache entries
//! - [`StoreConfig`] - engine settings loaded from YAML
//! - [`ParamDescriptor`] / [`ParamValueMap`] - user-adjustable LUT parameters
//! - [`Curve`] - evaluation of curve-typed parameter values
//!
//! # Usage
//!
//! ```rust
//! use clut_core::{ParamDescriptor, ParamKind};
//! use serde_json::json;
//!
//! let desc = ParamDescriptor::parse(&json!(["gain", "Gain", 0.0, 2.0, 1.0]), ParamKind::Float).unwrap();
//! assert_eq!(desc.value_default, vec![1.0]);
//! assert!((desc.gui_step - 0.02).abs() < 1e-9);
//! ```
//!
//! # Dependencies
//!
//! - [`serde`], [`serde_yaml`], [`serde_json`] - configuration and descriptors
//! - [`sha2`] - fingerprints
//! - [`thiserror`] - error type
//! - [`tracing`] - diagnostics
//!
//! # Used By
//!
//! - `clut-lut`, `clut-store`, `clut-cli`

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod config;
mod curve;
mod error;
mod fingerprint;
mod grid;
mod params;

pub use cache::*;
pub use config::*;
pub use curve::*;
pub use error::*;
pub use fingerprint::*;
pub use grid::*;
pub use params::*;
