//! # clut-store
//!
//! Resolution, caching and application of color lookup tables.
//!
//! A [`ClutStore`] turns a LUT filename into one of four backends:
//!
//! | Backend | Files | Source |
//! |---------|-------|--------|
//! | Hald table | images (`.png`) | [`ImageLoader`](clut_lut::ImageLoader) |
//! | CLF transform | `.clf`, `.clfz` | [`clut_lut::clf`] |
//! | External generator | `.json` manifest | [`ExternalLut`], run through a [`CommandRunner`] |
//! | Parametric script | `.ctl` | [`ctl`], evaluated by a [`ScriptEngine`] |
//!
//! A [`ClutApplication`] binds a resolved LUT to a working profile and a
//! strength, and transforms scanlines or whole planes.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use clut_core::{OwnedGrid, StoreConfig};
//! use clut_store::{ClutApplication, ClutStore, Quality};
//!
//! let store = Arc::new(ClutStore::new(StoreConfig::default()));
//! let mut app = ClutApplication::new(store.clone(), "/luts/FilmACESp1.png", "ProPhoto", 0.8, 0);
//! assert!(app.set_param_values(&Default::default(), Quality::Highest));
//!
//! let mut r = OwnedGrid::filled(640, 480, 20000.0f32);
//! let mut g = OwnedGrid::filled(640, 480, 30000.0f32);
//! let mut b = OwnedGrid::filled(640, 480, 40000.0f32);
//! app.apply_planes(&mut r, &mut g, &mut b);
//! ```
//!
//! # Caching
//!
//! Tables, CLF transforms and compiled scripts are cached in memory and
//! revalidated against the SHA-256 of their file. Transforms produced by
//! external generators are also kept gzip-compressed in
//! [`StoreConfig::disk_cache_dir`](clut_core::StoreConfig::disk_cache_dir).
//!
//! # Dependencies
//!
//! - [`clut_core`], [`clut_math`], [`clut_lut`] - building blocks
//! - [`serde_json`] - manifests and parameter files
//! - [`shlex`] - command-line splitting
//! - [`flate2`], [`tempfile`] - disk cache and generator scratch files
//! - [`rayon`] - parallel plane processing
//! - [`tracing`] - diagnostics
//!
//! # Used By
//!
//! - `clut-cli`

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod application;
pub mod ctl;
mod disk_cache;
mod error;
mod extlut;
mod store;
mod subprocess;

pub use application::{Backend, CLF_PROFILE, ClutApplication, Quality};
pub use ctl::{CtlLut, CtlScript, ScriptEngine};
pub use disk_cache::{CACHE_EXT, DiskCache};
pub use error::*;
pub use extlut::{ExternalLut, MANIFEST_KEY};
pub use store::{ClutName, ClutStore, DEFAULT_PROFILE, SplitName};
pub use subprocess::{CommandOutput, CommandRunner, ProcessRunner};
