//! Working-profile matrices.
//!
//! The CLUT engine never loads ICC profiles itself. It asks a
//! [`ColorManagement`] service for the RGB to XYZ matrix of a named working
//! profile and its inverse. [`StandardProfiles`] is the built-in service
//! covering the usual photo-editing working spaces.

use std::collections::BTreeMap;

use crate::adapt::adapt_matrix;
use crate::primaries::*;
use crate::Mat3;

/// Source of working-space matrices.
///
/// Matrices map linear RGB in the named profile to XYZ relative to a common
/// connection white (D50 for [`StandardProfiles`]).
pub trait ColorManagement: Send + Sync {
    /// RGB to XYZ matrix of `profile`.
    fn working_space_matrix(&self, profile: &str) -> Option<Mat3>;

    /// XYZ to RGB matrix of `profile`.
    fn working_space_inverse_matrix(&self, profile: &str) -> Option<Mat3>;

    /// Names of every known working profile.
    fn working_profiles(&self) -> Vec<String>;
}

/// Built-in working profiles, adapted to D50 with Bradford.
///
/// | Name | Primaries |
/// |------|-----------|
/// | `sRGB` | Rec.709 |
/// | `Adobe RGB` | Adobe RGB (1998) |
/// | `ProPhoto` | ROMM RGB |
/// | `Rec2020` | Rec.2020 |
/// | `ACESp0` | ACES AP0 |
/// | `ACESp1` | ACES AP1 |
/// | `WideGamut` | Adobe Wide Gamut |
#[derive(Debug, Clone)]
pub struct StandardProfiles {
    matrices: BTreeMap<&'static str, (Mat3, Mat3)>,
}

const PROFILES: [(&str, Primaries); 7] = [
    ("sRGB", SRGB),
    ("Adobe RGB", ADOBE_RGB),
    ("ProPhoto", PROPHOTO_RGB),
    ("Rec2020", REC2020),
    ("ACESp0", ACES_AP0),
    ("ACESp1", ACES_AP1),
    ("WideGamut", WIDE_GAMUT_RGB),
];

impl StandardProfiles {
    /// Computes the matrices of every built-in profile.
    pub fn new() -> Self {
        let d50 = Primaries { w: D50_XY, ..SRGB }.white_xyz();
        let matrices = PROFILES
            .iter()
            .map(|(name, p)| {
                let to_xyz = adapt_matrix(p.white_xyz(), d50) * rgb_to_xyz_matrix(p);
                let from_xyz = to_xyz.inverse().unwrap_or(Mat3::IDENTITY);
                (*name, (to_xyz, from_xyz))
            })
            .collect();
        Self { matrices }
    }
}

impl Default for StandardProfiles {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorManagement for StandardProfiles {
    fn working_space_matrix(&self, profile: &str) -> Option<Mat3> {
        self.matrices.get(profile).map(|m| m.0)
    }

    fn working_space_inverse_matrix(&self, profile: &str) -> Option<Mat3> {
        self.matrices.get(profile).map(|m| m.1)
    }

    fn working_profiles(&self) -> Vec<String> {
        PROFILES.iter().map(|(name, _)| name.to_string()).collect()
    }
}
