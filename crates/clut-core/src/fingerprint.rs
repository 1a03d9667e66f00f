//! Content fingerprints for cache invalidation.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// SHA-256 of a file's content, as lowercase hex.
///
/// Two fingerprints compare equal only if the hashed bytes were identical,
/// so a cached LUT whose source was rewritten in place is detected as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hashes the file at `path`.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hex(&hasher.finalize())))
    }

    /// Hashes an in-memory byte string.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex(&Sha256::digest(data)))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            Fingerprint::of_bytes(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_changes_are_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lut.clf");
        fs::write(&path, "one").unwrap();
        let a = Fingerprint::of_file(&path).unwrap();
        fs::write(&path, "two").unwrap();
        let b = Fingerprint::of_file(&path).unwrap();
        assert_ne!(a, b);
        assert_eq!(b, Fingerprint::of_bytes(b"two"));
    }

    #[test]
    fn test_missing_file() {
        assert!(Fingerprint::of_file(Path::new("/nonexistent/lut.png")).is_err());
    }
}
