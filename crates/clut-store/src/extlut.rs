//! LUTs computed by an external command described in a JSON manifest.
//!
//! ```json
//! {
//!     "ART-lut3d": {
//!         "command": "python3 make_lut.py --fast",
//!         "label": "My generator",
//!         "params": [
//!             ["contrast", "Contrast", -1.0, 1.0, 0.0],
//!             ["mode", "Mode", ["Soft", "Hard"], 0]
//!         ]
//!     }
//! }
//! ```
//!
//! The command runs in the manifest's directory with two extra arguments:
//! a JSON file holding the parameter values and the path the generated CLF
//! must be written to.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clut_core::{ParamDescriptor, ParamValueMap};
use clut_lut::SharedProcessor;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ctl::header::resolve_label;
use crate::subprocess::CommandRunner;
use crate::{ClutStore, StoreError, StoreResult};

/// Top-level manifest key.
pub const MANIFEST_KEY: &str = "ART-lut3d";

/// A parsed manifest plus the processor for the last bound values.
#[derive(Debug, Clone)]
pub struct ExternalLut {
    path: PathBuf,
    workdir: PathBuf,
    argv: Vec<String>,
    params: Vec<ParamDescriptor>,
    label: String,
    processor: Option<SharedProcessor>,
    ok: bool,
}

impl ExternalLut {
    /// Parses the manifest at `path`.
    pub fn from_manifest(path: &Path) -> StoreResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(path, &text)
    }

    /// Parses manifest `text` as if read from `path`.
    pub fn parse(path: &Path, text: &str) -> StoreResult<Self> {
        let bad = |reason: String| StoreError::Manifest {
            path: path.to_path_buf(),
            reason,
        };

        let root: Value = serde_json::from_str(text).map_err(|e| bad(e.to_string()))?;
        let root = root
            .get(MANIFEST_KEY)
            .filter(|v| v.is_object())
            .ok_or_else(|| bad(format!("missing \"{MANIFEST_KEY}\" object")))?;

        let command = root
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| bad("\"command\" must be a string".into()))?;
        let argv = shlex::split(command).ok_or_else(|| bad(format!("cannot split command line {command:?}")))?;
        if argv.is_empty() {
            return Err(bad("empty command".into()));
        }

        let params = match root.get("params") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| ParamDescriptor::parse_any(item).map_err(|e| bad(e.to_string())))
                .collect::<StoreResult<_>>()?,
            Some(_) => return Err(bad("\"params\" must be an array".into())),
        };

        let label = match root.get("label") {
            None => String::new(),
            Some(Value::String(s)) => resolve_label(s),
            Some(_) => return Err(bad("\"label\" must be a string".into())),
        };
        let label = if label.is_empty() {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            label
        };

        let workdir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            path: path.to_path_buf(),
            workdir,
            argv,
            params,
            label,
            processor: None,
            ok: true,
        })
    }

    /// False once computing the LUT has failed.
    pub fn ok(&self) -> bool {
        self.ok
    }

    /// Manifest path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the command runs in.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Command line, without the two appended file arguments.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Declared parameters.
    pub fn param_descriptors(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Processor computed by the last successful [`set_param_values`](Self::set_param_values).
    pub fn processor(&self) -> Option<&SharedProcessor> {
        self.processor.as_ref()
    }

    /// Computes (or fetches from cache) the LUT for `values`.
    ///
    /// On failure the LUT is marked unusable.
    pub fn set_param_values(&mut self, store: &ClutStore, values: &ParamValueMap) -> bool {
        if !self.ok {
            return false;
        }
        match store.external_processor(self, values) {
            Ok(p) => {
                self.processor = Some(p);
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot compute external LUT");
                self.processor = None;
                self.ok = false;
                false
            }
        }
    }

    /// Runs the command with `params_json` and returns the file it wrote.
    pub(crate) fn generate(
        &self,
        runner: &dyn CommandRunner,
        params_json: &str,
        timeout: Option<Duration>,
    ) -> StoreResult<Vec<u8>> {
        let scratch = tempfile::Builder::new().prefix("clut-extlut-").tempdir()?;
        let params_file = scratch.path().join("params.json");
        let out_file = scratch.path().join("lut.clf");
        fs::write(&params_file, params_json)?;

        let mut argv = self.argv.clone();
        argv.push(params_file.to_string_lossy().into_owned());
        argv.push(out_file.to_string_lossy().into_owned());

        debug!(?argv, workdir = %self.workdir.display(), "running LUT generator");
        let output = runner.exec_sync(&self.workdir, &argv, timeout)?;
        debug!(stdout = %output.stdout, stderr = %output.stderr, "LUT generator finished");

        Ok(fs::read(&out_file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clut_core::ParamKind;

    fn parse(text: &str) -> StoreResult<ExternalLut> {
        ExternalLut::parse(Path::new("/luts/warm.json"), text)
    }

    #[test]
    fn test_parse_full() {
        let lut = parse(
            r#"{"ART-lut3d": {
                "command": "python3 'gen lut.py' -q",
                "label": "$GEN;Generator",
                "params": [
                    ["strength", "Strength", 0, 100, 50],
                    ["gain", "Gain", 0.0, 2.0, 1.5],
                    ["invert", "Invert", false],
                    ["mode", "Mode", ["A", "B"], 1]
                ]
            }}"#,
        )
        .unwrap();
        assert!(lut.ok());
        assert_eq!(lut.argv(), ["python3", "gen lut.py", "-q"]);
        assert_eq!(lut.workdir(), Path::new("/luts"));
        assert_eq!(lut.label(), "Generator");
        let kinds: Vec<_> = lut.param_descriptors().iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            [ParamKind::Int, ParamKind::Float, ParamKind::Bool, ParamKind::Choice]
        );
        assert!(lut.processor().is_none());
    }

    #[test]
    fn test_label_falls_back_to_stem() {
        let lut = parse(r#"{"ART-lut3d": {"command": "gen"}}"#).unwrap();
        assert_eq!(lut.label(), "warm");
        assert!(lut.param_descriptors().is_empty());
    }

    #[test]
    fn test_rejects_bad_manifests() {
        for text in [
            "not json",
            r#"{"other": {}}"#,
            r#"{"ART-lut3d": {"command": 3}}"#,
            r#"{"ART-lut3d": {"command": ""}}"#,
            r#"{"ART-lut3d": {"command": "gen \"unterminated"}}"#,
            r#"{"ART-lut3d": {"command": "gen", "params": {}}}"#,
            r#"{"ART-lut3d": {"command": "gen", "params": [["x"]]}}"#,
            r#"{"ART-lut3d": {"command": "gen", "label": 1}}"#,
        ] {
            assert!(
                matches!(parse(text), Err(StoreError::Manifest { .. })),
                "{text}"
            );
        }
    }
}
