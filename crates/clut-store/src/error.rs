//! Error types for the store, subprocesses and CTL scripts.
//!
//! Store lookups report failures through `Option`/`ok()` and log the
//! [`StoreError`] behind them; the typed errors surface through the
//! `try_*` variants and the collaborator traits.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors resolving or evaluating a LUT.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Loading or parsing the LUT itself failed.
    #[error(transparent)]
    Lut(#[from] clut_lut::LutError),

    /// Parameter or configuration error.
    #[error(transparent)]
    Core(#[from] clut_core::Error),

    /// CTL compilation, validation or evaluation failed.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// An external LUT generator failed.
    #[error(transparent)]
    Subprocess(#[from] SubprocessError),

    /// Malformed external LUT manifest.
    #[error("{path}: invalid manifest: {reason}")]
    Manifest {
        /// Manifest file
        path: PathBuf,
        /// What was wrong
        reason: String,
    },

    /// No backend accepts the file.
    #[error("{0}: unsupported LUT type")]
    Unsupported(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors running an external command.
#[derive(Debug, Error)]
pub enum SubprocessError {
    /// Empty command line.
    #[error("empty command line")]
    EmptyCommand,

    /// The process could not be started.
    #[error("cannot run `{program}`: {source}")]
    Spawn {
        /// Executable
        program: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The process exited unsuccessfully.
    #[error("`{program}` exited with {status}: {stderr}")]
    ExitStatus {
        /// Executable
        program: String,
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The process was killed after running too long.
    #[error("`{program}` timed out after {timeout:?}")]
    Timeout {
        /// Executable
        program: String,
        /// Configured limit
        timeout: Duration,
    },

    /// Waiting on or reading from the process failed.
    #[error("I/O error talking to `{program}`: {source}")]
    Io {
        /// Executable
        program: String,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Errors from CTL script handling.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The engine could not compile the script.
    #[error("compile error: {0}")]
    Compile(String),

    /// `ART_main` or a header directive is malformed.
    #[error("{0}")]
    Signature(String),

    /// Binding a value or evaluating the function failed.
    #[error("call error: {0}")]
    Call(String),
}
