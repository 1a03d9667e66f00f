//! Synchronous execution of external LUT generators.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::SubprocessError;

/// Captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Runs a command to completion.
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Runs `argv` in `workdir`, waiting at most `timeout` if given.
    ///
    /// A non-zero exit status is an error.
    fn exec_sync(
        &self,
        workdir: &Path,
        argv: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, SubprocessError>;
}

/// [`CommandRunner`] backed by [`std::process`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            // A read error only truncates the captured diagnostics.
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait_until(child: &mut Child, deadline: Instant) -> std::io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

impl CommandRunner for ProcessRunner {
    fn exec_sync(
        &self,
        workdir: &Path,
        argv: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput, SubprocessError> {
        let (program, args) = argv.split_first().ok_or(SubprocessError::EmptyCommand)?;
        trace!(?argv, workdir = %workdir.display(), "spawning");

        let io_err = |source| SubprocessError::Io {
            program: program.clone(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SubprocessError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match timeout {
            None => child.wait().map_err(io_err)?,
            Some(limit) => match wait_until(&mut child, Instant::now() + limit).map_err(io_err)? {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(SubprocessError::Timeout {
                        program: program.clone(),
                        timeout: limit,
                    });
                }
            },
        };

        let collect = |h: JoinHandle<Vec<u8>>| {
            h.join()
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default()
        };
        let output = CommandOutput {
            stdout: collect(stdout),
            stderr: collect(stderr),
        };

        if !status.success() {
            return Err(SubprocessError::ExitStatus {
                program: program.clone(),
                status: status.to_string(),
                stderr: output.stderr,
            });
        }
        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn test_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = ProcessRunner
            .exec_sync(dir.path(), &sh("pwd; echo oops >&2"), None)
            .unwrap();
        let pwd = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(std::fs::canonicalize(out.stdout.trim()).unwrap(), pwd);
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[test]
    fn test_exit_status() {
        let err = ProcessRunner
            .exec_sync(Path::new("."), &sh("echo bad >&2; exit 3"), None)
            .unwrap_err();
        match err {
            SubprocessError::ExitStatus { stderr, .. } => assert_eq!(stderr.trim(), "bad"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_timeout_kills() {
        let start = Instant::now();
        let err = ProcessRunner
            .exec_sync(Path::new("."), &sh("sleep 5"), Some(Duration::from_millis(100)))
            .unwrap_err();
        assert!(matches!(err, SubprocessError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_spawn_failure() {
        let err = ProcessRunner
            .exec_sync(Path::new("."), &["/nonexistent/generator".to_string()], None)
            .unwrap_err();
        assert!(matches!(err, SubprocessError::Spawn { .. }));
        assert!(matches!(
            ProcessRunner.exec_sync(Path::new("."), &[], None),
            Err(SubprocessError::EmptyCommand)
        ));
    }
}
