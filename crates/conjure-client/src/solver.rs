use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::NamedTempFile;
use tracing::debug;

use conjure_normalize::PackageName;

use crate::Error;

/// A project already resolved in this process, pinned to its committed
/// version. Serialized into the constraints file as `name==version`.
pub type Pin = (PackageName, String);

/// A client for the external index solver: `pip`, driven in dry-run mode.
///
/// The solver is only ever asked "what would happen"; nothing it does is
/// allowed to touch the interpreter environment, which is why the invocation
/// carries `--dry-run` and `--no-cache-dir` alongside the constraints file.
#[derive(Debug, Clone)]
pub struct PipSolver {
    executable: PathBuf,
}

impl PipSolver {
    /// A solver driven through the given Python executable.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Detect the ambient interpreter: the active virtualenv if one is set,
    /// otherwise whatever `python3` resolves to on `PATH`.
    pub fn from_env() -> Self {
        if let Some(venv) = env::var_os("VIRTUAL_ENV") {
            let executable = if cfg!(windows) {
                Path::new(&venv).join("Scripts").join("python.exe")
            } else {
                Path::new(&venv).join("bin").join("python")
            };
            return Self::new(executable);
        }
        Self::new("python3")
    }

    /// Returns the Python executable the solver runs under.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Ask the solver what installing `target` would do, without doing it,
    /// and return the full diagnostic transcript.
    ///
    /// Every pin is written to a temporary constraints file so that a prior
    /// resolution can never be contradicted by this one; the file is removed
    /// when the call returns, success or failure.
    pub fn solve(&self, target: &str, pins: &[Pin]) -> Result<String, Error> {
        let mut constraints = NamedTempFile::new().map_err(Error::Constraints)?;
        for (name, version) in pins {
            writeln!(constraints, "{name}=={version}").map_err(Error::Constraints)?;
        }
        constraints.flush().map_err(Error::Constraints)?;

        debug!(
            "Running dry-run solve for `{target}` with {} pinned projects",
            pins.len()
        );
        let output = Command::new(&self.executable)
            .args(["-m", "pip", "install"])
            .args(["--only-binary", ":all:"])
            .arg("--no-cache-dir")
            .arg("--dry-run")
            .arg("-vv")
            .arg("--no-color")
            .args(["--progress-bar", "off"])
            .arg("-c")
            .arg(constraints.path())
            .arg(target)
            .output()
            .map_err(|err| Error::SolverLaunch {
                executable: self.executable.clone(),
                err,
            })?;

        if !output.status.success() {
            return Err(Error::SolverStatus {
                target: target.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
