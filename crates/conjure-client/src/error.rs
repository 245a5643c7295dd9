use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum Error {
    /// The solver executable could not be spawned at all.
    #[error("Failed to launch the index solver at `{}`", executable.display())]
    SolverLaunch {
        executable: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// The solver ran, but exited non-zero (e.g. the requested name does not
    /// exist, or the pinned constraints are unsatisfiable).
    #[error("Dry-run solve for `{target}` failed with {status}:\n{stderr}")]
    SolverStatus {
        target: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The temporary constraints file could not be written.
    #[error("Failed to write the constraints file")]
    Constraints(#[source] std::io::Error),

    /// A generic transport error happened while fetching a wheel. Refer to
    /// the error message for more details.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    /// The file host answered, but not with the wheel.
    #[error("Failed to fetch wheel from `{url}`: HTTP {status}")]
    WheelStatus { url: Url, status: reqwest::StatusCode },

    /// The downloaded wheel could not be kept on disk.
    #[error("Failed to persist the downloaded wheel")]
    Persist(#[from] tempfile::PersistError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
