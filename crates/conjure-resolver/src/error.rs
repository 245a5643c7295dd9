use thiserror::Error;

use conjure_normalize::{ModuleName, PackageName};

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The external solver failed to run, or a wheel download failed.
    #[error(transparent)]
    Client(#[from] conjure_client::Error),

    /// The dry-run transcript carried no interpretable `Would install`
    /// report for the request.
    #[error("The solver reported nothing it would install for `{0}`")]
    NoInstallReport(String),

    /// The solver wants a project installed but never printed a download
    /// location for it.
    #[error("No download location was reported for required project `{0}`")]
    MissingCandidate(PackageName),

    /// Binding the module would put two versions of one project in play.
    #[error("Module `{module}` is provided by `{existing}`, which conflicts with `{candidate}`")]
    Conflict {
        module: ModuleName,
        existing: String,
        candidate: String,
    },

    /// The fetched wheel could not be read as an archive.
    #[error(transparent)]
    Extract(#[from] conjure_extract::Error),
}
