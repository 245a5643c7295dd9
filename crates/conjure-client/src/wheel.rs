use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::Error;

/// How long a single wheel download may take end to end.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A client for the package index's file host.
#[derive(Debug, Clone)]
pub struct WheelClient {
    client: reqwest::blocking::Client,
}

impl WheelClient {
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Retrieve the wheel at `url` into a uniquely named file and return its
    /// path.
    ///
    /// The file is persisted rather than temporary: modules loaded out of
    /// the wheel keep reading from it for the remainder of the process, so
    /// the handle must outlive this client.
    pub fn fetch(&self, url: &Url) -> Result<PathBuf, Error> {
        debug!("Fetching wheel from `{url}`");
        let response = self.client.get(url.clone()).send()?;
        if !response.status().is_success() {
            return Err(Error::WheelStatus {
                url: url.clone(),
                status: response.status(),
            });
        }
        let bytes = response.bytes()?;

        let mut file = tempfile::Builder::new().suffix(".whl").tempfile()?;
        file.write_all(&bytes)?;
        let (_, path) = file.keep()?;
        debug!("Stored wheel for `{url}` at `{}`", path.display());
        Ok(path)
    }
}
