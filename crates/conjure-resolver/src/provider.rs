use std::path::PathBuf;

use url::Url;

use conjure_client::{Error, Pin, PipSolver, WheelClient};

/// The resolver's seam to the outside world.
///
/// The default implementation shells out to the index solver and downloads
/// over HTTP; tests substitute canned transcripts and locally built wheels.
/// Swapping the scraped transcript for a structured index query only means
/// replacing this implementation, never the cache or conflict logic.
pub trait ResolverProvider {
    /// Run the index solver in dry-run mode for `target`, honoring `pins`,
    /// and return its full diagnostic transcript.
    fn solve(&self, target: &str, pins: &[Pin]) -> Result<String, Error>;

    /// Retrieve the wheel at `url` into a file that stays readable for the
    /// remainder of the process.
    fn fetch(&self, url: &Url) -> Result<PathBuf, Error>;
}

/// The production provider: pip for solving, the file host for wheels.
#[derive(Debug)]
pub struct DefaultResolverProvider {
    solver: PipSolver,
    client: WheelClient,
}

impl DefaultResolverProvider {
    pub fn new(solver: PipSolver, client: WheelClient) -> Self {
        Self { solver, client }
    }
}

impl ResolverProvider for DefaultResolverProvider {
    fn solve(&self, target: &str, pins: &[Pin]) -> Result<String, Error> {
        self.solver.solve(target, pins)
    }

    fn fetch(&self, url: &Url) -> Result<PathBuf, Error> {
        self.client.fetch(url)
    }
}
