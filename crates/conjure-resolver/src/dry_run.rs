use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;
use url::Url;

use conjure_normalize::PackageName;

use crate::ResolveError;

/// A download location the solver printed for one project, scraped out of a
/// maximum-verbosity link line. Discarded after each resolution attempt.
#[derive(Debug, Clone)]
pub struct SolverCandidate {
    /// The project name as the index page printed it, un-normalized.
    pub project: String,
    /// The dot-separated version, compared verbatim.
    pub version: String,
    /// Where the wheel lives on the file host.
    pub url: Url,
}

/// The one link-line shape the index is known to emit: a canonical file-host
/// path (two 2-hex bucket directories, one 60-hex bucket, a five-part wheel
/// filename), the index page that linked to it, optional install
/// conditions, and a version suffix. No other transcript line is assumed
/// stable.
static PACKAGE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        link[\ ]
        (?P<url>
         https://files\.pythonhosted\.org/packages/   # where the index stores wheels
         [0-9a-f]{2}/[0-9a-f]{2}/[0-9a-f]{60}/        # hash buckets
         (?P<package>.+?)                             # the filename stem opens the final component
         -[^-]+-[^-]+-[^-]+-[^-]+\.whl                # wheel names have five -separated parts
        )[\ ]
        \(from[\ ]https://pypi\.org/simple/           # the index page that linked to the host
        (?P<project>[^/]+)/\)                         # project name is the entire final component
        (?:[\ ]\([^)]*\))?,[\ ]                       # install conditions, when present
        version:[\ ](?P<version>[0-9.]+)
        ",
    )
    .unwrap()
});

/// Everything after this line is tool chatter unrelated to the solve.
const WOULD_INSTALL: &str = "Would install ";

/// What the solver said it would do for one request.
#[derive(Debug)]
pub struct DryRunReport {
    /// Candidate downloads, keyed by normalized project name.
    pub candidates: FxHashMap<PackageName, SolverCandidate>,
    /// The projects the solver actually needs for this request. Candidates
    /// outside this set were considered and discarded by the solver.
    pub would_install: FxHashSet<PackageName>,
}

impl DryRunReport {
    /// Scrape the authoritative pieces out of a dry-run transcript.
    ///
    /// An absent `Would install` line and one naming no projects both mean
    /// the transcript answered a different question than the one asked, and
    /// abort the attempt.
    pub fn parse(target: &str, transcript: &str) -> Result<Self, ResolveError> {
        let mut candidates = FxHashMap::default();
        let mut would_install = FxHashSet::default();

        for line in transcript.lines() {
            if let Some(captures) = PACKAGE_LINK.captures(line) {
                let Ok(project) = captures["project"].parse::<PackageName>() else {
                    warn!("Ignoring link line with invalid project name: {line}");
                    continue;
                };
                let Ok(url) = Url::parse(&captures["url"]) else {
                    warn!("Ignoring link line with invalid URL: {line}");
                    continue;
                };
                candidates.insert(
                    project,
                    SolverCandidate {
                        project: captures["project"].to_string(),
                        version: captures["version"].to_string(),
                        url,
                    },
                );
            }

            if let Some((_, tail)) = line.split_once(WOULD_INSTALL) {
                for token in tail.split(' ') {
                    // `q-2.4.3` names project `q`; a token without a version
                    // segment is taken whole.
                    let project = token.rsplit_once('-').map_or(token, |(project, _)| project);
                    if let Ok(project) = project.parse::<PackageName>() {
                        would_install.insert(project);
                    }
                }
                break;
            }
        }

        if would_install.is_empty() {
            return Err(ResolveError::NoInstallReport(target.to_string()));
        }
        Ok(Self {
            candidates,
            would_install,
        })
    }
}
