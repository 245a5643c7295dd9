pub use dry_run::{DryRunReport, SolverCandidate};
pub use error::ResolveError;
pub use provider::{DefaultResolverProvider, ResolverProvider};
pub use resolver::{ResolvedDist, Resolver};

mod dry_run;
mod error;
mod provider;
mod resolver;
