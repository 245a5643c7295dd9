use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use tracing::debug;
use url::Url;

use conjure_client::{Pin, PipSolver, WheelClient};
use conjure_normalize::{ModuleName, PackageName};

use crate::dry_run::DryRunReport;
use crate::provider::{DefaultResolverProvider, ResolverProvider};
use crate::ResolveError;

/// A project pinned to the one version this process may ever see, together
/// with the wheel that provides it. Immutable once committed; every module
/// name a wheel provides points at the same record.
#[derive(Debug)]
pub struct ResolvedDist {
    name: PackageName,
    version: String,
    source: PathBuf,
    origin: Url,
}

impl ResolvedDist {
    /// The normalized project identity.
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    /// The resolved version, compared verbatim for conflict purposes.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The downloaded wheel backing every module this project provides,
    /// usable as a zip-import root.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The download URL, kept as provenance for the loader.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Where a loader should root `module`'s sub-modules.
    pub fn submodule_search_location(&self, module: &ModuleName) -> PathBuf {
        self.source.join(module.as_ref())
    }
}

impl fmt::Display for ResolvedDist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The constraints-file shape.
        write!(f, "{}=={}", self.name, self.version)
    }
}

type CacheMap = FxHashMap<ModuleName, Arc<ResolvedDist>>;

/// The resolution facade: maps a missing module name to a fetched,
/// conflict-free distribution.
///
/// The cache of committed bindings lives inside the resolver, not in process
/// globals; constructing a second resolver yields fully independent state.
/// Each call is a transaction: the lock is held across the whole
/// evict/solve/commit window, and an attempt mutates only a scratch clone
/// that is swapped in on full success, so a failed attempt leaves the cache
/// observationally untouched.
pub struct Resolver<Provider: ResolverProvider = DefaultResolverProvider> {
    provider: Provider,
    cache: Mutex<CacheMap>,
}

impl Resolver {
    /// A resolver wired to the ambient interpreter and the live index.
    pub fn from_env() -> Result<Self, conjure_client::Error> {
        Ok(Self::new(DefaultResolverProvider::new(
            PipSolver::from_env(),
            WheelClient::new()?,
        )))
    }
}

impl<Provider: ResolverProvider> Resolver<Provider> {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            cache: Mutex::new(CacheMap::default()),
        }
    }

    /// Resolve `name` to the distribution providing it, consulting the index
    /// if it is not already bound.
    ///
    /// `None` means "this reference cannot be satisfied" and is deliberately
    /// indistinguishable from the name not existing at all; the reasons are
    /// only logged. With `use_cache` off (a reload), the existing binding and
    /// its project siblings are evicted first so the index is re-consulted.
    pub fn resolve(&self, name: &ModuleName, use_cache: bool) -> Option<Arc<ResolvedDist>> {
        match self.try_resolve(name, use_cache) {
            Ok(dist) => dist,
            Err(err) => {
                debug!("Failed to resolve `{name}`: {err}");
                None
            }
        }
    }

    /// Like [`Resolver::resolve`], but surfaces why an attempt failed.
    pub fn try_resolve(
        &self,
        name: &ModuleName,
        use_cache: bool,
    ) -> Result<Option<Arc<ResolvedDist>>, ResolveError> {
        let mut cache = self.lock();
        if !use_cache {
            evict(&mut cache, name);
        }
        if let Some(dist) = cache.get(name) {
            return Ok(Some(dist.clone()));
        }
        *cache = self.attempt(&cache, name.as_ref())?;
        Ok(cache.get(name).cloned())
    }

    /// Resolve and commit a project by its index name, without requiring any
    /// module-name match.
    ///
    /// This is the escape hatch for projects whose import name differs from
    /// their index name (`beautifulsoup4` provides `bs4`): pre-registering
    /// the project makes every module it provides resolvable before the
    /// mismatched name is ever referenced.
    pub fn preregister(&self, project: &str) -> bool {
        match self.try_preregister(project) {
            Ok(()) => true,
            Err(err) => {
                debug!("Failed to pre-register `{project}`: {err}");
                false
            }
        }
    }

    /// Like [`Resolver::preregister`], but surfaces why an attempt failed.
    pub fn try_preregister(&self, project: &str) -> Result<(), ResolveError> {
        let mut cache = self.lock();
        *cache = self.attempt(&cache, project)?;
        Ok(())
    }

    /// Run one full solve, parse and commit pass and return the map that
    /// should replace the cache. The live map is untouched until the caller
    /// swaps the result in, which is what makes failure rollback-free.
    fn attempt(&self, cache: &CacheMap, target: &str) -> Result<CacheMap, ResolveError> {
        let transcript = self.provider.solve(target, &pins(cache))?;
        let report = DryRunReport::parse(target, &transcript)?;
        self.commit_attempt(cache, &report)
    }

    /// Fetch and index every project the solver requires, folding the new
    /// bindings into a scratch clone of `cache`.
    fn commit_attempt(
        &self,
        cache: &CacheMap,
        report: &DryRunReport,
    ) -> Result<CacheMap, ResolveError> {
        let mut scratch = cache.clone();
        for project in &report.would_install {
            let Some(candidate) = report.candidates.get(project) else {
                return Err(ResolveError::MissingCandidate(project.clone()));
            };
            let source = self.provider.fetch(&candidate.url)?;
            let dist = Arc::new(ResolvedDist {
                name: project.clone(),
                version: candidate.version.clone(),
                source,
                origin: candidate.url.clone(),
            });
            for module in conjure_extract::top_level_modules(dist.source())? {
                match scratch.get(&module) {
                    // Idempotent rebind: an earlier attempt already indexed
                    // this project at this version.
                    Some(existing)
                        if existing.name == dist.name && existing.version == dist.version => {}
                    Some(existing) => {
                        return Err(ResolveError::Conflict {
                            module,
                            existing: existing.to_string(),
                            candidate: dist.to_string(),
                        });
                    }
                    None => {
                        scratch.insert(module, dist.clone());
                    }
                }
            }
        }
        Ok(scratch)
    }

    fn lock(&self) -> MutexGuard<'_, CacheMap> {
        // A failed attempt never leaves partial state behind, so the map is
        // consistent even after a panic elsewhere.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drop `name`'s binding and every sibling binding from the same project.
/// A reload that kept the siblings would stay pinned to the stale version
/// when the index is re-consulted.
fn evict(cache: &mut CacheMap, name: &ModuleName) {
    if let Some(dist) = cache.remove(name) {
        cache.retain(|_, existing| existing.name != dist.name);
    }
}

/// One pin per distinct committed project.
fn pins(cache: &CacheMap) -> Vec<Pin> {
    let mut pins: FxHashMap<PackageName, String> = FxHashMap::default();
    for dist in cache.values() {
        pins.entry(dist.name.clone())
            .or_insert_with(|| dist.version.clone());
    }
    pins.into_iter().collect()
}
