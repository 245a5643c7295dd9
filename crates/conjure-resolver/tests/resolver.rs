//! Integration tests for the resolution facade, driven by a scripted
//! provider instead of a live interpreter and index.

use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use url::Url;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use conjure_client::{Error, Pin};
use conjure_normalize::ModuleName;
use conjure_resolver::{ResolveError, Resolver, ResolverProvider};

/// A provider that answers from canned transcripts and locally built wheels.
struct Scripted {
    dir: TempDir,
    transcripts: HashMap<String, String>,
    wheels: HashMap<String, PathBuf>,
    solves: Arc<AtomicUsize>,
}

impl Scripted {
    fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
            transcripts: HashMap::new(),
            wheels: HashMap::new(),
            solves: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Script the transcript pip would print for `target`.
    fn transcript(&mut self, target: &str, transcript: impl Into<String>) {
        self.transcripts.insert(target.to_string(), transcript.into());
    }

    /// Build a wheel with the given (empty) members and serve it under
    /// `filename`.
    fn wheel(&mut self, filename: &str, members: &[&str]) -> Result<()> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for member in members {
            writer.start_file(*member, SimpleFileOptions::default())?;
            writer.write_all(b"")?;
        }
        let buffer = writer.finish()?.into_inner();
        let path = self.dir.path().join(filename);
        fs_err::write(&path, buffer)?;
        self.wheels.insert(filename.to_string(), path);
        Ok(())
    }

    fn solve_count(&self) -> Arc<AtomicUsize> {
        self.solves.clone()
    }
}

impl ResolverProvider for Scripted {
    fn solve(&self, target: &str, _pins: &[Pin]) -> Result<String, Error> {
        self.solves.fetch_add(1, Ordering::SeqCst);
        self.transcripts.get(target).cloned().ok_or_else(|| {
            // The closest scripted equivalent of pip exiting non-zero.
            Error::SolverLaunch {
                executable: PathBuf::from("pip"),
                err: std::io::Error::new(std::io::ErrorKind::NotFound, "no transcript scripted"),
            }
        })
    }

    fn fetch(&self, url: &Url) -> Result<PathBuf, Error> {
        let filename = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        self.wheels.get(filename).cloned().ok_or(Error::WheelStatus {
            url: url.clone(),
            status: reqwest::StatusCode::NOT_FOUND,
        })
    }
}

/// A maximum-verbosity link line for a wheel named `{stem}-{version}`.
fn link_line(project: &str, stem: &str, version: &str) -> String {
    format!(
        "  Found link https://files.pythonhosted.org/packages/aa/bb/{zeros}/{stem}-{version}-py3-none-any.whl (from https://pypi.org/simple/{project}/), version: {version}",
        zeros = "0".repeat(60),
    )
}

fn module(name: &str) -> ModuleName {
    name.parse().unwrap()
}

#[test]
fn resolve_single_module_project() -> Result<()> {
    let mut scripted = Scripted::new()?;
    scripted.transcript(
        "q",
        format!("{}\nWould install q-2.4.3\n", link_line("q", "q", "2.4.3")),
    );
    scripted.wheel("q-2.4.3-py3-none-any.whl", &["q.py"])?;
    let solves = scripted.solve_count();
    let resolver = Resolver::new(scripted);

    let dist = resolver.resolve(&module("q"), true).expect("q resolves");
    assert_eq!(dist.name().as_ref(), "q");
    assert_eq!(dist.version(), "2.4.3");
    assert!(dist.origin().path().ends_with("/q-2.4.3-py3-none-any.whl"));
    assert!(dist.source().exists());
    assert_eq!(
        dist.submodule_search_location(&module("q")),
        dist.source().join("q")
    );

    // Idempotent: the same record comes back with zero extra solver calls.
    let again = resolver.resolve(&module("q"), true).expect("cached");
    assert!(Arc::ptr_eq(&dist, &again));
    assert_eq!(solves.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn resolve_commits_every_required_project() -> Result<()> {
    let mut scripted = Scripted::new()?;
    scripted.transcript(
        "virtualenv",
        format!(
            "{}\n{}\nWould install virtualenv-20.25.0 platformdirs-4.1.0\n",
            link_line("virtualenv", "virtualenv", "20.25.0"),
            link_line("platformdirs", "platformdirs", "4.1.0"),
        ),
    );
    scripted.wheel(
        "virtualenv-20.25.0-py3-none-any.whl",
        &["virtualenv/__init__.py"],
    )?;
    scripted.wheel(
        "platformdirs-4.1.0-py3-none-any.whl",
        &["platformdirs/__init__.py"],
    )?;
    let solves = scripted.solve_count();
    let resolver = Resolver::new(scripted);

    let virtualenv = resolver
        .resolve(&module("virtualenv"), true)
        .expect("virtualenv resolves");
    assert_eq!(virtualenv.version(), "20.25.0");

    // The dependency was committed by the same attempt; no re-solve.
    let platformdirs = resolver
        .resolve(&module("platformdirs"), true)
        .expect("platformdirs already committed");
    assert_eq!(platformdirs.version(), "4.1.0");
    assert_eq!(solves.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn multi_module_distribution_binds_all_names() -> Result<()> {
    let mut scripted = Scripted::new()?;
    scripted.transcript(
        "attrs",
        format!(
            "{}\nWould install attrs-23.1.0\n",
            link_line("attrs", "attrs", "23.1.0")
        ),
    );
    scripted.wheel(
        "attrs-23.1.0-py3-none-any.whl",
        &["attr/__init__.py", "attrs/__init__.py"],
    )?;
    let solves = scripted.solve_count();
    let resolver = Resolver::new(scripted);

    let attrs = resolver.resolve(&module("attrs"), true).expect("attrs");
    let attr = resolver.resolve(&module("attr"), true).expect("attr");
    assert!(Arc::ptr_eq(&attrs, &attr));
    assert_eq!(solves.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn conflicting_version_is_rejected_without_side_effects() -> Result<()> {
    let mut scripted = Scripted::new()?;
    scripted.transcript(
        "sample",
        format!(
            "{}\nWould install sample-1.0\n",
            link_line("sample", "sample", "1.0")
        ),
    );
    scripted.wheel("sample-1.0-py3-none-any.whl", &["sample.py"])?;
    // A later request whose solve drags in a different version of `sample`.
    scripted.transcript(
        "extra",
        format!(
            "{}\n{}\nWould install extra-1.0 sample-2.0\n",
            link_line("extra", "extra", "1.0"),
            link_line("sample", "sample", "2.0"),
        ),
    );
    scripted.wheel("extra-1.0-py3-none-any.whl", &["extra.py"])?;
    scripted.wheel("sample-2.0-py3-none-any.whl", &["sample.py"])?;
    let resolver = Resolver::new(scripted);

    let sample = resolver.resolve(&module("sample"), true).expect("sample");
    assert_eq!(sample.version(), "1.0");

    let err = resolver.try_resolve(&module("extra"), true).unwrap_err();
    assert!(matches!(err, ResolveError::Conflict { .. }), "{err}");

    // The failed attempt left nothing behind: the old binding is untouched
    // and the new module name was never committed.
    let still = resolver.resolve(&module("sample"), true).expect("sample");
    assert!(Arc::ptr_eq(&sample, &still));
    assert!(matches!(
        resolver.try_resolve(&module("extra"), true),
        Err(ResolveError::Conflict { .. })
    ));
    Ok(())
}

#[test]
fn failed_attempts_roll_back() -> Result<()> {
    let mut scripted = Scripted::new()?;
    scripted.transcript(
        "q",
        format!("{}\nWould install q-2.4.3\n", link_line("q", "q", "2.4.3")),
    );
    scripted.wheel("q-2.4.3-py3-none-any.whl", &["q.py"])?;
    // Solver succeeded but printed no report.
    scripted.transcript("noreport", "Collecting noreport\n");
    // Solver wants a project it never linked.
    scripted.transcript("ghost", "Would install ghost-1.0\n");
    // Linked, but the file host has nothing.
    scripted.transcript(
        "gone",
        format!(
            "{}\nWould install gone-1.0\n",
            link_line("gone", "gone", "1.0")
        ),
    );
    let resolver = Resolver::new(scripted);

    let q = resolver.resolve(&module("q"), true).expect("q");

    assert!(matches!(
        resolver.try_resolve(&module("unscripted"), true),
        Err(ResolveError::Client(Error::SolverLaunch { .. }))
    ));
    assert!(matches!(
        resolver.try_resolve(&module("noreport"), true),
        Err(ResolveError::NoInstallReport(_))
    ));
    assert!(matches!(
        resolver.try_resolve(&module("ghost"), true),
        Err(ResolveError::MissingCandidate(_))
    ));
    assert!(matches!(
        resolver.try_resolve(&module("gone"), true),
        Err(ResolveError::Client(Error::WheelStatus { .. }))
    ));

    // Every failure mode above left the committed state intact.
    let still = resolver.resolve(&module("q"), true).expect("q survives");
    assert!(Arc::ptr_eq(&q, &still));
    Ok(())
}

#[test]
fn module_names_differing_in_case_are_distinct_requests() -> Result<()> {
    let mut scripted = Scripted::new()?;
    scripted.transcript(
        "PIL",
        format!(
            "{}\nWould install pillow-10.1.0\n",
            link_line("Pillow", "Pillow", "10.1.0")
        ),
    );
    scripted.wheel("Pillow-10.1.0-py3-none-any.whl", &["PIL/__init__.py"])?;
    let solves = scripted.solve_count();
    let resolver = Resolver::new(scripted);

    assert!(resolver.resolve(&module("PIL"), true).is_some());

    // The lowercase spelling is its own request; nothing is scripted for it,
    // so it fails rather than being satisfied by the `PIL` binding.
    assert!(resolver.resolve(&module("pil"), true).is_none());
    assert_eq!(solves.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn preregister_covers_name_mismatches() -> Result<()> {
    let mut scripted = Scripted::new()?;
    scripted.transcript(
        "beautifulsoup4",
        format!(
            "{}\nWould install beautifulsoup4-4.12.2\n",
            link_line("beautifulsoup4", "beautifulsoup4", "4.12.2")
        ),
    );
    scripted.wheel(
        "beautifulsoup4-4.12.2-py3-none-any.whl",
        &["bs4/__init__.py"],
    )?;
    let solves = scripted.solve_count();
    let resolver = Resolver::new(scripted);

    // The import name never matches the project name, so only the escape
    // hatch can seed the cache.
    assert!(resolver.preregister("beautifulsoup4"));
    let bs4 = resolver.resolve(&module("bs4"), true).expect("bs4");
    assert_eq!(bs4.name().as_ref(), "beautifulsoup4");
    assert_eq!(solves.load(Ordering::SeqCst), 1);

    assert!(!resolver.preregister("unscripted"));
    Ok(())
}

#[test]
fn reload_re_consults_the_index() -> Result<()> {
    let mut scripted = Scripted::new()?;
    scripted.transcript(
        "virtualenv",
        format!(
            "{}\n{}\nWould install virtualenv-20.25.0 platformdirs-4.1.0\n",
            link_line("virtualenv", "virtualenv", "20.25.0"),
            link_line("platformdirs", "platformdirs", "4.1.0"),
        ),
    );
    scripted.wheel(
        "virtualenv-20.25.0-py3-none-any.whl",
        &["virtualenv/__init__.py"],
    )?;
    scripted.wheel(
        "platformdirs-4.1.0-py3-none-any.whl",
        &["platformdirs/__init__.py"],
    )?;
    let solves = scripted.solve_count();
    let resolver = Resolver::new(scripted);

    let first = resolver.resolve(&module("virtualenv"), true).expect("first");

    // A reload bypasses the binding and solves again.
    let second = resolver
        .resolve(&module("virtualenv"), false)
        .expect("reload");
    assert_eq!(solves.load(Ordering::SeqCst), 2);
    assert_eq!(first.version(), second.version());
    assert!(!Arc::ptr_eq(&first, &second));

    // The dependency came from a different project, so eviction spared it.
    assert!(resolver.resolve(&module("platformdirs"), true).is_some());
    assert_eq!(solves.load(Ordering::SeqCst), 2);
    Ok(())
}
