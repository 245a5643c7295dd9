use std::collections::BTreeSet;
use std::path::Path;

use zip::result::ZipError;
use zip::ZipArchive;

use conjure_normalize::ModuleName;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Zip(#[from] ZipError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// File extensions the Python import machinery treats as loadable units.
pub const LOADABLE_SUFFIXES: &[&str] = &[".py", ".pyc", ".so", ".pyd"];

/// The member stem marking a directory-shaped module's initializer.
pub const INITIALIZER_STEM: &str = "/__init__";

/// Returns the set of top-level module names the wheel provides.
pub fn top_level_modules(wheel: &Path) -> Result<BTreeSet<ModuleName>, Error> {
    top_level_modules_with(wheel, LOADABLE_SUFFIXES, INITIALIZER_STEM)
}

/// Like [`top_level_modules`], with the loadable-unit suffixes and
/// initializer convention supplied by the caller (they vary per target
/// ecosystem).
///
/// A member yields a module name by stripping its recognized suffix and, for
/// initializer members, the trailing initializer stem. Whatever remains must
/// be a syntactically valid identifier; that requirement is also what rules
/// out nested members, since a path separator can never appear in an
/// identifier.
pub fn top_level_modules_with(
    wheel: &Path,
    suffixes: &[&str],
    initializer_stem: &str,
) -> Result<BTreeSet<ModuleName>, Error> {
    let archive = ZipArchive::new(fs_err::File::open(wheel)?)?;
    let mut modules = BTreeSet::new();
    for member in archive.file_names() {
        let Some(stem) = suffixes
            .iter()
            .find_map(|suffix| member.strip_suffix(suffix))
        else {
            continue;
        };
        let stem = stem.strip_suffix(initializer_stem).unwrap_or(stem);
        if let Ok(module) = ModuleName::new(stem.to_string()) {
            modules.insert(module);
        }
    }
    Ok(modules)
}
