use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

use regex::Regex;

pub use module_name::ModuleName;
pub use package_name::PackageName;

mod module_name;
mod package_name;

pub(crate) static NAME_NORMALIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());
pub(crate) static NAME_VALIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^([A-Z0-9]|[A-Z0-9][A-Z0-9._-]*[A-Z0-9])$").unwrap());
pub(crate) static MODULE_VALIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub(crate) fn validate_and_normalize_ref(
    name: impl AsRef<str>,
) -> Result<String, InvalidNameError> {
    if !NAME_VALIDATE.is_match(name.as_ref()) {
        return Err(InvalidNameError(name.as_ref().to_string()));
    }
    let mut normalized = NAME_NORMALIZE.replace_all(name.as_ref(), "-").to_string();
    normalized.make_ascii_lowercase();
    Ok(normalized)
}

pub(crate) fn validate_and_normalize_owned(mut name: String) -> Result<String, InvalidNameError> {
    if !NAME_VALIDATE.is_match(name.as_ref()) {
        return Err(InvalidNameError(name));
    }
    let normalized = NAME_NORMALIZE.replace_all(&name, "-");
    // fast path: don't allocate if nothing needed collapsing
    if normalized != name {
        name = normalized.to_string();
    }
    name.make_ascii_lowercase();
    Ok(name)
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidNameError(pub(crate) String);

impl Display for InvalidNameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Not a valid project or module name: \"{}\". Names must start with a letter, digit \
            or underscore and may only contain -, _, ., and alphanumeric characters",
            self.0
        )
    }
}

impl Error for InvalidNameError {}
