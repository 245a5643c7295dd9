use std::str::FromStr;

use crate::{InvalidNameError, MODULE_VALIDATE};

/// The exact identifier used at the point of import.
///
/// Module names are never normalized: the module loader's namespace is
/// case-sensitive even where the package index's is not, so `Q` and `q` are
/// two distinct, independently resolvable names. Only syntactically valid
/// identifiers are representable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a validated module name, preserving it verbatim.
    pub fn new(name: String) -> Result<Self, InvalidNameError> {
        if MODULE_VALIDATE.is_match(&name) {
            Ok(Self(name))
        } else {
            Err(InvalidNameError(name))
        }
    }
}

impl FromStr for ModuleName {
    type Err = InvalidNameError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::new(name.to_string())
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
