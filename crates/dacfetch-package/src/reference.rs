use std::{fmt, str::FromStr};

use crate::{
    error::{PackageError, Result},
    version::NuGetVersion,
};

/// Identifies one database package: a package id and an exact version.
///
/// Two references are equal when their ids match exactly and their
/// versions normalize to the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageReference {
    id: String,
    version: NuGetVersion,
}

impl PackageReference {
    /// Builds a reference from an id and raw version text.
    ///
    /// # Errors
    ///
    /// * [`PackageError::EmptyPackageName`] if `id` is empty or whitespace
    /// * [`PackageError::InvalidVersion`] if `version` is not a NuGet version
    pub fn new(id: impl Into<String>, version: &str) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(PackageError::EmptyPackageName);
        }

        let version = version.parse::<NuGetVersion>()?;
        Ok(Self {
            id,
            version,
        })
    }

    /// Parses the `<package>:<version>` form accepted on the command line.
    ///
    /// Checks are applied in order: the input must split into exactly two
    /// colon-delimited parts, the name must not be blank, and the version
    /// must be valid.
    pub fn parse(input: &str) -> Result<Self> {
        let parts = input.split(':').collect::<Vec<_>>();
        let [id, version] = parts.as_slice() else {
            return Err(PackageError::InvalidReferenceFormat);
        };

        Self::new(*id, version)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &NuGetVersion {
        &self.version
    }
}

/// Formats as `<id>.<version>`, the form used in diagnostics.
impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.version)
    }
}

impl FromStr for PackageReference {
    type Err = PackageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}
