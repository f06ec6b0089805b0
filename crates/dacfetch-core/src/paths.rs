//! Validated path types.
//!
//! Each type checks its invariant once, at construction, so the rest of the
//! run can rely on it.

use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use dacfetch_utils::{fs::ensure_dir_exists, path::has_extension};

use crate::{error::DacfetchError, DacfetchResult};

pub const SQL_PROJECT_EXTENSION: &str = "sqlproj";

/// Path to a SQL project file. The extension is always `.sqlproj`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlProjectFile(PathBuf);

impl SqlProjectFile {
    /// # Errors
    ///
    /// [`DacfetchError::NotSqlProject`] if the extension is not `.sqlproj`,
    /// compared case-insensitively.
    pub fn new(path: impl Into<PathBuf>) -> DacfetchResult<Self> {
        let path = path.into();
        if !has_extension(&path, SQL_PROJECT_EXTENSION) {
            return Err(DacfetchError::NotSqlProject {
                path,
            });
        }
        Ok(Self(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for SqlProjectFile {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SqlProjectFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl FromStr for SqlProjectFile {
    type Err = DacfetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Directory artifacts are written to. Never an existing plain file; it may
/// not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirectory(PathBuf);

impl OutputDirectory {
    /// # Errors
    ///
    /// [`DacfetchError::OutputIsFile`] if `path` is an existing file.
    pub fn new(path: impl Into<PathBuf>) -> DacfetchResult<Self> {
        let path = path.into();
        if path.is_file() {
            return Err(DacfetchError::OutputIsFile {
                path,
            });
        }
        Ok(Self(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Creates the directory and its parents if missing.
    pub fn ensure_exists(&self) -> DacfetchResult<()> {
        ensure_dir_exists(&self.0)?;
        Ok(())
    }
}

impl AsRef<Path> for OutputDirectory {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for OutputDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl FromStr for OutputDirectory {
    type Err = DacfetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
