//! Error types for dacfetch-core.

use std::path::PathBuf;

use dacfetch_config::error::ConfigError;
use dacfetch_package::PackageError;
use dacfetch_registry::RegistryError;
use dacfetch_utils::error::{FileSystemError, PathError};
use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for a dacfetch run.
#[derive(Error, Diagnostic, Debug)]
pub enum DacfetchError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Package(#[from] PackageError),

    #[error(transparent)]
    #[diagnostic(code(dacfetch::filesystem))]
    FileSystemError(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(code(dacfetch::path))]
    PathError(#[from] PathError),

    #[error("Error while {action}")]
    #[diagnostic(code(dacfetch::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("The project file is not a SQL project file.")]
    #[diagnostic(
        code(dacfetch::not_sql_project),
        help("Pass the path of a .sqlproj file")
    )]
    NotSqlProject { path: PathBuf },

    #[error("An existing file was specified as the output directory.")]
    #[diagnostic(
        code(dacfetch::output_is_file),
        help("Choose a directory path, or remove the file at `{}`", .path.display())
    )]
    OutputIsFile { path: PathBuf },

    #[error("Failed to parse project file `{}`", .path.display())]
    #[diagnostic(
        code(dacfetch::descriptor),
        help("The project file must be well-formed MSBuild XML")
    )]
    InvalidDescriptor {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Unable to construct reference for package '{item}'")]
    #[diagnostic(code(dacfetch::invalid_reference))]
    InvalidReference {
        item: String,
        #[source]
        source: PackageError,
    },

    #[error("Could not find a project root in any parent directory of `{}`", .path.display())]
    #[diagnostic(
        code(dacfetch::project_root),
        help("A project root is a directory containing a .sln or .slnx file")
    )]
    ProjectRootNotFound { path: PathBuf },

    #[error("Background task failed: {0}")]
    #[diagnostic(
        code(dacfetch::task),
        help("This is an internal error, please report it")
    )]
    TaskFailed(String),

    #[error("Cancelled")]
    #[diagnostic(code(dacfetch::cancelled))]
    Cancelled,
}

impl DacfetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, DacfetchError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, DacfetchError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            DacfetchError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
