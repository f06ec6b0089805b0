//! Error types for the package crate.

use dacfetch_utils::error::FileSystemError;
use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while parsing references or reading package archives.
#[derive(Error, Diagnostic, Debug)]
pub enum PackageError {
    #[error("The package ID must be in the format <package>:<version>")]
    #[diagnostic(
        code(dacfetch_package::reference_format),
        help("Use <package>:<version>, for example Microsoft.SqlServer.Dacpacs.Master:160.2.3")
    )]
    InvalidReferenceFormat,

    #[error("The package name cannot be empty")]
    #[diagnostic(code(dacfetch_package::empty_name))]
    EmptyPackageName,

    #[error("The version '{0}' is not a valid NuGet version")]
    #[diagnostic(
        code(dacfetch_package::invalid_version),
        help("NuGet versions look like 1.2.3, 1.2.3.4 or 1.2.3-beta.1")
    )]
    InvalidVersion(String),

    #[error("Failed to read package archive")]
    #[diagnostic(
        code(dacfetch_package::archive),
        help("The package may be corrupted or is not a valid .nupkg file")
    )]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    #[diagnostic(code(dacfetch_package::filesystem))]
    FileSystem(#[from] FileSystemError),
}

/// A specialized Result type for package operations.
pub type Result<T> = std::result::Result<T, PackageError>;
