use std::path::PathBuf;

use dacfetch_utils::error::{PathError, UtilsError};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse NuGet config `{}`: {source}", .path.display())]
    #[diagnostic(
        code(dacfetch_config::xml),
        help("Check the NuGet.Config file for malformed XML")
    )]
    Xml {
        path: PathBuf,
        source: roxmltree::Error,
    },

    #[error("Failed to read NuGet config `{}`: {source}", .path.display())]
    #[diagnostic(code(dacfetch_config::io))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("NuGet config `{}` has no <configuration> root element", .path.display())]
    #[diagnostic(code(dacfetch_config::missing_root))]
    MissingRoot { path: PathBuf },

    #[error("Invalid value for package source '{source_name}': {reason}")]
    #[diagnostic(
        code(dacfetch_config::invalid_source),
        help("Check the <packageSources> section of your NuGet.Config")
    )]
    InvalidSource { source_name: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(dacfetch_config::utils))]
    Utils(#[from] UtilsError),
}

impl From<PathError> for ConfigError {
    fn from(err: PathError) -> Self {
        Self::Utils(UtilsError::Path(err))
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
