//! Error types for the registry crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while fetching packages from a feed.
///
/// A package that a feed simply does not have is not an error; see
/// [`FetchOutcome::NotFound`](crate::FetchOutcome::NotFound).
#[derive(Error, Diagnostic, Debug)]
pub enum RegistryError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(dacfetch_registry::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Invalid URL: {url}")]
    #[diagnostic(
        code(dacfetch_registry::invalid_url),
        help("Ensure the package source URL is valid and properly formatted")
    )]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Request to {url} failed: {source}")]
    #[diagnostic(
        code(dacfetch_registry::network),
        help("Check your network connection and the package source URL")
    )]
    Network {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("HTTP {status}: {url}")]
    #[diagnostic(code(dacfetch_registry::http_error))]
    HttpError { status: u16, url: String },

    #[error("Access to package source '{source_name}' was denied (HTTP {status})")]
    #[diagnostic(
        code(dacfetch_registry::unauthorized),
        help("Add credentials for this source under <packageSourceCredentials> in NuGet.Config")
    )]
    Unauthorized { source_name: String, status: u16 },

    #[error("Invalid service index at {url}")]
    #[diagnostic(
        code(dacfetch_registry::invalid_service_index),
        help("The v3 service index must be a JSON document with a `resources` array")
    )]
    InvalidServiceIndex { url: String },

    #[error("Service index at {url} does not provide a {resource} resource")]
    #[diagnostic(code(dacfetch_registry::missing_resource))]
    MissingResource { url: String, resource: &'static str },

    #[error("Local package source `{path}` does not exist")]
    #[diagnostic(
        code(dacfetch_registry::missing_folder),
        help("Create the folder or remove the source from NuGet.Config")
    )]
    MissingFolder { path: String },
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            RegistryError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
