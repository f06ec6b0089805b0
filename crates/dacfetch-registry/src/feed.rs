use dacfetch_package::PackageReference;

use crate::{error::Result, ProgressCallback};

/// Result of asking one feed for one package.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The complete `.nupkg` contents.
    Found(Vec<u8>),
    /// The feed answered but does not have this id and version.
    NotFound,
}

/// A single place packages can be fetched from.
///
/// Implementations are blocking; callers move them onto a blocking thread.
pub trait PackageFeed: Send + Sync {
    /// Name the source was configured under.
    fn name(&self) -> &str;

    /// URL or folder path, as shown to users.
    fn location(&self) -> &str;

    /// Fetches the package for `reference`.
    ///
    /// Only a definite "not here" answer maps to [`FetchOutcome::NotFound`].
    /// Authentication failures, server errors and transport errors are
    /// returned as errors.
    fn fetch(
        &self,
        reference: &PackageReference,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<FetchOutcome>;
}
