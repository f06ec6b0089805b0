//! Package feeds for dacfetch.
//!
//! A feed is one place packages can be fetched from: a NuGet v3 feed, a
//! legacy v2 feed or a local folder. Feeds are queried in configuration
//! order by the operations layer; this crate only knows how to ask a
//! single feed for a single package.

pub mod client;
pub mod error;
pub mod feed;
pub mod local;
pub mod v2;
pub mod v3;

use std::sync::Arc;

pub use client::{ClientConfig, Progress, RegistryClient};
use dacfetch_config::source::{PackageSource, SourceLocation};
pub use error::{ErrorContext, RegistryError, Result};
pub use feed::{FetchOutcome, PackageFeed};
pub use local::LocalFolderFeed;
pub use v2::NuGetV2Feed;
pub use v3::NuGetV3Feed;

/// Callback invoked with download progress.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Shared handle to a feed.
pub type FeedHandle = Arc<dyn PackageFeed>;

/// Creates one feed per configured source, keeping their order.
pub fn create_feeds(sources: &[PackageSource], client: &RegistryClient) -> Vec<FeedHandle> {
    sources
        .iter()
        .map(|source| -> FeedHandle {
            match &source.location {
                SourceLocation::Http {
                    v3: true,
                    ..
                } => Arc::new(NuGetV3Feed::new(source.clone(), client.clone())),
                SourceLocation::Http {
                    v3: false,
                    ..
                } => Arc::new(NuGetV2Feed::new(source.clone(), client.clone())),
                SourceLocation::Folder(path) => {
                    Arc::new(LocalFolderFeed::new(source.name.clone(), path.clone()))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_create_feeds_keeps_order() {
        let sources = vec![
            PackageSource::from_value("local", "/pkgs", None, |v| PathBuf::from(v)),
            PackageSource::nuget_org(),
            PackageSource::from_value(
                "legacy",
                "https://legacy.example.com/api/v2",
                None,
                |v| PathBuf::from(v),
            ),
        ];

        let feeds = create_feeds(&sources, &RegistryClient::default());
        let names = feeds.iter().map(|f| f.name().to_string()).collect::<Vec<_>>();
        assert_eq!(names, vec!["local", "nuget.org", "legacy"]);
        assert_eq!(feeds[0].location(), "/pkgs");
        assert_eq!(feeds[1].location(), "https://api.nuget.org/v3/index.json");
    }
}
