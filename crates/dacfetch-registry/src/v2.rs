//! Legacy NuGet v2 feeds, which serve packages at `{feed}/package/{id}/{version}`.

use dacfetch_config::source::PackageSource;
use dacfetch_package::PackageReference;
use percent_encoding::utf8_percent_encode;
use url::Url;

use crate::{
    client::RegistryClient,
    error::{RegistryError, Result},
    feed::{FetchOutcome, PackageFeed},
    v3::{download, PATH_SEGMENT},
    ProgressCallback,
};

pub struct NuGetV2Feed {
    source: PackageSource,
    url: String,
    client: RegistryClient,
}

impl NuGetV2Feed {
    pub fn new(source: PackageSource, client: RegistryClient) -> Self {
        let url = source.location.to_string();
        Self {
            source,
            url,
            client,
        }
    }
}

/// Builds the v2 download URL for `reference`.
pub fn package_url(feed_url: &str, reference: &PackageReference) -> String {
    let id = utf8_percent_encode(reference.id(), PATH_SEGMENT);
    let version = reference.version().to_path_segment();
    let version = utf8_percent_encode(&version, PATH_SEGMENT);
    format!("{}/package/{id}/{version}", feed_url.trim_end_matches('/'))
}

impl PackageFeed for NuGetV2Feed {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn location(&self) -> &str {
        &self.url
    }

    fn fetch(
        &self,
        reference: &PackageReference,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<FetchOutcome> {
        Url::parse(&self.url).map_err(|err| {
            RegistryError::InvalidUrl {
                url: self.url.clone(),
                source: err,
            }
        })?;

        let url = package_url(&self.url, reference);
        download(&self.client, &self.source, &url, on_progress)
    }
}
