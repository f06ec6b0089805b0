//! NuGet v3 feeds.
//!
//! A v3 feed is described by a service index listing its resources. Package
//! contents are downloaded from the flat container resource
//! (`PackageBaseAddress/3.0.0`) at
//! `{base}{id}/{version}/{id}.{version}.nupkg`, with the id and version
//! lowercased.

use dacfetch_config::source::PackageSource;
use dacfetch_package::PackageReference;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use tracing::debug;
use ureq::http::StatusCode;
use url::Url;

use crate::{
    client::{content_length, read_with_progress, RegistryClient},
    error::{RegistryError, Result},
    feed::{FetchOutcome, PackageFeed},
    ProgressCallback,
};

pub const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress/3.0.0";

/// Characters left as-is in a path segment.
pub(crate) const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Deserialize)]
struct ServiceIndex {
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: ResourceType,
}

/// `@type` is usually a string but may be an array of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResourceType {
    One(String),
    Many(Vec<String>),
}

impl ResourceType {
    fn is(&self, wanted: &str) -> bool {
        match self {
            ResourceType::One(kind) => kind == wanted,
            ResourceType::Many(kinds) => kinds.iter().any(|kind| kind == wanted),
        }
    }
}

pub struct NuGetV3Feed {
    source: PackageSource,
    url: String,
    client: RegistryClient,
}

impl NuGetV3Feed {
    pub fn new(source: PackageSource, client: RegistryClient) -> Self {
        let url = source.location.to_string();
        Self {
            source,
            url,
            client,
        }
    }

    fn base_address(&self) -> Result<String> {
        self.client.cached_resource(&self.url, || {
            Url::parse(&self.url).map_err(|err| {
                RegistryError::InvalidUrl {
                    url: self.url.clone(),
                    source: err,
                }
            })?;

            debug!("Fetching service index {}", self.url);
            let mut resp = self.client.call(&self.url, self.source.credentials.as_ref())?;
            check_access(&self.source.name, resp.status())?;

            if !resp.status().is_success() {
                return Err(RegistryError::HttpError {
                    status: resp.status().as_u16(),
                    url: self.url.clone(),
                });
            }

            let index: ServiceIndex = resp.body_mut().read_json().map_err(|_| {
                RegistryError::InvalidServiceIndex {
                    url: self.url.clone(),
                }
            })?;

            base_address_from(&index, &self.url)
        })
    }
}

fn base_address_from(index: &ServiceIndex, url: &str) -> Result<String> {
    let resource = index
        .resources
        .iter()
        .find(|resource| resource.kind.is(PACKAGE_BASE_ADDRESS))
        .ok_or_else(|| {
            RegistryError::MissingResource {
                url: url.to_string(),
                resource: PACKAGE_BASE_ADDRESS,
            }
        })?;

    let mut base = resource.id.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    Ok(base)
}

/// Builds the flat container download URL for `reference`.
pub fn package_url(base: &str, reference: &PackageReference) -> String {
    let id = reference.id().to_lowercase();
    let id = utf8_percent_encode(&id, PATH_SEGMENT).to_string();
    let version = reference.version().to_path_segment();
    let version = utf8_percent_encode(&version, PATH_SEGMENT).to_string();
    format!("{base}{id}/{version}/{id}.{version}.nupkg")
}

/// Maps authentication failures to a fatal error.
pub(crate) fn check_access(source_name: &str, status: StatusCode) -> Result<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(RegistryError::Unauthorized {
            source_name: source_name.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

/// Downloads `url`, treating 404 as "not in this feed".
pub(crate) fn download(
    client: &RegistryClient,
    source: &PackageSource,
    url: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<FetchOutcome> {
    let resp = client.call(url, source.credentials.as_ref())?;
    let status = resp.status();

    if status == StatusCode::NOT_FOUND {
        debug!("{} returned 404", url);
        return Ok(FetchOutcome::NotFound);
    }
    check_access(&source.name, status)?;
    if !status.is_success() {
        return Err(RegistryError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let total = content_length(&resp);
    let reader = resp.into_body().into_reader();
    let bytes = read_with_progress(reader, total, url, on_progress)?;
    Ok(FetchOutcome::Found(bytes))
}

impl PackageFeed for NuGetV3Feed {
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
        let base = self.base_address()?;
        let url = package_url(&base, reference);
        download(&self.client, &self.source, &url, on_progress)
    }
}
