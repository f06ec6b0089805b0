//! Selecting database package references from project items.

use dacfetch_package::PackageReference;
use tracing::debug;

use crate::{descriptor::DescriptorItem, error::DacfetchError, DacfetchResult};

pub const PACKAGE_REFERENCE_ITEM: &str = "PackageReference";
pub const INCLUDE_ATTRIBUTE: &str = "Include";
pub const VERSION_ATTRIBUTE: &str = "Version";

/// Metadata that marks a package reference as a database reference.
pub const DATABASE_SCOPE_MARKERS: [&str; 4] = [
    "DatabaseVariableLiteralValue",
    "DatabaseSqlCmdVariable",
    "ServerSqlCmdVariable",
    "SuppressMissingDependenciesErrors",
];

/// How strictly items are matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceFilter {
    /// Only package references carrying database-scope metadata.
    #[default]
    DatabaseScoped,
    /// Every versioned package reference.
    AllPackageReferences,
}

impl ReferenceFilter {
    /// Returns `true` if `item` declares a database package reference.
    pub fn is_candidate(self, item: &DescriptorItem) -> bool {
        if item.item_type() != PACKAGE_REFERENCE_ITEM
            || !item.has_attribute(VERSION_ATTRIBUTE)
            || !item
                .attribute(INCLUDE_ATTRIBUTE)
                .is_some_and(|id| !id.trim().is_empty())
        {
            return false;
        }

        match self {
            ReferenceFilter::AllPackageReferences => true,
            ReferenceFilter::DatabaseScoped => {
                DATABASE_SCOPE_MARKERS
                    .iter()
                    .any(|marker| item.has_attribute(marker))
            }
        }
    }
}

fn reference_from_item(item: &DescriptorItem) -> DacfetchResult<PackageReference> {
    let id = item.attribute(INCLUDE_ATTRIBUTE).unwrap_or_default();
    let version = item.attribute(VERSION_ATTRIBUTE).ok_or_else(|| {
        DacfetchError::InvalidReference {
            item: id.to_string(),
            source: dacfetch_package::PackageError::InvalidVersion(String::new()),
        }
    })?;

    PackageReference::new(id, version).map_err(|err| {
        DacfetchError::InvalidReference {
            item: id.to_string(),
            source: err,
        }
    })
}

/// Builds the ordered, duplicate-free list of references to fetch.
///
/// Candidates from `items` come first in document order, followed by
/// `extras`. The first occurrence of a reference wins.
pub fn extract_references(
    items: &[DescriptorItem],
    extras: &[PackageReference],
    filter: ReferenceFilter,
) -> DacfetchResult<Vec<PackageReference>> {
    let mut references: Vec<PackageReference> = Vec::new();

    for item in items.iter().filter(|item| filter.is_candidate(item)) {
        let reference = reference_from_item(item)?;
        if !references.contains(&reference) {
            references.push(reference);
        }
    }

    for extra in extras {
        if !references.contains(extra) {
            references.push(extra.clone());
        }
    }

    debug!("resolved {} package references", references.len());
    Ok(references)
}
