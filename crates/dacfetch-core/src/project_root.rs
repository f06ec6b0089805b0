//! Locating the project root and the package sources scoped to it.

use std::{
    fs,
    path::{Path, PathBuf},
};

use dacfetch_config::{settings::SourceSettings, source::PackageSource};
use dacfetch_utils::path::{absolute, find_ancestor, has_extension};
use tracing::debug;

use crate::{error::DacfetchError, paths::SqlProjectFile, DacfetchResult};

/// Extensions of files that mark a project root.
pub const ROOT_MARKER_EXTENSIONS: [&str; 2] = ["sln", "slnx"];

/// Where package sources come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceSelection {
    /// NuGet.Config files found from the project root upwards.
    #[default]
    Discover,
    /// Exactly one NuGet.Config file.
    ConfigFile(PathBuf),
    /// Explicit source URLs or folders, in priority order.
    Explicit(Vec<String>),
}

fn contains_root_marker(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    entries.flatten().any(|entry| {
        let path = entry.path();
        path.is_file()
            && ROOT_MARKER_EXTENSIONS
                .iter()
                .any(|ext| has_extension(&path, ext))
    })
}

/// Walks up from the directory containing `project` to the first directory
/// holding a solution file.
///
/// # Errors
///
/// [`DacfetchError::ProjectRootNotFound`] if no ancestor has one.
pub fn find_project_root(project: &SqlProjectFile) -> DacfetchResult<PathBuf> {
    let project_path = absolute(project.path())?;
    let start = project_path.parent().unwrap_or(Path::new("/"));

    let root = find_ancestor(start, contains_root_marker).ok_or_else(|| {
        DacfetchError::ProjectRootNotFound {
            path: project.path().to_path_buf(),
        }
    })?;

    debug!("project root: {}", root.display());
    Ok(root)
}

/// Loads the ordered package sources for a project rooted at `root`.
///
/// Relative paths in explicit sources resolve against `base_dir`.
pub fn load_sources(
    root: &Path,
    selection: &SourceSelection,
    base_dir: &Path,
) -> DacfetchResult<Vec<PackageSource>> {
    let settings = match selection {
        SourceSelection::Discover => SourceSettings::discover(root)?,
        SourceSelection::ConfigFile(path) => SourceSettings::load_file(path)?,
        SourceSelection::Explicit(locations) => {
            SourceSettings::from_locations(locations, base_dir)?
        }
    };

    for file in settings.config_files() {
        debug!("using NuGet config {}", file.display());
    }

    Ok(settings.into_sources())
}
