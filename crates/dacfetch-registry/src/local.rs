//! Local folder feeds.
//!
//! Both layouts NuGet writes are understood: a flat folder of
//! `{id}.{version}.nupkg` files and the hierarchical
//! `{id}/{version}/{id}.{version}.nupkg` layout.

use std::{
    fs,
    path::{Path, PathBuf},
};

use dacfetch_package::PackageReference;
use tracing::debug;

use crate::{
    client::read_with_progress,
    error::{ErrorContext, RegistryError, Result},
    feed::{FetchOutcome, PackageFeed},
    ProgressCallback,
};

pub struct LocalFolderFeed {
    name: String,
    path: PathBuf,
    display: String,
}

impl LocalFolderFeed {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        let display = path.display().to_string();
        Self {
            name: name.into(),
            path,
            display,
        }
    }

    /// Finds the package file for `reference`, if present.
    pub fn find_package(&self, reference: &PackageReference) -> Result<Option<PathBuf>> {
        if !self.path.is_dir() {
            return Err(RegistryError::MissingFolder {
                path: self.display.clone(),
            });
        }

        let id = reference.id().to_lowercase();
        let version = reference.version().to_path_segment();
        let file_name = format!("{id}.{version}.nupkg");

        let hierarchical = self.path.join(&id).join(&version).join(&file_name);
        if hierarchical.is_file() {
            return Ok(Some(hierarchical));
        }

        find_file_ignoring_case(&self.path, &file_name)
    }
}

fn find_file_ignoring_case(dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("reading directory {}", dir.display()))?;
        let matches = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.eq_ignore_ascii_case(file_name));

        if matches && entry.path().is_file() {
            return Ok(Some(entry.path()));
        }
    }

    Ok(None)
}

impl PackageFeed for LocalFolderFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &str {
        &self.display
    }

    fn fetch(
        &self,
        reference: &PackageReference,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<FetchOutcome> {
        let Some(path) = self.find_package(reference)? else {
            return Ok(FetchOutcome::NotFound);
        };

        debug!("Reading package {}", path.display());
        let file =
            fs::File::open(&path).with_context(|| format!("opening {}", path.display()))?;
        let total = file
            .metadata()
            .with_context(|| format!("reading metadata of {}", path.display()))?
            .len();

        let bytes = read_with_progress(file, total, &path.display().to_string(), on_progress)?;
        Ok(FetchOutcome::Found(bytes))
    }
}
