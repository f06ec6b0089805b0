//! Reading `.nupkg` archives and extracting database artifacts.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
};

use dacfetch_utils::fs::write_atomic;
use percent_encoding::percent_decode_str;
use tracing::trace;
use zip::ZipArchive;

use crate::error::Result;

/// Folder inside a package that holds database artifacts.
pub const ARTIFACT_FOLDER: &str = "tools";

/// File extension of compiled database deployment packages.
pub const ARTIFACT_EXTENSION: &str = "dacpac";

/// One file entry of a package archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    index: usize,
    path: String,
}

impl ArchiveEntry {
    /// The unescaped path of the entry inside the archive, `/`-separated.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The last path segment of the entry.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    fn has_extension(&self, extension: &str) -> bool {
        self.file_name()
            .rsplit_once('.')
            .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(extension))
    }
}

/// An in-memory package archive.
pub struct PackageArchive {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl PackageArchive {
    /// Opens a fully buffered package.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self {
            archive,
        })
    }

    /// Lists the file entries below `folder`, compared case-insensitively
    /// against the first path segment.
    ///
    /// Entry names are percent-decoded, since package tools escape
    /// reserved characters when packing.
    pub fn files_in(&mut self, folder: &str) -> Result<Vec<ArchiveEntry>> {
        let mut entries = Vec::new();

        for index in 0..self.archive.len() {
            let file = self.archive.by_index_raw(index)?;
            if file.is_dir() {
                continue;
            }

            let path = unescape_entry_name(file.name());
            let in_folder = path
                .split_once('/')
                .is_some_and(|(first, rest)| first.eq_ignore_ascii_case(folder) && !rest.is_empty());

            if in_folder {
                entries.push(ArchiveEntry {
                    index,
                    path,
                });
            }
        }

        Ok(entries)
    }

    /// Lists the `.dacpac` files under the `tools` folder.
    pub fn artifact_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let entries = self
            .files_in(ARTIFACT_FOLDER)?
            .into_iter()
            .filter(|entry| entry.has_extension(ARTIFACT_EXTENSION))
            .collect::<Vec<_>>();

        trace!(count = entries.len(), "found artifact entries");
        Ok(entries)
    }

    /// Writes `entry` into `output_dir` under its base file name, replacing
    /// any existing file of that name.
    pub fn extract_entry(&mut self, entry: &ArchiveEntry, output_dir: &Path) -> Result<PathBuf> {
        let mut file = self.archive.by_index(entry.index)?;
        let (path, written) = write_atomic(output_dir, entry.file_name(), &mut file)?;

        trace!(entry = entry.path(), bytes = written, "extracted entry");
        Ok(path)
    }
}

fn unescape_entry_name(name: &str) -> String {
    let name = name.replace('\\', "/");
    percent_decode_str(&name).decode_utf8_lossy().into_owned()
}
