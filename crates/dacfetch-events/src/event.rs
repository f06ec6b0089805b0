use std::fmt;

/// All event types emitted while fetching database packages.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// A run with work to do is starting.
    RunStarting { references: usize, sources: usize },
    /// The project declares no database package references.
    NothingToDo,
    /// Processing of one reference is starting (`index` is 1-based).
    ReferenceStarting {
        index: usize,
        total: usize,
        id: String,
        version: String,
    },
    /// A source does not carry the requested version; the next source is tried.
    SourceMiss {
        id: String,
        version: String,
        source: String,
    },
    /// Package download is starting.
    DownloadStarting {
        id: String,
        version: String,
        source: String,
        total: u64,
    },
    /// Package download progress update.
    DownloadProgress {
        id: String,
        version: String,
        current: u64,
        total: u64,
    },
    /// Package is fully buffered in memory.
    DownloadComplete {
        id: String,
        version: String,
        total: u64,
    },
    /// An artifact was written to the output directory.
    ArtifactExtracted {
        id: String,
        version: String,
        file_name: String,
    },
    /// A source had the package; `extracted` artifacts were written.
    ReferenceComplete {
        id: String,
        version: String,
        source: String,
        extracted: usize,
    },
    /// The run finished. `missing` lists references no source could satisfy.
    RunComplete { missing: Vec<MissingPackage> },
}

/// A reference that was not found in any configured source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPackage {
    pub id: String,
    pub version: String,
}

impl fmt::Display for MissingPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.version)
    }
}
