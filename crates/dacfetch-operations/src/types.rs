use dacfetch_core::{
    paths::{OutputDirectory, SqlProjectFile},
    project_root::SourceSelection,
    references::ReferenceFilter,
};
use dacfetch_package::PackageReference;
use dacfetch_registry::ClientConfig;

/// Inputs of a full run, already validated.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub project: SqlProjectFile,
    pub output: OutputDirectory,
    /// References to fetch in addition to those the project declares.
    pub includes: Vec<PackageReference>,
    pub filter: ReferenceFilter,
    pub sources: SourceSelection,
    pub client: ClientConfig,
}

/// Outcome of a finished run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Every reference the run set out to fetch, in processing order.
    pub expected: Vec<PackageReference>,
    /// References a source had, whether or not the package held artifacts.
    pub processed: Vec<PackageReference>,
    /// `expected` minus `processed`.
    pub missing: Vec<PackageReference>,
    /// Number of artifact files written.
    pub extracted: usize,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}
