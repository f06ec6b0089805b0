use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};
use dacfetch_core::paths::{OutputDirectory, SqlProjectFile};
use dacfetch_package::PackageReference;
use ureq::Proxy;

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Downloads the DACPAC files referenced by an SDK-style SQL Server database project.\n\
                  Uses the package sources and credentials configured in the project's NuGet.Config files.",
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Args {
    /// The .sqlproj file containing the NuGet database references to download
    #[arg(long, value_hint = ValueHint::FilePath, value_parser = parse_project)]
    pub project: SqlProjectFile,

    /// The output directory for the downloaded DACPAC files
    #[arg(
        long = "output-directory",
        visible_alias = "outputDirectory",
        value_hint = ValueHint::DirPath,
        value_parser = parse_output_directory
    )]
    pub output_directory: OutputDirectory,

    /// Additional packages to download, as <id>:<version>
    ///
    /// Separate several packages with spaces or repeat the option, for example:
    /// --include Microsoft.SqlServer.Dacpacs.Master:160.2.3
    #[arg(long, num_args = 1.., action = ArgAction::Append, value_parser = PackageReference::parse)]
    pub include: Vec<PackageReference>,

    /// Package source URL or folder to use instead of the configured sources
    ///
    /// Repeat to add more sources; they are tried in the order given.
    #[arg(long, action = ArgAction::Append, conflicts_with = "config_file", value_hint = ValueHint::Url)]
    pub source: Vec<String>,

    /// Read package sources from this NuGet.Config only
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    /// Treat every versioned package reference as a database reference
    #[arg(long)]
    pub all_package_references: bool,

    /// Set proxy
    #[arg(long, short = 'P', value_parser = parse_proxy)]
    pub proxy: Option<String>,

    /// Set user agent
    #[arg(long, short = 'A')]
    pub user_agent: Option<String>,

    /// Timeout for each request, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress outputs
    #[arg(short, long)]
    pub quiet: bool,

    /// Output as json
    #[arg(short, long)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long)]
    pub no_color: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

fn parse_project(value: &str) -> Result<SqlProjectFile, String> {
    let path = PathBuf::from(value);
    if !path.is_file() {
        return Err(format!("File does not exist: '{value}'."));
    }
    SqlProjectFile::new(path).map_err(|err| err.to_string())
}

fn parse_output_directory(value: &str) -> Result<OutputDirectory, String> {
    OutputDirectory::new(value).map_err(|err| err.to_string())
}

fn parse_proxy(value: &str) -> Result<String, String> {
    Proxy::new(value)
        .map(|_| value.to_string())
        .map_err(|err| err.to_string())
}
