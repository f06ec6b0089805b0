//! Package references and artifact extraction for dacfetch.
//!
//! This crate owns the value types that identify a database package
//! (a NuGet package id plus an exact version) and the logic that pulls
//! compiled database artifacts (`.dacpac` files) out of a package archive.
//!
//! # Example
//!
//! ```no_run
//! use dacfetch_package::{PackageArchive, PackageReference};
//!
//! fn extract(bytes: Vec<u8>) -> dacfetch_package::Result<()> {
//!     let reference: PackageReference = "Microsoft.SqlServer.Dacpacs.Master:160.2.3".parse()?;
//!     let mut archive = PackageArchive::from_bytes(bytes)?;
//!     for entry in archive.artifact_entries()? {
//!         archive.extract_entry(&entry, std::path::Path::new("out"))?;
//!     }
//!     println!("extracted {reference}");
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod error;
pub mod reference;
pub mod version;

pub use archive::{ArchiveEntry, PackageArchive, ARTIFACT_EXTENSION, ARTIFACT_FOLDER};
pub use error::{PackageError, Result};
pub use reference::PackageReference;
pub use version::NuGetVersion;
